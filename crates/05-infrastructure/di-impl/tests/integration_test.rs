//! Bean 工厂的集成测试

use di_abstractions::{
    BeanClass, BeanDefinition, BeanFactory, BeanFactoryAware, BeanFactoryHandle, ContainerConfig, Value, ValueKind,
    ValueSpec,
};
use di_impl::DefaultBeanFactory;
use ioc_common::{BeanError, BoxError, Scope};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Person {
    name: Mutex<String>,
    age: Mutex<i64>,
    tags: Mutex<Vec<String>>,
    friend: Mutex<Option<Arc<Person>>>,
}

impl Person {
    fn named(name: &str) -> Self {
        let person = Self::default();
        *person.name.lock() = name.to_string();
        person
    }

    fn name(&self) -> String {
        self.name.lock().clone()
    }
}

#[derive(Debug)]
struct Car {
    brand: String,
    seats: i64,
}

#[derive(Debug, Default)]
struct CarFactory;

#[derive(Default)]
struct Locator {
    factory: Mutex<Option<BeanFactoryHandle>>,
}

impl BeanFactoryAware for Locator {
    fn set_bean_factory(&self, factory: BeanFactoryHandle) -> Result<(), BoxError> {
        *self.factory.lock() = Some(factory);
        Ok(())
    }
}

fn person_class() -> BeanClass {
    BeanClass::builder::<Person>("Person")
        .default_constructor()
        .constructor(vec![ValueKind::Str], |args| Ok(Person::named(&args[0].clone().into_string()?)))
        .property("name", ValueKind::Str, |p, v| {
            *p.name.lock() = v.into_string()?;
            Ok(())
        })
        .property("age", ValueKind::Int, |p, v| {
            *p.age.lock() = v.into_i64()?;
            Ok(())
        })
        .property("tags", ValueKind::List, |p, v| {
            *p.tags.lock() = v
                .into_list()?
                .into_iter()
                .map(Value::into_string)
                .collect::<Result<_, _>>()?;
            Ok(())
        })
        .property("friend", ValueKind::object::<Person>(), |p, v| {
            *p.friend.lock() = Some(v.into_bean::<Person>()?);
            Ok(())
        })
        .build()
}

fn car_classes(factory: &DefaultBeanFactory) {
    factory.register_type(
        BeanClass::builder::<Car>("Car")
            .constructor(vec![ValueKind::Int], |args| {
                Ok(Car {
                    brand: "generic".to_string(),
                    seats: args[0].as_i64().ok_or("seats")?,
                })
            })
            .constructor(vec![ValueKind::Str], |args| {
                Ok(Car {
                    brand: args[0].clone().into_string()?,
                    seats: 4,
                })
            })
            .static_factory("of", vec![ValueKind::Str], |args| {
                Ok(Arc::new(Car {
                    brand: format!("static-{}", args[0].as_str().ok_or("brand")?),
                    seats: 2,
                }))
            })
            .build(),
    );
    factory.register_type(
        BeanClass::builder::<CarFactory>("CarFactory")
            .default_constructor()
            .factory_method("get_car", vec![ValueKind::Str], |_, args| {
                Ok(Arc::new(Car {
                    brand: format!("instance-{}", args[0].as_str().ok_or("brand")?),
                    seats: 5,
                }))
            })
            .build(),
    );
}

fn factory() -> Arc<DefaultBeanFactory> {
    let factory = DefaultBeanFactory::new(ContainerConfig::default());
    factory.register_type(person_class());
    car_classes(&factory);
    factory
}

#[test]
fn singleton_is_created_once_and_populated() {
    let factory = factory();
    factory
        .register_bean_definition(
            "tom",
            BeanDefinition::new("Person")
                .with_property("name", ValueSpec::literal("tom"))
                .with_property("age", ValueSpec::literal("18"))
                .with_property("friend", ValueSpec::reference("jerry")),
        )
        .unwrap();
    factory
        .register_bean_definition("jerry", BeanDefinition::new("Person").with_property("name", ValueSpec::literal("jerry")))
        .unwrap();

    let tom = factory.get_bean_typed::<Person>("tom").unwrap();
    let again = factory.get_bean_typed::<Person>("tom").unwrap();
    let jerry = factory.get_bean_typed::<Person>("jerry").unwrap();

    assert!(Arc::ptr_eq(&tom, &again));
    assert_eq!(*tom.age.lock(), 18);
    assert!(Arc::ptr_eq(tom.friend.lock().as_ref().unwrap(), &jerry));
    assert_eq!(factory.dependents_of("jerry"), vec!["tom"]);
    assert_eq!(factory.stats().created_instances, 2);
}

#[test]
fn prototype_returns_fresh_instances() {
    let factory = factory();
    factory
        .register_bean_definition("temp", BeanDefinition::new("Person").with_scope(Scope::Prototype))
        .unwrap();

    let first = factory.get_bean("temp").unwrap();
    let second = factory.get_bean("temp").unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(factory.is_prototype("temp").unwrap());
    assert!(!factory.contains_singleton("temp"));
}

#[test]
fn alias_resolves_to_the_same_singleton() {
    let factory = factory();
    factory
        .register_bean_definition("student", BeanDefinition::new("Person").with_alias("pupil"))
        .unwrap();
    factory.register_alias("pupil", "learner").unwrap();

    let by_name = factory.get_bean("student").unwrap();
    let by_alias = factory.get_bean("learner").unwrap();

    assert!(Arc::ptr_eq(&by_name, &by_alias));
    let mut aliases = factory.aliases("student");
    aliases.sort();
    assert_eq!(aliases, vec!["learner", "pupil"]);
}

#[test]
fn constructor_is_selected_by_argument_type() {
    let factory = factory();
    factory
        .register_bean_definition("bus", BeanDefinition::new("Car").with_constructor_arg(ValueSpec::literal(30)))
        .unwrap();
    factory
        .register_bean_definition("audi", BeanDefinition::new("Car").with_constructor_arg(ValueSpec::literal("audi")))
        .unwrap();

    let bus = factory.get_bean_typed::<Car>("bus").unwrap();
    let audi = factory.get_bean_typed::<Car>("audi").unwrap();

    assert_eq!((bus.brand.as_str(), bus.seats), ("generic", 30));
    assert_eq!((audi.brand.as_str(), audi.seats), ("audi", 4));
}

#[test]
fn static_and_instance_factory_methods() {
    let factory = factory();
    factory
        .register_bean_definition(
            "staticCar",
            BeanDefinition::new("Car")
                .with_factory_method("of")
                .with_constructor_arg(ValueSpec::literal("bmw")),
        )
        .unwrap();
    factory
        .register_bean_definition("carFactory", BeanDefinition::new("CarFactory"))
        .unwrap();
    factory
        .register_bean_definition(
            "instanceCar",
            BeanDefinition::from_factory_bean("carFactory", "get_car").with_constructor_arg(ValueSpec::literal("audi")),
        )
        .unwrap();

    assert_eq!(factory.get_bean_typed::<Car>("staticCar").unwrap().brand, "static-bmw");
    assert_eq!(factory.get_bean_typed::<Car>("instanceCar").unwrap().brand, "instance-audi");
    assert_eq!(factory.dependencies_of("instanceCar"), vec!["carFactory"]);
}

#[test]
fn inner_beans_and_lists_are_resolved() {
    let factory = factory();
    factory
        .register_bean_definition(
            "owner",
            BeanDefinition::new("Person")
                .with_property(
                    "friend",
                    ValueSpec::nested(BeanDefinition::new("Person").with_property("name", ValueSpec::literal("inner"))),
                )
                .with_property(
                    "tags",
                    ValueSpec::list([ValueSpec::literal("a"), ValueSpec::literal("b")]),
                ),
        )
        .unwrap();

    let owner = factory.get_bean_typed::<Person>("owner").unwrap();

    assert_eq!(owner.friend.lock().as_ref().unwrap().name(), "inner");
    assert_eq!(*owner.tags.lock(), vec!["a", "b"]);
    assert_eq!(factory.singleton_names(), vec!["owner"]);
}

#[test]
fn child_definition_inherits_from_abstract_parent() {
    let factory = factory();
    factory
        .register_bean_definition(
            "template",
            BeanDefinition::new("Person")
                .with_property("age", ValueSpec::literal(40))
                .with_property("name", ValueSpec::literal("parent"))
                .abstract_template(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "child",
            BeanDefinition::child_of("template").with_property("name", ValueSpec::literal("child")),
        )
        .unwrap();

    let child = factory.get_bean_typed::<Person>("child").unwrap();
    assert_eq!((child.name(), *child.age.lock()), ("child".to_string(), 40));
    assert!(matches!(factory.get_bean("template"), Err(BeanError::BeanIsAbstract { .. })));
}

#[test]
fn depends_on_is_created_first_and_cycles_are_rejected() {
    let factory = factory();
    factory
        .register_bean_definition("late", BeanDefinition::new("Person").with_depends_on("early"))
        .unwrap();
    factory.register_bean_definition("early", BeanDefinition::new("Person")).unwrap();
    factory
        .register_bean_definition("a", BeanDefinition::new("Person").with_depends_on("b"))
        .unwrap();
    factory
        .register_bean_definition("b", BeanDefinition::new("Person").with_depends_on("a"))
        .unwrap();

    factory.get_bean("late").unwrap();
    assert_eq!(factory.singleton_names(), vec!["early", "late"]);

    let err = factory.get_bean("a").unwrap_err();
    assert!(err.is_circular_dependency(), "{err}");
}

#[test]
fn lookup_errors_are_reported() {
    let factory = factory();
    factory.register_bean_definition("tom", BeanDefinition::new("Person")).unwrap();
    factory
        .register_bean_definition(
            "broken",
            BeanDefinition::new("Person").with_property("height", ValueSpec::literal(180)),
        )
        .unwrap();
    factory
        .register_bean_definition("badAge", BeanDefinition::new("Person").with_property("age", ValueSpec::literal("old")))
        .unwrap();

    assert!(matches!(factory.get_bean("missing"), Err(BeanError::NoSuchBeanDefinition { .. })));
    assert!(matches!(factory.get_bean_typed::<Car>("tom"), Err(BeanError::TypeMismatch { .. })));
    assert!(matches!(
        factory.get_bean("broken"),
        Err(BeanError::PropertyResolution { ref property, .. }) if property == "height"
    ));
    assert!(matches!(
        factory.get_bean("badAge"),
        Err(BeanError::PropertyResolution { ref property, .. }) if property == "age"
    ));
    assert!(!factory.contains_singleton("broken"));
    assert_eq!(factory.stats().creation_errors, 2);
}

#[test]
fn bean_factory_aware_bean_can_look_up_others() {
    let factory = factory();
    factory.register_type(BeanClass::builder::<Locator>("Locator").default_constructor().bean_factory_aware().build());
    factory.register_bean_definition("locator", BeanDefinition::new("Locator")).unwrap();
    factory
        .register_bean_definition("tom", BeanDefinition::new("Person").with_property("name", ValueSpec::literal("tom")))
        .unwrap();

    let locator = factory.get_bean_typed::<Locator>("locator").unwrap();
    let handle = locator.factory.lock().clone().unwrap();
    let tom = handle.get_bean_typed::<Person>("tom").unwrap();

    assert_eq!(tom.name(), "tom");
}

#[test]
fn creation_depth_is_limited() {
    let factory = DefaultBeanFactory::new(ContainerConfig {
        max_creation_depth: 2,
        ..ContainerConfig::default()
    });
    factory.register_type(person_class());
    for (name, friend) in [("p1", "p2"), ("p2", "p3")] {
        factory
            .register_bean_definition(name, BeanDefinition::new("Person").with_property("friend", ValueSpec::reference(friend)))
            .unwrap();
    }
    factory.register_bean_definition("p3", BeanDefinition::new("Person")).unwrap();

    let err = factory.get_bean("p1").unwrap_err();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    let mut exceeded = false;
    while let Some(current) = source {
        if let Some(BeanError::CreationDepthExceeded { max_depth, .. }) = current.downcast_ref::<BeanError>() {
            exceeded = *max_depth == 2;
        }
        source = current.source();
    }
    assert!(exceeded, "{err}");
}

#[test]
fn concurrent_callers_share_one_singleton() {
    let factory = factory();
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructed);
    factory.register_type(
        BeanClass::builder::<CarFactory>("SlowFactory")
            .constructor(Vec::new(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(CarFactory)
            })
            .build(),
    );
    factory.register_bean_definition("slow", BeanDefinition::new("SlowFactory")).unwrap();

    let beans: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| factory.get_bean("slow").unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(beans.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}
