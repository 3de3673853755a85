//! Bean 工厂的集中集成测试：对象图、循环依赖与提前暴露引用

use di_abstractions::{
    BeanClass, BeanDefinition, BeanFactory, BeanPostProcessor, BeanRef, ContainerConfig, Order, Value, ValueKind,
    ValueSpec,
};
use di_impl::DefaultBeanFactory;
use ioc_common::{BeanError, BoxError, Scope};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// 初始化测试日志系统（只初始化一次）
fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 通过 setter 相互引用的节点
#[derive(Default)]
struct Node {
    peer: Mutex<Option<BeanRef>>,
    children: Mutex<Vec<BeanRef>>,
}

impl Node {
    fn peer(&self) -> BeanRef {
        self.peer.lock().clone().unwrap()
    }
}

/// 通过构造器引用其他 Bean
struct Link {
    _target: BeanRef,
}

/// 后置处理器产生的包装对象
struct Traced {
    inner: BeanRef,
}

fn object(value: Value) -> Result<BeanRef, BoxError> {
    value.as_object().cloned().ok_or_else(|| "需要对象".into())
}

fn factory_with(config: ContainerConfig, constructed: &Arc<AtomicUsize>) -> Arc<DefaultBeanFactory> {
    init_test_logger();
    let factory = DefaultBeanFactory::new(config);
    let counter = Arc::clone(constructed);
    factory.register_type(
        BeanClass::builder::<Node>("Node")
            .constructor(Vec::new(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Node::default())
            })
            .property("peer", ValueKind::Any, |n, v| {
                *n.peer.lock() = Some(object(v)?);
                Ok(())
            })
            .property("children", ValueKind::List, |n, v| {
                *n.children.lock() = v.into_list()?.into_iter().map(object).collect::<Result<_, _>>()?;
                Ok(())
            })
            .build(),
    );
    factory.register_type(
        BeanClass::builder::<Link>("Link")
            .constructor(vec![ValueKind::Any], |args| {
                Ok(Link {
                    _target: object(args.into_iter().next().unwrap_or(Value::Null))?,
                })
            })
            .build(),
    );
    factory
}

fn factory(constructed: &Arc<AtomicUsize>) -> Arc<DefaultBeanFactory> {
    factory_with(ContainerConfig::default(), constructed)
}

fn register_cycle(factory: &DefaultBeanFactory, scope: Scope) {
    factory
        .register_bean_definition(
            "a",
            BeanDefinition::new("Node")
                .with_scope(scope)
                .with_property("peer", ValueSpec::reference("b")),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "b",
            BeanDefinition::new("Node")
                .with_scope(scope)
                .with_property("peer", ValueSpec::reference("a")),
        )
        .unwrap();
}

#[test]
fn acyclic_graph_is_built_once_per_name() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = factory(&constructed);
    for leaf in ["leaf1", "leaf2"] {
        factory.register_bean_definition(leaf, BeanDefinition::new("Node")).unwrap();
    }
    factory
        .register_bean_definition(
            "root",
            BeanDefinition::new("Node")
                .with_property("peer", ValueSpec::reference("middle"))
                .with_property(
                    "children",
                    ValueSpec::list([ValueSpec::reference("leaf1"), ValueSpec::reference("leaf2")]),
                ),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "middle",
            BeanDefinition::new("Node").with_property("peer", ValueSpec::reference("leaf1")),
        )
        .unwrap();

    let root = factory.get_bean_typed::<Node>("root").unwrap();
    let again = factory.get_bean_typed::<Node>("root").unwrap();
    let middle = factory.get_bean("middle").unwrap();
    let leaf1 = factory.get_bean("leaf1").unwrap();

    assert!(Arc::ptr_eq(&root, &again));
    assert!(Arc::ptr_eq(&root.peer(), &middle));
    assert!(Arc::ptr_eq(&root.children.lock()[0], &leaf1));
    assert!(Arc::ptr_eq(&middle.downcast_ref::<Node>().unwrap().peer(), &leaf1));
    assert_eq!(constructed.load(Ordering::SeqCst), 4);
    let mut dependents = factory.dependents_of("leaf1");
    dependents.sort();
    assert_eq!(dependents, vec!["middle", "root"]);
}

#[test]
fn setter_cycle_between_singletons_is_resolved() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = factory(&constructed);
    register_cycle(&factory, Scope::Singleton);

    let a = factory.get_bean("a").unwrap();
    let b = factory.get_bean("b").unwrap();

    let a_node = a.downcast_ref::<Node>().unwrap();
    let b_node = b.downcast_ref::<Node>().unwrap();
    assert!(Arc::ptr_eq(&a_node.peer(), &b));
    assert!(Arc::ptr_eq(&b_node.peer(), &a));
    assert_eq!(constructed.load(Ordering::SeqCst), 2);
    assert_eq!(factory.stats().early_references_resolved, 1);
    assert_eq!(factory.singleton_names(), vec!["b", "a"]);
}

#[test]
fn constructor_cycle_fails_with_full_path() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = factory(&constructed);
    factory
        .register_bean_definition("a", BeanDefinition::new("Link").with_constructor_arg(ValueSpec::reference("b")))
        .unwrap();
    factory
        .register_bean_definition("b", BeanDefinition::new("Link").with_constructor_arg(ValueSpec::reference("a")))
        .unwrap();

    let err = factory.get_bean("a").unwrap_err();

    match &err {
        BeanError::CircularDependency { bean_name, path } => {
            assert_eq!(bean_name, "a");
            assert_eq!(path, &vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        }
        other => panic!("期望循环依赖错误, 实际: {other}"),
    }
    assert!(err.to_string().contains("a -> b -> a"));
    assert!(!factory.contains_singleton("a"));
    assert!(!factory.contains_singleton("b"));
}

#[test]
fn prototype_cycle_fails_fast() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = factory(&constructed);
    register_cycle(&factory, Scope::Prototype);

    let err = factory.get_bean("a").unwrap_err();

    assert_eq!(err.circular_path(), Some(&["a".to_string(), "b".to_string(), "a".to_string()][..]));
}

#[test]
fn setter_cycle_fails_when_circular_references_disabled() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = factory_with(
        ContainerConfig {
            allow_circular_references: false,
            ..ContainerConfig::default()
        },
        &constructed,
    );
    register_cycle(&factory, Scope::Singleton);

    let err = factory.get_bean("a").unwrap_err();

    assert!(matches!(err, BeanError::CircularDependency { .. }), "{err}");
    assert!(factory.singleton_names().is_empty());
}

/// 提前引用与初始化后处理都返回同一个包装对象
#[derive(Default)]
struct EarlyWrapping {
    wrapped: Mutex<Vec<(String, BeanRef)>>,
}

impl EarlyWrapping {
    fn wrap(&self, bean: BeanRef, bean_name: &str) -> BeanRef {
        let mut wrapped = self.wrapped.lock();
        if let Some((_, existing)) = wrapped.iter().find(|(name, _)| name == bean_name) {
            return existing.clone();
        }
        let traced: BeanRef = Arc::new(Traced { inner: bean });
        wrapped.push((bean_name.to_string(), traced.clone()));
        traced
    }
}

impl BeanPostProcessor for EarlyWrapping {
    fn early_reference(&self, bean: BeanRef, bean_name: &str) -> Result<BeanRef, BoxError> {
        Ok(self.wrap(bean, bean_name))
    }

    fn after_initialization(&self, bean: BeanRef, bean_name: &str) -> Result<BeanRef, BoxError> {
        let already_wrapped = self.wrapped.lock().iter().any(|(name, _)| name == bean_name);
        if already_wrapped {
            Ok(bean)
        } else {
            Ok(self.wrap(bean, bean_name))
        }
    }
}

#[test]
fn early_reference_hook_result_becomes_the_singleton() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = factory(&constructed);
    factory.add_bean_post_processor(Arc::new(EarlyWrapping::default()));
    register_cycle(&factory, Scope::Singleton);

    let a = factory.get_bean("a").unwrap();
    let b = factory.get_bean("b").unwrap();

    let a_traced = a.downcast_ref::<Traced>().unwrap();
    let b_traced = b.downcast_ref::<Traced>().unwrap();
    assert!(Arc::ptr_eq(&b_traced.inner.downcast_ref::<Node>().unwrap().peer(), &a));
    assert!(Arc::ptr_eq(&a_traced.inner.downcast_ref::<Node>().unwrap().peer(), &b));
}

/// 初始化之后无条件替换实例
struct Replacing;

impl BeanPostProcessor for Replacing {
    fn order(&self) -> Order {
        Order::Ordered(0)
    }

    fn after_initialization(&self, bean: BeanRef, _bean_name: &str) -> Result<BeanRef, BoxError> {
        Ok(Arc::new(Traced { inner: bean }))
    }
}

#[test]
fn replacing_an_early_referenced_bean_is_an_error() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = factory(&constructed);
    factory.add_bean_post_processor(Arc::new(Replacing));
    register_cycle(&factory, Scope::Singleton);

    let err = factory.get_bean("a").unwrap_err();

    assert!(matches!(err, BeanError::BeanCreation { ref bean_name, .. } if bean_name == "a"), "{err}");
    assert!(err.to_string().contains('b'));
    assert!(!factory.contains_singleton("a"));
}

#[test]
fn nested_failure_keeps_the_chain_of_bean_names() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = factory(&constructed);
    factory
        .register_bean_definition("outer", BeanDefinition::new("Node").with_property("peer", ValueSpec::reference("inner")))
        .unwrap();
    factory
        .register_bean_definition("inner", BeanDefinition::new("Node").with_property("peer", ValueSpec::reference("ghost")))
        .unwrap();

    let err = factory.get_bean("outer").unwrap_err();

    assert_eq!(err.bean_name(), Some("outer"));
    let chain = {
        let mut names = Vec::new();
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(&err);
        while let Some(error) = current {
            if let Some(name) = error.downcast_ref::<BeanError>().and_then(BeanError::bean_name) {
                names.push(name.to_string());
            }
            current = error.source();
        }
        names
    };
    assert_eq!(chain, vec!["outer", "inner", "ghost"]);
}

#[test]
fn concurrent_cycle_resolution_is_consistent() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = factory(&constructed);
    register_cycle(&factory, Scope::Singleton);

    let results: Vec<(BeanRef, BeanRef)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let factory = &factory;
                scope.spawn(move || {
                    let (first, second) = if i % 2 == 0 { ("a", "b") } else { ("b", "a") };
                    let x = factory.get_bean(first).unwrap();
                    let y = factory.get_bean(second).unwrap();
                    if i % 2 == 0 {
                        (x, y)
                    } else {
                        (y, x)
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(constructed.load(Ordering::SeqCst), 2);
    let (a, b) = &results[0];
    for (x, y) in &results {
        assert!(Arc::ptr_eq(a, x));
        assert!(Arc::ptr_eq(b, y));
    }
}
