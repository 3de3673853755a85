//! 应用上下文的集中集成测试：生命周期顺序、工厂后置处理器、刷新与关闭

use di_abstractions::{
    BeanClass, BeanDefinition, BeanDefinitionRegistry, BeanDefinitionRegistryPostProcessor, BeanFactoryAware,
    BeanFactoryHandle, BeanFactoryPostProcessor, BeanNameAware, BeanPostProcessor, BeanRef, DisposableBean,
    InitializingBean, Order, TypeRegistry, TypeRegistryAware, ValueKind, ValueSpec,
};
use ioc_common::BoxError;
use ioc_context::{ApplicationContext, ContextError, ContextStatus};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

/// 记录自身生命周期调用的 Bean
struct Recorder {
    log: Log,
    name: Mutex<String>,
}

impl BeanNameAware for Recorder {
    fn set_bean_name(&self, bean_name: &str) {
        *self.name.lock() = bean_name.to_string();
        self.log.lock().push(format!("setBeanName:{bean_name}"));
    }
}

impl TypeRegistryAware for Recorder {
    fn set_type_registry(&self, _registry: Arc<TypeRegistry>) {
        self.log.lock().push("setTypeRegistry".to_string());
    }
}

impl BeanFactoryAware for Recorder {
    fn set_bean_factory(&self, factory: BeanFactoryHandle) -> Result<(), BoxError> {
        let seen = if factory.contains_bean(&self.name.lock()) { "self" } else { "none" };
        self.log.lock().push(format!("setBeanFactory:{seen}"));
        Ok(())
    }
}

impl InitializingBean for Recorder {
    fn after_properties_set(&self) -> Result<(), BoxError> {
        self.log.lock().push("afterPropertiesSet".to_string());
        Ok(())
    }
}

impl DisposableBean for Recorder {
    fn destroy(&self) -> Result<(), BoxError> {
        self.log.lock().push(format!("destroy:{}", self.name.lock()));
        Ok(())
    }
}

struct Marker {
    label: &'static str,
    order: Order,
    log: Log,
}

impl BeanPostProcessor for Marker {
    fn name(&self) -> &str {
        self.label
    }

    fn order(&self) -> Order {
        self.order
    }

    fn before_initialization(&self, bean: BeanRef, _bean_name: &str) -> Result<BeanRef, BoxError> {
        self.log.lock().push(format!("before:{}", self.label));
        Ok(bean)
    }

    fn after_initialization(&self, bean: BeanRef, _bean_name: &str) -> Result<BeanRef, BoxError> {
        self.log.lock().push(format!("after:{}", self.label));
        Ok(bean)
    }
}

fn recorder_context(log: &Log) -> ApplicationContext {
    let context = ApplicationContext::new("lifecycle");
    let constructor_log = Arc::clone(log);
    context.register_type(
        BeanClass::builder::<Recorder>("Recorder")
            .constructor(Vec::new(), move |_| {
                Ok(Recorder {
                    log: Arc::clone(&constructor_log),
                    name: Mutex::new(String::new()),
                })
            })
            .method("custom_init", |r| {
                r.log.lock().push("custom_init".to_string());
                Ok(())
            })
            .method("custom_destroy", |r| {
                r.log.lock().push(format!("custom_destroy:{}", r.name.lock()));
                Ok(())
            })
            .bean_factory_aware()
            .type_registry_aware()
            .bean_name_aware()
            .initializing_bean()
            .disposable_bean()
            .build(),
    );
    context
}

#[test]
fn lifecycle_steps_run_in_documented_order() {
    let log: Log = Arc::default();
    let context = recorder_context(&log);
    context
        .register_bean_definition("recorder", BeanDefinition::new("Recorder").with_init_method("custom_init"))
        .unwrap();
    for (label, order) in [
        ("unordered", Order::Unordered),
        ("ordered", Order::Ordered(1)),
        ("priority", Order::PriorityOrdered(5)),
    ] {
        context.add_bean_post_processor(Arc::new(Marker {
            label,
            order,
            log: Arc::clone(&log),
        }));
    }

    context.refresh().unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "setBeanName:recorder",
            "setTypeRegistry",
            "setBeanFactory:self",
            "before:priority",
            "before:ordered",
            "before:unordered",
            "afterPropertiesSet",
            "custom_init",
            "after:priority",
            "after:ordered",
            "after:unordered",
        ]
    );
}

#[test]
fn destruction_runs_self_hook_then_named_method_in_reverse_order() {
    let log: Log = Arc::default();
    let context = recorder_context(&log);
    for name in ["first", "second"] {
        context
            .register_bean_definition(name, BeanDefinition::new("Recorder").with_destroy_method("custom_destroy"))
            .unwrap();
    }
    context.refresh().unwrap();
    log.lock().clear();

    context.close().unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "destroy:second",
            "custom_destroy:second",
            "destroy:first",
            "custom_destroy:first"
        ]
    );
    assert_eq!(context.status(), ContextStatus::Closed);
}

#[derive(Default)]
struct Student {
    age: Mutex<i64>,
}

struct SetAge {
    order: Order,
    age: i64,
}

impl BeanFactoryPostProcessor for SetAge {
    fn order(&self) -> Order {
        self.order
    }

    fn post_process_bean_factory(&self, registry: &mut dyn BeanDefinitionRegistry) -> Result<(), BoxError> {
        registry
            .bean_definition_mut("student")?
            .property_values
            .add("age", ValueSpec::literal(self.age));
        Ok(())
    }
}

/// 注册一个新的 Student 定义
struct AddStudent;

impl BeanFactoryPostProcessor for AddStudent {
    fn post_process_bean_factory(&self, _registry: &mut dyn BeanDefinitionRegistry) -> Result<(), BoxError> {
        Ok(())
    }
}

impl BeanDefinitionRegistryPostProcessor for AddStudent {
    fn post_process_definition_registry(&self, registry: &mut dyn BeanDefinitionRegistry) -> Result<(), BoxError> {
        registry.register_bean_definition(
            "added",
            BeanDefinition::new("Student").with_property("age", ValueSpec::literal(1)),
        )?;
        Ok(())
    }
}

fn student_context() -> ApplicationContext {
    let context = ApplicationContext::new("students");
    context.register_type(
        BeanClass::builder::<Student>("Student")
            .default_constructor()
            .property("age", ValueKind::Int, |s, v| {
                *s.age.lock() = v.into_i64()?;
                Ok(())
            })
            .build(),
    );
    context
        .register_bean_definition("student", BeanDefinition::new("Student").with_property("age", ValueSpec::literal(10)))
        .unwrap();
    context
}

#[test]
fn factory_post_processors_mutate_definitions_in_order() {
    let context = student_context();
    context.add_bean_factory_post_processor(Arc::new(SetAge {
        order: Order::Ordered(2),
        age: 30,
    }));
    context.add_bean_factory_post_processor(Arc::new(SetAge {
        order: Order::Ordered(1),
        age: 20,
    }));

    context.refresh().unwrap();

    assert_eq!(*context.get_bean_typed::<Student>("student").unwrap().age.lock(), 30);
}

#[test]
fn registry_post_processor_can_add_definitions() {
    let context = student_context();
    context.add_registry_post_processor(Arc::new(AddStudent));

    context.refresh().unwrap();

    assert_eq!(context.bean_definition_names(), vec!["student", "added"]);
    assert_eq!(*context.get_bean_typed::<Student>("added").unwrap().age.lock(), 1);
    assert_eq!(context.bean_factory().singleton_names(), vec!["student", "added"]);
}

#[test]
fn refresh_skips_lazy_and_prototype_definitions() {
    let context = student_context();
    context
        .register_bean_definition("lazy", BeanDefinition::new("Student").lazy())
        .unwrap();
    context
        .register_bean_definition(
            "proto",
            BeanDefinition::new("Student").with_scope(ioc_common::Scope::Prototype),
        )
        .unwrap();

    context.refresh().unwrap();

    assert_eq!(context.bean_factory().singleton_names(), vec!["student"]);
    context.get_bean("lazy").unwrap();
    assert!(context.bean_factory().contains_singleton("lazy"));
}

#[test]
fn second_refresh_is_rejected_and_singletons_survive() {
    let context = student_context();
    context.refresh().unwrap();
    let before = context.get_bean("student").unwrap();

    let err = context.refresh().unwrap_err();

    assert!(matches!(err, ContextError::AlreadyRefreshed { .. }));
    assert!(Arc::ptr_eq(&before, &context.get_bean("student").unwrap()));
}

struct Faulty {
    label: &'static str,
}

impl DisposableBean for Faulty {
    fn destroy(&self) -> Result<(), BoxError> {
        Err(format!("{} 无法释放", self.label).into())
    }
}

#[test]
fn close_reports_every_destruction_failure() {
    let context = ApplicationContext::new("faulty");
    context.register_type(
        BeanClass::builder::<Faulty>("Faulty")
            .constructor(vec![ValueKind::Str], |args| {
                let label = match args[0].as_str() {
                    Some("one") => "one",
                    _ => "two",
                };
                Ok(Faulty { label })
            })
            .disposable_bean()
            .build(),
    );
    for name in ["one", "two"] {
        context
            .register_bean_definition(name, BeanDefinition::new("Faulty").with_constructor_arg(ValueSpec::literal(name)))
            .unwrap();
    }
    context.refresh().unwrap();

    let err = context.close().unwrap_err();

    match err {
        ContextError::Destruction(errors) => {
            assert_eq!(errors.bean_names(), vec!["two", "one"]);
            assert!(errors.to_string().contains("one 无法释放"));
        }
        other => panic!("期望销毁错误, 实际: {other}"),
    }
    assert_eq!(context.status(), ContextStatus::Closed);
    assert!(context.bean_factory().singleton_names().is_empty());
}

#[test]
fn failing_factory_post_processor_aborts_refresh() {
    struct Broken;

    impl BeanFactoryPostProcessor for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn post_process_bean_factory(&self, _registry: &mut dyn BeanDefinitionRegistry) -> Result<(), BoxError> {
            Err("无法处理".into())
        }
    }

    let context = student_context();
    context.add_bean_factory_post_processor(Arc::new(Broken));
    context.add_bean_factory_post_processor(Arc::new(SetAge {
        order: Order::Unordered,
        age: 99,
    }));

    let err = context.refresh().unwrap_err();

    assert!(err.to_string().contains("broken"), "{err}");
    assert!(context.bean_factory().singleton_names().is_empty());
    assert_eq!(context.status(), ContextStatus::Closed);
}

/// 修改 student 的年龄并记录执行次数，执行较慢
struct SlowSetAge {
    calls: AtomicUsize,
}

impl BeanFactoryPostProcessor for SlowSetAge {
    fn post_process_bean_factory(&self, registry: &mut dyn BeanDefinitionRegistry) -> Result<(), BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        registry
            .bean_definition_mut("student")?
            .property_values
            .add("age", ValueSpec::literal(42));
        Ok(())
    }
}

#[test]
fn concurrent_refresh_runs_pipeline_once() {
    let context = student_context();
    let processor = Arc::new(SlowSetAge {
        calls: AtomicUsize::new(0),
    });
    context.add_bean_factory_post_processor(Arc::clone(&processor) as _);
    let barrier = Barrier::new(2);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    context.refresh()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(ContextError::AlreadyRefreshed { .. }))));
    assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(context.status(), ContextStatus::Active);
    assert_eq!(*context.get_bean_typed::<Student>("student").unwrap().age.lock(), 42);
}

#[test]
fn close_waits_for_refresh_in_progress() {
    let context = student_context();
    context.add_bean_factory_post_processor(Arc::new(SlowSetAge {
        calls: AtomicUsize::new(0),
    }));
    let barrier = Barrier::new(2);

    let (refreshed, closed) = thread::scope(|scope| {
        let refresh = scope.spawn(|| {
            barrier.wait();
            context.refresh()
        });
        let close = scope.spawn(|| {
            barrier.wait();
            thread::sleep(Duration::from_millis(10));
            context.close()
        });
        (refresh.join().unwrap(), close.join().unwrap())
    });

    assert!(closed.is_ok());
    assert_eq!(context.status(), ContextStatus::Closed);
    if refreshed.is_ok() {
        assert!(context.bean_factory().singleton_names().is_empty());
    } else {
        assert!(matches!(refreshed, Err(ContextError::Closed { .. })));
    }
}
