//! 示例 Bean 类型及其类型描述符

use di_abstractions::{
    BeanClass, BeanDefinition, BeanFactoryAware, BeanFactoryHandle, BeanNameAware, DisposableBean,
    InitializingBean, TypeRegistry, TypeRegistryAware, ValueKind, ValueSpec,
};
use ioc_common::BoxError;
use ioc_context::{ApplicationContext, ContextResult};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::info;

/// 学生信息服务
#[derive(Debug, Default)]
pub struct StudentService {
    pub name: Mutex<String>,
    pub age: Mutex<u32>,
}

impl StudentService {
    /// 从 `name,age` 形式的文本解析
    pub fn parse(text: &str) -> Result<Self, BoxError> {
        let (name, age) = text
            .split_once(',')
            .ok_or_else(|| format!("格式应为 name,age: {text}"))?;
        Ok(Self {
            name: Mutex::new(name.trim().to_string()),
            age: Mutex::new(age.trim().parse()?),
        })
    }
}

impl fmt::Display for StudentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StudentService{{name='{}', age={}}}", self.name.lock(), self.age.lock())
    }
}

/// 学生
#[derive(Debug, Default)]
pub struct Student {
    pub student_service: Mutex<Option<Arc<StudentService>>>,
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.student_service.lock().as_ref() {
            Some(service) => write!(f, "Student{{studentService={service}}}"),
            None => f.write_str("Student{studentService=null}"),
        }
    }
}

/// 汽车
#[derive(Debug, Clone)]
pub struct Car {
    pub brand: String,
    pub price: String,
}

impl Car {
    fn new(brand: &str, price: &str) -> Self {
        Self {
            brand: brand.to_string(),
            price: price.to_string(),
        }
    }
}

/// 静态工厂方法提供的汽车
pub struct StaticCarFactory;

impl StaticCarFactory {
    fn cars() -> &'static HashMap<&'static str, Arc<Car>> {
        static CARS: OnceLock<HashMap<&'static str, Arc<Car>>> = OnceLock::new();
        CARS.get_or_init(|| {
            HashMap::from([
                ("audi", Arc::new(Car::new("audi", "300000"))),
                ("bens", Arc::new(Car::new("bens", "400000"))),
            ])
        })
    }

    pub fn get_car(name: &str) -> Result<Arc<Car>, BoxError> {
        Self::cars()
            .get(name)
            .cloned()
            .ok_or_else(|| format!("没有名为 {name} 的汽车").into())
    }
}

/// 实例工厂方法提供的汽车
pub struct InstanceCarFactory {
    cars: HashMap<String, Arc<Car>>,
}

impl Default for InstanceCarFactory {
    fn default() -> Self {
        let cars = [("BMW", "500000"), ("Audi", "300000")]
            .into_iter()
            .map(|(brand, price)| (brand.to_string(), Arc::new(Car::new(brand, price))))
            .collect();
        Self { cars }
    }
}

impl InstanceCarFactory {
    pub fn get_car(&self, name: &str) -> Result<Arc<Car>, BoxError> {
        self.cars
            .get(name)
            .cloned()
            .ok_or_else(|| format!("没有名为 {name} 的汽车").into())
    }
}

/// 演示自身初始化钩子与命名初始化方法的先后顺序
#[derive(Debug, Default)]
pub struct InitializingDemo {
    pub name: Mutex<String>,
}

impl InitializingBean for InitializingDemo {
    fn after_properties_set(&self) -> Result<(), BoxError> {
        info!("InitializingDemo initializing...");
        *self.name.lock() = "hello - 2".to_string();
        Ok(())
    }
}

impl InitializingDemo {
    fn set_other_name(&self) {
        info!("InitializingDemo setOtherName");
        *self.name.lock() = "hello - 3".to_string();
    }
}

/// 接收名称、类型注册表与工厂句柄的 Bean
#[derive(Default)]
pub struct AwareDemo {
    pub bean_name: Mutex<String>,
    pub known_types: Mutex<usize>,
    pub factory: Mutex<Option<BeanFactoryHandle>>,
}

impl BeanNameAware for AwareDemo {
    fn set_bean_name(&self, bean_name: &str) {
        info!("调用了 set_bean_name");
        *self.bean_name.lock() = bean_name.to_string();
    }
}

impl TypeRegistryAware for AwareDemo {
    fn set_type_registry(&self, registry: Arc<TypeRegistry>) {
        info!("调用了 set_type_registry");
        *self.known_types.lock() = registry.len();
    }
}

impl BeanFactoryAware for AwareDemo {
    fn set_bean_factory(&self, factory: BeanFactoryHandle) -> Result<(), BoxError> {
        info!("调用了 set_bean_factory");
        *self.factory.lock() = Some(factory);
        Ok(())
    }
}

impl DisposableBean for AwareDemo {
    fn destroy(&self) -> Result<(), BoxError> {
        info!("销毁 {}", self.bean_name.lock());
        Ok(())
    }
}

/// 注册全部示例类型，并为 `StudentService` 注册字面量转换器
pub fn register_types(context: &ApplicationContext) {
    context
        .register_type(
            BeanClass::builder::<StudentService>("StudentService")
                .default_constructor()
                .property("name", ValueKind::Str, |s, v| {
                    *s.name.lock() = v.into_string()?;
                    Ok(())
                })
                .property("age", ValueKind::Int, |s, v| {
                    *s.age.lock() = v.into_u32()?;
                    Ok(())
                })
                .build(),
        )
        .register_type(
            BeanClass::builder::<Student>("Student")
                .default_constructor()
                .property("student_service", ValueKind::object::<StudentService>(), |s, v| {
                    *s.student_service.lock() = Some(v.into_bean::<StudentService>()?);
                    Ok(())
                })
                .build(),
        )
        .register_type(
            BeanClass::builder::<Car>("Car")
                .constructor(vec![ValueKind::Str, ValueKind::Str], |args| {
                    let mut args = args.into_iter();
                    let brand = args.next().ok_or("缺少 brand")?.into_string()?;
                    let price = args.next().ok_or("缺少 price")?.into_string()?;
                    Ok(Car { brand, price })
                })
                .build(),
        )
        .register_type(
            BeanClass::builder::<StaticCarFactory>("StaticCarFactory")
                .static_factory("get_car", vec![ValueKind::Str], |args| {
                    StaticCarFactory::get_car(args[0].as_str().ok_or("汽车名称应为字符串")?)
                })
                .build(),
        )
        .register_type(
            BeanClass::builder::<InstanceCarFactory>("InstanceCarFactory")
                .default_constructor()
                .factory_method("get_car", vec![ValueKind::Str], |factory, args| {
                    factory.get_car(args[0].as_str().ok_or("汽车名称应为字符串")?)
                })
                .build(),
        )
        .register_type(
            BeanClass::builder::<InitializingDemo>("InitializingDemo")
                .default_constructor()
                .property("name", ValueKind::Str, |d, v| {
                    *d.name.lock() = v.into_string()?;
                    Ok(())
                })
                .method("set_other_name", |d| {
                    d.set_other_name();
                    Ok(())
                })
                .initializing_bean()
                .build(),
        )
        .register_type(
            BeanClass::builder::<AwareDemo>("AwareDemo")
                .default_constructor()
                .bean_name_aware()
                .type_registry_aware()
                .bean_factory_aware()
                .disposable_bean()
                .build(),
        );

    context
        .bean_factory()
        .conversion_service()
        .add_converter(|literal: &JsonValue| -> Result<StudentService, BoxError> {
            let text = literal.as_str().ok_or("StudentService 需要字符串字面量")?;
            StudentService::parse(text)
        });
}

/// 注册示例 Bean 定义
pub fn register_definitions(context: &ApplicationContext) -> ContextResult<()> {
    context.register_bean_definition(
        "studentService",
        BeanDefinition::new("StudentService")
            .with_property("name", ValueSpec::literal("along"))
            .with_property("age", ValueSpec::literal(25))
            .with_alias("studentInfo"),
    )?;
    context.register_bean_definition(
        "student",
        BeanDefinition::new("Student").with_property("student_service", ValueSpec::reference("studentService")),
    )?;
    context.register_bean_definition(
        "inlineStudent",
        BeanDefinition::new("Student").with_property("student_service", ValueSpec::literal("Jack, 30")),
    )?;
    context.register_bean_definition(
        "audi",
        BeanDefinition::new("StaticCarFactory")
            .with_factory_method("get_car")
            .with_constructor_arg(ValueSpec::literal("audi")),
    )?;
    context.register_bean_definition("carFactory", BeanDefinition::new("InstanceCarFactory"))?;
    context.register_bean_definition(
        "tesla",
        BeanDefinition::new("Car")
            .with_constructor_arg(ValueSpec::literal("tesla"))
            .with_constructor_arg(ValueSpec::literal(350_000)),
    )?;
    context.register_bean_definition(
        "bmw",
        BeanDefinition::from_factory_bean("carFactory", "get_car").with_constructor_arg(ValueSpec::literal("BMW")),
    )?;
    context.register_bean_definition(
        "initializingDemo",
        BeanDefinition::new("InitializingDemo")
            .with_property("name", ValueSpec::literal("hello - 1"))
            .with_init_method("set_other_name"),
    )?;
    context.register_bean_definition(
        "awareDemo",
        BeanDefinition::new("AwareDemo").with_depends_on("student"),
    )?;
    Ok(())
}
