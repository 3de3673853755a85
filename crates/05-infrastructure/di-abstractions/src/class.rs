//! 类型描述符
//!
//! 容器不做反射：每个可构造的类型向 [`TypeRegistry`] 提供一个 [`BeanClass`]，
//! 其中登记了构造器、工厂方法、setter、命名方法以及实现了哪些能力 trait。
//! [`BeanClassBuilder`] 负责把强类型的闭包包装成统一签名。

use crate::aware::{
    BeanFactoryAware, BeanNameAware, Capability, DisposableBean, InitializingBean, TypeRegistryAware,
};
use crate::factory::BeanFactoryHandle;
use crate::value::{bean_type_id, BeanRef, Value, ValueKind};
use ioc_common::{BoxError, TypeInfo};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 以已解析参数产生实例（构造器或静态工厂方法）
pub type ConstructorFn = Arc<dyn Fn(Vec<Value>) -> Result<BeanRef, BoxError> + Send + Sync>;

/// 在工厂实例上调用方法产生实例
pub type InstanceFactoryFn = Arc<dyn Fn(&BeanRef, Vec<Value>) -> Result<BeanRef, BoxError> + Send + Sync>;

/// 无参实例方法（初始化、销毁）
pub type MethodFn = Arc<dyn Fn(&BeanRef) -> Result<(), BoxError> + Send + Sync>;

/// 属性 setter
pub type SetterFn = Arc<dyn Fn(&BeanRef, Value) -> Result<(), BoxError> + Send + Sync>;

/// 可调用的构造器或工厂方法
#[derive(Clone)]
pub struct Executable<F> {
    /// 声明的参数类型，按位置对应构造参数
    pub params: Vec<ValueKind>,
    pub invoke: F,
}

impl<F> Executable<F> {
    /// 声明了具体类型的参数个数，用于同参数数量时的择优
    pub fn typed_param_count(&self) -> usize {
        self.params.iter().filter(|kind| kind.is_typed()).count()
    }
}

/// 属性描述
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub kind: ValueKind,
    pub setter: SetterFn,
}

/// 能力注入函数
#[derive(Clone)]
pub enum CapabilityHook {
    BeanName(Arc<dyn Fn(&BeanRef, &str) -> Result<(), BoxError> + Send + Sync>),
    TypeRegistry(Arc<dyn Fn(&BeanRef, Arc<TypeRegistry>) -> Result<(), BoxError> + Send + Sync>),
    BeanFactory(Arc<dyn Fn(&BeanRef, BeanFactoryHandle) -> Result<(), BoxError> + Send + Sync>),
}

/// 单个类型的描述符
#[derive(Clone)]
pub struct BeanClass {
    name: String,
    type_info: TypeInfo,
    constructors: Vec<Executable<ConstructorFn>>,
    static_factories: HashMap<String, Vec<Executable<ConstructorFn>>>,
    instance_factories: HashMap<String, Vec<Executable<InstanceFactoryFn>>>,
    properties: HashMap<String, PropertyDescriptor>,
    methods: HashMap<String, MethodFn>,
    capabilities: BTreeMap<Capability, CapabilityHook>,
    initializer: Option<MethodFn>,
    disposer: Option<MethodFn>,
}

impl BeanClass {
    /// 为类型 `T` 开始构建描述符，`name` 是定义中 `bean_class` 引用的名称
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> BeanClassBuilder<T> {
        BeanClassBuilder {
            class: Self {
                name: name.into(),
                type_info: TypeInfo::of::<T>(),
                constructors: Vec::new(),
                static_factories: HashMap::new(),
                instance_factories: HashMap::new(),
                properties: HashMap::new(),
                methods: HashMap::new(),
                capabilities: BTreeMap::new(),
                initializer: None,
                disposer: None,
            },
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn constructors(&self) -> &[Executable<ConstructorFn>] {
        &self.constructors
    }

    pub fn static_factories(&self, method: &str) -> &[Executable<ConstructorFn>] {
        self.static_factories.get(method).map_or(&[], Vec::as_slice)
    }

    pub fn instance_factories(&self, method: &str) -> &[Executable<InstanceFactoryFn>] {
        self.instance_factories.get(method).map_or(&[], Vec::as_slice)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodFn> {
        self.methods.get(name)
    }

    /// 按固定顺序迭代已声明的能力
    pub fn capabilities(&self) -> impl Iterator<Item = (Capability, &CapabilityHook)> {
        self.capabilities.iter().map(|(capability, hook)| (*capability, hook))
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains_key(&capability)
    }

    /// `InitializingBean` 钩子
    pub fn initializer(&self) -> Option<&MethodFn> {
        self.initializer.as_ref()
    }

    /// `DisposableBean` 钩子
    pub fn disposer(&self) -> Option<&MethodFn> {
        self.disposer.as_ref()
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut properties: Vec<_> = self.properties.keys().collect();
        properties.sort();
        f.debug_struct("BeanClass")
            .field("name", &self.name)
            .field("type", &self.type_info.full_name)
            .field("constructors", &self.constructors.len())
            .field("properties", &properties)
            .field("capabilities", &self.capabilities.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn downcast<T: Any>(bean: &BeanRef) -> Result<&T, BoxError> {
    bean.downcast_ref::<T>().ok_or_else(|| {
        format!("实例不是 {}", std::any::type_name::<T>()).into()
    })
}

/// 强类型的描述符构建器
pub struct BeanClassBuilder<T> {
    class: BeanClass,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> BeanClassBuilder<T> {
    /// 声明构造器
    pub fn constructor<F>(mut self, params: Vec<ValueKind>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.class.constructors.push(Executable {
            params,
            invoke: Arc::new(move |args: Vec<Value>| -> Result<BeanRef, BoxError> {
                Ok(Arc::new(f(args)?) as BeanRef)
            }),
        });
        self
    }

    /// 以 `Default` 作为无参构造器
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(Vec::new(), |_| Ok(T::default()))
    }

    /// 声明静态工厂方法，产物可以是任意类型
    pub fn static_factory<R, F>(mut self, method: impl Into<String>, params: Vec<ValueKind>, f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(Vec<Value>) -> Result<Arc<R>, BoxError> + Send + Sync + 'static,
    {
        self.class
            .static_factories
            .entry(method.into())
            .or_default()
            .push(Executable {
                params,
                invoke: Arc::new(move |args: Vec<Value>| -> Result<BeanRef, BoxError> { Ok(f(args)? as BeanRef) }),
            });
        self
    }

    /// 声明实例工厂方法
    pub fn factory_method<R, F>(mut self, method: impl Into<String>, params: Vec<ValueKind>, f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&T, Vec<Value>) -> Result<Arc<R>, BoxError> + Send + Sync + 'static,
    {
        self.class
            .instance_factories
            .entry(method.into())
            .or_default()
            .push(Executable {
                params,
                invoke: Arc::new(move |bean: &BeanRef, args: Vec<Value>| -> Result<BeanRef, BoxError> {
                    Ok(f(downcast::<T>(bean)?, args)? as BeanRef)
                }),
            });
        self
    }

    /// 声明可注入的属性
    pub fn property<F>(mut self, name: impl Into<String>, kind: ValueKind, f: F) -> Self
    where
        F: Fn(&T, Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.class.properties.insert(
            name.into(),
            PropertyDescriptor {
                kind,
                setter: Arc::new(move |bean: &BeanRef, value: Value| f(downcast::<T>(bean)?, value)),
            },
        );
        self
    }

    /// 声明可按名称调用的无参方法（命名初始化/销毁方法）
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.class
            .methods
            .insert(name.into(), Arc::new(move |bean: &BeanRef| f(downcast::<T>(bean)?)));
        self
    }

    pub fn bean_name_aware(mut self) -> Self
    where
        T: BeanNameAware,
    {
        self.class.capabilities.insert(
            Capability::BeanName,
            CapabilityHook::BeanName(Arc::new(|bean: &BeanRef, name: &str| {
                downcast::<T>(bean)?.set_bean_name(name);
                Ok(())
            })),
        );
        self
    }

    pub fn type_registry_aware(mut self) -> Self
    where
        T: TypeRegistryAware,
    {
        self.class.capabilities.insert(
            Capability::TypeRegistry,
            CapabilityHook::TypeRegistry(Arc::new(|bean: &BeanRef, registry: Arc<TypeRegistry>| {
                downcast::<T>(bean)?.set_type_registry(registry);
                Ok(())
            })),
        );
        self
    }

    pub fn bean_factory_aware(mut self) -> Self
    where
        T: BeanFactoryAware,
    {
        self.class.capabilities.insert(
            Capability::BeanFactory,
            CapabilityHook::BeanFactory(Arc::new(|bean: &BeanRef, factory: BeanFactoryHandle| {
                downcast::<T>(bean)?.set_bean_factory(factory)
            })),
        );
        self
    }

    pub fn initializing_bean(mut self) -> Self
    where
        T: InitializingBean,
    {
        self.class.initializer = Some(Arc::new(|bean: &BeanRef| downcast::<T>(bean)?.after_properties_set()));
        self
    }

    pub fn disposable_bean(mut self) -> Self
    where
        T: DisposableBean,
    {
        self.class.disposer = Some(Arc::new(|bean: &BeanRef| downcast::<T>(bean)?.destroy()));
        self
    }

    pub fn build(self) -> BeanClass {
        self.class
    }
}

#[derive(Default)]
struct TypeRegistryInner {
    by_name: HashMap<String, Arc<BeanClass>>,
    by_type: HashMap<TypeId, Arc<BeanClass>>,
}

/// 类型注册表
///
/// 按名称（定义中的 `bean_class`）与 `TypeId`（已创建实例的具体类型）两种方式查找描述符。
#[derive(Default)]
pub struct TypeRegistry {
    inner: RwLock<TypeRegistryInner>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册描述符，同名或同类型的旧描述符被替换
    pub fn register(&self, class: BeanClass) -> Arc<BeanClass> {
        let class = Arc::new(class);
        let mut inner = self.inner.write();
        inner.by_name.insert(class.name.clone(), Arc::clone(&class));
        inner.by_type.insert(class.type_info.id, Arc::clone(&class));
        class
    }

    pub fn get(&self, name: &str) -> Option<Arc<BeanClass>> {
        self.inner.read().by_name.get(name).cloned()
    }

    pub fn for_type_id(&self, type_id: TypeId) -> Option<Arc<BeanClass>> {
        self.inner.read().by_type.get(&type_id).cloned()
    }

    /// 查找实例具体类型的描述符
    pub fn for_bean(&self, bean: &BeanRef) -> Option<Arc<BeanClass>> {
        self.for_type_id(bean_type_id(bean))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    /// 已注册的类型名称（排序后）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.inner.read().by_name.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry").field("types", &self.names()).finish()
    }
}
