//! 默认 Bean 工厂
//!
//! 把定义注册表、单例缓存、实例构建、属性填充与生命周期编排串成 `get_bean` 的完整流程：
//!
//! 1. 查单例缓存（包括提前暴露的引用）
//! 2. 取合并后的定义，先创建 depends-on 中的 Bean
//! 3. 单例在缓存的创建锁内创建，原型直接创建
//! 4. 实例化 → 提前暴露引用 → 填充属性 → 生命周期 → 提升到完全初始化缓存

use crate::conversion::ConversionService;
use crate::creation::CreationTracker;
use crate::instance_builder::InstanceBuilder;
use crate::lifecycle::{apply_early_reference, DisposableAdapter, LifecycleOrchestrator};
use crate::populator::DependencyPopulator;
use crate::registry::DefaultDefinitionRegistry;
use crate::singleton_cache::SingletonCache;
use di_abstractions::{
    BeanClass, BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryHandle, BeanPostProcessor,
    BeanRef, ContainerConfig, ContainerStats, TypeRegistry, ValueConverter,
};
use ioc_common::{BeanError, BeanResult, DestructionErrors};
use parking_lot::RwLock;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

/// 除循环依赖之外的错误都由 `wrap` 包装，循环依赖原样向上传播
pub(crate) fn wrap_unless_circular(error: BeanError, wrap: impl FnOnce(BeanError) -> BeanError) -> BeanError {
    if matches!(error, BeanError::CircularDependency { .. }) {
        error
    } else {
        wrap(error)
    }
}

/// 默认 Bean 工厂
pub struct DefaultBeanFactory {
    config: ContainerConfig,
    registry: RwLock<DefaultDefinitionRegistry>,
    types: Arc<TypeRegistry>,
    conversion: Arc<ConversionService>,
    converter: RwLock<Arc<dyn ValueConverter>>,
    singletons: SingletonCache,
    tracker: CreationTracker,
    post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
    created_instances: AtomicUsize,
    creation_errors: AtomicUsize,
    inner_beans: AtomicUsize,
    self_ref: Weak<DefaultBeanFactory>,
}

impl DefaultBeanFactory {
    /// 创建使用独立类型注册表的工厂
    pub fn new(config: ContainerConfig) -> Arc<Self> {
        Self::with_type_registry(config, Arc::new(TypeRegistry::new()))
    }

    /// 创建共享给定类型注册表的工厂
    pub fn with_type_registry(config: ContainerConfig, types: Arc<TypeRegistry>) -> Arc<Self> {
        info!(
            "创建 Bean 工厂: 允许覆盖定义={}, 允许循环引用={}, 最大创建深度={}",
            config.allow_definition_overriding, config.allow_circular_references, config.max_creation_depth
        );
        Arc::new_cyclic(|self_ref| {
            let conversion = Arc::new(ConversionService::new());
            let converter: Arc<dyn ValueConverter> = conversion.clone();
            Self {
                registry: RwLock::new(DefaultDefinitionRegistry::new(&config)),
                tracker: CreationTracker::new(config.max_creation_depth),
                config,
                types,
                conversion,
                converter: RwLock::new(converter),
                singletons: SingletonCache::new(),
                post_processors: RwLock::new(Vec::new()),
                created_instances: AtomicUsize::new(0),
                creation_errors: AtomicUsize::new(0),
                inner_beans: AtomicUsize::new(0),
                self_ref: self_ref.clone(),
            }
        })
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// 注册类型描述符
    pub fn register_type(&self, class: BeanClass) -> Arc<BeanClass> {
        debug!("注册类型: {} ({})", class.name(), class.type_info().full_name);
        self.types.register(class)
    }

    /// 内置转换服务，可以注册自定义转换器
    pub fn conversion_service(&self) -> &Arc<ConversionService> {
        &self.conversion
    }

    /// 替换字面量转换器
    pub fn set_value_converter(&self, converter: Arc<dyn ValueConverter>) {
        *self.converter.write() = converter;
    }

    pub(crate) fn value_converter(&self) -> Arc<dyn ValueConverter> {
        Arc::clone(&self.converter.read())
    }

    /// 供 `BeanFactoryAware` 使用的弱引用句柄
    pub fn handle(&self) -> BeanFactoryHandle {
        let weak: Weak<dyn BeanFactory> = self.self_ref.clone();
        BeanFactoryHandle::new(weak)
    }

    // ---- 定义注册 ----

    pub fn register_bean_definition(&self, bean_name: &str, definition: BeanDefinition) -> BeanResult<()> {
        self.registry.write().register_bean_definition(bean_name, definition)
    }

    pub fn remove_bean_definition(&self, bean_name: &str) -> BeanResult<BeanDefinition> {
        self.registry.write().remove_bean_definition(bean_name)
    }

    pub fn register_alias(&self, bean_name: &str, alias: &str) -> BeanResult<()> {
        self.registry.write().register_alias(bean_name, alias)
    }

    pub fn contains_bean_definition(&self, bean_name: &str) -> bool {
        self.registry.read().contains_bean_definition(bean_name)
    }

    pub fn bean_definition_names(&self) -> Vec<String> {
        self.registry.read().bean_definition_names()
    }

    pub fn bean_definition_count(&self) -> usize {
        self.registry.read().bean_definition_count()
    }

    /// 注册时的原始定义（副本）
    pub fn bean_definition(&self, bean_name: &str) -> BeanResult<BeanDefinition> {
        self.registry.read().bean_definition(bean_name).cloned()
    }

    /// 合并父定义后用于构造的只读定义
    pub fn merged_bean_definition(&self, bean_name: &str) -> BeanResult<Arc<BeanDefinition>> {
        self.registry.read().merged_definition(bean_name)
    }

    pub fn canonical_name(&self, name: &str) -> String {
        self.registry.read().canonical_name(name)
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.registry.read().is_alias(name)
    }

    /// 在写锁内访问注册表，工厂后置处理器通过它修改定义
    pub fn with_registry_mut<R>(&self, f: impl FnOnce(&mut DefaultDefinitionRegistry) -> R) -> R {
        f(&mut self.registry.write())
    }

    /// 冻结定义，之后只能读取
    pub fn freeze_configuration(&self) {
        self.registry.write().freeze();
    }

    pub fn is_configuration_frozen(&self) -> bool {
        self.registry.read().is_frozen()
    }

    // ---- 单例与后置处理器 ----

    /// 直接注册外部创建的单例，不经过生命周期
    pub fn register_singleton(&self, bean_name: &str, bean: BeanRef) -> BeanResult<()> {
        self.singletons.register_singleton(bean_name, bean)
    }

    pub fn contains_singleton(&self, bean_name: &str) -> bool {
        self.singletons.contains_singleton(&self.canonical_name(bean_name))
    }

    /// 已完全初始化的单例名称，按完成顺序
    pub fn singleton_names(&self) -> Vec<String> {
        self.singletons.singleton_names()
    }

    /// 添加实例后置处理器
    ///
    /// 同一个处理器对象重复添加时移到末尾；列表按 [`Order`](di_abstractions::Order) 稳定排序。
    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.post_processors.write();
        processors.retain(|existing| !Arc::ptr_eq(existing, &processor));
        info!("添加 Bean 后置处理器: {} ({:?})", processor.name(), processor.order());
        processors.push(processor);
        processors.sort_by_key(|p| p.order());
    }

    pub fn bean_post_processor_count(&self) -> usize {
        self.post_processors.read().len()
    }

    pub(crate) fn bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.post_processors.read().clone()
    }

    /// `dependent` 依赖的 Bean 是 `bean_name` 时返回 `dependent`
    pub fn dependents_of(&self, bean_name: &str) -> Vec<String> {
        self.singletons.dependents_of(&self.canonical_name(bean_name))
    }

    pub fn dependencies_of(&self, bean_name: &str) -> Vec<String> {
        self.singletons.dependencies_of(&self.canonical_name(bean_name))
    }

    pub fn stats(&self) -> ContainerStats {
        let (registered_definitions, registered_aliases) = {
            let registry = self.registry.read();
            (registry.bean_definition_count(), registry.alias_count())
        };
        ContainerStats {
            registered_definitions,
            registered_aliases,
            active_singletons: self.singletons.singleton_count(),
            created_instances: self.created_instances.load(Ordering::Relaxed),
            early_references_resolved: self.singletons.early_references_resolved(),
            bean_post_processors: self.bean_post_processor_count(),
            creation_errors: self.creation_errors.load(Ordering::Relaxed),
        }
    }

    // ---- 获取与创建 ----

    /// 获取 Bean 并转换为具体类型
    pub fn get_bean_typed<T: Any + Send + Sync>(&self, bean_name: &str) -> BeanResult<Arc<T>> {
        self.do_get_bean(bean_name)?
            .downcast::<T>()
            .map_err(|bean| BeanError::TypeMismatch {
                bean_name: bean_name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                actual: self.describe_type(&bean),
            })
    }

    /// 按注册顺序创建全部非抽象、非延迟的单例
    pub fn pre_instantiate_singletons(&self) -> BeanResult<()> {
        let names = self.bean_definition_names();
        info!("预先实例化单例, 共 {} 个定义", names.len());
        for name in names {
            let definition = self.merged_bean_definition(&name)?;
            if definition.is_abstract || !definition.is_singleton() || definition.lazy_init {
                trace!("跳过 Bean '{}' 的预先实例化", name);
                continue;
            }
            self.do_get_bean(&name)?;
        }
        Ok(())
    }

    /// 按创建的逆序销毁全部单例，失败汇总返回
    pub fn destroy_singletons(&self) -> Result<(), DestructionErrors> {
        info!("销毁单例, 共 {} 个", self.singletons.singleton_count());
        let errors = self.singletons.destroy_singletons();
        if !errors.is_empty() {
            warn!("{} 个 Bean 销毁失败", errors.failures.len());
        }
        errors.into_result()
    }

    pub(crate) fn describe_type(&self, bean: &BeanRef) -> String {
        self.types
            .for_bean(bean)
            .map_or_else(|| "<未注册类型>".to_string(), |class| class.type_info().full_name.to_string())
    }

    fn do_get_bean(&self, name: &str) -> BeanResult<BeanRef> {
        let bean_name = self.canonical_name(name);
        if let Some(bean) = self.singletons.get_singleton(&bean_name, true)? {
            trace!("从单例缓存返回 Bean '{}'", bean_name);
            return Ok(bean);
        }

        let definition = self.merged_bean_definition(&bean_name)?;
        if definition.is_abstract {
            return Err(BeanError::BeanIsAbstract { bean_name });
        }

        for dependency in &definition.depends_on {
            let dependency = self.canonical_name(dependency);
            if self.singletons.is_dependent(&bean_name, &dependency) {
                warn!("Bean '{}' 与 '{}' 的 depends-on 形成环", bean_name, dependency);
                return Err(BeanError::CircularDependency {
                    path: vec![bean_name.clone(), dependency, bean_name.clone()],
                    bean_name,
                });
            }
            self.singletons.register_dependent(&dependency, &bean_name);
            self.do_get_bean(&dependency).map_err(|e| {
                wrap_unless_circular(e, |e| {
                    BeanError::creation(&bean_name, format!("依赖的 Bean '{dependency}' 创建失败"), e)
                })
            })?;
        }

        if definition.is_singleton() {
            self.singletons.get_or_create(
                &bean_name,
                || {
                    let error = self.tracker.cycle_error(&bean_name);
                    warn!("{}", error);
                    error
                },
                || self.create_bean(&bean_name, &definition),
            )
        } else {
            self.create_bean(&bean_name, &definition)
        }
    }

    /// 解析引用并记录依赖关系
    pub(crate) fn resolve_reference(&self, dependent: &str, target: &str) -> BeanResult<BeanRef> {
        let target_name = self.canonical_name(target);
        trace!(
            "Bean '{}' 引用 '{}', 当前创建: {:?}",
            dependent,
            target_name,
            self.tracker.current()
        );
        let bean = self.do_get_bean(&target_name)?;
        self.singletons.register_dependent(&target_name, dependent);
        Ok(bean)
    }

    /// 创建内嵌的匿名 Bean，不进入缓存
    pub(crate) fn create_inner_bean(&self, outer: &str, definition: &BeanDefinition) -> BeanResult<BeanRef> {
        let inner_name = format!("(inner bean)#{}", self.inner_beans.fetch_add(1, Ordering::Relaxed));
        trace!("为 Bean '{}' 创建内嵌 Bean '{}'", outer, inner_name);
        let merged = self.registry.read().merge_detached(&inner_name, definition)?;
        if merged.is_abstract {
            return Err(BeanError::BeanIsAbstract { bean_name: inner_name });
        }
        self.create_bean(&inner_name, &merged)
    }

    fn create_bean(&self, bean_name: &str, definition: &BeanDefinition) -> BeanResult<BeanRef> {
        let _guard = self.tracker.enter(bean_name, definition.is_prototype())?;
        debug!("创建 Bean '{}' ({})", bean_name, definition.effective_scope());
        let result = self.do_create_bean(bean_name, definition);
        match &result {
            Ok(_) => {
                self.created_instances.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.creation_errors.fetch_add(1, Ordering::Relaxed);
                debug!("Bean '{}' 创建失败: {}", bean_name, e);
            }
        }
        result
    }

    fn do_create_bean(&self, bean_name: &str, definition: &BeanDefinition) -> BeanResult<BeanRef> {
        let built = InstanceBuilder::new(self).build(bean_name, definition)?;
        trace!("Bean '{}' 已实例化 ({})", bean_name, built.descriptor);
        let raw = built.bean;
        let class = built.class;

        // 只有进入了单例缓存创建流程的 Bean 才会提前暴露和登记销毁
        let managed_singleton = definition.is_singleton() && self.singletons.is_in_creation(bean_name);
        let early_exposure = managed_singleton && self.config.allow_circular_references;
        if early_exposure {
            let processors = self.bean_post_processors();
            let name = bean_name.to_string();
            let early = raw.clone();
            self.singletons.register_early_thunk(
                bean_name,
                Box::new(move || -> BeanResult<BeanRef> { apply_early_reference(&processors, early, &name) }),
            )?;
            debug!("提前暴露 Bean '{}' 的引用", bean_name);
        }

        DependencyPopulator::new(self).populate(bean_name, &raw, class.as_deref(), definition)?;

        let processors = self.bean_post_processors();
        let handle = self.handle();
        let orchestrator = LifecycleOrchestrator::new(&processors, &self.types, &handle);
        let mut exposed = orchestrator.initialize(bean_name, raw.clone(), class.as_ref(), definition)?;

        if early_exposure {
            if let Some(early) = self.singletons.resolved_early_reference(bean_name) {
                if Arc::ptr_eq(&exposed, &raw) {
                    exposed = early;
                } else if !Arc::ptr_eq(&exposed, &early) {
                    let dependents = self.singletons.dependents_of(bean_name);
                    return Err(BeanError::creation_msg(
                        bean_name,
                        format!(
                            "Bean 的原始版本已作为循环引用注入给 [{}]，但最终被后置处理器替换",
                            dependents.join(", ")
                        ),
                    ));
                }
            }
        }

        if managed_singleton {
            if let Some(adapter) = DisposableAdapter::for_bean(bean_name, &raw, class.as_deref(), definition)? {
                self.singletons.register_disposable(bean_name, adapter);
            }
        }
        Ok(exposed)
    }
}

impl BeanFactory for DefaultBeanFactory {
    fn get_bean(&self, bean_name: &str) -> BeanResult<BeanRef> {
        self.do_get_bean(bean_name)
    }

    fn contains_bean(&self, bean_name: &str) -> bool {
        let canonical = self.canonical_name(bean_name);
        self.singletons.contains_singleton(&canonical) || self.contains_bean_definition(&canonical)
    }

    fn is_singleton(&self, bean_name: &str) -> BeanResult<bool> {
        let canonical = self.canonical_name(bean_name);
        if self.singletons.contains_singleton(&canonical) {
            return Ok(true);
        }
        Ok(self.merged_bean_definition(&canonical)?.is_singleton())
    }

    fn is_prototype(&self, bean_name: &str) -> BeanResult<bool> {
        let canonical = self.canonical_name(bean_name);
        if self.singletons.contains_singleton(&canonical) {
            return Ok(false);
        }
        Ok(self.merged_bean_definition(&canonical)?.is_prototype())
    }

    fn aliases(&self, bean_name: &str) -> Vec<String> {
        let registry = self.registry.read();
        registry.aliases_of(&registry.canonical_name(bean_name))
    }
}
