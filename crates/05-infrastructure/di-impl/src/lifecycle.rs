//! 生命周期编排
//!
//! 单个实例严格按以下顺序推进，缺少对应钩子的步骤直接跳过：
//! `Instantiated → CapabilitiesInjected → PreInitialized → Initialized → PostInitialized`。
//! `Active` 由单例缓存在提升时完成，`Destroyed` 只在容器关闭时由 [`DisposableAdapter`] 完成。

use di_abstractions::{
    BeanClass, BeanDefinition, BeanFactoryHandle, BeanPostProcessor, BeanRef, CapabilityHook,
    MethodFn, TypeRegistry,
};
use ioc_common::{BeanError, BeanResult, DestructionErrors, LifecycleState};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// 依次调用后置处理器的提前引用钩子
pub(crate) fn apply_early_reference(
    processors: &[Arc<dyn BeanPostProcessor>],
    bean: BeanRef,
    bean_name: &str,
) -> BeanResult<BeanRef> {
    let mut current = bean;
    for processor in processors {
        current = processor
            .early_reference(current, bean_name)
            .map_err(|source| BeanError::PostProcessor {
                processor: processor.name().to_string(),
                bean_name: Some(bean_name.to_string()),
                source,
            })?;
    }
    Ok(current)
}

struct Progress<'a> {
    bean_name: &'a str,
    state: LifecycleState,
}

impl Progress<'_> {
    fn advance(&mut self, next: LifecycleState) {
        debug_assert!(self.state.can_advance_to(next), "{} -> {}", self.state, next);
        trace!("Bean '{}' 生命周期: {} -> {}", self.bean_name, self.state, next);
        self.state = next;
    }
}

/// 生命周期编排器
pub(crate) struct LifecycleOrchestrator<'a> {
    processors: &'a [Arc<dyn BeanPostProcessor>],
    types: &'a Arc<TypeRegistry>,
    factory: &'a BeanFactoryHandle,
}

impl<'a> LifecycleOrchestrator<'a> {
    pub(crate) fn new(
        processors: &'a [Arc<dyn BeanPostProcessor>],
        types: &'a Arc<TypeRegistry>,
        factory: &'a BeanFactoryHandle,
    ) -> Self {
        Self {
            processors,
            types,
            factory,
        }
    }

    /// 对已填充属性的实例执行能力注入、初始化前处理、初始化与初始化后处理
    ///
    /// 返回最终暴露的对象，可能是后置处理器替换后的对象。
    pub(crate) fn initialize(
        &self,
        bean_name: &str,
        raw: BeanRef,
        class: Option<&Arc<BeanClass>>,
        definition: &BeanDefinition,
    ) -> BeanResult<BeanRef> {
        let mut progress = Progress {
            bean_name,
            state: LifecycleState::Instantiated,
        };

        if let Some(class) = class {
            self.inject_capabilities(bean_name, &raw, class)?;
        }
        progress.advance(LifecycleState::CapabilitiesInjected);

        let mut current = raw.clone();
        for processor in self.processors {
            current = processor
                .before_initialization(current, bean_name)
                .map_err(|source| self.processor_error(processor.as_ref(), bean_name, source))?;
        }
        progress.advance(LifecycleState::PreInitialized);

        let current_class = if Arc::ptr_eq(&current, &raw) {
            class.cloned()
        } else {
            debug!("Bean '{}' 在初始化前被替换", bean_name);
            self.types.for_bean(&current)
        };
        self.invoke_init_methods(bean_name, &current, current_class.as_deref(), definition)?;
        progress.advance(LifecycleState::Initialized);

        for processor in self.processors {
            current = processor
                .after_initialization(current, bean_name)
                .map_err(|source| self.processor_error(processor.as_ref(), bean_name, source))?;
        }
        progress.advance(LifecycleState::PostInitialized);
        Ok(current)
    }

    fn processor_error(
        &self,
        processor: &dyn BeanPostProcessor,
        bean_name: &str,
        source: ioc_common::BoxError,
    ) -> BeanError {
        BeanError::PostProcessor {
            processor: processor.name().to_string(),
            bean_name: Some(bean_name.to_string()),
            source,
        }
    }

    /// 按固定顺序注入名称、类型注册表与 Bean 工厂
    fn inject_capabilities(&self, bean_name: &str, bean: &BeanRef, class: &BeanClass) -> BeanResult<()> {
        for (capability, hook) in class.capabilities() {
            trace!("向 Bean '{}' 注入 {}", bean_name, capability);
            let result = match hook {
                CapabilityHook::BeanName(inject) => inject(bean, bean_name),
                CapabilityHook::TypeRegistry(inject) => inject(bean, Arc::clone(self.types)),
                CapabilityHook::BeanFactory(inject) => inject(bean, self.factory.clone()),
            };
            result.map_err(|e| BeanError::creation(bean_name, format!("{capability} 注入失败"), e))?;
        }
        Ok(())
    }

    /// 先调用自身初始化钩子，再调用命名初始化方法
    fn invoke_init_methods(
        &self,
        bean_name: &str,
        bean: &BeanRef,
        class: Option<&BeanClass>,
        definition: &BeanDefinition,
    ) -> BeanResult<()> {
        if let Some(initializer) = class.and_then(BeanClass::initializer) {
            debug!("调用 Bean '{}' 的 afterPropertiesSet", bean_name);
            initializer(bean).map_err(|e| BeanError::creation(bean_name, "afterPropertiesSet 执行失败", e))?;
        }
        if let Some(method_name) = &definition.init_method_name {
            let method = class
                .and_then(|class| class.method(method_name))
                .ok_or_else(|| BeanError::creation_msg(bean_name, format!("找不到初始化方法 '{method_name}'")))?;
            debug!("调用 Bean '{}' 的初始化方法 '{}'", bean_name, method_name);
            method(bean).map_err(|e| {
                BeanError::creation(bean_name, format!("初始化方法 '{method_name}' 执行失败"), e)
            })?;
        }
        Ok(())
    }
}

/// 单例的销毁回调
pub(crate) struct DisposableAdapter {
    bean_name: String,
    bean: BeanRef,
    disposer: Option<MethodFn>,
    destroy_method: Option<(String, MethodFn)>,
}

impl DisposableAdapter {
    /// 实例声明了销毁钩子或定义指定了销毁方法时返回适配器
    pub(crate) fn for_bean(
        bean_name: &str,
        bean: &BeanRef,
        class: Option<&BeanClass>,
        definition: &BeanDefinition,
    ) -> BeanResult<Option<Self>> {
        let disposer = class.and_then(BeanClass::disposer).cloned();
        let destroy_method = match &definition.destroy_method_name {
            Some(method_name) => {
                let method = class
                    .and_then(|class| class.method(method_name))
                    .cloned()
                    .ok_or_else(|| {
                        BeanError::creation_msg(bean_name, format!("找不到销毁方法 '{method_name}'"))
                    })?;
                Some((method_name.clone(), method))
            }
            None => None,
        };
        if disposer.is_none() && destroy_method.is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            bean_name: bean_name.to_string(),
            bean: bean.clone(),
            disposer,
            destroy_method,
        }))
    }

    /// 先调用自身销毁钩子，再调用命名销毁方法；失败记录后继续
    pub(crate) fn destroy(self, errors: &mut DestructionErrors) {
        if let Some(disposer) = &self.disposer {
            debug!("调用 Bean '{}' 的 destroy", self.bean_name);
            if let Err(e) = disposer(&self.bean) {
                warn!("Bean '{}' 销毁失败: {}", self.bean_name, e);
                errors.push(self.bean_name.clone(), e);
            }
        }
        if let Some((method_name, method)) = &self.destroy_method {
            debug!("调用 Bean '{}' 的销毁方法 '{}'", self.bean_name, method_name);
            if let Err(e) = method(&self.bean) {
                warn!("Bean '{}' 的销毁方法 '{}' 执行失败: {}", self.bean_name, method_name, e);
                errors.push(self.bean_name.clone(), e);
            }
        }
        trace!("Bean '{}' 生命周期: {}", self.bean_name, LifecycleState::Destroyed);
    }
}
