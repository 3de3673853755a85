//! 工厂后置处理器管线
//!
//! 在任何 Bean 实例化之前修改定义注册表。执行顺序：
//!
//! 1. 注册表处理器的 `post_process_definition_registry`（按 [`Order`](di_abstractions::Order) 排序）
//! 2. 注册表处理器的 `post_process_bean_factory`
//! 3. 普通工厂处理器的 `post_process_bean_factory`（按顺序排序）
//!
//! 任一处理器失败时立即停止。

use di_abstractions::{
    sort_by_order, BeanDefinitionRegistry, BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor,
    FactoryPostProcessor,
};
use ioc_common::{BeanError, BeanResult, BoxError};
use std::sync::Arc;
use tracing::{debug, info};

/// 工厂后置处理器管线
#[derive(Default)]
pub struct FactoryPostProcessorPipeline {
    processors: Vec<FactoryPostProcessor>,
}

impl FactoryPostProcessorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加处理器，同一个处理器对象只保留一份
    pub fn add(&mut self, processor: FactoryPostProcessor) {
        if self.processors.iter().any(|existing| existing.same_as(&processor)) {
            debug!("工厂后置处理器已存在, 忽略: {}", processor.name());
            return;
        }
        info!("添加工厂后置处理器: {} ({:?})", processor.name(), processor.order());
        self.processors.push(processor);
    }

    pub fn add_registry_processor(&mut self, processor: Arc<dyn BeanDefinitionRegistryPostProcessor>) {
        self.add(FactoryPostProcessor::Registry(processor));
    }

    pub fn add_factory_processor(&mut self, processor: Arc<dyn BeanFactoryPostProcessor>) {
        self.add(FactoryPostProcessor::Factory(processor));
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// 按固定顺序执行全部处理器
    pub fn apply(&self, registry: &mut dyn BeanDefinitionRegistry) -> BeanResult<()> {
        let mut registry_processors: Vec<&Arc<dyn BeanDefinitionRegistryPostProcessor>> = Vec::new();
        let mut factory_processors: Vec<&Arc<dyn BeanFactoryPostProcessor>> = Vec::new();
        for processor in &self.processors {
            match processor {
                FactoryPostProcessor::Registry(p) => registry_processors.push(p),
                FactoryPostProcessor::Factory(p) => factory_processors.push(p),
            }
        }
        sort_by_order(&mut registry_processors, |p| p.order());
        sort_by_order(&mut factory_processors, |p| p.order());

        info!(
            "执行工厂后置处理器: 注册表处理器 {} 个, 工厂处理器 {} 个",
            registry_processors.len(),
            factory_processors.len()
        );

        for processor in &registry_processors {
            debug!("执行注册表后置处理器: {}", processor.name());
            processor
                .post_process_definition_registry(registry)
                .map_err(|e| pipeline_error(processor.name(), e))?;
        }
        for processor in &registry_processors {
            processor
                .post_process_bean_factory(registry)
                .map_err(|e| pipeline_error(processor.name(), e))?;
        }
        for processor in &factory_processors {
            debug!("执行工厂后置处理器: {}", processor.name());
            processor
                .post_process_bean_factory(registry)
                .map_err(|e| pipeline_error(processor.name(), e))?;
        }
        Ok(())
    }
}

fn pipeline_error(processor: &str, source: BoxError) -> BeanError {
    BeanError::PostProcessor {
        processor: processor.to_string(),
        bean_name: None,
        source,
    }
}
