//! 示例后置处理器

use di_abstractions::{
    BeanDefinitionRegistry, BeanFactoryPostProcessor, BeanPostProcessor, BeanRef, Order, ValueSpec,
};
use ioc_common::BoxError;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// 修改 `studentService` 的姓名与年龄
pub struct AgeProcessorOne;

impl BeanFactoryPostProcessor for AgeProcessorOne {
    fn name(&self) -> &str {
        "AgeProcessorOne"
    }

    fn order(&self) -> Order {
        Order::Ordered(1)
    }

    fn post_process_bean_factory(&self, registry: &mut dyn BeanDefinitionRegistry) -> Result<(), BoxError> {
        info!("AgeProcessorOne 修改 studentService");
        registry
            .bean_definition_mut("studentService")?
            .property_values
            .add("name", ValueSpec::literal("along1"))
            .add("age", ValueSpec::literal(27));
        Ok(())
    }
}

/// 在 [`AgeProcessorOne`] 之后再次修改年龄
pub struct AgeProcessorTwo;

impl BeanFactoryPostProcessor for AgeProcessorTwo {
    fn name(&self) -> &str {
        "AgeProcessorTwo"
    }

    fn order(&self) -> Order {
        Order::Ordered(2)
    }

    fn post_process_bean_factory(&self, registry: &mut dyn BeanDefinitionRegistry) -> Result<(), BoxError> {
        info!("AgeProcessorTwo 修改 studentService");
        registry
            .bean_definition_mut("studentService")?
            .property_values
            .add("age", ValueSpec::literal(18));
        Ok(())
    }
}

/// 记录每个 Bean 的初始化过程
#[derive(Default)]
pub struct LoggingPostProcessor {
    initialized: AtomicUsize,
}

impl LoggingPostProcessor {
    pub fn initialized(&self) -> usize {
        self.initialized.load(Ordering::Relaxed)
    }
}

impl BeanPostProcessor for LoggingPostProcessor {
    fn name(&self) -> &str {
        "LoggingPostProcessor"
    }

    fn before_initialization(&self, bean: BeanRef, bean_name: &str) -> Result<BeanRef, BoxError> {
        info!("Bean [{}] 开始初始化", bean_name);
        Ok(bean)
    }

    fn after_initialization(&self, bean: BeanRef, bean_name: &str) -> Result<BeanRef, BoxError> {
        info!("Bean [{}] 完成初始化", bean_name);
        self.initialized.fetch_add(1, Ordering::Relaxed);
        Ok(bean)
    }
}
