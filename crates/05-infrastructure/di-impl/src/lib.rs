//! # 依赖注入具体实现
//!
//! 提供 Bean 工厂、定义注册表、单例缓存与工厂后置处理器管线的默认实现。
//!
//! ## 组成
//!
//! - [`DefaultBeanFactory`] - `get_bean` 的完整创建流程
//! - [`DefaultDefinitionRegistry`] - 定义与别名存储，带合并定义缓存
//! - [`SingletonCache`] - 三级单例缓存，支持提前暴露引用
//! - [`ConversionService`] - 字面量转换
//! - [`FactoryPostProcessorPipeline`] - 实例化之前修改定义

mod creation;
mod instance_builder;
mod lifecycle;
mod populator;

pub mod conversion;
pub mod factory;
pub mod pipeline;
pub mod registry;
pub mod singleton_cache;

pub use conversion::ConversionService;
pub use factory::DefaultBeanFactory;
pub use pipeline::FactoryPostProcessorPipeline;
pub use registry::DefaultDefinitionRegistry;
pub use singleton_cache::SingletonCache;
