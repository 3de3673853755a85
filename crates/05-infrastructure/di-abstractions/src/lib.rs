//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义 Bean 定义数据模型和容器各组件之间的接口。
//!
//! ## 核心接口
//!
//! - [`BeanDefinition`] / [`ValueSpec`] - 声明式的对象蓝图
//! - [`BeanClass`] / [`TypeRegistry`] - 代替反射的类型描述符
//! - [`BeanDefinitionRegistry`] - 定义注册表接口
//! - [`BeanFactory`] - Bean 工厂接口
//! - [`BeanPostProcessor`] / [`BeanFactoryPostProcessor`] - 扩展点
//! - [`ValueConverter`] - 字面量转换扩展点

pub mod aware;
pub mod class;
pub mod container;
pub mod definition;
pub mod factory;
pub mod processor;
pub mod registry;
pub mod resolver;
pub mod value;

pub use aware::*;
pub use class::*;
pub use container::*;
pub use definition::*;
pub use factory::*;
pub use processor::*;
pub use registry::*;
pub use resolver::*;
pub use value::*;
