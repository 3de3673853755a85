//! # IoC Common
//!
//! 这个 crate 提供了 Lorn IoC 容器各层共享的基础类型。
//!
//! ## 核心内容
//!
//! - [`BeanError`] - 容器错误分类
//! - [`DestructionErrors`] - 关闭阶段的聚合错误报告
//! - [`Scope`] - Bean 作用域
//! - [`LifecycleState`] - 单个实例的生命周期状态机
//! - [`TypeInfo`] - 类型元数据
//!
//! ## 设计原则
//!
//! - 所有错误都携带产生错误的 Bean 名称
//! - 同步构造，错误通过 `Result` 显式传播

pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
