//! # 应用上下文
//!
//! 这个 crate 把 Bean 工厂组合成一个带启动与关闭流程的应用上下文。
//!
//! ## 主要功能
//!
//! - **上下文构建器**: 从 TOML 文件与环境变量加载容器配置
//! - **刷新编排**: 工厂后置处理器 → 冻结定义 → 预先实例化单例
//! - **属性覆盖**: 用配置中的 `[overrides.<bean>]` 覆盖定义中的属性
//! - **关闭**: 按创建的逆序销毁单例并汇总失败
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_abstractions::{BeanClass, BeanDefinition, ValueKind, ValueSpec};
//! use ioc_context::ContextBuilder;
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct Greeter {
//!     greeting: Mutex<String>,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = ContextBuilder::new()
//!         .display_name("demo")
//!         .add_config_toml("config/app.toml")?
//!         .build()?;
//!
//!     context.register_type(
//!         BeanClass::builder::<Greeter>("Greeter")
//!             .default_constructor()
//!             .property("greeting", ValueKind::Str, |g, v| {
//!                 *g.greeting.lock().map_err(|e| e.to_string())? = v.into_string()?;
//!                 Ok(())
//!             })
//!             .build(),
//!     );
//!     context.register_bean_definition(
//!         "greeter",
//!         BeanDefinition::new("Greeter").with_property("greeting", ValueSpec::literal("hello")),
//!     )?;
//!
//!     context.refresh()?;
//!     let greeter = context.get_bean_typed::<Greeter>("greeter")?;
//!     println!("{}", greeter.greeting.lock().map_err(|e| e.to_string())?);
//!     context.close()?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod override_configurer;
pub mod settings;

pub use builder::ContextBuilder;
pub use context::{ApplicationContext, ContextStats, ContextStatus};
pub use error::{ContextError, ContextResult};
pub use override_configurer::PropertyOverrideConfigurer;
pub use settings::{ContextSettings, SettingsLoader};
