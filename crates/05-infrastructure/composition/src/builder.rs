//! 上下文构建器

use crate::context::ApplicationContext;
use crate::error::ContextResult;
use crate::override_configurer::PropertyOverrideConfigurer;
use crate::settings::{ContextSettings, SettingsLoader};
use di_abstractions::{ContainerConfig, TypeRegistry};
use di_impl::DefaultBeanFactory;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 上下文构建器
///
/// 使用建造者模式从配置文件、环境变量与代码设置组装 [`ApplicationContext`]。
pub struct ContextBuilder {
    display_name: String,
    loader: SettingsLoader,
    container: Option<ContainerConfig>,
    types: Option<Arc<TypeRegistry>>,
    ignore_invalid_overrides: bool,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            display_name: "application".to_string(),
            loader: SettingsLoader::new(),
            container: None,
            types: None,
            ignore_invalid_overrides: false,
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// 添加 TOML 配置文件
    pub fn add_config_toml<P: AsRef<Path>>(mut self, path: P) -> ContextResult<Self> {
        self.loader.add_file(path)?;
        Ok(self)
    }

    /// 设置环境变量前缀
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.loader.set_env_prefix(Some(prefix.into()));
        self
    }

    /// 不读取环境变量
    pub fn without_env(mut self) -> Self {
        self.loader.set_env_prefix(None);
        self
    }

    /// 用代码中的容器配置代替配置文件中的 `container` 部分
    pub fn container_config(mut self, config: ContainerConfig) -> Self {
        self.container = Some(config);
        self
    }

    /// 共享已有的类型注册表
    pub fn type_registry(mut self, types: Arc<TypeRegistry>) -> Self {
        self.types = Some(types);
        self
    }

    /// 覆盖目标不存在时只记录警告
    pub fn ignore_invalid_overrides(mut self, ignore: bool) -> Self {
        self.ignore_invalid_overrides = ignore;
        self
    }

    /// 只加载配置，不创建上下文
    pub fn load_settings(&self) -> ContextResult<ContextSettings> {
        let mut settings = self.loader.load()?;
        if let Some(container) = &self.container {
            settings.container = container.clone();
        }
        Ok(settings)
    }

    pub fn build(self) -> ContextResult<ApplicationContext> {
        let settings = self.load_settings()?;
        info!("构建应用上下文: {}", self.display_name);
        let factory = match self.types {
            Some(types) => DefaultBeanFactory::with_type_registry(settings.container, types),
            None => DefaultBeanFactory::new(settings.container),
        };
        let context = ApplicationContext::with_factory(self.display_name, factory);

        if !settings.overrides.is_empty() {
            debug!("注册属性覆盖, 共 {} 个 Bean", settings.overrides.len());
            context.add_bean_factory_post_processor(Arc::new(
                PropertyOverrideConfigurer::new(settings.overrides).ignore_invalid_keys(self.ignore_invalid_overrides),
            ));
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContextStatus;
    use di_abstractions::{BeanClass, BeanDefinition, ValueKind, ValueSpec};
    use parking_lot::Mutex;
    use std::io::Write;
    use std::sync::Once;

    static INIT_LOGGER: Once = Once::new();

    /// 初始化测试日志系统（只初始化一次）
    fn init_test_logger() {
        INIT_LOGGER.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter("debug")
                .with_test_writer()
                .try_init()
                .ok();
        });
    }

    #[derive(Default)]
    struct Student {
        age: Mutex<i64>,
    }

    #[test]
    fn overrides_from_toml_are_applied_on_refresh() {
        init_test_logger();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[container]\nmax_creation_depth = 10\n\n[overrides.student]\nage = \"30\"").unwrap();

        let context = ContextBuilder::new()
            .display_name("students")
            .without_env()
            .add_config_toml(file.path())
            .unwrap()
            .build()
            .unwrap();
        context.register_type(
            BeanClass::builder::<Student>("Student")
                .default_constructor()
                .property("age", ValueKind::Int, |s, v| {
                    *s.age.lock() = v.into_i64()?;
                    Ok(())
                })
                .build(),
        );
        context
            .register_bean_definition("student", BeanDefinition::new("Student").with_property("age", ValueSpec::literal(10)))
            .unwrap();

        context.refresh().unwrap();

        assert_eq!(context.display_name(), "students");
        assert_eq!(context.bean_factory().config().max_creation_depth, 10);
        assert_eq!(*context.get_bean_typed::<Student>("student").unwrap().age.lock(), 30);
        assert_eq!(context.stats().factory_post_processors, 1);
        context.close().unwrap();
        assert_eq!(context.status(), ContextStatus::Closed);
    }

    #[test]
    fn code_config_wins_over_files() {
        let settings = ContextBuilder::new()
            .without_env()
            .container_config(ContainerConfig {
                allow_circular_references: false,
                ..ContainerConfig::default()
            })
            .load_settings()
            .unwrap();
        assert!(!settings.container.allow_circular_references);
    }

    #[test]
    fn missing_config_file_fails_early() {
        assert!(ContextBuilder::new().add_config_toml("/no/such/file.toml").is_err());
    }
}
