//! 上下文配置加载
//!
//! 配置来源按优先级从低到高：默认值 → TOML 文件（按添加顺序）→ 环境变量。
//!
//! ```toml
//! [container]
//! allow_circular_references = false
//! max_creation_depth = 50
//!
//! [overrides.student]
//! age = 20
//! ```
//!
//! 环境变量使用前缀与 `__` 分隔，例如 `IOC__CONTAINER__MAX_CREATION_DEPTH=50`、
//! `IOC__OVERRIDES__STUDENT__AGE=30`。环境变量的键会被转为小写，
//! 例如 `IOC__OVERRIDES__STUDENTSERVICE__AGE` 得到 `studentservice.age`；
//! 属性覆盖按忽略大小写匹配 Bean 名称与属性名，因此仍能作用于 `studentService`。

use crate::error::{ContextError, ContextResult};
use di_abstractions::ContainerConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "IOC";

/// 环境变量层级分隔符
pub const ENV_SEPARATOR: &str = "__";

/// 上下文配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// 容器行为配置
    pub container: ContainerConfig,
    /// Bean 名称 -> 属性名 -> 覆盖值
    pub overrides: BTreeMap<String, BTreeMap<String, JsonValue>>,
}

/// 配置加载器
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    files: Vec<PathBuf>,
    env_prefix: Option<String>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        }
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加 TOML 配置文件，文件必须存在
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> ContextResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ContextError::ConfigFileMissing {
                path: path.to_path_buf(),
            });
        }
        info!("添加 TOML 配置文件: {}", path.display());
        self.files.push(path.to_path_buf());
        Ok(())
    }

    /// 设置环境变量前缀，`None` 表示不读取环境变量
    pub fn set_env_prefix(&mut self, prefix: Option<String>) {
        self.env_prefix = prefix;
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn load(&self) -> ContextResult<ContextSettings> {
        let mut builder = config::Config::builder();
        for path in &self.files {
            builder = builder.add_source(config::File::from(path.as_path()).format(config::FileFormat::Toml));
        }
        if let Some(prefix) = &self.env_prefix {
            debug!("读取环境变量配置, 前缀: {}", prefix);
            builder = builder.add_source(
                config::Environment::with_prefix(prefix)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }
        let settings: ContextSettings = builder.build()?.try_deserialize()?;
        debug!(
            "配置加载完成: {:?}, 覆盖 {} 个 Bean",
            settings.container,
            settings.overrides.len()
        );
        Ok(settings)
    }
}
