//! 错误类型定义

use std::fmt;
use thiserror::Error;

/// 用户钩子（构造器、setter、初始化/销毁方法、后置处理器）返回的动态错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 容器错误类型
///
/// 每个变体都携带产生错误的 Bean 名称（工厂级后置处理器除外，携带处理器名称）。
#[derive(Error, Debug)]
pub enum BeanError {
    #[error("未找到 Bean 定义: '{bean_name}'")]
    NoSuchBeanDefinition { bean_name: String },

    #[error("Bean 定义重复注册: '{bean_name}' 已存在且不允许覆盖")]
    DuplicateDefinition { bean_name: String },

    #[error("检测到无法打破的循环依赖: '{bean_name}' 正在创建中, 依赖链: {}", .path.join(" -> "))]
    CircularDependency { bean_name: String, path: Vec<String> },

    #[error("Bean '{bean_name}' 的属性 '{property}' 解析失败: {source}")]
    PropertyResolution {
        bean_name: String,
        property: String,
        source: BoxError,
    },

    #[error("Bean '{bean_name}' 创建失败: {message}")]
    BeanCreation {
        bean_name: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("后置处理器 '{processor}' 执行失败{}: {source}", .bean_name.as_deref().map(|n| format!(" (Bean '{n}')")).unwrap_or_default())]
    PostProcessor {
        processor: String,
        bean_name: Option<String>,
        source: BoxError,
    },

    #[error("Bean '{bean_name}' 是抽象定义，不能实例化")]
    BeanIsAbstract { bean_name: String },

    #[error("Bean '{bean_name}' 类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        bean_name: String,
        expected: String,
        actual: String,
    },

    #[error("别名 '{alias}' -> '{bean_name}' 无效: {reason}")]
    InvalidAlias {
        alias: String,
        bean_name: String,
        reason: String,
    },

    #[error("Bean 定义 '{bean_name}' 存储失败: {message}")]
    DefinitionStore { bean_name: String, message: String },

    #[error("Bean '{bean_name}' 创建深度 {depth} 超过上限 {max_depth}")]
    CreationDepthExceeded {
        bean_name: String,
        depth: usize,
        max_depth: usize,
    },
}

impl BeanError {
    /// 创建带原因的 Bean 创建错误
    pub fn creation(
        bean_name: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::BeanCreation {
            bean_name: bean_name.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建不带原因的 Bean 创建错误
    pub fn creation_msg(bean_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BeanCreation {
            bean_name: bean_name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// 创建定义存储错误
    pub fn definition_store(bean_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DefinitionStore {
            bean_name: bean_name.into(),
            message: message.into(),
        }
    }

    /// 产生错误的 Bean 名称
    pub fn bean_name(&self) -> Option<&str> {
        match self {
            Self::NoSuchBeanDefinition { bean_name }
            | Self::DuplicateDefinition { bean_name }
            | Self::CircularDependency { bean_name, .. }
            | Self::PropertyResolution { bean_name, .. }
            | Self::BeanCreation { bean_name, .. }
            | Self::BeanIsAbstract { bean_name }
            | Self::TypeMismatch { bean_name, .. }
            | Self::InvalidAlias { bean_name, .. }
            | Self::DefinitionStore { bean_name, .. }
            | Self::CreationDepthExceeded { bean_name, .. } => Some(bean_name),
            Self::PostProcessor { bean_name, .. } => bean_name.as_deref(),
        }
    }

    /// 沿错误链查找循环依赖错误，返回其依赖链
    pub fn circular_path(&self) -> Option<&[String]> {
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(error) = current {
            if let Some(Self::CircularDependency { path, .. }) = error.downcast_ref::<Self>() {
                return Some(path);
            }
            current = error.source();
        }
        None
    }

    /// 是否由循环依赖引起
    pub fn is_circular_dependency(&self) -> bool {
        self.circular_path().is_some()
    }
}

/// 单个 Bean 的销毁失败记录
#[derive(Debug)]
pub struct DestructionFailure {
    /// Bean 名称
    pub bean_name: String,
    /// 失败原因
    pub source: BoxError,
}

/// 关闭阶段的聚合错误
///
/// 每个 Bean 的销毁都会独立尝试，失败在此汇总而不是立即抛出。
#[derive(Error, Debug, Default)]
pub struct DestructionErrors {
    pub failures: Vec<DestructionFailure>,
}

impl DestructionErrors {
    /// 记录一个失败
    pub fn push(&mut self, bean_name: impl Into<String>, source: BoxError) {
        self.failures.push(DestructionFailure {
            bean_name: bean_name.into(),
            source,
        });
    }

    /// 是否没有任何失败
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// 失败的 Bean 名称
    pub fn bean_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.bean_name.as_str()).collect()
    }

    /// 没有失败时返回 `Ok(())`
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for DestructionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut display = Vec::new();
        display.push(format!("{} 个 Bean 销毁失败:", self.failures.len()));
        for failure in &self.failures {
            display.push(format!("- '{}': {}", failure.bean_name, failure.source));
        }
        f.write_str(&display.join("\n"))
    }
}

/// 结果类型别名
pub type BeanResult<T> = Result<T, BeanError>;
