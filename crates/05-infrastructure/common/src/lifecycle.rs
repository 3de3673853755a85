//! Bean 作用域与生命周期状态

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bean 作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// 单例模式 - 整个容器生命周期内只创建一个实例
    #[default]
    Singleton,
    /// 原型模式 - 每次请求都创建新实例
    Prototype,
}

impl Scope {
    /// 是否为单例
    pub fn is_singleton(self) -> bool {
        matches!(self, Self::Singleton)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => f.write_str("singleton"),
            Self::Prototype => f.write_str("prototype"),
        }
    }
}

/// 单个实例的生命周期状态
///
/// 状态严格按声明顺序推进:
/// `Instantiated → CapabilitiesInjected → PreInitialized → Initialized → PostInitialized → Active → Destroyed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// 已实例化，属性尚未填充
    Instantiated,
    /// 容器能力（名称、类型注册表、工厂）已注入
    CapabilitiesInjected,
    /// 初始化前置处理已完成
    PreInitialized,
    /// 自身初始化钩子与命名初始化方法已执行
    Initialized,
    /// 初始化后置处理已完成
    PostInitialized,
    /// 已进入完全初始化缓存
    Active,
    /// 已销毁
    Destroyed,
}

impl LifecycleState {
    /// 下一个状态，`Destroyed` 之后没有状态
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Instantiated => Some(Self::CapabilitiesInjected),
            Self::CapabilitiesInjected => Some(Self::PreInitialized),
            Self::PreInitialized => Some(Self::Initialized),
            Self::Initialized => Some(Self::PostInitialized),
            Self::PostInitialized => Some(Self::Active),
            Self::Active => Some(Self::Destroyed),
            Self::Destroyed => None,
        }
    }

    /// 是否允许从当前状态进入 `target`
    pub fn can_advance_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_states_advance_one_step_at_a_time() {
        assert!(LifecycleState::Instantiated.can_advance_to(LifecycleState::CapabilitiesInjected));
        assert!(!LifecycleState::Instantiated.can_advance_to(LifecycleState::Initialized));
        assert!(LifecycleState::Active.can_advance_to(LifecycleState::Destroyed));
        assert_eq!(LifecycleState::Destroyed.next(), None);
    }

    #[test]
    fn scope_defaults_to_singleton() {
        assert_eq!(Scope::default(), Scope::Singleton);
        assert!(!Scope::Prototype.is_singleton());
        assert_eq!(Scope::Prototype.to_string(), "prototype");
    }
}
