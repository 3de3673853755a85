//! 容器配置与统计信息

use serde::{Deserialize, Serialize};

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 同名定义再次注册时是否覆盖
    pub allow_definition_overriding: bool,
    /// 已存在的别名能否指向其他名称
    pub allow_alias_overriding: bool,
    /// 是否提前暴露引用以打破 setter 循环依赖
    pub allow_circular_references: bool,
    /// 最大创建深度
    pub max_creation_depth: usize,
    /// 刷新时是否预先实例化非延迟单例
    pub pre_instantiate_singletons: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_definition_overriding: true,
            allow_alias_overriding: true,
            allow_circular_references: true,
            max_creation_depth: 100,
            pre_instantiate_singletons: true,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStats {
    /// 已注册定义数量
    pub registered_definitions: usize,
    /// 已登记别名数量
    pub registered_aliases: usize,
    /// 完全初始化的单例数量
    pub active_singletons: usize,
    /// 累计创建的实例数量（含原型）
    pub created_instances: usize,
    /// 提前暴露引用被使用的次数
    pub early_references_resolved: usize,
    /// 实例后置处理器数量
    pub bean_post_processors: usize,
    /// 创建失败次数
    pub creation_errors: usize,
}
