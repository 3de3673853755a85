//! 后置处理器抽象
//!
//! - [`BeanPostProcessor`] 作用于单个实例，在初始化前后执行，可以返回替换对象
//! - [`BeanFactoryPostProcessor`] 作用于定义注册表，在任何实例创建之前执行一次
//! - [`BeanDefinitionRegistryPostProcessor`] 可以注册新的定义，先于普通工厂后置处理器执行

use crate::registry::BeanDefinitionRegistry;
use crate::value::BeanRef;
use ioc_common::BoxError;
use std::sync::Arc;

/// 处理器排序键
///
/// `PriorityOrdered` 整体先于 `Ordered`，`Ordered` 整体先于 `Unordered`；
/// 同一类别内数值越小越先执行，相同键按注册顺序执行。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Order {
    PriorityOrdered(i32),
    Ordered(i32),
    #[default]
    Unordered,
}

/// 按 [`Order`] 稳定排序
pub fn sort_by_order<T>(items: &mut [T], order_of: impl Fn(&T) -> Order) {
    items.sort_by_key(|item| order_of(item));
}

/// Bean 实例后置处理器
///
/// 所有钩子默认原样返回实例。返回不同的对象即视为替换，后续步骤都使用替换后的对象。
pub trait BeanPostProcessor: Send + Sync {
    /// 处理器名称（用于日志和错误信息）
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 排序键
    fn order(&self) -> Order {
        Order::Unordered
    }

    /// 在自身初始化钩子与命名初始化方法之前调用
    fn before_initialization(&self, bean: BeanRef, _bean_name: &str) -> Result<BeanRef, BoxError> {
        Ok(bean)
    }

    /// 在初始化之后调用
    fn after_initialization(&self, bean: BeanRef, _bean_name: &str) -> Result<BeanRef, BoxError> {
        Ok(bean)
    }

    /// 提前暴露引用时调用
    ///
    /// 循环依赖中其他 Bean 拿到的就是这里返回的对象。
    fn early_reference(&self, bean: BeanRef, _bean_name: &str) -> Result<BeanRef, BoxError> {
        Ok(bean)
    }
}

/// 工厂级后置处理器
pub trait BeanFactoryPostProcessor: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn order(&self) -> Order {
        Order::Unordered
    }

    /// 修改已注册的定义
    fn post_process_bean_factory(&self, registry: &mut dyn BeanDefinitionRegistry) -> Result<(), BoxError>;
}

/// 可以注册新定义的工厂级后置处理器
pub trait BeanDefinitionRegistryPostProcessor: BeanFactoryPostProcessor {
    /// 注册或删除定义，先于所有 `post_process_bean_factory` 执行
    fn post_process_definition_registry(
        &self,
        registry: &mut dyn BeanDefinitionRegistry,
    ) -> Result<(), BoxError>;
}

/// 已注册的工厂级后置处理器
#[derive(Clone)]
pub enum FactoryPostProcessor {
    Registry(Arc<dyn BeanDefinitionRegistryPostProcessor>),
    Factory(Arc<dyn BeanFactoryPostProcessor>),
}

impl FactoryPostProcessor {
    pub fn name(&self) -> &str {
        match self {
            Self::Registry(p) => p.name(),
            Self::Factory(p) => p.name(),
        }
    }

    pub fn order(&self) -> Order {
        match self {
            Self::Registry(p) => p.order(),
            Self::Factory(p) => p.order(),
        }
    }

    /// 同一个处理器对象是否已注册
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Registry(a), Self::Registry(b)) => Arc::ptr_eq(a, b),
            (Self::Factory(a), Self::Factory(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
