//! 容器能力注入与自身生命周期钩子
//!
//! 类型通过 [`BeanClassBuilder`](crate::class::BeanClassBuilder) 声明自己实现了哪些 trait，
//! 容器在构建期就得到能力标签到注入函数的映射，运行时不再做类型探测。

use crate::class::TypeRegistry;
use crate::factory::BeanFactoryHandle;
use ioc_common::BoxError;
use std::fmt;
use std::sync::Arc;

/// 接收自身的 Bean 名称
pub trait BeanNameAware {
    fn set_bean_name(&self, bean_name: &str);
}

/// 接收类型注册表
pub trait TypeRegistryAware {
    fn set_type_registry(&self, registry: Arc<TypeRegistry>);
}

/// 接收所属 Bean 工厂的弱引用句柄
pub trait BeanFactoryAware {
    fn set_bean_factory(&self, factory: BeanFactoryHandle) -> Result<(), BoxError>;
}

/// 属性填充完成后的自身初始化钩子
pub trait InitializingBean {
    fn after_properties_set(&self) -> Result<(), BoxError>;
}

/// 容器关闭时的自身销毁钩子
pub trait DisposableBean {
    fn destroy(&self) -> Result<(), BoxError>;
}

/// 能力标签
///
/// 声明顺序即注入顺序：名称、类型注册表、Bean 工厂。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    BeanName,
    TypeRegistry,
    BeanFactory,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeanName => f.write_str("BeanNameAware"),
            Self::TypeRegistry => f.write_str("TypeRegistryAware"),
            Self::BeanFactory => f.write_str("BeanFactoryAware"),
        }
    }
}
