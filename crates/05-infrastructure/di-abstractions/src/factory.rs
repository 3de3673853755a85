//! Bean 工厂抽象接口

use crate::value::{downcast_bean, BeanRef};
use ioc_common::{BeanError, BeanResult};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// Bean 工厂 trait
///
/// 按名称获取 Bean，名称可以是别名。
pub trait BeanFactory: Send + Sync {
    /// 获取 Bean，必要时创建
    fn get_bean(&self, bean_name: &str) -> BeanResult<BeanRef>;

    /// 是否存在该名称的定义或手动注册的单例
    fn contains_bean(&self, bean_name: &str) -> bool;

    /// 是否为单例
    fn is_singleton(&self, bean_name: &str) -> BeanResult<bool>;

    /// 是否为原型
    fn is_prototype(&self, bean_name: &str) -> BeanResult<bool>;

    /// 名称的全部别名
    fn aliases(&self, bean_name: &str) -> Vec<String>;
}

impl dyn BeanFactory {
    /// 获取 Bean 并转换为具体类型
    pub fn get_bean_typed<T: Any + Send + Sync>(&self, bean_name: &str) -> BeanResult<Arc<T>> {
        downcast_bean(bean_name, self.get_bean(bean_name)?)
    }
}

/// 注入给 [`BeanFactoryAware`](crate::aware::BeanFactoryAware) 的工厂句柄
///
/// 只持有弱引用，Bean 持有句柄不会让工厂无法释放。
#[derive(Clone)]
pub struct BeanFactoryHandle {
    inner: Weak<dyn BeanFactory>,
}

impl BeanFactoryHandle {
    pub fn new(factory: Weak<dyn BeanFactory>) -> Self {
        Self { inner: factory }
    }

    /// 工厂仍然存活时返回强引用
    pub fn upgrade(&self) -> Option<Arc<dyn BeanFactory>> {
        self.inner.upgrade()
    }

    fn factory(&self, bean_name: &str) -> BeanResult<Arc<dyn BeanFactory>> {
        self.upgrade()
            .ok_or_else(|| BeanError::creation_msg(bean_name, "Bean 工厂已释放"))
    }

    pub fn get_bean(&self, bean_name: &str) -> BeanResult<BeanRef> {
        self.factory(bean_name)?.get_bean(bean_name)
    }

    pub fn get_bean_typed<T: Any + Send + Sync>(&self, bean_name: &str) -> BeanResult<Arc<T>> {
        self.factory(bean_name)?.get_bean_typed::<T>(bean_name)
    }

    pub fn contains_bean(&self, bean_name: &str) -> bool {
        self.upgrade().is_some_and(|factory| factory.contains_bean(bean_name))
    }
}

impl fmt::Debug for BeanFactoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanFactoryHandle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
