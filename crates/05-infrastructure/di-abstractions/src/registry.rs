//! 定义注册表抽象接口
//!
//! 工厂级后置处理器通过该接口获得对全部定义的读写访问。

use crate::definition::BeanDefinition;
use ioc_common::BeanResult;

/// Bean 定义注册表 trait
pub trait BeanDefinitionRegistry {
    /// 注册定义，同名已存在时按覆盖策略替换或返回 `DuplicateDefinition`
    fn register_bean_definition(&mut self, bean_name: &str, definition: BeanDefinition) -> BeanResult<()>;

    /// 删除定义及指向它的别名
    fn remove_bean_definition(&mut self, bean_name: &str) -> BeanResult<BeanDefinition>;

    /// 获取定义（名称可以是别名）
    fn bean_definition(&self, bean_name: &str) -> BeanResult<&BeanDefinition>;

    /// 获取可修改的定义，注册表冻结后失败
    fn bean_definition_mut(&mut self, bean_name: &str) -> BeanResult<&mut BeanDefinition>;

    /// 是否包含定义（名称可以是别名）
    fn contains_bean_definition(&self, bean_name: &str) -> bool;

    /// 按注册顺序返回全部定义名称
    fn bean_definition_names(&self) -> Vec<String>;

    /// 定义数量
    fn bean_definition_count(&self) -> usize;

    /// 为名称登记别名
    fn register_alias(&mut self, bean_name: &str, alias: &str) -> BeanResult<()>;

    /// 删除别名
    fn remove_alias(&mut self, alias: &str) -> BeanResult<()>;

    /// 沿别名链解析出规范名称，不是别名时原样返回
    fn canonical_name(&self, name: &str) -> String;

    /// 指向某个名称的全部别名（含间接别名）
    fn aliases_of(&self, bean_name: &str) -> Vec<String>;

    /// 是否为已登记的别名
    fn is_alias(&self, name: &str) -> bool;
}
