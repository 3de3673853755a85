//! Bean 定义数据模型
//!
//! Bean 定义是声明式的对象蓝图：目标类型或工厂、作用域、构造参数、属性值以及生命周期方法名。
//! 定义在后置处理阶段可变，刷新后由注册表冻结，构造实例时只使用合并后的只读副本。

use ioc_common::{BeanError, BeanResult, Scope};
use serde_json::Value as JsonValue;

/// 待解析的值声明
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSpec {
    /// 字面量，经转换服务转为目标类型
    Literal(JsonValue),
    /// 按名称引用其他 Bean
    Reference(String),
    /// 内嵌的匿名 Bean 定义
    Nested(Box<BeanDefinition>),
    /// 逐个解析的列表
    List(Vec<ValueSpec>),
}

impl ValueSpec {
    pub fn literal(value: impl Into<JsonValue>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(bean_name: impl Into<String>) -> Self {
        Self::Reference(bean_name.into())
    }

    pub fn nested(definition: BeanDefinition) -> Self {
        Self::Nested(Box::new(definition))
    }

    pub fn list(items: impl IntoIterator<Item = ValueSpec>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// 值声明中直接出现的 Bean 引用名称（不深入内嵌定义）
    pub fn references(&self) -> Vec<&str> {
        match self {
            Self::Reference(name) => vec![name.as_str()],
            Self::List(items) => items.iter().flat_map(Self::references).collect(),
            Self::Literal(_) | Self::Nested(_) => Vec::new(),
        }
    }
}

/// 单个属性值
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub name: String,
    pub value: ValueSpec,
}

/// 有序的属性值集合
///
/// 同名属性再次添加时原位替换，保持首次声明的顺序。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyValues {
    values: Vec<PropertyValue>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加或替换属性
    pub fn add(&mut self, name: impl Into<String>, value: ValueSpec) -> &mut Self {
        let name = name.into();
        match self.values.iter_mut().find(|pv| pv.name == name) {
            Some(existing) => existing.value = value,
            None => self.values.push(PropertyValue { name, value }),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ValueSpec> {
        self.values.iter().find(|pv| pv.name == name).map(|pv| &pv.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<ValueSpec> {
        let index = self.values.iter().position(|pv| pv.name == name)?;
        Some(self.values.remove(index).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 以 `self` 为父级，叠加子定义的属性，子定义同名属性优先
    fn overlay(&self, child: &Self) -> Self {
        let mut merged = self.clone();
        for pv in &child.values {
            merged.add(pv.name.clone(), pv.value.clone());
        }
        merged
    }
}

impl<'a> IntoIterator for &'a PropertyValues {
    type Item = &'a PropertyValue;
    type IntoIter = std::slice::Iter<'a, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Bean 定义
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeanDefinition {
    /// 目标类型在类型注册表中的名称
    pub bean_class: Option<String>,
    /// 父定义名称
    pub parent_name: Option<String>,
    /// 作用域，未设置时继承父定义，最终默认单例
    pub scope: Option<Scope>,
    /// 有序构造参数
    pub constructor_args: Vec<ValueSpec>,
    /// 属性值
    pub property_values: PropertyValues,
    /// 实例工厂 Bean 名称
    pub factory_bean_name: Option<String>,
    /// 工厂方法名称（无工厂 Bean 时为静态工厂方法）
    pub factory_method_name: Option<String>,
    /// 命名初始化方法
    pub init_method_name: Option<String>,
    /// 命名销毁方法
    pub destroy_method_name: Option<String>,
    /// 必须先于本 Bean 创建的 Bean
    pub depends_on: Vec<String>,
    /// 注册时一并登记的别名
    pub aliases: Vec<String>,
    /// 抽象定义只作为模板，不能实例化
    pub is_abstract: bool,
    /// 刷新时不预先实例化
    pub lazy_init: bool,
    pub description: Option<String>,
}

impl BeanDefinition {
    /// 以类型名称创建定义
    pub fn new(bean_class: impl Into<String>) -> Self {
        Self {
            bean_class: Some(bean_class.into()),
            ..Self::default()
        }
    }

    /// 继承父定义的子定义
    pub fn child_of(parent_name: impl Into<String>) -> Self {
        Self {
            parent_name: Some(parent_name.into()),
            ..Self::default()
        }
    }

    /// 由实例工厂 Bean 的方法产生的定义
    pub fn from_factory_bean(factory_bean: impl Into<String>, factory_method: impl Into<String>) -> Self {
        Self {
            factory_bean_name: Some(factory_bean.into()),
            factory_method_name: Some(factory_method.into()),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_constructor_arg(mut self, arg: ValueSpec) -> Self {
        self.constructor_args.push(arg);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: ValueSpec) -> Self {
        self.property_values.add(name, value);
        self
    }

    /// 静态工厂方法，方法定义在 `bean_class` 上
    pub fn with_factory_method(mut self, method: impl Into<String>) -> Self {
        self.factory_method_name = Some(method.into());
        self
    }

    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method_name = Some(method.into());
        self
    }

    pub fn with_destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method_name = Some(method.into());
        self
    }

    pub fn with_depends_on(mut self, bean_name: impl Into<String>) -> Self {
        self.depends_on.push(bean_name.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn abstract_template(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy_init = true;
        self
    }

    /// 最终生效的作用域
    pub fn effective_scope(&self) -> Scope {
        self.scope.unwrap_or_default()
    }

    pub fn is_singleton(&self) -> bool {
        self.effective_scope().is_singleton()
    }

    pub fn is_prototype(&self) -> bool {
        !self.is_singleton()
    }

    /// 注册前的结构校验
    pub fn validate(&self, bean_name: &str) -> BeanResult<()> {
        if self.factory_bean_name.is_some() && self.factory_method_name.is_none() {
            return Err(BeanError::definition_store(
                bean_name,
                "指定了工厂 Bean 但没有工厂方法",
            ));
        }
        if self.bean_class.is_none()
            && self.factory_bean_name.is_none()
            && self.parent_name.is_none()
            && !self.is_abstract
        {
            return Err(BeanError::definition_store(
                bean_name,
                "定义既没有类型也没有工厂 Bean，也没有父定义",
            ));
        }
        Ok(())
    }

    /// 以 `parent` 为模板合并出新的定义
    ///
    /// 类型、构造参数、工厂与生命周期方法设置由子定义覆盖父定义；属性按名称合并，子定义优先。
    /// 抽象标记、延迟标记、依赖与别名只取子定义自身的值。
    pub fn merge_with_parent(&self, parent: &Self) -> Self {
        let mut merged = parent.clone();
        merged.parent_name = None;
        if self.bean_class.is_some() {
            merged.bean_class.clone_from(&self.bean_class);
        }
        if self.scope.is_some() {
            merged.scope = self.scope;
        }
        if !self.constructor_args.is_empty() {
            merged.constructor_args.clone_from(&self.constructor_args);
        }
        merged.property_values = parent.property_values.overlay(&self.property_values);
        if self.factory_bean_name.is_some() {
            merged.factory_bean_name.clone_from(&self.factory_bean_name);
        }
        if self.factory_method_name.is_some() {
            merged.factory_method_name.clone_from(&self.factory_method_name);
        }
        if self.init_method_name.is_some() {
            merged.init_method_name.clone_from(&self.init_method_name);
        }
        if self.destroy_method_name.is_some() {
            merged.destroy_method_name.clone_from(&self.destroy_method_name);
        }
        if self.description.is_some() {
            merged.description.clone_from(&self.description);
        }
        merged.depends_on.clone_from(&self.depends_on);
        merged.aliases.clone_from(&self.aliases);
        merged.is_abstract = self.is_abstract;
        merged.lazy_init = self.lazy_init;
        merged
    }
}
