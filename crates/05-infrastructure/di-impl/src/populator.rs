//! 属性填充与值解析
//!
//! 字面量交给转换器，引用通过工厂递归获取，内嵌定义作为匿名 Bean 创建，列表逐项解析。
//! 全部属性解析成功之后才依次调用 setter。

use crate::factory::{wrap_unless_circular, DefaultBeanFactory};
use di_abstractions::{BeanClass, BeanDefinition, BeanRef, SetterFn, Value, ValueKind, ValueSpec};
use ioc_common::{BeanError, BeanResult};
use serde_json::Value as JsonValue;
use tracing::trace;

/// 构造参数的中间结果
///
/// 字面量要等选定构造器、知道参数类型之后才能转换。
pub(crate) enum PendingArgument {
    Resolved(Value),
    Literal(JsonValue),
}

pub(crate) struct DependencyPopulator<'a> {
    factory: &'a DefaultBeanFactory,
}

impl<'a> DependencyPopulator<'a> {
    pub(crate) fn new(factory: &'a DefaultBeanFactory) -> Self {
        Self { factory }
    }

    /// 为实例注入定义中声明的全部属性
    pub(crate) fn populate(
        &self,
        bean_name: &str,
        bean: &BeanRef,
        class: Option<&BeanClass>,
        definition: &BeanDefinition,
    ) -> BeanResult<()> {
        if definition.property_values.is_empty() {
            return Ok(());
        }
        let property_error = |property: &str, source: ioc_common::BoxError| BeanError::PropertyResolution {
            bean_name: bean_name.to_string(),
            property: property.to_string(),
            source,
        };

        let mut resolved: Vec<(&str, &SetterFn, Value)> = Vec::with_capacity(definition.property_values.len());
        for pv in &definition.property_values {
            let descriptor = class.and_then(|class| class.property(&pv.name)).ok_or_else(|| {
                let type_name = class.map_or("<未注册类型>", BeanClass::name);
                property_error(&pv.name, format!("类型 '{type_name}' 没有可写属性 '{}'", pv.name).into())
            })?;
            let value = self
                .resolve_value(bean_name, &pv.value, &descriptor.kind)
                .map_err(|e| wrap_unless_circular(e, |e| property_error(&pv.name, e.into())))?;
            resolved.push((pv.name.as_str(), &descriptor.setter, value));
        }

        for (property, setter, value) in resolved {
            trace!("注入 Bean '{}' 的属性 '{}'", bean_name, property);
            setter(bean, value).map_err(|source| property_error(property, source))?;
        }
        Ok(())
    }

    /// 将值声明解析为 `kind` 类型的值
    pub(crate) fn resolve_value(&self, bean_name: &str, spec: &ValueSpec, kind: &ValueKind) -> BeanResult<Value> {
        let value = match spec {
            ValueSpec::Literal(literal) => return self.convert_literal(bean_name, literal, kind),
            ValueSpec::Reference(target) => Value::Object(self.factory.resolve_reference(bean_name, target)?),
            ValueSpec::Nested(definition) => Value::Object(self.factory.create_inner_bean(bean_name, definition)?),
            ValueSpec::List(items) => Value::List(
                items
                    .iter()
                    .map(|item| self.resolve_value(bean_name, item, &ValueKind::Any))
                    .collect::<BeanResult<Vec<_>>>()?,
            ),
        };
        self.check_kind(bean_name, kind, value)
    }

    /// 解析构造参数，字面量保留到选定构造器之后再转换
    pub(crate) fn resolve_argument(&self, bean_name: &str, spec: &ValueSpec) -> BeanResult<PendingArgument> {
        match spec {
            ValueSpec::Literal(literal) => Ok(PendingArgument::Literal(literal.clone())),
            other => self
                .resolve_value(bean_name, other, &ValueKind::Any)
                .map(PendingArgument::Resolved),
        }
    }

    /// 把中间结果绑定到具体的参数类型
    pub(crate) fn bind_argument(
        &self,
        bean_name: &str,
        argument: &PendingArgument,
        kind: &ValueKind,
    ) -> BeanResult<Value> {
        match argument {
            PendingArgument::Literal(literal) => self.convert_literal(bean_name, literal, kind),
            PendingArgument::Resolved(value) => self.check_kind(bean_name, kind, value.clone()),
        }
    }

    fn convert_literal(&self, bean_name: &str, literal: &JsonValue, kind: &ValueKind) -> BeanResult<Value> {
        self.factory
            .value_converter()
            .convert(literal, kind)
            .map_err(|e| BeanError::TypeMismatch {
                bean_name: bean_name.to_string(),
                expected: kind.to_string(),
                actual: format!("{literal} ({e})"),
            })
    }

    fn check_kind(&self, bean_name: &str, kind: &ValueKind, value: Value) -> BeanResult<Value> {
        if kind.accepts(&value) {
            return Ok(value);
        }
        let actual = match &value {
            Value::Object(bean) => self.factory.describe_type(bean),
            other => other.kind_name().to_string(),
        };
        Err(BeanError::TypeMismatch {
            bean_name: bean_name.to_string(),
            expected: kind.to_string(),
            actual,
        })
    }
}
