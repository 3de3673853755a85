//! 属性覆盖

use di_abstractions::{BeanDefinitionRegistry, BeanFactoryPostProcessor, Order, ValueSpec};
use ioc_common::BoxError;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 用配置中的 `beanName.property = value` 覆盖定义中的属性值
///
/// 覆盖值以字面量写入定义，注入时按属性类型转换。
#[derive(Debug, Clone, Default)]
pub struct PropertyOverrideConfigurer {
    overrides: BTreeMap<String, BTreeMap<String, JsonValue>>,
    ignore_invalid_keys: bool,
    order: Option<Order>,
}

impl PropertyOverrideConfigurer {
    pub fn new(overrides: BTreeMap<String, BTreeMap<String, JsonValue>>) -> Self {
        Self {
            overrides,
            ..Self::default()
        }
    }

    /// 解析 `beanName.property=value` 形式的条目，值按 JSON 解析失败时作为字符串
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a str>) -> Result<Self, BoxError> {
        let mut configurer = Self::default();
        for entry in entries {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| format!("覆盖条目缺少 '=': {entry}"))?;
            let (bean_name, property) = key
                .trim()
                .rsplit_once('.')
                .ok_or_else(|| format!("覆盖键应为 beanName.property: {key}"))?;
            let value = value.trim();
            let literal = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::from(value));
            configurer = configurer.with_override(bean_name, property, literal);
        }
        Ok(configurer)
    }

    pub fn with_override(
        mut self,
        bean_name: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.overrides
            .entry(bean_name.into())
            .or_default()
            .insert(property.into(), value.into());
        self
    }

    /// 找不到目标 Bean 时只记录警告
    pub fn ignore_invalid_keys(mut self, ignore: bool) -> Self {
        self.ignore_invalid_keys = ignore;
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

impl BeanFactoryPostProcessor for PropertyOverrideConfigurer {
    fn name(&self) -> &str {
        "PropertyOverrideConfigurer"
    }

    /// 默认在同级处理器中最后执行，覆盖其他处理器写入的值
    fn order(&self) -> Order {
        self.order.unwrap_or(Order::PriorityOrdered(i32::MAX))
    }

    fn post_process_bean_factory(&self, registry: &mut dyn BeanDefinitionRegistry) -> Result<(), BoxError> {
        for (bean_name, properties) in &self.overrides {
            let Some(target) = resolve_bean_name(registry, bean_name)? else {
                if self.ignore_invalid_keys {
                    warn!("属性覆盖的目标 Bean '{}' 不存在, 忽略", bean_name);
                    continue;
                }
                return Err(format!("属性覆盖的目标 Bean '{bean_name}' 不存在").into());
            };
            let definition = registry.bean_definition_mut(&target)?;
            for (property, value) in properties {
                let property = definition
                    .property_values
                    .iter()
                    .find(|existing| existing.name.eq_ignore_ascii_case(property))
                    .map_or_else(|| property.clone(), |existing| existing.name.clone());
                debug!("覆盖 Bean '{}' 的属性 '{}' = {}", target, property, value);
                definition.property_values.add(property, ValueSpec::Literal(value.clone()));
            }
        }
        Ok(())
    }
}

/// 解析覆盖键指向的 Bean 定义名称
///
/// 精确匹配优先；环境变量来源的键会被转为小写，因此退而按忽略大小写匹配名称与别名，
/// 多个定义同时命中时报错。
fn resolve_bean_name(registry: &dyn BeanDefinitionRegistry, key: &str) -> Result<Option<String>, BoxError> {
    let canonical = registry.canonical_name(key);
    if registry.contains_bean_definition(&canonical) {
        return Ok(Some(canonical));
    }
    let mut matches = registry.bean_definition_names().into_iter().filter(|name| {
        name.eq_ignore_ascii_case(key) || registry.aliases_of(name).iter().any(|alias| alias.eq_ignore_ascii_case(key))
    });
    let first = matches.next();
    if let Some(second) = matches.next() {
        return Err(format!(
            "属性覆盖键 '{key}' 忽略大小写后同时匹配 '{}' 与 '{second}'",
            first.unwrap_or_default()
        )
        .into());
    }
    Ok(first)
}
