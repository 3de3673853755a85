//! 默认转换服务
//!
//! 内置字符串、数值、布尔与列表之间的转换，对象类型需要按目标类型注册自定义转换器。

use di_abstractions::{natural_value, Value, ValueConverter, ValueKind};
use ioc_common::BoxError;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type ConverterFn = Arc<dyn Fn(&JsonValue) -> Result<Value, BoxError> + Send + Sync>;

/// 转换服务
#[derive(Default)]
pub struct ConversionService {
    converters: RwLock<HashMap<TypeId, ConverterFn>>,
}

impl ConversionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册字面量到 `T` 的转换器，同一目标类型的旧转换器被替换
    pub fn add_converter<T, F>(&self, converter: F)
    where
        T: Any + Send + Sync,
        F: Fn(&JsonValue) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        debug!("注册字面量转换器: {}", std::any::type_name::<T>());
        let wrapped: ConverterFn = Arc::new(move |literal: &JsonValue| -> Result<Value, BoxError> {
            Ok(Value::Object(Arc::new(converter(literal)?)))
        });
        self.converters.write().insert(TypeId::of::<T>(), wrapped);
    }

    /// 是否能转换为目标类型
    pub fn can_convert(&self, target: &ValueKind) -> bool {
        match target {
            ValueKind::Object(info) => self.converters.read().contains_key(&info.id),
            _ => true,
        }
    }
}

fn literal_text(literal: &JsonValue) -> Option<&str> {
    literal.as_str().map(str::trim)
}

impl ValueConverter for ConversionService {
    fn convert(&self, literal: &JsonValue, target: &ValueKind) -> Result<Value, BoxError> {
        if literal.is_null() {
            return Ok(Value::Null);
        }
        match target {
            ValueKind::Any => natural_value(literal),
            ValueKind::Bool => match (literal.as_bool(), literal_text(literal)) {
                (Some(b), _) => Ok(Value::Bool(b)),
                (None, Some("true" | "yes" | "on" | "1")) => Ok(Value::Bool(true)),
                (None, Some("false" | "no" | "off" | "0")) => Ok(Value::Bool(false)),
                _ => Err(format!("无法将 {literal} 转换为 bool").into()),
            },
            ValueKind::Int => {
                if let Some(i) = literal.as_i64() {
                    return Ok(Value::Int(i));
                }
                match literal_text(literal) {
                    Some(text) => Ok(Value::Int(text.parse::<i64>()?)),
                    None => Err(format!("无法将 {literal} 转换为 int").into()),
                }
            }
            ValueKind::Float => {
                if let Some(f) = literal.as_f64() {
                    return Ok(Value::Float(f));
                }
                match literal_text(literal) {
                    Some(text) => Ok(Value::Float(text.parse::<f64>()?)),
                    None => Err(format!("无法将 {literal} 转换为 float").into()),
                }
            }
            ValueKind::Str => match literal {
                JsonValue::String(s) => Ok(Value::Str(s.clone())),
                JsonValue::Bool(_) | JsonValue::Number(_) => Ok(Value::Str(literal.to_string())),
                _ => Err(format!("无法将 {literal} 转换为 string").into()),
            },
            ValueKind::List => match literal {
                JsonValue::String(s) => Ok(Value::List(
                    s.split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(Value::from)
                        .collect(),
                )),
                _ => natural_value(literal).map(|value| match value {
                    Value::List(items) => Value::List(items),
                    single => Value::List(vec![single]),
                }),
            },
            ValueKind::Object(info) => {
                let converter = self.converters.read().get(&info.id).cloned();
                match converter {
                    Some(converter) => converter(literal),
                    None => Err(format!("没有从字面量到 {} 的转换器", info.full_name).into()),
                }
            }
        }
    }
}
