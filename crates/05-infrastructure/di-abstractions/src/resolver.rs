//! 值解析扩展点
//!
//! 字面量到目标类型的转换由外部提供的 [`ValueConverter`] 完成，容器只负责调用。

use crate::value::{Value, ValueKind};
use ioc_common::BoxError;
use serde_json::Value as JsonValue;

/// 字面量转换器 trait
pub trait ValueConverter: Send + Sync {
    /// 将字面量转换为 `target` 声明的类型
    fn convert(&self, literal: &JsonValue, target: &ValueKind) -> Result<Value, BoxError>;
}

/// 按字面量自然类型转换，不识别对象类型
pub fn natural_value(literal: &JsonValue) -> Result<Value, BoxError> {
    Ok(match literal {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().ok_or("数值超出范围")?),
        },
        JsonValue::String(s) => Value::Str(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(natural_value).collect::<Result<_, _>>()?),
        JsonValue::Object(_) => return Err("对象字面量需要注册自定义转换器".into()),
    })
}
