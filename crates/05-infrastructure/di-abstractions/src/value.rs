//! 运行时值模型
//!
//! 构造参数、setter 参数以及 Bean 实例在容器内部统一以 [`Value`] 表示。

use ioc_common::{BeanError, BeanResult, TypeInfo};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// 容器持有的 Bean 实例
///
/// Bean 通过内部可变性（`Mutex`/`RwLock` 字段）接受 setter 注入，因此实例本身以共享引用存放。
pub type BeanRef = Arc<dyn Any + Send + Sync>;

/// 获取 Bean 实例的具体类型 ID
pub fn bean_type_id(bean: &BeanRef) -> TypeId {
    (**bean).type_id()
}

/// 将 Bean 实例向下转型为具体类型
pub fn downcast_bean<T: Any + Send + Sync>(bean_name: &str, bean: BeanRef) -> BeanResult<Arc<T>> {
    bean.downcast::<T>().map_err(|_| BeanError::TypeMismatch {
        bean_name: bean_name.to_string(),
        expected: std::any::type_name::<T>().to_string(),
        actual: "<其他类型>".to_string(),
    })
}

/// 已解析的值
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// 对其他 Bean（或工厂产物）的引用
    Object(BeanRef),
}

/// 值类型不符合预期
#[derive(Error, Debug)]
#[error("值类型不匹配: 期望 {expected}, 实际 {actual}")]
pub struct ValueError {
    pub expected: String,
    pub actual: &'static str,
}

impl Value {
    /// 值的种类名称，用于错误信息
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }

    fn mismatch(&self, expected: impl Into<String>) -> ValueError {
        ValueError {
            expected: expected.into(),
            actual: self.kind_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BeanRef> {
        match self {
            Self::Object(bean) => Some(bean),
            _ => None,
        }
    }

    /// 取出字符串
    pub fn into_string(self) -> Result<String, ValueError> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    /// 取出整数
    pub fn into_i64(self) -> Result<i64, ValueError> {
        match self {
            Self::Int(i) => Ok(i),
            other => Err(other.mismatch("int")),
        }
    }

    /// 取出 `u32`，超出范围视为类型不匹配
    pub fn into_u32(self) -> Result<u32, ValueError> {
        match self {
            Self::Int(i) => u32::try_from(i).map_err(|_| ValueError {
                expected: "u32".to_string(),
                actual: "int",
            }),
            other => Err(other.mismatch("u32")),
        }
    }

    pub fn into_bool(self) -> Result<bool, ValueError> {
        match self {
            Self::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn into_list(self) -> Result<Vec<Value>, ValueError> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }

    /// 取出 Bean 引用并向下转型
    pub fn into_bean<T: Any + Send + Sync>(self) -> Result<Arc<T>, ValueError> {
        match self {
            Self::Object(bean) => bean.downcast::<T>().map_err(|_| ValueError {
                expected: std::any::type_name::<T>().to_string(),
                actual: "object",
            }),
            other => Err(other.mismatch(std::any::type_name::<T>())),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<BeanRef> for Value {
    fn from(value: BeanRef) -> Self {
        Self::Object(value)
    }
}

/// 参数或属性声明的目标类型
///
/// 构造器选择与字面量转换都依据它进行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// 不做转换，按字面量自然类型传入
    Any,
    Bool,
    Int,
    Float,
    Str,
    List,
    /// 指定具体类型的对象
    Object(TypeInfo),
}

impl ValueKind {
    /// 具体类型 `T` 的对象
    pub fn object<T: Any>() -> Self {
        Self::Object(TypeInfo::of::<T>())
    }

    /// 是否声明了具体类型
    pub fn is_typed(&self) -> bool {
        !matches!(self, Self::Any)
    }

    /// 已解析的值能否直接作为该类型的参数
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) | (_, Value::Null) => true,
            (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::Str, Value::Str(_))
            | (Self::List, Value::List(_)) => true,
            (Self::Float, Value::Int(_)) => true,
            (Self::Object(info), Value::Object(bean)) => bean_type_id(bean) == info.id,
            _ => false,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("string"),
            Self::List => f.write_str("list"),
            Self::Object(info) => write!(f, "{}", info.short_name()),
        }
    }
}
