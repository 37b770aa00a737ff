//! Typed bind values for generated statements and pass-through predicates.

use sqlx::any::AnyArguments;
use sqlx::Arguments;

/// A single bind parameter.
///
/// Every variant is nullable so that a NULL still carries its column type;
/// postgres rejects untyped NULL parameters in some positions.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Bytes(Option<Vec<u8>>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Bool(v) => v.is_none(),
            Value::Int(v) => v.is_none(),
            Value::Float(v) => v.is_none(),
            Value::Text(v) => v.is_none(),
            Value::Bytes(v) => v.is_none(),
        }
    }

    fn add_to(self, args: &mut AnyArguments<'_>) -> Result<(), sqlx::Error> {
        match self {
            Value::Bool(v) => args.add(v),
            Value::Int(v) => args.add(v),
            Value::Float(v) => args.add(v),
            Value::Text(v) => args.add(v),
            Value::Bytes(v) => args.add(v),
        }
        .map_err(sqlx::Error::Encode)
    }
}

/// Build a `Vec<Value>` of bind arguments for predicates.
///
/// ```
/// use ara_data_access::params;
/// let args = params!["jane@example.com", 25];
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => { ::std::vec::Vec::<$crate::record::Value>::new() };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::record::Value::from($arg)),+]
    };
}

/// Collect bind values into driver arguments, in order.
pub(crate) fn to_arguments<'q>(
    values: impl IntoIterator<Item = Value>,
) -> Result<AnyArguments<'q>, sqlx::Error> {
    let mut args = AnyArguments::default();
    for value in values {
        value.add_to(&mut args)?;
    }
    Ok(args)
}

macro_rules! impl_from_value {
    ($variant:ident, $($ty:ty => $conv:expr),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(Some($conv(v)))
                }
            }

            impl From<Option<$ty>> for Value {
                fn from(v: Option<$ty>) -> Self {
                    Value::$variant(v.map($conv))
                }
            }
        )+
    };
}

impl_from_value!(Bool, bool => |v| v);
impl_from_value!(Int, i64 => |v| v, i32 => i64::from, i16 => i64::from, u32 => i64::from, u16 => i64::from);
impl_from_value!(Float, f64 => |v| v, f32 => f64::from);
impl_from_value!(Text, String => |v| v);
impl_from_value!(Bytes, Vec<u8> => |v| v);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(Some(v.to_string()))
    }
}

impl From<Option<&str>> for Value {
    fn from(v: Option<&str>) -> Self {
        Value::Text(v.map(str::to_string))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Some(v.to_vec()))
    }
}
