//! Dynamic values and the scalar data types points can be configured with.
//!
//! Every data point is configured with one of the [`DataType`] keywords and
//! holds values of exactly that type for its whole lifetime. [`Value`] is the
//! dynamic form used at the reflection boundary (attribute read handles,
//! transports that do not know the point type at compile time);
//! [`ScalarValue`] is the compile-time bridge the typed handlers are generic
//! over.

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

// =============================================================================
// Data Types
// =============================================================================

/// The scalar data types understood by the point configuration.
///
/// The serialized form is the configuration keyword (`"uint16"`, `"float64"`,
/// ...). Which keywords are actually accepted for a given point class is
/// decided by that class's handler registry, not by this enum; `Time` for
/// example only ever describes attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// A boolean flag.
    Bool,
    /// An 8-bit unsigned integer.
    UInt8,
    /// A 16-bit unsigned integer.
    UInt16,
    /// A 32-bit unsigned integer.
    UInt32,
    /// A 64-bit unsigned integer.
    UInt64,
    /// An 8-bit signed integer.
    Int8,
    /// A 16-bit signed integer.
    Int16,
    /// A 32-bit signed integer.
    Int32,
    /// A 64-bit signed integer.
    Int64,
    /// A 32-bit IEEE 754 floating point number.
    Float32,
    /// A 64-bit IEEE 754 floating point number.
    Float64,
    /// A text string.
    String,
    /// A point in time. Used by state attributes, not by point values.
    Time,
}

impl DataType {
    /// The configuration keyword for this type.
    pub fn keyword(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::String => "string",
            DataType::Time => "time",
        }
    }

    /// Parses a configuration keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "bool" => DataType::Bool,
            "uint8" => DataType::UInt8,
            "uint16" => DataType::UInt16,
            "uint32" => DataType::UInt32,
            "uint64" => DataType::UInt64,
            "int8" => DataType::Int8,
            "int16" => DataType::Int16,
            "int32" => DataType::Int32,
            "int64" => DataType::Int64,
            "float32" => DataType::Float32,
            "float64" => DataType::Float64,
            "string" => DataType::String,
            "time" => DataType::Time,
            _ => return None,
        })
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

// =============================================================================
// Dynamic Values
// =============================================================================

/// A dynamically typed value crossing the reflection or transport boundary.
///
/// Integer widths narrower than 64 bits travel widened; the typed handler on
/// the receiving side narrows them back and rejects out-of-range values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean flag.
    Bool(bool),
    /// An unsigned integer of up to 64 bits.
    UInt(u64),
    /// A signed integer of up to 64 bits.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A text string.
    Text(String),
    /// A point in time.
    Time(Timestamp),
}

impl Value {
    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            Value::UInt(value) => Some(*value != 0),
            Value::Int(value) => Some(*value != 0),
            _ => None,
        }
    }

    /// Returns the value as an unsigned integer, if representable.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(value) => Some(*value),
            Value::Int(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Returns the value as a signed integer, if representable.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::UInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Returns the value as a floating point number, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::UInt(value) => Some(*value as f64),
            Value::Int(value) => Some(*value as f64),
            Value::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Returns the text, if this is a string value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::UInt(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
            Value::Time(value) => write!(f, "{}", value.to_rfc3339()),
        }
    }
}

// =============================================================================
// Scalar Bridge
// =============================================================================

/// A scalar type a data point can be configured to carry.
///
/// Connects a native Rust type to its [`DataType`] keyword and to the dynamic
/// [`Value`] representation. `from_value` only performs lossless conversions;
/// a value that does not fit the target width is rejected, not truncated.
pub trait ScalarValue: Clone + Send + Sync + 'static {
    /// The data type keyword this scalar corresponds to.
    const DATA_TYPE: DataType;

    /// Wraps the scalar in a dynamic value.
    fn into_value(self) -> Value;

    /// Extracts the scalar from a dynamic value, if it fits.
    fn from_value(value: &Value) -> Option<Self>;
}

impl ScalarValue for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

macro_rules! unsigned_scalar {
    ($ty:ty, $data_type:expr) => {
        impl ScalarValue for $ty {
            const DATA_TYPE: DataType = $data_type;

            fn into_value(self) -> Value {
                Value::UInt(u64::from(self))
            }

            fn from_value(value: &Value) -> Option<Self> {
                value.as_u64().and_then(|wide| <$ty>::try_from(wide).ok())
            }
        }
    };
}

macro_rules! signed_scalar {
    ($ty:ty, $data_type:expr) => {
        impl ScalarValue for $ty {
            const DATA_TYPE: DataType = $data_type;

            fn into_value(self) -> Value {
                Value::Int(i64::from(self))
            }

            fn from_value(value: &Value) -> Option<Self> {
                value.as_i64().and_then(|wide| <$ty>::try_from(wide).ok())
            }
        }
    };
}

unsigned_scalar!(u8, DataType::UInt8);
unsigned_scalar!(u16, DataType::UInt16);
unsigned_scalar!(u32, DataType::UInt32);
unsigned_scalar!(u64, DataType::UInt64);
signed_scalar!(i8, DataType::Int8);
signed_scalar!(i16, DataType::Int16);
signed_scalar!(i32, DataType::Int32);
signed_scalar!(i64, DataType::Int64);

impl ScalarValue for f32 {
    const DATA_TYPE: DataType = DataType::Float32;

    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|wide| wide as f32)
    }
}

impl ScalarValue for f64 {
    const DATA_TYPE: DataType = DataType::Float64;

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl ScalarValue for String {
    const DATA_TYPE: DataType = DataType::String;

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_text().map(str::to_owned)
    }
}
