use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::types::BackendError;

/// Value domain of an attribute.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrDomain {
    /// `bool`.
    Bool,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// 64-bit float.
    Double,
    /// Nullable string.
    String,
}

impl AttrDomain {
    /// Name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            AttrDomain::Bool => "bool",
            AttrDomain::Int => "int",
            AttrDomain::Long => "long",
            AttrDomain::Double => "double",
            AttrDomain::String => "string",
        }
    }

    /// Value an attribute of this domain starts with.
    pub fn default_value(self) -> AttrValue {
        match self {
            AttrDomain::Bool => AttrValue::Bool(false),
            AttrDomain::Int => AttrValue::Int(0),
            AttrDomain::Long => AttrValue::Long(0),
            AttrDomain::Double => AttrValue::Double(0.0),
            AttrDomain::String => AttrValue::Null,
        }
    }

    /// Returns `true` if `value` may be stored in an attribute of this domain.
    pub fn accepts(self, value: &AttrValue) -> bool {
        matches!(
            (self, value),
            (AttrDomain::Bool, AttrValue::Bool(_))
                | (AttrDomain::Int, AttrValue::Int(_))
                | (AttrDomain::Long, AttrValue::Long(_))
                | (AttrDomain::Double, AttrValue::Double(_))
                | (AttrDomain::String, AttrValue::String(_) | AttrValue::Null)
        )
    }
}

/// Typed attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Absent string value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit integer value.
    Int(i32),
    /// 64-bit integer value.
    Long(i64),
    /// Floating point value.
    Double(f64),
    /// String value.
    String(String),
}

impl AttrValue {
    /// Name of the value's own domain, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttrValue::Null => "null",
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "int",
            AttrValue::Long(_) => "long",
            AttrValue::Double(_) => "double",
            AttrValue::String(_) => "string",
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => f.write_str("null"),
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Long(v) => write!(f, "{v}"),
            AttrValue::Double(v) => write!(f, "{v}"),
            AttrValue::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Long(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Double(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

/// Encodes a value into the text stored by backends.
pub fn encode_value(value: &AttrValue) -> Result<String, BackendError> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes backend text into a value of `domain`.
pub fn decode_value(domain: AttrDomain, raw: &str) -> Result<AttrValue, BackendError> {
    let json: Json = serde_json::from_str(raw)?;
    let value = match (domain, &json) {
        (_, Json::Null) if domain == AttrDomain::String => AttrValue::Null,
        (AttrDomain::Bool, Json::Bool(v)) => AttrValue::Bool(*v),
        (AttrDomain::Int, Json::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(AttrValue::Int)
            .ok_or_else(|| mismatch(domain, raw))?,
        (AttrDomain::Long, Json::Number(n)) => n
            .as_i64()
            .map(AttrValue::Long)
            .ok_or_else(|| mismatch(domain, raw))?,
        (AttrDomain::Double, Json::Number(n)) => n
            .as_f64()
            .map(AttrValue::Double)
            .ok_or_else(|| mismatch(domain, raw))?,
        // Non-finite doubles are stored as null.
        (AttrDomain::Double, Json::Null) => AttrValue::Double(f64::NAN),
        (AttrDomain::String, Json::String(s)) => AttrValue::String(s.clone()),
        _ => return Err(mismatch(domain, raw)),
    };
    Ok(value)
}

fn mismatch(domain: AttrDomain, raw: &str) -> BackendError {
    BackendError::Corrupt(format!("'{raw}' is not a valid {} value", domain.name()))
}
