//! Typed dump/load for state params.
//!
//! Every state-param value round-trips through the client as JSON.
//! [`ParamType::load`] is the strict, coercing entry point: values
//! arriving from the wire are checked against the declared type and
//! normalised into a canonical [`Value`]. Dump is the identity on
//! canonical values, so `load(dump(v)) == v` for every accepted `v`.
//!
//! Coercion rules:
//!
//! - numeric and boolean values arriving as strings are coerced;
//! - dates and timestamps are ISO-8601 strings;
//! - strings destined for list/set/dict params may arrive JSON-encoded
//!   (clients embed structured data in query-param form);
//! - user types plug in via [`ParamSupport`];
//! - record-like types round-trip as nested mappings via
//!   [`dump_record`]/[`load_record`].

use crate::error::JembeError;
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Declared type of a state param.
///
/// The first five variants are also the legal URL-param types
/// (string, int, float, uuid, path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// UTF-8 string; no coercion from other primitives.
    Str,
    /// 64-bit integer; numeric strings are coerced.
    Int,
    /// 64-bit float; numeric strings are coerced.
    Float,
    /// Boolean; `"true"`/`"false"`/`"1"`/`"0"` strings are coerced.
    Bool,
    /// UUID; normalised to the hyphenated lowercase form.
    Uuid,
    /// Remainder-of-path string for routing; stored verbatim.
    UrlPath,
    /// ISO-8601 calendar date (`2024-06-01`).
    Date,
    /// RFC 3339 timestamp; normalised to second precision with offset.
    DateTime,
    /// Ordered sequence with a uniform element type.
    List(Box<ParamType>),
    /// Unordered unique collection; canonicalised sorted and deduplicated.
    Set(Box<ParamType>),
    /// String-keyed mapping with a uniform value type.
    Dict(Box<ParamType>),
    /// Any JSON value, passed through untyped.
    Json,
}

impl ParamType {
    /// `true` for types allowed in URL path segments.
    #[must_use]
    pub fn is_url_type(&self) -> bool {
        matches!(
            self,
            Self::Str | Self::Int | Self::Float | Self::Uuid | Self::UrlPath
        )
    }

    /// Loads a wire value, applying the documented coercions.
    ///
    /// `null` loads as `null` for every type; optionality is decided by
    /// the param's default, not its type.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::BadParamValue`] when the value cannot be
    /// interpreted as the declared type.
    pub fn load(&self, param: &str, raw: &Value) -> Result<Value, JembeError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let reject = |reason: &str| JembeError::BadParamValue {
            param: param.to_string(),
            reason: format!("{reason}, got {raw}"),
        };
        match self {
            Self::Str => match raw {
                Value::String(_) => Ok(raw.clone()),
                _ => Err(reject("expected string")),
            },
            Self::Int => match raw {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(raw.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| reject("expected integer")),
                _ => Err(reject("expected integer")),
            },
            Self::Float => match raw {
                Value::Number(n) => n
                    .as_f64()
                    .map(Value::from)
                    .ok_or_else(|| reject("expected float")),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| reject("expected float")),
                _ => Err(reject("expected float")),
            },
            Self::Bool => match raw {
                Value::Bool(_) => Ok(raw.clone()),
                Value::String(s) => match s.trim() {
                    "true" | "1" => Ok(Value::Bool(true)),
                    "false" | "0" => Ok(Value::Bool(false)),
                    _ => Err(reject("expected bool")),
                },
                _ => Err(reject("expected bool")),
            },
            Self::Uuid => match raw {
                Value::String(s) => Uuid::parse_str(s.trim())
                    .map(|u| Value::String(u.hyphenated().to_string()))
                    .map_err(|_| reject("expected uuid")),
                _ => Err(reject("expected uuid")),
            },
            Self::UrlPath => match raw {
                Value::String(_) => Ok(raw.clone()),
                _ => Err(reject("expected path string")),
            },
            Self::Date => match raw {
                Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                    .map_err(|_| reject("expected ISO-8601 date")),
                _ => Err(reject("expected ISO-8601 date")),
            },
            Self::DateTime => match raw {
                Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                    .map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::Secs, true)))
                    .map_err(|_| reject("expected RFC 3339 timestamp")),
                _ => Err(reject("expected RFC 3339 timestamp")),
            },
            Self::List(elem) => {
                let items = unpack_structured(raw).ok_or_else(|| reject("expected array"))?;
                let items = items.as_array().ok_or_else(|| reject("expected array"))?;
                let loaded = items
                    .iter()
                    .map(|v| elem.load(param, v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(loaded))
            }
            Self::Set(elem) => {
                let items = unpack_structured(raw).ok_or_else(|| reject("expected array"))?;
                let items = items.as_array().ok_or_else(|| reject("expected array"))?;
                let mut loaded = items
                    .iter()
                    .map(|v| elem.load(param, v))
                    .collect::<Result<Vec<_>, _>>()?;
                loaded.sort_by_key(|v| v.to_string());
                loaded.dedup();
                Ok(Value::Array(loaded))
            }
            Self::Dict(elem) => {
                let obj = unpack_structured(raw).ok_or_else(|| reject("expected object"))?;
                let obj = obj.as_object().ok_or_else(|| reject("expected object"))?;
                let mut out = Map::new();
                for (k, v) in obj {
                    out.insert(k.clone(), elem.load(param, v)?);
                }
                Ok(Value::Object(out))
            }
            Self::Json => Ok(raw.clone()),
        }
    }

    /// Renders a loaded value into a URL path segment.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::UnsupportedParamType`] for non-URL types
    /// and [`JembeError::BadParamValue`] for values that do not match.
    pub fn to_url_segment(&self, param: &str, value: &Value) -> Result<String, JembeError> {
        if !self.is_url_type() {
            return Err(JembeError::UnsupportedParamType {
                param: param.to_string(),
                type_name: format!("{self:?} (not a URL param type)"),
            });
        }
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(JembeError::BadParamValue {
                param: param.to_string(),
                reason: format!("cannot place {value} in a URL segment"),
            }),
        }
    }
}

/// Structured params may arrive JSON-encoded inside a string.
fn unpack_structured(raw: &Value) -> Option<Value> {
    match raw {
        Value::String(s) => serde_json::from_str(s).ok(),
        Value::Array(_) | Value::Object(_) => Some(raw.clone()),
        _ => None,
    }
}

/// Dump/load hooks for user types stored in component state.
///
/// Implement this for domain types that should round-trip through the
/// client-held JSON. Plain-data records can instead lean on serde via
/// [`dump_record`]/[`load_record`].
///
/// # Example
///
/// ```
/// use jembe_types::{JembeError, ParamSupport};
/// use serde_json::Value;
///
/// struct TaskRef(u64);
///
/// impl ParamSupport for TaskRef {
///     fn dump_init_param(&self) -> Value {
///         Value::from(self.0)
///     }
///
///     fn load_init_param(value: &Value) -> Result<Self, JembeError> {
///         value.as_u64().map(TaskRef).ok_or(JembeError::BadParamValue {
///             param: "task".into(),
///             reason: "expected task id".into(),
///         })
///     }
/// }
/// ```
pub trait ParamSupport: Sized {
    /// Serialises the value for the client.
    fn dump_init_param(&self) -> Value;

    /// Reconstructs the value from a client-supplied JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::BadParamValue`] on malformed input.
    fn load_init_param(value: &Value) -> Result<Self, JembeError>;
}

macro_rules! param_support_via_type {
    ($rust:ty, $ty:expr, $name:literal, $extract:expr) => {
        impl ParamSupport for $rust {
            fn dump_init_param(&self) -> Value {
                serde_json::json!(self)
            }

            fn load_init_param(value: &Value) -> Result<Self, JembeError> {
                let loaded = $ty.load($name, value)?;
                $extract(&loaded).ok_or(JembeError::BadParamValue {
                    param: $name.into(),
                    reason: format!("cannot load {value}"),
                })
            }
        }
    };
}

param_support_via_type!(i64, ParamType::Int, "int", |v: &Value| v.as_i64());
param_support_via_type!(f64, ParamType::Float, "float", |v: &Value| v.as_f64());
param_support_via_type!(bool, ParamType::Bool, "bool", |v: &Value| v.as_bool());
param_support_via_type!(String, ParamType::Str, "str", |v: &Value| v
    .as_str()
    .map(String::from));

impl ParamSupport for Uuid {
    fn dump_init_param(&self) -> Value {
        Value::String(self.hyphenated().to_string())
    }

    fn load_init_param(value: &Value) -> Result<Self, JembeError> {
        let loaded = ParamType::Uuid.load("uuid", value)?;
        loaded
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(JembeError::BadParamValue {
                param: "uuid".into(),
                reason: format!("cannot load {value}"),
            })
    }
}

impl ParamSupport for NaiveDate {
    fn dump_init_param(&self) -> Value {
        Value::String(self.format("%Y-%m-%d").to_string())
    }

    fn load_init_param(value: &Value) -> Result<Self, JembeError> {
        let loaded = ParamType::Date.load("date", value)?;
        loaded
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .ok_or(JembeError::BadParamValue {
                param: "date".into(),
                reason: format!("cannot load {value}"),
            })
    }
}

impl ParamSupport for DateTime<FixedOffset> {
    fn dump_init_param(&self) -> Value {
        Value::String(self.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    fn load_init_param(value: &Value) -> Result<Self, JembeError> {
        let loaded = ParamType::DateTime.load("datetime", value)?;
        loaded
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .ok_or(JembeError::BadParamValue {
                param: "datetime".into(),
                reason: format!("cannot load {value}"),
            })
    }
}

impl<T: ParamSupport> ParamSupport for Vec<T> {
    fn dump_init_param(&self) -> Value {
        Value::Array(self.iter().map(ParamSupport::dump_init_param).collect())
    }

    fn load_init_param(value: &Value) -> Result<Self, JembeError> {
        let items = unpack_structured(value).ok_or(JembeError::BadParamValue {
            param: "list".into(),
            reason: format!("expected array, got {value}"),
        })?;
        let items = items.as_array().ok_or(JembeError::BadParamValue {
            param: "list".into(),
            reason: format!("expected array, got {value}"),
        })?;
        items.iter().map(T::load_init_param).collect()
    }
}

impl<T: ParamSupport + Ord> ParamSupport for BTreeSet<T> {
    fn dump_init_param(&self) -> Value {
        Value::Array(self.iter().map(ParamSupport::dump_init_param).collect())
    }

    fn load_init_param(value: &Value) -> Result<Self, JembeError> {
        Ok(Vec::<T>::load_init_param(value)?.into_iter().collect())
    }
}

impl<T: ParamSupport> ParamSupport for BTreeMap<String, T> {
    fn dump_init_param(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), v.dump_init_param()))
                .collect(),
        )
    }

    fn load_init_param(value: &Value) -> Result<Self, JembeError> {
        let obj = unpack_structured(value).ok_or(JembeError::BadParamValue {
            param: "dict".into(),
            reason: format!("expected object, got {value}"),
        })?;
        let obj = obj.as_object().ok_or(JembeError::BadParamValue {
            param: "dict".into(),
            reason: format!("expected object, got {value}"),
        })?;
        obj.iter()
            .map(|(k, v)| Ok((k.clone(), T::load_init_param(v)?)))
            .collect()
    }
}

/// Dumps a record-like (plain-data serde) type as a nested mapping.
///
/// # Errors
///
/// Returns [`JembeError::UnsupportedParamType`] when the type does not
/// serialise to JSON.
pub fn dump_record<T: Serialize>(param: &str, value: &T) -> Result<Value, JembeError> {
    serde_json::to_value(value).map_err(|err| JembeError::UnsupportedParamType {
        param: param.to_string(),
        type_name: format!("{} ({err})", std::any::type_name::<T>()),
    })
}

/// Loads a record-like type from a nested mapping.
///
/// # Errors
///
/// Returns [`JembeError::BadParamValue`] on shape mismatch.
pub fn load_record<T: DeserializeOwned>(param: &str, value: &Value) -> Result<T, JembeError> {
    serde_json::from_value(value.clone()).map_err(|err| JembeError::BadParamValue {
        param: param.to_string(),
        reason: err.to_string(),
    })
}
