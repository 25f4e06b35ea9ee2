//! Attribute maps attached to every contributed state, control, parameter, and constraint.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute name → value mapping carried by a single contribution.
pub type Options = BTreeMap<String, OptionValue>;

/// A single option value. The composition layer treats these as opaque apart
/// from a handful of structural keys (`type`, `loc`, `opt`, `val`, bounds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Names(Vec<String>),
}

impl OptionValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_names(&self) -> Option<&[String]> {
        match self {
            OptionValue::Names(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Flag(v) => write!(f, "{v}"),
            OptionValue::Number(v) => write!(f, "{v}"),
            OptionValue::Text(v) => write!(f, "'{v}'"),
            OptionValue::Names(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Flag(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Number(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Number(f64::from(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::Names(value)
    }
}

impl<const N: usize> From<[&str; N]> for OptionValue {
    fn from(value: [&str; N]) -> Self {
        OptionValue::Names(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Build an [`Options`] map from `key => value` pairs.
///
/// ```
/// use composer_core::options;
///
/// let opts = options! { "units" => "m", "lower" => 0.0, "fix_initial" => true };
/// assert_eq!(opts.len(), 3);
/// ```
#[macro_export]
macro_rules! options {
    () => {
        $crate::Options::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut opts = $crate::Options::new();
        $(
            opts.insert(::std::string::String::from($key), $crate::OptionValue::from($value));
        )+
        opts
    }};
}
