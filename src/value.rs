use std::{borrow::Cow, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::helpers::Helper;

/// Insertion-ordered map used for objects, hash arguments and local-data frames.
pub type Object = IndexMap<String, Value>;

/// A dynamically typed value that templates read from.
///
/// Arrays and objects are reference counted, so cloning a `Value` while walking
/// a path is cheap.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    /// A string that is already HTML-safe and is never escaped again.
    Safe(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<Object>),
    /// A callable value, invoked either as a helper or as a computed value.
    Function(Helper),
}

impl Value {
    /// Wraps text that must bypass HTML escaping.
    pub fn safe<T: AsRef<str>>(text: T) -> Self {
        Self::Safe(Rc::from(text.as_ref()))
    }

    /// Wraps a closure as a callable value.
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value], &crate::HelperOptions<'_>) -> crate::TemplateResult<Value>
            + 'static,
    {
        Self::Function(Helper::new(func))
    }

    /// Converts any serializable value via its JSON representation.
    #[cfg(feature = "serde")]
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// True for both `Undefined` and `Null`.
    pub const fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    pub const fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Arrays, objects, functions and safe strings count as objects.
    pub const fn is_object(&self) -> bool {
        matches!(
            self,
            Self::Array(_) | Self::Object(_) | Self::Function(_) | Self::Safe(_)
        )
    }

    /// Host truthiness: `undefined`, `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(value) => *value,
            Self::Number(number) => *number != 0.0 && !number.is_nan(),
            Self::String(text) => !text.is_empty(),
            Self::Safe(_) | Self::Array(_) | Self::Object(_) | Self::Function(_) => true,
        }
    }

    /// The emptiness rule used by `if`, `unless`, `with`, `each` and sections:
    /// falsy values and zero-length arrays are empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Array(items) => items.is_empty(),
            other => !other.is_truthy(),
        }
    }

    /// Property read. Missing properties are `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Self::Object(map) => map.get(key).cloned().unwrap_or_default(),
            Self::Array(items) if key == "length" => Self::from(items.len()),
            Self::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .cloned()
                .unwrap_or_default(),
            Self::String(text) | Self::Safe(text) if key == "length" => {
                Self::from(text.chars().count())
            }
            _ => Self::Undefined,
        }
    }

    /// String conversion used when a value lands in the output.
    pub fn to_output(&self) -> Cow<'_, str> {
        match self {
            Self::Undefined | Self::Null => Cow::Borrowed(""),
            Self::Bool(true) => Cow::Borrowed("true"),
            Self::Bool(false) => Cow::Borrowed("false"),
            Self::Number(number) => Cow::Owned(format_number(*number)),
            Self::String(text) | Self::Safe(text) => Cow::Borrowed(text),
            Self::Array(items) => Cow::Owned(
                items
                    .iter()
                    .map(|item| item.to_output())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Self::Object(_) => Cow::Borrowed("[object Object]"),
            Self::Function(_) => Cow::Borrowed("[function]"),
        }
    }
}

fn format_number(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_string()
    } else if number.is_infinite() {
        if number > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if number == 0.0 {
        "0".to_string()
    } else if number.abs() >= 1e21 || number.abs() < 1e-6 {
        // Exponent form with an explicit sign, e.g. `1e+21` and `1.5e-7`.
        let formatted = format!("{:e}", number);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        }
    } else if number.fract() == 0.0 {
        format!("{:.0}", number)
    } else {
        number.to_string()
    }
}

/// Replaces `& < > " '` with HTML entities.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Output form of a value in escaped position. Safe strings pass through.
pub fn escape_expression(value: &Value) -> String {
    match value {
        Value::Safe(text) => text.to_string(),
        other => escape_html(&other.to_output()).into_owned(),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Number(number) => write!(f, "{}", format_number(*number)),
            Self::String(text) => write!(f, "{:?}", text),
            Self::Safe(text) => write!(f, "Safe({:?})", text),
            Self::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Self::Object(map) => f.debug_map().entries(map.iter()).finish(),
            Self::Function(_) => write!(f, "[function]"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) | (Self::Safe(a), Self::Safe(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

impl_from_integer!(i32, i64, u32, u64, usize);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(Rc::from(value))
    }
}

impl From<Cow<'_, str>> for Value {
    fn from(value: Cow<'_, str>) -> Self {
        Self::String(Rc::from(value.as_ref()))
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Self::Object(Rc::new(value))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::Array(Rc::new(value.into_iter().map(Into::into).collect()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Helper> for Value {
    fn from(value: Helper) -> Self {
        Self::Function(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Bool(value),
            serde_json::Value::Number(number) => Self::Number(number.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(text) => Self::from(text),
            serde_json::Value::Array(items) => Self::from(items),
            serde_json::Value::Object(map) => Self::from(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect::<Object>(),
            ),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        Self::from(value.clone())
    }
}
