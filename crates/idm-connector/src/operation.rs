//! Connector Framework operation types
//!
//! The generic attribute bag exchanged with the caller: UIDs, attribute
//! values, attribute sets, per-attribute deltas and connector objects.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the identity key attribute.
pub const UID_ATTRIBUTE: &str = "__UID__";

/// Name of the name key attribute.
pub const NAME_ATTRIBUTE: &str = "__NAME__";

/// Name of the enable/disable operational attribute.
pub const ENABLE_ATTRIBUTE: &str = "__ENABLE__";

/// Unique identifier for an object in a target system.
///
/// The value is assigned by the target system and never changes. The name
/// hint carries the human-facing handle known at the time the UID was built,
/// if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uid {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name_hint: Option<String>,
}

impl Uid {
    /// Create a new UID without a name hint.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name_hint: None,
        }
    }

    /// Create a UID carrying the object's name.
    pub fn with_name_hint(value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name_hint: Some(name.into()),
        }
    }

    /// Get the value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the name hint, if known.
    pub fn name_hint(&self) -> Option<&str> {
        self.name_hint.as_deref()
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name_hint {
            Some(name) => write!(f, "{} ({})", self.value, name),
            None => write!(f, "{}", self.value),
        }
    }
}

/// A value for an attribute, which may be single or multi-valued.
///
/// `Null` and an empty `Array` both mean "no value".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// No value (null).
    Null,
    /// A single boolean value.
    Boolean(bool),
    /// A single integer value.
    Integer(i64),
    /// A single string value.
    String(String),
    /// A single timestamp. Deserializes back as `String`.
    DateTime(DateTime<FixedOffset>),
    /// Multiple values.
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Check if this value carries nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::Null => true,
            AttributeValue::Array(values) => values.is_empty(),
            _ => false,
        }
    }

    /// Flatten into the list of individual values.
    pub fn values(&self) -> Vec<&AttributeValue> {
        match self {
            AttributeValue::Null => Vec::new(),
            AttributeValue::Array(values) => values.iter().filter(|v| !v.is_empty()).collect(),
            other => vec![other],
        }
    }

    /// Get as a string if this is a single string value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::Array(values) if values.len() == 1 => values[0].as_string(),
            _ => None,
        }
    }

    /// Get as strings (works for both single and multi-valued).
    pub fn as_strings(&self) -> Vec<&str> {
        self.values().into_iter().filter_map(|v| v.as_string()).collect()
    }

    /// Get as a boolean if this is a boolean value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            AttributeValue::Array(values) if values.len() == 1 => values[0].as_boolean(),
            _ => None,
        }
    }

    /// Get as a timestamp if this is a datetime value.
    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            AttributeValue::DateTime(dt) => Some(dt),
            AttributeValue::Array(values) if values.len() == 1 => values[0].as_datetime(),
            _ => None,
        }
    }

    /// Check if this is multi-valued.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, AttributeValue::Array(_))
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl From<DateTime<FixedOffset>> for AttributeValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        AttributeValue::DateTime(dt)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(vec: Vec<T>) -> Self {
        AttributeValue::Array(vec.into_iter().map(Into::into).collect())
    }
}

/// A set of attributes for create operations or search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSet {
    #[serde(flatten)]
    attributes: HashMap<String, AttributeValue>,
}

impl AttributeSet {
    /// Create a new empty attribute set.
    pub fn new() -> Self {
        Self {
            attributes: HashMap::new(),
        }
    }

    /// Set an attribute value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Set an attribute using builder pattern.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Get a single-valued string attribute.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_string())
    }

    /// Get a multi-valued string attribute.
    pub fn get_strings(&self, name: &str) -> Option<Vec<&str>> {
        self.get(name).map(|v| v.as_strings())
    }

    /// Check if an attribute exists.
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    /// Get all attribute names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|s| s.as_str())
    }

    /// Get the number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate over all attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

/// Change to a single attribute during an update.
///
/// A delta either replaces the attribute with `values_to_replace` (an empty
/// replacement clears it) or adds/removes individual values of a
/// multi-valued attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDelta {
    /// Attribute name.
    pub name: String,

    /// Values to add to a multi-valued attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_to_add: Option<Vec<AttributeValue>>,

    /// Values to remove from a multi-valued attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_to_remove: Option<Vec<AttributeValue>>,

    /// Full replacement. `Some(vec![])` clears the attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_to_replace: Option<Vec<AttributeValue>>,
}

impl AttributeDelta {
    /// Replace the attribute with a single value.
    pub fn replace(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        let value = value.into();
        let values = match value {
            AttributeValue::Array(values) => values,
            AttributeValue::Null => Vec::new(),
            other => vec![other],
        };
        Self {
            name: name.into(),
            values_to_replace: Some(values),
            ..Default::default()
        }
    }

    /// Clear all values of the attribute.
    pub fn clear(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values_to_replace: Some(Vec::new()),
            ..Default::default()
        }
    }

    /// Add values to a multi-valued attribute.
    pub fn add_values<T: Into<AttributeValue>>(name: impl Into<String>, values: Vec<T>) -> Self {
        Self::add_remove(name, values, Vec::<AttributeValue>::new())
    }

    /// Remove values from a multi-valued attribute.
    pub fn remove_values<T: Into<AttributeValue>>(
        name: impl Into<String>,
        values: Vec<T>,
    ) -> Self {
        Self::add_remove(name, Vec::<AttributeValue>::new(), values)
    }

    /// Add and remove values of a multi-valued attribute in one delta.
    pub fn add_remove<A, R>(name: impl Into<String>, add: Vec<A>, remove: Vec<R>) -> Self
    where
        A: Into<AttributeValue>,
        R: Into<AttributeValue>,
    {
        let add: Vec<AttributeValue> = add.into_iter().map(Into::into).collect();
        let remove: Vec<AttributeValue> = remove.into_iter().map(Into::into).collect();
        Self {
            name: name.into(),
            values_to_add: (!add.is_empty()).then_some(add),
            values_to_remove: (!remove.is_empty()).then_some(remove),
            values_to_replace: None,
        }
    }

    /// Check if this delta is a full replacement.
    pub fn is_replace(&self) -> bool {
        self.values_to_replace.is_some()
    }
}

/// An object read back from the target system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorObject {
    /// Object class name (e.g., "User", "Group").
    pub object_class: String,
    /// Identity of the object.
    pub uid: Uid,
    /// Attributes, including `__UID__` and `__NAME__`.
    pub attributes: AttributeSet,
    /// Attributes known to exist but whose values were not fetched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incomplete_attributes: Vec<String>,
}

impl ConnectorObject {
    /// Get the object's name.
    pub fn name(&self) -> Option<&str> {
        self.attributes.get_string(NAME_ATTRIBUTE)
    }

    /// Get an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}
