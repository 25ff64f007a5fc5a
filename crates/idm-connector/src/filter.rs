//! Search filter algebra.
//!
//! Connectors translate what their target can evaluate server-side. Anything
//! else is evaluated here, against objects fetched by a full scan.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::operation::{AttributeValue, ConnectorObject};

/// Filter for search operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Match objects where the attribute equals the value.
    Equals {
        attribute: String,
        value: AttributeValue,
    },

    /// Match objects where the attribute holds every one of the values.
    ContainsAllValues {
        attribute: String,
        values: Vec<AttributeValue>,
    },

    /// Match objects where a string value of the attribute contains the substring.
    Contains { attribute: String, value: String },

    /// Match objects where a string value of the attribute starts with the prefix.
    StartsWith { attribute: String, value: String },

    /// Match objects where a string value of the attribute ends with the suffix.
    EndsWith { attribute: String, value: String },

    /// Match objects where the attribute has any value.
    Present { attribute: String },

    /// Logical AND of multiple filters.
    And { filters: Vec<Filter> },

    /// Logical OR of multiple filters.
    Or { filters: Vec<Filter> },

    /// Logical NOT of a filter.
    Not { filter: Box<Filter> },
}

impl Filter {
    /// Create an equals filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a contains-all-values filter.
    pub fn contains_all<T: Into<AttributeValue>>(
        attribute: impl Into<String>,
        values: Vec<T>,
    ) -> Self {
        Filter::ContainsAllValues {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a contains (substring) filter.
    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a starts-with filter.
    pub fn starts_with(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::StartsWith {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an ends-with filter.
    pub fn ends_with(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::EndsWith {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a present (attribute exists) filter.
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Create an OR filter.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    /// Create a NOT filter (negation).
    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Evaluate this filter against an object, comparing values exactly.
    pub fn matches(&self, object: &ConnectorObject) -> bool {
        self.matches_ignoring_case(object, &BTreeSet::new())
    }

    /// Evaluate this filter against an object.
    ///
    /// String values of the attributes named in `case_insensitive` are
    /// compared without regard to case.
    pub fn matches_ignoring_case(
        &self,
        object: &ConnectorObject,
        case_insensitive: &BTreeSet<String>,
    ) -> bool {
        let fold = |attribute: &str| case_insensitive.contains(attribute);
        match self {
            Filter::Equals { attribute, value } => {
                let fold = fold(attribute);
                let actual = comparable(values_of(object, attribute), fold);
                let expected = comparable(value.values(), fold);
                actual.len() == expected.len() && expected.iter().all(|v| actual.contains(v))
            }
            Filter::ContainsAllValues { attribute, values } => {
                let fold = fold(attribute);
                let actual = comparable(values_of(object, attribute), fold);
                comparable(values.iter().flat_map(AttributeValue::values).collect(), fold)
                    .iter()
                    .all(|v| actual.contains(v))
            }
            Filter::Contains { attribute, value } => {
                any_string(object, attribute, value, fold(attribute), |s, v| s.contains(v))
            }
            Filter::StartsWith { attribute, value } => {
                any_string(object, attribute, value, fold(attribute), |s, v| s.starts_with(v))
            }
            Filter::EndsWith { attribute, value } => {
                any_string(object, attribute, value, fold(attribute), |s, v| s.ends_with(v))
            }
            Filter::Present { attribute } => !values_of(object, attribute).is_empty(),
            Filter::And { filters } => filters
                .iter()
                .all(|f| f.matches_ignoring_case(object, case_insensitive)),
            Filter::Or { filters } => filters
                .iter()
                .any(|f| f.matches_ignoring_case(object, case_insensitive)),
            Filter::Not { filter } => !filter.matches_ignoring_case(object, case_insensitive),
        }
    }

    /// Names of the attributes this filter reads, without duplicates.
    pub fn attributes(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes(&self, names: &mut BTreeSet<String>) {
        match self {
            Filter::Equals { attribute, .. }
            | Filter::ContainsAllValues { attribute, .. }
            | Filter::Contains { attribute, .. }
            | Filter::StartsWith { attribute, .. }
            | Filter::EndsWith { attribute, .. }
            | Filter::Present { attribute } => {
                names.insert(attribute.clone());
            }
            Filter::And { filters } | Filter::Or { filters } => {
                for filter in filters {
                    filter.collect_attributes(names);
                }
            }
            Filter::Not { filter } => filter.collect_attributes(names),
        }
    }
}

fn values_of<'a>(object: &'a ConnectorObject, attribute: &str) -> Vec<&'a AttributeValue> {
    object
        .attribute(attribute)
        .map(AttributeValue::values)
        .unwrap_or_default()
}

/// Values ready for comparison, string values lowercased when `fold` is set.
fn comparable(values: Vec<&AttributeValue>, fold: bool) -> Vec<AttributeValue> {
    values
        .into_iter()
        .map(|value| match value {
            AttributeValue::String(s) if fold => AttributeValue::String(s.to_lowercase()),
            other => other.clone(),
        })
        .collect()
}

fn any_string(
    object: &ConnectorObject,
    attribute: &str,
    value: &str,
    fold: bool,
    pred: impl Fn(&str, &str) -> bool,
) -> bool {
    let mut strings = values_of(object, attribute)
        .into_iter()
        .filter_map(AttributeValue::as_string);
    if fold {
        let value = value.to_lowercase();
        strings.map(str::to_lowercase).any(|s| pred(s.as_str(), value.as_str()))
    } else {
        strings.any(|s| pred(s, value))
    }
}
