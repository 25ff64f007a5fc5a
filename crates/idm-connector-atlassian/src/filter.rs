//! Translation of generic filters into vendor lookups.
//!
//! The vendor can look resources up by id and by name, nothing more.
//! Group membership queries are answered by scanning every group.

use idm_connector::filter::Filter;
use idm_connector::operation::{AttributeValue, Uid, NAME_ATTRIBUTE, UID_ATTRIBUTE};

use crate::group::{GROUP_OBJECT_CLASS, MEMBERS_ATTRIBUTE};

/// A lookup the Atlassian handlers can run directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardFilter {
    /// Fetch one resource by identifier.
    ByUid(Uid),
    /// Fetch one resource by name.
    ByName(String),
    /// Groups holding every listed member.
    ByMembers(Vec<String>),
}

/// Translate `filter` for `object_class`.
///
/// Returns `None` when the filter has no vendor equivalent; the caller then
/// scans and filters client-side.
pub fn translate(object_class: &str, filter: &Filter) -> Option<GuardFilter> {
    match filter {
        Filter::Equals { attribute, value } => {
            let value = single_string(value)?;
            match attribute.as_str() {
                UID_ATTRIBUTE => Some(GuardFilter::ByUid(Uid::new(value))),
                NAME_ATTRIBUTE => Some(GuardFilter::ByName(value)),
                _ => None,
            }
        }
        Filter::ContainsAllValues { attribute, values }
            if object_class == GROUP_OBJECT_CLASS && attribute == MEMBERS_ATTRIBUTE =>
        {
            let ids: Option<Vec<String>> = values
                .iter()
                .flat_map(AttributeValue::values)
                .map(|v| v.as_string().map(str::to_string))
                .collect();
            ids.map(GuardFilter::ByMembers)
        }
        _ => None,
    }
}

fn single_string(value: &AttributeValue) -> Option<String> {
    match value.values().as_slice() {
        [single] => single.as_string().map(str::to_string),
        _ => None,
    }
}
