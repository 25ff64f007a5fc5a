//! Atlassian Guard SCIM 2.0 resource models.
//!
//! Plain records mirroring the vendor JSON. Unknown fields are ignored on
//! read and unset fields are omitted on write.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// SCIM Core User schema URI.
pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// SCIM Core Group schema URI.
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// User resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardUser {
    /// SCIM schemas.
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Server-assigned identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Unique, case-sensitive login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Name components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<GuardName>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Whether the account is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<GuardEmail>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phone_numbers: Vec<GuardPhoneNumber>,

    /// Group memberships (read-only, populated by the server).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GuardGroupRef>,

    /// Resource metadata (read-only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<GuardMeta>,
}

impl GuardUser {
    /// Create a blank user carrying the core schema.
    pub fn new() -> Self {
        Self {
            schemas: vec![USER_SCHEMA.to_string()],
            ..Default::default()
        }
    }
}

/// User name components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub honorific_prefix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub honorific_suffix: Option<String>,
}

/// Email value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardEmail {
    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

impl GuardEmail {
    /// A primary email with the given address.
    pub fn primary(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            primary: Some(true),
            ..Default::default()
        }
    }

    pub fn is_primary(&self) -> bool {
        self.primary == Some(true)
    }
}

/// Phone number value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardPhoneNumber {
    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub phone_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

impl GuardPhoneNumber {
    /// A primary phone number of the given type.
    pub fn primary(value: impl Into<String>, phone_type: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            phone_type: Some(phone_type.into()),
            primary: Some(true),
            ..Default::default()
        }
    }

    pub fn is_primary(&self) -> bool {
        self.primary == Some(true)
    }
}

/// Group reference held by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardGroupRef {
    pub value: String,

    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    /// Reference type, "Group" for group memberships.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

/// Resource metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    /// ISO-8601 creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    /// ISO-8601 modification timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl GuardMeta {
    /// Creation time, if present and well-formed.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp("meta.created", self.created.as_deref())
    }

    /// Last modification time, if present and well-formed.
    pub fn last_modified_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp("meta.lastModified", self.last_modified.as_deref())
    }
}

fn parse_timestamp(field: &str, raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(field, value = raw, error = %e, "Ignoring malformed timestamp");
            None
        }
    }
}

/// Group resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardGroup {
    /// SCIM schemas.
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Server-assigned identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Case-insensitive display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<GuardMember>,

    /// Resource metadata (read-only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<GuardMeta>,
}

impl GuardGroup {
    /// Create a blank group carrying the core schema.
    pub fn new() -> Self {
        Self {
            schemas: vec![GROUP_SCHEMA.to_string()],
            ..Default::default()
        }
    }

    /// Identifiers of every member, whatever their type.
    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.value.as_str())
    }
}

/// Group member reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardMember {
    pub value: String,

    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    /// Member type, "User" for user members.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub member_type: Option<String>,
}

impl GuardMember {
    /// A member reference carrying only its identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }
}
