//! SCIM PATCH request body.
//!
//! Clearing follows the vendor's conventions: a scalar is cleared by
//! replacing it with an empty string, a multi-valued composite (emails,
//! phone numbers) by replacing the whole collection with an empty list,
//! and a boolean cannot be cleared at all.

use idm_connector::error::ConnectorResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::{GuardEmail, GuardPhoneNumber};

/// SCIM Patch Operation schema URI.
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Patch operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

/// One PATCH instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    pub value: Value,
}

/// Ordered list of PATCH instructions, serialized as the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperations {
    pub schemas: Vec<String>,

    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

impl Default for PatchOperations {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchOperations {
    pub fn new() -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations: Vec::new(),
        }
    }

    fn push(&mut self, op: PatchOp, path: &str, value: Value) {
        self.operations.push(PatchOperation {
            op,
            path: path.to_string(),
            value,
        });
    }

    /// Replace a scalar string. `None` clears it with an empty string.
    pub fn replace(&mut self, path: &str, value: Option<String>) {
        self.push(PatchOp::Replace, path, Value::String(value.unwrap_or_default()));
    }

    /// Replace a boolean. `None` emits nothing.
    pub fn replace_bool(&mut self, path: &str, value: Option<bool>) {
        if let Some(value) = value {
            self.push(PatchOp::Replace, path, Value::Bool(value));
        }
    }

    /// Replace the email collection with a single entry, or empty it.
    pub fn replace_email(&mut self, value: Option<GuardEmail>) -> ConnectorResult<()> {
        let emails: Vec<GuardEmail> = value.into_iter().collect();
        self.push(PatchOp::Replace, "emails", serde_json::to_value(emails)?);
        Ok(())
    }

    /// Replace the phone number collection with a single entry, or empty it.
    pub fn replace_phone_number(&mut self, value: Option<GuardPhoneNumber>) -> ConnectorResult<()> {
        let phone_numbers: Vec<GuardPhoneNumber> = value.into_iter().collect();
        self.push(
            PatchOp::Replace,
            "phoneNumbers",
            serde_json::to_value(phone_numbers)?,
        );
        Ok(())
    }

    /// Add the given members.
    pub fn add_members(&mut self, ids: Vec<String>) {
        self.push(PatchOp::Add, "members", member_refs(ids));
    }

    /// Remove the given members.
    pub fn remove_members(&mut self, ids: Vec<String>) {
        self.push(PatchOp::Remove, "members", member_refs(ids));
    }

    /// Whether there is anything to send.
    pub fn has_attributes_change(&self) -> bool {
        !self.operations.is_empty()
    }

    /// First operation targeting `path`.
    pub fn find(&self, path: &str) -> Option<&PatchOperation> {
        self.operations.iter().find(|op| op.path == path)
    }
}

fn member_refs(ids: Vec<String>) -> Value {
    Value::Array(ids.into_iter().map(|id| json!({ "value": id })).collect())
}
