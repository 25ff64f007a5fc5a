//! Atlassian Guard Connector
//!
//! This crate implements the idm-connector traits for an Atlassian Guard
//! user directory, exposed by the vendor as a SCIM 2.0 API.
//!
//! # Features
//!
//! - `User` and `Group` object classes with create, delta update, delete and search
//! - Virtual attributes for the primary email and the primary phone number
//! - Group membership managed through `members.User.value` add/remove deltas
//! - Server-side lookups by id and name, client-side evaluation for everything else
//! - Member searches answered by scanning groups, skipping ignored ones
//!
//! The HTTP transport is not part of this crate. Callers supply a
//! [`GuardClient`] implementation.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use idm_connector::prelude::*;
//! use idm_connector_atlassian::{GuardConfiguration, GuardConnector};
//!
//! let config = GuardConfiguration::new(
//!     "https://api.atlassian.com/scim/directory/your-directory-id",
//!     "your-api-token",
//! );
//! let connector = GuardConnector::new(config, Arc::new(http_client))?;
//!
//! let uid = connector
//!     .create(
//!         "User",
//!         &AttributeSet::new()
//!             .with(NAME_ATTRIBUTE, "foo")
//!             .with("primaryEmail", "foo@example.com"),
//!         &OperationOptions::new(),
//!     )
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod connector;
pub mod filter;
pub mod group;
pub mod handler;
pub mod model;
pub mod patch;
pub mod user;

// Re-exports
pub use client::{GuardClient, ModelHandler};
pub use config::GuardConfiguration;
pub use connector::GuardConnector;
pub use filter::{translate, GuardFilter};
pub use group::{group_schema, GroupHandler, GroupSchema, GROUP_OBJECT_CLASS, MEMBERS_ATTRIBUTE};
pub use handler::{HandlerContext, ObjectHandler};
pub use model::{
    GuardEmail, GuardGroup, GuardGroupRef, GuardMember, GuardMeta, GuardName, GuardPhoneNumber,
    GuardUser,
};
pub use patch::{PatchOp, PatchOperation, PatchOperations};
pub use user::{user_schema, UserHandler, UserSchema, USER_OBJECT_CLASS};
