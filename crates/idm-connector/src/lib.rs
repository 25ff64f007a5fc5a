//! # Connector Framework
//!
//! Vendor-neutral abstractions for provisioning identities to external
//! systems.
//!
//! Connectors exchange a generic attribute model with their caller
//! ([`operation`]) and translate it to and from a vendor resource model
//! through a declarative [`definition::SchemaDefinition`]: one descriptor per
//! attribute, each carrying its create, update, association and read
//! transforms.
//!
//! ## Architecture
//!
//! The framework uses a capability-based trait system inspired by `ConnId`:
//!
//! - [`Connector`] - Base trait all connectors implement
//! - [`SchemaDiscovery`] - Publish the supported object classes
//! - [`CreateOp`], [`UpdateDeltaOp`], [`DeleteOp`] - CRUD operations
//! - [`SearchOp`] - Search with a stoppable per-object callback
//!
//! ## Example
//!
//! ```ignore
//! use idm_connector::prelude::*;
//!
//! type Attr<T> = AttributeBuilder<T, Account, Patch>;
//!
//! let definition = SchemaDefinitionBuilder::new("Account")
//!     .add_uid(Attr::<String>::new("__UID__").native_name("id").on_read(|a| a.id.clone()))
//!     .add_name(
//!         Attr::<String>::new("__NAME__")
//!             .native_name("login")
//!             .on_create(|a, v| { a.login = v; Ok(()) })
//!             .on_update(|p, v| { p.replace("login", v); Ok(()) })
//!             .on_read(|a| a.login.clone()),
//!     )
//!     .build()?;
//!
//! let mut account = Account::default();
//! definition.apply(&attrs, &mut account, UnknownAttributePolicy::Ignore)?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`error`] - Error types with transient/permanent classification
//! - [`operation`] - Uid, `AttributeSet`, `AttributeDelta`, `ConnectorObject`
//! - [`options`] - Operation options, paging and search results
//! - [`filter`] - Search filter algebra with client-side evaluation
//! - [`definition`] - Attribute descriptors and schema definitions
//! - [`schema`] - Published schema metadata (`ObjectClass`, `SchemaAttribute`)
//! - [`traits`] - Connector capability traits
//! - [`config`] - Configuration trait

pub mod config;
pub mod definition;
pub mod error;
pub mod filter;
pub mod operation;
pub mod options;
pub mod schema;
pub mod traits;

pub use traits::{Connector, CreateOp, DeleteOp, SchemaDiscovery, SearchOp, UpdateDeltaOp};

/// Prelude module for convenient imports.
///
/// ```
/// use idm_connector::prelude::*;
/// ```
pub mod prelude {
    // Error handling
    pub use crate::error::{ConnectorError, ConnectorResult};

    // Traits
    pub use crate::traits::{
        Connector, CreateOp, DeleteOp, FullCrud, ResultsHandler, SchemaDiscovery, SearchOp,
        UpdateDeltaOp,
    };

    // Schema
    pub use crate::schema::{
        AttributeDataType, ObjectClass, OperationOptionInfo, Schema, SchemaAttribute,
    };

    // Descriptors
    pub use crate::definition::{
        AttributeBuilder, AttributeKind, AttributeType, MultiAttributeBuilder, SchemaDefinition,
        SchemaDefinitionBuilder, UnknownAttributePolicy,
    };

    // Operations
    pub use crate::filter::Filter;
    pub use crate::operation::{
        AttributeDelta, AttributeSet, AttributeValue, ConnectorObject, Uid, ENABLE_ATTRIBUTE,
        NAME_ATTRIBUTE, UID_ATTRIBUTE,
    };
    pub use crate::options::{OperationOptions, PageRequest, SearchResult};

    // Configuration
    pub use crate::config::ConnectorConfig;
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
