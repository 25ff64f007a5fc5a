//! Connector Framework traits
//!
//! Capability-based trait definitions for connectors, inspired by `ConnId`.

use async_trait::async_trait;

use crate::error::ConnectorResult;
use crate::filter::Filter;
use crate::operation::{AttributeDelta, AttributeSet, ConnectorObject, Uid, UID_ATTRIBUTE};
use crate::options::{OperationOptions, SearchResult};
use crate::schema::Schema;

/// Per-object search callback. Returning `false` stops the search.
pub type ResultsHandler<'a> = dyn FnMut(ConnectorObject) -> bool + Send + 'a;

/// Base trait for all connectors.
///
/// This trait provides common functionality that all connectors must implement,
/// regardless of their specific capabilities.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Get the display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the target system.
    ///
    /// Returns `Ok(())` if the connection is successful, or an error describing
    /// what went wrong.
    async fn test_connection(&self) -> ConnectorResult<()>;

    /// Dispose of connector resources.
    async fn dispose(&self) -> ConnectorResult<()>;
}

/// Capability for publishing the schema of a target system.
#[async_trait]
pub trait SchemaDiscovery: Connector {
    /// Return the object classes and attributes this connector handles.
    async fn discover_schema(&self) -> ConnectorResult<Schema>;

    /// Check if a specific object class is supported.
    async fn has_object_class(&self, object_class: &str) -> ConnectorResult<bool> {
        let schema = self.discover_schema().await?;
        Ok(schema.get_object_class(object_class).is_some())
    }
}

/// Capability for creating objects in the target system.
#[async_trait]
pub trait CreateOp: Connector {
    /// Create a new object in the target system.
    ///
    /// # Arguments
    /// * `object_class` - The type of object to create (e.g., "User", "Group")
    /// * `attributes` - The attributes for the new object
    ///
    /// # Returns
    /// The identifier assigned by the target system.
    async fn create(
        &self,
        object_class: &str,
        attributes: &AttributeSet,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid>;
}

/// Capability for updating objects attribute by attribute.
#[async_trait]
pub trait UpdateDeltaOp: Connector {
    /// Apply `modifications` to an existing object.
    ///
    /// An update that maps to no change issues no request.
    async fn update_delta(
        &self,
        object_class: &str,
        uid: &Uid,
        modifications: &[AttributeDelta],
        options: &OperationOptions,
    ) -> ConnectorResult<()>;
}

/// Capability for deleting objects from the target system.
#[async_trait]
pub trait DeleteOp: Connector {
    /// Delete an object from the target system.
    async fn delete(
        &self,
        object_class: &str,
        uid: &Uid,
        options: &OperationOptions,
    ) -> ConnectorResult<()>;
}

/// Capability for searching objects in the target system.
#[async_trait]
pub trait SearchOp: Connector {
    /// Search for objects, delivering each match to `handler`.
    ///
    /// # Arguments
    /// * `object_class` - The type of objects to search for
    /// * `filter` - The search filter, `None` for every object
    /// * `handler` - Receives each object; returning `false` stops the search
    /// * `options` - Attributes to return and paging
    async fn search(
        &self,
        object_class: &str,
        filter: Option<&Filter>,
        handler: &mut ResultsHandler<'_>,
        options: &OperationOptions,
    ) -> ConnectorResult<SearchResult>;

    /// Get a single object by its UID.
    async fn get(
        &self,
        object_class: &str,
        uid: &Uid,
        options: &OperationOptions,
    ) -> ConnectorResult<Option<ConnectorObject>> {
        let filter = Filter::eq(UID_ATTRIBUTE, uid.value());
        let mut found = None;
        let mut handler = |object: ConnectorObject| {
            found = Some(object);
            false
        };
        self.search(object_class, Some(&filter), &mut handler, options)
            .await?;
        Ok(found)
    }
}

/// Marker trait for connectors that support all CRUD operations.
pub trait FullCrud: CreateOp + UpdateDeltaOp + DeleteOp + SearchOp {}

impl<T> FullCrud for T where T: CreateOp + UpdateDeltaOp + DeleteOp + SearchOp {}
