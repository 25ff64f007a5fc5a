//! Per-object-class operation handlers.

use std::collections::BTreeSet;

use async_trait::async_trait;
use idm_connector::definition::SchemaDefinition;
use idm_connector::error::{ConnectorError, ConnectorResult};
use idm_connector::operation::{AttributeDelta, AttributeSet, Uid};
use idm_connector::options::{OperationOptions, PageRequest};
use idm_connector::schema::ObjectClass;
use idm_connector::traits::ResultsHandler;

use crate::client::GuardClient;
use crate::config::GuardConfiguration;

/// What every handler call needs besides its arguments.
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    pub client: &'a dyn GuardClient,
    pub config: &'a GuardConfiguration,
}

impl<'a> HandlerContext<'a> {
    pub fn new(client: &'a dyn GuardClient, config: &'a GuardConfiguration) -> Self {
        Self { client, config }
    }
}

/// Operations for one object class.
///
/// Lookups return the number of objects the vendor reported, which for
/// listings is the vendor total rather than the number delivered.
#[async_trait]
pub trait ObjectHandler: Send + Sync {
    fn object_class(&self) -> &str;

    /// Published metadata for the object class.
    fn object_class_info(&self) -> ObjectClass;

    /// Attribute names a read with `options` returns.
    fn returned_attributes(&self, options: &OperationOptions) -> BTreeSet<String>;

    /// Attributes whose values compare case-insensitively.
    fn case_insensitive_attributes(&self) -> BTreeSet<String>;

    async fn create(
        &self,
        ctx: HandlerContext<'_>,
        attributes: &AttributeSet,
    ) -> ConnectorResult<Uid>;

    async fn update_delta(
        &self,
        ctx: HandlerContext<'_>,
        uid: &Uid,
        modifications: &[AttributeDelta],
    ) -> ConnectorResult<()>;

    async fn delete(&self, ctx: HandlerContext<'_>, uid: &Uid) -> ConnectorResult<()>;

    async fn get_by_uid(
        &self,
        ctx: HandlerContext<'_>,
        uid: &Uid,
        handler: &mut ResultsHandler<'_>,
        options: &OperationOptions,
    ) -> ConnectorResult<u64>;

    async fn get_by_name(
        &self,
        ctx: HandlerContext<'_>,
        name: &str,
        handler: &mut ResultsHandler<'_>,
        options: &OperationOptions,
    ) -> ConnectorResult<u64>;

    async fn get_all(
        &self,
        ctx: HandlerContext<'_>,
        handler: &mut ResultsHandler<'_>,
        options: &OperationOptions,
        page: PageRequest,
    ) -> ConnectorResult<u64>;

    /// Objects holding every one of `member_ids`.
    async fn get_by_members(
        &self,
        _ctx: HandlerContext<'_>,
        _member_ids: &[String],
        _handler: &mut ResultsHandler<'_>,
        _options: &OperationOptions,
        _page: PageRequest,
    ) -> ConnectorResult<u64> {
        Err(ConnectorError::operation_failed(format!(
            "{} cannot be searched by member",
            self.object_class()
        )))
    }
}

/// Read options resolved against a schema definition.
pub(crate) struct ReadRequest {
    pub returned: BTreeSet<String>,
    pub fetch_fields: BTreeSet<String>,
    pub allow_partial_values: bool,
}

impl ReadRequest {
    pub fn new<M, P>(schema: &SchemaDefinition<M, P>, options: &OperationOptions) -> Self {
        let returned = schema.returned_attributes(options);
        let fetch_fields = schema.fetch_fields(&returned);
        Self {
            returned,
            fetch_fields,
            allow_partial_values: options.allow_partial_attribute_values,
        }
    }
}

/// Map `model` and hand it to `handler`. Returns the handler's verdict.
pub(crate) fn deliver<M, P>(
    schema: &SchemaDefinition<M, P>,
    model: &M,
    read: &ReadRequest,
    handler: &mut ResultsHandler<'_>,
) -> ConnectorResult<bool> {
    let object = schema.to_connector_object(model, &read.returned, read.allow_partial_values)?;
    Ok(handler(object))
}

/// Mapping failures raised inside a paging callback.
///
/// The callback stops paging on the first failure; the failure is reported
/// once the client returns.
#[derive(Default)]
pub(crate) struct PageFailure(Option<ConnectorError>);

impl PageFailure {
    /// Record the outcome of a delivery and return whether to continue.
    pub fn track(&mut self, outcome: ConnectorResult<bool>) -> bool {
        match outcome {
            Ok(proceed) => proceed,
            Err(e) => {
                self.0 = Some(e);
                false
            }
        }
    }

    /// Combine with the client's result.
    pub fn finish(self, total: ConnectorResult<u64>) -> ConnectorResult<u64> {
        match self.0 {
            Some(e) => Err(e),
            None => total,
        }
    }
}
