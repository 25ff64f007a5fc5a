//! Atlassian Guard connector.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use idm_connector::config::ConnectorConfig;
use idm_connector::error::{ConnectorError, ConnectorResult};
use idm_connector::filter::Filter;
use idm_connector::operation::{AttributeDelta, AttributeSet, ConnectorObject, Uid};
use idm_connector::options::{OperationOptions, PageRequest, SearchResult};
use idm_connector::schema::{OperationOptionInfo, Schema};
use idm_connector::traits::{
    Connector, CreateOp, DeleteOp, ResultsHandler, SchemaDiscovery, SearchOp, UpdateDeltaOp,
};
use tracing::{debug, info, instrument};

use crate::client::GuardClient;
use crate::config::GuardConfiguration;
use crate::filter::{translate, GuardFilter};
use crate::group::{GroupHandler, GROUP_OBJECT_CLASS};
use crate::handler::{HandlerContext, ObjectHandler};
use crate::user::{UserHandler, USER_OBJECT_CLASS};

/// Connector for an Atlassian Guard SCIM directory.
///
/// Holds no mutable state; one instance can serve concurrent operations.
pub struct GuardConnector {
    config: GuardConfiguration,
    client: Arc<dyn GuardClient>,
    users: UserHandler,
    groups: GroupHandler,
}

impl std::fmt::Debug for GuardConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardConnector")
            .field("config", &self.config.redacted())
            .finish_non_exhaustive()
    }
}

impl GuardConnector {
    /// Validate `config` and build the mapping tables.
    pub fn new(config: GuardConfiguration, client: Arc<dyn GuardClient>) -> ConnectorResult<Self> {
        config.validate()?;
        let connector = Self {
            users: UserHandler::new()?,
            groups: GroupHandler::new()?,
            config,
            client,
        };
        info!(base_url = %connector.config.base_url, "Initialized Atlassian Guard connector");
        Ok(connector)
    }

    pub fn config(&self) -> &GuardConfiguration {
        &self.config
    }

    fn context(&self) -> HandlerContext<'_> {
        HandlerContext::new(self.client.as_ref(), &self.config)
    }

    fn handler(&self, object_class: &str) -> ConnectorResult<&dyn ObjectHandler> {
        match object_class {
            USER_OBJECT_CLASS => Ok(&self.users),
            GROUP_OBJECT_CLASS => Ok(&self.groups),
            _ => Err(ConnectorError::ObjectClassNotSupported {
                object_class: object_class.to_string(),
            }),
        }
    }

    /// List every object and keep the ones `filter` matches.
    ///
    /// Attributes the filter needs but the caller did not ask for are
    /// fetched for evaluation and stripped before delivery. Case-insensitive
    /// attributes compare the way the vendor compares them.
    async fn scan(
        &self,
        object_handler: &dyn ObjectHandler,
        filter: &Filter,
        handler: &mut ResultsHandler<'_>,
        options: &OperationOptions,
        page: PageRequest,
    ) -> ConnectorResult<u64> {
        let requested = object_handler.returned_attributes(options);
        let extra: BTreeSet<String> = filter
            .attributes()
            .into_iter()
            .filter(|name| !requested.contains(name))
            .collect();
        debug!(
            object_class = object_handler.object_class(),
            extra = ?extra,
            "Filter not translatable, scanning"
        );

        let scan_options = if extra.is_empty() {
            options.clone()
        } else {
            OperationOptions {
                attributes_to_get: Some(requested.iter().chain(&extra).cloned().collect()),
                return_default_attributes: false,
                ..options.clone()
            }
        };

        let case_insensitive = object_handler.case_insensitive_attributes();
        let mut matching = |mut object: ConnectorObject| {
            if !filter.matches_ignoring_case(&object, &case_insensitive) {
                return true;
            }
            for name in &extra {
                object.attributes.remove(name);
            }
            handler(object)
        };
        object_handler
            .get_all(self.context(), &mut matching, &scan_options, page)
            .await
    }
}

#[async_trait]
impl Connector for GuardConnector {
    fn display_name(&self) -> &str {
        "Atlassian Guard"
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        self.client.test_connection().await
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        debug!("Disposing Atlassian Guard connector");
        Ok(())
    }
}

#[async_trait]
impl SchemaDiscovery for GuardConnector {
    async fn discover_schema(&self) -> ConnectorResult<Schema> {
        let mut schema = Schema::new();
        schema.add_object_class(self.users.object_class_info());
        schema.add_object_class(self.groups.object_class_info());
        for option in OperationOptionInfo::search_defaults() {
            schema.add_operation_option(option);
        }
        Ok(schema)
    }
}

#[async_trait]
impl CreateOp for GuardConnector {
    async fn create(
        &self,
        object_class: &str,
        attributes: &AttributeSet,
        _options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        self.handler(object_class)?
            .create(self.context(), attributes)
            .await
    }
}

#[async_trait]
impl UpdateDeltaOp for GuardConnector {
    async fn update_delta(
        &self,
        object_class: &str,
        uid: &Uid,
        modifications: &[AttributeDelta],
        _options: &OperationOptions,
    ) -> ConnectorResult<()> {
        self.handler(object_class)?
            .update_delta(self.context(), uid, modifications)
            .await
    }
}

#[async_trait]
impl DeleteOp for GuardConnector {
    async fn delete(
        &self,
        object_class: &str,
        uid: &Uid,
        _options: &OperationOptions,
    ) -> ConnectorResult<()> {
        self.handler(object_class)?.delete(self.context(), uid).await
    }
}

#[async_trait]
impl SearchOp for GuardConnector {
    #[instrument(skip(self, filter, handler, options))]
    async fn search(
        &self,
        object_class: &str,
        filter: Option<&Filter>,
        handler: &mut ResultsHandler<'_>,
        options: &OperationOptions,
    ) -> ConnectorResult<SearchResult> {
        let object_handler = self.handler(object_class)?;
        let ctx = self.context();
        let page = options.page_request(self.config.default_page_size);

        let total = match filter {
            None => object_handler.get_all(ctx, handler, options, page).await?,
            Some(filter) => match translate(object_class, filter) {
                Some(GuardFilter::ByUid(uid)) => {
                    object_handler.get_by_uid(ctx, &uid, handler, options).await?
                }
                Some(GuardFilter::ByName(name)) => {
                    object_handler.get_by_name(ctx, &name, handler, options).await?
                }
                Some(GuardFilter::ByMembers(ids)) => {
                    object_handler
                        .get_by_members(ctx, &ids, handler, options, page)
                        .await?
                }
                None => {
                    self.scan(object_handler, filter, handler, options, page)
                        .await?
                }
            },
        };

        debug!(total, "Search finished");
        Ok(SearchResult::from_total(total, &page))
    }
}
