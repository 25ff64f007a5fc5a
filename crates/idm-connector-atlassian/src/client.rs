//! Transport collaborator.
//!
//! The connector never speaks HTTP itself. A [`GuardClient`] implementation
//! owns the REST calls, authentication, timeouts and any retry policy, and
//! reports vendor failures with the matching [`ConnectorError`] variant:
//!
//! - conflicts on create as `ObjectAlreadyExists`
//! - missing targets on patch and delete as `UnknownUid`
//!
//! [`ConnectorError`]: idm_connector::error::ConnectorError

use std::collections::BTreeSet;

use async_trait::async_trait;
use idm_connector::error::ConnectorResult;
use idm_connector::operation::Uid;
use idm_connector::options::PageRequest;

use crate::model::{GuardGroup, GuardUser};
use crate::patch::PatchOperations;

/// Per-record callback for paged listings. Returning `false` stops paging.
pub type ModelHandler<'a, T> = dyn FnMut(T) -> bool + Send + 'a;

/// Vendor REST client.
///
/// Listing methods deliver records in vendor order starting at
/// `page.offset`. They walk every page unless `page.single_page` is set, stop
/// requesting pages as soon as the handler returns `false`, and return the
/// total number of resources the vendor reports.
///
/// `fetch_fields` names the vendor attributes the caller needs; clients may
/// use it to narrow the response.
#[async_trait]
pub trait GuardClient: Send + Sync {
    /// Check that the directory is reachable with the configured token.
    async fn test_connection(&self) -> ConnectorResult<()>;

    // Users

    async fn create_user(&self, user: &GuardUser) -> ConnectorResult<Uid>;

    async fn patch_user(&self, uid: &Uid, operations: &PatchOperations) -> ConnectorResult<()>;

    async fn get_user_by_uid(
        &self,
        uid: &Uid,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<Option<GuardUser>>;

    async fn get_user_by_name(
        &self,
        user_name: &str,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<Option<GuardUser>>;

    async fn get_users(
        &self,
        handler: &mut ModelHandler<'_, GuardUser>,
        page: PageRequest,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<u64>;

    async fn delete_user(&self, uid: &Uid) -> ConnectorResult<()>;

    // Groups

    async fn create_group(&self, group: &GuardGroup) -> ConnectorResult<Uid>;

    async fn patch_group(&self, uid: &Uid, operations: &PatchOperations) -> ConnectorResult<()>;

    async fn get_group_by_uid(
        &self,
        uid: &Uid,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<Option<GuardGroup>>;

    /// Look up a group by display name with a single-result query.
    async fn get_group_by_name(
        &self,
        display_name: &str,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<Option<GuardGroup>>;

    async fn get_groups(
        &self,
        handler: &mut ModelHandler<'_, GuardGroup>,
        page: PageRequest,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<u64>;

    async fn delete_group(&self, uid: &Uid) -> ConnectorResult<()>;
}
