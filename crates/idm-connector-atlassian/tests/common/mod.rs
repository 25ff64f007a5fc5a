//! In-memory Atlassian Guard directory for integration testing.
//!
//! Stores users and groups in insertion order, pages through them the way
//! the vendor does and records every call for assertions.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use idm_connector::error::{ConnectorError, ConnectorResult};
use idm_connector::filter::Filter;
use idm_connector::operation::{ConnectorObject, Uid};
use idm_connector::options::{OperationOptions, PageRequest, SearchResult};
use idm_connector::traits::SearchOp;
use idm_connector_atlassian::{
    GuardClient, GuardConfiguration, GuardConnector, GuardGroup, GuardMember, GuardUser,
    ModelHandler, PatchOperations,
};

pub const BASE_URL: &str = "https://api.atlassian.com/scim/directory/test";

/// Everything the connector asked the directory to do.
#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub created_users: Vec<GuardUser>,
    pub created_groups: Vec<GuardGroup>,
    pub user_patches: Vec<(String, PatchOperations)>,
    pub group_patches: Vec<(String, PatchOperations)>,
    pub deleted: Vec<String>,
    pub group_name_lookups: Vec<String>,
    /// Page requests received by listing calls.
    pub pages: Vec<PageRequest>,
    /// Vendor pages served across all listing calls.
    pub page_fetches: usize,
    pub fetch_fields: Vec<BTreeSet<String>>,
}

#[derive(Default)]
pub struct MockClient {
    users: RwLock<Vec<GuardUser>>,
    groups: RwLock<Vec<GuardGroup>>,
    calls: RwLock<Calls>,
    offline: bool,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose connection test fails.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub async fn add_user(&self, user: GuardUser) {
        self.users.write().await.push(user);
    }

    pub async fn add_group(&self, group: GuardGroup) {
        self.groups.write().await.push(group);
    }

    pub async fn calls(&self) -> Calls {
        self.calls.read().await.clone()
    }

    pub async fn users(&self) -> Vec<GuardUser> {
        self.users.read().await.clone()
    }

    pub async fn groups(&self) -> Vec<GuardGroup> {
        self.groups.read().await.clone()
    }

    async fn record_listing(&self, page: PageRequest, fetch_fields: &BTreeSet<String>) {
        let mut calls = self.calls.write().await;
        calls.pages.push(page);
        calls.fetch_fields.push(fetch_fields.clone());
    }

    /// Deliver `items` page by page. Returns the number of pages served.
    fn page_through<T: Clone>(
        items: &[T],
        handler: &mut ModelHandler<'_, T>,
        page: PageRequest,
    ) -> usize {
        let size = page.page_size.max(1) as usize;
        let mut start = page.offset.max(1) as usize - 1;
        let mut fetches = 0;
        loop {
            fetches += 1;
            let chunk: Vec<&T> = items.iter().skip(start).take(size).collect();
            for item in &chunk {
                if !handler((*item).clone()) {
                    return fetches;
                }
            }
            start += size;
            if page.single_page || chunk.len() < size || start >= items.len() {
                return fetches;
            }
        }
    }
}

#[async_trait]
impl GuardClient for MockClient {
    async fn test_connection(&self) -> ConnectorResult<()> {
        if self.offline {
            return Err(ConnectorError::connection_failed("directory unreachable"));
        }
        Ok(())
    }

    async fn create_user(&self, user: &GuardUser) -> ConnectorResult<Uid> {
        let user_name = user.user_name.clone().unwrap_or_default();
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.user_name.as_deref() == Some(user_name.as_str()))
        {
            return Err(ConnectorError::already_exists(format!(
                "User \"{user_name}\" already exists"
            )));
        }

        let id = Uuid::new_v4().to_string();
        let mut stored = user.clone();
        stored.id = Some(id.clone());
        users.push(stored);
        self.calls.write().await.created_users.push(user.clone());
        Ok(Uid::with_name_hint(id, user_name))
    }

    async fn patch_user(&self, uid: &Uid, operations: &PatchOperations) -> ConnectorResult<()> {
        let known = self
            .users
            .read()
            .await
            .iter()
            .any(|u| u.id.as_deref() == Some(uid.value()));
        if !known {
            return Err(ConnectorError::unknown_uid(uid.value()));
        }
        self.calls
            .write()
            .await
            .user_patches
            .push((uid.value().to_string(), operations.clone()));
        Ok(())
    }

    async fn get_user_by_uid(
        &self,
        uid: &Uid,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<Option<GuardUser>> {
        self.calls.write().await.fetch_fields.push(fetch_fields.clone());
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.id.as_deref() == Some(uid.value()))
            .cloned())
    }

    async fn get_user_by_name(
        &self,
        user_name: &str,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<Option<GuardUser>> {
        self.calls.write().await.fetch_fields.push(fetch_fields.clone());
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.user_name.as_deref() == Some(user_name))
            .cloned())
    }

    async fn get_users(
        &self,
        handler: &mut ModelHandler<'_, GuardUser>,
        page: PageRequest,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<u64> {
        self.record_listing(page, fetch_fields).await;
        let users = self.users.read().await.clone();
        let fetches = Self::page_through(&users, handler, page);
        self.calls.write().await.page_fetches += fetches;
        Ok(users.len() as u64)
    }

    async fn delete_user(&self, uid: &Uid) -> ConnectorResult<()> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id.as_deref() != Some(uid.value()));
        if users.len() == before {
            return Err(ConnectorError::unknown_uid(uid.value()));
        }
        self.calls.write().await.deleted.push(uid.value().to_string());
        Ok(())
    }

    async fn create_group(&self, group: &GuardGroup) -> ConnectorResult<Uid> {
        let id = Uuid::new_v4().to_string();
        let mut stored = group.clone();
        stored.id = Some(id.clone());
        self.groups.write().await.push(stored);
        self.calls.write().await.created_groups.push(group.clone());
        Ok(match &group.display_name {
            Some(name) => Uid::with_name_hint(id, name.clone()),
            None => Uid::new(id),
        })
    }

    async fn patch_group(&self, uid: &Uid, operations: &PatchOperations) -> ConnectorResult<()> {
        let known = self
            .groups
            .read()
            .await
            .iter()
            .any(|g| g.id.as_deref() == Some(uid.value()));
        if !known {
            return Err(ConnectorError::unknown_uid(uid.value()));
        }
        self.calls
            .write()
            .await
            .group_patches
            .push((uid.value().to_string(), operations.clone()));
        Ok(())
    }

    async fn get_group_by_uid(
        &self,
        uid: &Uid,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<Option<GuardGroup>> {
        self.calls.write().await.fetch_fields.push(fetch_fields.clone());
        Ok(self
            .groups
            .read()
            .await
            .iter()
            .find(|g| g.id.as_deref() == Some(uid.value()))
            .cloned())
    }

    async fn get_group_by_name(
        &self,
        display_name: &str,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<Option<GuardGroup>> {
        {
            let mut calls = self.calls.write().await;
            calls.group_name_lookups.push(display_name.to_string());
            calls.fetch_fields.push(fetch_fields.clone());
        }
        Ok(self
            .groups
            .read()
            .await
            .iter()
            .find(|g| {
                g.display_name
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(display_name))
            })
            .cloned())
    }

    async fn get_groups(
        &self,
        handler: &mut ModelHandler<'_, GuardGroup>,
        page: PageRequest,
        fetch_fields: &BTreeSet<String>,
    ) -> ConnectorResult<u64> {
        self.record_listing(page, fetch_fields).await;
        let groups = self.groups.read().await.clone();
        let fetches = Self::page_through(&groups, handler, page);
        self.calls.write().await.page_fetches += fetches;
        Ok(groups.len() as u64)
    }

    async fn delete_group(&self, uid: &Uid) -> ConnectorResult<()> {
        let mut groups = self.groups.write().await;
        let before = groups.len();
        groups.retain(|g| g.id.as_deref() != Some(uid.value()));
        if groups.len() == before {
            return Err(ConnectorError::unknown_uid(uid.value()));
        }
        self.calls.write().await.deleted.push(uid.value().to_string());
        Ok(())
    }
}

pub fn configuration() -> GuardConfiguration {
    GuardConfiguration::new(BASE_URL, "test-token")
}

pub fn connector(client: &Arc<MockClient>, config: GuardConfiguration) -> GuardConnector {
    let client: Arc<dyn GuardClient> = client.clone();
    GuardConnector::new(config, client).expect("valid test configuration")
}

/// A stored user with the given id and login.
pub fn user(id: &str, user_name: &str) -> GuardUser {
    GuardUser {
        id: Some(id.to_string()),
        user_name: Some(user_name.to_string()),
        active: Some(true),
        ..GuardUser::new()
    }
}

/// A stored group whose members are all users.
pub fn group(id: &str, display_name: &str, members: &[&str]) -> GuardGroup {
    GuardGroup {
        id: Some(id.to_string()),
        display_name: Some(display_name.to_string()),
        members: members
            .iter()
            .map(|m| GuardMember {
                member_type: Some("User".to_string()),
                ..GuardMember::new(*m)
            })
            .collect(),
        ..GuardGroup::new()
    }
}

/// Run a search and collect every delivered object.
pub async fn search(
    connector: &GuardConnector,
    object_class: &str,
    filter: Option<&Filter>,
    options: &OperationOptions,
) -> ConnectorResult<(Vec<ConnectorObject>, SearchResult)> {
    let mut found = Vec::new();
    let mut handler = |object: ConnectorObject| {
        found.push(object);
        true
    };
    let result = connector
        .search(object_class, filter, &mut handler, options)
        .await?;
    Ok((found, result))
}
