//! Group object class.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use idm_connector::definition::{
    AttributeBuilder, MultiAttributeBuilder, SchemaDefinition, SchemaDefinitionBuilder,
};
use idm_connector::error::{ConnectorError, ConnectorResult};
use idm_connector::operation::{AttributeDelta, AttributeSet, Uid, NAME_ATTRIBUTE, UID_ATTRIBUTE};
use idm_connector::options::{OperationOptions, PageRequest};
use idm_connector::schema::ObjectClass;
use idm_connector::traits::ResultsHandler;
use tracing::{debug, info, instrument};

use crate::handler::{deliver, HandlerContext, ObjectHandler, PageFailure, ReadRequest};
use crate::model::{GuardGroup, GuardMember, GuardMeta};
use crate::patch::PatchOperations;

/// Object class name for groups.
pub const GROUP_OBJECT_CLASS: &str = "Group";

/// Attribute holding the user members of a group.
pub const MEMBERS_ATTRIBUTE: &str = "members.User.value";

/// Mapping table between connector attributes and [`GuardGroup`].
pub type GroupSchema = SchemaDefinition<GuardGroup, PatchOperations>;

type GroupAttribute<T> = AttributeBuilder<T, GuardGroup, PatchOperations>;
type GroupMultiAttribute<T> = MultiAttributeBuilder<T, GuardGroup, PatchOperations>;

fn meta_timestamp(
    group: &GuardGroup,
    read: fn(&GuardMeta) -> Option<DateTime<FixedOffset>>,
) -> Option<DateTime<FixedOffset>> {
    group.meta.as_ref().and_then(read)
}

/// Build the group mapping table.
pub fn group_schema() -> ConnectorResult<GroupSchema> {
    SchemaDefinitionBuilder::new(GROUP_OBJECT_CLASS)
        .add_uid(
            GroupAttribute::<String>::new(UID_ATTRIBUTE)
                .native_name("id")
                .case_insensitive()
                .on_read(|group| group.id.clone()),
        )
        // Display names are optional on the vendor side; fall back to the id.
        .add_name(
            GroupAttribute::<String>::new(NAME_ATTRIBUTE)
                .native_name("displayName")
                .case_insensitive()
                .required()
                .on_create(|group, value| {
                    group.display_name = value;
                    Ok(())
                })
                .on_update(|patch, value| {
                    patch.replace("displayName", value);
                    Ok(())
                })
                .on_read(|group| {
                    group
                        .display_name
                        .clone()
                        .filter(|name| !name.is_empty())
                        .or_else(|| group.id.clone())
                }),
        )
        .add_multiple(
            GroupMultiAttribute::<String>::new(MEMBERS_ATTRIBUTE)
                .native_name("members")
                .uuid()
                .on_create(|group, ids| {
                    group.members = ids.into_iter().map(GuardMember::new).collect();
                    Ok(())
                })
                .on_add(|patch, ids| {
                    patch.add_members(ids);
                    Ok(())
                })
                .on_remove(|patch, ids| {
                    patch.remove_members(ids);
                    Ok(())
                })
                .on_read(|group| {
                    group
                        .members
                        .iter()
                        .filter(|m| m.member_type.as_deref() == Some("User"))
                        .map(|m| m.value.clone())
                        .collect()
                }),
        )
        .add(
            GroupAttribute::<DateTime<FixedOffset>>::new("meta.created")
                .on_read(|group| meta_timestamp(group, GuardMeta::created_at)),
        )
        .add(
            GroupAttribute::<DateTime<FixedOffset>>::new("meta.lastModified")
                .on_read(|group| meta_timestamp(group, GuardMeta::last_modified_at)),
        )
        .build()
}

/// Whether `group` holds every id in `member_ids`, whatever the member type.
///
/// Ids are UUIDs and compare case-insensitively; `member_ids` must already
/// be lowercased.
fn has_all_members(group: &GuardGroup, member_ids: &HashSet<String>) -> bool {
    let held: HashSet<String> = group.member_ids().map(str::to_lowercase).collect();
    member_ids.is_subset(&held)
}

/// Operations on the `Group` object class.
#[derive(Debug)]
pub struct GroupHandler {
    schema: GroupSchema,
}

impl GroupHandler {
    pub fn new() -> ConnectorResult<Self> {
        Ok(Self {
            schema: group_schema()?,
        })
    }

    pub fn schema(&self) -> &GroupSchema {
        &self.schema
    }

    async fn ensure_unique_display_name(
        &self,
        ctx: HandlerContext<'_>,
        display_name: &str,
    ) -> ConnectorResult<()> {
        let found = ctx
            .client
            .get_group_by_name(display_name, &BTreeSet::new())
            .await?;
        let taken = found
            .and_then(|group| group.display_name)
            .is_some_and(|name| name.to_lowercase() == display_name.to_lowercase());
        if taken {
            return Err(ConnectorError::already_exists(format!(
                "Group \"{display_name}\" already exists"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectHandler for GroupHandler {
    fn object_class(&self) -> &str {
        GROUP_OBJECT_CLASS
    }

    fn object_class_info(&self) -> ObjectClass {
        self.schema.object_class_info()
    }

    fn returned_attributes(&self, options: &OperationOptions) -> BTreeSet<String> {
        self.schema.returned_attributes(options)
    }

    fn case_insensitive_attributes(&self) -> BTreeSet<String> {
        self.schema.case_insensitive_attributes()
    }

    #[instrument(skip_all)]
    async fn create(
        &self,
        ctx: HandlerContext<'_>,
        attributes: &AttributeSet,
    ) -> ConnectorResult<Uid> {
        let mut group = GuardGroup::new();
        self.schema
            .apply(attributes, &mut group, ctx.config.unknown_attribute_policy())?;

        if ctx.config.unique_check_group_display_name {
            if let Some(display_name) = group.display_name.as_deref() {
                self.ensure_unique_display_name(ctx, display_name).await?;
            }
        }

        let uid = ctx.client.create_group(&group).await?;
        info!(uid = %uid, members = group.members.len(), "Created group");
        Ok(uid)
    }

    #[instrument(skip_all, fields(uid = %uid))]
    async fn update_delta(
        &self,
        ctx: HandlerContext<'_>,
        uid: &Uid,
        modifications: &[AttributeDelta],
    ) -> ConnectorResult<()> {
        let mut patch = PatchOperations::new();
        self.schema
            .apply_delta(modifications, &mut patch, ctx.config.unknown_attribute_policy())?;

        if !patch.has_attributes_change() {
            debug!("No group changes to send");
            return Ok(());
        }

        ctx.client.patch_group(uid, &patch).await?;
        info!(operations = patch.operations.len(), "Patched group");
        Ok(())
    }

    #[instrument(skip_all, fields(uid = %uid))]
    async fn delete(&self, ctx: HandlerContext<'_>, uid: &Uid) -> ConnectorResult<()> {
        ctx.client.delete_group(uid).await?;
        info!("Deleted group");
        Ok(())
    }

    async fn get_by_uid(
        &self,
        ctx: HandlerContext<'_>,
        uid: &Uid,
        handler: &mut ResultsHandler<'_>,
        options: &OperationOptions,
    ) -> ConnectorResult<u64> {
        let read = ReadRequest::new(&self.schema, options);
        match ctx.client.get_group_by_uid(uid, &read.fetch_fields).await? {
            Some(group) => {
                deliver(&self.schema, &group, &read, handler)?;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn get_by_name(
        &self,
        ctx: HandlerContext<'_>,
        name: &str,
        handler: &mut ResultsHandler<'_>,
        options: &OperationOptions,
    ) -> ConnectorResult<u64> {
        let read = ReadRequest::new(&self.schema, options);
        match ctx.client.get_group_by_name(name, &read.fetch_fields).await? {
            Some(group) => {
                deliver(&self.schema, &group, &read, handler)?;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn get_all(
        &self,
        ctx: HandlerContext<'_>,
        handler: &mut ResultsHandler<'_>,
        options: &OperationOptions,
        page: PageRequest,
    ) -> ConnectorResult<u64> {
        let read = ReadRequest::new(&self.schema, options);
        let mut failure = PageFailure::default();
        let total = ctx
            .client
            .get_groups(
                &mut |group: GuardGroup| failure.track(deliver(&self.schema, &group, &read, handler)),
                page,
                &read.fetch_fields,
            )
            .await;
        failure.finish(total)
    }

    /// The vendor cannot filter by member, so every group is scanned.
    #[instrument(skip_all, fields(members = member_ids.len()))]
    async fn get_by_members(
        &self,
        ctx: HandlerContext<'_>,
        member_ids: &[String],
        handler: &mut ResultsHandler<'_>,
        options: &OperationOptions,
        page: PageRequest,
    ) -> ConnectorResult<u64> {
        let mut read = ReadRequest::new(&self.schema, options);
        read.fetch_fields.insert("members".to_string());

        let wanted: HashSet<String> = member_ids.iter().map(|id| id.to_lowercase()).collect();
        let ignored = ctx.config.ignore_group_set();
        let mut failure = PageFailure::default();

        let total = ctx
            .client
            .get_groups(
                &mut |group: GuardGroup| {
                    let display_name = group.display_name.as_deref().unwrap_or_default();
                    if ignored.contains(&display_name.to_lowercase()) {
                        debug!(group = display_name, "Skipping ignored group");
                        return true;
                    }
                    if !has_all_members(&group, &wanted) {
                        return true;
                    }
                    failure.track(deliver(&self.schema, &group, &read, handler))
                },
                page,
                &read.fetch_fields,
            )
            .await;
        failure.finish(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idm_connector::definition::UnknownAttributePolicy;
    use serde_json::json;

    fn member(id: &str, member_type: &str) -> GuardMember {
        GuardMember {
            member_type: Some(member_type.to_string()),
            ..GuardMember::new(id)
        }
    }

    #[test]
    fn test_schema_builds() {
        let info = group_schema().unwrap().object_class_info();

        let name = info.get_attribute(NAME_ATTRIBUTE).unwrap();
        assert!(name.required && name.case_insensitive);
        assert_eq!(name.native_name, "displayName");

        let members = info.get_attribute(MEMBERS_ATTRIBUTE).unwrap();
        assert!(members.multi_valued && members.creatable && members.updateable);
        assert!(members.returned_by_default);
        assert_eq!(members.native_name, "members");
    }

    #[test]
    fn test_apply_create_with_members() {
        let attrs = AttributeSet::new()
            .with(NAME_ATTRIBUTE, "admins")
            .with(MEMBERS_ATTRIBUTE, vec!["u1", "u2"]);
        let mut group = GuardGroup::new();
        group_schema()
            .unwrap()
            .apply(&attrs, &mut group, UnknownAttributePolicy::Ignore)
            .unwrap();

        assert_eq!(group.display_name.as_deref(), Some("admins"));
        assert_eq!(group.member_ids().collect::<Vec<_>>(), vec!["u1", "u2"]);
    }

    #[test]
    fn test_apply_delta_members() {
        let mut patch = PatchOperations::new();
        group_schema()
            .unwrap()
            .apply_delta(
                &[
                    AttributeDelta::replace(NAME_ATTRIBUTE, "site-admins"),
                    AttributeDelta::add_remove(MEMBERS_ATTRIBUTE, vec!["u3"], vec!["u1", "u2"]),
                ],
                &mut patch,
                UnknownAttributePolicy::Ignore,
            )
            .unwrap();

        let body = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            body["Operations"],
            json!([
                {"op": "replace", "path": "displayName", "value": "site-admins"},
                {"op": "add", "path": "members", "value": [{"value": "u3"}]},
                {"op": "remove", "path": "members", "value": [{"value": "u1"}, {"value": "u2"}]}
            ])
        );
    }

    #[test]
    fn test_read_name_falls_back_to_id() {
        let group = GuardGroup {
            id: Some("g1".to_string()),
            display_name: Some(String::new()),
            members: vec![member("u1", "User"), member("g2", "Group")],
            ..GuardGroup::new()
        };
        let schema = group_schema().unwrap();
        let returned = schema.returned_attributes(&OperationOptions::new());
        let object = schema.to_connector_object(&group, &returned, false).unwrap();

        assert_eq!(object.uid, Uid::with_name_hint("g1", "g1"));
        assert_eq!(object.name(), Some("g1"));
        assert_eq!(object.attributes.get_strings(MEMBERS_ATTRIBUTE), Some(vec!["u1"]));
    }

    #[test]
    fn test_has_all_members_counts_every_member_type() {
        let group = GuardGroup {
            members: vec![member("u1", "User"), member("g2", "Group")],
            ..GuardGroup::new()
        };
        let ids = |ids: &[&str]| ids.iter().map(|id| id.to_string()).collect::<HashSet<_>>();
        assert!(has_all_members(&group, &ids(&["u1", "g2"])));
        assert!(has_all_members(&group, &HashSet::new()));
        assert!(!has_all_members(&group, &ids(&["u1", "u9"])));
    }

    #[test]
    fn test_has_all_members_ignores_case() {
        let group = GuardGroup {
            members: vec![member("7F3A-B2", "User")],
            ..GuardGroup::new()
        };
        assert!(has_all_members(&group, &HashSet::from(["7f3a-b2".to_string()])));
    }
}
