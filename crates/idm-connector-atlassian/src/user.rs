//! User object class.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use idm_connector::definition::{
    AttributeBuilder, MultiAttributeBuilder, SchemaDefinition, SchemaDefinitionBuilder,
};
use idm_connector::error::{ConnectorError, ConnectorResult};
use idm_connector::operation::{
    AttributeDelta, AttributeSet, Uid, ENABLE_ATTRIBUTE, NAME_ATTRIBUTE, UID_ATTRIBUTE,
};
use idm_connector::options::{OperationOptions, PageRequest};
use idm_connector::schema::ObjectClass;
use idm_connector::traits::ResultsHandler;
use tracing::{debug, info, instrument};

use crate::handler::{deliver, HandlerContext, ObjectHandler, PageFailure, ReadRequest};
use crate::model::{GuardEmail, GuardMeta, GuardName, GuardPhoneNumber, GuardUser};
use crate::patch::PatchOperations;

/// Object class name for users.
pub const USER_OBJECT_CLASS: &str = "User";

/// Mapping table between connector attributes and [`GuardUser`].
pub type UserSchema = SchemaDefinition<GuardUser, PatchOperations>;

type UserAttribute<T> = AttributeBuilder<T, GuardUser, PatchOperations>;
type UserMultiAttribute<T> = MultiAttributeBuilder<T, GuardUser, PatchOperations>;

/// A string attribute stored directly on the user resource.
fn plain(
    name: &'static str,
    set: fn(&mut GuardUser, Option<String>),
    get: fn(&GuardUser) -> Option<String>,
) -> UserAttribute<String> {
    UserAttribute::<String>::new(name)
        .on_create(move |user, value| {
            set(user, value);
            Ok(())
        })
        .on_update(move |patch, value| {
            patch.replace(name, value);
            Ok(())
        })
        .on_read(get)
}

/// A component of the user's `name` composite, created on first write.
fn name_part(
    name: &'static str,
    field: fn(&mut GuardName) -> &mut Option<String>,
    get: fn(&GuardName) -> Option<String>,
) -> UserAttribute<String> {
    UserAttribute::<String>::new(name)
        .on_create(move |user, value| {
            *field(user.name.get_or_insert_with(GuardName::default)) = value;
            Ok(())
        })
        .on_update(move |patch, value| {
            patch.replace(name, value);
            Ok(())
        })
        .on_read(move |user| user.name.as_ref().and_then(get))
}

fn set_active(user: &mut GuardUser, value: Option<bool>) -> ConnectorResult<()> {
    user.active = value;
    Ok(())
}

fn replace_active(patch: &mut PatchOperations, value: Option<bool>) -> ConnectorResult<()> {
    patch.replace_bool("active", value);
    Ok(())
}

/// Parse a `number/type` phone value.
fn parse_phone_number(raw: &str) -> ConnectorResult<GuardPhoneNumber> {
    match raw.split_once('/') {
        Some((value, phone_type)) if !phone_type.contains('/') => {
            Ok(GuardPhoneNumber::primary(value, phone_type))
        }
        _ => Err(ConnectorError::invalid_attribute(
            "primaryPhoneNumber",
            format!("Invalid primaryPhoneNumber: {raw}"),
        )),
    }
}

fn meta_timestamp(
    user: &GuardUser,
    read: fn(&GuardMeta) -> Option<DateTime<FixedOffset>>,
) -> Option<DateTime<FixedOffset>> {
    user.meta.as_ref().and_then(read)
}

/// Build the user mapping table.
pub fn user_schema() -> ConnectorResult<UserSchema> {
    SchemaDefinitionBuilder::new(USER_OBJECT_CLASS)
        .add_uid(
            UserAttribute::<String>::new(UID_ATTRIBUTE)
                .native_name("id")
                .case_insensitive()
                .on_read(|user| user.id.clone()),
        )
        // Login, unique and case-sensitive.
        .add_name(
            UserAttribute::<String>::new(NAME_ATTRIBUTE)
                .native_name("userName")
                .required()
                .on_create(|user, value| {
                    user.user_name = value;
                    Ok(())
                })
                .on_update(|patch, value| {
                    patch.replace("userName", value);
                    Ok(())
                })
                .on_read(|user| user.user_name.clone()),
        )
        .add(
            UserAttribute::<bool>::new(ENABLE_ATTRIBUTE)
                .native_name("active")
                .on_create(set_active)
                .on_update(replace_active)
                .on_read(|user| user.active),
        )
        .add(name_part(
            "name.formatted",
            |n| &mut n.formatted,
            |n| n.formatted.clone(),
        ))
        .add(name_part(
            "name.familyName",
            |n| &mut n.family_name,
            |n| n.family_name.clone(),
        ))
        .add(name_part(
            "name.givenName",
            |n| &mut n.given_name,
            |n| n.given_name.clone(),
        ))
        .add(name_part(
            "name.middleName",
            |n| &mut n.middle_name,
            |n| n.middle_name.clone(),
        ))
        .add(name_part(
            "name.honorificPrefix",
            |n| &mut n.honorific_prefix,
            |n| n.honorific_prefix.clone(),
        ))
        .add(name_part(
            "name.honorificSuffix",
            |n| &mut n.honorific_suffix,
            |n| n.honorific_suffix.clone(),
        ))
        .add(plain(
            "displayName",
            |u, v| u.display_name = v,
            |u| u.display_name.clone(),
        ))
        .add(plain("nickName", |u, v| u.nick_name = v, |u| u.nick_name.clone()))
        .add(plain("title", |u, v| u.title = v, |u| u.title.clone()))
        .add(plain(
            "preferredLanguage",
            |u, v| u.preferred_language = v,
            |u| u.preferred_language.clone(),
        ))
        .add(plain("timezone", |u, v| u.timezone = v, |u| u.timezone.clone()))
        .add(
            UserAttribute::<bool>::new("active")
                .on_create(set_active)
                .on_update(replace_active)
                .on_read(|user| user.active),
        )
        .add(
            UserAttribute::<String>::new("primaryEmail")
                .native_name("emails")
                .case_insensitive()
                .on_create(|user, value| {
                    if let Some(value) = value {
                        user.emails = vec![GuardEmail::primary(value)];
                    }
                    Ok(())
                })
                .on_update(|patch, value| patch.replace_email(value.map(GuardEmail::primary)))
                .on_read(|user| {
                    user.emails
                        .iter()
                        .find(|e| e.is_primary())
                        .map(|e| e.value.clone())
                }),
        )
        .add(
            UserAttribute::<String>::new("primaryPhoneNumber")
                .native_name("phoneNumbers")
                .on_create(|user, value| {
                    if let Some(value) = value {
                        user.phone_numbers = vec![parse_phone_number(&value)?];
                    }
                    Ok(())
                })
                .on_update(|patch, value| {
                    let phone_number = value.as_deref().map(parse_phone_number).transpose()?;
                    patch.replace_phone_number(phone_number)
                })
                .on_read(|user| {
                    user.phone_numbers.iter().find(|p| p.is_primary()).map(|p| {
                        format!("{}/{}", p.value, p.phone_type.as_deref().unwrap_or_default())
                    })
                }),
        )
        // Memberships are managed from the group side.
        .add_multiple(
            UserMultiAttribute::<String>::new("groups")
                .uuid()
                .on_read(|user| {
                    user.groups
                        .iter()
                        .filter(|g| g.group_type.as_deref() == Some("Group"))
                        .map(|g| g.value.clone())
                        .collect()
                }),
        )
        .add(
            UserAttribute::<DateTime<FixedOffset>>::new("meta.created")
                .on_read(|user| meta_timestamp(user, GuardMeta::created_at)),
        )
        .add(
            UserAttribute::<DateTime<FixedOffset>>::new("meta.lastModified")
                .on_read(|user| meta_timestamp(user, GuardMeta::last_modified_at)),
        )
        .build()
}

/// Operations on the `User` object class.
#[derive(Debug)]
pub struct UserHandler {
    schema: UserSchema,
}

impl UserHandler {
    pub fn new() -> ConnectorResult<Self> {
        Ok(Self {
            schema: user_schema()?,
        })
    }

    pub fn schema(&self) -> &UserSchema {
        &self.schema
    }
}

#[async_trait]
impl ObjectHandler for UserHandler {
    fn object_class(&self) -> &str {
        USER_OBJECT_CLASS
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
        let mut user = GuardUser::new();
        self.schema
            .apply(attributes, &mut user, ctx.config.unknown_attribute_policy())?;

        let uid = ctx.client.create_user(&user).await?;
        info!(uid = %uid, "Created user");
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
            debug!("No user changes to send");
            return Ok(());
        }

        ctx.client.patch_user(uid, &patch).await?;
        info!(operations = patch.operations.len(), "Patched user");
        Ok(())
    }

    #[instrument(skip_all, fields(uid = %uid))]
    async fn delete(&self, ctx: HandlerContext<'_>, uid: &Uid) -> ConnectorResult<()> {
        ctx.client.delete_user(uid).await?;
        info!("Deleted user");
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
        match ctx.client.get_user_by_uid(uid, &read.fetch_fields).await? {
            Some(user) => {
                deliver(&self.schema, &user, &read, handler)?;
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
        match ctx.client.get_user_by_name(name, &read.fetch_fields).await? {
            Some(user) => {
                deliver(&self.schema, &user, &read, handler)?;
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
            .get_users(
                &mut |user: GuardUser| failure.track(deliver(&self.schema, &user, &read, handler)),
                page,
                &read.fetch_fields,
            )
            .await;
        failure.finish(total)
    }
}
