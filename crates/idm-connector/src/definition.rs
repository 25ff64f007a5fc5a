//! Declarative attribute descriptors and schema definitions.
//!
//! A [`SchemaDefinition`] is the mapping table for one object class. Each
//! logical attribute is registered once through a typed builder that holds
//! up to four transforms:
//!
//! - create: caller value into a blank vendor model (`M`)
//! - update: caller value into a patch accumulator (`P`)
//! - add/remove: association values into the patch accumulator
//! - read: vendor model back into a caller value
//!
//! On registration the typed transforms are erased into closures over
//! [`AttributeValue`], so one definition can map every attribute of a
//! resource without per-field dispatch. An attribute without a create
//! transform is published as not creatable, one without update transforms
//! as not updateable.
//!
//! Definitions are built once and only read afterwards, so they are `Send +
//! Sync` and can serve concurrent operations.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::error::{ConnectorError, ConnectorResult};
use crate::operation::{
    AttributeDelta, AttributeSet, AttributeValue, ConnectorObject, Uid, NAME_ATTRIBUTE,
    UID_ATTRIBUTE,
};
use crate::options::OperationOptions;
use crate::schema::{AttributeDataType, ObjectClass, SchemaAttribute};

/// Semantic type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    String,
    StringCaseIgnore,
    Boolean,
    DateTime,
    Uuid,
}

impl AttributeType {
    /// Data type published in the schema metadata.
    pub fn data_type(self) -> AttributeDataType {
        match self {
            AttributeType::String | AttributeType::StringCaseIgnore => AttributeDataType::String,
            AttributeType::Boolean => AttributeDataType::Boolean,
            AttributeType::DateTime => AttributeDataType::DateTime,
            AttributeType::Uuid => AttributeDataType::Uuid,
        }
    }

    /// Whether values of this type compare case-insensitively.
    pub fn is_case_insensitive(self) -> bool {
        matches!(self, AttributeType::StringCaseIgnore | AttributeType::Uuid)
    }
}

/// What to do with attributes the definition does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownAttributePolicy {
    /// Skip them.
    #[default]
    Ignore,
    /// Fail with [`ConnectorError::UnsupportedAttribute`].
    Reject,
}

impl UnknownAttributePolicy {
    /// Policy for the strict-schema configuration flag.
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            UnknownAttributePolicy::Reject
        } else {
            UnknownAttributePolicy::Ignore
        }
    }
}

/// A Rust type an attribute value can be converted to and from.
pub trait AttributeKind: Sized + Send + Sync + 'static {
    /// Semantic type used when the builder does not override it.
    const DEFAULT_TYPE: AttributeType;

    /// Convert a single, non-empty value.
    fn from_value(attribute: &str, value: &AttributeValue) -> ConnectorResult<Self>;

    /// Convert back into a generic value.
    fn into_value(self) -> AttributeValue;
}

impl AttributeKind for String {
    const DEFAULT_TYPE: AttributeType = AttributeType::String;

    fn from_value(attribute: &str, value: &AttributeValue) -> ConnectorResult<Self> {
        value
            .as_string()
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::invalid_attribute(attribute, "expected a string value"))
    }

    fn into_value(self) -> AttributeValue {
        AttributeValue::String(self)
    }
}

impl AttributeKind for bool {
    const DEFAULT_TYPE: AttributeType = AttributeType::Boolean;

    fn from_value(attribute: &str, value: &AttributeValue) -> ConnectorResult<Self> {
        value
            .as_boolean()
            .ok_or_else(|| ConnectorError::invalid_attribute(attribute, "expected a boolean value"))
    }

    fn into_value(self) -> AttributeValue {
        AttributeValue::Boolean(self)
    }
}

impl AttributeKind for DateTime<FixedOffset> {
    const DEFAULT_TYPE: AttributeType = AttributeType::DateTime;

    fn from_value(attribute: &str, value: &AttributeValue) -> ConnectorResult<Self> {
        if let Some(dt) = value.as_datetime() {
            return Ok(*dt);
        }
        let raw = value.as_string().ok_or_else(|| {
            ConnectorError::invalid_attribute(attribute, "expected a timestamp value")
        })?;
        DateTime::parse_from_rfc3339(raw).map_err(|e| {
            ConnectorError::invalid_attribute(attribute, format!("invalid timestamp '{raw}': {e}"))
        })
    }

    fn into_value(self) -> AttributeValue {
        AttributeValue::DateTime(self)
    }
}

type CreateFn<M> = Box<dyn Fn(&mut M, &AttributeValue) -> ConnectorResult<()> + Send + Sync>;
type PatchFn<P> = Box<dyn Fn(&mut P, &[AttributeValue]) -> ConnectorResult<()> + Send + Sync>;
type ReadFn<M> = Box<dyn Fn(&M) -> Option<AttributeValue> + Send + Sync>;

type SingleWrite<X, T> = Box<dyn Fn(&mut X, Option<T>) -> ConnectorResult<()> + Send + Sync>;
type MultiWrite<X, T> = Box<dyn Fn(&mut X, Vec<T>) -> ConnectorResult<()> + Send + Sync>;

/// Builder for a single-valued attribute.
pub struct AttributeBuilder<T, M, P> {
    name: String,
    native_name: Option<String>,
    attribute_type: AttributeType,
    required: bool,
    returned_by_default: bool,
    on_create: Option<SingleWrite<M, T>>,
    on_update: Option<SingleWrite<P, T>>,
    on_read: Option<Box<dyn Fn(&M) -> Option<T> + Send + Sync>>,
}

impl<T: AttributeKind, M: 'static, P: 'static> AttributeBuilder<T, M, P> {
    /// Start describing an attribute.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_name: None,
            attribute_type: T::DEFAULT_TYPE,
            required: false,
            returned_by_default: true,
            on_create: None,
            on_update: None,
            on_read: None,
        }
    }

    /// Field name in the vendor resource. Defaults to the attribute name.
    #[must_use]
    pub fn native_name(mut self, native_name: impl Into<String>) -> Self {
        self.native_name = Some(native_name.into());
        self
    }

    /// Require a value on create.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Only return the attribute when explicitly requested.
    #[must_use]
    pub fn not_returned_by_default(mut self) -> Self {
        self.returned_by_default = false;
        self
    }

    /// Transform applied on create. Receives `None` for an empty value.
    #[must_use]
    pub fn on_create<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut M, Option<T>) -> ConnectorResult<()> + Send + Sync + 'static,
    {
        self.on_create = Some(Box::new(f));
        self
    }

    /// Transform applied on update. Receives `None` when the attribute is
    /// cleared.
    #[must_use]
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut P, Option<T>) -> ConnectorResult<()> + Send + Sync + 'static,
    {
        self.on_update = Some(Box::new(f));
        self
    }

    /// Transform reading the value back from a fetched model.
    #[must_use]
    pub fn on_read<F>(mut self, f: F) -> Self
    where
        F: Fn(&M) -> Option<T> + Send + Sync + 'static,
    {
        self.on_read = Some(Box::new(f));
        self
    }

    fn into_descriptor(self) -> AttributeDescriptor<M, P> {
        let AttributeBuilder {
            name,
            native_name,
            attribute_type,
            required,
            returned_by_default,
            on_create,
            on_update,
            on_read,
        } = self;

        let create = on_create.map(|f| {
            let attribute = name.clone();
            Box::new(move |model: &mut M, value: &AttributeValue| {
                let value = single_value::<T>(&attribute, &value.values())?;
                f(model, value)
            }) as CreateFn<M>
        });
        let replace = on_update.map(|f| {
            let attribute = name.clone();
            Box::new(move |patch: &mut P, values: &[AttributeValue]| {
                let value = single_value::<T>(&attribute, &flatten(values))?;
                f(patch, value)
            }) as PatchFn<P>
        });
        let read = on_read.map(|f| {
            Box::new(move |model: &M| f(model).map(T::into_value)) as ReadFn<M>
        });

        AttributeDescriptor {
            native_name: native_name.unwrap_or_else(|| name.clone()),
            name,
            attribute_type,
            multi_valued: false,
            required,
            returned_by_default,
            create,
            replace,
            add: None,
            remove: None,
            read,
        }
    }
}

impl<M: 'static, P: 'static> AttributeBuilder<String, M, P> {
    /// Compare values case-insensitively.
    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.attribute_type = AttributeType::StringCaseIgnore;
        self
    }

    /// Values are UUID references.
    #[must_use]
    pub fn uuid(mut self) -> Self {
        self.attribute_type = AttributeType::Uuid;
        self
    }
}

/// Builder for a multi-valued attribute, typically an association.
pub struct MultiAttributeBuilder<T, M, P> {
    name: String,
    native_name: Option<String>,
    attribute_type: AttributeType,
    returned_by_default: bool,
    on_create: Option<MultiWrite<M, T>>,
    on_add: Option<MultiWrite<P, T>>,
    on_remove: Option<MultiWrite<P, T>>,
    on_read: Option<Box<dyn Fn(&M) -> Vec<T> + Send + Sync>>,
}

impl<T: AttributeKind, M: 'static, P: 'static> MultiAttributeBuilder<T, M, P> {
    /// Start describing a multi-valued attribute.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_name: None,
            attribute_type: T::DEFAULT_TYPE,
            returned_by_default: true,
            on_create: None,
            on_add: None,
            on_remove: None,
            on_read: None,
        }
    }

    #[must_use]
    pub fn native_name(mut self, native_name: impl Into<String>) -> Self {
        self.native_name = Some(native_name.into());
        self
    }

    #[must_use]
    pub fn not_returned_by_default(mut self) -> Self {
        self.returned_by_default = false;
        self
    }

    /// Transform applied on create with every supplied value.
    #[must_use]
    pub fn on_create<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut M, Vec<T>) -> ConnectorResult<()> + Send + Sync + 'static,
    {
        self.on_create = Some(Box::new(f));
        self
    }

    /// Transform receiving the values added by a delta. Never called empty.
    #[must_use]
    pub fn on_add<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut P, Vec<T>) -> ConnectorResult<()> + Send + Sync + 'static,
    {
        self.on_add = Some(Box::new(f));
        self
    }

    /// Transform receiving the values removed by a delta. Never called empty.
    #[must_use]
    pub fn on_remove<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut P, Vec<T>) -> ConnectorResult<()> + Send + Sync + 'static,
    {
        self.on_remove = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_read<F>(mut self, f: F) -> Self
    where
        F: Fn(&M) -> Vec<T> + Send + Sync + 'static,
    {
        self.on_read = Some(Box::new(f));
        self
    }

    fn into_descriptor(self) -> AttributeDescriptor<M, P> {
        let MultiAttributeBuilder {
            name,
            native_name,
            attribute_type,
            returned_by_default,
            on_create,
            on_add,
            on_remove,
            on_read,
        } = self;

        let create = on_create.map(|f| {
            let attribute = name.clone();
            Box::new(move |model: &mut M, value: &AttributeValue| {
                let values = multi_values::<T>(&attribute, &value.values())?;
                f(model, values)
            }) as CreateFn<M>
        });
        let add = on_add.map(|f| erase_multi_patch(name.clone(), f));
        let remove = on_remove.map(|f| erase_multi_patch(name.clone(), f));
        let read = on_read.map(|f| {
            Box::new(move |model: &M| {
                let values = f(model);
                (!values.is_empty())
                    .then(|| AttributeValue::Array(values.into_iter().map(T::into_value).collect()))
            }) as ReadFn<M>
        });

        AttributeDescriptor {
            native_name: native_name.unwrap_or_else(|| name.clone()),
            name,
            attribute_type,
            multi_valued: true,
            required: false,
            returned_by_default,
            create,
            replace: None,
            add,
            remove,
            read,
        }
    }
}

impl<M: 'static, P: 'static> MultiAttributeBuilder<String, M, P> {
    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.attribute_type = AttributeType::StringCaseIgnore;
        self
    }

    #[must_use]
    pub fn uuid(mut self) -> Self {
        self.attribute_type = AttributeType::Uuid;
        self
    }
}

fn erase_multi_patch<T: AttributeKind, P: 'static>(
    attribute: String,
    f: MultiWrite<P, T>,
) -> PatchFn<P> {
    Box::new(move |patch: &mut P, values: &[AttributeValue]| {
        let values = multi_values::<T>(&attribute, &flatten(values))?;
        f(patch, values)
    })
}

fn flatten(values: &[AttributeValue]) -> Vec<&AttributeValue> {
    values.iter().flat_map(AttributeValue::values).collect()
}

fn single_value<T: AttributeKind>(
    attribute: &str,
    values: &[&AttributeValue],
) -> ConnectorResult<Option<T>> {
    match values {
        [] => Ok(None),
        [value] => T::from_value(attribute, value).map(Some),
        _ => Err(ConnectorError::invalid_attribute(
            attribute,
            format!("expected a single value, got {}", values.len()),
        )),
    }
}

fn multi_values<T: AttributeKind>(
    attribute: &str,
    values: &[&AttributeValue],
) -> ConnectorResult<Vec<T>> {
    values
        .iter()
        .map(|value| T::from_value(attribute, value))
        .collect()
}

/// One registered attribute with its type-erased transforms.
pub struct AttributeDescriptor<M, P> {
    name: String,
    native_name: String,
    attribute_type: AttributeType,
    multi_valued: bool,
    required: bool,
    returned_by_default: bool,
    create: Option<CreateFn<M>>,
    replace: Option<PatchFn<P>>,
    add: Option<PatchFn<P>>,
    remove: Option<PatchFn<P>>,
    read: Option<ReadFn<M>>,
}

impl<M, P> AttributeDescriptor<M, P> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native_name(&self) -> &str {
        &self.native_name
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_creatable(&self) -> bool {
        self.create.is_some()
    }

    pub fn is_updateable(&self) -> bool {
        self.replace.is_some() || self.is_association()
    }

    pub fn is_readable(&self) -> bool {
        self.read.is_some()
    }

    pub fn is_returned_by_default(&self) -> bool {
        self.returned_by_default
    }

    /// Whether updates are expressed as add/remove pairs.
    pub fn is_association(&self) -> bool {
        self.add.is_some() || self.remove.is_some()
    }

    /// Published metadata for this attribute.
    pub fn to_schema_attribute(&self) -> SchemaAttribute {
        SchemaAttribute {
            name: self.name.clone(),
            native_name: self.native_name.clone(),
            data_type: self.attribute_type.data_type(),
            multi_valued: self.multi_valued,
            required: self.required,
            creatable: self.is_creatable(),
            updateable: self.is_updateable(),
            readable: self.is_readable(),
            returned_by_default: self.returned_by_default,
            case_insensitive: self.attribute_type.is_case_insensitive(),
        }
    }

    fn read(&self, model: &M) -> Option<AttributeValue> {
        self.read
            .as_ref()
            .and_then(|read| read(model))
            .filter(|value| !value.is_empty())
    }
}

impl<M, P> std::fmt::Debug for AttributeDescriptor<M, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("name", &self.name)
            .field("native_name", &self.native_name)
            .field("attribute_type", &self.attribute_type)
            .field("multi_valued", &self.multi_valued)
            .field("required", &self.required)
            .field("creatable", &self.is_creatable())
            .field("updateable", &self.is_updateable())
            .finish()
    }
}

/// Accumulates descriptors for one object class.
///
/// Registration never panics: mistakes are collected and reported by
/// [`SchemaDefinitionBuilder::build`].
pub struct SchemaDefinitionBuilder<M, P> {
    object_class: String,
    attributes: Vec<AttributeDescriptor<M, P>>,
    has_uid: bool,
    has_name: bool,
    problems: Vec<String>,
}

impl<M: 'static, P: 'static> SchemaDefinitionBuilder<M, P> {
    pub fn new(object_class: impl Into<String>) -> Self {
        Self {
            object_class: object_class.into(),
            attributes: Vec::new(),
            has_uid: false,
            has_name: false,
            problems: Vec::new(),
        }
    }

    /// Register the identity key. It must be read-only and named `__UID__`.
    #[must_use]
    pub fn add_uid(mut self, attribute: AttributeBuilder<String, M, P>) -> Self {
        let descriptor = attribute.into_descriptor();
        if descriptor.name != UID_ATTRIBUTE {
            self.problems.push(format!(
                "identity key must be named {UID_ATTRIBUTE}, got '{}'",
                descriptor.name
            ));
        }
        if descriptor.is_creatable() || descriptor.is_updateable() {
            self.problems
                .push("identity key must not be creatable or updateable".to_string());
        }
        if !descriptor.is_readable() {
            self.problems.push("identity key must be readable".to_string());
        }
        self.has_uid = true;
        self.register(descriptor)
    }

    /// Register the name key. It is always required and named `__NAME__`.
    #[must_use]
    pub fn add_name(mut self, attribute: AttributeBuilder<String, M, P>) -> Self {
        let mut descriptor = attribute.into_descriptor();
        if descriptor.name != NAME_ATTRIBUTE {
            self.problems.push(format!(
                "name key must be named {NAME_ATTRIBUTE}, got '{}'",
                descriptor.name
            ));
        }
        if !descriptor.is_readable() {
            self.problems.push("name key must be readable".to_string());
        }
        descriptor.required = true;
        self.has_name = true;
        self.register(descriptor)
    }

    /// Register a single-valued attribute.
    #[must_use]
    pub fn add<T: AttributeKind>(self, attribute: AttributeBuilder<T, M, P>) -> Self {
        self.register(attribute.into_descriptor())
    }

    /// Register a multi-valued attribute.
    #[must_use]
    pub fn add_multiple<T: AttributeKind>(self, attribute: MultiAttributeBuilder<T, M, P>) -> Self {
        self.register(attribute.into_descriptor())
    }

    fn register(mut self, descriptor: AttributeDescriptor<M, P>) -> Self {
        if self.attributes.iter().any(|a| a.name == descriptor.name) {
            self.problems
                .push(format!("attribute '{}' registered twice", descriptor.name));
            return self;
        }
        self.attributes.push(descriptor);
        self
    }

    /// Freeze the definition.
    pub fn build(self) -> ConnectorResult<SchemaDefinition<M, P>> {
        let mut problems = self.problems;
        if !self.has_uid {
            problems.push("missing identity key".to_string());
        }
        if !self.has_name {
            problems.push("missing name key".to_string());
        }
        if !problems.is_empty() {
            return Err(ConnectorError::InvalidSchema {
                object_class: self.object_class,
                message: problems.join("; "),
            });
        }

        let index = self
            .attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.name.clone(), i))
            .collect();

        debug!(
            object_class = %self.object_class,
            attributes = self.attributes.len(),
            "Built schema definition"
        );

        Ok(SchemaDefinition {
            object_class: self.object_class,
            attributes: self.attributes,
            index,
        })
    }
}

/// Immutable mapping table for one object class.
pub struct SchemaDefinition<M, P> {
    object_class: String,
    attributes: Vec<AttributeDescriptor<M, P>>,
    index: HashMap<String, usize>,
}

impl<M, P> std::fmt::Debug for SchemaDefinition<M, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaDefinition")
            .field("object_class", &self.object_class)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl<M, P> SchemaDefinition<M, P> {
    pub fn object_class(&self) -> &str {
        &self.object_class
    }

    /// Look up a descriptor by attribute name.
    pub fn descriptor(&self, name: &str) -> Option<&AttributeDescriptor<M, P>> {
        self.index.get(name).map(|&i| &self.attributes[i])
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &AttributeDescriptor<M, P>> {
        self.attributes.iter()
    }

    /// Published metadata for the object class.
    pub fn object_class_info(&self) -> ObjectClass {
        let mut info = ObjectClass::new(self.object_class.clone());
        for descriptor in &self.attributes {
            info.add_attribute(descriptor.to_schema_attribute());
        }
        info
    }

    /// Names of the attributes a read should return.
    ///
    /// The identity and name keys are always included. Requested names the
    /// definition does not know are dropped.
    pub fn returned_attributes(&self, options: &OperationOptions) -> BTreeSet<String> {
        let mut returned: BTreeSet<String> = [UID_ATTRIBUTE, NAME_ATTRIBUTE]
            .into_iter()
            .map(str::to_string)
            .collect();

        let include_defaults =
            options.attributes_to_get.is_none() || options.return_default_attributes;
        if include_defaults {
            returned.extend(
                self.attributes
                    .iter()
                    .filter(|a| a.returned_by_default)
                    .map(|a| a.name.clone()),
            );
        }
        if let Some(requested) = &options.attributes_to_get {
            returned.extend(
                requested
                    .iter()
                    .filter(|name| self.index.contains_key(name.as_str()))
                    .cloned(),
            );
        }
        returned
    }

    /// Names of the attributes whose string values compare case-insensitively.
    pub fn case_insensitive_attributes(&self) -> BTreeSet<String> {
        self.attributes
            .iter()
            .filter(|a| a.attribute_type.is_case_insensitive())
            .map(|a| a.name.clone())
            .collect()
    }

    /// Vendor fields needed to produce `returned`.
    pub fn fetch_fields(&self, returned: &BTreeSet<String>) -> BTreeSet<String> {
        returned
            .iter()
            .filter_map(|name| self.descriptor(name))
            .map(|d| d.native_name.clone())
            .collect()
    }

    fn check_unknown(&self, name: &str, policy: UnknownAttributePolicy) -> ConnectorResult<()> {
        match policy {
            UnknownAttributePolicy::Ignore => {
                debug!(
                    object_class = %self.object_class,
                    attribute = %name,
                    "Ignoring unknown attribute"
                );
                Ok(())
            }
            UnknownAttributePolicy::Reject => Err(ConnectorError::UnsupportedAttribute {
                attribute: name.to_string(),
                object_class: self.object_class.clone(),
            }),
        }
    }

    /// Map a create attribute set onto a blank vendor model.
    ///
    /// The whole set is validated before the first transform runs.
    pub fn apply(
        &self,
        attributes: &AttributeSet,
        model: &mut M,
        policy: UnknownAttributePolicy,
    ) -> ConnectorResult<()> {
        let mut names: Vec<&str> = attributes.names().collect();
        names.sort_unstable();
        for name in names {
            if !self.index.contains_key(name) {
                self.check_unknown(name, policy)?;
            }
        }

        for descriptor in &self.attributes {
            let supplied = attributes.get(&descriptor.name);
            let has_value = supplied.is_some_and(|v| !v.is_empty());

            if descriptor.required && descriptor.is_creatable() && !has_value {
                return Err(ConnectorError::invalid_attribute(
                    &descriptor.name,
                    "required attribute is missing",
                ));
            }
            if has_value && !descriptor.is_creatable() && descriptor.name != UID_ATTRIBUTE {
                return Err(ConnectorError::invalid_attribute(
                    &descriptor.name,
                    "attribute is not creatable",
                ));
            }
        }

        for descriptor in &self.attributes {
            if let (Some(create), Some(value)) =
                (&descriptor.create, attributes.get(&descriptor.name))
            {
                create(model, value)?;
            }
        }
        Ok(())
    }

    /// Append the patch operations for `deltas`, in order, to `patch`.
    pub fn apply_delta(
        &self,
        deltas: &[AttributeDelta],
        patch: &mut P,
        policy: UnknownAttributePolicy,
    ) -> ConnectorResult<()> {
        for delta in deltas {
            let Some(descriptor) = self.descriptor(&delta.name) else {
                self.check_unknown(&delta.name, policy)?;
                continue;
            };

            let to_add = delta.values_to_add.as_deref().unwrap_or_default();
            let to_remove = delta.values_to_remove.as_deref().unwrap_or_default();

            if descriptor.is_association() {
                if delta.values_to_replace.is_some() {
                    return Err(ConnectorError::invalid_attribute(
                        &delta.name,
                        "association values must be added or removed, not replaced",
                    ));
                }
                if let Some(add) = &descriptor.add {
                    if !flatten(to_add).is_empty() {
                        add(patch, to_add)?;
                    }
                }
                if let Some(remove) = &descriptor.remove {
                    if !flatten(to_remove).is_empty() {
                        remove(patch, to_remove)?;
                    }
                }
                continue;
            }

            let Some(replace) = &descriptor.replace else {
                debug!(
                    object_class = %self.object_class,
                    attribute = %delta.name,
                    "Skipping delta for server-controlled attribute"
                );
                continue;
            };

            if let Some(values) = &delta.values_to_replace {
                replace(patch, values)?;
            } else if !flatten(to_add).is_empty() {
                replace(patch, to_add)?;
            } else if !flatten(to_remove).is_empty() {
                replace(patch, &[])?;
            }
        }
        Ok(())
    }

    /// Read a fetched vendor model back into a connector object.
    ///
    /// The identity and name keys are always emitted. Other attributes are
    /// emitted when listed in `returned` and non-empty. With
    /// `allow_partial_values`, multi-valued attributes that are neither
    /// returned by default nor requested are reported as incomplete.
    pub fn to_connector_object(
        &self,
        model: &M,
        returned: &BTreeSet<String>,
        allow_partial_values: bool,
    ) -> ConnectorResult<ConnectorObject> {
        let uid = self
            .descriptor(UID_ATTRIBUTE)
            .and_then(|d| d.read(model))
            .and_then(|v| v.as_string().map(str::to_string))
            .ok_or_else(|| ConnectorError::InvalidData {
                message: format!("{} resource without an identifier", self.object_class),
            })?;
        let name = self
            .descriptor(NAME_ATTRIBUTE)
            .and_then(|d| d.read(model))
            .and_then(|v| v.as_string().map(str::to_string));

        let mut attributes = AttributeSet::new();
        let mut incomplete_attributes = Vec::new();
        attributes.set(UID_ATTRIBUTE, uid.as_str());
        if let Some(name) = &name {
            attributes.set(NAME_ATTRIBUTE, name.as_str());
        }

        for descriptor in &self.attributes {
            if descriptor.name == UID_ATTRIBUTE || descriptor.name == NAME_ATTRIBUTE {
                continue;
            }
            if !returned.contains(&descriptor.name) {
                if allow_partial_values
                    && descriptor.multi_valued
                    && !descriptor.returned_by_default
                    && descriptor.is_readable()
                {
                    incomplete_attributes.push(descriptor.name.clone());
                }
                continue;
            }
            if let Some(value) = descriptor.read(model) {
                attributes.set(descriptor.name.clone(), value);
            }
        }

        let uid = match name {
            Some(name) => Uid::with_name_hint(uid, name),
            None => Uid::new(uid),
        };

        Ok(ConnectorObject {
            object_class: self.object_class.clone(),
            uid,
            attributes,
            incomplete_attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone)]
    struct Account {
        id: Option<String>,
        login: Option<String>,
        profile: Option<Profile>,
        enabled: Option<bool>,
        roles: Vec<String>,
        created: Option<String>,
    }

    #[derive(Debug, Default, Clone)]
    struct Profile {
        nickname: Option<String>,
    }

    #[derive(Debug, Default)]
    struct Ops(Vec<String>);

    type Attr<T> = AttributeBuilder<T, Account, Ops>;
    type MultiAttr<T> = MultiAttributeBuilder<T, Account, Ops>;

    fn builder() -> SchemaDefinitionBuilder<Account, Ops> {
        SchemaDefinitionBuilder::new("Account")
            .add_uid(
                Attr::<String>::new(UID_ATTRIBUTE)
                    .native_name("id")
                    .on_read(|a| a.id.clone()),
            )
            .add_name(
                Attr::<String>::new(NAME_ATTRIBUTE)
                    .native_name("login")
                    .on_create(|a, v| {
                        a.login = v;
                        Ok(())
                    })
                    .on_update(|ops, v| {
                        ops.0.push(format!("replace login={}", v.unwrap_or_default()));
                        Ok(())
                    })
                    .on_read(|a| a.login.clone()),
            )
            .add(
                Attr::<String>::new("profile.nickname")
                    .on_create(|a, v| {
                        a.profile.get_or_insert_with(Profile::default).nickname = v;
                        Ok(())
                    })
                    .on_update(|ops, v| {
                        ops.0
                            .push(format!("replace profile.nickname={}", v.unwrap_or_default()));
                        Ok(())
                    })
                    .on_read(|a| a.profile.as_ref().and_then(|p| p.nickname.clone())),
            )
            .add(
                Attr::<bool>::new("enabled")
                    .on_create(|a, v| {
                        a.enabled = v;
                        Ok(())
                    })
                    .on_update(|ops, v| {
                        if let Some(v) = v {
                            ops.0.push(format!("replace enabled={v}"));
                        }
                        Ok(())
                    })
                    .on_read(|a| a.enabled),
            )
            .add_multiple(
                MultiAttr::<String>::new("roles")
                    .uuid()
                    .not_returned_by_default()
                    .on_create(|a, v| {
                        a.roles = v;
                        Ok(())
                    })
                    .on_add(|ops, v| {
                        ops.0.push(format!("add roles={}", v.join(",")));
                        Ok(())
                    })
                    .on_remove(|ops, v| {
                        ops.0.push(format!("remove roles={}", v.join(",")));
                        Ok(())
                    })
                    .on_read(|a| a.roles.clone()),
            )
            .add(
                Attr::<DateTime<FixedOffset>>::new("created")
                    .native_name("meta.created")
                    .on_read(|a| {
                        a.created
                            .as_deref()
                            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    }),
            )
    }

    fn definition() -> SchemaDefinition<Account, Ops> {
        builder().build().unwrap()
    }

    fn fetched() -> Account {
        Account {
            id: Some("a-1".to_string()),
            login: Some("foo".to_string()),
            profile: Some(Profile {
                nickname: Some("f".to_string()),
            }),
            enabled: Some(true),
            roles: vec!["r1".to_string(), "r2".to_string()],
            created: Some("2024-01-02T03:04:05+09:00".to_string()),
        }
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = builder()
            .add(Attr::<String>::new("profile.nickname").on_read(|_| None))
            .build();
        match result {
            Err(ConnectorError::InvalidSchema { message, .. }) => {
                assert!(message.contains("registered twice"));
            }
            other => panic!("expected InvalidSchema, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_keys_fail() {
        let result = SchemaDefinitionBuilder::<Account, Ops>::new("Account")
            .add(Attr::<bool>::new("enabled").on_read(|a| a.enabled))
            .build();
        let err = result.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SCHEMA");
        assert!(err.to_string().contains("missing identity key"));
        assert!(err.to_string().contains("missing name key"));
    }

    #[test]
    fn test_writable_uid_is_rejected() {
        let result = SchemaDefinitionBuilder::<Account, Ops>::new("Account")
            .add_uid(
                Attr::<String>::new(UID_ATTRIBUTE)
                    .on_create(|a, v| {
                        a.id = v;
                        Ok(())
                    })
                    .on_read(|a| a.id.clone()),
            )
            .add_name(Attr::<String>::new(NAME_ATTRIBUTE).on_read(|a| a.login.clone()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_published_flags_follow_transforms() {
        let info = definition().object_class_info();

        let uid = info.get_attribute(UID_ATTRIBUTE).unwrap();
        assert!(!uid.creatable && !uid.updateable && uid.readable);

        let name = info.get_attribute(NAME_ATTRIBUTE).unwrap();
        assert!(name.required && name.creatable && name.updateable);
        assert_eq!(name.native_name, "login");

        let roles = info.get_attribute("roles").unwrap();
        assert!(roles.multi_valued && roles.updateable && roles.case_insensitive);
        assert!(!roles.returned_by_default);
        assert_eq!(roles.data_type, AttributeDataType::Uuid);

        let created = info.get_attribute("created").unwrap();
        assert!(created.is_read_only());
        assert_eq!(created.data_type, AttributeDataType::DateTime);
    }

    #[test]
    fn test_apply_sets_fields_and_allocates_composite() {
        let attrs = AttributeSet::new()
            .with(NAME_ATTRIBUTE, "foo")
            .with("profile.nickname", "f")
            .with("enabled", false)
            .with("roles", vec!["r1", "r2"]);

        let mut account = Account::default();
        definition()
            .apply(&attrs, &mut account, UnknownAttributePolicy::Ignore)
            .unwrap();

        assert_eq!(account.login.as_deref(), Some("foo"));
        assert_eq!(account.profile.unwrap().nickname.as_deref(), Some("f"));
        assert_eq!(account.enabled, Some(false));
        assert_eq!(account.roles, vec!["r1", "r2"]);
        assert!(account.id.is_none());
    }

    #[test]
    fn test_apply_unknown_attribute_policy() {
        let attrs = AttributeSet::new()
            .with(NAME_ATTRIBUTE, "foo")
            .with("nickname", "f");
        let definition = definition();

        let mut account = Account::default();
        definition
            .apply(&attrs, &mut account, UnknownAttributePolicy::Ignore)
            .unwrap();
        assert_eq!(account.login.as_deref(), Some("foo"));

        let mut account = Account::default();
        let err = definition
            .apply(&attrs, &mut account, UnknownAttributePolicy::Reject)
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::UnsupportedAttribute { ref attribute, .. } if attribute == "nickname"
        ));
        assert!(account.login.is_none());
    }

    #[test]
    fn test_apply_rejects_non_creatable_values() {
        let definition = definition();

        let attrs = AttributeSet::new()
            .with(NAME_ATTRIBUTE, "foo")
            .with("created", "2024-01-02T03:04:05Z");
        let err = definition
            .apply(&attrs, &mut Account::default(), UnknownAttributePolicy::Ignore)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ATTRIBUTE_VALUE");

        // The identity key is tolerated and never written.
        let attrs = AttributeSet::new()
            .with(NAME_ATTRIBUTE, "foo")
            .with(UID_ATTRIBUTE, "a-1");
        let mut account = Account::default();
        definition
            .apply(&attrs, &mut account, UnknownAttributePolicy::Ignore)
            .unwrap();
        assert!(account.id.is_none());
    }

    #[test]
    fn test_apply_requires_name() {
        let attrs = AttributeSet::new().with("enabled", true);
        let err = definition()
            .apply(&attrs, &mut Account::default(), UnknownAttributePolicy::Ignore)
            .unwrap_err();
        assert!(err.to_string().contains("required attribute is missing"));
    }

    #[test]
    fn test_apply_rejects_wrong_value_type() {
        let attrs = AttributeSet::new()
            .with(NAME_ATTRIBUTE, "foo")
            .with("enabled", "yes");
        let err = definition()
            .apply(&attrs, &mut Account::default(), UnknownAttributePolicy::Ignore)
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::InvalidAttributeValue { ref attribute, .. } if attribute == "enabled"
        ));
    }

    #[test]
    fn test_delta_set_and_clear() {
        let mut ops = Ops::default();
        definition()
            .apply_delta(
                &[
                    AttributeDelta::replace("profile.nickname", "g"),
                    AttributeDelta::clear("profile.nickname"),
                    AttributeDelta::replace("enabled", false),
                    AttributeDelta::clear("enabled"),
                ],
                &mut ops,
                UnknownAttributePolicy::Ignore,
            )
            .unwrap();

        assert_eq!(
            ops.0,
            vec![
                "replace profile.nickname=g",
                "replace profile.nickname=",
                "replace enabled=false",
            ]
        );
    }

    #[test]
    fn test_delta_add_remove_on_single_valued() {
        let mut ops = Ops::default();
        definition()
            .apply_delta(
                &[
                    AttributeDelta::add_values(NAME_ATTRIBUTE, vec!["bar"]),
                    AttributeDelta::remove_values("profile.nickname", vec!["f"]),
                ],
                &mut ops,
                UnknownAttributePolicy::Ignore,
            )
            .unwrap();
        assert_eq!(ops.0, vec!["replace login=bar", "replace profile.nickname="]);
    }

    #[test]
    fn test_delta_association() {
        let definition = definition();
        let mut ops = Ops::default();
        definition
            .apply_delta(
                &[
                    AttributeDelta::add_remove("roles", vec!["r3", "r4"], vec!["r1"]),
                    AttributeDelta::add_values("roles", Vec::<String>::new()),
                ],
                &mut ops,
                UnknownAttributePolicy::Ignore,
            )
            .unwrap();
        assert_eq!(ops.0, vec!["add roles=r3,r4", "remove roles=r1"]);

        let err = definition
            .apply_delta(
                &[AttributeDelta::replace("roles", vec!["r1"])],
                &mut Ops::default(),
                UnknownAttributePolicy::Ignore,
            )
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ATTRIBUTE_VALUE");
    }

    #[test]
    fn test_delta_ignores_server_controlled_and_unknown() {
        let definition = definition();
        let mut ops = Ops::default();
        definition
            .apply_delta(
                &[
                    AttributeDelta::replace(UID_ATTRIBUTE, "a-2"),
                    AttributeDelta::replace("created", "2024-01-01T00:00:00Z"),
                    AttributeDelta::replace("nickname", "x"),
                ],
                &mut ops,
                UnknownAttributePolicy::Ignore,
            )
            .unwrap();
        assert!(ops.0.is_empty());

        let err = definition
            .apply_delta(
                &[AttributeDelta::replace("nickname", "x")],
                &mut ops,
                UnknownAttributePolicy::Reject,
            )
            .unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_ATTRIBUTE");
    }

    #[test]
    fn test_returned_attributes() {
        let definition = definition();

        let defaults = definition.returned_attributes(&OperationOptions::new());
        assert!(defaults.contains("enabled"));
        assert!(defaults.contains("created"));
        assert!(!defaults.contains("roles"));

        let requested = definition.returned_attributes(
            &OperationOptions::new().with_attributes_to_get(["roles", "bogus"]),
        );
        let expected: BTreeSet<String> = [UID_ATTRIBUTE, NAME_ATTRIBUTE, "roles"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(requested, expected);

        let both = definition.returned_attributes(
            &OperationOptions::new()
                .with_attributes_to_get(["roles"])
                .with_default_attributes(),
        );
        assert!(both.contains("roles") && both.contains("enabled"));

        let fields = definition.fetch_fields(&requested);
        assert!(fields.contains("id") && fields.contains("login") && fields.contains("roles"));
    }

    #[test]
    fn test_case_insensitive_attributes() {
        let names: Vec<String> = definition()
            .case_insensitive_attributes()
            .into_iter()
            .collect();
        assert_eq!(names, vec!["roles"]);
    }

    #[test]
    fn test_to_connector_object_defaults() {
        let definition = definition();
        let returned = definition.returned_attributes(&OperationOptions::new());
        let object = definition
            .to_connector_object(&fetched(), &returned, false)
            .unwrap();

        assert_eq!(object.object_class, "Account");
        assert_eq!(object.uid, Uid::with_name_hint("a-1", "foo"));
        assert_eq!(object.name(), Some("foo"));
        assert_eq!(
            object.attribute("profile.nickname").and_then(|v| v.as_string()),
            Some("f")
        );
        assert_eq!(
            object.attribute("created").and_then(|v| v.as_datetime()),
            DateTime::parse_from_rfc3339("2024-01-02T03:04:05+09:00").ok().as_ref()
        );
        assert!(object.attribute("roles").is_none());
        assert!(object.incomplete_attributes.is_empty());
    }

    #[test]
    fn test_to_connector_object_omits_empty_values() {
        let definition = definition();
        let account = Account {
            id: Some("a-1".to_string()),
            login: Some("foo".to_string()),
            ..Default::default()
        };
        let returned = definition.returned_attributes(
            &OperationOptions::new()
                .with_attributes_to_get(["roles"])
                .with_default_attributes(),
        );
        let object = definition
            .to_connector_object(&account, &returned, false)
            .unwrap();

        let mut names: Vec<&str> = object.attributes.names().collect();
        names.sort_unstable();
        assert_eq!(names, vec![NAME_ATTRIBUTE, UID_ATTRIBUTE]);
    }

    #[test]
    fn test_to_connector_object_partial_values() {
        let definition = definition();
        let returned = definition.returned_attributes(&OperationOptions::new());
        let object = definition
            .to_connector_object(&fetched(), &returned, true)
            .unwrap();
        assert_eq!(object.incomplete_attributes, vec!["roles"]);

        let returned =
            definition.returned_attributes(&OperationOptions::new().with_attributes_to_get(["roles"]));
        let object = definition
            .to_connector_object(&fetched(), &returned, true)
            .unwrap();
        assert!(object.incomplete_attributes.is_empty());
        assert_eq!(
            object.attributes.get_strings("roles"),
            Some(vec!["r1", "r2"])
        );
    }

    #[test]
    fn test_to_connector_object_is_idempotent() {
        let definition = definition();
        let account = fetched();
        let returned = definition.returned_attributes(&OperationOptions::new());
        let first = definition.to_connector_object(&account, &returned, false).unwrap();
        let second = definition.to_connector_object(&account, &returned, false).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_to_connector_object_requires_identifier() {
        let definition = definition();
        let returned = definition.returned_attributes(&OperationOptions::new());
        let err = definition
            .to_connector_object(&Account::default(), &returned, false)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }

    #[test]
    fn test_create_then_read_round_trip() {
        let definition = definition();
        let attrs = AttributeSet::new()
            .with(NAME_ATTRIBUTE, "foo")
            .with("profile.nickname", "f")
            .with("enabled", true);
        let mut account = Account::default();
        definition
            .apply(&attrs, &mut account, UnknownAttributePolicy::Ignore)
            .unwrap();
        account.id = Some("a-1".to_string());

        let returned = definition.returned_attributes(&OperationOptions::new());
        let object = definition
            .to_connector_object(&account, &returned, false)
            .unwrap();
        for name in [NAME_ATTRIBUTE, "profile.nickname", "enabled"] {
            assert_eq!(object.attribute(name), attrs.get(name), "{name}");
        }
    }
}
