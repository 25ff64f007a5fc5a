//! Connector Framework schema types
//!
//! The externally published schema: object classes, their attributes with
//! metadata flags, and the operation options a search accepts. This is what
//! a discovery-capable caller sees; the mapping rules live in
//! [`crate::definition`].

use serde::{Deserialize, Serialize};

/// Schema representing the structure of a target system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// The object classes available in this schema.
    pub object_classes: Vec<ObjectClass>,

    /// Operation options accepted by search.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operation_options: Vec<OperationOptionInfo>,
}

impl Schema {
    /// Create a new empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object class to the schema.
    pub fn add_object_class(&mut self, object_class: ObjectClass) {
        self.object_classes.push(object_class);
    }

    /// Declare an operation option.
    pub fn add_operation_option(&mut self, option: OperationOptionInfo) {
        self.operation_options.push(option);
    }

    /// Find an object class by name.
    #[must_use]
    pub fn get_object_class(&self, name: &str) -> Option<&ObjectClass> {
        self.object_classes.iter().find(|oc| oc.name == name)
    }

    /// Get all object class names.
    #[must_use]
    pub fn object_class_names(&self) -> Vec<&str> {
        self.object_classes
            .iter()
            .map(|oc| oc.name.as_str())
            .collect()
    }
}

/// Operation options a connector declares for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationOptionInfo {
    AttributesToGet,
    ReturnDefaultAttributes,
    PageSize,
    PagedResultsOffset,
}

impl OperationOptionInfo {
    /// The options every paged, attribute-selecting search supports.
    #[must_use]
    pub fn search_defaults() -> Vec<OperationOptionInfo> {
        vec![
            OperationOptionInfo::AttributesToGet,
            OperationOptionInfo::ReturnDefaultAttributes,
            OperationOptionInfo::PageSize,
            OperationOptionInfo::PagedResultsOffset,
        ]
    }
}

/// An object class in a target system schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectClass {
    /// Canonical name for this object class (e.g., "User").
    pub name: String,

    /// Attributes belonging to this object class.
    pub attributes: Vec<SchemaAttribute>,
}

impl ObjectClass {
    /// Create a new object class with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute to this object class.
    pub fn add_attribute(&mut self, attribute: SchemaAttribute) {
        self.attributes.push(attribute);
    }

    /// Add an attribute using builder pattern.
    #[must_use]
    pub fn with_attribute(mut self, attribute: SchemaAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Find an attribute by name.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Get all required attributes.
    #[must_use]
    pub fn required_attributes(&self) -> Vec<&SchemaAttribute> {
        self.attributes.iter().filter(|a| a.required).collect()
    }
}

/// An attribute in an object class schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaAttribute {
    /// Connector-visible name (e.g., "__NAME__", "name.givenName").
    pub name: String,

    /// Field name in the target system (e.g., "userName").
    pub native_name: String,

    /// Data type of this attribute.
    pub data_type: AttributeDataType,

    /// Whether this attribute can have multiple values.
    #[serde(default)]
    pub multi_valued: bool,

    /// Whether this attribute is required for create operations.
    #[serde(default)]
    pub required: bool,

    /// Whether this attribute can be set on create.
    #[serde(default = "default_true")]
    pub creatable: bool,

    /// Whether this attribute can be changed on update.
    #[serde(default = "default_true")]
    pub updateable: bool,

    /// Whether this attribute can be read.
    #[serde(default = "default_true")]
    pub readable: bool,

    /// Whether this attribute is returned by default in search results.
    #[serde(default = "default_true")]
    pub returned_by_default: bool,

    /// Whether values compare case-insensitively.
    #[serde(default)]
    pub case_insensitive: bool,
}

fn default_true() -> bool {
    true
}

impl SchemaAttribute {
    /// Create a new attribute with the given name and type.
    pub fn new(
        name: impl Into<String>,
        native_name: impl Into<String>,
        data_type: AttributeDataType,
    ) -> Self {
        Self {
            name: name.into(),
            native_name: native_name.into(),
            data_type,
            multi_valued: false,
            required: false,
            creatable: true,
            updateable: true,
            readable: true,
            returned_by_default: true,
            case_insensitive: false,
        }
    }

    /// Check if the attribute is read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        !self.creatable && !self.updateable
    }
}

/// Data type for schema attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeDataType {
    /// String/text value.
    String,
    /// Boolean value.
    Boolean,
    /// Date/time value with offset.
    DateTime,
    /// UUID/GUID value carried as a string.
    Uuid,
}

impl AttributeDataType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeDataType::String => "string",
            AttributeDataType::Boolean => "boolean",
            AttributeDataType::DateTime => "datetime",
            AttributeDataType::Uuid => "uuid",
        }
    }
}

impl std::fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
