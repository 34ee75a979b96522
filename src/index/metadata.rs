//! Logical dataset metadata
//!
//! [`IndexMetadata`] describes a logical dataset: its normalized name, the
//! declared properties with value types, the designated timestamp property
//! and arbitrary backend settings. It is created once at dataset
//! registration and reused for the dataset's lifetime; the only mutation
//! after construction is an explicit copy under a new name.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};

/// Default id of the designated timestamp property
pub const DEFAULT_TIMESTAMP_PROPERTY: &str = "timestamp";

/// Declared value type of a property
///
/// Drives term-value coercion and the shape of nested queries: `Object`
/// and `Array(Object)` properties are indexed as nested documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    /// UTF-8 string
    String,
    /// 64-bit integer
    Long,
    /// 64-bit float
    Double,
    /// Boolean
    Bool,
    /// Instant, stored as epoch milliseconds
    Date,
    /// Homogeneous array of the element type
    Array(Box<PropertyType>),
    /// Nested object
    Object,
}

impl PropertyType {
    /// Whether values of this type live inside a nested-document context
    pub fn is_nested(&self) -> bool {
        match self {
            PropertyType::Object => true,
            PropertyType::Array(element) => matches!(**element, PropertyType::Object),
            _ => false,
        }
    }
}

/// A declared property of a logical dataset
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMetadata {
    /// Property id (unique within the dataset)
    pub id: String,
    /// Declared value type
    pub property_type: PropertyType,
}

impl PropertyMetadata {
    /// Create a property declaration
    pub fn new(id: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            id: id.into(),
            property_type,
        }
    }
}

/// Metadata of a logical dataset
#[derive(Debug, Clone)]
pub struct IndexMetadata {
    name: String,
    properties: IndexMap<String, PropertyMetadata>,
    timestamp_property: String,
    settings: HashMap<String, Value>,
}

impl IndexMetadata {
    /// Create metadata with the default timestamp property.
    ///
    /// The name is normalized (trimmed, lowercased). An empty name is a
    /// configuration error and fails fast, before any data is touched.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        Self::with_timestamp_property(name, DEFAULT_TIMESTAMP_PROPERTY)
    }

    /// Create metadata with an explicit timestamp property id
    pub fn with_timestamp_property(
        name: impl AsRef<str>,
        timestamp_property: impl Into<String>,
    ) -> Result<Self> {
        let normalized = name.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(Error::configuration("index name must not be empty"));
        }
        Ok(Self {
            name: normalized,
            properties: IndexMap::new(),
            timestamp_property: timestamp_property.into(),
            settings: HashMap::new(),
        })
    }

    /// Declare a property. A redeclared id replaces the previous type.
    pub fn add_property(mut self, id: impl Into<String>, property_type: PropertyType) -> Self {
        let id = id.into();
        self.properties
            .insert(id.clone(), PropertyMetadata::new(id, property_type));
        self
    }

    /// Attach a backend setting
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Normalized logical dataset name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a declared property by id
    pub fn property(&self, id: &str) -> Option<&PropertyMetadata> {
        self.properties.get(id)
    }

    /// All declared properties, in declaration order
    pub fn properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.values()
    }

    /// The designated timestamp property, if declared
    pub fn timestamp_property(&self) -> Option<&PropertyMetadata> {
        self.properties.get(&self.timestamp_property)
    }

    /// Id of the designated timestamp property
    pub fn timestamp_property_id(&self) -> &str {
        &self.timestamp_property
    }

    /// Backend settings
    pub fn settings(&self) -> &HashMap<String, Value> {
        &self.settings
    }

    /// Copy this metadata under a new physical name.
    ///
    /// Properties, timestamp property and settings are carried over.
    pub fn with_name(&self, name: impl AsRef<str>) -> Result<Self> {
        let mut copy = Self::with_timestamp_property(name, self.timestamp_property.clone())?;
        copy.properties = self.properties.clone();
        copy.settings = self.settings.clone();
        Ok(copy)
    }
}
