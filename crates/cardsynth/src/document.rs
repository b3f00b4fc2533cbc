//! Module: document
//! Responsibility: entity documents and the attribute schema of a collection.
//! Does not own: predicate evaluation or storage.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Document
///
/// One immutable entity record. `id` is the globally unique tie-break key;
/// every other attribute lives in `fields`.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Borrow one attribute by name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Read one attribute, treating `id_field` as the document id and
    /// missing attributes as `Null`.
    #[must_use]
    pub fn value_of(&self, field: &str, id_field: &str) -> Value {
        if field == id_field {
            return Value::Text(self.id.clone());
        }

        self.fields.get(field).cloned().unwrap_or(Value::Null)
    }
}

///
/// DerivedField
///
/// A grouping key computed from a compound string attribute, e.g. the
/// domain part of an email address (`source = "email"`, `separator = "@"`,
/// `part = 1`). Derived fields are profiled but cannot be filtered on.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DerivedField {
    pub name: String,
    pub source: String,
    pub separator: String,
    pub part: usize,
}

impl DerivedField {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        separator: impl Into<String>,
        part: usize,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            separator: separator.into(),
            part,
        }
    }

    /// Extract the derived partition key from one source value.
    #[must_use]
    pub fn derive(&self, source: &Value) -> Value {
        source
            .as_text()
            .and_then(|text| text.split(self.separator.as_str()).nth(self.part))
            .map_or(Value::Null, |part| Value::Text(part.to_string()))
    }
}

///
/// CollectionSchema
///
/// Classifies the well-known attributes of one collection so the profiler
/// knows which aggregates to run and the strategies know which fields they
/// may constrain.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CollectionSchema {
    pub collection: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default)]
    pub numeric_fields: Vec<String>,
    #[serde(default)]
    pub categorical_fields: Vec<String>,
    #[serde(default)]
    pub derived_fields: Vec<DerivedField>,
    #[serde(default)]
    pub boolean_fields: Vec<String>,
    #[serde(default)]
    pub timestamp_field: Option<String>,
}

fn default_id_field() -> String {
    "_id".to_string()
}

impl CollectionSchema {
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id_field: default_id_field(),
            numeric_fields: Vec::new(),
            categorical_fields: Vec::new(),
            derived_fields: Vec::new(),
            boolean_fields: Vec::new(),
            timestamp_field: None,
        }
    }

    #[must_use]
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    #[must_use]
    pub fn numeric(mut self, field: impl Into<String>) -> Self {
        self.numeric_fields.push(field.into());
        self
    }

    #[must_use]
    pub fn categorical(mut self, field: impl Into<String>) -> Self {
        self.categorical_fields.push(field.into());
        self
    }

    #[must_use]
    pub fn derived(mut self, field: DerivedField) -> Self {
        self.derived_fields.push(field);
        self
    }

    #[must_use]
    pub fn boolean(mut self, field: impl Into<String>) -> Self {
        self.boolean_fields.push(field.into());
        self
    }

    #[must_use]
    pub fn timestamp(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = Some(field.into());
        self
    }
}

///
/// TESTS
///
