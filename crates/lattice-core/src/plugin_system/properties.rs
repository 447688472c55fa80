//! Extension property trees.
//!
//! Properties arrive as JSON but are held as a closed [`PropertyValue`]
//! variant so that code references move through explicit states:
//! `Encoded` (straight from the manifest), `CodeRef` (decoded thunk) and
//! `Resolved` (the exported value). Both the decode pass and the resolve pass
//! are written against [`PropertyValue::visit_deep`].
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::kernel::constants::CODE_REF_KEY;
use crate::plugin_system::coderef::CodeRef;
use crate::plugin_system::entry_module::ExportValue;

/// Property tree root of an extension, in manifest key order
pub type PropertyMap = IndexMap<String, PropertyValue>;

/// Serialized pointer to plugin code, `{"$codeRef": "module.export"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncodedCodeRef {
    #[serde(rename = "$codeRef")]
    pub code_ref: String,
}

impl EncodedCodeRef {
    pub fn new(code_ref: impl Into<String>) -> Self {
        Self { code_ref: code_ref.into() }
    }
}

#[derive(Clone)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<PropertyValue>),
    Object(PropertyMap),
    /// Code reference as found in the manifest
    Encoded(EncodedCodeRef),
    /// Decoded, not yet invoked code reference
    CodeRef(CodeRef),
    /// Value produced by invoking a code reference
    Resolved(ExportValue),
}

impl PropertyValue {
    pub fn is_encoded_code_ref(&self) -> bool {
        matches!(self, PropertyValue::Encoded(_))
    }

    pub fn is_code_ref(&self) -> bool {
        matches!(self, PropertyValue::CodeRef(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_code_ref(&self) -> Option<&CodeRef> {
        match self {
            PropertyValue::CodeRef(code_ref) => Some(code_ref),
            _ => None,
        }
    }

    /// Downcast a resolved value to its concrete type.
    pub fn as_resolved<T: 'static>(&self) -> Option<&T> {
        match self {
            PropertyValue::Resolved(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Look up a key when this value is an object.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        match self {
            PropertyValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Walk the tree depth first, handing every node matching `predicate` to
    /// `visitor`. Matching nodes are not descended into.
    ///
    /// The visitor receives mutable references that live as long as the tree
    /// borrow, so a pass can either rewrite nodes in place or collect them.
    pub fn visit_deep<'a, P, F>(&'a mut self, predicate: &P, visitor: &mut F)
    where
        P: Fn(&PropertyValue) -> bool,
        F: FnMut(&'a mut PropertyValue),
    {
        if predicate(self) {
            visitor(self);
            return;
        }
        match self {
            PropertyValue::Array(items) => {
                for item in items.iter_mut() {
                    item.visit_deep(predicate, visitor);
                }
            }
            PropertyValue::Object(map) => visit_map(map, predicate, visitor),
            _ => {}
        }
    }

    /// Count the nodes matching `predicate` without mutating anything.
    pub fn count_matching<P>(&self, predicate: &P) -> usize
    where
        P: Fn(&PropertyValue) -> bool,
    {
        if predicate(self) {
            return 1;
        }
        match self {
            PropertyValue::Array(items) => items.iter().map(|v| v.count_matching(predicate)).sum(),
            PropertyValue::Object(map) => map.values().map(|v| v.count_matching(predicate)).sum(),
            _ => 0,
        }
    }
}

/// [`PropertyValue::visit_deep`] over every value of a property map.
pub fn visit_map<'a, P, F>(map: &'a mut PropertyMap, predicate: &P, visitor: &mut F)
where
    P: Fn(&PropertyValue) -> bool,
    F: FnMut(&'a mut PropertyValue),
{
    for value in map.values_mut() {
        value.visit_deep(predicate, visitor);
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("Null"),
            PropertyValue::Bool(b) => write!(f, "{b:?}"),
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::String(s) => write!(f, "{s:?}"),
            PropertyValue::Array(items) => f.debug_list().entries(items).finish(),
            PropertyValue::Object(map) => f.debug_map().entries(map).finish(),
            PropertyValue::Encoded(encoded) => write!(f, "Encoded({:?})", encoded.code_ref),
            PropertyValue::CodeRef(code_ref) => write!(f, "{code_ref:?}"),
            PropertyValue::Resolved(_) => f.write_str("Resolved(..)"),
        }
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Bool(b),
            Value::Number(n) => PropertyValue::Number(n),
            Value::String(s) => PropertyValue::String(s),
            Value::Array(items) => PropertyValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                // Exactly one key, `$codeRef`, holding a string
                if map.len() == 1 {
                    if let Some(Value::String(raw)) = map.get(CODE_REF_KEY) {
                        return PropertyValue::Encoded(EncodedCodeRef::new(raw.clone()));
                    }
                }
                PropertyValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(PropertyValue::from)
    }
}

/// Convert a JSON object into a property map; any other JSON value yields `None`.
pub fn property_map_from_json(value: serde_json::Value) -> Option<PropertyMap> {
    match PropertyValue::from(value) {
        PropertyValue::Object(map) => Some(map),
        _ => None,
    }
}
