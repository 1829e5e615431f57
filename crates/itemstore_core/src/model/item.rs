//! Item domain model.
//!
//! # Responsibility
//! - Define the canonical record stored by the item repository.
//! - Keep reserved system fields apart from the open attribute bag.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - `attributes` never contains a reserved wire key.
//! - `updated_at` is never earlier than `created_at`.
//! - `kind` and `name` match [`TOKEN_PATTERN`].

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one stored item.
pub type ItemId = Uuid;

/// Wire key of the item identifier.
pub const FIELD_UUID: &str = "uuid";
/// Wire key of the item type.
pub const FIELD_TYPE: &str = "type";
/// Wire key of the item name.
pub const FIELD_NAME: &str = "name";
/// Wire key of the creation timestamp.
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Wire key of the last-update timestamp.
pub const FIELD_UPDATED_AT: &str = "updatedAt";

const RESERVED_FIELDS: &[&str] = &[
    FIELD_UUID,
    FIELD_TYPE,
    FIELD_NAME,
    FIELD_CREATED_AT,
    FIELD_UPDATED_AT,
];

/// Shape shared by item types and item names.
pub const TOKEN_PATTERN: &str = "^[a-z][a-z0-9-]{1,254}[a-z0-9]$";

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(TOKEN_PATTERN).expect("valid token regex"));

/// Returns reserved wire keys that can never live inside `Attributes`.
pub fn reserved_fields() -> &'static [&'static str] {
    RESERVED_FIELDS
}

/// Returns whether `key` is a server-managed wire key.
pub fn is_reserved_field(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// Returns whether `value` is a valid item type or item name.
pub fn is_valid_token(value: &str) -> bool {
    TOKEN_RE.is_match(value)
}

/// Open, ordered attribute bag of an item.
///
/// Construction always drops reserved keys, so a value of this type can be
/// flattened next to the reserved fields without collisions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Map<String, Value>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an attribute bag from a JSON object, dropping reserved keys.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self::split(map).0
    }

    /// Splits a JSON object into its attribute bag and its reserved entries.
    pub fn split(map: Map<String, Value>) -> (Self, Map<String, Value>) {
        let mut attributes = Map::new();
        let mut reserved = Map::new();
        for (key, value) in map {
            if is_reserved_field(key.as_str()) {
                reserved.insert(key, value);
            } else {
                attributes.insert(key, value);
            }
        }
        (Self(attributes), reserved)
    }

    /// Inserts one attribute and returns the previous value.
    ///
    /// # Errors
    /// - Returns `ReservedAttribute` when `key` is a reserved wire key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<Option<Value>, ItemValidationError> {
        let key = key.into();
        if is_reserved_field(key.as_str()) {
            return Err(ItemValidationError::ReservedAttribute(key));
        }
        Ok(self.0.insert(key, value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Attributes {
    fn from(value: Map<String, Value>) -> Self {
        Self::from_map(value)
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from_map)
    }
}

/// Canonical stored record: reserved fields plus an open attribute bag.
///
/// Serializes as one flat JSON object, reserved keys first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "uuid")]
    pub id: ItemId,
    /// Singular type token, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Lookup key, unique within `kind`.
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Item {
    /// Creates a new item with a generated id and both timestamps set to now.
    pub fn new(kind: impl Into<String>, name: impl Into<String>, attributes: Attributes) -> Self {
        Self::with_id(Uuid::new_v4(), kind, name, attributes, Utc::now())
    }

    /// Creates an item with a caller-provided id and creation time.
    ///
    /// `updated_at` starts equal to `created_at`. No validation happens here;
    /// repositories call [`Item::validate`] on write.
    pub fn with_id(
        id: ItemId,
        kind: impl Into<String>,
        name: impl Into<String>,
        attributes: Attributes,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            name: name.into(),
            created_at,
            updated_at: created_at,
            attributes,
        }
    }

    /// Validates token shapes and timestamp ordering.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if !is_valid_token(self.kind.as_str()) {
            return Err(ItemValidationError::InvalidType(self.kind.clone()));
        }
        if !is_valid_token(self.name.as_str()) {
            return Err(ItemValidationError::InvalidName(self.name.clone()));
        }
        if self.updated_at < self.created_at {
            return Err(ItemValidationError::TimestampsOutOfOrder);
        }
        Ok(())
    }

    /// Advances `updated_at` to `now`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Full wire representation, reserved fields included.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Model-level validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    InvalidType(String),
    InvalidName(String),
    ReservedAttribute(String),
    TimestampsOutOfOrder,
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidType(value) => write!(
                f,
                "type `{value}` is not valid, it should match the regex '{TOKEN_PATTERN}'"
            ),
            Self::InvalidName(value) => write!(
                f,
                "name `{value}` is not valid, it should match the regex '{TOKEN_PATTERN}'"
            ),
            Self::ReservedAttribute(key) => {
                write!(f, "attribute `{key}` is reserved for server-managed fields")
            }
            Self::TimestampsOutOfOrder => write!(f, "updatedAt must not be earlier than createdAt"),
        }
    }
}

impl Error for ItemValidationError {}
