// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dynamic values introspected by the graph.
//!
//! Scalars and atomic values are stored inline in a [`Value`]. Everything
//! else lives in an [`Instance`] behind an [`ObjectRef`], which gives objects
//! reference semantics: the same instance can be reached from several slots,
//! including through cycles.

use crate::descriptor::{builtin, TypeKey};
use crate::error::{QuantumError, Result};
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Hashable primitive used as a dictionary key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKey {
    /// Boolean key
    Bool(bool),
    /// Signed integer key
    Int(i64),
    /// Unsigned integer key
    UInt(u64),
    /// Character key
    Char(char),
    /// String key
    String(String),
    /// Identifier key
    Guid(Uuid),
    /// Decimal key
    Decimal(Decimal),
    /// Enumeration key
    Enum {
        /// Enumeration type
        ty: TypeKey,
        /// Variant name
        variant: String,
    },
}

impl IndexKey {
    /// Convert back to a value
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(v) => Value::Bool(*v),
            Self::Int(v) => Value::Int(*v),
            Self::UInt(v) => Value::UInt(*v),
            Self::Char(v) => Value::Char(*v),
            Self::String(v) => Value::String(v.clone()),
            Self::Guid(v) => Value::Guid(*v),
            Self::Decimal(v) => Value::Decimal(*v),
            Self::Enum { ty, variant } => Value::Enum {
                ty: ty.clone(),
                variant: variant.clone(),
            },
        }
    }
}

impl TryFrom<&Value> for IndexKey {
    type Error = QuantumError;

    fn try_from(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Bool(v) => Self::Bool(*v),
            Value::Int(v) => Self::Int(*v),
            Value::UInt(v) => Self::UInt(*v),
            Value::Char(v) => Self::Char(*v),
            Value::String(v) => Self::String(v.clone()),
            Value::Guid(v) => Self::Guid(*v),
            Value::Decimal(v) => Self::Decimal(*v),
            Value::Enum { ty, variant } => Self::Enum {
                ty: ty.clone(),
                variant: variant.clone(),
            },
            other => {
                return Err(QuantumError::argument(format!(
                    "{other} cannot be used as a dictionary key"
                )))
            }
        })
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => write!(f, "{v:?}"),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

/// A runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// No value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point
    Float(f64),
    /// Character
    Char(char),
    /// Enumeration variant
    Enum {
        /// Enumeration type
        ty: TypeKey,
        /// Variant name
        variant: String,
    },
    /// Text string
    String(String),
    /// Arbitrary-precision decimal
    Decimal(Decimal),
    /// Globally unique identifier
    Guid(Uuid),
    /// Shared object instance
    Object(ObjectRef),
}

impl Value {
    /// Wrap a new instance
    pub fn object(instance: Instance) -> Self {
        Self::Object(ObjectRef::new(instance))
    }

    /// Create an enumeration value
    pub fn enumeration(ty: impl Into<TypeKey>, variant: impl Into<String>) -> Self {
        Self::Enum {
            ty: ty.into(),
            variant: variant.into(),
        }
    }

    /// Check whether this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the object handle, if this is an object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Runtime type of this value, `None` for `Null`
    pub fn type_key(&self) -> Option<TypeKey> {
        let name = match self {
            Self::Null => return None,
            Self::Bool(_) => builtin::BOOL,
            Self::Int(_) => builtin::INT,
            Self::UInt(_) => builtin::UINT,
            Self::Float(_) => builtin::FLOAT,
            Self::Char(_) => builtin::CHAR,
            Self::String(_) => builtin::STRING,
            Self::Decimal(_) => builtin::DECIMAL,
            Self::Guid(_) => builtin::GUID,
            Self::Enum { ty, .. } => return Some(ty.clone()),
            Self::Object(object) => return Some(object.type_key()),
        };
        Some(TypeKey::new(name))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Guid(a), Self::Guid(b)) => a == b,
            (Self::Enum { ty: ta, variant: va }, Self::Enum { ty: tb, variant: vb }) => {
                ta == tb && va == vb
            }
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Guid(v) => write!(f, "{v}"),
            Self::Enum { ty, variant } => write!(f, "{ty}::{variant}"),
            Self::Object(object) => write!(f, "{object:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Guid(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Self::object(value)
    }
}

/// Storage of an object instance
#[derive(Debug, Clone)]
pub enum InstanceData {
    /// Named fields of a plain object
    Fields(IndexMap<String, Value>),
    /// Items of a collection
    Items(Vec<Value>),
    /// Entries of a dictionary
    Entries(IndexMap<IndexKey, Value>),
}

/// An object instance
#[derive(Debug, Clone)]
pub struct Instance {
    /// Runtime type
    pub ty: TypeKey,
    /// Identifier of identifiable objects
    pub identifier: Option<Uuid>,
    /// Instance storage
    pub data: InstanceData,
}

impl Instance {
    /// Create a plain object from its fields
    pub fn object<K: Into<String>>(
        ty: impl Into<TypeKey>,
        fields: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        Self {
            ty: ty.into(),
            identifier: None,
            data: InstanceData::Fields(fields.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Create a collection from its items
    pub fn collection(ty: impl Into<TypeKey>, items: impl IntoIterator<Item = Value>) -> Self {
        Self {
            ty: ty.into(),
            identifier: None,
            data: InstanceData::Items(items.into_iter().collect()),
        }
    }

    /// Create a dictionary from its entries
    pub fn dictionary(
        ty: impl Into<TypeKey>,
        entries: impl IntoIterator<Item = (IndexKey, Value)>,
    ) -> Self {
        Self {
            ty: ty.into(),
            identifier: None,
            data: InstanceData::Entries(entries.into_iter().collect()),
        }
    }

    /// Make this instance identifiable
    pub fn with_identifier(mut self, identifier: Uuid) -> Self {
        self.identifier = Some(identifier);
        self
    }

    /// Get a field value
    pub fn field(&self, name: &str) -> Option<&Value> {
        match &self.data {
            InstanceData::Fields(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Set a field value
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        match &mut self.data {
            InstanceData::Fields(fields) => {
                fields.insert(name.to_string(), value);
                Ok(())
            }
            _ => Err(QuantumError::argument(format!(
                "{} has no member {name}",
                self.ty
            ))),
        }
    }

    /// Get the number of items or entries
    pub fn len(&self) -> usize {
        match &self.data {
            InstanceData::Fields(fields) => fields.len(),
            InstanceData::Items(items) => items.len(),
            InstanceData::Entries(entries) => entries.len(),
        }
    }

    /// Check whether there are no items or entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity of an object instance, for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

/// Shared handle to an object instance
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Instance>>);

impl ObjectRef {
    /// Wrap an instance
    pub fn new(instance: Instance) -> Self {
        Self(Arc::new(RwLock::new(instance)))
    }

    /// Lock for reading
    pub fn read(&self) -> RwLockReadGuard<'_, Instance> {
        self.0.read()
    }

    /// Lock for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, Instance> {
        self.0.write()
    }

    /// Check whether two handles point to the same instance
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the instance
    pub fn key(&self) -> ObjectKey {
        ObjectKey(Arc::as_ptr(&self.0) as *const () as usize)
    }

    /// Runtime type of the instance
    pub fn type_key(&self) -> TypeKey {
        self.read().ty.clone()
    }

    /// Identifier of the instance, if identifiable
    pub fn identifier(&self) -> Option<Uuid> {
        self.read().identifier
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Instances may form cycles
        match self.0.try_read() {
            Some(instance) => write!(f, "{}@{:#x}", instance.ty, self.key().0),
            None => write!(f, "<locked>@{:#x}", self.key().0),
        }
    }
}
