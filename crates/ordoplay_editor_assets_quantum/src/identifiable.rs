// SPDX-License-Identifier: MIT OR Apache-2.0
//! Handles on identifiable objects.

use ordoplay_editor_quantum::{ObjectRef, TypeKey, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// An object instance carrying its own identifier
///
/// Two handles are equal when they point to the same instance.
#[derive(Clone)]
pub struct Identifiable {
    /// Identifier of the object
    id: Uuid,
    /// The object instance
    object: ObjectRef,
}

impl Identifiable {
    /// Get the identifiable object held by a value, if any
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let id = object.identifier()?;
        Some(Self {
            id,
            object: object.clone(),
        })
    }

    /// Identifier of the object
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The object instance
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// Runtime type of the object
    pub fn type_key(&self) -> TypeKey {
        self.object.type_key()
    }

    /// The object as a value
    pub fn to_value(&self) -> Value {
        Value::Object(self.object.clone())
    }
}

impl PartialEq for Identifiable {
    fn eq(&self, other: &Self) -> bool {
        self.object.ptr_eq(&other.object)
    }
}

impl Eq for Identifiable {}

impl Hash for Identifiable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object.key().hash(state);
    }
}

impl fmt::Debug for Identifiable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.object, self.id)
    }
}
