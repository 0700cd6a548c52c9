//! Type identity and type-erased values.
//!
//! Transforms are keyed by the identity of the Rust types they convert between,
//! never by name or structure. [`TypeKey`] carries that identity together with a
//! human-readable name for diagnostics, and [`DynValue`] is an owned value that
//! remembers the key of the type it was built from.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a concrete type.
///
/// Two keys are equal only when they refer to the same `TypeId`. The name is
/// carried along for logging and error messages and does not take part in
/// comparison or hashing.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for the type `T`.
    ///
    /// # Example
    /// ```
    /// use transform_workitem::TypeKey;
    ///
    /// assert_eq!(TypeKey::of::<i64>(), TypeKey::of::<i64>());
    /// assert_ne!(TypeKey::of::<i64>(), TypeKey::of::<i32>());
    /// ```
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Rust type name, e.g. `alloc::string::String`.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An owned value whose concrete type is only known at runtime.
///
/// Work items carry their input as a `DynValue`; the registry reads the
/// value's [`TypeKey`] to pick the transform.
pub struct DynValue {
    key: TypeKey,
    value: Box<dyn Any + Send>,
}

impl DynValue {
    /// Wrap a value, recording the key of `T`.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            value: Box::new(value),
        }
    }

    /// Key of the wrapped value's type.
    pub fn type_key(&self) -> TypeKey {
        self.key
    }

    pub fn type_name(&self) -> &'static str {
        self.key.name()
    }

    /// Check whether the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.key == TypeKey::of::<T>()
    }

    /// Borrow the wrapped value as a `T`.
    ///
    /// # Returns
    /// `Some(&T)` if the value is a `T`, `None` otherwise
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the wrapped value out as a `T`.
    ///
    /// On a type mismatch the original value is handed back unchanged so the
    /// caller can report what it actually was.
    pub fn downcast<T: Any>(self) -> Result<T, DynValue> {
        let key = self.key;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(DynValue { key, value }),
        }
    }
}

impl fmt::Debug for DynValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynValue")
            .field("type", &self.key.name())
            .finish_non_exhaustive()
    }
}
