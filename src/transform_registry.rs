//! Transform registry keyed by (output type, input type).
//!
//! A transform is a conversion from one Rust type to another. The registry
//! holds at most one transform per type pair and dispatches on the runtime
//! type of the value it is handed.
//!
//! Registration is explicit: closures are registered one at a time with
//! [`TransformRegistry::register`], or in bulk from a [`TransformProvider`].

use std::any::Any;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::catalog::TypeCatalog;
use crate::types::{DynValue, TypeKey};

/// Cause of a failed transform invocation.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error type for transform operations
#[derive(Debug, Clone)]
pub enum TransformError {
    /// One or more required work item parameters were not supplied.
    MissingParameters(Vec<String>),
    InvalidParameter {
        name: String,
        reason: String,
    },
    /// Type name not known to the registry's catalog.
    UnresolvedType(String),
    NoTransform {
        input: TypeKey,
        output: TypeKey,
    },
    TypeMismatch {
        expected: TypeKey,
        actual: TypeKey,
    },
    /// The operation itself failed or panicked.
    Invocation {
        input: TypeKey,
        output: TypeKey,
        source: Arc<dyn StdError + Send + Sync>,
    },
    /// A value could not be decoded from or encoded to JSON.
    Codec {
        type_name: String,
        message: String,
    },
}

impl TransformError {
    /// Stable identifier for the error category, used in wire responses.
    pub fn kind(&self) -> &'static str {
        match self {
            TransformError::MissingParameters(_) => "missing_parameter",
            TransformError::InvalidParameter { .. } => "invalid_parameter",
            TransformError::UnresolvedType(_) => "unresolved_type",
            TransformError::NoTransform { .. } => "no_transform",
            TransformError::TypeMismatch { .. } => "type_mismatch",
            TransformError::Invocation { .. } => "invocation_failed",
            TransformError::Codec { .. } => "codec",
        }
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::MissingParameters(names) => {
                write!(f, "Missing required parameters: {}", names.join(", "))
            }
            TransformError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            TransformError::UnresolvedType(name) => write!(f, "Unknown type: {}", name),
            TransformError::NoTransform { input, output } => {
                write!(f, "No transform available from {} to {}", input, output)
            }
            TransformError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
            TransformError::Invocation { input, output, source } => {
                write!(f, "Transform {} -> {} failed: {}", input, output, source)
            }
            TransformError::Codec { type_name, message } => {
                write!(f, "Cannot convert {} value: {}", type_name, message)
            }
        }
    }
}

impl StdError for TransformError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TransformError::Invocation { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

type Operation = dyn Fn(DynValue) -> Result<DynValue, TransformError> + Send + Sync;

/// A registered conversion: input type, output type and the operation itself.
///
/// Cloning is cheap; clones share the same operation.
#[derive(Clone)]
pub struct Transform {
    input: TypeKey,
    output: TypeKey,
    operation: Arc<Operation>,
}

impl Transform {
    /// Wrap an infallible conversion `I -> O`.
    pub fn new<I, O, F>(operation: F) -> Self
    where
        I: Any + Send,
        O: Any + Send,
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        Self::fallible(move |input: I| Ok::<O, BoxError>(operation(input)))
    }

    /// Wrap a conversion that may fail.
    ///
    /// The error is kept as the `source` of [`TransformError::Invocation`].
    pub fn fallible<I, O, E, F>(operation: F) -> Self
    where
        I: Any + Send,
        O: Any + Send,
        E: Into<BoxError>,
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    {
        let input = TypeKey::of::<I>();
        let output = TypeKey::of::<O>();

        let erased = move |value: DynValue| -> Result<DynValue, TransformError> {
            let value = value.downcast::<I>().map_err(|v| TransformError::TypeMismatch {
                expected: input,
                actual: v.type_key(),
            })?;
            operation(value)
                .map(DynValue::new)
                .map_err(|e| {
                    let source: BoxError = e.into();
                    TransformError::Invocation {
                        input,
                        output,
                        source: Arc::from(source),
                    }
                })
        };

        Self {
            input,
            output,
            operation: Arc::new(erased),
        }
    }

    pub fn input(&self) -> TypeKey {
        self.input
    }

    pub fn output(&self) -> TypeKey {
        self.output
    }

    /// Invoke the operation.
    ///
    /// A panic inside the operation is caught here and reported as
    /// [`TransformError::Invocation`].
    pub fn call(&self, input: DynValue) -> Result<DynValue, TransformError> {
        if input.type_key() != self.input {
            return Err(TransformError::TypeMismatch {
                expected: self.input,
                actual: input.type_key(),
            });
        }

        match panic::catch_unwind(AssertUnwindSafe(|| (self.operation)(input))) {
            Ok(result) => result,
            Err(payload) => Err(TransformError::Invocation {
                input: self.input,
                output: self.output,
                source: Arc::from(BoxError::from(format!(
                    "operation panicked: {}",
                    panic_message(&*payload)
                ))),
            }),
        }
    }

    /// Whether two handles share the same operation.
    pub fn ptr_eq(&self, other: &Transform) -> bool {
        Arc::ptr_eq(&self.operation, &other.operation)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A fixed set of transforms registered together.
///
/// Owning code implements this for its group of conversions and hands it to
/// [`TransformRegistry::install`] at startup.
pub trait TransformProvider {
    fn transforms(&self) -> Vec<Transform>;

    /// Extra catalog names for the types this provider works with.
    fn aliases(&self) -> Vec<(&'static str, TypeKey)> {
        Vec::new()
    }
}

#[derive(Default)]
struct Inner {
    // output type -> input type -> transform
    transforms: HashMap<TypeKey, HashMap<TypeKey, Transform>>,
    catalog: TypeCatalog,
}

impl Inner {
    fn insert(&mut self, transform: Transform) {
        let (input, output) = (transform.input, transform.output);
        self.catalog.record(input);
        self.catalog.record(output);

        let replaced = self
            .transforms
            .entry(output)
            .or_default()
            .insert(input, transform)
            .is_some();

        if replaced {
            tracing::debug!("Replaced transform {} -> {}", input, output);
        } else {
            tracing::debug!("Registered transform {} -> {}", input, output);
        }
    }
}

/// Registry for storing and calling transforms
///
/// All state sits behind one `RwLock`: registrations are serialized and are
/// visible to every lookup that starts after they return. Operations are
/// cloned out of the lock before they run, so a slow transform never blocks
/// registration.
#[derive(Default)]
pub struct TransformRegistry {
    inner: RwLock<Inner>,
}

impl TransformRegistry {
    /// Create a new empty transform registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of transforms.
    pub fn from_transforms(transforms: impl IntoIterator<Item = Transform>) -> Self {
        let registry = Self::new();
        registry.extend(transforms);
        registry
    }

    // The map only ever holds fully inserted entries, so a poisoned lock is
    // still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a conversion from `I` to `O`.
    ///
    /// An existing transform for the same pair is replaced.
    ///
    /// # Example
    ///
    /// ```
    /// use transform_workitem::TransformRegistry;
    ///
    /// let registry = TransformRegistry::new();
    /// registry.register(|n: i64| n.to_string());
    ///
    /// assert_eq!(registry.convert::<i64, String>(42).unwrap(), "42");
    /// ```
    pub fn register<I, O, F>(&self, operation: F)
    where
        I: Any + Send,
        O: Any + Send,
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        self.register_transform(Transform::new(operation));
    }

    /// Register a conversion that may fail.
    pub fn register_fallible<I, O, E, F>(&self, operation: F)
    where
        I: Any + Send,
        O: Any + Send,
        E: Into<BoxError>,
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    {
        self.register_transform(Transform::fallible(operation));
    }

    pub fn register_transform(&self, transform: Transform) {
        self.write().insert(transform);
    }

    /// Register several transforms under a single lock acquisition.
    pub fn extend(&self, transforms: impl IntoIterator<Item = Transform>) {
        let mut inner = self.write();
        for transform in transforms {
            inner.insert(transform);
        }
    }

    /// Register everything a provider offers, including its aliases.
    pub fn install(&self, provider: &dyn TransformProvider) {
        let transforms = provider.transforms();
        let aliases = provider.aliases();

        let mut inner = self.write();
        for transform in transforms {
            inner.insert(transform);
        }
        for (name, key) in aliases {
            inner.catalog.alias(name, key);
        }
    }

    /// Make `T` resolvable by `name`.
    pub fn alias<T: Any>(&self, name: impl Into<String>) {
        self.write().catalog.alias(name, TypeKey::of::<T>());
    }

    /// Bind `alias` to the type already known as `existing`.
    ///
    /// # Errors
    /// Returns `UnresolvedType` if `existing` is not in the catalog
    pub fn alias_name(&self, alias: &str, existing: &str) -> Result<(), TransformError> {
        let mut inner = self.write();
        let key = inner
            .catalog
            .resolve(existing)
            .ok_or_else(|| TransformError::UnresolvedType(existing.to_string()))?;
        inner.catalog.alias(alias, key);
        Ok(())
    }

    /// Find the type registered under `name`.
    pub fn resolve(&self, name: &str) -> Option<TypeKey> {
        self.read().catalog.resolve(name)
    }

    /// Preferred name for `key` (last alias, else the Rust type name).
    pub fn display_name(&self, key: TypeKey) -> String {
        self.read().catalog.display_name(key).to_string()
    }

    /// Find the transform for a type pair.
    ///
    /// # Returns
    /// `Some(transform)` if one is registered, `None` otherwise
    pub fn lookup(&self, input: TypeKey, output: TypeKey) -> Option<Transform> {
        self.read()
            .transforms
            .get(&output)
            .and_then(|by_input| by_input.get(&input))
            .cloned()
    }

    pub fn lookup_typed<I: Any, O: Any>(&self) -> Option<Transform> {
        self.lookup(TypeKey::of::<I>(), TypeKey::of::<O>())
    }

    pub fn contains(&self, input: TypeKey, output: TypeKey) -> bool {
        self.lookup(input, output).is_some()
    }

    /// Convert `input` into a value of type `output`.
    ///
    /// The input type is read from the value itself.
    ///
    /// # Errors
    /// * `NoTransform` - nothing registered for the pair
    /// * `Invocation` - the operation failed
    pub fn execute(&self, input: DynValue, output: TypeKey) -> Result<DynValue, TransformError> {
        let input_key = input.type_key();
        let transform = self
            .lookup(input_key, output)
            .ok_or(TransformError::NoTransform {
                input: input_key,
                output,
            })?;

        transform.call(input)
    }

    /// Like [`execute`](Self::execute), with the output type given by name.
    pub fn execute_named(&self, input: DynValue, output: &str) -> Result<DynValue, TransformError> {
        let output = self
            .resolve(output)
            .ok_or_else(|| TransformError::UnresolvedType(output.to_string()))?;
        self.execute(input, output)
    }

    /// Typed wrapper around [`execute`](Self::execute).
    pub fn convert<I, O>(&self, input: I) -> Result<O, TransformError>
    where
        I: Any + Send,
        O: Any + Send,
    {
        let output = self.execute(DynValue::new(input), TypeKey::of::<O>())?;
        output.downcast::<O>().map_err(|v| TransformError::TypeMismatch {
            expected: TypeKey::of::<O>(),
            actual: v.type_key(),
        })
    }

    /// Number of registered type pairs.
    pub fn len(&self) -> usize {
        self.read().transforms.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered `(input, output)` pairs, sorted by type name.
    pub fn entries(&self) -> Vec<(TypeKey, TypeKey)> {
        let mut entries: Vec<(TypeKey, TypeKey)> = self
            .read()
            .transforms
            .iter()
            .flat_map(|(output, by_input)| by_input.keys().map(move |input| (*input, *output)))
            .collect();
        entries.sort_by(|a, b| (a.0.name(), a.1.name()).cmp(&(b.0.name(), b.1.name())));
        entries
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.len())
            .finish()
    }
}

impl FromIterator<Transform> for TransformRegistry {
    fn from_iter<T: IntoIterator<Item = Transform>>(iter: T) -> Self {
        Self::from_transforms(iter)
    }
}
