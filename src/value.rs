//! Type-erased values and the per-type descriptor the engine calls through.

use std::any::{Any, TypeId};
use std::fmt;

/// An owned, type-erased value flowing along graph links.
///
/// Moving a `BoxedValue` is the engine's "move" operation, dropping it is
/// the exactly-once destruct, and copying always goes through the
/// [`ValueType`] descriptor. The engine itself never inspects the payload.
pub struct BoxedValue {
    inner: Box<dyn Any + Send + Sync>,
}

impl BoxedValue {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            inner: Box::new(value),
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Unwrap into the concrete type, giving the value back on mismatch.
    pub fn downcast<T: 'static>(self) -> Result<T, BoxedValue> {
        match self.inner.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(inner) => Err(Self { inner }),
        }
    }

    pub fn value_type_id(&self) -> TypeId {
        (*self.inner).type_id()
    }
}

impl fmt::Debug for BoxedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedValue").finish_non_exhaustive()
    }
}

/// Per-type descriptor bundling the operations the engine needs for a value
/// of statically unknown type: default-construct and duplicate. Move and
/// destruct come for free from ownership of [`BoxedValue`].
///
/// Two descriptors compare equal when they describe the same Rust type,
/// which is what link type checking relies on.
#[derive(Clone)]
pub struct ValueType {
    name: &'static str,
    id: TypeId,
    default_fn: fn() -> BoxedValue,
    duplicate_fn: fn(&BoxedValue) -> Option<BoxedValue>,
}

impl ValueType {
    pub fn of<T: Clone + Default + Send + Sync + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
            default_fn: || BoxedValue::new(T::default()),
            duplicate_fn: |value| value.downcast_ref::<T>().map(|v| BoxedValue::new(v.clone())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Default-construct a fresh value of this type.
    pub fn default_value(&self) -> BoxedValue {
        (self.default_fn)()
    }

    /// Copy-construct a new value from an existing one.
    ///
    /// Panics if `value` is not of this type; the graph's link type checks
    /// make that unreachable for values the executor forwards.
    pub fn duplicate(&self, value: &BoxedValue) -> BoxedValue {
        (self.duplicate_fn)(value)
            .unwrap_or_else(|| panic!("duplicate called with a value that is not {}", self.name))
    }

    /// Whether a concrete value is an instance of this type.
    pub fn accepts(&self, value: &BoxedValue) -> bool {
        self.id == value.value_type_id()
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueType {}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueType").field(&self.name).finish()
    }
}
