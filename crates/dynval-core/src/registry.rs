//! Canonicalization table for well-known native shapes
//!
//! The registry maps the exact `TypeId` of a native type (regex pattern
//! matchers, timestamps) to a constructor producing the dedicated [`Value`]
//! variant and to the declared [`Type`] of that shape. It is immutable once
//! built; the standard registry is built on first use and shared process
//! wide.

use crate::ty::Type;
use crate::value::Value;
use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;
use std::time::SystemTime;

/// Constructor of a canonical value from a native value of the registered type
pub type Construct = fn(&dyn Any) -> Option<Value>;

/// Registry entry for a well-known native type
#[derive(Clone)]
pub struct WellKnown {
    /// Native type name (for debugging)
    pub name: &'static str,

    /// Declared type of values of this shape
    pub ty: Type,

    construct: Construct,
}

impl WellKnown {
    /// Build the canonical value for `native`
    ///
    /// Returns `None` if `native` is not of the registered type.
    pub fn construct(&self, native: &dyn Any) -> Option<Value> {
        (self.construct)(native)
    }
}

impl std::fmt::Debug for WellKnown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WellKnown")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}

/// Immutable table of well-known native types
#[derive(Clone, Debug)]
pub struct Registry {
    entries: Arc<FxHashMap<TypeId, WellKnown>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Arc::new(FxHashMap::default()),
        }
    }

    /// Create a registry builder
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            entries: FxHashMap::default(),
        }
    }

    /// The shared standard registry
    pub fn standard() -> Arc<Registry> {
        Arc::clone(&STANDARD)
    }

    /// Get the entry for a native type
    pub fn get(&self, type_id: TypeId) -> Option<&WellKnown> {
        self.entries.get(&type_id)
    }

    /// Check if a native type is registered
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.entries.contains_key(&type_id)
    }

    /// Declared type of a registered native type
    pub fn type_for(&self, type_id: TypeId) -> Option<&Type> {
        self.get(type_id).map(|e| &e.ty)
    }

    /// Declared type of the native type `T`
    pub fn type_of<T: Any>(&self) -> Option<&Type> {
        self.type_for(TypeId::of::<T>())
    }

    /// Canonical value for `native` if its exact type is registered
    pub fn canonicalize(&self, native: &dyn Any) -> Option<Value> {
        self.get(native.type_id())?.construct(native)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Registry`]
pub struct RegistryBuilder {
    entries: FxHashMap<TypeId, WellKnown>,
}

impl RegistryBuilder {
    /// Register a native type
    pub fn register<T: Any>(mut self, name: &'static str, ty: Type, construct: Construct) -> Self {
        self.entries.insert(
            TypeId::of::<T>(),
            WellKnown {
                name,
                ty,
                construct,
            },
        );
        self
    }

    /// Build the registry
    pub fn build(self) -> Registry {
        Registry {
            entries: Arc::new(self.entries),
        }
    }
}

static STANDARD: Lazy<Arc<Registry>> = Lazy::new(|| {
    let registry = create_standard_registry();
    tracing::debug!(types = registry.len(), "standard registry built");
    Arc::new(registry)
});

/// Create a registry with the well-known regex and timestamp types
pub fn create_standard_registry() -> Registry {
    Registry::builder()
        .register::<Regex>("regex::Regex", Type::Regexp, |n| {
            n.downcast_ref::<Regex>()
                .map(|r| Value::Regexp(Arc::new(r.clone())))
        })
        .register::<DateTime<Utc>>("DateTime<Utc>", Type::Time, |n| {
            n.downcast_ref::<DateTime<Utc>>().map(|t| Value::Time(*t))
        })
        .register::<DateTime<FixedOffset>>("DateTime<FixedOffset>", Type::Time, |n| {
            n.downcast_ref::<DateTime<FixedOffset>>()
                .map(|t| Value::Time(t.with_timezone(&Utc)))
        })
        .register::<SystemTime>("SystemTime", Type::Time, |n| {
            n.downcast_ref::<SystemTime>()
                .map(|t| Value::Time(DateTime::<Utc>::from(*t)))
        })
        .build()
}
