//! Native value reflection
//!
//! [`Reflect`] is how the realization engine observes a native Rust value of
//! unknown static type. Besides `Any` downcasting it exposes the value's
//! structural [`Shape`] and optional numeric and self-realization
//! capabilities. Implementations for the common std, `regex`, `chrono`,
//! `num-bigint` and `serde_json` types are provided here.
//!
//! User types implement [`Reflect`] directly. The default implementation
//! reports [`Shape::Struct`], which realizes as an escape hatch unless the
//! type overrides [`Reflect::to_value`]:
//!
//! ```ignore
//! #[derive(Clone)]
//! struct Celsius(f64);
//!
//! impl Reflect for Celsius {
//!     fn to_float(&self) -> Option<f64> {
//!         Some(self.0)
//!     }
//! }
//! ```

use crate::ty::Type;
use crate::value::{Arguments, Function, Value};
use chrono::{DateTime, FixedOffset, Utc};
use num_bigint::BigInt;
use regex::Regex;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::sync::Arc;
use std::time::SystemTime;

/// Structural classification of a native value
pub enum Shape<'a> {
    /// Scalar without further structure
    Primitive,
    /// Ordered sequence of elements
    Sequence(Box<dyn Iterator<Item = &'a dyn Reflect> + 'a>),
    /// Key/value pairs
    Mapping(Box<dyn Iterator<Item = (&'a dyn Reflect, &'a dyn Reflect)> + 'a>),
    /// Reference to another value; `None` when nil
    Pointer(Option<&'a dyn Reflect>),
    /// Type-erased holder of another value
    Interface(&'a dyn Reflect),
    /// Callable
    Function(Function),
    /// Record without a known decomposition
    Struct,
}

impl Shape<'_> {
    /// Short name of the shape
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Primitive => "primitive",
            Shape::Sequence(_) => "sequence",
            Shape::Mapping(_) => "mapping",
            Shape::Pointer(_) => "pointer",
            Shape::Interface(_) => "interface",
            Shape::Function(_) => "function",
            Shape::Struct => "struct",
        }
    }
}

/// Operations every [`Reflect`] type gets from its `Clone` implementation
pub trait NativeObject {
    /// Boxed copy of this value
    fn clone_native(&self) -> Box<dyn Reflect>;

    /// Copy this value into `dest` if `dest` has the same type
    fn assign_native(&self, dest: &mut dyn Any) -> bool;

    /// Rust type name of this value
    fn native_type_name(&self) -> &'static str;
}

impl<T: Reflect + Clone> NativeObject for T {
    fn clone_native(&self) -> Box<dyn Reflect> {
        Box::new(self.clone())
    }

    fn assign_native(&self, dest: &mut dyn Any) -> bool {
        match dest.downcast_mut::<T>() {
            Some(slot) => {
                *slot = self.clone();
                true
            }
            None => false,
        }
    }

    fn native_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A native value the realization engine can observe
pub trait Reflect: Any + Send + Sync + NativeObject {
    /// Structural shape of this value
    fn shape(&self) -> Shape<'_> {
        Shape::Struct
    }

    /// Lossless integral representation, for integer-like types
    fn to_integer(&self) -> Option<i64> {
        None
    }

    /// Floating point representation, for float-like types
    fn to_float(&self) -> Option<f64> {
        None
    }

    /// Self-realization capability
    ///
    /// Consulted after the structural shape has been found to be neither a
    /// sequence, mapping, interface, nil pointer nor function.
    fn to_value(&self, _frozen: bool) -> Option<Value> {
        None
    }
}

impl Clone for Box<dyn Reflect> {
    fn clone(&self) -> Self {
        (**self).clone_native()
    }
}

macro_rules! reflect_primitive {
    ($($t:ty),* $(,)?) => {
        $(
            impl Reflect for $t {
                fn shape(&self) -> Shape<'_> {
                    Shape::Primitive
                }
            }
        )*
    };
}

reflect_primitive!(
    (),
    bool,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    char,
    String,
    &'static str,
    Value,
    Type,
    Arguments,
    Regex,
    DateTime<Utc>,
    DateTime<FixedOffset>,
    SystemTime,
    serde_json::Number,
    serde_json::Value,
    BigInt,
    Arc<dyn std::error::Error + Send + Sync>,
);

impl Reflect for Function {
    fn shape(&self) -> Shape<'_> {
        Shape::Function(self.clone())
    }
}

impl<T: Reflect + Clone> Reflect for Vec<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Sequence(Box::new(self.iter().map(|e| e as &dyn Reflect)))
    }
}

impl<T: Reflect + Clone, const N: usize> Reflect for [T; N] {
    fn shape(&self) -> Shape<'_> {
        Shape::Sequence(Box::new(self.iter().map(|e| e as &dyn Reflect)))
    }
}

impl<K, V, S> Reflect for HashMap<K, V, S>
where
    K: Reflect + Clone,
    V: Reflect + Clone,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    fn shape(&self) -> Shape<'_> {
        Shape::Mapping(Box::new(
            self.iter().map(|(k, v)| (k as &dyn Reflect, v as &dyn Reflect)),
        ))
    }
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: Reflect + Clone,
    V: Reflect + Clone,
{
    fn shape(&self) -> Shape<'_> {
        Shape::Mapping(Box::new(
            self.iter().map(|(k, v)| (k as &dyn Reflect, v as &dyn Reflect)),
        ))
    }
}

impl<T: Reflect + Clone> Reflect for Option<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Pointer(self.as_ref().map(|v| v as &dyn Reflect))
    }
}

impl<T: Reflect + Clone> Reflect for Box<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Pointer(Some(&**self))
    }
}

impl<T: Reflect> Reflect for Arc<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Pointer(Some(&**self))
    }
}

impl Reflect for Box<dyn Reflect> {
    fn shape(&self) -> Shape<'_> {
        Shape::Interface(&**self)
    }
}
