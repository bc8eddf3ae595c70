//! Value realization engine
//!
//! Turns any native value into a [`Value`]. The dispatch runs in a fixed
//! order and the first stage that produces a value wins:
//!
//! 1. Identity: a native that already is a [`Value`] is returned as is.
//! 2. Exact-shape fast paths for common primitives and core aggregates,
//!    including the well-known types of the [`Registry`].
//! 3. Numeric coercion: lossless integral first, then floating point.
//!    Integers beyond the 64-bit ranges become [`Value::BigInt`].
//! 4. Structural decomposition by [`Shape`]: sequences, mappings, interfaces,
//!    nil pointers and functions, then the native's own
//!    [`Reflect::to_value`], then non-nil pointers.
//! 5. The [`Value::Native`] escape hatch.
//!
//! Realization never fails. With the frozen intent every container produced
//! is frozen, recursively, including nested values that already were
//! [`Value`]s. A top-level [`Value`] is still returned as is.

use crate::reflect::{Reflect, Shape};
use crate::registry::Registry;
use crate::ty::Type;
use crate::value::{Arguments, Array, Binary, ErrorValue, Function, Map, Native, Value};
use num_bigint::BigInt;
use std::any::Any;
use std::sync::Arc;

/// Realization options
#[derive(Debug, Clone)]
pub struct RealizeOptions {
    /// Produce deeply frozen containers
    pub frozen: bool,

    /// Well-known native types (shared, immutable)
    pub registry: Arc<Registry>,
}

impl Default for RealizeOptions {
    fn default() -> Self {
        Self {
            frozen: false,
            registry: Registry::standard(),
        }
    }
}

/// Realizes native values into [`Value`]s
#[derive(Debug, Clone, Default)]
pub struct Realizer {
    options: RealizeOptions,
}

type Matcher = fn(&Realizer, &dyn Any) -> Option<Value>;

/// Exact-shape fast paths, tried in order
const FAST_PATHS: &[Matcher] = &[
    match_unit,
    match_string,
    match_static_str,
    match_i64,
    match_bool,
    match_bytes,
    match_strings,
    match_integers,
    match_well_known,
    match_u64,
    match_usize,
    match_char,
    match_error,
    match_json_number,
    match_json_value,
    match_type,
    match_function,
    match_arguments,
    match_big_int,
];

impl Realizer {
    /// Realizer using the standard registry, without freezing
    pub fn new() -> Self {
        Self::default()
    }

    /// Realizer using the standard registry, freezing everything it builds
    pub fn frozen() -> Self {
        Self::with_options(RealizeOptions {
            frozen: true,
            ..RealizeOptions::default()
        })
    }

    /// Realizer with explicit options
    pub fn with_options(options: RealizeOptions) -> Self {
        Self { options }
    }

    /// The options in use
    pub fn options(&self) -> &RealizeOptions {
        &self.options
    }

    /// Check if containers are frozen
    pub fn is_frozen(&self) -> bool {
        self.options.frozen
    }

    /// Realize a native value
    pub fn realize(&self, native: &dyn Reflect) -> Value {
        let any: &dyn Any = native;
        if let Some(v) = any.downcast_ref::<Value>() {
            return v.clone();
        }
        if let Some(v) = FAST_PATHS.iter().find_map(|m| m(self, any)) {
            return v;
        }
        tracing::trace!(native_type = native.native_type_name(), "no fast path");
        if let Some(v) = coerce_numeric(native) {
            return v;
        }
        self.decompose(native)
    }

    fn decompose(&self, native: &dyn Reflect) -> Value {
        let frozen = self.options.frozen;
        match native.shape() {
            Shape::Sequence(items) => {
                Value::Array(Array::with_frozen(items.map(|e| self.nested(e)).collect(), frozen))
            }
            Shape::Mapping(entries) => Value::Map(Map::from_entries(
                entries
                    .map(|(k, v)| (self.nested(k), self.nested(v)))
                    .collect(),
                frozen,
            )),
            Shape::Interface(inner) => self.nested(inner),
            Shape::Pointer(None) => Value::Nil,
            Shape::Function(f) => Value::Function(f),
            shape => {
                if let Some(v) = native.to_value(frozen) {
                    return v;
                }
                match shape {
                    Shape::Pointer(Some(target)) => match target.shape() {
                        Shape::Struct => match target.to_value(frozen) {
                            Some(v) => v,
                            None => self.escape(native),
                        },
                        _ => self.nested(target),
                    },
                    _ => self.escape(native),
                }
            }
        }
    }

    /// Realize a value reached through decomposition
    fn nested(&self, native: &dyn Reflect) -> Value {
        let any: &dyn Any = native;
        match any.downcast_ref::<Value>() {
            Some(v) if self.options.frozen => v.freeze(),
            _ => self.realize(native),
        }
    }

    fn escape(&self, native: &dyn Reflect) -> Value {
        tracing::debug!(
            native_type = native.native_type_name(),
            "no canonical form, wrapping as native escape hatch"
        );
        Value::Native(Native::from_boxed(native.clone_native()))
    }

    fn sequence<T, F>(&self, items: &[T], f: F) -> Value
    where
        F: Fn(&T) -> Value,
    {
        Value::Array(Array::with_frozen(
            items.iter().map(f).collect(),
            self.options.frozen,
        ))
    }
}

// ============================================================================
// Fast paths
// ============================================================================

fn match_unit(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native.downcast_ref::<()>().map(|_| Value::Nil)
}

fn match_string(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native
        .downcast_ref::<String>()
        .map(|s| Value::string(s.as_str()))
}

fn match_static_str(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native.downcast_ref::<&'static str>().map(|s| Value::string(*s))
}

fn match_i64(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native.downcast_ref::<i64>().map(|i| Value::Int(*i))
}

fn match_bool(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native.downcast_ref::<bool>().map(|b| Value::Bool(*b))
}

fn match_bytes(r: &Realizer, native: &dyn Any) -> Option<Value> {
    native
        .downcast_ref::<Vec<u8>>()
        .map(|b| Value::Binary(Binary::new(b.clone(), r.options.frozen)))
}

fn match_strings(r: &Realizer, native: &dyn Any) -> Option<Value> {
    native
        .downcast_ref::<Vec<String>>()
        .map(|v| r.sequence(v, |s| Value::string(s.as_str())))
}

fn match_integers(r: &Realizer, native: &dyn Any) -> Option<Value> {
    native
        .downcast_ref::<Vec<i64>>()
        .map(|v| r.sequence(v, |i| Value::Int(*i)))
}

fn match_well_known(r: &Realizer, native: &dyn Any) -> Option<Value> {
    r.options.registry.canonicalize(native)
}

fn match_u64(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native.downcast_ref::<u64>().map(|u| Value::uint(*u))
}

fn match_usize(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native.downcast_ref::<usize>().map(|u| Value::uint(*u as u64))
}

fn match_char(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native
        .downcast_ref::<char>()
        .map(|c| Value::string(c.to_string()))
}

fn match_error(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native
        .downcast_ref::<Arc<dyn std::error::Error + Send + Sync>>()
        .map(|e| Value::Error(ErrorValue::Foreign(Arc::clone(e))))
}

fn match_json_number(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native.downcast_ref::<serde_json::Number>().map(json_number)
}

fn match_json_value(r: &Realizer, native: &dyn Any) -> Option<Value> {
    native.downcast_ref::<serde_json::Value>().map(|v| r.json(v))
}

fn match_type(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native
        .downcast_ref::<Type>()
        .map(|t| Value::from_type(t.clone()))
}

fn match_function(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native
        .downcast_ref::<Function>()
        .map(|f| Value::Function(f.clone()))
}

fn match_arguments(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native
        .downcast_ref::<Arguments>()
        .map(|a| Value::Arguments(a.clone()))
}

fn match_big_int(_: &Realizer, native: &dyn Any) -> Option<Value> {
    native
        .downcast_ref::<BigInt>()
        .map(|b| Value::big_int(b.clone()))
}

/// Integer if representable as `i64`, else unsigned, else float
fn json_number(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Int(i)
    } else if let Some(u) = n.as_u64() {
        Value::uint(u)
    } else {
        n.as_f64().map_or(Value::Nil, Value::Float)
    }
}

impl Realizer {
    fn json(&self, v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => json_number(n),
            serde_json::Value::String(s) => Value::string(s.as_str()),
            serde_json::Value::Array(items) => self.sequence(items, |e| self.json(e)),
            serde_json::Value::Object(fields) => Value::Map(Map::from_entries(
                fields
                    .iter()
                    .map(|(k, v)| (Value::string(k.as_str()), self.json(v)))
                    .collect(),
                self.options.frozen,
            )),
        }
    }
}

// ============================================================================
// Numeric coercion
// ============================================================================

macro_rules! try_integral {
    ($native:expr, $($t:ty),*) => {
        $(
            if let Some(v) = $native.downcast_ref::<$t>() {
                return Some(Value::Int(i64::from(*v)));
            }
        )*
    };
}

fn to_integral(native: &dyn Any) -> Option<Value> {
    try_integral!(native, i8, i16, i32, u8, u16, u32);
    if let Some(v) = native.downcast_ref::<isize>() {
        return Some(Value::Int(*v as i64));
    }
    if let Some(v) = native.downcast_ref::<i128>() {
        return Some(Value::big_int(BigInt::from(*v)));
    }
    if let Some(v) = native.downcast_ref::<u128>() {
        return Some(Value::big_int(BigInt::from(*v)));
    }
    None
}

fn to_floating(native: &dyn Any) -> Option<f64> {
    if let Some(v) = native.downcast_ref::<f64>() {
        return Some(*v);
    }
    native.downcast_ref::<f32>().map(|v| f64::from(*v))
}

fn coerce_numeric(native: &dyn Reflect) -> Option<Value> {
    let any: &dyn Any = native;
    to_integral(any)
        .or_else(|| native.to_integer().map(Value::Int))
        .or_else(|| to_floating(any).or_else(|| native.to_float()).map(Value::Float))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Opaque {
        _id: u32,
    }

    impl Reflect for Opaque {}

    #[test]
    fn test_identity_fast_path() {
        let original = Value::strings(["a", "b"]);
        let realized = Realizer::new().realize(&original);
        match (&original, &realized) {
            (Value::Array(a), Value::Array(b)) => assert!(a.ptr_eq(b)),
            _ => panic!("expected arrays"),
        }
    }

    #[test]
    fn test_primitives() {
        let r = Realizer::new();
        assert_eq!(r.realize(&3i64), Value::Int(3));
        assert_eq!(r.realize(&3i8), Value::Int(3));
        assert_eq!(r.realize(&3u32), Value::Int(3));
        assert_eq!(r.realize(&u64::MAX), Value::Uint(u64::MAX));
        assert_eq!(r.realize(&1.5f32), Value::Float(1.5));
        assert_eq!(r.realize(&true), Value::Bool(true));
        assert_eq!(r.realize(&"hi"), Value::from("hi"));
        assert_eq!(r.realize(&'x'), Value::from("x"));
        assert_eq!(r.realize(&()), Value::Nil);
    }

    #[test]
    fn test_out_of_range_i128_is_big_int() {
        let v = Realizer::new().realize(&i128::MAX);
        assert_eq!(v, Value::big_int(BigInt::from(i128::MAX)));
        assert!(matches!(v, Value::BigInt(_)));
        assert_eq!(v.to_string(), i128::MAX.to_string());
        assert_eq!(Realizer::new().realize(&-5i128), Value::Int(-5));
        assert_eq!(Realizer::new().realize(&u128::from(u64::MAX)), Value::Uint(u64::MAX));
    }

    #[test]
    fn test_big_int_native() {
        let big: BigInt = "123456789012345678901234567890".parse().unwrap();
        let v = Realizer::new().realize(&big);
        assert_eq!(v.to_string(), "123456789012345678901234567890");
        assert_eq!(v.type_of().generic(), Type::Integer);
        assert_eq!(Realizer::new().realize(&BigInt::from(7)), Value::Int(7));
    }

    #[test]
    fn test_frozen_reaches_realized_elements() {
        let nested = vec![Value::array(vec![Value::Int(1)])];
        let v = Realizer::frozen().realize(&nested);
        assert!(v.is_frozen());
        assert_eq!(v, Realizer::new().realize(&nested));

        let boxed: Option<Value> = Some(Value::array(vec![]));
        assert!(Realizer::frozen().realize(&boxed).is_frozen());

        let top = Value::array(vec![]);
        assert!(!Realizer::frozen().realize(&top).is_frozen());
    }

    #[test]
    fn test_frozen_propagates() {
        let nested = vec![vec![1i32, 2], vec![3]];
        let frozen = Realizer::frozen().realize(&nested);
        assert!(frozen.is_frozen());
        let thawed = Realizer::new().realize(&nested);
        assert!(!thawed.is_frozen());
        assert_eq!(frozen, thawed);
    }

    #[test]
    fn test_struct_pointer_is_escape_hatch() {
        let v = Realizer::new().realize(&Box::new(Opaque { _id: 1 }));
        match v {
            Value::Native(n) => assert!(n.downcast_ref::<Box<Opaque>>().is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_pointer_to_primitive_is_dereferenced() {
        let v = Realizer::new().realize(&Box::new(Some(Arc::new(7i32))));
        assert_eq!(v, Value::Int(7));
    }

    #[test]
    fn test_json_document() {
        let doc = serde_json::json!({"a": [1, 2.5, "x", null], "b": true});
        let v = Realizer::new().realize(&doc);
        let map = v.as_map().unwrap();
        assert_eq!(map.get_str("b"), Some(&Value::Bool(true)));
        assert_eq!(
            map.get_str("a"),
            Some(&Value::array(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::from("x"),
                Value::Nil
            ]))
        );
    }

    #[test]
    fn test_custom_registry() {
        let registry = Registry::builder()
            .register::<Opaque>("Opaque", Type::Integer, |n| {
                n.downcast_ref::<Opaque>().map(|o| Value::Int(i64::from(o._id)))
            })
            .build();
        let r = Realizer::with_options(RealizeOptions {
            frozen: false,
            registry: Arc::new(registry),
        });
        assert_eq!(r.realize(&Opaque { _id: 4 }), Value::Int(4));
    }
}
