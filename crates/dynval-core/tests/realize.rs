//! Integration tests for value realization

use chrono::{DateTime, TimeZone, Utc};
use dynval_core::{
    frozen_value, value, Function, Map, RealizeOptions, Realizer, Reflect, Registry, Shape, Type,
    Value,
};
use num_bigint::BigInt;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Record {
    name: String,
}

impl Reflect for Record {}

#[derive(Clone)]
struct Meters(i64);

impl Reflect for Meters {
    fn to_integer(&self) -> Option<i64> {
        Some(self.0)
    }

    fn to_value(&self, _frozen: bool) -> Option<Value> {
        Some(Value::from(format!("{}m", self.0)))
    }
}

#[derive(Clone)]
struct Label(String);

impl Reflect for Label {
    fn to_value(&self, _frozen: bool) -> Option<Value> {
        Some(Value::string(self.0.as_str()))
    }
}

#[derive(Clone)]
struct Pair(i32, String);

impl Reflect for Pair {
    fn shape(&self) -> Shape<'_> {
        Shape::Sequence(Box::new(
            [&self.0 as &dyn Reflect, &self.1 as &dyn Reflect].into_iter(),
        ))
    }
}

#[test]
fn test_realized_value_is_identity() {
    let v = Value::strings(["a", "b"]);
    let again = value(&v);
    assert_eq!(again, v);
    match (&v, &again) {
        (Value::Array(a), Value::Array(b)) => assert!(a.ptr_eq(b)),
        _ => panic!("expected arrays"),
    }
}

#[test]
fn test_equal_scalars() {
    assert_eq!(value(&3i64), value(&3i64));
    assert_eq!(value(&3i64), Value::Int(3));
    assert_eq!(value(&3u16), Value::Int(3));
    assert_eq!(value(&2.5f64), Value::Float(2.5));
    assert_eq!(value(&String::from("s")), Value::from("s"));
}

#[test]
fn test_nil_pointers_realize_to_nil() {
    let a: Option<Record> = None;
    let b: Option<i64> = None;
    let c: Option<Vec<String>> = None;
    let d: Option<Box<Record>> = None;
    assert_eq!(value(&a), Value::Nil);
    assert_eq!(value(&b), Value::Nil);
    assert_eq!(value(&c), Value::Nil);
    assert_eq!(value(&d), Value::Nil);
    assert_eq!(value(&()), Value::Nil);
}

#[test]
fn test_struct_is_escape_hatch() {
    let record = Record {
        name: "r".to_string(),
    };
    let v = value(&record);
    assert!(v.is_escape_hatch());
    match &v {
        Value::Native(n) => {
            assert_eq!(n.downcast_ref::<Record>().map(|r| r.name.as_str()), Some("r"));
        }
        other => panic!("unexpected {:?}", other),
    }
    // identity equality only
    assert_eq!(v, v.clone());
    assert_ne!(v, value(&record));
}

#[test]
fn test_struct_pointer_wraps_pointer() {
    let v = value(&Some(Record {
        name: "p".to_string(),
    }));
    match v {
        Value::Native(n) => assert!(n.downcast_ref::<Option<Record>>().is_some()),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_pointer_to_self_realizing_struct() {
    let v = value(&Box::new(Label("x".to_string())));
    assert_eq!(v, Value::from("x"));
}

#[test]
fn test_integer_coercion_precedes_self_realization() {
    assert_eq!(value(&Meters(7)), Value::Int(7));
    assert_eq!(value(&Label("l".to_string())), Value::from("l"));
}

#[test]
fn test_custom_sequence_shape() {
    let v = value(&Pair(1, "one".to_string()));
    assert_eq!(v, Value::array(vec![Value::Int(1), Value::from("one")]));
}

#[test]
fn test_collections() {
    let mut hm = HashMap::new();
    hm.insert("a".to_string(), vec![1u32, 2]);
    let v = value(&hm);
    let map = v.as_map().unwrap();
    assert_eq!(
        map.get_str("a"),
        Some(&Value::array(vec![Value::Int(1), Value::Int(2)]))
    );

    let mut bt = BTreeMap::new();
    bt.insert(1i64, true);
    let expected = Map::from_entries(vec![(Value::Int(1), Value::Bool(true))], false);
    assert_eq!(value(&bt), Value::Map(expected));

    assert_eq!(value(&[1.5f32, 2.0]), Value::array(vec![Value::Float(1.5), Value::Float(2.0)]));
}

#[test]
fn test_bytes_are_binary() {
    match value(&vec![1u8, 2, 3]) {
        Value::Binary(b) => assert_eq!(b.as_bytes(), &[1, 2, 3]),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_unsigned_canonicalization() {
    assert_eq!(value(&5u64), Value::Int(5));
    assert_eq!(value(&u64::MAX), Value::Uint(u64::MAX));
    assert_eq!(value(&(u64::MAX as u128)), Value::Uint(u64::MAX));
}

#[test]
fn test_well_known_types() {
    let re = Regex::new("a|b").unwrap();
    assert_eq!(value(&re).type_of(), Type::Regexp);

    let t: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(value(&t), Value::Time(t));
    assert_eq!(value(&std::time::SystemTime::from(t)), Value::Time(t));
    assert_eq!(value(&t.fixed_offset()), Value::Time(t));
}

#[test]
fn test_functions_and_types() {
    let f = Function::new("double", |args| {
        Ok(Value::Int(args.get(0).and_then(Value::as_i64).unwrap_or(0) * 2))
    });
    let v = value(&f);
    assert_eq!(v, Value::Function(f.clone()));
    assert_eq!(value(&Type::Integer), Value::from_type(Type::Integer));
}

#[test]
fn test_foreign_error() {
    let err: Arc<dyn std::error::Error + Send + Sync> =
        Arc::new(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
    let v = value(&err);
    assert_eq!(v.type_of(), Type::Error);
    assert_eq!(v.to_string(), "boom");
}

#[test]
fn test_frozen_intent_is_deep() {
    let nested = vec![vec!["a".to_string()], vec![]];
    let frozen = frozen_value(&nested);
    assert!(frozen.is_frozen());
    let Value::Array(outer) = &frozen else {
        panic!("expected array");
    };
    assert!(outer.iter().all(Value::is_frozen));
    assert!(!value(&nested).is_frozen());
}

#[test]
fn test_frozen_array_rejects_mutation() {
    let Value::Array(mut items) = frozen_value(&vec![1i32]) else {
        panic!("expected array");
    };
    assert!(items.push(Value::Int(2)).is_err());
}

#[test]
fn test_frozen_intent_reaches_realized_elements() {
    let inner = Value::array(vec![Value::Int(1)]);
    let frozen = frozen_value(&vec![inner.clone()]);
    let Value::Array(outer) = &frozen else {
        panic!("expected array");
    };
    assert!(outer.iter().all(Value::is_frozen));
    assert!(!inner.is_frozen());

    let mut keyed = HashMap::new();
    keyed.insert("k".to_string(), inner);
    let frozen = frozen_value(&keyed);
    assert!(frozen.as_map().unwrap().get_str("k").unwrap().is_frozen());
}

#[test]
fn test_large_map() {
    let native: HashMap<String, i64> = (0..50_000).map(|i| (format!("k{i}"), i)).collect();
    let v = value(&native);
    let map = v.as_map().unwrap();
    assert_eq!(map.len(), 50_000);
    assert_eq!(map.get_str("k49999"), Some(&Value::Int(49_999)));
    assert_eq!(map.get_str("missing"), None);
    assert_eq!(v, v.freeze());
}

#[test]
fn test_big_integers() {
    assert!(matches!(value(&i128::MAX), Value::BigInt(_)));
    assert_eq!(value(&i128::MAX).type_of().generic(), Type::Integer);
    assert_eq!(value(&(-5i128)), Value::Int(-5));
    let big = BigInt::from(u128::MAX) * 3u8;
    assert_eq!(value(&big), Value::big_int(big.clone()));
    assert_eq!(value(&BigInt::from(9)), Value::Int(9));
}

#[test]
fn test_empty_registry_falls_back_to_escape_hatch() {
    let realizer = Realizer::with_options(RealizeOptions {
        frozen: false,
        registry: Arc::new(Registry::new()),
    });
    let re = Regex::new("x").unwrap();
    assert!(realizer.realize(&re).is_escape_hatch());
}

#[test]
fn test_json_input() {
    let doc: serde_json::Value =
        serde_json::from_str(r#"{"n": 18446744073709551615, "f": 1.25, "s": ["x"]}"#).unwrap();
    let v = value(&doc);
    let map = v.as_map().unwrap();
    assert_eq!(map.get_str("n"), Some(&Value::Uint(u64::MAX)));
    assert_eq!(map.get_str("f"), Some(&Value::Float(1.25)));
    assert_eq!(map.get_str("s"), Some(&Value::strings(["x"])));
}
