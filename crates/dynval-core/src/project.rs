//! Projection of values onto native destinations
//!
//! The reverse of realization. A [`Slot`] names a native destination;
//! [`reflect_to`] stores a [`Value`] into it, converting to the destination's
//! native type where the value knows how to.

use crate::value::Value;
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use data_encoding::BASE64;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use regex::Regex;
use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

enum SlotTarget<'a> {
    Mut(&'a mut dyn Any),
    Ref(&'a dyn Any),
}

/// A native projection destination
pub struct Slot<'a> {
    target: SlotTarget<'a>,
    type_name: &'static str,
}

impl<'a> Slot<'a> {
    /// Writable destination
    pub fn of<T: Any>(dest: &'a mut T) -> Self {
        Self {
            target: SlotTarget::Mut(dest),
            type_name: type_name::<T>(),
        }
    }

    /// Read-only destination; projecting into it always fails
    pub fn read_only<T: Any>(dest: &'a T) -> Self {
        Self {
            target: SlotTarget::Ref(dest),
            type_name: type_name::<T>(),
        }
    }

    /// Native type name of the destination
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check if the destination can be written to
    pub fn is_addressable(&self) -> bool {
        matches!(self.target, SlotTarget::Mut(_))
    }

    /// Check if the destination is of type `T`
    pub fn is<T: Any>(&self) -> bool {
        match &self.target {
            SlotTarget::Mut(d) => d.is::<T>(),
            SlotTarget::Ref(d) => d.is::<T>(),
        }
    }
}

/// Store `value` into the destination named by `slot`
///
/// A destination that cannot hold a [`Value`] directly receives the value's
/// own native projection. Fails with [`Error::NotAddressable`] for read-only
/// slots and [`Error::Incompatible`] when no conversion applies.
#[tracing::instrument(level = "trace", skip_all, fields(target = slot.type_name))]
pub fn reflect_to(value: &Value, slot: Slot<'_>) -> Result<()> {
    let target = slot.type_name;
    let dest = match slot.target {
        SlotTarget::Mut(dest) => dest,
        SlotTarget::Ref(_) => return Err(Error::NotAddressable { target }),
    };
    let assigned = if !dest.is::<Value>() && value.can_project() {
        value.project_into(dest)
    } else {
        match dest.downcast_mut::<Value>() {
            Some(slot) => {
                *slot = value.clone();
                true
            }
            None => false,
        }
    };
    if assigned {
        Ok(())
    } else {
        Err(Error::Incompatible {
            value: value.literal().to_string(),
            target,
        })
    }
}

/// Store `value` into `dest`
pub fn from_value<T: Any>(value: &Value, dest: &mut T) -> Result<()> {
    reflect_to(value, Slot::of(dest))
}

macro_rules! project {
    ($dest:ident, $t:ty, $convert:expr) => {
        if let Some(slot) = $dest.downcast_mut::<$t>() {
            let converted: Option<$t> = $convert;
            return match converted {
                Some(v) => {
                    *slot = v;
                    true
                }
                None => false,
            };
        }
    };
}

macro_rules! project_integers {
    ($self:ident, $dest:ident, $($t:ty),*) => {
        $(
            project!($dest, $t, match $self {
                Value::Int(i) => <$t>::try_from(*i).ok(),
                Value::Uint(u) => <$t>::try_from(*u).ok(),
                Value::BigInt(b) => <$t>::try_from(&**b).ok(),
                _ => None,
            });
        )*
    };
}

impl Value {
    /// Check if this value can convert itself onto native destinations
    pub fn can_project(&self) -> bool {
        !matches!(
            self,
            Value::Function(_) | Value::Type(_) | Value::Error(_) | Value::Arguments(_)
        )
    }

    fn project_into(&self, dest: &mut dyn Any) -> bool {
        project!(dest, Option<Value>, Some((!self.is_nil()).then(|| self.clone())));
        project!(dest, bool, self.as_bool());
        project!(dest, String, self.as_str().map(str::to_string));
        project_integers!(
            self, dest, i64, i32, i16, i8, isize, i128, u64, u32, u16, u8, usize, u128
        );
        project!(dest, BigInt, match self {
            Value::Int(i) => Some(BigInt::from(*i)),
            Value::Uint(u) => Some(BigInt::from(*u)),
            Value::BigInt(b) => Some(BigInt::clone(b)),
            _ => None,
        });
        project!(dest, f64, self.to_f64());
        project!(dest, f32, self.to_f64().map(|f| f as f32));
        project!(dest, Vec<u8>, match self {
            Value::Binary(b) => Some(b.as_bytes().to_vec()),
            _ => None,
        });
        project!(dest, Vec<Value>, self.as_array().map(|a| a.as_slice().to_vec()));
        project!(dest, Vec<String>, self.as_array().and_then(|a| {
            a.iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect()
        }));
        project!(dest, Vec<i64>, self.as_array().and_then(|a| {
            a.iter().map(Value::as_i64).collect()
        }));
        project!(dest, Vec<f64>, self.as_array().and_then(|a| {
            a.iter().map(Value::to_f64).collect()
        }));
        project!(dest, HashMap<String, Value>, self.string_entries().map(|e| e.collect()));
        project!(dest, BTreeMap<String, Value>, self.string_entries().map(|e| e.collect()));
        project!(dest, Regex, match self {
            Value::Regexp(r) => Some(Regex::clone(r)),
            _ => None,
        });
        project!(dest, DateTime<Utc>, match self {
            Value::Time(t) => Some(*t),
            _ => None,
        });
        project!(dest, SystemTime, match self {
            Value::Time(t) => Some(SystemTime::from(*t)),
            _ => None,
        });
        project!(dest, serde_json::Value, self.to_json());
        match self {
            Value::Native(n) => n.reflect().assign_native(dest),
            _ => false,
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Uint(u) => Some(*u as f64),
            Value::BigInt(b) => b.to_f64(),
            _ => None,
        }
    }

    /// Entries of a map whose keys are all strings
    fn string_entries(&self) -> Option<impl Iterator<Item = (String, Value)> + '_> {
        let map = self.as_map()?;
        if map.keys().any(|k| k.as_str().is_none()) {
            return None;
        }
        Some(
            map.iter()
                .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.clone()))),
        )
    }

    fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value as Json;
        Some(match self {
            Value::Nil => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Uint(u) => Json::from(*u),
            Value::Float(f) => Json::Number(serde_json::Number::from_f64(*f)?),
            Value::String(s) => Json::String(s.to_string()),
            Value::Binary(b) => Json::String(BASE64.encode(b.as_bytes())),
            Value::Time(t) => Json::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Regexp(r) => Json::String(r.as_str().to_string()),
            Value::Array(a) => Json::Array(a.iter().map(Value::to_json).collect::<Option<_>>()?),
            Value::Map(m) => {
                let mut object = serde_json::Map::new();
                for (k, v) in m.iter() {
                    object.insert(k.as_str()?.to_string(), v.to_json()?);
                }
                Json::Object(object)
            }
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Function, Native};

    #[test]
    fn test_read_only_slot() {
        let dest = 0i64;
        let err = reflect_to(&Value::Int(1), Slot::read_only(&dest)).unwrap_err();
        assert!(matches!(err, Error::NotAddressable { .. }));
    }

    #[test]
    fn test_value_destination_receives_value() {
        let mut dest = Value::Nil;
        from_value(&Value::from("x"), &mut dest).unwrap();
        assert_eq!(dest, Value::from("x"));
    }

    #[test]
    fn test_integer_range_checked() {
        let mut small = 0u8;
        from_value(&Value::Int(200), &mut small).unwrap();
        assert_eq!(small, 200);
        assert!(from_value(&Value::Int(300), &mut small).is_err());
        assert!(from_value(&Value::Int(-1), &mut small).is_err());
    }

    #[test]
    fn test_function_needs_value_destination() {
        let f = Value::Function(Function::new("f", |_| Ok(Value::Nil)));
        let mut s = String::new();
        assert!(matches!(
            from_value(&f, &mut s),
            Err(Error::Incompatible { .. })
        ));
        let mut v = Value::Nil;
        from_value(&f, &mut v).unwrap();
        assert_eq!(v, f);
    }

    #[test]
    fn test_big_integer_projection() {
        let big = Value::big_int(BigInt::from(i128::MAX));
        let mut wide = 0i128;
        from_value(&big, &mut wide).unwrap();
        assert_eq!(wide, i128::MAX);
        let mut narrow = 0i64;
        assert!(from_value(&big, &mut narrow).is_err());
        let mut dest = BigInt::from(0);
        from_value(&Value::Int(-3), &mut dest).unwrap();
        assert_eq!(dest, BigInt::from(-3));
    }

    #[test]
    fn test_optional_value() {
        let mut dest = Some(Value::Int(1));
        from_value(&Value::Nil, &mut dest).unwrap();
        assert_eq!(dest, None);
    }

    #[test]
    fn test_native_projection() {
        #[derive(Clone, Debug, PartialEq)]
        struct Point(i32, i32);
        impl crate::Reflect for Point {}

        let v = Value::Native(Native::new(Point(1, 2)));
        let mut dest = Point(0, 0);
        from_value(&v, &mut dest).unwrap();
        assert_eq!(dest, Point(1, 2));
    }

    #[test]
    fn test_json_projection() {
        let v = Value::Map(crate::Map::from_entries(
            vec![(Value::from("a"), Value::array(vec![Value::Int(1), Value::Nil]))],
            false,
        ));
        let mut dest = serde_json::Value::Null;
        from_value(&v, &mut dest).unwrap();
        assert_eq!(dest, serde_json::json!({"a": [1, null]}));
    }
}
