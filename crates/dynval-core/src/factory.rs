//! Construction protocol
//!
//! [`new_value`] creates an instance of a [`Type`] from an argument. Types
//! that supply a [`Factory`] fully control construction; every other type
//! only accepts arguments that already are instances of it.
//!
//! Builtin factories cover the scalar families and convert from the obvious
//! textual or numeric forms.

use crate::ty::Type;
use crate::value::{Binary, Value};
use crate::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use data_encoding::BASE64;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use regex::Regex;
use std::sync::Arc;

/// Construction strategy of a type
pub trait Factory: Send + Sync {
    /// Create an instance of `ty` from `argument`
    ///
    /// `argument` may be a positional [`Value::Arguments`] list.
    fn create(&self, ty: &Type, argument: Value) -> Result<Value>;
}

impl<F> Factory for F
where
    F: Fn(&Type, Value) -> Result<Value> + Send + Sync,
{
    fn create(&self, ty: &Type, argument: Value) -> Result<Value> {
        self(ty, argument)
    }
}

/// Create an instance of `ty` from `argument`
#[tracing::instrument(level = "trace", skip_all, fields(ty = %ty))]
pub fn new_value(ty: &Type, argument: Value) -> Result<Value> {
    if let Some(factory) = ty.factory() {
        return factory.create(ty, argument);
    }
    let argument = single_argument(ty, argument)?;
    if ty.instance(&argument) {
        Ok(argument)
    } else {
        Err(construct_error(ty, &argument))
    }
}

/// Unwrap a positional argument list of exactly one element
pub fn single_argument(ty: &Type, argument: Value) -> Result<Value> {
    match argument {
        Value::Arguments(args) if args.len() == 1 => {
            Ok(args.get(0).cloned().unwrap_or(Value::Nil))
        }
        Value::Arguments(args) => Err(Error::Arity {
            ty: ty.to_string(),
            arguments: Value::Arguments(args).to_string(),
        }),
        other => Ok(other),
    }
}

/// Error for an argument that cannot become an instance of `ty`
pub fn construct_error(ty: &Type, argument: &Value) -> Error {
    Error::Construct {
        ty: ty.to_string(),
        value: argument.literal().to_string(),
    }
}

fn checked(ty: &Type, value: Value) -> Result<Value> {
    if ty.instance(&value) {
        Ok(value)
    } else {
        Err(construct_error(ty, &value))
    }
}

// ============================================================================
// Builtin factories
// ============================================================================

/// Creates booleans from booleans, `"true"`/`"false"` and integers
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanFactory;

/// Creates integers from numbers, number tokens and booleans
///
/// Integer tokens beyond the 64-bit range become big integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerFactory;

/// Creates floats from numbers and number tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatFactory;

/// Creates strings from any value's plain rendering and from UTF-8 binaries
#[derive(Debug, Clone, Copy, Default)]
pub struct StringFactory;

/// Creates binaries from base64 strings and byte arrays
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFactory;

/// Creates regular expressions from pattern strings
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexpFactory;

/// Creates timestamps from RFC 3339 strings and unix seconds
///
/// Fractional seconds are rounded to the nearest nanosecond.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeFactory;

/// Factory of the `bool` type
pub static BOOLEAN: BooleanFactory = BooleanFactory;
/// Factory of the `int` type
pub static INTEGER: IntegerFactory = IntegerFactory;
/// Factory of the `float` type
pub static FLOAT: FloatFactory = FloatFactory;
/// Factory of `string` types
pub static STRING: StringFactory = StringFactory;
/// Factory of the `binary` type
pub static BINARY: BinaryFactory = BinaryFactory;
/// Factory of the `regexp` type
pub static REGEXP: RegexpFactory = RegexpFactory;
/// Factory of the `time` type
pub static TIME: TimeFactory = TimeFactory;

impl Factory for BooleanFactory {
    fn create(&self, ty: &Type, argument: Value) -> Result<Value> {
        let argument = single_argument(ty, argument)?;
        match &argument {
            Value::Bool(_) => Ok(argument.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            Value::Int(i) => Ok(Value::Bool(*i != 0)),
            Value::Uint(u) => Ok(Value::Bool(*u != 0)),
            _ => Err(construct_error(ty, &argument)),
        }
    }
}

impl Factory for IntegerFactory {
    fn create(&self, ty: &Type, argument: Value) -> Result<Value> {
        let argument = single_argument(ty, argument)?;
        let created = match &argument {
            Value::Int(_) | Value::Uint(_) | Value::BigInt(_) => Some(argument.clone()),
            Value::Bool(b) => Some(Value::Int(i64::from(*b))),
            Value::Float(f) => float_to_integer(*f),
            Value::String(s) => match Value::from_number_token(s.trim()) {
                Ok(Value::Float(f)) => match s.trim().parse::<BigInt>() {
                    Ok(b) => Some(Value::big_int(b)),
                    Err(_) => float_to_integer(f),
                },
                Ok(v) => Some(v),
                Err(_) => None,
            },
            Value::Time(t) => Some(Value::Int(t.timestamp())),
            _ => None,
        };
        created.ok_or_else(|| construct_error(ty, &argument))
    }
}

fn float_to_integer(f: f64) -> Option<Value> {
    let truncated = f.trunc();
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(Value::Int(truncated as i64))
    } else {
        None
    }
}

impl Factory for FloatFactory {
    fn create(&self, ty: &Type, argument: Value) -> Result<Value> {
        let argument = single_argument(ty, argument)?;
        let created = match &argument {
            Value::Float(_) => Some(argument.clone()),
            Value::Int(i) => Some(Value::Float(*i as f64)),
            Value::Uint(u) => Some(Value::Float(*u as f64)),
            Value::BigInt(b) => b.to_f64().map(Value::Float),
            Value::String(s) => s.trim().parse::<f64>().ok().map(Value::Float),
            _ => None,
        };
        created.ok_or_else(|| construct_error(ty, &argument))
    }
}

impl Factory for StringFactory {
    fn create(&self, ty: &Type, argument: Value) -> Result<Value> {
        let argument = single_argument(ty, argument)?;
        let created = match &argument {
            Value::String(_) => argument.clone(),
            Value::Binary(b) => match std::str::from_utf8(b.as_bytes()) {
                Ok(s) => Value::string(s),
                Err(_) => return Err(construct_error(ty, &argument)),
            },
            Value::Nil => return Err(construct_error(ty, &argument)),
            other => Value::string(other.to_string()),
        };
        checked(ty, created)
    }
}

impl Factory for BinaryFactory {
    fn create(&self, ty: &Type, argument: Value) -> Result<Value> {
        let argument = single_argument(ty, argument)?;
        let bytes = match &argument {
            Value::Binary(_) => return Ok(argument.clone()),
            Value::String(s) => BASE64.decode(s.as_bytes()).ok(),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_i64().and_then(|i| u8::try_from(i).ok()))
                .collect::<Option<Vec<u8>>>(),
            _ => None,
        };
        bytes
            .map(|b| Value::Binary(Binary::new(b, false)))
            .ok_or_else(|| construct_error(ty, &argument))
    }
}

impl Factory for RegexpFactory {
    fn create(&self, ty: &Type, argument: Value) -> Result<Value> {
        let argument = single_argument(ty, argument)?;
        match &argument {
            Value::Regexp(_) => Ok(argument.clone()),
            Value::String(s) => Regex::new(s)
                .map(|r| Value::Regexp(Arc::new(r)))
                .map_err(|_| construct_error(ty, &argument)),
            _ => Err(construct_error(ty, &argument)),
        }
    }
}

impl Factory for TimeFactory {
    fn create(&self, ty: &Type, argument: Value) -> Result<Value> {
        let argument = single_argument(ty, argument)?;
        let created = match &argument {
            Value::Time(_) => Some(argument.clone()),
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| Value::Time(t.with_timezone(&Utc))),
            Value::Int(secs) => DateTime::<Utc>::from_timestamp(*secs, 0).map(Value::Time),
            Value::Float(f) if f.is_finite() => {
                let secs = f.floor();
                let nanos = ((f - secs) * 1e9).round() as i64;
                DateTime::<Utc>::from_timestamp(secs as i64, 0)
                    .and_then(|t| t.checked_add_signed(TimeDelta::nanoseconds(nanos)))
                    .map(Value::Time)
            }
            _ => None,
        };
        created.ok_or_else(|| construct_error(ty, &argument))
    }
}
