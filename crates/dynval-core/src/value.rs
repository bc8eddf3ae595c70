//! Immutable runtime values
//!
//! [`Value`] is the universal representation of data handled by this crate.
//! Scalars are stored inline, everything else lives behind an `Arc`, so
//! cloning a value never copies its contents.
//!
//! Containers ([`Array`], [`Map`], [`Binary`]) carry a frozen flag. An
//! unfrozen container may be mutated through copy-on-write methods, which
//! never affect other holders of the same storage. A frozen container rejects
//! mutation with [`Error::Frozen`]. Equality ignores the flag.

use crate::reflect::Reflect;
use crate::ty::Type;
use crate::violation::Violation;
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use data_encoding::BASE64;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHasher};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::Arc;

/// Universal immutable value
#[derive(Debug, Clone)]
pub enum Value {
    /// The nil-equivalent value
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed 64-bit integer
    Int(i64),
    /// Unsigned 64-bit integer above `i64::MAX`; use [`Value::uint`] to build
    Uint(u64),
    /// Integer outside of the 64-bit ranges; use [`Value::big_int`] to build
    BigInt(Arc<BigInt>),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    String(Arc<str>),
    /// Byte string
    Binary(Binary),
    /// Ordered sequence
    Array(Array),
    /// Key/value mapping, insertion ordered
    Map(Map),
    /// Compiled regular expression
    Regexp(Arc<Regex>),
    /// Timestamp in UTC
    Time(DateTime<Utc>),
    /// Error value
    Error(ErrorValue),
    /// Callable value
    Function(Function),
    /// A type used as a value
    Type(Arc<Type>),
    /// Positional argument list
    Arguments(Arguments),
    /// Escape hatch for unrecognized native shapes
    ///
    /// Equality is identity only and immutability is not guaranteed.
    Native(Native),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// Create an integer value from an unsigned integer
    ///
    /// Values that fit in `i64` are always represented as [`Value::Int`].
    pub fn uint(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Uint(u),
        }
    }

    /// Create an integer value of arbitrary magnitude
    ///
    /// Values that fit in `i64` or `u64` use the 64-bit variants.
    pub fn big_int(b: BigInt) -> Self {
        if let Some(i) = b.to_i64() {
            Value::Int(i)
        } else if let Some(u) = b.to_u64() {
            Value::Uint(u)
        } else {
            Value::BigInt(Arc::new(b))
        }
    }

    /// Create an unfrozen array value
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Array::new(items))
    }

    /// Create an unfrozen array of strings
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Value::array(items.into_iter().map(Value::string).collect())
    }

    /// Create a value holding a type
    pub fn from_type(ty: Type) -> Self {
        Value::Type(Arc::new(ty))
    }

    /// Convert a textual number token
    ///
    /// Tries a signed 64-bit parse, then unsigned 64-bit when the signed
    /// parse overflows, then a 64-bit float. A token that is none of these is
    /// a fatal [`Error::MalformedNumber`].
    pub fn from_number_token(token: &str) -> Result<Value> {
        use std::num::IntErrorKind;

        match token.parse::<i64>() {
            Ok(i) => return Ok(Value::Int(i)),
            Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow) => {
                if let Ok(u) = token.parse::<u64>() {
                    return Ok(Value::uint(u));
                }
            }
            Err(_) => {}
        }
        token
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::MalformedNumber {
                token: token.to_string(),
            })
    }

    /// Check if this value is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if this value is the escape hatch wrapper
    pub fn is_escape_hatch(&self) -> bool {
        matches!(self, Value::Native(_))
    }

    /// Get the string contents if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer if this is an integer that fits in `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float if this is a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the boolean if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the array if this is an array
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get the map if this is a map
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short name of the value kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::Uint(_) | Value::BigInt(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Regexp(_) => "regexp",
            Value::Time(_) => "time",
            Value::Error(_) => "error",
            Value::Function(_) => "func",
            Value::Type(_) => "type",
            Value::Arguments(_) => "arguments",
            Value::Native(_) => "native",
        }
    }

    /// The type of this value
    ///
    /// Data values report their exact type; behavioural values report the
    /// type of their kind.
    pub fn type_of(&self) -> Type {
        match self {
            Value::Nil => Type::Nil,
            Value::Error(_) => Type::Error,
            Value::Function(_) => Type::Function,
            Value::Type(_) => Type::Meta,
            Value::Native(n) => Type::Native(n.type_name()),
            _ => Type::Exact(self.clone()),
        }
    }

    /// Check if this value and all values it contains are immutable
    pub fn is_frozen(&self) -> bool {
        match self {
            Value::Binary(b) => b.is_frozen(),
            Value::Array(a) => a.is_frozen() && a.iter().all(Value::is_frozen),
            Value::Map(m) => {
                m.is_frozen() && m.iter().all(|(k, v)| k.is_frozen() && v.is_frozen())
            }
            Value::Arguments(args) => args.iter().all(Value::is_frozen),
            Value::Native(_) => false,
            _ => true,
        }
    }

    /// Deeply frozen copy of this value
    ///
    /// Already frozen values are returned as is.
    pub fn freeze(&self) -> Value {
        if self.is_frozen() {
            return self.clone();
        }
        match self {
            Value::Binary(b) => Value::Binary(b.freeze()),
            Value::Array(a) => Value::Array(a.freeze()),
            Value::Map(m) => Value::Map(m.freeze()),
            Value::Arguments(args) => {
                Value::Arguments(Arguments::new(args.iter().map(Value::freeze).collect()))
            }
            other => other.clone(),
        }
    }

    /// Literal rendering, with strings double quoted
    pub fn literal(&self) -> Literal<'_> {
        Literal(self)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Int(a), Value::Uint(b)) | (Value::Uint(b), Value::Int(a)) => {
                u64::try_from(*a).map_or(false, |a| a == *b)
            }
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::BigInt(a), Value::Int(b)) | (Value::Int(b), Value::BigInt(a)) => {
                **a == BigInt::from(*b)
            }
            (Value::BigInt(a), Value::Uint(b)) | (Value::Uint(b), Value::BigInt(a)) => {
                **a == BigInt::from(*b)
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Regexp(a), Value::Regexp(b)) => a.as_str() == b.as_str(),
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Arguments(a), Value::Arguments(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => a == b,
            _ => false,
        }
    }
}

/// NaN floats are never equal, so NaN map keys never collide
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            // integers hash by magnitude so that Int, Uint and BigInt agree
            Value::Int(i) => i128::from(*i).hash(state),
            Value::Uint(u) => i128::from(*u).hash(state),
            Value::BigInt(b) => match b.to_i128() {
                Some(i) => i.hash(state),
                None => b.hash(state),
            },
            Value::Nil => 0u8.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Float(x) => {
                let x = if *x == 0.0 { 0.0f64 } else { *x };
                x.to_bits().hash(state)
            }
            Value::String(s) => s.hash(state),
            Value::Binary(b) => b.as_bytes().hash(state),
            Value::Array(a) => {
                a.len().hash(state);
                a.iter().for_each(|v| v.hash(state));
            }
            Value::Map(m) => {
                m.len().hash(state);
                let combined = m.iter().fold(0u64, |acc, (k, v)| {
                    let mut entry = FxHasher::default();
                    k.hash(&mut entry);
                    v.hash(&mut entry);
                    acc.wrapping_add(entry.finish())
                });
                combined.hash(state);
            }
            Value::Regexp(r) => r.as_str().hash(state),
            Value::Time(t) => t.hash(state),
            Value::Function(func) => (Arc::as_ptr(&func.body) as *const () as usize).hash(state),
            Value::Arguments(args) => {
                args.len().hash(state);
                args.iter().for_each(|v| v.hash(state));
            }
            Value::Native(n) => (Arc::as_ptr(&n.0) as *const () as usize).hash(state),
            Value::Error(_) | Value::Type(_) => mem::discriminant(self).hash(state),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        write!(f, "{:.1}", x)
    } else {
        write!(f, "{}", x)
    }
}

fn write_joined<'a, I>(f: &mut fmt::Formatter<'_>, items: I, sep: &str, literal: bool) -> fmt::Result
where
    I: Iterator<Item = &'a Value>,
{
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if literal {
            write!(f, "{}", item.literal())?;
        } else {
            write!(f, "{}", item)?;
        }
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Uint(u) => write!(f, "{}", u),
            Value::BigInt(b) => write!(f, "{}", b),
            Value::Float(x) => write_float(f, *x),
            Value::String(s) => f.write_str(s),
            Value::Binary(b) => f.write_str(&BASE64.encode(b.as_bytes())),
            Value::Array(a) => {
                write!(f, "[")?;
                write_joined(f, a.iter(), " ", false)?;
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "map[")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}:{}", k, v)?;
                }
                write!(f, "]")
            }
            Value::Regexp(r) => f.write_str(r.as_str()),
            Value::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Error(e) => write!(f, "{}", e),
            Value::Function(func) => write!(f, "func {}", func.name()),
            Value::Type(ty) => write!(f, "{}", ty),
            Value::Arguments(args) => {
                write!(f, "(")?;
                write_joined(f, args.iter(), ", ", false)?;
                write!(f, ")")
            }
            Value::Native(n) => write!(f, "native {}", n.type_name()),
        }
    }
}

/// Literal rendering of a value, see [`Value::literal`]
pub struct Literal<'a>(&'a Value);

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(s) => write!(f, "{:?}", &**s),
            Value::Binary(_) | Value::Time(_) => write!(f, "\"{}\"", self.0),
            Value::Regexp(r) => write!(f, "/{}/", r.as_str()),
            Value::Array(a) => {
                write!(f, "[")?;
                write_joined(f, a.iter(), ",", true)?;
                write!(f, "]")
            }
            Value::Arguments(args) => {
                write!(f, "(")?;
                write_joined(f, args.iter(), ",", true)?;
                write!(f, ")")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", k.literal(), v.literal())?;
                }
                write!(f, "}}")
            }
            other => write!(f, "{}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::uint(u)
    }
}

impl From<BigInt> for Value {
    fn from(b: BigInt) -> Self {
        Value::big_int(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Type> for Value {
    fn from(ty: Type) -> Self {
        Value::from_type(ty)
    }
}

impl From<Violation> for ErrorValue {
    fn from(v: Violation) -> Self {
        ErrorValue::Violation(Arc::new(v))
    }
}

impl From<Violation> for Value {
    fn from(v: Violation) -> Self {
        Value::Error(ErrorValue::from(v))
    }
}

// ============================================================================
// Containers
// ============================================================================

/// Immutable-by-default byte string
#[derive(Debug, Clone)]
pub struct Binary {
    bytes: Arc<Vec<u8>>,
    frozen: bool,
}

impl Binary {
    /// Create a byte string with the given frozen flag
    pub fn new(bytes: Vec<u8>, frozen: bool) -> Self {
        Self {
            bytes: Arc::new(bytes),
            frozen,
        }
    }

    /// Byte contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if there are no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check if mutation is rejected
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Frozen view sharing the same storage
    pub fn freeze(&self) -> Self {
        Self {
            bytes: Arc::clone(&self.bytes),
            frozen: true,
        }
    }

    /// Mutable access to the bytes, copying shared storage first
    pub fn bytes_mut(&mut self) -> Result<&mut Vec<u8>> {
        if self.frozen {
            return Err(Error::Frozen { kind: "binary" });
        }
        Ok(Arc::make_mut(&mut self.bytes))
    }
}

impl PartialEq for Binary {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

/// Ordered sequence of values
#[derive(Debug, Clone)]
pub struct Array {
    items: Arc<Vec<Value>>,
    frozen: bool,
}

impl Array {
    /// Create an unfrozen array
    pub fn new(items: Vec<Value>) -> Self {
        Self::with_frozen(items, false)
    }

    /// Create an array with the given frozen flag
    ///
    /// The flag only describes this array; use [`Array::freeze`] for a deep
    /// guarantee.
    pub fn with_frozen(items: Vec<Value>, frozen: bool) -> Self {
        Self {
            items: Arc::new(items),
            frozen,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if there are no elements
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Iterate over the elements
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Elements as a slice
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    /// Check if this array rejects mutation
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Check if both arrays share the same storage
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// Deeply frozen copy
    pub fn freeze(&self) -> Self {
        Self::with_frozen(self.items.iter().map(Value::freeze).collect(), true)
    }

    fn items_mut(&mut self) -> Result<&mut Vec<Value>> {
        if self.frozen {
            return Err(Error::Frozen { kind: "array" });
        }
        Ok(Arc::make_mut(&mut self.items))
    }

    /// Append an element
    pub fn push(&mut self, value: Value) -> Result<()> {
        self.items_mut()?.push(value);
        Ok(())
    }

    /// Replace the element at `index`
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let len = self.items.len();
        match self.items_mut()?.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds { index, len }),
        }
    }

    /// Grow or shrink to `len` elements, padding with nil
    pub fn resize(&mut self, len: usize) -> Result<()> {
        self.items_mut()?.resize(len, Value::Nil);
        Ok(())
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.items == other.items
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Insertion ordered key/value mapping
///
/// Keys are compared structurally and located through a hash index.
#[derive(Clone)]
pub struct Map {
    entries: Arc<Entries>,
    frozen: bool,
}

#[derive(Clone, Default)]
struct Entries {
    list: Vec<(Value, Value)>,
    index: FxHashMap<Value, usize>,
}

impl Entries {
    fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.index.get(&key) {
            Some(&i) => Some(mem::replace(&mut self.list[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.list.len());
                self.list.push((key, value));
                None
            }
        }
    }
}

impl Map {
    /// Create an unfrozen empty map
    pub fn new() -> Self {
        Self::from_entries(Vec::new(), false)
    }

    /// Create a map from entries; later duplicates replace earlier ones
    pub fn from_entries(entries: Vec<(Value, Value)>, frozen: bool) -> Self {
        let mut deduped = Entries {
            list: Vec::with_capacity(entries.len()),
            index: FxHashMap::with_capacity_and_hasher(entries.len(), Default::default()),
        };
        for (k, v) in entries {
            deduped.insert(k, v);
        }
        Self {
            entries: Arc::new(deduped),
            frozen,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.list.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.list.is_empty()
    }

    /// Value stored under `key`
    pub fn get(&self, key: &Value) -> Option<&Value> {
        let i = *self.entries.index.get(key)?;
        self.entries.list.get(i).map(|(_, v)| v)
    }

    /// Value stored under a string key
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.get(&Value::string(key))
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.list.iter().map(|(k, v)| (k, v))
    }

    /// Iterate over keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.list.iter().map(|(k, _)| k)
    }

    /// Check if this map rejects mutation
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Deeply frozen copy
    pub fn freeze(&self) -> Self {
        Self::from_entries(
            self.iter().map(|(k, v)| (k.freeze(), v.freeze())).collect(),
            true,
        )
    }

    /// Insert or replace an entry, returning the previous value
    pub fn put(&mut self, key: Value, value: Value) -> Result<Option<Value>> {
        if self.frozen {
            return Err(Error::Frozen { kind: "map" });
        }
        Ok(Arc::make_mut(&mut self.entries).insert(key, value))
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.entries, &other.entries) {
            return true;
        }
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

/// Positional argument list
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments(Arc<Vec<Value>>);

impl Arguments {
    /// Create an argument list
    pub fn new(args: Vec<Value>) -> Self {
        Arguments(Arc::new(args))
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no arguments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Argument at `index`
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Iterate over the arguments
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(args: Vec<Value>) -> Self {
        Arguments::new(args)
    }
}

// ============================================================================
// Behavioural values
// ============================================================================

/// An error carried as a value
#[derive(Debug, Clone)]
pub enum ErrorValue {
    /// A structured type violation; compared structurally
    Violation(Arc<Violation>),
    /// Any other error; compared by identity
    Foreign(Arc<dyn std::error::Error + Send + Sync>),
}

impl ErrorValue {
    /// The violation, if this error is one
    pub fn as_violation(&self) -> Option<&Violation> {
        match self {
            ErrorValue::Violation(v) => Some(v),
            ErrorValue::Foreign(_) => None,
        }
    }
}

impl PartialEq for ErrorValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ErrorValue::Violation(a), ErrorValue::Violation(b)) => a == b,
            (ErrorValue::Foreign(a), ErrorValue::Foreign(b)) => {
                std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
            }
            _ => false,
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorValue::Violation(v) => write!(f, "{}", v),
            ErrorValue::Foreign(e) => write!(f, "{}", e),
        }
    }
}

/// Signature of the body of a [`Function`]
pub type NativeFn = dyn Fn(&Arguments) -> Result<Value> + Send + Sync;

/// Callable value; compared by identity
#[derive(Clone)]
pub struct Function {
    name: Arc<str>,
    body: Arc<NativeFn>,
}

impl Function {
    /// Wrap a closure as a callable value
    pub fn new<F>(name: impl Into<Arc<str>>, body: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function
    pub fn call(&self, args: &Arguments) -> Result<Value> {
        (self.body)(args)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.body) as *const (),
            Arc::as_ptr(&other.body) as *const (),
        )
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Function").field(&self.name).finish()
    }
}

/// Escape hatch wrapper around an unrecognized native value
///
/// Holds its own copy of the native value. Two wrappers are equal only when
/// they share the same copy.
#[derive(Clone)]
pub struct Native(Arc<dyn Reflect>);

impl Native {
    /// Wrap a native value
    pub fn new<T: Reflect + Clone>(native: T) -> Self {
        Native(Arc::new(native))
    }

    pub(crate) fn from_boxed(native: Box<dyn Reflect>) -> Self {
        Native(Arc::from(native))
    }

    /// Native type name of the wrapped value
    pub fn type_name(&self) -> &'static str {
        (*self.0).native_type_name()
    }

    /// The wrapped value
    pub fn reflect(&self) -> &dyn Reflect {
        &*self.0
    }

    /// The wrapped value, if it has type `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let any: &dyn Any = &*self.0;
        any.downcast_ref::<T>()
    }
}

impl PartialEq for Native {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Native").field(&self.type_name()).finish()
    }
}
