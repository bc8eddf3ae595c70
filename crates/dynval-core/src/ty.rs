//! Declared type constraints
//!
//! A [`Type`] is a predicate over [`Value`]s. Types render deterministically,
//! may supply a construction strategy ([`Type::factory`]) and always have a
//! widened generic form ([`Type::generic`]).

use crate::factory::{self, Factory};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Inclusive size bounds of a size-constrained type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeRange {
    /// Minimum size
    pub min: usize,
    /// Maximum size, `usize::MAX` when unbounded
    pub max: usize,
}

impl SizeRange {
    /// Range admitting every size
    pub const UNBOUNDED: SizeRange = SizeRange {
        min: 0,
        max: usize::MAX,
    };

    /// Create a range; bounds given in the wrong order are swapped
    pub fn new(min: usize, max: usize) -> Self {
        if min > max {
            SizeRange { min: max, max: min }
        } else {
            SizeRange { min, max }
        }
    }

    /// Check if `size` lies within the range
    pub fn contains(&self, size: usize) -> bool {
        self.min <= size && size <= self.max
    }

    /// Check if this range admits every size
    pub fn is_unbounded(&self) -> bool {
        *self == Self::UNBOUNDED
    }
}

impl Default for SizeRange {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl fmt::Display for SizeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.max == usize::MAX {
            write!(f, "[{}]", self.min)
        } else {
            write!(f, "[{},{}]", self.min, self.max)
        }
    }
}

/// String type: `string` or `string[min,max]`
#[derive(Debug, Clone, PartialEq)]
pub struct StringType {
    /// Length bounds in characters
    pub size: SizeRange,
}

/// Array type: `[]T` or `[min,max]T`
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    /// Element type
    pub element: Box<Type>,
    /// Length bounds
    pub size: SizeRange,
}

/// Map type: `map[K]V`
#[derive(Debug, Clone, PartialEq)]
pub struct MapType {
    /// Key type
    pub key: Box<Type>,
    /// Value type
    pub value: Box<Type>,
    /// Entry count bounds
    pub size: SizeRange,
}

/// Entry of a struct map type
#[derive(Debug, Clone, PartialEq)]
pub struct StructEntry {
    /// Key name
    pub key: Arc<str>,
    /// Value type
    pub value: Type,
    /// Whether the key must be present
    pub required: bool,
}

impl StructEntry {
    /// Create a required entry
    pub fn required(key: impl Into<Arc<str>>, value: Type) -> Self {
        Self {
            key: key.into(),
            value,
            required: true,
        }
    }

    /// Create an optional entry
    pub fn optional(key: impl Into<Arc<str>>, value: Type) -> Self {
        Self {
            key: key.into(),
            value,
            required: false,
        }
    }
}

/// Structurally typed map: `{"a":string,"b"?:int}`
#[derive(Debug, Clone, PartialEq)]
pub struct StructMapType {
    /// Declared entries
    pub entries: Vec<StructEntry>,
    /// Whether undeclared string keys are admitted
    pub additional: bool,
}

impl StructMapType {
    /// Create a struct map type
    pub fn new(entries: Vec<StructEntry>, additional: bool) -> Self {
        Self {
            entries,
            additional,
        }
    }

    /// Declared entry for `key`
    pub fn entry(&self, key: &str) -> Option<&StructEntry> {
        self.entries.iter().find(|e| &*e.key == key)
    }

    /// Check if a value may be added under `key`
    pub fn accepts_key(&self, key: &Value) -> bool {
        match key.as_str() {
            Some(k) => self.additional || self.entry(k).is_some(),
            None => false,
        }
    }

    fn instance(&self, value: &Value) -> bool {
        let Value::Map(map) = value else {
            return false;
        };
        let declared_ok = self.entries.iter().all(|e| match map.get_str(&e.key) {
            Some(v) => e.value.instance(v),
            None => !e.required,
        });
        declared_ok && map.keys().all(|k| self.accepts_key(k))
    }
}

impl fmt::Display for StructMapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{:?}", &*entry.key)?;
            if !entry.required {
                write!(f, "?")?;
            }
            write!(f, ":{}", entry.value)?;
        }
        if self.additional {
            if !self.entries.is_empty() {
                write!(f, ",")?;
            }
            write!(f, "...")?;
        }
        write!(f, "}}")
    }
}

/// Named type with an optional user construction strategy
#[derive(Clone)]
pub struct NamedType {
    /// Type name
    pub name: Arc<str>,
    /// Constraint the named type refines
    pub base: Box<Type>,
    /// Construction strategy
    pub factory: Option<Arc<dyn Factory>>,
}

impl PartialEq for NamedType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.base == other.base
    }
}

impl fmt::Debug for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedType")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// A declared type
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Every value
    Any,
    /// Only nil
    Nil,
    /// Booleans
    Boolean,
    /// Integers
    Integer,
    /// Floats
    Float,
    /// Strings, possibly length constrained
    String(StringType),
    /// Byte strings
    Binary,
    /// Arrays, possibly length constrained
    Array(ArrayType),
    /// Maps
    Map(MapType),
    /// Structurally typed maps
    StructMap(StructMapType),
    /// Exactly one value
    Exact(Value),
    /// Any of the member types
    AnyOf(Vec<Type>),
    /// Regular expressions
    Regexp,
    /// Timestamps
    Time,
    /// Error values
    Error,
    /// Callable values
    Function,
    /// Types used as values
    Meta,
    /// Escape hatch values wrapping the named native type
    Native(&'static str),
    /// Named refinement of another type
    Named(NamedType),
}

impl Type {
    /// Unconstrained string type
    pub fn string() -> Type {
        Type::String(StringType {
            size: SizeRange::UNBOUNDED,
        })
    }

    /// Length constrained string type
    pub fn sized_string(min: usize, max: usize) -> Type {
        Type::String(StringType {
            size: SizeRange::new(min, max),
        })
    }

    /// Unconstrained array type
    pub fn array(element: Type) -> Type {
        Type::Array(ArrayType {
            element: Box::new(element),
            size: SizeRange::UNBOUNDED,
        })
    }

    /// Length constrained array type
    pub fn sized_array(element: Type, min: usize, max: usize) -> Type {
        Type::Array(ArrayType {
            element: Box::new(element),
            size: SizeRange::new(min, max),
        })
    }

    /// Unconstrained map type
    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(MapType {
            key: Box::new(key),
            value: Box::new(value),
            size: SizeRange::UNBOUNDED,
        })
    }

    /// Struct map type
    pub fn struct_map(entries: Vec<StructEntry>, additional: bool) -> Type {
        Type::StructMap(StructMapType::new(entries, additional))
    }

    /// Exact value type
    pub fn exact(value: impl Into<Value>) -> Type {
        Type::Exact(value.into())
    }

    /// Named type
    pub fn named(
        name: impl Into<Arc<str>>,
        base: Type,
        factory: Option<Arc<dyn Factory>>,
    ) -> Type {
        Type::Named(NamedType {
            name: name.into(),
            base: Box::new(base),
            factory,
        })
    }

    /// Union of types, flattened and deduplicated
    ///
    /// A single member collapses to that member and a union containing
    /// [`Type::Any`] is `any`. An empty union is kept and admits nothing.
    pub fn any_of(members: impl IntoIterator<Item = Type>) -> Type {
        let mut flat: Vec<Type> = Vec::new();
        for member in members {
            match member {
                Type::AnyOf(inner) => {
                    for m in inner {
                        if !flat.contains(&m) {
                            flat.push(m);
                        }
                    }
                }
                m => {
                    if !flat.contains(&m) {
                        flat.push(m);
                    }
                }
            }
        }
        if flat.contains(&Type::Any) {
            return Type::Any;
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        Type::AnyOf(flat)
    }

    /// Check if `value` is an instance of this type
    pub fn instance(&self, value: &Value) -> bool {
        match self {
            Type::Any => true,
            Type::Nil => value.is_nil(),
            Type::Boolean => matches!(value, Value::Bool(_)),
            Type::Integer => matches!(value, Value::Int(_) | Value::Uint(_) | Value::BigInt(_)),
            Type::Float => matches!(value, Value::Float(_)),
            Type::String(st) => match value {
                Value::String(s) => st.size.contains(s.chars().count()),
                _ => false,
            },
            Type::Binary => matches!(value, Value::Binary(_)),
            Type::Array(at) => {
                let items = match value {
                    Value::Array(a) => a.as_slice(),
                    _ => return false,
                };
                at.size.contains(items.len()) && items.iter().all(|v| at.element.instance(v))
            }
            Type::Map(mt) => match value {
                Value::Map(m) => {
                    mt.size.contains(m.len())
                        && m.iter()
                            .all(|(k, v)| mt.key.instance(k) && mt.value.instance(v))
                }
                _ => false,
            },
            Type::StructMap(st) => st.instance(value),
            Type::Exact(v) => v == value,
            Type::AnyOf(members) => members.iter().any(|m| m.instance(value)),
            Type::Regexp => matches!(value, Value::Regexp(_)),
            Type::Time => matches!(value, Value::Time(_)),
            Type::Error => matches!(value, Value::Error(_)),
            Type::Function => matches!(value, Value::Function(_)),
            Type::Meta => matches!(value, Value::Type(_)),
            Type::Native(name) => match value {
                Value::Native(n) => n.type_name() == *name,
                _ => false,
            },
            Type::Named(named) => named.base.instance(value),
        }
    }

    /// Size bounds if this is a size-constrained type
    pub fn size_range(&self) -> Option<SizeRange> {
        match self {
            Type::String(st) => Some(st.size),
            Type::Array(at) => Some(at.size),
            Type::Map(mt) => Some(mt.size),
            Type::Named(named) => named.base.size_range(),
            _ => None,
        }
    }

    /// Construction strategy supplied by this type
    pub fn factory(&self) -> Option<&dyn Factory> {
        match self {
            Type::Boolean => Some(&factory::BOOLEAN),
            Type::Integer => Some(&factory::INTEGER),
            Type::Float => Some(&factory::FLOAT),
            Type::String(_) => Some(&factory::STRING),
            Type::Binary => Some(&factory::BINARY),
            Type::Regexp => Some(&factory::REGEXP),
            Type::Time => Some(&factory::TIME),
            Type::Named(named) => named.factory.as_deref(),
            _ => None,
        }
    }

    /// The most general type of this type's family
    ///
    /// Size bounds are dropped, exact values widen to their natural type and
    /// unions widen member-wise. A struct map admitting undeclared keys widens
    /// to `map[string]any`. `t.generic().generic() == t.generic()`.
    pub fn generic(&self) -> Type {
        match self {
            Type::String(_) => Type::string(),
            Type::Array(at) => Type::array(at.element.generic()),
            Type::Map(mt) => Type::map(mt.key.generic(), mt.value.generic()),
            Type::StructMap(st) if st.additional => Type::map(Type::string(), Type::Any),
            Type::StructMap(st) => Type::map(
                Type::string(),
                widened_union(st.entries.iter().map(|e| e.value.generic())),
            ),
            Type::Exact(v) => natural_type(v),
            Type::AnyOf(members) => widened_union(members.iter().map(Type::generic)),
            other => other.clone(),
        }
    }

    /// Check if this is the unconstrained any type
    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    /// Get the struct map type if this is one
    pub fn as_struct_map(&self) -> Option<&StructMapType> {
        match self {
            Type::StructMap(st) => Some(st),
            _ => None,
        }
    }
}

/// Union of already widened types; no members widens to `any`
fn widened_union(members: impl Iterator<Item = Type>) -> Type {
    let members: Vec<Type> = members.collect();
    if members.is_empty() {
        return Type::Any;
    }
    match Type::any_of(members) {
        Type::AnyOf(m) if m.is_empty() => Type::Any,
        t => t,
    }
}

/// Widened type of a single value
fn natural_type(value: &Value) -> Type {
    match value {
        Value::Nil => Type::Nil,
        Value::Bool(_) => Type::Boolean,
        Value::Int(_) | Value::Uint(_) | Value::BigInt(_) => Type::Integer,
        Value::Float(_) => Type::Float,
        Value::String(_) => Type::string(),
        Value::Binary(_) => Type::Binary,
        Value::Array(a) => Type::array(widened_union(a.iter().map(natural_type))),
        Value::Arguments(args) => Type::array(widened_union(args.iter().map(natural_type))),
        Value::Map(m) => Type::map(
            widened_union(m.keys().map(natural_type)),
            widened_union(m.iter().map(|(_, v)| natural_type(v))),
        ),
        Value::Regexp(_) => Type::Regexp,
        Value::Time(_) => Type::Time,
        Value::Error(_) => Type::Error,
        Value::Function(_) => Type::Function,
        Value::Type(_) => Type::Meta,
        Value::Native(n) => Type::Native(n.type_name()),
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Nil => write!(f, "nil"),
            Type::Boolean => write!(f, "bool"),
            Type::Integer => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String(st) => {
                write!(f, "string")?;
                if !st.size.is_unbounded() {
                    write!(f, "{}", st.size)?;
                }
                Ok(())
            }
            Type::Binary => write!(f, "binary"),
            Type::Array(at) => {
                if at.size.is_unbounded() {
                    write!(f, "[]{}", at.element)
                } else {
                    write!(f, "{}{}", at.size, at.element)
                }
            }
            Type::Map(mt) => {
                write!(f, "map[{}]{}", mt.key, mt.value)?;
                if !mt.size.is_unbounded() {
                    write!(f, "{}", mt.size)?;
                }
                Ok(())
            }
            Type::StructMap(st) => write!(f, "{}", st),
            Type::Exact(v @ Value::String(_)) => write!(f, "{}", v.literal()),
            Type::Exact(v) => write!(f, "{}", v),
            Type::AnyOf(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
            Type::Regexp => write!(f, "regexp"),
            Type::Time => write!(f, "time"),
            Type::Error => write!(f, "error"),
            Type::Function => write!(f, "func"),
            Type::Meta => write!(f, "type"),
            Type::Native(name) => write!(f, "native[{}]", name),
            Type::Named(named) => write!(f, "{}", named.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::string().to_string(), "string");
        assert_eq!(Type::sized_string(1, 10).to_string(), "string[1,10]");
        assert_eq!(Type::sized_string(2, usize::MAX).to_string(), "string[2]");
        assert_eq!(Type::array(Type::string()).to_string(), "[]string");
        assert_eq!(Type::sized_array(Type::Integer, 0, 3).to_string(), "[0,3]int");
        assert_eq!(Type::map(Type::string(), Type::Integer).to_string(), "map[string]int");
        assert_eq!(
            Type::struct_map(
                vec![
                    StructEntry::required("a", Type::string()),
                    StructEntry::optional("b", Type::Integer)
                ],
                true
            )
            .to_string(),
            "{\"a\":string,\"b\"?:int,...}"
        );
        assert_eq!(Type::exact("x").to_string(), "\"x\"");
        assert_eq!(Type::any_of([Type::Integer, Type::Nil]).to_string(), "int|nil");
    }

    #[test]
    fn test_string_instance_respects_size() {
        let ty = Type::sized_string(1, 3);
        assert!(ty.instance(&Value::from("abc")));
        assert!(!ty.instance(&Value::from("")));
        assert!(!ty.instance(&Value::from("abcd")));
        assert!(!ty.instance(&Value::Int(1)));
    }

    #[test]
    fn test_struct_map_instance() {
        let ty = Type::struct_map(
            vec![
                StructEntry::required("a", Type::string()),
                StructEntry::optional("b", Type::Integer),
            ],
            false,
        );
        let ok = Value::Map(crate::value::Map::from_entries(
            vec![(Value::from("a"), Value::from("x"))],
            false,
        ));
        let extra = Value::Map(crate::value::Map::from_entries(
            vec![
                (Value::from("a"), Value::from("x")),
                (Value::from("c"), Value::Int(1)),
            ],
            false,
        ));
        let missing = Value::Map(crate::value::Map::new());
        assert!(ty.instance(&ok));
        assert!(!ty.instance(&extra));
        assert!(!ty.instance(&missing));
    }

    #[test]
    fn test_any_of_flattens_and_collapses() {
        assert_eq!(
            Type::any_of([Type::Integer, Type::any_of([Type::Integer, Type::Float])]),
            Type::AnyOf(vec![Type::Integer, Type::Float])
        );
        assert_eq!(Type::any_of([Type::Float, Type::Float]), Type::Float);
        assert_eq!(Type::any_of([Type::Float, Type::Any]), Type::Any);
    }

    #[test]
    fn test_generic_of_literal_array() {
        let literal = Value::strings(["hello", "world"]).type_of();
        assert_eq!(literal.to_string(), "[hello world]");
        assert_eq!(literal.generic().to_string(), "[]string");
    }

    #[test]
    fn test_generic_drops_bounds() {
        assert_eq!(Type::sized_string(1, 10).generic(), Type::string());
        assert_eq!(
            Type::sized_array(Type::sized_string(1, 2), 1, 4).generic(),
            Type::array(Type::string())
        );
    }

    #[test]
    fn test_generic_of_open_struct_map_admits_extra_keys() {
        let ty = Type::struct_map(vec![StructEntry::required("a", Type::string())], true);
        let extra = Value::Map(crate::value::Map::from_entries(
            vec![
                (Value::from("a"), Value::from("x")),
                (Value::from("n"), Value::Int(1)),
            ],
            false,
        ));
        assert!(ty.instance(&extra));
        assert_eq!(ty.generic().to_string(), "map[string]any");
        assert!(ty.generic().instance(&extra));
    }

    #[test]
    fn test_generic_of_mixed_literal() {
        let literal = Value::array(vec![Value::Int(1), Value::from("a"), Value::Int(2)]).type_of();
        assert_eq!(
            literal.generic(),
            Type::array(Type::AnyOf(vec![Type::Integer, Type::string()]))
        );
        assert_eq!(Value::array(vec![]).type_of().generic(), Type::array(Type::Any));
    }

    #[test]
    fn test_generic_of_struct_map() {
        let ty = Type::struct_map(
            vec![
                StructEntry::required("a", Type::sized_string(1, 2)),
                StructEntry::required("b", Type::exact(Value::Int(3))),
            ],
            false,
        );
        assert_eq!(
            ty.generic(),
            Type::map(Type::string(), Type::AnyOf(vec![Type::string(), Type::Integer]))
        );
    }
}
