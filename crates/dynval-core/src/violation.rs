//! Structured type violations
//!
//! Violations are recoverable errors raised by assignment and mutation sites
//! when a value or size does not satisfy a declared type. They capture the
//! type and value involved, never change after construction and compare
//! structurally.

use crate::ty::{StructMapType, Type};
use crate::value::Value;
use thiserror::Error;

fn assignment_subject(value: &Option<Value>) -> String {
    match value {
        Some(v) => format!("the value {}", v.literal()),
        None => "nil".to_string(),
    }
}

/// A value was assigned to a variable of a type it is not an instance of
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} cannot be assigned to a variable of type {ty}", assignment_subject(.value))]
pub struct AssignmentViolation {
    ty: Type,
    value: Option<Value>,
}

impl AssignmentViolation {
    /// Create the violation; `None` stands for an absent value
    pub fn new(ty: Type, value: Option<Value>) -> Self {
        Self { ty, value }
    }

    /// Type of the variable
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The rejected value, if one was present
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// A size-constrained container was resized outside of its bounds
#[derive(Debug, Clone, PartialEq, Error)]
#[error("size constraint violation on type {ty} when attempting resize to {size}")]
pub struct SizeViolation {
    ty: Type,
    size: usize,
}

impl SizeViolation {
    /// Create the violation
    pub fn new(ty: Type, size: usize) -> Self {
        Self { ty, size }
    }

    /// The size-constrained type
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The attempted size
    pub fn size(&self) -> usize {
        self.size
    }
}

/// A key was added to a struct map type that does not declare it
#[derive(Debug, Clone, PartialEq, Error)]
#[error("key {} cannot be added to type {ty}", .key.literal())]
pub struct MapKeyViolation {
    ty: StructMapType,
    key: Value,
}

impl MapKeyViolation {
    /// Create the violation
    pub fn new(ty: StructMapType, key: Value) -> Self {
        Self { ty, key }
    }

    /// The struct map type
    pub fn ty(&self) -> &StructMapType {
        &self.ty
    }

    /// The rejected key
    pub fn key(&self) -> &Value {
        &self.key
    }
}

/// Any structured type violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    /// See [`AssignmentViolation`]
    #[error(transparent)]
    Assignment(#[from] AssignmentViolation),

    /// See [`SizeViolation`]
    #[error(transparent)]
    Size(#[from] SizeViolation),

    /// See [`MapKeyViolation`]
    #[error(transparent)]
    MapKey(#[from] MapKeyViolation),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::StructEntry;

    #[test]
    fn test_assignment_renders_literal_value() {
        let v = AssignmentViolation::new(Type::string(), Some(Value::Int(3)));
        assert_eq!(
            v.to_string(),
            "the value 3 cannot be assigned to a variable of type string"
        );
        let quoted = AssignmentViolation::new(Type::Integer, Some(Value::from("x")));
        assert_eq!(
            quoted.to_string(),
            "the value \"x\" cannot be assigned to a variable of type int"
        );
    }

    #[test]
    fn test_assignment_absent_value() {
        let v = AssignmentViolation::new(Type::string(), None);
        assert_eq!(v.to_string(), "nil cannot be assigned to a variable of type string");
        assert!(v.value().is_none());
    }

    #[test]
    fn test_kinds_never_compare_equal() {
        let ty = Type::sized_string(1, 2);
        let size: Violation = SizeViolation::new(ty.clone(), 3).into();
        let assign: Violation = AssignmentViolation::new(ty, Some(Value::Int(3))).into();
        assert_ne!(size, assign);
    }

    #[test]
    fn test_map_key_rendering() {
        let ty = StructMapType::new(vec![StructEntry::required("a", Type::string())], false);
        let v = MapKeyViolation::new(ty, Value::Int(1));
        assert_eq!(v.to_string(), "key 1 cannot be added to type {\"a\":string}");
    }
}
