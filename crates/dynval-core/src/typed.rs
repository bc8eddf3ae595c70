//! Type-checked mutation sites
//!
//! Assignment, resize and key insertion checks that produce the structured
//! [`Violation`](crate::Violation)s.

use crate::realize::Realizer;
use crate::reflect::Reflect;
use crate::ty::{StructMapType, Type};
use crate::value::Value;
use crate::violation::{AssignmentViolation, MapKeyViolation, SizeViolation};

/// Check that `value` may be assigned to a variable of type `ty`
///
/// An absent value is checked as nil.
pub fn check_assignment(ty: &Type, value: Option<&Value>) -> Result<(), AssignmentViolation> {
    let admitted = match value {
        Some(v) => ty.instance(v),
        None => ty.instance(&Value::Nil),
    };
    if admitted {
        Ok(())
    } else {
        Err(AssignmentViolation::new(ty.clone(), value.cloned()))
    }
}

/// Check that a container of type `ty` may be resized to `size`
pub fn check_resize(ty: &Type, size: usize) -> Result<(), SizeViolation> {
    match ty.size_range() {
        Some(range) if !range.contains(size) => Err(SizeViolation::new(ty.clone(), size)),
        _ => Ok(()),
    }
}

/// Check that `key` may be added to a map of type `ty`
pub fn check_map_key(ty: &StructMapType, key: &Value) -> Result<(), MapKeyViolation> {
    if ty.accepts_key(key) {
        Ok(())
    } else {
        Err(MapKeyViolation::new(ty.clone(), key.clone()))
    }
}

/// A variable holding a value of a declared type
#[derive(Debug, Clone, PartialEq)]
pub struct TypedVar {
    ty: Type,
    value: Value,
}

impl TypedVar {
    /// Create a variable with an initial value
    pub fn new(ty: Type, value: Value) -> Result<Self, AssignmentViolation> {
        check_assignment(&ty, Some(&value))?;
        Ok(Self { ty, value })
    }

    /// Declared type
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Current value
    pub fn get(&self) -> &Value {
        &self.value
    }

    /// Assign a new value; the variable is unchanged on violation
    pub fn assign(&mut self, value: Value) -> Result<(), AssignmentViolation> {
        check_assignment(&self.ty, Some(&value))?;
        self.value = value;
        Ok(())
    }

    /// Realize a native value and assign it
    pub fn assign_native(&mut self, native: &dyn Reflect) -> Result<(), AssignmentViolation> {
        self.assign(Realizer::new().realize(native))
    }

    /// Consume the variable, returning its value
    pub fn into_value(self) -> Value {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::StructEntry;

    #[test]
    fn test_typed_var_rejects_and_keeps_value() {
        let mut var = TypedVar::new(Type::string(), Value::from("a")).unwrap();
        let err = var.assign(Value::Int(3)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "the value 3 cannot be assigned to a variable of type string"
        );
        assert_eq!(var.get(), &Value::from("a"));
    }

    #[test]
    fn test_assign_native() {
        let mut var = TypedVar::new(Type::array(Type::Integer), Value::array(vec![])).unwrap();
        var.assign_native(&vec![1u8, 2]).unwrap_err();
        var.assign_native(&vec![1i32, 2]).unwrap();
        assert_eq!(var.get(), &Value::array(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_absent_value() {
        assert!(check_assignment(&Type::Nil, None).is_ok());
        let err = check_assignment(&Type::string(), None).unwrap_err();
        assert_eq!(err.value(), None);
    }

    #[test]
    fn test_resize_bounds() {
        let ty = Type::sized_string(1, 10);
        assert!(check_resize(&ty, 10).is_ok());
        assert_eq!(
            check_resize(&ty, 12).unwrap_err(),
            SizeViolation::new(ty.clone(), 12)
        );
        assert!(check_resize(&Type::Integer, 12).is_ok());
    }

    #[test]
    fn test_map_key() {
        let ty = StructMapType::new(vec![StructEntry::required("a", Type::string())], false);
        assert!(check_map_key(&ty, &Value::from("a")).is_ok());
        assert!(check_map_key(&ty, &Value::from("b")).is_err());
    }
}
