//! Dynval Core Runtime
//!
//! This crate provides a runtime type layer for values whose shape is only
//! known at runtime:
//! - Realization of arbitrary native Rust values into immutable [`Value`]s
//! - Projection of values back onto native destinations
//! - Declared [`Type`] constraints, construction and generic widening
//! - Structured type violations raised by assignment sites

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod factory;
pub mod project;
pub mod realize;
pub mod reflect;
pub mod registry;
pub mod ty;
pub mod typed;
pub mod value;
pub mod violation;

pub use factory::{new_value, Factory};
pub use project::{from_value, reflect_to, Slot};
pub use realize::{RealizeOptions, Realizer};
pub use reflect::{NativeObject, Reflect, Shape};
pub use registry::{Registry, RegistryBuilder, WellKnown};
pub use ty::{
    ArrayType, MapType, NamedType, SizeRange, StringType, StructEntry, StructMapType, Type,
};
pub use typed::{check_assignment, check_map_key, check_resize, TypedVar};
pub use value::{Arguments, Array, Binary, ErrorValue, Function, Map, Native, Value};
pub use violation::{AssignmentViolation, MapKeyViolation, SizeViolation, Violation};

/// Fatal construction and usage failures
///
/// These signal a defect in calling code or malformed external input. They
/// are distinct from the recoverable [`Violation`]s raised by assignment sites.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Positional arguments of the wrong arity given to a constructor
    #[error("unable to create a {ty} from arguments {arguments}")]
    Arity {
        /// Rendering of the requested type
        ty: String,
        /// Rendering of the arguments
        arguments: String,
    },

    /// Argument cannot be turned into an instance of the type
    #[error("unable to create a {ty} from {value}")]
    Construct {
        /// Rendering of the requested type
        ty: String,
        /// Rendering of the rejected argument
        value: String,
    },

    /// Projection destination cannot be written to
    #[error("destination {target} is not addressable")]
    NotAddressable {
        /// Native type name of the destination
        target: &'static str,
    },

    /// Projection destination cannot hold the value
    #[error("{value} cannot be projected onto a {target}")]
    Incompatible {
        /// Rendering of the value
        value: String,
        /// Native type name of the destination
        target: &'static str,
    },

    /// Textual number token is not a number
    #[error("malformed number {token:?}")]
    MalformedNumber {
        /// The offending token
        token: String,
    },

    /// Mutation attempted on a frozen container
    #[error("attempt to modify a frozen {kind}")]
    Frozen {
        /// Container kind
        kind: &'static str,
    },

    /// Index outside of a container
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Container length
        len: usize,
    },

    /// A callable value failed
    #[error("call to {name} failed: {reason}")]
    Call {
        /// Function name
        name: String,
        /// Failure description
        reason: String,
    },
}

/// Result of fallible construction and projection operations
pub type Result<T> = std::result::Result<T, Error>;

/// Realize a native value using the standard registry, without freezing
///
/// Values that already are [`Value`]s are returned unchanged.
pub fn value<T: Reflect>(native: &T) -> Value {
    Realizer::new().realize(native)
}

/// Realize a native value with guaranteed deep immutability
pub fn frozen_value<T: Reflect>(native: &T) -> Value {
    Realizer::frozen().realize(native)
}
