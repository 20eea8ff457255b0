//! halyard-core
//!
//! Pure domain types: the value tree, the static field schema, resources,
//! JSON wire conversion, and input validation.
//! No network dependency. This is the shared vocabulary of the Halyard system.

pub mod error;
pub mod names;
pub mod resource;
pub mod schema;
pub mod validate;
pub mod value;
pub mod wire;

pub use error::CoreError;
pub use resource::Resource;
pub use schema::{
    Field, FieldKind, Literal, ObjectSchema, Operation, ResourceSchema, Union, UnionKind,
    UrlTemplates,
};
pub use value::{Nested, Object, Value};
