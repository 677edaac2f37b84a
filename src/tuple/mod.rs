//! Typed values, schemas, and tuple serialization.

pub mod data_type;
pub mod schema;
pub mod tuple;
pub mod value;

pub use data_type::DataType;
pub use schema::{Column, Schema};
pub use tuple::Tuple;
pub use value::Value;
