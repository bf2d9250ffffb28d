//! Data structures standing in for the host's JavaScript heap: values,
//! objects with ordered property tables, and callable function objects.

pub mod array_object;
pub mod builder;
pub mod error;
pub mod function_object;
pub mod object;
pub mod object_property;
pub mod operations;
pub mod value;
