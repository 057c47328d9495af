pub mod message;
pub mod schema;
pub mod value;
