pub mod cursor;
pub mod error;
pub mod module;
pub mod section;
pub mod types;
