pub mod common;
pub mod document;
pub mod entity;
pub mod field;
pub mod kinds;

pub use common::*;
pub use document::*;
pub use entity::*;
pub use field::*;
pub use kinds::*;
