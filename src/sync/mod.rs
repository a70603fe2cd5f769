pub mod engine;
pub mod extract;
pub mod fields;
pub mod upsert;

pub use engine::*;
pub use upsert::*;
