pub mod cli;
pub mod clients;
pub mod config;
pub mod models;
pub mod schema;
pub mod storage;
pub mod sync;

// Convenient re-exports for tests and external callers
pub use clients::*;
pub use config::*;
pub use models::*;
pub use storage::*;
pub use sync::*;
