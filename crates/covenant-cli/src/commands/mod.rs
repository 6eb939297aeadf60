//! Command implementations.

pub mod chunks;
pub mod extract;
pub mod questions;
pub mod route;

pub use self::chunks::execute_chunks;
pub use self::extract::{execute_extract, run_extraction};
pub use self::questions::execute_questions;
pub use self::route::execute_route;
