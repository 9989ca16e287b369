pub mod error;
pub mod types;

pub use error::{LoadError, RuntimeError};
pub use types::*;
