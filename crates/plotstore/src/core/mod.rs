//! Core building blocks shared by the store and the plot layer
//!
//! Errors, value types, the generational intrusive list, cancellation
//! and logging setup.

mod cancel;
mod error;
mod list;
pub mod logging;
mod types;

pub use cancel::*;
pub use error::*;
pub use list::*;
pub use logging::*;
pub use types::*;
