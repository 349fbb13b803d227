pub mod api;
pub mod cli;
pub mod console;
pub mod drive;
pub mod error;
pub mod logging;
pub mod session;
pub mod store;

pub use error::{Error, Result};
