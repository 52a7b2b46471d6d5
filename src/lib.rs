pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod router;
pub mod server;
mod utils;

pub use api::Mode;
pub use config::Config;
pub use error::{Error, ErrorType, Res, Result};
