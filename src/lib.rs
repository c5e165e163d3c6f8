#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cli;
pub mod config;
pub mod error;
pub mod statusline;
pub mod tasks;
pub mod text;

pub use error::{Error, Result};
