pub mod core;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod output;
pub mod store;

pub use error::{Error, Result};
