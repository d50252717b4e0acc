pub mod aggregator;
pub mod app;
pub mod capture;
pub mod checkpoint;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
