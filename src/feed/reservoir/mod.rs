pub mod client;
pub mod models;

pub use client::ReservoirClient;
pub use models::*;
