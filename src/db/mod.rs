pub mod main;
pub mod memory;
pub mod models;
pub mod store;
pub mod upsert;

pub use main::Db;
pub use memory::MemoryStore;
pub use store::Store;
pub use upsert::UpsertConfig;
