mod postgres;
mod storage;

pub use postgres::{connect, PostgresClient};
pub use storage::{StorageClient, StoredImage};
