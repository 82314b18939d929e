mod pool;
mod sqlx_postgres;

pub use sqlx_postgres::*;
