mod auth;
mod client;
mod env;

pub use auth::{hash_password, parse_expiry, sign_token, verify_password, verify_token, Claims};
pub use client::ModuleClient;
pub use env::EnvVars;

pub fn get_current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}
