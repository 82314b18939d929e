mod env;
mod global_state;
mod middleware;
mod response;
mod routes;
mod utils;

pub use routes::{
    achievement_routes,
    auth_routes,
    category_routes,
    image_routes,
    milestone_routes,
    misc_routes,
    tag_routes,
};

pub use env::ApiServerEnv;
pub use global_state::GlobalState;
pub use middleware::{authenticate, optional_auth, rate_limit, AuthUser, MaybeUser};
pub use response::{AppError, AppSuccess};
pub use utils::{extract_bearer_token, setup_tracing};
