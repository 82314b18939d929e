use bragger_common::EnvVars;

pub struct ApiServerEnv {
    pub jwt_secret: String,
    pub jwt_expires_in: String,
    pub frontend_url: Option<String>,
    pub app_env: String,
}

impl EnvVars for ApiServerEnv {
    fn load() -> Self {
        Self {
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET is not set"),
            jwt_expires_in: std::env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "7d".to_string()),
            frontend_url: std::env::var("FRONTEND_URL").ok(),
            app_env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        match key {
            "JWT_SECRET" => self.jwt_secret.clone(),
            "JWT_EXPIRES_IN" => self.jwt_expires_in.clone(),
            "FRONTEND_URL" => self.frontend_url.clone().unwrap_or_default(),
            "APP_ENV" => self.app_env.clone(),
            _ => panic!("{} is not set", key),
        }
    }
}
