use anyhow::anyhow;
use axum::extract::Request;
use axum::http::{header, StatusCode};

use crate::response::AppError;

pub fn extract_bearer_token(req: &Request) -> Result<String, AppError> {
    let auth_header = req.headers().get(header::AUTHORIZATION);

    match auth_header {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| {
                    AppError::new(
                        StatusCode::UNAUTHORIZED,
                        anyhow!("invalid authorization header"),
                    )
                })?
                .split_whitespace()
                .collect::<Vec<_>>();

            if value.len() != 2 {
                return Err(AppError::new(
                    StatusCode::UNAUTHORIZED,
                    anyhow!("invalid authorization header"),
                ));
            }

            if value[0] != "Bearer" {
                return Err(AppError::new(
                    StatusCode::UNAUTHORIZED,
                    anyhow!("invalid authorization header"),
                ));
            }

            Ok(value[1].to_string())
        }
        _ => Err(AppError::new(
            StatusCode::UNAUTHORIZED,
            anyhow!("missing authorization header"),
        )),
    }
}

pub fn setup_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/achievements");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn extracts_bearer_tokens() {
        let req = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        assert!(extract_bearer_token(&request_with_auth(None)).is_err());
        assert!(extract_bearer_token(&request_with_auth(Some("abc"))).is_err());
        assert!(extract_bearer_token(&request_with_auth(Some("Basic abc"))).is_err());
        assert!(extract_bearer_token(&request_with_auth(Some("Bearer a b"))).is_err());
    }
}
