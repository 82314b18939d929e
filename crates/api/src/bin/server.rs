use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use bragger_api::{
    achievement_routes, auth_routes, category_routes, image_routes, milestone_routes, misc_routes,
    rate_limit, setup_tracing, tag_routes, ApiServerEnv, GlobalState,
};
use bragger_common::EnvVars;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let env = ApiServerEnv::load();
    let state = GlobalState::new().await?;

    let cors = cors_layer(&env)?;
    let trace = TraceLayer::new_for_http();

    let api = Router::new()
        .merge(auth_routes())
        .merge(achievement_routes())
        .merge(category_routes())
        .merge(tag_routes())
        .merge(milestone_routes())
        .merge(image_routes())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    // The health probe sits outside the rate-limited /api tree.
    let app = Router::new()
        .nest("/api", api)
        .merge(misc_routes())
        .layer(cors)
        .layer(trace)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .unwrap_or("3001".into())
        .parse()
        .expect("failed to convert to number");

    let listener = tokio::net::TcpListener::bind(format!(":::{port}")).await?;

    tracing::info!("LISTENING ON {port}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn cors_layer(env: &ApiServerEnv) -> Result<CorsLayer> {
    Ok(match &env.frontend_url {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::very_permissive(),
    })
}
