use std::{convert::Infallible, path::Path, sync::Arc};

use anyhow::Context;
use axum::{
    body::Body,
    http::Request,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use tower::{util::BoxCloneService, Layer};

pub mod config;
pub mod db;
mod error;
mod extractors;
mod handlers;
pub mod negotiate;
mod pages;
pub mod render;
pub mod rewrite;
pub mod routes;
pub mod shell;

#[cfg(test)]
mod fuzz;

pub use config::Config;
pub use error::{Error, JsonError};
pub use extractors::{AppState, PgPool};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// The whole forum as a service, embeddable in any hyper or tower server
pub type ForumApp = BoxCloneService<Request<Body>, Response, Infallible>;

pub async fn create_sqlx_pool(db_url: &str) -> anyhow::Result<sqlx::PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(db_url)
        .await
        .with_context(|| format!("Error opening database {:?}", db_url))
}

pub fn router(state: AppState) -> Router {
    use routes::*;
    Router::new()
        .route(HOME, get(handlers::home))
        .route(SIGNIN, get(handlers::signin_form).post(handlers::signin))
        .route(SIGNOUT, get(handlers::signout))
        .route(PROFILE, get(handlers::profile))
        .route(POSTS, get(handlers::posts).post(handlers::write))
        .route(WRITE, get(handlers::write_form))
        .route(
            POST,
            get(handlers::post)
                .put(handlers::edit)
                .delete(handlers::delete_post),
        )
        .route(EDIT, get(handlers::edit_form))
        .route(COMMENTS, post(handlers::write_comment))
        .route(COMMENT, delete(handlers::delete_comment))
        .route(ADMIN_CREATE_USER, post(handlers::admin_create_user))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Router wrapped in the request rewriting that must happen before routing
pub fn app(db: PgPool, config: Arc<Config>) -> anyhow::Result<ForumApp> {
    let host = config.host_header()?;
    let rewrite = tower::util::MapRequestLayer::new(move |req: Request<Body>| {
        rewrite::rewrite_request(req, host.as_ref())
    });
    Ok(BoxCloneService::new(
        rewrite.layer(router(AppState { db, config })),
    ))
}

/// Builds the forum from a configuration file, or from the environment when
/// there is none
pub async fn create_app(config_filename: Option<&Path>) -> anyhow::Result<ForumApp> {
    let config = match config_filename {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    let pool = create_sqlx_pool(&config.database_url).await?;
    app(PgPool::new(pool), Arc::new(config))
}
