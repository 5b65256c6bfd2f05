//! Boarding Student API.
//!
//! REST backend of the Boarding Student portal: student profiles with a
//! completion score, company matching, advisor appointments, messages and a
//! resource library. Records live in PostgreSQL, or in memory when no
//! database is configured (demo mode).

pub mod appointments;
pub mod auth;
pub mod config;
pub mod err;
pub mod io;
pub mod matching;
pub mod messages;
pub mod models;
pub mod profile;
pub mod resources;
pub mod seed;
pub mod state;
pub mod store;
pub mod students;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub use crate::err::Error;
use crate::config::Config;
use crate::state::AppState;

pub type Payload<T> = Result<Json<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(value))
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub ok: bool,
}

async fn health() -> Json<Health> {
    Json(Health { ok: true })
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register_student))
        .route("/auth/login", post(auth::login_user))
        .route("/auth/me", get(auth::current_user))
        .route(
            "/students/me",
            get(students::read_profile).patch(students::update_profile),
        )
        .route(
            "/students/me/cv",
            post(students::upload_cv).layer(DefaultBodyLimit::max(io::MAX_UPLOAD_BODY)),
        )
        .route("/companies/matches", get(matching::student_matches))
        .route("/companies/:id/match-status", patch(matching::student_set_status))
        .route("/company/matched-students", get(matching::company_matches))
        .route(
            "/company/matches/:match_id/status",
            patch(matching::company_set_status),
        )
        .route(
            "/appointments",
            get(appointments::list).post(appointments::create),
        )
        .route("/messages", get(messages::list).post(messages::create))
        .route("/resources", get(resources::list));

    let mut app = Router::new()
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(state.uploads_dir()))
        .fallback(err::handler404);

    match state.config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => {
            let cors = CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
            app = app.layer(cors);
        }
        Err(_) => log::warn!(
            "FRONTEND_URL `{}` is not a valid origin, CORS disabled",
            state.config.frontend_url
        ),
    }

    app.with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::load()?;
    io::prepare_io(std::path::Path::new(&config.uploads_dir)).await?;

    log::info!("Initializing state...");
    let state = AppState::connect(config).await?;
    seed::seed_if_empty(state.store.as_ref(), state.config.hash_rounds).await?;

    let address = state.config.bind_address();
    let app = router(state);

    let listener = TcpListener::bind(&address).await?;
    log::info!("Boarding Student API running at http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                log::error!("Failed to install signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
