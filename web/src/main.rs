use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use storage::Database;
use storage::cache::LeaderboardCache;
use storage::services::rating::RatingSettings;
use storage::store::postgres::PgMatchStore;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod middleware;
mod state;

use config::Config;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::matches::handlers::submit_match,
        features::matches::handlers::confirm_match,
        features::matches::handlers::deny_match,
        features::matches::handlers::cancel_match,
        features::matches::handlers::list_matches,
        features::leaderboard::handlers::get_leaderboard,
        features::participants::handlers::get_participant,
        features::admin::handlers::adjust_rating,
        features::admin::handlers::revert_match,
        features::admin::handlers::ban_participant,
        features::admin::handlers::unban_participant,
    ),
    components(
        schemas(
            storage::dto::matches::SubmitMatchRequest,
            storage::dto::admin::AdjustRatingRequest,
            storage::dto::admin::BanRequest,
            storage::dto::leaderboard::LeaderboardEntry,
            storage::dto::leaderboard::LeaderboardResponse,
            storage::dto::participant::ParticipantProfile,
            storage::models::Match,
            storage::models::MatchStatus,
            storage::models::RatingAdjustment,
            storage::models::Sport,
        )
    ),
    tags(
        (name = "matches", description = "Match submission and lifecycle"),
        (name = "leaderboard", description = "Cached per-sport rankings"),
        (name = "participants", description = "Participant profiles"),
        (name = "admin", description = "Administrative overrides, always audited"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting CampusRank API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    let settings = RatingSettings {
        k_factor: config.k_factor,
        default_rating: config.default_rating,
    };
    let store = Arc::new(PgMatchStore::new(db.pool().clone(), config.default_rating));
    let cache = Arc::new(LeaderboardCache::new(
        Duration::from_secs(config.cache_ttl_secs),
        config.cache_capacity,
    ));
    cache
        .start_sweep(Duration::from_secs(config.cache_sweep_secs))
        .await;

    let state = AppState::new(store, cache.clone(), settings);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api/matches", features::matches::routes())
        .nest("/api/leaderboard", features::leaderboard::routes())
        .nest("/api/participants", features::participants::routes())
        .nest("/api/admin", features::admin::routes())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache.shutdown().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
