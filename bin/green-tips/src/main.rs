//! # green-tips Binary
//!
//! The entry point that assembles the application based on compile-time features.

use actix_web::{web, App, HttpServer};
use gt_api::handlers::AppState;
use gt_core::ranking::RankingConfig;

// Feature-gated imports: the binary is compiled to order
#[cfg(feature = "db-sqlite")]
use gt_db_sqlite::{SqliteGeoIndex, SqliteTipStore, SqliteUserStore};

#[cfg(feature = "auth-simple")]
use gt_auth_simple::SimpleAuthProvider;

fn env_or(name: &str, fallback: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| fallback.to_string())
}

fn ranking_from_env() -> RankingConfig {
    let defaults = RankingConfig::default();
    RankingConfig {
        radius_km: env_or("RADIUS_KM", "")
            .parse()
            .unwrap_or(defaults.radius_km),
        max_cities: env_or("MAX_CITIES", "")
            .parse()
            .unwrap_or(defaults.max_cities),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let database_url = env_or("DATABASE_URL", "sqlite:green_tips.db?mode=rwc");
    let bind_addr = env_or("BIND_ADDR", "127.0.0.1:8000");
    let session_salt = env_or("SESSION_SALT", "green-tips-dev-salt");
    let ranking = ranking_from_env();

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let pool = gt_db_sqlite::connect(&database_url)
        .await
        .expect("Failed to init SQLite");

    // 2. Initialize Auth Implementation
    #[cfg(feature = "auth-simple")]
    let auth = SimpleAuthProvider::new(&session_salt);

    // 3. Wrap in AppState (dynamic dispatch keeps the handlers
    //    plugin-agnostic)
    let state = web::Data::new(AppState {
        geo: Box::new(SqliteGeoIndex::new(pool.clone())),
        tips: Box::new(SqliteTipStore::new(pool.clone())),
        users: Box::new(SqliteUserStore::new(pool)),
        auth: Box::new(auth),
        ranking,
    });

    log::info!("🌱 green-tips starting on http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(gt_api::middleware::cors_policy())
            .wrap(gt_api::middleware::standard_middleware())
            .configure(gt_api::configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
