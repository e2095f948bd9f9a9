//! # gt-api
//!
//! The web routing and orchestration layer for green-tips.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod serializers;

use actix_web::web;

/// Configures the routes for the tip service.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            // The ranked listing and tip CRUD
            .route("/tips/", web::get().to(handlers::list_tips))
            .route("/tips/", web::post().to(handlers::create_tip))
            .route("/tips/{id}", web::get().to(handlers::get_tip))
            .route("/tips/{id}", web::put().to(handlers::update_tip))
            .route("/tips/{id}", web::delete().to(handlers::delete_tip))
            // Nearby-city lookup backing the tagging flow
            .route("/cities/", web::get().to(handlers::list_cities))
            // Registration and token login
            .route("/auth/users/", web::post().to(auth::register))
            .route("/auth/token/login/", web::post().to(auth::login)),
    );
}
