mod admin;
mod cars;
mod chat;
pub mod error;
mod last_trips;
mod spots;
mod users;
mod validation;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let user_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/me", get(users::me));

    // Public catalog
    let catalog_routes = Router::new()
        .route("/cars", get(cars::list_cars))
        .route("/cars/:id", get(cars::get_car))
        .route("/spots", get(spots::list_spots))
        .route("/spots/:id", get(spots::get_spot))
        .route("/last_trips", get(last_trips::list_last_trips))
        .route("/last_trips/:id", get(last_trips::get_last_trip))
        .route(
            "/last_trips/:id/comments",
            get(last_trips::list_comments).post(last_trips::add_comment),
        );

    // Every admin route verifies the credential pair embedded in its body
    let admin_routes = Router::new()
        .route("/login", post(admin::login))
        .route("/users", post(admin::create_admin))
        .route("/users/:username/password", put(admin::change_password))
        .route("/cars", post(cars::create_car))
        .route("/cars/:id", put(cars::update_car).delete(cars::delete_car))
        .route("/spots", post(spots::create_spot))
        .route(
            "/spots/:id",
            put(spots::update_spot).delete(spots::delete_spot),
        )
        .route("/last_trips", post(last_trips::create_trip))
        .route("/last_trips/list", post(last_trips::admin_list_trips))
        .route(
            "/last_trips/:id",
            put(last_trips::update_trip).delete(last_trips::delete_trip),
        )
        .route(
            "/last_trips/:id/comments/:comment_id",
            put(last_trips::update_comment).delete(last_trips::delete_comment),
        );

    let chat_routes = Router::new()
        .route("/", post(chat::chat))
        .route("/history", get(chat::history))
        .route("/plan", post(chat::submit_plan));

    let api_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/admin", admin_routes)
        .nest("/chat", chat_routes)
        .merge(catalog_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
