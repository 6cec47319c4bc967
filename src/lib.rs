pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod progress;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::routes::{auth as auth_routes, budget, category, expense, health};
use crate::state::AppState;

pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

pub fn app(state: AppState, config: &Config) -> Router {
    let auth = Router::new()
        .route("/register", post(auth_routes::register))
        .route("/login", post(auth_routes::login))
        .route("/me", get(auth_routes::me));

    let categories = Router::new()
        .route(
            "/",
            get(category::list_categories).post(category::create_category),
        )
        .route(
            "/:id",
            put(category::update_category).delete(category::delete_category),
        );

    let expenses = Router::new()
        .route(
            "/",
            get(expense::list_expenses).post(expense::create_expense),
        )
        .route("/stats", get(expense::expense_stats))
        .route(
            "/:id",
            get(expense::get_expense)
                .put(expense::update_expense)
                .delete(expense::delete_expense),
        );

    let budgets = Router::new()
        .route("/", get(budget::list_budgets).post(budget::create_budget))
        .route(
            "/:id",
            get(budget::get_budget)
                .put(budget::update_budget)
                .delete(budget::delete_budget),
        );

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/auth", auth)
        .nest("/api/categories", categories)
        .nest("/api/expenses", expenses)
        .nest("/api/budgets", budgets)
        .fallback(health::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_allow_origins))
}
