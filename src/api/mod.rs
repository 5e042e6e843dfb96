//! HTTP API over the prediction handler

pub mod handlers;
pub mod routes;
pub mod sessions;
pub mod types;

pub use handlers::AppState;
pub use routes::create_router;
pub use sessions::SessionStore;
