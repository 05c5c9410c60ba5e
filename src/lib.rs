//! REST backend for an art catalogue: schema-less art records, each with an
//! optional uploaded image served from `/uploads`.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::routes::{HttpOptions, app};
pub use state::AppState;
