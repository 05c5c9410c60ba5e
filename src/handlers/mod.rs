pub mod art_handlers;
pub mod health_handlers;
