//! HTTP API handlers

pub mod health;
pub mod import;
pub mod settings;
pub mod sse;

pub use health::health_routes;
pub use import::import_routes;
pub use settings::settings_routes;
pub use sse::import_event_stream;
