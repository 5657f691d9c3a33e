//! Packaging material analysis service.
//!
//! Accepts a photo of food packaging, has a multimodal model identify the
//! materials, decorates each material with a generated structure diagram and
//! lets signed-in users keep their analyses.

pub mod analysis;
pub mod auth;
pub mod config;
pub mod display;
pub mod error;
pub mod gateway;
pub mod guide;
pub mod material;
pub mod prompt;
pub mod routes;
pub mod store;
pub mod ui;

pub use config::Settings;
pub use routes::{router, AppState};
