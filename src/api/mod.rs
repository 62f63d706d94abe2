//! HTTP API for the review panel.

mod questionnaires;
pub mod routes;
mod segmentation;
mod tasks;
mod upload;

pub use routes::{serve, AppState};
