//! Listing-scoped two-party messaging core for a marketplace: buyer and
//! seller converse about one listing, with per-message delivery state,
//! per-user presence, a mutual blocking relation gating sends, and a
//! realtime change bus backed by a reconciliation poll.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod realtime;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
