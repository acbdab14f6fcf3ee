//! Staffline site library.
//!
//! Public pages, the admin panel and the JSON content API of the Staffline
//! engraving studio, as a library so the router can be exercised in tests
//! and shared with the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod error;
pub mod filters;
pub mod github;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

pub use app::build_router;
pub use config::SiteConfig;
pub use state::AppState;
