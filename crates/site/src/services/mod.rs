//! Business logic services for the site.
//!
//! # Services
//!
//! - `auth` - Admin login: password check, session tokens, failed-login throttling
//! - `content` - Typed, cached access to the JSON content documents and HTML pages
//! - `upload` - Image validation, thumbnails and storage

pub mod auth;
pub mod content;
pub mod upload;
