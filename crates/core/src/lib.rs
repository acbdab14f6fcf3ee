//! Staffline Core - Content model library.
//!
//! This crate provides the content types shared by all Staffline components:
//! - `site` - Public website, admin panel and JSON content API
//! - `cli` - Command-line tools for content migration and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! clients, no HTTP. Storage lives in the site crate, which persists each
//! [`ContentDocument`] as one JSON blob under `clean-data/`.
//!
//! # Modules
//!
//! - [`types`] - Content types, documents, identifiers and HTML page names
//! - [`validate`] - Write-path normalization (ids, timestamps, uniqueness)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validate;

pub use types::*;
pub use validate::{ValidationError, prepare_write};
