//! Core types for Staffline.
//!
//! This module provides the content model: the allow-listed content types,
//! the typed documents stored for each of them, and type-safe identifiers.

pub mod content;
pub mod document;
pub mod html;
pub mod id;

pub use content::{ContentType, UnknownContentType};
pub use document::*;
pub use html::{HtmlPage, UnknownHtmlPage};
pub use id::{ContentId, IdError, slugify};
