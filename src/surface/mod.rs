//! # Surface Hosts
//!
//! Concrete implementations of [`crate::core::surface::Surface`].
//!
//! - [`http`]: fetches pages over HTTP(S) and keeps per-surface history
//! - [`html`]: turns fetched markup into a [`crate::core::document::Document`]

pub mod html;
pub mod http;

pub use http::{FetchError, HttpSurface, HttpSurfaceFactory};
