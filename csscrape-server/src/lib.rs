//! HTTP front end for the stylesheet scraper.
//!
//! # Routes
//!
//! - `GET /api/get-css?url=<url>[&absolute=true]` - every stylesheet of the
//!   page concatenated in cascade order, as `text/css`
//! - `GET /api/get-origins?url=<url>` - the same scrape as JSON, one entry
//!   per origin plus the skipped references
//! - `GET /healthz` - liveness probe, always `{}`

/// Warp filters and handlers.
pub mod routes;

pub use routes::routes;
