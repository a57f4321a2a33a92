//! Common utilities for the csscrape crates.
//!
//! This crate provides shared infrastructure used by the scraper components:
//! - **URL Resolver** - turn partial URLs into absolute ones
//! - **Fetch Layer** - the [`net::Fetcher`] seam and its HTTP implementation
//! - **Warning System** - colored terminal output for skipped resources

pub mod net;
pub mod url;
pub mod warning;

pub use net::{DataUrl, FetchConfig, FetchError, FetchedResource, Fetcher, HttpFetcher};
pub use self::url::{resolve, resolve_against};
