//! photo-grid - random Flickr photo grid
//!
//! Fetches a random page of the account's photos, renders it as HTML table
//! rows and caches the result so most requests never reach Flickr.
//!
//! ## Components
//!
//! - **Flickr**: signed `flickr.photos.search` client
//! - **Render**: photos to `<tr>`/`<td>` grid markup
//! - **Cache**: page cache validated against the collection's photo count,
//!   backed by memcached or an in-process store
//! - **Service**: picks the page, consults the cache, falls back to Flickr
//! - **Server**: HTTP endpoint for hosts embedding the grid

pub mod cache;
pub mod config;
pub mod flickr;
pub mod render;
pub mod server;
pub mod service;
pub mod types;

pub use config::{Args, GridDimensions, GridSettings};
pub use service::GridService;
pub use types::{GridError, Result};
