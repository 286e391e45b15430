// src/api/mod.rs
//! Notion API interaction: querying the content database, updating rows and
//! bootstrapping the schema.
//!
//! I/O (`client`), parsing (`parser`) and request shapes (`queries`) are kept
//! apart so the parts that decide which row gets posted are testable without
//! a network.

pub mod client;
pub mod parser;
pub mod queries;
mod responses;
pub mod schema;
mod simple_pagination;
pub mod source;

pub use client::{ApiResponse, NotionHttpClient};
pub use responses::CreatedObject;
pub use schema::PageAccess;
pub use source::NotionContentSource;
