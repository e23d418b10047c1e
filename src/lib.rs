//! # scopus-report
//!
//! Builds a publication and citation report for one researcher from the
//! Scopus API.
//!
//! ## Modules
//!
//! - [`scopus`] - Scopus API client (author, metrics, document ids, abstracts)
//! - [`endpoints`] - Endpoint table and URL construction
//! - [`transform`] - Raw response normalization
//! - [`models`] - Normalized records
//! - [`report`] - Aggregate report, JSON/CSV persistence
//! - [`pipeline`] - Extract/transform/load driver
//! - [`config`] - Run configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scopus_report::{config::Config, pipeline};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Path::new("conf.json"))?;
//!     let report = pipeline::run(&config, Path::new("result.json")).await?;
//!     println!("{} documents", report.documents.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod scopus;
pub mod transform;

pub use error::{Result, ScopusError};
