//! gdrelay Dify - Knowledge-base ingestion adapter
//!
//! Uploads relayed files to a Dify dataset through
//! `POST /v1/datasets/{dataset_id}/document/create-by-file`.
//!
//! ## Modules
//!
//! - [`client`] - Dataset API client and settings
//! - [`upload`] - Multipart upload with the single enriched retry

pub mod client;
pub mod upload;

pub use client::{DifyClient, DifySettings};
pub use upload::DifyIngestion;
