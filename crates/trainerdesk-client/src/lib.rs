//! HTTP client SDK for the TrainerDesk task API.
//!
//! This crate provides a typed client for the endpoints a resume import
//! console drives: batch submission, task status polling and cancellation.
//!
//! # Example
//!
//! ```no_run
//! use trainerdesk_client::{TrainerDeskClient, UploadBatch, UploadFile, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = TrainerDeskClient::builder()
//!     .base_url("http://localhost:8000")
//!     .auth_token("secret")
//!     .build()?;
//!
//! let batch = UploadBatch::new().with_file(UploadFile::new("jane.pdf", b"%PDF-1.7".to_vec()));
//! let submitted = client.tasks().submit(&batch).await?;
//!
//! if let Some(id) = submitted.task_id {
//!     let status = client.tasks().status(&id).await?;
//!     println!("{} is {}", id, status.state);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Response classification
//!
//! Replies that are documents rather than JSON (an HTML error page served by
//! a proxy, for instance) surface as [`Error::UnexpectedContent`], separate
//! from API errors and connection failures. See [`Error::is_malformed`].

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiRoutes, ClientBuilder, TASK_ID_PLACEHOLDER, TrainerDeskClient};
pub use error::{Error, Result};
pub use types::*;
