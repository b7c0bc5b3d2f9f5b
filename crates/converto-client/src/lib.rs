//! HTTP client SDK for the Converto backend.
//!
//! Typed wrappers over the backend's REST API. Every request carries the
//! session token issued by `converto-oauth` (or by password login).
//!
//! # Example
//!
//! ```no_run
//! use converto_client::{ConvertoClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = ConvertoClient::builder()
//!     .base_url("http://localhost:8000/api")
//!     .auth_token("session-token")
//!     .build()?;
//!
//! if client.health().is_healthy().await {
//!     let overview = client.tasks().overview().await?;
//!     println!("{} tasks, {:.0}% succeeded", overview.total_tasks, overview.success_rate());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **Auth**: password login, email lookup, sign-up
//! - **Convert**: batched conversion merged into one zip
//! - **Compress**: image, audio and video compression
//! - **Background**: background removal
//! - **Tasks**: task history and dashboard overview
//! - **User**: account preferences
//! - **Health**: backend health check

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use api::ConvertOutput;
pub use client::{ClientBuilder, ConvertoClient, DEFAULT_BASE_URL};
pub use error::{Error, Result};
pub use types::*;
