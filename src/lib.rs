//! # QuickPin API
//!
//! Client library for the QuickPin social media intelligence API.
//!
//! QuickPin ingests Twitter and Instagram profiles on request, indexes them,
//! and exposes search plus a live notification feed. This crate
//! authenticates against a deployment, submits batches of profiles for
//! ingestion, runs searches, fetches arbitrary API resources and listens to
//! the notification stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────┐   ┌───────────────┐
//! │  Input    │──▶│ Normalizer  │──▶│   Submitter   │──▶ POST /api/profile/
//! │ ids/names │   │ ProfileRec  │   │ chunk + pace  │
//! └───────────┘   └─────────────┘   └───────────────┘
//!
//! ┌───────────┐   ┌─────────────┐
//! │   Auth    │──▶│  QuickPin   │──▶ GET /api/search/, GET <resource>,
//! │ token     │   │  (X-Auth)   │    GET /api/notification/ (SSE)
//! └───────────┘   └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use quickpin_api::{Auth, ClientConfig, Credentials, QuickPin, Site, SubmitOptions};
//!
//! # async fn run() -> quickpin_api::Result<()> {
//! let client = QuickPin::connect(
//!     ClientConfig::new("https://quickpin.example.com"),
//!     Auth::Credentials(Credentials::new("guest", "password")),
//! )
//! .await?;
//!
//! let mut submission = client.submit_usernames(
//!     &["hyperiongray", "darpa"],
//!     Site::Twitter,
//!     None,
//!     SubmitOptions::default(),
//! )?;
//! while let Some(result) = submission.next().await {
//!     println!("{}", result?.text());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Credentials, tokens, login |
//! | [`client`] | Authenticated client |
//! | [`config`] | Client and submission settings, TOML file |
//! | [`models`] | Profile records and search parameters |
//! | [`normalize`] | Raw identifiers to profile records |
//! | [`input`] | Input file parsing |
//! | [`submit`] | Chunked, paced submission |
//! | [`query`] | Search and resource fetches |
//! | [`notify`] | Notification stream |
//! | [`progress`] | Submission progress reporting |
//! | [`error`] | Error taxonomy |

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod input;
pub mod models;
pub mod normalize;
pub mod notify;
pub mod progress;
pub mod query;
pub mod submit;

pub use auth::{Auth, Credentials, Token};
pub use client::QuickPin;
pub use config::{ClientConfig, SubmitOptions};
pub use error::{QpiError, Result};
pub use models::{Identity, IdentityKind, Notification, ProfileRecord, SearchQuery, Site};
pub use normalize::{LabelMap, LabelSpec};
pub use notify::NotificationStream;
pub use submit::{Submission, SubmissionResult, SubmitOutcome};
