//! LinkedIn Lead Sync Library
//!
//! Authenticates a user against LinkedIn via OAuth2, pulls lead-generation
//! form submissions for an ad account, flattens them into one row per
//! answered question and forwards the rows to a webhook and a CSV file.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `export`: CSV export with a write-permission probe.
//! - `flatten`: Lead to answer-row flattening.
//! - `handlers`: HTTP handlers, application state and router.
//! - `html`: HTML page rendering.
//! - `lead_sync`: Sync pipeline orchestration.
//! - `linkedin_client`: LinkedIn Marketing REST client.
//! - `linkedin_models`: LinkedIn payloads and output rows.
//! - `normalize`: URN and timestamp normalization.
//! - `oauth`: Authorization-code flow.
//! - `session`: Server-side sessions and the auth extractor.
//! - `webhook_publisher`: Webhook delivery.

pub mod config;
pub mod errors;
pub mod export;
pub mod flatten;
pub mod handlers;
pub mod html;
pub mod lead_sync;
pub mod linkedin_client;
pub mod linkedin_models;
pub mod normalize;
pub mod oauth;
pub mod session;
pub mod webhook_publisher;
