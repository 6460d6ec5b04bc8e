#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the fartnode Solana transaction engine.
//!
//! This crate holds the chain-agnostic building blocks shared by the engine
//! ([`fartnode-svm`]) and the HTTP surfaces built on top of it. It carries no
//! Solana SDK dependency: everything here is plain configuration, text and
//! URL handling.
//!
//! # Modules
//!
//! - [`commitment`] - Commitment levels and the read/send purpose tag
//! - [`cluster`] - Cluster inference from endpoint URLs and explorer links
//! - [`config`] - The immutable engine configuration resolved once at startup
//! - [`encoding`] - Base64 wrapper used for transaction hand-off
//! - [`endpoint`] - Endpoint normalization and prioritized endpoint lists
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation
//!
//! [`fartnode-svm`]: https://docs.rs/fartnode-svm

pub mod cluster;
pub mod commitment;
pub mod config;
pub mod encoding;
pub mod endpoint;

pub use cluster::{Cluster, explorer_tx_url};
pub use commitment::{Commitment, RpcPurpose};
pub use config::{ConfigError, SolanaCoreConfig};
pub use endpoint::EndpointList;
