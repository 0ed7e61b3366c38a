//! Client-side x402 payment flow over Monero.
//!
//! Implements the pay-per-request handshake against a Monero x402
//! facilitator: obtain a priced invoice (directly or from a 402 challenge),
//! pay it through a local wallet daemon, wait out mempool propagation, and
//! submit payment evidence to unlock the resource.
//!
//! # Components
//!
//! - [`facilitator`] - HTTP client for the facilitator's invoice, verify, and
//!   settle endpoints
//! - [`wallet`] - JSON-RPC client for the paying wallet daemon
//! - [`resource`] - protected-resource fetching, 402 challenge parsing, and
//!   header-based proof retry
//! - [`proof`] - proof submission strategies and outcome normalization
//! - [`flow`] - the one-shot orchestrator tying the steps together
//! - [`config`] - CLI and environment configuration
//! - [`telemetry`] - logging setup
//!
//! The wire types live in the `x402-monero-types` crate.

pub mod config;
pub mod facilitator;
pub mod flow;
pub mod proof;
pub mod resource;
pub mod sig_down;
pub mod telemetry;
pub mod wallet;
