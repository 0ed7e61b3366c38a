//! Wire types for x402 payments over Monero.
//!
//! This crate provides the foundational types used by the x402-monero client
//! for HTTP 402 Payment Required flows settled over Monero. It contains no
//! I/O: the HTTP and wallet RPC clients live in the `x402-monero` crate.
//!
//! # Overview
//!
//! A facilitator issues an [`proto::Invoice`] naming a receiving address and
//! an atomic-unit amount. The payer sends that amount through a local wallet,
//! obtaining a transaction id and optionally a private transaction key. The
//! resulting [`proto::PaymentProof`] is submitted back to the facilitator,
//! which answers with a settlement status.
//!
//! # Modules
//!
//! - [`amount`] - Atomic-unit and human-readable amount newtypes
//! - [`network`] - Monero network identifiers (CAIP-style `monero:stagenet`)
//! - [`proto`] - Wire format types for invoices, proofs, and settlement

pub mod amount;
pub mod network;
pub mod proto;
