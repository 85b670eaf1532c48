//! # Luciq Intelligence Pipeline
//!
//! Core library for Luciq: platform clients (C1), the quality, credibility,
//! semantic, pain-point, clustering, temporal, and fusion engines (C2-C8),
//! the conversational orchestrator (C9), persistence (C10), and the
//! orchestrator that wires them into one fetch-to-opportunities cycle.

pub mod config;
pub mod connectors;
pub mod db;
pub mod engines;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod store;
pub mod telemetry;
#[cfg(test)]
mod test_support;
pub use migration;
