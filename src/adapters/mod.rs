//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (blockchain RPC).
//!
//! Adapter categories:
//! - `chain`: Catch contracts via alloy-rs

pub mod chain;
