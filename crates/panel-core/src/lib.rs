//! # panel-core
//!
//! Core types, ID prefixes, and error types for Panel.
//!
//! This crate provides the foundational types shared across all Panel crates:
//! - Entity structs for reviewed items, review assignments, users and audit entries
//! - Status enums with state machine transitions
//! - The fixed-shape criteria sheet a reviewer fills in
//! - Caller identity and capability checks
//! - Pure consensus and reviewer selection rules
//! - Cross-cutting error types
//! - Audit detail sub-types and service response types

pub mod audit_detail;
pub mod consensus;
pub mod criteria;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod identity;
pub mod ids;
pub mod responses;
pub mod selection;
