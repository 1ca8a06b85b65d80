// crates/dbmock-config/src/lib.rs
// ============================================================================
// Module: dbmock Config Library
// Description: Canonical config model and validation for mock instances.
// Purpose: Single source of truth for dbmock.toml semantics.
// Dependencies: dbmock-core, serde, toml
// ============================================================================

//! ## Overview
//! `dbmock-config` defines the TOML configuration model for a mock driver
//! instance. Validation is strict and fails closed; a validated config is
//! turned into `dbmock_core::MockOptions` with [`MockConfig::to_options`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
