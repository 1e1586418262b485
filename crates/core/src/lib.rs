//! Vivero Core - Shared types library.
//!
//! This crate provides common types used across all Vivero components:
//! - `storefront` - Public-facing nursery shop
//! - `admin` - Back-office panel
//! - `cli` - Command-line tools for migrations, seeding and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure business rules - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, statuses
//!   and the checkout arithmetic shared by the storefront and admin.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
