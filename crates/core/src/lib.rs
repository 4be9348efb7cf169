//! Core services for PitsaUz.
//!
//! This crate contains logic with ZERO web or database dependencies.
//!
//! # Modules
//!
//! - `storage` - Uploaded file storage on local disk

pub mod storage;
