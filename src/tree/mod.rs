//! Tree scanning and content fingerprinting
//!
//! Walks a source or target tree into relative-path records and computes the
//! content fingerprints the target index is keyed on.

pub mod hasher;
pub mod path;
pub mod walker;
