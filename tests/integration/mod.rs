//! Integration tests for the relocase sync engine

mod cli_surface;
mod failure_handling;
mod index_persistence;
pub mod test_utils;
