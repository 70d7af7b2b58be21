//! Property-based tests for the sync engine

mod plan_fidelity;
