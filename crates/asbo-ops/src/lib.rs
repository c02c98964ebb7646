//! Operations for the ASBO CLI: each module wires the core crates together
//! for one user-facing action.

pub mod ops_cache;
pub mod ops_fetch;
pub mod ops_publish;
pub mod ops_tree;
pub mod packager;
