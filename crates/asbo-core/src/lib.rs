//! Core data types for the ASBO package tool.
//!
//! This crate defines the fundamental types that represent an ASBO project:
//! semantic version constraints, dependencies and their targets, the project
//! manifest, workspace source configuration, and path templates.
//!
//! This crate is intentionally free of network and archive I/O.

pub mod dependency;
pub mod manifest;
pub mod template;
pub mod version;
pub mod workspace;
