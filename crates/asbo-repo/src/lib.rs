//! Repository access for ASBO: pluggable backends for listing, fetching, and
//! publishing packages, the zip archive store, and the on-disk package cache.

pub mod archive;
pub mod backend;
pub mod cache;
pub mod file;
pub mod ftp;
pub mod teamcity;
