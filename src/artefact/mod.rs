//! Release archive handling: naming, retrieval, and binary extraction.
//!
//! # Sub-modules
//!
//! - [`naming`] - Archive naming policy (`ArchiveName`) and asset URLs.
//! - [`download`] - Fetch trait and the redirect-bounded HTTP implementation.
//! - [`extraction`] - Single-member extraction from tar.gz and zip archives.

pub mod download;
pub mod extraction;
pub mod naming;
