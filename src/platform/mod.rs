//! Platform matrix: which OS/architecture pairs are released, and how each
//! maps to an npm package, executable name, and archive format.
//!
//! # Sub-modules
//!
//! - [`target`] - A single target (`PlatformTarget`) and `ArchiveFormat`.
//! - [`matrix`] - The validated, ordered `PlatformMatrix`.

pub mod matrix;
pub mod target;

pub use matrix::PlatformMatrix;
pub use target::{ArchiveFormat, PlatformTarget};
