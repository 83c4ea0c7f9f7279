//! Extension libraries registered on top of the standard library.

mod semver_ext;

pub use semver_ext::{compare_versions, semver_compare, semver_extension, SEMVER_COMPARE};
