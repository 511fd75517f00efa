// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fatal configuration and construction errors.

use core::fmt;

/// Errors that prevent a [`DataSource`](crate::DataSource) or
/// [`Snapshot`](crate::Snapshot) from being built.
///
/// These are configuration mistakes with no safe default. Structural surprises
/// in the data itself are reported as [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataSourceError {
    /// No row extractor was supplied for a blob with no default extraction.
    MissingRowExtractor,
    /// No row comparator was supplied.
    MissingRowComparator,
    /// A multi-section snapshot was requested without a section header comparator.
    MissingSectionHeaderComparator,
    /// The number of row identity lists does not match the number of sections.
    IdentityShapeMismatch {
        /// Number of section identities supplied.
        sections: usize,
        /// Number of per-section row identity lists supplied.
        row_lists: usize,
    },
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRowExtractor => {
                f.write_str("a row extractor is required for blobs without default extraction")
            }
            Self::MissingRowComparator => f.write_str("a row comparator is required"),
            Self::MissingSectionHeaderComparator => f.write_str(
                "a section header comparator is required to build multi-section snapshots",
            ),
            Self::IdentityShapeMismatch {
                sections,
                row_lists,
            } => write!(
                f,
                "{sections} section identities were supplied with {row_lists} row identity lists"
            ),
        }
    }
}

impl core::error::Error for DataSourceError {}
