// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_data_source --heading-base-level=0

//! Understory Data Source: diffed snapshots of sectioned list data.
//!
//! This crate answers one question for list and table views: given a new data
//! blob, which rows and section headers changed since the last rendered one?
//! It does not render, lay out, or virtualize anything; it only classifies data
//! as dirty or clean and offers ordered, addressable access to it.
//!
//! The core concepts are:
//!
//! - [`DataSourceBuilder`] / [`DataSource`]: a validated set of caller-supplied
//!   functions. A *row extractor* and *section header extractor* map a blob and
//!   an identity to renderable data; a *row comparator* and *section header
//!   comparator* decide whether two such values differ.
//! - [`Snapshot`]: an immutable aggregate of ordered section identities,
//!   per-section row identities, cached counts, and dirty bitmaps.
//!   Snapshots are derived from each other with the `clone_with_*` methods,
//!   which diff the new identities against the predecessor in `O(S + R)`.
//! - [`RowPosition`] and the flat-index helpers on [`Snapshot`]: translation
//!   between a single linear row offset and a `(section, row)` pair, for hosts
//!   that virtualize a flattened strip (for example with
//!   `understory_virtual_list`).
//! - [`SectionedBlob`] / [`RowCollection`]: optional shape traits. When a blob
//!   implements them, identities can be derived from its own key order and
//!   [`DataSourceBuilder::for_blob`] provides default nested-lookup extractors.
//!   Blobs that implement neither are still supported through explicit
//!   identities and extractors.
//! - [`Diagnostic`] / [`DiagnosticSink`]: non-fatal structural warnings such as
//!   duplicate identities or out-of-range queries. They are reported as
//!   `tracing` warnings by default.
//!
//! ## Minimal example
//!
//! ```rust
//! use understory_data_source::DataSourceBuilder;
//!
//! let source = DataSourceBuilder::<Vec<Vec<u32>>, _, _, _, _>::for_blob()
//!     .row_has_changed(|a, b| a != b)
//!     .section_header_has_changed(|_, _| false)
//!     .build()
//!     .unwrap();
//!
//! // The first snapshot has no predecessor, so everything is dirty.
//! let first = source
//!     .snapshot_with_rows_and_sections(vec![vec![1, 2, 3], vec![4]], None, None)
//!     .unwrap();
//! assert_eq!(first.dirty_row_count(), 4);
//!
//! // Only the changed row is dirty in the derived snapshot.
//! let second = first
//!     .clone_with_rows_and_sections(vec![vec![1, 2, 3], vec![5]], None, None)
//!     .unwrap();
//! assert_eq!(second.dirty_row_count(), 1);
//! assert!(second.row_should_update(1, 0));
//!
//! // Flat offset 3 is the first row of the second section.
//! assert_eq!(second.section_index_for_flat_index(3), Some(1));
//! assert_eq!(second.position_for_flat_index(4), None);
//! ```
//!
//! ## Single-section lists
//!
//! Plain row collections go through [`SingleSection`], which synthesizes one
//! implicit section with identity `()`. In this mode the section header
//! comparator is optional and defaults to "never changed".
//!
//! ```rust
//! use understory_data_source::{DataSourceBuilder, SingleSection};
//!
//! let source = DataSourceBuilder::<SingleSection<Vec<&str>>, _, _, _, _>::for_blob()
//!     .row_has_changed(|a, b| a != b)
//!     .build()
//!     .unwrap();
//!
//! let first = source.snapshot_with_rows(vec!["a", "b"], None);
//! let second = first.clone_with_rows(vec!["a", "c"], None);
//! assert_eq!(second.dirty_rows(0), Some(&[false, true][..]));
//! ```
//!
//! ## Duplicate identities
//!
//! Identities are expected to be unique (sections within a snapshot, rows
//! within a section). Duplicates are tolerated: they are reported through the
//! configured [`DiagnosticSink`] and identity addressing resolves to the later
//! occurrence.
//!
//! ## Concurrency
//!
//! Everything is synchronous. Snapshots are immutable and their callbacks are
//! `Send + Sync`, so snapshots can be shared across threads whenever the blob
//! and identity types allow it. The blob is retained by `Arc`, never copied;
//! callers must not mutate it through interior mutability after handing it over.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod blob;
mod config;
mod diagnostics;
mod diff;
mod error;
mod flat_index;
mod snapshot;

pub use blob::{Identity, RowCollection, SectionedBlob, SingleSection};
pub use config::{
    DataSource, DataSourceBuilder, HasChanged, RowExtractor, SectionHeaderExtractor,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, IgnoreDiagnostics, TracingSink};
pub use error::DataSourceError;
pub use flat_index::RowPosition;
pub use snapshot::Snapshot;
