// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Non-fatal diagnostics.
//!
//! Structural surprises (duplicate identities, out-of-range queries) never
//! abort construction or panic. They are reported to a [`DiagnosticSink`]
//! configured on the [`DataSource`](crate::DataSource), and the engine carries
//! on with best-effort output.
//!
//! The default sink, [`TracingSink`], turns every diagnostic into a
//! `tracing` `WARN` event with target `understory_data_source`.

use core::fmt;

/// The category of a [`Diagnostic`], without its payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// See [`Diagnostic::DuplicateSectionId`].
    DuplicateSectionId,
    /// See [`Diagnostic::DuplicateRowId`].
    DuplicateRowId,
    /// See [`Diagnostic::RowOutOfBounds`].
    RowOutOfBounds,
    /// See [`Diagnostic::SectionOutOfBounds`].
    SectionOutOfBounds,
}

/// A non-fatal structural warning.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic<'a, S, R> {
    /// A section identity appears more than once in a snapshot.
    ///
    /// Identity addressing resolves to the later occurrence.
    DuplicateSectionId {
        /// The repeated identity.
        id: &'a S,
        /// Index of the earlier occurrence.
        first: usize,
        /// Index of the occurrence that now wins addressing.
        duplicate: usize,
    },
    /// A row identity appears more than once within one section.
    ///
    /// Identity addressing resolves to the later occurrence.
    DuplicateRowId {
        /// The section holding the repeated row.
        section: &'a S,
        /// The repeated identity.
        id: &'a R,
        /// Row index of the earlier occurrence.
        first: usize,
        /// Row index of the occurrence that now wins addressing.
        duplicate: usize,
    },
    /// A row was queried by a position the snapshot does not contain.
    RowOutOfBounds {
        /// Requested section index.
        section_index: usize,
        /// Requested row index.
        row_index: usize,
    },
    /// A section was queried by an index the snapshot does not contain.
    SectionOutOfBounds {
        /// Requested section index.
        section_index: usize,
    },
}

impl<S, R> Diagnostic<'_, S, R> {
    /// Returns the payload-free category of this diagnostic.
    #[must_use]
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::DuplicateSectionId { .. } => DiagnosticKind::DuplicateSectionId,
            Self::DuplicateRowId { .. } => DiagnosticKind::DuplicateRowId,
            Self::RowOutOfBounds { .. } => DiagnosticKind::RowOutOfBounds,
            Self::SectionOutOfBounds { .. } => DiagnosticKind::SectionOutOfBounds,
        }
    }
}

impl<S: fmt::Debug, R: fmt::Debug> fmt::Display for Diagnostic<'_, S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSectionId {
                id,
                first,
                duplicate,
            } => write!(
                f,
                "section identity {id:?} appears at {first} and {duplicate}; \
                 dirty-bit addressing uses {duplicate}"
            ),
            Self::DuplicateRowId {
                section,
                id,
                first,
                duplicate,
            } => write!(
                f,
                "row identity {id:?} appears twice in section {section:?} (rows {first} and \
                 {duplicate}); dirty-bit addressing uses {duplicate}"
            ),
            Self::RowOutOfBounds {
                section_index,
                row_index,
            } => write!(
                f,
                "row ({section_index}, {row_index}) is outside the current snapshot"
            ),
            Self::SectionOutOfBounds { section_index } => {
                write!(f, "section {section_index} is outside the current snapshot")
            }
        }
    }
}

/// A callback sink for non-fatal diagnostics.
///
/// Closures of the form `Fn(Diagnostic<'_, S, R>)` implement this trait, which
/// is handy for collecting diagnostics in tests.
pub trait DiagnosticSink<S, R> {
    /// Called once per diagnostic.
    fn report(&self, diagnostic: Diagnostic<'_, S, R>);
}

impl<S, R, F> DiagnosticSink<S, R> for F
where
    F: Fn(Diagnostic<'_, S, R>),
{
    fn report(&self, diagnostic: Diagnostic<'_, S, R>) {
        self(diagnostic);
    }
}

/// Reports diagnostics as `tracing` warnings.
///
/// This is the sink used when none is configured.
#[derive(Copy, Clone, Debug, Default)]
pub struct TracingSink;

impl<S: fmt::Debug, R: fmt::Debug> DiagnosticSink<S, R> for TracingSink {
    fn report(&self, diagnostic: Diagnostic<'_, S, R>) {
        tracing::warn!(
            target: "understory_data_source",
            kind = ?diagnostic.kind(),
            "{diagnostic}"
        );
    }
}

/// Drops every diagnostic.
#[derive(Copy, Clone, Debug, Default)]
pub struct IgnoreDiagnostics;

impl<S, R> DiagnosticSink<S, R> for IgnoreDiagnostics {
    fn report(&self, _diagnostic: Diagnostic<'_, S, R>) {}
}
