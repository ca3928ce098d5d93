//! Streaming reader/writer traits.
//!
//! The central abstraction (§9's "iterator-of-events" design note) is a
//! lazy sequence of [`Event`](crate::event::Event)s, consumed once, with
//! side effects living at the tail (writer, counters, the loss observer).
//! `Rewind` and `TryClone` are unchanged from the teacher; they already
//! express exactly the "reopen the underlying stream" and "fallible clone"
//! operations this crate still needs. The resampling-specific traits
//! (`Resample`, `Unweight`, `ObserveCell`, `Progress`, the cell-oriented
//! `Write<Reader>`) have no counterpart here and are dropped.

use crate::event::RunInfo;

/// Rewind to the beginning of a stream.
pub trait Rewind {
    type Error;

    fn rewind(&mut self) -> Result<(), Self::Error>;
}

/// Try to clone this object.
///
/// Like [std::clone::Clone], but allowed to fail — cloning a file handle
/// is a syscall, not a pure operation.
pub trait TryClone {
    type Error;

    fn try_clone(&self) -> Result<Self, Self::Error>
    where
        Self: Sized;
}

impl<T: Clone> TryClone for T {
    type Error = std::convert::Infallible;

    fn try_clone(&self) -> Result<Self, Self::Error> {
        Ok(self.clone())
    }
}

/// A source of events with an eagerly-computable [`RunInfo`].
///
/// Every format reader implements both this and `Iterator<Item =
/// Result<Event, FormatError>>` plus `Rewind`; the convert pipeline only
/// ever interacts with formats through this trio. The error type is fixed
/// to `FormatError` across all formats (§7: only framing/IO failures ever
/// abort a reader; per-field defects are tolerated inline).
pub trait EventSource: Iterator<Item = Result<crate::event::Event, crate::formats::FormatError>> {
    fn run_info(&self) -> RunInfo;
}

/// Consume a stream of events plus their `RunInfo`.
///
/// `finish` takes `Box<Self>` rather than `Self` so the trait stays
/// object-safe: the convert pipeline holds writers as `Box<dyn
/// EventSink>`, since the concrete writer type depends on the output
/// format resolved at runtime.
pub trait EventSink {
    fn write_event(&mut self, event: &crate::event::Event) -> Result<(), crate::formats::FormatError>;

    fn finish(self: Box<Self>) -> Result<(), crate::formats::FormatError>;
}
