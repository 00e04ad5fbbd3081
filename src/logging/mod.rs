//! Log sink capability and the in-memory log ring.
//!
//! Child output pumps format each line (`[name][pid] text`, stderr adds
//! `[ERROR]`) and hand it to a [`SinkHandle`]. The handle is shared between
//! the supervisor, the manager, and every runtime, so swapping the sink in one
//! place re-routes all pumps at once.
//!
//! ## Overview
//! - [`sink`] — the [`LogSink`] trait, the swappable [`SinkHandle`], and the
//!   stock sinks ([`StdoutSink`], [`TeeSink`], [`PrefixSink`]).
//! - [`buffer`] — the bounded [`LogBuffer`] ring and its [`BufferSink`] adapter.
//!
//! ## Rules
//! - Sinks are called from output-pump tasks; they must not block and must
//!   never take a manager or runtime lock.
//! - The ring holds the most recent lines only; on overflow the oldest line
//!   is dropped.

mod buffer;
mod sink;

pub use buffer::{BufferSink, LogBuffer};
pub use sink::{LogSink, PrefixSink, SinkHandle, StdoutSink, TeeSink};
