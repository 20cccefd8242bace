//! Background tracking of deployed notetaker bots.
//!
//! One `TranscriptPoller` task per bot session, spawned through the
//! `PollerSet`, with a process-wide best-effort `TranscriptCache` as a
//! secondary read source.

pub mod cache;
pub mod fetch;
pub mod poller;
pub mod supervisor;

pub use cache::TranscriptCache;
pub use fetch::{FetchError, HttpTranscriptFetcher, TranscriptFetcher};
pub use poller::{PollerConfig, TranscriptPoller};
pub use supervisor::PollerSet;
