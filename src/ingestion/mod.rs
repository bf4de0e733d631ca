//! Ingestion: turning external sources into retrievable chunks.
//!
//! * [`loader`] — format-specific back-ends (PDF, plain text, transcripts).
//! * [`normalize`] — whitespace/control-character canonicalization.
//! * [`chunker`] — fixed-size separator splitting with overlap.

pub mod chunker;
pub mod loader;
pub mod normalize;

pub use chunker::{ChunkerConfig, split};
pub use loader::{DocumentFormat, SourceDescriptor, load};
pub use normalize::normalize;
