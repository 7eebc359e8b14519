//! Observer positions and the location source adapter.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                             │
//! │  position.rs - Position / Fix values (pure)                 │
//! │  source.rs   - LocationSource trait, options, errors        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Infrastructure Layer                        │
//! │  feed.rs  - channel-fed source with staleness/timeout policy│
//! │  watch.rs - cancellable continuous subscription             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A device GPS (or a replayed track) pushes readings into a
//! [`FeedLocationSource`]; consumers either ask for a one-shot position or
//! subscribe to a [`LocationWatch`].

mod feed;
mod position;
mod source;
mod watch;

pub use feed::{FeedEvent, FeedLocationSource, DEFAULT_FEED_CAPACITY};
pub use position::{Fix, Position};
pub use source::{LocationError, LocationOptions, LocationSource, Result};
pub use watch::LocationWatch;
