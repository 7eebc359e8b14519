//! The exploration orchestrator.
//!
//! [`Explorer`] owns the observer state machine (phase, accumulated places,
//! highlight, driving epoch) and the narration channel. [`Session`] drives
//! it from a location source and a command queue.
//!
//! ```text
//! LocationSource ─▶ Session ─▶ Explorer ─▶ ContextProvider
//!                      ▲           │
//!   SessionHandle ─────┘           ├─▶ NarrationProvider ─▶ AudioChannel
//!                                  └─▶ watch snapshot + EventBus
//! ```

mod config;
mod error;
mod explorer;
mod places;
mod session;
mod state;
mod wake_lock;

pub use config::ExplorerConfig;
pub use error::{ExplorerError, Result};
pub use explorer::{Explorer, ExplorerBuilder, ExploreOutcome, IgnoreReason};
pub use places::PlaceSet;
pub use session::{Session, SessionClosed, SessionCommand, SessionHandle};
pub use state::ExplorerSnapshot;
pub use wake_lock::{NullWakeLock, WakeLock, WakeLockError};

pub use roadlore_context::{ExploreMode, Phase, Place};
