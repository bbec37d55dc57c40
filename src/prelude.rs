//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust
//! use pong_client::prelude::*;
//! ```

// Core types
pub use crate::Error;
pub use crate::Result;

// Session
pub use crate::session::{BootstrapOutcome, Session, SessionState};

// Authentication
pub use crate::auth::{AuthStrategy, Credential};

// Domain calls
pub use crate::api::{Api, Friend, FriendStatus, MatchRecord, Presence};

// Shared state
pub use crate::cache::{Cache, EntryStatus};
pub use crate::events::{EventBus, SessionEvent};

// Storage
pub use crate::storage::{ClientStorage, Profile};
