//! Strip Core - Platform-agnostic Logic and Traits
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Sie definiert Traits, Validierung, Frame-Buffer und den
//! Verbindungs-Zustandsautomaten als Pure Logic.

#![no_std]

extern crate alloc;

pub mod connectivity;
mod decode;
pub mod dispatch;
pub mod frame;
pub mod logic;
pub mod traits;
pub mod types;

// Re-exports für einfachen Zugriff
pub use connectivity::{
    Backoff, ConnectivityAction, ConnectivityEvent, ConnectivityMachine, KeepAlive,
    KeepAliveAction, LinkState, SubscriptionState,
};
pub use dispatch::{CommandDispatcher, DispatchOutcome};
pub use frame::{FrameBuffer, FrameUpdater};
pub use logic::parse_patch;
pub use traits::{RenderError, StripRenderer};
pub use types::{Patch, Rejection};
