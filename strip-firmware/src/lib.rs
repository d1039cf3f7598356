// Library-Root: Hardware-Anbindung und Tasks
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod tasks;

// Re-exports von strip-core
pub use strip_core::{CommandDispatcher, DispatchOutcome, Rejection, RenderError, StripRenderer};

use crate::config::LED_COUNT;

/// Dispatcher für den konfigurierten Strip
///
/// Validierung, Frame-Buffer und Renderer in einem; alle Logik ist in
/// strip-core und wird dort auf dem Host getestet (siehe strip-tests).
pub type StripDispatcher<R> = CommandDispatcher<R, LED_COUNT>;
