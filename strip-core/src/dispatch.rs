//! Command Dispatcher: Nachricht → Validierung → Frame-Update
//!
//! Der Dispatcher loggt selbst nicht; er liefert ein [`DispatchOutcome`],
//! das der Aufrufer (MQTT-Task) protokolliert. Kein Ergebnis wird als
//! Fehler an den Transport weitergereicht.

use crate::frame::FrameUpdater;
use crate::logic::parse_patch;
use crate::traits::{RenderError, StripRenderer};
use crate::types::Rejection;

/// Ergebnis der Verarbeitung einer eingehenden Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Patch angewendet und Frame übertragen
    Applied,
    /// Patch angewendet, aber die Übertragung zum Strip schlug fehl
    ///
    /// Der Frame behält den neuen Zustand.
    AppliedRenderFailed(RenderError),
    /// Nachricht verworfen, Frame unverändert
    Rejected(Rejection),
}

impl DispatchOutcome {
    /// `true` wenn der Patch im Frame gelandet ist
    pub fn is_applied(self) -> bool {
        !matches!(self, DispatchOutcome::Rejected(_))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DispatchOutcome {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            DispatchOutcome::Applied => defmt::write!(fmt, "Applied"),
            DispatchOutcome::AppliedRenderFailed(e) => {
                defmt::write!(fmt, "AppliedRenderFailed({})", e)
            }
            DispatchOutcome::Rejected(r) => defmt::write!(fmt, "Rejected({})", r),
        }
    }
}

/// Verarbeitet Kommando-Nachrichten für einen Strip mit `N` LEDs
///
/// Besitzt den [`FrameUpdater`] (und damit Frame-Buffer und Renderer).
/// Nachrichten werden strikt nacheinander und ohne Unterbrechung
/// verarbeitet, damit gibt es genau einen Schreiber auf den Frame.
pub struct CommandDispatcher<R, const N: usize> {
    updater: FrameUpdater<R, N>,
}

impl<R: StripRenderer, const N: usize> CommandDispatcher<R, N> {
    pub fn new(renderer: R) -> Self {
        Self {
            updater: FrameUpdater::new(renderer),
        }
    }

    /// Verarbeitet die Payload einer Nachricht
    ///
    /// Der Topic-Name wird nur zur Protokollierung beim Aufrufer gebraucht,
    /// die Validierung hängt allein von der Payload ab.
    pub fn dispatch(&mut self, payload: &[u8]) -> DispatchOutcome {
        match parse_patch::<N>(payload) {
            Ok(patch) => match self.updater.apply(&patch) {
                Ok(()) => DispatchOutcome::Applied,
                Err(e) => DispatchOutcome::AppliedRenderFailed(e),
            },
            Err(rejection) => DispatchOutcome::Rejected(rejection),
        }
    }

    pub fn updater(&self) -> &FrameUpdater<R, N> {
        &self.updater
    }

    pub fn updater_mut(&mut self) -> &mut FrameUpdater<R, N> {
        &mut self.updater
    }
}
