//! Hardware Abstraction Traits
//!
//! Diese Traits definieren Schnittstellen für Hardware-Zugriff
//! ohne konkrete Implementierung.

use core::fmt;

use rgb::RGB8;

/// Fehler-Typ für Strip-Übertragungen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// Hardware hat die Übertragung abgelehnt oder abgebrochen
    TransmissionFailed,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::TransmissionFailed => f.write_str("strip transmission failed"),
        }
    }
}

impl core::error::Error for RenderError {}

#[cfg(feature = "defmt")]
impl defmt::Format for RenderError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            RenderError::TransmissionFailed => defmt::write!(fmt, "Transmission failed"),
        }
    }
}

/// Trait für den Zugriff auf einen adressierbaren LED-Strip
///
/// Abstrahiert die Übertragung des kompletten Frames auf WS2812/Neopixel LEDs.
///
/// # Implementierungen
/// - **Production:** RmtStripWriter (ESP32 RMT Peripheral)
/// - **Testing:** MockStripRenderer (in-memory Mock)
pub trait StripRenderer: Send {
    /// Überträgt alle Pixel in Reihenfolge auf den Strip
    ///
    /// `pixels.len()` ist immer die volle Strip-Länge `N`.
    ///
    /// # Fehlerbehandlung
    /// Gibt `RenderError::TransmissionFailed` zurück wenn Hardware-Zugriff fehlschlägt
    fn render(&mut self, pixels: &[RGB8]) -> Result<(), RenderError>;
}
