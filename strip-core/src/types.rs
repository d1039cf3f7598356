//! Core Types für die LED-Strip-Steuerung
//!
//! Datenstrukturen ohne Hardware-Dependencies

use alloc::vec::Vec;
use core::fmt;

use rgb::RGB8;

/// Validierte Schreib-Anweisung für einen Strip mit `N` LEDs
///
/// `N` ist Teil des Typs: ein `Patch<N>` garantiert
/// `offset + colors.len() <= N` und lässt sich nur auf einen
/// Frame-Buffer derselben Länge anwenden. Entsteht nur über
/// [`Patch::new`] oder den Validator ([`crate::parse_patch`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch<const N: usize> {
    offset: usize,
    colors: Vec<RGB8>,
}

impl<const N: usize> Patch<N> {
    /// Erstellt einen Patch mit Bereichsprüfung gegen `N`
    ///
    /// # Fehlerbehandlung
    /// - `InvalidDataLength` wenn `colors` leer ist
    /// - `IndexOutOfRange` wenn `offset >= N`
    /// - `RangeOverflow` wenn `offset + colors.len()` überläuft oder größer als `N` ist
    pub fn new(offset: usize, colors: Vec<RGB8>) -> Result<Self, Rejection> {
        if colors.is_empty() {
            return Err(Rejection::InvalidDataLength);
        }
        if offset >= N {
            return Err(Rejection::IndexOutOfRange);
        }
        check_span(offset, colors.len(), N)?;
        Ok(Self { offset, colors })
    }

    /// Index des ersten Pixels, das überschrieben wird
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Neue Farben ab `offset`
    pub fn colors(&self) -> &[RGB8] {
        &self.colors
    }

    /// Anzahl der betroffenen Pixel
    pub fn span(&self) -> usize {
        self.colors.len()
    }

    /// Exklusives Ende des Bereichs (`offset + span`), nie größer als `N`
    pub fn end(&self) -> usize {
        // Überlauf bereits im Konstruktor ausgeschlossen
        self.offset + self.colors.len()
    }
}

/// Prüft `offset + span <= pixel_count` ohne Überlauf
///
/// Index und Span kommen beide vom Absender, daher `checked_add`.
pub(crate) fn check_span(offset: usize, span: usize, pixel_count: usize) -> Result<(), Rejection> {
    match offset.checked_add(span) {
        Some(end) if end <= pixel_count => Ok(()),
        _ => Err(Rejection::RangeOverflow),
    }
}

/// Grund für das Verwerfen einer Kommando-Nachricht
///
/// Alle Varianten sind behebbar: die Nachricht wird verworfen,
/// der Frame-Buffer bleibt unverändert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Payload ist kein gültiges JSON
    MalformedDocument,
    /// `led_index` vorhanden, aber keine ganze Zahl
    InvalidIndexType,
    /// `led_index` liegt nicht in `[0, N)`
    IndexOutOfRange,
    /// `led_data` fehlt
    MissingData,
    /// `led_data` ist kein Array
    InvalidDataType,
    /// Länge von `led_data` ist 0 oder kein Vielfaches von 3
    InvalidDataLength,
    /// `led_index + led_data.len() / 3` läuft über oder ist größer als `N`
    RangeOverflow,
    /// Ein Element von `led_data` ist keine ganze Zahl in `[0, 255]`
    InvalidColorValue,
}

impl Rejection {
    /// Kurze Beschreibung für Log-Ausgaben
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::MalformedDocument => "payload is not valid JSON",
            Rejection::InvalidIndexType => "`led_index` should be an integer",
            Rejection::IndexOutOfRange => "`led_index` out of range",
            Rejection::MissingData => "missing `led_data`",
            Rejection::InvalidDataType => "`led_data` must be an array of integers",
            Rejection::InvalidDataLength => "invalid `led_data` size",
            Rejection::RangeOverflow => "too many LEDs in `led_data`",
            Rejection::InvalidColorValue => "`led_data` values must be integers in [0,255]",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::error::Error for Rejection {}

// ============================================================================
// defmt::Format Implementations (optional feature)
// ============================================================================

#[cfg(feature = "defmt")]
impl defmt::Format for Rejection {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl<const N: usize> defmt::Format for Patch<N> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Patch {{ offset: {}, span: {}, strip: {} }}",
            self.offset,
            self.colors.len(),
            N
        )
    }
}
