//! Pure Business Logic: Validierung von Kommando-Nachrichten
//!
//! Funktionen ohne Hardware-Dependencies (testbar!)

use alloc::vec::Vec;

use rgb::RGB8;

use crate::decode::{DataField, Scalar, decode_document};
use crate::types::{Patch, Rejection, check_span};

/// Validiert eine Kommando-Nachricht und erzeugt daraus einen [`Patch`]
///
/// Erwartetes Format:
///
/// ```json
/// { "led_index": 2, "led_data": [255, 0, 0, 0, 255, 0] }
/// ```
///
/// - `led_index` (optional, Default 0): ganze Zahl in `[0, N)`
/// - `led_data` (Pflicht): RGB-Tripel, Länge ein positives Vielfaches von 3
///
/// Die Prüfungen laufen in fester Reihenfolge; der erste Fehler gewinnt.
/// Die Farben werden erst nach Längen- und Bereichsprüfung eingesammelt;
/// ein einziger ungültiger Wert verwirft die ganze Nachricht.
///
/// # Beispiele
///
/// ```
/// # use rgb::RGB8;
/// # use strip_core::parse_patch;
/// let patch = parse_patch::<10>(br#"{"led_index":2,"led_data":[1,2,3]}"#).unwrap();
/// assert_eq!(patch.offset(), 2);
/// assert_eq!(patch.colors(), &[RGB8 { r: 1, g: 2, b: 3 }]);
/// ```
pub fn parse_patch<const N: usize>(payload: &[u8]) -> Result<Patch<N>, Rejection> {
    let document = decode_document(payload).map_err(|_| Rejection::MalformedDocument)?;

    let offset = match document.led_index {
        None => 0,
        Some(Scalar::Whole(index)) => usize::try_from(index)
            .ok()
            .filter(|&index| index < N)
            .ok_or(Rejection::IndexOutOfRange)?,
        Some(Scalar::Fractional | Scalar::NotNumber) => return Err(Rejection::InvalidIndexType),
    };

    let channels = match document.led_data {
        None => return Err(Rejection::MissingData),
        Some(DataField::NotArray) => return Err(Rejection::InvalidDataType),
        Some(DataField::Array(channels)) => channels,
    };

    if channels.is_empty() || channels.len() % 3 != 0 {
        return Err(Rejection::InvalidDataLength);
    }
    let span = channels.len() / 3;
    check_span(offset, span, N)?;

    let colors = channels
        .chunks_exact(3)
        .map(|rgb| match *rgb {
            [Some(r), Some(g), Some(b)] => Some(RGB8 { r, g, b }),
            _ => None,
        })
        .collect::<Option<Vec<RGB8>>>()
        .ok_or(Rejection::InvalidColorValue)?;

    Patch::new(offset, colors)
}
