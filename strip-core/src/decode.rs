//! Typisierte Zwischenrepräsentation des Kommando-Dokuments
//!
//! Das JSON-Dokument wird direkt beim Parsen klassifiziert: jeder Wert ist
//! danach entweder eine ganze Zahl, eine Zahl mit Nachkommastellen oder gar
//! keine Zahl. Die Prüfungen in [`crate::logic`] arbeiten nur noch auf
//! diesen Typen, nie auf rohem JSON.

use alloc::vec::Vec;
use core::fmt;

use serde::de::{Deserialize, Deserializer, Error, IgnoredAny, MapAccess, SeqAccess, Visitor};

/// Ab 2^53 hat ein f64 keine Nachkommastellen mehr
const F64_EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Skalarer JSON-Wert, nach Ganzzahligkeit klassifiziert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scalar {
    /// Ganze Zahl (auch `2.0` oder `1e2`), sehr große Werte gesättigt
    Whole(i128),
    /// Zahl mit Nachkommastellen
    Fractional,
    /// String, Bool, null, Array oder Objekt
    NotNumber,
}

impl Scalar {
    fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Scalar::NotNumber;
        }
        if value >= F64_EXACT_LIMIT || value <= -F64_EXACT_LIMIT {
            return Scalar::Whole(value as i128);
        }
        let truncated = value as i64;
        if truncated as f64 == value {
            Scalar::Whole(truncated as i128)
        } else {
            Scalar::Fractional
        }
    }

    /// Wert als Farbkanal, falls ganzzahlig und in `[0, 255]`
    pub(crate) fn as_channel(self) -> Option<u8> {
        match self {
            Scalar::Whole(value) => u8::try_from(value).ok(),
            _ => None,
        }
    }
}

/// Inhalt von `led_data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DataField {
    /// Array; pro Element der Farbkanal oder `None` bei ungültigem Wert
    Array(Vec<Option<u8>>),
    /// Vorhanden, aber kein Array
    NotArray,
}

/// Die beiden Felder des Kommando-Dokuments
///
/// `None` bedeutet: Schlüssel nicht vorhanden.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CommandDocument {
    pub(crate) led_index: Option<Scalar>,
    pub(crate) led_data: Option<DataField>,
}

/// Parst die Payload in ein [`CommandDocument`]
///
/// Schlägt nur fehl, wenn die Payload kein gültiges JSON ist.
pub(crate) fn decode_document(payload: &[u8]) -> Result<CommandDocument, serde_json::Error> {
    serde_json::from_slice(payload)
}

// ============================================================================
// Hilfsfunktionen: verschachtelte Werte überspringen
// ============================================================================

fn skip_seq<'de, A: SeqAccess<'de>>(mut seq: A) -> Result<(), A::Error> {
    while seq.next_element::<IgnoredAny>()?.is_some() {}
    Ok(())
}

fn skip_map<'de, A: MapAccess<'de>>(mut map: A) -> Result<(), A::Error> {
    while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
    Ok(())
}

// ============================================================================
// Scalar
// ============================================================================

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_u64<E: Error>(self, v: u64) -> Result<Scalar, E> {
        Ok(Scalar::Whole(v as i128))
    }

    fn visit_i64<E: Error>(self, v: i64) -> Result<Scalar, E> {
        Ok(Scalar::Whole(v as i128))
    }

    fn visit_f64<E: Error>(self, v: f64) -> Result<Scalar, E> {
        Ok(Scalar::from_f64(v))
    }

    fn visit_bool<E: Error>(self, _: bool) -> Result<Scalar, E> {
        Ok(Scalar::NotNumber)
    }

    fn visit_str<E: Error>(self, _: &str) -> Result<Scalar, E> {
        Ok(Scalar::NotNumber)
    }

    fn visit_unit<E: Error>(self) -> Result<Scalar, E> {
        Ok(Scalar::NotNumber)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Scalar, A::Error> {
        skip_seq(seq)?;
        Ok(Scalar::NotNumber)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Scalar, A::Error> {
        skip_map(map)?;
        Ok(Scalar::NotNumber)
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

// ============================================================================
// DataField
// ============================================================================

struct DataVisitor;

impl<'de> Visitor<'de> for DataVisitor {
    type Value = DataField;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of color channels")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<DataField, A::Error> {
        let mut channels = Vec::new();
        while let Some(value) = seq.next_element::<Scalar>()? {
            channels.push(value.as_channel());
        }
        Ok(DataField::Array(channels))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<DataField, A::Error> {
        skip_map(map)?;
        Ok(DataField::NotArray)
    }

    fn visit_u64<E: Error>(self, _: u64) -> Result<DataField, E> {
        Ok(DataField::NotArray)
    }

    fn visit_i64<E: Error>(self, _: i64) -> Result<DataField, E> {
        Ok(DataField::NotArray)
    }

    fn visit_f64<E: Error>(self, _: f64) -> Result<DataField, E> {
        Ok(DataField::NotArray)
    }

    fn visit_bool<E: Error>(self, _: bool) -> Result<DataField, E> {
        Ok(DataField::NotArray)
    }

    fn visit_str<E: Error>(self, _: &str) -> Result<DataField, E> {
        Ok(DataField::NotArray)
    }

    fn visit_unit<E: Error>(self) -> Result<DataField, E> {
        Ok(DataField::NotArray)
    }
}

impl<'de> Deserialize<'de> for DataField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DataVisitor)
    }
}

// ============================================================================
// CommandDocument
// ============================================================================

enum Field {
    LedIndex,
    LedData,
    Other,
}

struct FieldVisitor;

impl<'de> Visitor<'de> for FieldVisitor {
    type Value = Field;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a field name")
    }

    fn visit_str<E: Error>(self, v: &str) -> Result<Field, E> {
        // Groß-/Kleinschreibung zählt
        Ok(match v {
            "led_index" => Field::LedIndex,
            "led_data" => Field::LedData,
            _ => Field::Other,
        })
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_identifier(FieldVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = CommandDocument;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON document")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<CommandDocument, A::Error> {
        let mut document = CommandDocument::default();
        while let Some(field) = map.next_key::<Field>()? {
            // Bei doppelten Schlüsseln gilt das erste Vorkommen
            match field {
                Field::LedIndex if document.led_index.is_none() => {
                    document.led_index = Some(map.next_value()?);
                }
                Field::LedData if document.led_data.is_none() => {
                    document.led_data = Some(map.next_value()?);
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(document)
    }

    // Kein Objekt: gültiges JSON, aber ohne Felder

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<CommandDocument, A::Error> {
        skip_seq(seq)?;
        Ok(CommandDocument::default())
    }

    fn visit_u64<E: Error>(self, _: u64) -> Result<CommandDocument, E> {
        Ok(CommandDocument::default())
    }

    fn visit_i64<E: Error>(self, _: i64) -> Result<CommandDocument, E> {
        Ok(CommandDocument::default())
    }

    fn visit_f64<E: Error>(self, _: f64) -> Result<CommandDocument, E> {
        Ok(CommandDocument::default())
    }

    fn visit_bool<E: Error>(self, _: bool) -> Result<CommandDocument, E> {
        Ok(CommandDocument::default())
    }

    fn visit_str<E: Error>(self, _: &str) -> Result<CommandDocument, E> {
        Ok(CommandDocument::default())
    }

    fn visit_unit<E: Error>(self) -> Result<CommandDocument, E> {
        Ok(CommandDocument::default())
    }
}

impl<'de> Deserialize<'de> for CommandDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DocumentVisitor)
    }
}
