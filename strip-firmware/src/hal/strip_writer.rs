// RMT-basierter Strip-Renderer
//
// Überträgt den kompletten Frame-Buffer per RMT Peripheral an einen
// WS2812 Strip. Host-Tests nutzen stattdessen MockStripRenderer.

use esp_hal::Blocking;
use esp_hal::peripherals::{GPIO8, RMT};
use esp_hal::rmt::{PulseCode, Rmt};
use esp_hal::time::Rate;
use esp_hal_smartled::SmartLedsAdapter;
use rgb::RGB8;
use smart_leds_trait::SmartLedsWrite;
use strip_core::{RenderError, StripRenderer};

use crate::config::RMT_BUFFER_SIZE;

/// Real Hardware Strip Writer
///
/// Der Puls-Buffer wird im Task erstellt (`smart_led_buffer!(LED_COUNT)`)
/// und hier nur ausgeliehen.
pub struct RmtStripWriter<'a> {
    strip: SmartLedsAdapter<'a, RMT_BUFFER_SIZE>,
}

impl<'a> RmtStripWriter<'a> {
    /// Initialisiert RMT Kanal 0 auf GPIO8
    ///
    /// # Fehlerbehandlung
    /// Gibt den RMT-Fehler zurück, wenn die Taktfrequenz nicht einstellbar ist.
    pub fn new(
        gpio8: GPIO8<'a>,
        rmt_peripheral: RMT<'a>,
        rmt_clock_mhz: u32,
        buffer: &'a mut [PulseCode; RMT_BUFFER_SIZE],
    ) -> Result<Self, esp_hal::rmt::Error> {
        let rmt: Rmt<'a, Blocking> = Rmt::new(rmt_peripheral, Rate::from_mhz(rmt_clock_mhz))?;
        let strip = SmartLedsAdapter::new(rmt.channel0, gpio8, buffer);

        Ok(Self { strip })
    }
}

impl StripRenderer for RmtStripWriter<'_> {
    fn render(&mut self, pixels: &[RGB8]) -> Result<(), RenderError> {
        self.strip
            .write(pixels.iter().copied())
            .map_err(|_| RenderError::TransmissionFailed)
    }
}
