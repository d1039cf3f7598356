//! Frame-Buffer und Frame-Updater
//!
//! Der Frame-Buffer hält den kanonischen Zustand aller Pixel. Einziger
//! Schreiber ist der [`FrameUpdater`], der nach jedem Schreiben den
//! kompletten Buffer an den Strip überträgt.

use rgb::RGB8;

use crate::traits::{RenderError, StripRenderer};
use crate::types::Patch;

/// Pixel-Zustand des gesamten Strips (`N` LEDs)
///
/// Startet komplett schwarz und wird nie in der Größe verändert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer<const N: usize> {
    pixels: [RGB8; N],
}

impl<const N: usize> FrameBuffer<N> {
    /// Anzahl der Pixel
    pub const PIXEL_COUNT: usize = N;

    /// Erstellt einen schwarzen Frame
    pub const fn new() -> Self {
        Self {
            pixels: [RGB8 { r: 0, g: 0, b: 0 }; N],
        }
    }

    /// Aktueller Zustand aller Pixel
    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    /// Schreibt die Farben des Patches ab `patch.offset()`
    ///
    /// `Patch<N>` garantiert `patch.end() <= N`, der Bereich liegt also
    /// immer im Buffer.
    pub fn write(&mut self, patch: &Patch<N>) {
        self.pixels[patch.offset()..patch.end()].copy_from_slice(patch.colors());
    }
}

impl<const N: usize> Default for FrameBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Wendet validierte Patches an und rendert danach den ganzen Frame
///
/// # Trait-basierte Abstraktion
/// Der generische Parameter `R: StripRenderer` ermöglicht:
/// - Real Hardware (RmtStripWriter) im Production-Code
/// - Mock Implementation (MockStripRenderer) in Tests
pub struct FrameUpdater<R, const N: usize> {
    frame: FrameBuffer<N>,
    renderer: R,
}

impl<R: StripRenderer, const N: usize> FrameUpdater<R, N> {
    /// Erstellt einen Updater mit schwarzem Frame
    ///
    /// Es wird noch nichts gerendert; der Strip behält bis zum ersten
    /// Patch seinen Einschaltzustand.
    pub fn new(renderer: R) -> Self {
        Self {
            frame: FrameBuffer::new(),
            renderer,
        }
    }

    /// Schreibt den Patch in den Frame und überträgt danach alle `N` Pixel
    ///
    /// Nur Patches für genau `N` LEDs werden angenommen:
    ///
    /// ```compile_fail
    /// # use rgb::RGB8;
    /// # use strip_core::{FrameUpdater, Patch, RenderError, StripRenderer};
    /// # struct Nop;
    /// # impl StripRenderer for Nop {
    /// #     fn render(&mut self, _: &[RGB8]) -> Result<(), RenderError> { Ok(()) }
    /// # }
    /// let patch = Patch::<100>::new(5, vec![RGB8::default(); 10]).unwrap();
    /// let mut updater = FrameUpdater::<_, 10>::new(Nop);
    /// updater.apply(&patch); // Patch<100> ist kein Patch<10>
    /// ```
    ///
    /// Ein Übertragungsfehler wird zurückgegeben, der Frame bleibt aber
    /// geschrieben. Der nächste erfolgreiche Render zeigt ihn.
    pub fn apply(&mut self, patch: &Patch<N>) -> Result<(), RenderError> {
        self.frame.write(patch);
        self.renderer.render(self.frame.pixels())
    }

    /// Überträgt den aktuellen Frame erneut
    pub fn render(&mut self) -> Result<(), RenderError> {
        self.renderer.render(self.frame.pixels())
    }

    pub fn frame(&self) -> &FrameBuffer<N> {
        &self.frame
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}
