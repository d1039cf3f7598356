// Hardware Abstraction Layer (HAL) Module
//
// Implementiert strip_core::StripRenderer für die echte Hardware.

pub mod strip_writer;

pub use strip_writer::RmtStripWriter;
