// Task-Modul: Enthält alle Embassy Tasks
//
// WiFi, Netzwerk-Stack und DHCP-Monitor laufen unabhängig.
// Der MQTT Task besitzt den Strip und rendert Kommandos direkt.

pub mod mqtt;
pub mod wifi;

// Re-export Tasks für einfachen Import
pub use mqtt::mqtt_task;
pub use wifi::{connection_task, dhcp_task, net_task};
