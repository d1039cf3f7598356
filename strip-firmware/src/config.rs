// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen

// ============================================================================
// LED-Strip Konfiguration
// ============================================================================

/// GPIO-Pin für die Datenleitung des Strips (WS2812/Neopixel)
pub const LED_GPIO_PIN: u8 = 8;

/// RMT Taktfrequenz in MHz
/// 80 MHz ist optimal für WS2812 LED-Timing
pub const RMT_CLOCK_MHZ: u32 = 80;

/// Anzahl der LEDs im Strip
/// Optional zur Build-Zeit über LED_COUNT überschreibbar
pub const LED_COUNT: usize = match option_env!("LED_COUNT") {
    Some(count) => match usize::from_str_radix(count, 10) {
        Ok(0) => panic!("LED_COUNT muss mindestens 1 sein"),
        Ok(count) => count,
        Err(_) => panic!("LED_COUNT ist keine Zahl"),
    },
    None => 30,
};

/// RMT Puls-Buffer: 24 Bits pro LED + 1 Reset
pub const RMT_BUFFER_SIZE: usize = LED_COUNT * 24 + 1;

// ============================================================================
// WiFi Konfiguration
// ============================================================================

/// WiFi SSID (Netzwerk-Name)
/// Wird zur Build-Zeit aus der Environment Variable WIFI_SSID geladen
pub const WIFI_SSID: &str = env!(
    "WIFI_SSID",
    "WiFi SSID nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// WiFi Passwort
pub const WIFI_PASSWORD: &str = env!(
    "WIFI_PASSWORD",
    "WiFi Password nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Wartezeit nach fehlgeschlagenem WiFi-Start oder Connect
pub const WIFI_RETRY_DELAY_SECS: u64 = 5;

/// Heap-Größe für WiFi (Bytes)
/// WiFi benötigt dynamischen Speicher für Pakete
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes)
/// Reicht auch für die JSON-Validierung eingehender Kommandos
pub const EXTRA_HEAP_SIZE: usize = 36864; // 36 KB

/// Socket-Slots im Netzwerk-Stack: MQTT (TCP) + DHCP + DNS
pub const NET_SOCKET_COUNT: usize = 3;

// ============================================================================
// MQTT Konfiguration
// ============================================================================

/// MQTT Broker Hostname oder IP-Adresse
pub const MQTT_BROKER: &str = env!(
    "MQTT_BROKER",
    "MQTT Broker nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// MQTT Broker Port
/// Standard: 1883 (unverschlüsselt), kann in .env überschrieben werden
pub const MQTT_PORT: u16 = match option_env!("MQTT_PORT") {
    Some(port) => match u16::from_str_radix(port, 10) {
        Ok(port) => port,
        Err(_) => panic!("MQTT_PORT ist keine gültige Portnummer"),
    },
    None => 1883,
};

/// MQTT Client ID
/// Eindeutige Kennung für diesen ESP32-C6
pub const MQTT_CLIENT_ID: &str = env!(
    "MQTT_CLIENT_ID",
    "MQTT Client ID nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Kommando-Topic, auf das nach jedem Connect subscribed wird
/// Payload: {"led_index": <n>, "led_data": [r, g, b, ...]}
pub const MQTT_TOPIC_COMMAND: &str = env!(
    "MQTT_TOPIC_COMMAND",
    "MQTT Command Topic nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Erste Wartezeit nach einem fehlgeschlagenen Verbindungsaufbau
/// Verdoppelt sich bei jedem weiteren Fehlversuch
pub const MQTT_RECONNECT_INITIAL_DELAY_MS: u64 = 500;

/// Obergrenze für die Reconnect-Wartezeit
pub const MQTT_RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// MQTT Keep-Alive in Sekunden (wird dem Broker im CONNECT mitgeteilt)
pub const MQTT_KEEP_ALIVE_SECS: u16 = 30;

/// Wurde so lange nichts zum Broker gesendet, folgt ein PINGREQ
/// (eingehende Nachrichten zählen nicht)
/// Muss kleiner als MQTT_KEEP_ALIVE_SECS sein
pub const MQTT_PING_INTERVAL_SECS: u64 = 20;

/// MQTT Buffer-Größe in Bytes
/// Begrenzt die maximale Größe eines Kommandos (~1 KB ≈ 80 LEDs pro Nachricht)
pub const MQTT_BUFFER_SIZE: usize = 1024;

/// TCP RX/TX Buffer-Größe in Bytes
pub const TCP_BUFFER_SIZE: usize = 2048;

/// TCP Timeout in Sekunden (Connect und Lesen)
/// Größer als MQTT_KEEP_ALIVE_SECS, sonst reißt eine ruhige Verbindung ab
pub const TCP_TIMEOUT_SECS: u64 = 45;

/// DNS Query Timeout in Sekunden
pub const DNS_TIMEOUT_SECS: u64 = 10;

const _: () = assert!(MQTT_PING_INTERVAL_SECS < MQTT_KEEP_ALIVE_SECS as u64);
const _: () = assert!(TCP_TIMEOUT_SECS > MQTT_KEEP_ALIVE_SECS as u64);
