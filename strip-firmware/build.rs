// Build-Script: Wird vor dem Kompilieren ausgeführt
// Backt WiFi/MQTT-Konfiguration ein und konfiguriert den Linker für ESP32-C6

/// Variablen, die aus .env (oder der Umgebung) an den Compiler gehen
///
/// Pflicht: WIFI_SSID, WIFI_PASSWORD, MQTT_BROKER, MQTT_CLIENT_ID, MQTT_TOPIC_COMMAND
/// Optional: MQTT_PORT (Default 1883), LED_COUNT (Default 30)
const FORWARDED_VARS: [&str; 7] = [
    "WIFI_SSID",
    "WIFI_PASSWORD",
    "MQTT_BROKER",
    "MQTT_PORT",
    "MQTT_CLIENT_ID",
    "MQTT_TOPIC_COMMAND",
    "LED_COUNT",
];

fn main() {
    // Fehler ignorieren wenn .env nicht existiert (dann müssen ENV vars gesetzt sein)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  .env file nicht gefunden: {}", e);
        eprintln!("   Setze WIFI_* und MQTT_* als Environment-Variablen (siehe .env.example)");
    }
    println!("cargo:rerun-if-changed=.env");

    // Die Werte werden zur Compile-Zeit in den Code eingebacken
    for name in FORWARDED_VARS {
        println!("cargo:rerun-if-env-changed={}", name);
        if let Ok(value) = std::env::var(name) {
            println!("cargo:rustc-env={}={}", name, value);
        }
    }

    linker_be_nice();

    // defmt.x - Symbole für defmt's binäres Log-Format
    println!("cargo:rustc-link-arg=-Tdefmt.x");

    // linkall.x - Flash/RAM-Layout und Startup-Code, muss als LETZTES kommen
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}

/// Hinweis passend zu einem undefinierten Symbol
fn hint_for_undefined_symbol(symbol: &str) -> Option<&'static str> {
    match symbol {
        s if s.starts_with("_defmt_") => Some(
            "`defmt` not found - make sure `defmt.x` is added as a linker script and `esp-println` has the `defmt-espflash` feature",
        ),
        "_stack_start" => Some("Is the linker script `linkall.x` missing?"),
        s if s.starts_with("esp_rtos_") => Some(
            "`esp-radio` has no scheduler enabled. Make sure `esp_rtos::start` runs before `esp_radio::init`.",
        ),
        "free" | "malloc" | "calloc" | "malloc_internal" | "free_internal" => {
            Some("Did you forget the `esp-alloc` dependency?")
        }
        _ => None,
    }
}

// Wird vom Linker als "--error-handling-script" aufgerufen
fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();

    if let [_, kind, what, ..] = args.as_slice() {
        if kind != "undefined-symbol" {
            std::process::exit(1);
        }
        if let Some(hint) = hint_for_undefined_symbol(what) {
            eprintln!();
            eprintln!("💡 {}", hint);
            eprintln!();
        }
        std::process::exit(0);
    }

    match std::env::current_exe() {
        Ok(exe) => println!(
            "cargo:rustc-link-arg=--error-handling-script={}",
            exe.display()
        ),
        Err(e) => eprintln!("⚠️  Linker-Hinweise deaktiviert: {}", e),
    }
}
