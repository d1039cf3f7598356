// WiFi Tasks - Station-Verbindung, Netzwerk-Stack und IP-Überwachung
use defmt::{Debug2Format, error, info, warn};
use embassy_net::{Runner, Stack};
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};

use crate::config::{WIFI_PASSWORD, WIFI_RETRY_DELAY_SECS, WIFI_SSID};

/// WiFi Connection Task
///
/// - Startet den Station-Modus
/// - Verbindet mit dem Access Point
/// - Nach jedem Disconnect sofort neu verbinden
#[embassy_executor::task]
pub async fn connection_task(mut controller: WifiController<'static>) {
    info!("WiFi: Starting connection task");

    loop {
        if matches!(controller.is_started(), Ok(false)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(WIFI_SSID.into())
                    .with_password(WIFI_PASSWORD.into()),
            );

            if let Err(e) = controller.set_config(&client_config) {
                error!("WiFi: Failed to set configuration: {}", Debug2Format(&e));
                Timer::after(Duration::from_secs(WIFI_RETRY_DELAY_SECS)).await;
                continue;
            }

            if let Err(e) = controller.start_async().await {
                error!("WiFi: Failed to start: {}", Debug2Format(&e));
                Timer::after(Duration::from_secs(WIFI_RETRY_DELAY_SECS)).await;
                continue;
            }

            info!("WiFi: Station started");
        }

        info!("WiFi: Connecting to '{}'...", WIFI_SSID);
        if let Err(e) = controller.connect_async().await {
            error!("WiFi: Connection failed: {}", Debug2Format(&e));
            Timer::after(Duration::from_secs(WIFI_RETRY_DELAY_SECS)).await;
            continue;
        }
        info!("WiFi: Connected");

        controller.wait_for_event(WifiEvent::StaDisconnected).await;
        warn!("WiFi: Disconnected from AP, reconnecting...");
    }
}

/// Network Task
///
/// Prozessiert Netzwerk-Pakete für den embassy-net Stack.
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// DHCP Monitor Task
///
/// Loggt jede neue IP-Konfiguration und jeden Verlust.
#[embassy_executor::task]
pub async fn dhcp_task(stack: &'static Stack<'static>) {
    loop {
        stack.wait_config_up().await;
        if let Some(config) = stack.config_v4() {
            info!("WiFi: Got IP address!");
            info!("  IP:      {}", Debug2Format(&config.address.address()));
            info!("  Gateway: {}", Debug2Format(&config.gateway));
            info!("  DNS:     {}", Debug2Format(&config.dns_servers));
        }

        stack.wait_config_down().await;
        warn!("WiFi: IP configuration lost");
    }
}
