// MQTT Task - Empfängt Strip-Kommandos vom Broker und rendert sie
use core::cell::{Cell, RefCell};
use core::convert::Infallible;

use defmt::{Debug2Format, error, info, warn};
use embassy_futures::select::{Either, select};
use embassy_net::tcp::{Error as TcpError, TcpSocket};
use embassy_net::{IpAddress, Stack, dns::DnsQueryType};
use embassy_time::{Duration, Instant, Timer, with_timeout};
use embedded_io_async::{ErrorType, Read, Write};
use esp_hal::peripherals::{GPIO8, RMT};
use esp_hal_smartled::smart_led_buffer;

use rust_mqtt::client::raw_client::{Event, RawMqttClient};
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::utils::rng_generator::CountingRng;
use rust_mqtt::utils::types::EncodedString;

use strip_core::{
    Backoff, ConnectivityAction, ConnectivityEvent, ConnectivityMachine, DispatchOutcome,
    KeepAlive, KeepAliveAction, StripRenderer,
};

use crate::StripDispatcher;
use crate::config::*;
use crate::hal::RmtStripWriter;

/// MQTT Task
///
/// Besitzt den Strip exklusiv: Nachrichten werden in Empfangsreihenfolge
/// validiert und gerendert, ohne Channel dazwischen.
///
/// # Parameter
/// - `stack`: embassy-net Stack für Netzwerk-Zugriff
/// - `gpio8`: Datenleitung des Strips
/// - `rmt_peripheral`: RMT Peripheral für das WS2812-Timing
#[embassy_executor::task]
pub async fn mqtt_task(
    stack: &'static Stack<'static>,
    gpio8: GPIO8<'static>,
    rmt_peripheral: RMT<'static>,
) {
    let mut rmt_buffer = smart_led_buffer!(LED_COUNT);
    let strip = match RmtStripWriter::new(gpio8, rmt_peripheral, RMT_CLOCK_MHZ, &mut rmt_buffer)
    {
        Ok(strip) => strip,
        Err(e) => defmt::panic!("Strip: RMT init failed: {}", Debug2Format(&e)),
    };
    info!("Strip: {} LEDs on GPIO{}", LED_COUNT, LED_GPIO_PIN);

    mqtt_task_logic(stack, StripDispatcher::new(strip)).await
}

/// Verbindungs-Schleife, getrieben vom ConnectivityMachine
///
/// Jede Session meldet `LinkInitialized` → (`LinkEstablished` → Subscribe)
/// → `LinkLost`; die Wartezeit bis zum nächsten Versuch kommt vom Automaten.
pub async fn mqtt_task_logic<R: StripRenderer>(
    stack: &'static Stack<'static>,
    mut dispatcher: StripDispatcher<R>,
) -> ! {
    let mut machine = ConnectivityMachine::new(Backoff::new(
        MQTT_RECONNECT_INITIAL_DELAY_MS,
        MQTT_RECONNECT_MAX_DELAY_MS,
    ));

    info!("MQTT: Task started, waiting for network...");
    loop {
        stack.wait_config_up().await;

        if let Some(ConnectivityAction::Connect) =
            machine.handle(ConnectivityEvent::LinkInitialized)
        {
            let Err(e) = run_session(stack, &mut machine, &mut dispatcher).await;
            error!("MQTT: Error: {}", e);
        }

        if let Some(ConnectivityAction::Reconnect { delay_ms }) =
            machine.handle(ConnectivityEvent::LinkLost)
        {
            if delay_ms == 0 {
                info!("MQTT: Reconnecting...");
            } else {
                info!(
                    "MQTT: Reconnecting in {}ms (attempt {})...",
                    delay_ms,
                    machine.backoff().failures() + 1
                );
                Timer::after(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Eine komplette Broker-Session
///
/// 1. DNS-Auflösung des Broker-Hostnames
/// 2. TCP-Verbindung aufbauen
/// 3. MQTT CONNECT senden, auf CONNACK warten
/// 4. Kommando-Topic subscriben (genau einmal pro Session)
/// 5. Pakete empfangen; PINGREQ wenn ein Intervall lang nichts gesendet wurde
///
/// Kehrt nur mit einem Fehler zurück; der Aufrufer meldet dann `LinkLost`.
async fn run_session<R: StripRenderer>(
    stack: &'static Stack<'static>,
    machine: &mut ConnectivityMachine,
    dispatcher: &mut StripDispatcher<R>,
) -> Result<Infallible, MqttError> {
    // DNS Lookup
    info!("MQTT: Resolving '{}'...", MQTT_BROKER);
    let broker_ip = resolve_hostname(stack, MQTT_BROKER).await?;
    info!("MQTT: Resolved to {}", Debug2Format(&broker_ip));

    // TCP Connect
    let mut rx_buffer = [0u8; TCP_BUFFER_SIZE];
    let mut tx_buffer = [0u8; TCP_BUFFER_SIZE];
    let mut socket = TcpSocket::new(*stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(Duration::from_secs(TCP_TIMEOUT_SECS)));

    socket
        .connect((broker_ip, MQTT_PORT))
        .await
        .map_err(|_| MqttError::ConnectionFailed)?;
    info!("MQTT: TCP connected to port {}", MQTT_PORT);

    // rust-mqtt kennt keinen QoS 2 Empfangs-Flow, daher QoS 1
    let mut config = ClientConfig::<5, _>::new(MqttVersion::MQTTv5, CountingRng(20000));
    config.client_id = EncodedString {
        string: MQTT_CLIENT_ID,
        len: MQTT_CLIENT_ID.len() as u16,
    };
    config.keep_alive = MQTT_KEEP_ALIVE_SECS;
    config.max_packet_size = MQTT_BUFFER_SIZE as u32;
    config.add_max_subscribe_qos(QualityOfService::QoS1);

    let link = SessionLink::new(socket);
    let mut send_buffer = [0u8; MQTT_BUFFER_SIZE];
    let mut recv_buffer = [0u8; MQTT_BUFFER_SIZE];
    let mut client = RawMqttClient::<_, 5, _>::new(
        link.io(),
        &mut send_buffer,
        MQTT_BUFFER_SIZE,
        &mut recv_buffer,
        MQTT_BUFFER_SIZE,
        config,
    );

    client
        .connect_to_broker()
        .await
        .map_err(|_| MqttError::ProtocolError)?;
    loop {
        match client.poll::<0>().await {
            Ok(Event::Connack) => break,
            Ok(Event::Disconnect(_)) | Err(_) => return Err(MqttError::ProtocolError),
            Ok(_) => {}
        }
    }
    info!("MQTT: Connected to broker as '{}'", MQTT_CLIENT_ID);

    // Packet-ID des SUBACK, auf den noch gewartet wird
    let mut pending_suback = None;
    if let Some(ConnectivityAction::Subscribe) = machine.handle(ConnectivityEvent::LinkEstablished)
    {
        match client.subscribe_to_topic(MQTT_TOPIC_COMMAND).await {
            Ok(packet_id) => pending_suback = Some(packet_id),
            Err(_) => {
                machine.handle(ConnectivityEvent::SubscribeFailed);
                error!("MQTT: Subscribe to '{}' failed", MQTT_TOPIC_COMMAND);
                return Err(MqttError::SubscribeFailed);
            }
        }
    }

    // Receive Loop
    loop {
        match link.poll_keep_alive() {
            KeepAliveAction::Wait => {}
            KeepAliveAction::SendPing => client
                .send_ping()
                .await
                .map_err(|_| MqttError::PingFailed)?,
            KeepAliveAction::Expired => return Err(MqttError::PingTimeout),
        }

        // Nur auf Lesbarkeit warten, nie einen Read abbrechen:
        // ein halb gelesenes Paket würde den Stream zerreißen.
        if let Either::Second(()) = select(link.wait_readable(), Timer::at(link.deadline())).await
        {
            continue;
        }

        match client.poll::<0>().await {
            Ok(Event::Message(topic, payload)) => handle_message(dispatcher, topic, payload),
            Ok(Event::Pingresp) => link.pong_received(),
            Ok(Event::Suback(packet_id)) if pending_suback == Some(packet_id) => {
                pending_suback = None;
                machine.handle(ConnectivityEvent::SubscribeAcknowledged);
                info!(
                    "MQTT: Subscribed to '{}' (session {})",
                    MQTT_TOPIC_COMMAND,
                    machine.sessions()
                );
            }
            Ok(Event::Disconnect(_)) => return Err(MqttError::BrokerDisconnected),
            Ok(_) => {}
            Err(_) => return Err(MqttError::ReceiveFailed),
        }
    }
}

/// TCP-Socket einer Session, geteilt zwischen MQTT-Client und Empfangs-Schleife
///
/// Der Client liest und schreibt über [`LinkIo`]; die Schleife wartet
/// daneben auf Lesbarkeit. Beides passiert nie gleichzeitig. Jeder Write
/// schiebt die Keep-Alive-Frist.
struct SessionLink<'s> {
    socket: RefCell<TcpSocket<'s>>,
    keep_alive: Cell<KeepAlive>,
}

impl<'s> SessionLink<'s> {
    fn new(socket: TcpSocket<'s>) -> Self {
        let interval_ms = MQTT_PING_INTERVAL_SECS * 1000;
        Self {
            socket: RefCell::new(socket),
            keep_alive: Cell::new(KeepAlive::new(interval_ms, Instant::now().as_millis())),
        }
    }

    fn io(&self) -> LinkIo<'_, 's> {
        LinkIo { link: self }
    }

    fn record_sent(&self) {
        let mut keep_alive = self.keep_alive.get();
        keep_alive.record_sent(Instant::now().as_millis());
        self.keep_alive.set(keep_alive);
    }

    fn poll_keep_alive(&self) -> KeepAliveAction {
        let mut keep_alive = self.keep_alive.get();
        let action = keep_alive.poll(Instant::now().as_millis());
        self.keep_alive.set(keep_alive);
        action
    }

    fn pong_received(&self) {
        let mut keep_alive = self.keep_alive.get();
        keep_alive.pong_received();
        self.keep_alive.set(keep_alive);
    }

    fn deadline(&self) -> Instant {
        Instant::from_millis(self.keep_alive.get().deadline_ms())
    }

    #[allow(
        clippy::await_holding_refcell_ref,
        reason = "the client only borrows the socket inside its own awaits, never while this one runs"
    )]
    async fn wait_readable(&self) {
        self.socket.borrow().wait_read_ready().await
    }
}

/// Transport für den MQTT-Client
struct LinkIo<'l, 's> {
    link: &'l SessionLink<'s>,
}

impl ErrorType for LinkIo<'_, '_> {
    type Error = TcpError;
}

#[allow(clippy::await_holding_refcell_ref)]
impl Read for LinkIo<'_, '_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.link.socket.borrow_mut().read(buf).await
    }
}

#[allow(clippy::await_holding_refcell_ref)]
impl Write for LinkIo<'_, '_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let written = self.link.socket.borrow_mut().write(buf).await?;
        self.link.record_sent();
        Ok(written)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.link.socket.borrow_mut().flush().await
    }
}

/// Validiert und rendert eine Nachricht, loggt das Ergebnis
fn handle_message<R: StripRenderer>(
    dispatcher: &mut StripDispatcher<R>,
    topic: &str,
    payload: &[u8],
) {
    match dispatcher.dispatch(payload) {
        DispatchOutcome::Applied => {
            info!("MQTT: Good message: {}: {=[u8]:a}", topic, payload);
        }
        DispatchOutcome::AppliedRenderFailed(e) => {
            info!("MQTT: Good message: {}: {=[u8]:a}", topic, payload);
            // Frame bleibt übernommen, der nächste Render zeigt ihn
            warn!("Strip: {}", e);
        }
        DispatchOutcome::Rejected(reason) => {
            error!(
                "MQTT: Bad message: {}: {=[u8]:a} ({})",
                topic, payload, reason
            );
        }
    }
}

/// Löst Hostname zu IPv4-Adresse auf
///
/// Nutzt embassy-net DNS-Stack mit konfigurierbarem Timeout.
async fn resolve_hostname(
    stack: &'static Stack<'static>,
    hostname: &str,
) -> Result<embassy_net::Ipv4Address, MqttError> {
    let result = with_timeout(
        Duration::from_secs(DNS_TIMEOUT_SECS),
        stack.dns_query(hostname, DnsQueryType::A),
    )
    .await;

    match result {
        Ok(Ok(addrs)) => addrs
            .iter()
            .find_map(|addr| match addr {
                IpAddress::Ipv4(ipv4) => Some(*ipv4),
                #[allow(unreachable_patterns)]
                _ => None,
            })
            .ok_or(MqttError::DnsResolutionFailed),
        Ok(Err(_)) => Err(MqttError::DnsResolutionFailed),
        Err(_) => Err(MqttError::DnsTimeout),
    }
}

/// Fehler einer Broker-Session
///
/// Jeder davon beendet die Session; der Automat entscheidet über den Reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MqttError {
    DnsResolutionFailed,
    DnsTimeout,
    ConnectionFailed,
    ProtocolError,
    SubscribeFailed,
    ReceiveFailed,
    PingFailed,
    PingTimeout,
    BrokerDisconnected,
}

impl defmt::Format for MqttError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            MqttError::DnsResolutionFailed => defmt::write!(fmt, "DNS failed"),
            MqttError::DnsTimeout => defmt::write!(fmt, "DNS timeout"),
            MqttError::ConnectionFailed => defmt::write!(fmt, "Connection failed"),
            MqttError::ProtocolError => defmt::write!(fmt, "Protocol error"),
            MqttError::SubscribeFailed => defmt::write!(fmt, "Subscribe failed"),
            MqttError::ReceiveFailed => defmt::write!(fmt, "Receive failed"),
            MqttError::PingFailed => defmt::write!(fmt, "Ping failed"),
            MqttError::PingTimeout => defmt::write!(fmt, "No PINGRESP from broker"),
            MqttError::BrokerDisconnected => defmt::write!(fmt, "Broker sent DISCONNECT"),
        }
    }
}
