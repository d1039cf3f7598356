//! Zustandsautomat für Verbindung und Topic-Subscription
//!
//! Dazu Backoff für Reconnects und der Keep-Alive-Timer der Session.
//!
//! Reine Übergangslogik ohne Netzwerk-Zugriff. Der MQTT-Task meldet
//! Ereignisse ([`ConnectivityEvent`]) und führt die zurückgegebenen
//! Aktionen ([`ConnectivityAction`]) aus.
//!
//! ```text
//!            LinkInitialized          LinkEstablished
//!   Down ─────────────────▶ Connecting ─────────────▶ Up ──▶ Subscribe
//!    ▲                          │                     │
//!    └────────── LinkLost ──────┴─────────────────────┘ ──▶ Reconnect
//! ```

/// Zustand der Verbindung zum Broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Down,
    Connecting,
    Up,
}

/// Zustand der Subscription auf das Kommando-Topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribed,
}

/// Ereignisse aus Transport- und Link-Schicht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectivityEvent {
    /// Netzwerk bereit, Verbindungsaufbau beginnt (Start und jeder Reconnect)
    LinkInitialized,
    /// Session zum Broker steht
    LinkEstablished,
    /// Verbindung verloren oder Aufbau fehlgeschlagen
    LinkLost,
    /// Broker hat die Subscription bestätigt
    SubscribeAcknowledged,
    /// Subscription konnte nicht abgesetzt werden oder wurde abgelehnt
    SubscribeFailed,
}

/// Aktionen, die der Transport-Task ausführen muss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectivityAction {
    /// Verbindung zum Broker aufbauen
    Connect,
    /// Genau eine Subscription auf das Kommando-Topic absetzen
    Subscribe,
    /// Nach `delay_ms` erneut verbinden (danach `LinkInitialized` melden)
    Reconnect { delay_ms: u64 },
}

/// Exponentielles Backoff für aufeinanderfolgende Fehlversuche
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial_ms: u64,
    max_ms: u64,
    failures: u32,
}

impl Backoff {
    pub const fn new(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            initial_ms,
            max_ms,
            failures: 0,
        }
    }

    /// Wartezeit nach einem weiteren Fehlversuch
    ///
    /// `initial_ms`, `2 * initial_ms`, `4 * initial_ms`, ... bis `max_ms`.
    pub fn next_delay_ms(&mut self) -> u64 {
        self.failures = self.failures.saturating_add(1);
        let factor = 1u64.checked_shl(self.failures - 1).unwrap_or(u64::MAX);
        self.initial_ms.saturating_mul(factor).min(self.max_ms)
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Anzahl der Fehlversuche seit dem letzten Reset
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Entscheidung des Keep-Alive-Timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeepAliveAction {
    /// Noch nicht fällig, nächster Blick bei `deadline_ms()`
    Wait,
    /// PINGREQ senden
    SendPing,
    /// Letzter PINGREQ blieb ein ganzes Intervall unbeantwortet
    Expired,
}

/// Keep-Alive nach MQTT-Regeln
///
/// Der Broker zählt nur, was der Client *sendet*. Eingehende Publishes
/// (z.B. QoS 0 ohne PUBACK) verschieben die Frist daher nicht; nur
/// [`KeepAlive::record_sent`] tut das. Zeiten in Millisekunden seit
/// einem beliebigen, monotonen Nullpunkt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    interval_ms: u64,
    last_sent_ms: u64,
    awaiting_pong: bool,
}

impl KeepAlive {
    /// `now_ms`: Zeitpunkt des CONNECT
    pub const fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_ms: now_ms,
            awaiting_pong: false,
        }
    }

    /// Irgendein Paket ging zum Broker raus
    pub fn record_sent(&mut self, now_ms: u64) {
        self.last_sent_ms = self.last_sent_ms.max(now_ms);
    }

    /// PINGRESP empfangen
    pub fn pong_received(&mut self) {
        self.awaiting_pong = false;
    }

    /// Spätester Zeitpunkt für das nächste gesendete Paket
    pub fn deadline_ms(&self) -> u64 {
        self.last_sent_ms.saturating_add(self.interval_ms)
    }

    /// `true` solange ein PINGREQ auf Antwort wartet
    pub fn awaiting_pong(&self) -> bool {
        self.awaiting_pong
    }

    /// Prüft die Frist; bei `SendPing` gilt der Ping als unterwegs
    pub fn poll(&mut self, now_ms: u64) -> KeepAliveAction {
        if now_ms < self.deadline_ms() {
            KeepAliveAction::Wait
        } else if self.awaiting_pong {
            KeepAliveAction::Expired
        } else {
            self.awaiting_pong = true;
            KeepAliveAction::SendPing
        }
    }
}

/// Verbindungs-Zustandsautomat
///
/// Invarianten:
/// - `Subscribed` nur solange `Up`
/// - jeder Übergang nach `Up` löst genau eine `Subscribe`-Aktion aus
/// - höchstens eine Subscription ist gleichzeitig offen
///
/// Der Automat besteht nur aus ein paar Feldern; beliebig viele
/// Reconnect-Zyklen belegen keinen zusätzlichen Speicher.
#[derive(Debug, Clone)]
pub struct ConnectivityMachine {
    link: LinkState,
    subscription: SubscriptionState,
    subscribe_outstanding: bool,
    backoff: Backoff,
    sessions: u32,
}

impl ConnectivityMachine {
    /// Startzustand `(Down, Unsubscribed)`
    pub const fn new(backoff: Backoff) -> Self {
        Self {
            link: LinkState::Down,
            subscription: SubscriptionState::Unsubscribed,
            subscribe_outstanding: false,
            backoff,
            sessions: 0,
        }
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn subscription(&self) -> SubscriptionState {
        self.subscription
    }

    /// Anzahl offener (noch nicht bestätigter) Subscriptions: 0 oder 1
    pub fn outstanding_subscriptions(&self) -> usize {
        usize::from(self.subscribe_outstanding)
    }

    /// Wie oft die Verbindung bisher `Up` erreicht hat
    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Verarbeitet ein Ereignis und liefert die auszuführende Aktion
    ///
    /// Ereignisse, die im aktuellen Zustand keinen Sinn ergeben
    /// (z.B. doppeltes `LinkEstablished`), werden ignoriert.
    pub fn handle(&mut self, event: ConnectivityEvent) -> Option<ConnectivityAction> {
        match (self.link, event) {
            (LinkState::Down, ConnectivityEvent::LinkInitialized) => {
                self.link = LinkState::Connecting;
                Some(ConnectivityAction::Connect)
            }
            (LinkState::Connecting, ConnectivityEvent::LinkEstablished) => {
                self.link = LinkState::Up;
                self.sessions = self.sessions.wrapping_add(1);
                self.backoff.reset();
                self.subscribe_outstanding = true;
                Some(ConnectivityAction::Subscribe)
            }
            (LinkState::Up | LinkState::Connecting, ConnectivityEvent::LinkLost) => {
                // Erster Reconnect nach einer stehenden Session sofort,
                // wiederholte Fehlversuche mit Backoff
                let delay_ms = if self.link == LinkState::Up {
                    0
                } else {
                    self.backoff.next_delay_ms()
                };
                self.link = LinkState::Down;
                self.subscription = SubscriptionState::Unsubscribed;
                self.subscribe_outstanding = false;
                Some(ConnectivityAction::Reconnect { delay_ms })
            }
            (LinkState::Up, ConnectivityEvent::SubscribeAcknowledged) if self.subscribe_outstanding => {
                self.subscribe_outstanding = false;
                self.subscription = SubscriptionState::Subscribed;
                None
            }
            (LinkState::Up, ConnectivityEvent::SubscribeFailed) if self.subscribe_outstanding => {
                // Kein automatischer Retry, erst beim nächsten Reconnect
                self.subscribe_outstanding = false;
                self.subscription = SubscriptionState::Unsubscribed;
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> ConnectivityMachine {
        ConnectivityMachine::new(Backoff::new(500, 4000))
    }

    #[test]
    fn test_initial_state() {
        let m = machine();
        assert_eq!(m.link(), LinkState::Down);
        assert_eq!(m.subscription(), SubscriptionState::Unsubscribed);
        assert_eq!(m.outstanding_subscriptions(), 0);
    }

    #[test]
    fn test_connect_and_subscribe() {
        let mut m = machine();
        assert_eq!(
            m.handle(ConnectivityEvent::LinkInitialized),
            Some(ConnectivityAction::Connect)
        );
        assert_eq!(m.link(), LinkState::Connecting);
        assert_eq!(
            m.handle(ConnectivityEvent::LinkEstablished),
            Some(ConnectivityAction::Subscribe)
        );
        assert_eq!(m.link(), LinkState::Up);
        assert_eq!(m.outstanding_subscriptions(), 1);
        assert_eq!(m.handle(ConnectivityEvent::SubscribeAcknowledged), None);
        assert_eq!(m.subscription(), SubscriptionState::Subscribed);
        assert_eq!(m.outstanding_subscriptions(), 0);
    }

    #[test]
    fn test_duplicate_link_established_does_not_resubscribe() {
        let mut m = machine();
        m.handle(ConnectivityEvent::LinkInitialized);
        m.handle(ConnectivityEvent::LinkEstablished);
        assert_eq!(m.handle(ConnectivityEvent::LinkEstablished), None);
        assert_eq!(m.outstanding_subscriptions(), 1);
    }

    #[test]
    fn test_link_lost_resets_subscription() {
        let mut m = machine();
        m.handle(ConnectivityEvent::LinkInitialized);
        m.handle(ConnectivityEvent::LinkEstablished);
        m.handle(ConnectivityEvent::SubscribeAcknowledged);
        assert_eq!(
            m.handle(ConnectivityEvent::LinkLost),
            Some(ConnectivityAction::Reconnect { delay_ms: 0 })
        );
        assert_eq!(m.link(), LinkState::Down);
        assert_eq!(m.subscription(), SubscriptionState::Unsubscribed);
    }

    #[test]
    fn test_stale_ack_after_link_lost_is_ignored() {
        let mut m = machine();
        m.handle(ConnectivityEvent::LinkInitialized);
        m.handle(ConnectivityEvent::LinkEstablished);
        m.handle(ConnectivityEvent::LinkLost);
        assert_eq!(m.handle(ConnectivityEvent::SubscribeAcknowledged), None);
        assert_eq!(m.subscription(), SubscriptionState::Unsubscribed);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let mut backoff = Backoff::new(500, 4000);
        assert_eq!(backoff.next_delay_ms(), 500);
        assert_eq!(backoff.next_delay_ms(), 1000);
        assert_eq!(backoff.next_delay_ms(), 2000);
        assert_eq!(backoff.next_delay_ms(), 4000);
        assert_eq!(backoff.next_delay_ms(), 4000);
        backoff.reset();
        assert_eq!(backoff.next_delay_ms(), 500);
    }

    #[test]
    fn test_backoff_never_overflows() {
        let mut backoff = Backoff::new(u64::MAX / 2, u64::MAX);
        for _ in 0..200 {
            assert!(backoff.next_delay_ms() >= u64::MAX / 2);
        }
    }

    #[test]
    fn test_keep_alive_pings_after_interval_since_last_send() {
        let mut keep_alive = KeepAlive::new(20_000, 0);
        assert_eq!(keep_alive.poll(19_999), KeepAliveAction::Wait);
        assert_eq!(keep_alive.poll(20_000), KeepAliveAction::SendPing);
        assert!(keep_alive.awaiting_pong());

        keep_alive.record_sent(20_000);
        keep_alive.pong_received();
        assert_eq!(keep_alive.deadline_ms(), 40_000);
        assert_eq!(keep_alive.poll(39_000), KeepAliveAction::Wait);
    }

    #[test]
    fn test_keep_alive_expires_without_pong() {
        let mut keep_alive = KeepAlive::new(20_000, 0);
        assert_eq!(keep_alive.poll(20_000), KeepAliveAction::SendPing);
        keep_alive.record_sent(20_000);
        assert_eq!(keep_alive.poll(40_000), KeepAliveAction::Expired);
    }

    #[test]
    fn test_keep_alive_ignores_clock_going_back() {
        let mut keep_alive = KeepAlive::new(1000, 5000);
        keep_alive.record_sent(4000);
        assert_eq!(keep_alive.deadline_ms(), 6000);
    }

    #[test]
    fn test_failed_connects_back_off() {
        let mut m = machine();
        m.handle(ConnectivityEvent::LinkInitialized);
        assert_eq!(
            m.handle(ConnectivityEvent::LinkLost),
            Some(ConnectivityAction::Reconnect { delay_ms: 500 })
        );
        m.handle(ConnectivityEvent::LinkInitialized);
        assert_eq!(
            m.handle(ConnectivityEvent::LinkLost),
            Some(ConnectivityAction::Reconnect { delay_ms: 1000 })
        );
        m.handle(ConnectivityEvent::LinkInitialized);
        m.handle(ConnectivityEvent::LinkEstablished);
        assert_eq!(m.backoff().failures(), 0);
    }
}
