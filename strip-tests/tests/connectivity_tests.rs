//! Integration Tests für den Verbindungs-Zustandsautomaten
//!
//! Simuliert beliebige Folgen von Link- und Subscription-Ereignissen

use proptest::prelude::*;
use strip_core::{
    Backoff, ConnectivityAction, ConnectivityEvent, ConnectivityMachine, KeepAlive,
    KeepAliveAction, LinkState, SubscriptionState,
};

fn machine() -> ConnectivityMachine {
    ConnectivityMachine::new(Backoff::new(500, 30_000))
}

fn event() -> impl Strategy<Value = ConnectivityEvent> {
    prop_oneof![
        Just(ConnectivityEvent::LinkInitialized),
        Just(ConnectivityEvent::LinkEstablished),
        Just(ConnectivityEvent::LinkLost),
        Just(ConnectivityEvent::SubscribeAcknowledged),
        Just(ConnectivityEvent::SubscribeFailed),
    ]
}

// ============================================================================
// Tests: Reconnect-Zyklen
// ============================================================================

#[test]
fn test_every_reconnect_resubscribes_exactly_once() {
    let mut m = machine();
    let mut subscribes = 0;

    for cycle in 0..1000u32 {
        assert_eq!(
            m.handle(ConnectivityEvent::LinkInitialized),
            Some(ConnectivityAction::Connect)
        );
        if m.handle(ConnectivityEvent::LinkEstablished) == Some(ConnectivityAction::Subscribe) {
            subscribes += 1;
        }
        assert!(m.outstanding_subscriptions() <= 1);
        if cycle % 2 == 0 {
            m.handle(ConnectivityEvent::SubscribeAcknowledged);
            assert_eq!(m.subscription(), SubscriptionState::Subscribed);
        }
        assert_eq!(
            m.handle(ConnectivityEvent::LinkLost),
            Some(ConnectivityAction::Reconnect { delay_ms: 0 })
        );
        assert_eq!(m.subscription(), SubscriptionState::Unsubscribed);
        assert_eq!(m.outstanding_subscriptions(), 0);
    }

    assert_eq!(subscribes, 1000);
    assert_eq!(m.sessions(), 1000);
}

#[test]
fn test_subscribe_failure_waits_for_next_cycle() {
    let mut m = machine();
    m.handle(ConnectivityEvent::LinkInitialized);
    m.handle(ConnectivityEvent::LinkEstablished);
    assert_eq!(m.handle(ConnectivityEvent::SubscribeFailed), None);
    assert_eq!(m.link(), LinkState::Up);
    assert_eq!(m.subscription(), SubscriptionState::Unsubscribed);

    // Ein spätes Ack ohne offene Subscription ändert nichts
    assert_eq!(m.handle(ConnectivityEvent::SubscribeAcknowledged), None);
    assert_eq!(m.subscription(), SubscriptionState::Unsubscribed);

    m.handle(ConnectivityEvent::LinkLost);
    m.handle(ConnectivityEvent::LinkInitialized);
    assert_eq!(
        m.handle(ConnectivityEvent::LinkEstablished),
        Some(ConnectivityAction::Subscribe)
    );
}

#[test]
fn test_persistent_outage_backs_off_to_ceiling() {
    let mut m = ConnectivityMachine::new(Backoff::new(500, 4000));
    let mut delays = Vec::new();
    for _ in 0..6 {
        m.handle(ConnectivityEvent::LinkInitialized);
        if let Some(ConnectivityAction::Reconnect { delay_ms }) =
            m.handle(ConnectivityEvent::LinkLost)
        {
            delays.push(delay_ms);
        }
    }
    assert_eq!(delays, vec![500, 1000, 2000, 4000, 4000, 4000]);
}

// ============================================================================
// Tests: Keep-Alive unter Dauer-Traffic
// ============================================================================

const PING_INTERVAL_MS: u64 = 20_000;
const BROKER_KEEP_ALIVE_MS: u64 = 30_000;

/// Spielt die Empfangs-Schleife nach: aufwachen bei eingehender Nachricht
/// oder Keep-Alive-Frist, eingehende QoS-0-Publishes senden nichts.
/// Liefert die Zeitpunkte aller gesendeten Pakete.
fn simulate_inbound_traffic(inbound_every_ms: u64, duration_ms: u64) -> Vec<u64> {
    let mut keep_alive = KeepAlive::new(PING_INTERVAL_MS, 0);
    let mut sent = vec![0];
    let mut next_inbound = inbound_every_ms;
    let mut pong_at = None;

    loop {
        let mut now = next_inbound.min(keep_alive.deadline_ms());
        if let Some(pong) = pong_at {
            now = now.min(pong);
        }
        if now > duration_ms {
            return sent;
        }

        if pong_at == Some(now) {
            keep_alive.pong_received();
            pong_at = None;
        }
        if now == next_inbound {
            next_inbound += inbound_every_ms;
        }
        match keep_alive.poll(now) {
            KeepAliveAction::SendPing => {
                keep_alive.record_sent(now);
                sent.push(now);
                pong_at = Some(now + 50);
            }
            KeepAliveAction::Expired => panic!("pong lost at {now}"),
            KeepAliveAction::Wait => {}
        }
    }
}

#[test]
fn test_steady_inbound_traffic_still_pings() {
    for inbound_every_ms in [100, 1_000, 10_000, 19_999, 25_000] {
        let sent = simulate_inbound_traffic(inbound_every_ms, 300_000);
        assert!(sent.len() >= 300_000 / PING_INTERVAL_MS as usize);
        for gap in sent.windows(2).map(|w| w[1] - w[0]) {
            assert!(gap <= PING_INTERVAL_MS, "gap {gap} at {inbound_every_ms}ms traffic");
            assert!(gap < BROKER_KEEP_ALIVE_MS);
        }
    }
}

#[test]
fn test_outbound_traffic_postpones_ping() {
    let mut keep_alive = KeepAlive::new(PING_INTERVAL_MS, 0);
    // PUBACK für einen QoS-1-Publish bei 15 s
    keep_alive.record_sent(15_000);
    assert_eq!(keep_alive.poll(20_000), KeepAliveAction::Wait);
    assert_eq!(keep_alive.poll(35_000), KeepAliveAction::SendPing);
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_invariants_hold_for_any_event_sequence(events in prop::collection::vec(event(), 0..200)) {
        let mut m = machine();
        let mut link_up_last = false;
        let mut subscribe_acked_in_session = false;

        for e in events {
            let before = m.link();
            let action = m.handle(e);

            // Jeder Übergang nach Up erzeugt genau eine Subscribe-Aktion
            let entered_up = before != LinkState::Up && m.link() == LinkState::Up;
            prop_assert_eq!(entered_up, action == Some(ConnectivityAction::Subscribe));

            match (e, action) {
                (ConnectivityEvent::LinkEstablished, Some(_)) => {
                    link_up_last = true;
                    subscribe_acked_in_session = false;
                }
                (ConnectivityEvent::LinkLost, Some(_)) => {
                    link_up_last = false;
                    subscribe_acked_in_session = false;
                }
                (ConnectivityEvent::SubscribeAcknowledged, _)
                    if link_up_last && m.subscription() == SubscriptionState::Subscribed =>
                {
                    subscribe_acked_in_session = true;
                }
                _ => {}
            }

            prop_assert!(m.outstanding_subscriptions() <= 1);
            if m.subscription() == SubscriptionState::Subscribed {
                prop_assert_eq!(m.link(), LinkState::Up);
            }
            if m.outstanding_subscriptions() == 1 {
                prop_assert_eq!(m.link(), LinkState::Up);
            }
            prop_assert_eq!(
                m.subscription() == SubscriptionState::Subscribed,
                link_up_last && subscribe_acked_in_session
            );
        }
    }
}
