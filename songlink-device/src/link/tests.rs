use std::boxed::Box;
use std::collections::VecDeque;
use std::string::{String, ToString};
use std::vec::Vec;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use songlink_core::ble::{BleEvent, BleState, Characteristic};
use songlink_core::config::LinkConfig;
use songlink_core::cover::{CoverOutcome, CoverPhase};
use songlink_core::link::{HandshakeState, LinkPreference, Route};
use songlink_core::state::MediaChange;
use songlink_core::LinkError;
use songlink_hal::{AdvertisingParams, GattServer, UartRx, UartTx};
use songlink_host::{LineSink, NowPlayingPublisher, Track};
use songlink_protocol::{Command, COVER_PIXELS};

use super::{DeviceLink, LinkObserver};
use crate::channels::BleEvents;
use crate::throughput::ByteCounters;

#[derive(Default)]
struct MockUart {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    disconnected: bool,
}

impl MockUart {
    fn host_sends(&mut self, text: &str) {
        self.rx.extend(text.bytes());
    }
}

impl UartTx for MockUart {
    type Error = ();

    fn write(&mut self, data: &[u8]) -> Result<(), ()> {
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.disconnected
    }
}

impl UartRx for MockUart {
    type Error = ();

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

#[derive(Default)]
struct MockGatt {
    name: Option<String>,
    advertising: usize,
    mtu_requests: Vec<(u16, u16)>,
    notified: Vec<u8>,
    fail_name: bool,
    fail_notify: bool,
}

impl GattServer for MockGatt {
    type Error = ();

    fn set_device_name(&mut self, name: &str) -> Result<(), ()> {
        if self.fail_name {
            return Err(());
        }
        self.name = Some(name.to_string());
        Ok(())
    }

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), ()> {
        assert!(params.connectable);
        self.advertising += 1;
        Ok(())
    }

    fn request_mtu(&mut self, conn_id: u16, mtu: u16) -> Result<(), ()> {
        self.mtu_requests.push((conn_id, mtu));
        Ok(())
    }

    fn notify(&mut self, _conn_id: u16, data: &[u8]) -> Result<(), ()> {
        if self.fail_notify {
            return Err(());
        }
        self.notified.extend_from_slice(data);
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    changes: Vec<MediaChange>,
    covers: Vec<CoverOutcome>,
    cleared: usize,
}

impl LinkObserver for Recorder {
    fn on_command(&mut self, _route: Route, _command: &Command<'_>, change: MediaChange) {
        self.changes.push(change);
    }

    fn on_cover(&mut self, outcome: CoverOutcome) {
        self.covers.push(outcome);
    }

    fn on_now_playing_cleared(&mut self) {
        self.cleared += 1;
    }
}

type TestLink<'a> = DeviceLink<'a, MockUart, MockGatt>;

fn quiet_config() -> LinkConfig {
    LinkConfig {
        live_heartbeat: false,
        ..LinkConfig::default()
    }
}

fn new_link(counters: &ByteCounters, config: LinkConfig) -> Box<TestLink<'_>> {
    Box::new(DeviceLink::new(
        MockUart::default(),
        MockGatt::default(),
        config,
        counters,
    ))
}

fn split_lines(bytes: &mut Vec<u8>) -> Vec<String> {
    let text = String::from_utf8(core::mem::take(bytes)).unwrap();
    text.lines().map(ToString::to_string).collect()
}

fn wired_out(link: &mut TestLink<'_>) -> Vec<String> {
    split_lines(&mut link.uart_mut().tx)
}

fn ble_out(link: &mut TestLink<'_>) -> Vec<String> {
    split_lines(&mut link.gatt_mut().notified)
}

/// Wired host says HELLO at `now_ms`; output is discarded
fn ack_wired(link: &mut TestLink<'_>, now_ms: u32) {
    link.uart_mut().host_sends("HELLO\n");
    link.poll(now_ms, &mut ());
    wired_out(link);
}

/// Connect a BLE central with notifications enabled
fn connect_ble(link: &mut TestLink<'_>, now_ms: u32) {
    link.handle_ble_event(&BleEvent::StackReady, now_ms, &mut ());
    link.handle_ble_event(&BleEvent::Connected { conn_id: 1 }, now_ms, &mut ());
    link.handle_ble_event(&BleEvent::SubscriptionChanged { cccd: 1 }, now_ms, &mut ());
}

fn ble_write(link: &mut TestLink<'_>, characteristic: Characteristic, text: &str, now_ms: u32) {
    link.handle_ble_event(
        &BleEvent::write(characteristic, text.as_bytes()),
        now_ms,
        &mut (),
    );
}

/// Lines as the host publisher wrote them
#[derive(Default)]
struct HostLines {
    lines: Vec<String>,
}

impl LineSink for HostLines {
    type Error = ();

    fn send_line(&mut self, line: &str) -> Result<(), ()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

/// Track, progress and cover from the host publisher
fn publish_now_playing(pixels: &[u16; COVER_PIXELS]) -> Vec<String> {
    let mut publisher = NowPlayingPublisher::new();
    let mut host = HostLines::default();
    publisher
        .publish_track(Track::new("Song", "Band"), &mut host)
        .unwrap();
    publisher
        .publish_progress(1000, 200_000, 0, &mut host)
        .unwrap();
    publisher.publish_cover(pixels, &mut host).unwrap();
    host.lines
}

fn gradient() -> [u16; COVER_PIXELS] {
    core::array::from_fn(|i| (i as u16).wrapping_mul(41))
}

fn assert_cover_shown(link: &TestLink<'_>, pixels: &[u16; COVER_PIXELS]) {
    assert!(link.cover().is_valid());
    for (shown, sent) in link.cover().front().iter().zip(pixels) {
        assert_eq!(*shown, sent.swap_bytes());
    }
}

fn hex_pixels(count: usize, value: u16) -> String {
    (0..count).map(|_| std::format!("{:04X}", value)).collect()
}

#[test]
fn test_start_announces_and_names_device() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    link.start(0);

    assert_eq!(wired_out(&mut link), ["APP START"]);
    assert_eq!(link.gatt().name.as_deref(), Some("SongLed"));
    assert_eq!(link.ble().state(), BleState::Starting);
}

#[test]
fn test_probe_while_unacked() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());

    link.poll(0, &mut ());
    assert_eq!(wired_out(&mut link), ["HELLO"]);
    link.poll(2999, &mut ());
    assert!(wired_out(&mut link).is_empty());
    link.poll(3000, &mut ());
    assert_eq!(wired_out(&mut link), ["HELLO"]);
}

#[test]
fn test_hello_twice_syncs_volume_once() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());

    link.uart_mut().host_sends("HELLO\n");
    link.poll(0, &mut ());
    assert_eq!(wired_out(&mut link), ["HELLO OK", "VOL GET"]);

    link.uart_mut().host_sends("HELLO\r\n");
    link.poll(100, &mut ());
    assert_eq!(wired_out(&mut link), ["HELLO OK"]);
    assert_eq!(link.wired_handshake().state(), HandshakeState::Acked);
}

#[test]
fn test_hello_ok_acknowledges() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());

    link.poll(0, &mut ());
    assert_eq!(wired_out(&mut link), ["HELLO"]);
    link.uart_mut().host_sends("HELLO OK\n");
    link.poll(50, &mut ());
    assert_eq!(wired_out(&mut link), ["VOL GET"]);
    assert!(link.wired_handshake().is_acked());
}

#[test]
fn test_handshake_timeout_resumes_probing() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    ack_wired(&mut link, 0);

    link.poll(30_000, &mut ());
    assert!(link.wired_handshake().is_acked());
    assert!(wired_out(&mut link).is_empty());

    link.poll(30_001, &mut ());
    assert_eq!(link.wired_handshake().state(), HandshakeState::Unacked);
    assert_eq!(wired_out(&mut link), ["HELLO"]);
    assert_eq!(link.stats().count(LinkError::HandshakeTimeout), 1);
}

#[test]
fn test_wired_readiness_is_stricter_than_ack() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    ack_wired(&mut link, 0);

    assert_eq!(link.send(&Command::VolumeSet(30), 3499), Ok(Route::Wired));
    assert_eq!(wired_out(&mut link), ["VOL SET 30"]);

    // Still acked, but no traffic within the staleness window
    assert_eq!(
        link.send(&Command::VolumeSet(40), 3500),
        Err(LinkError::TransportUnavailable)
    );
    assert!(wired_out(&mut link).is_empty());
    assert_eq!(link.stats().count(LinkError::TransportUnavailable), 1);

    // HELLO is still attempted over the cable
    assert_eq!(link.send(&Command::Hello, 3500), Ok(Route::Wired));
    assert_eq!(wired_out(&mut link), ["HELLO"]);
}

#[test]
fn test_ble_lifecycle() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    link.start(0);

    link.handle_ble_event(&BleEvent::StackReady, 0, &mut ());
    assert_eq!(link.gatt().advertising, 1);
    assert_eq!(link.ble().state(), BleState::Advertising);

    link.handle_ble_event(&BleEvent::Connected { conn_id: 4 }, 10, &mut ());
    assert_eq!(link.gatt().mtu_requests, [(4, 517)]);
    assert!(link.ble().is_connected());
    assert!(!link.ble().is_ready());

    link.handle_ble_event(&BleEvent::Disconnected, 20, &mut ());
    assert_eq!(link.gatt().advertising, 2);
    assert_eq!(link.ble().state(), BleState::Advertising);
}

#[test]
fn test_ble_hello_before_subscription_is_queued() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    link.handle_ble_event(&BleEvent::StackReady, 0, &mut ());
    link.handle_ble_event(&BleEvent::Connected { conn_id: 1 }, 0, &mut ());

    ble_write(&mut link, Characteristic::CommandIn, "HELLO\n", 10);
    assert!(ble_out(&mut link).is_empty());
    assert_eq!(link.ble().queue().len(), 2);
    assert!(link.ble_handshake().is_acked());

    link.handle_ble_event(&BleEvent::SubscriptionChanged { cccd: 1 }, 20, &mut ());
    assert_eq!(ble_out(&mut link), ["HELLO OK", "VOL GET"]);
    assert!(link.ble().queue().is_empty());
}

#[test]
fn test_arbiter_prefers_wired_in_auto() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    ack_wired(&mut link, 0);
    connect_ble(&mut link, 0);

    assert_eq!(link.send(&Command::MuteToggle, 100), Ok(Route::Wired));
    assert_eq!(wired_out(&mut link), ["MUTE"]);
    assert!(ble_out(&mut link).is_empty());

    link.set_preference(LinkPreference::Ble);
    assert_eq!(link.send(&Command::MuteToggle, 100), Ok(Route::Ble));
    assert_eq!(ble_out(&mut link), ["MUTE"]);
}

#[test]
fn test_ble_fallback_when_wired_stale() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    link.set_preference(LinkPreference::Wired);
    connect_ble(&mut link, 0);

    assert_eq!(
        link.send(&Command::DeviceList(songlink_protocol::DeviceKind::Speaker), 0),
        Ok(Route::Ble)
    );
    assert_eq!(ble_out(&mut link), ["SPK LIST"]);
}

#[test]
fn test_ble_notify_failure_queues_and_evicts() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    link.set_preference(LinkPreference::Ble);
    connect_ble(&mut link, 0);
    link.gatt_mut().fail_notify = true;

    for volume in 0..13u8 {
        assert_eq!(link.send(&Command::VolumeSet(volume), 0), Ok(Route::Ble));
    }
    assert_eq!(link.ble().queue().len(), 12);
    assert_eq!(link.stats().count(LinkError::QueueOverflow), 1);

    // Failed notifications rotate the queue, so only the count is stable
    link.gatt_mut().fail_notify = false;
    link.handle_ble_event(&BleEvent::SubscriptionChanged { cccd: 1 }, 10, &mut ());
    let sent = ble_out(&mut link);
    assert_eq!(sent.len(), 12);
    assert!(sent.iter().all(|line| line.starts_with("VOL SET ")));
    assert!(link.ble().queue().is_empty());
}

#[test]
fn test_cover_transfer_over_cover_characteristic() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    connect_ble(&mut link, 0);
    let mut recorder = Recorder::default();

    link.handle_ble_event(
        &BleEvent::write(Characteristic::CoverIn, b"NP COV BEGIN 40 40\n"),
        0,
        &mut recorder,
    );
    for _ in 0..COVER_PIXELS / 100 {
        let line = std::format!("NP COV DATA {}\n", hex_pixels(100, 0x1234));
        link.handle_ble_event(
            &BleEvent::write(Characteristic::CoverIn, line.as_bytes()),
            10,
            &mut recorder,
        );
    }
    link.handle_ble_event(
        &BleEvent::write(Characteristic::CoverIn, b"NP COV END\n"),
        20,
        &mut recorder,
    );

    assert!(link.cover().is_valid());
    assert_eq!(link.cover().phase(), CoverPhase::Committed);
    assert!(link.cover().front().iter().all(|&pixel| pixel == 0x3412));
    assert_eq!(recorder.covers, [CoverOutcome::Committed { count: 1600 }]);
    assert_eq!(
        ble_out(&mut link),
        ["VOL GET", "APP RX NP COV BEGIN", "APP RX NP COV END 1600"]
    );
}

#[test]
fn test_incomplete_cover_is_discarded() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    ack_wired(&mut link, 0);

    link.uart_mut().host_sends("NP COV BEGIN 40 40\n");
    for _ in 0..10 {
        let line = std::format!("NP COV DATA {}\n", hex_pixels(100, 0xFFFF));
        link.uart_mut().host_sends(&line);
    }
    link.uart_mut().host_sends("NP COV END\n");

    // Several polls: the UART is read in bounded slices
    for now_ms in 1..10 {
        link.poll(now_ms, &mut ());
    }

    assert!(!link.cover().is_valid());
    assert!(link.cover().front().iter().all(|&pixel| pixel == 0));
    assert_eq!(link.stats().count(LinkError::CoverTransferIncomplete), 1);
    assert_eq!(
        wired_out(&mut link),
        ["APP RX NP COV BEGIN", "APP RX NP COV END 1000"]
    );
}

#[test]
fn test_cover_end_without_begin_is_ignored() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    ack_wired(&mut link, 0);

    link.uart_mut().host_sends("NP COV DATA 1234\nNP COV END\n");
    link.poll(10, &mut ());
    assert!(wired_out(&mut link).is_empty());
    assert_eq!(link.cover().phase(), CoverPhase::Idle);
}

#[test]
fn test_track_change_drops_cover() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    ack_wired(&mut link, 0);

    link.uart_mut()
        .host_sends("NP META Song\tBand\nNP COV BEGIN 1 1\nNP COV DATA 1234\nNP COV END\n");
    link.poll(10, &mut ());
    assert!(link.cover().is_valid());

    link.uart_mut().host_sends("NP META Song\tBand\n");
    link.poll(20, &mut ());
    assert!(link.cover().is_valid());

    link.uart_mut().host_sends("NP META Other|Band\n");
    link.poll(30, &mut ());
    assert!(!link.cover().is_valid());
    assert_eq!(link.media().now_playing.title, "Other");
}

#[test]
fn test_now_playing_proves_liveness() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());

    link.uart_mut().host_sends("NP PROG 1000 200000\n");
    link.poll(0, &mut ());
    assert!(link.wired_handshake().is_acked());
    assert_eq!(wired_out(&mut link), ["VOL GET"]);
    assert_eq!(link.media().now_playing.duration_ms, 200_000);
}

#[test]
fn test_now_playing_timeout_clears() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    let mut recorder = Recorder::default();

    link.uart_mut()
        .host_sends("NP META Song\tBand\nNP COV BEGIN 1 1\nNP COV DATA 00FF\nNP COV END\n");
    link.poll(0, &mut recorder);
    assert!(link.media().now_playing.active);

    link.poll(8000, &mut recorder);
    assert!(link.media().now_playing.active);

    link.poll(8001, &mut recorder);
    assert!(!link.media().now_playing.active);
    assert!(!link.cover().is_valid());
    assert_eq!(recorder.cleared, 1);
}

#[test]
fn test_host_lost_clears_now_playing() {
    let counters = ByteCounters::new();
    let config = LinkConfig {
        now_playing_timeout_ms: 60_000,
        ..quiet_config()
    };
    let mut link = new_link(&counters, config);
    let mut recorder = Recorder::default();

    link.uart_mut().host_sends("NP META Song\tBand\n");
    link.poll(0, &mut recorder);
    link.poll(30_001, &mut recorder);

    assert!(!link.wired_handshake().is_acked());
    assert!(link.media().now_playing.title.is_empty());
    assert_eq!(recorder.cleared, 1);
}

#[test]
fn test_media_commands_reach_observer() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    let mut recorder = Recorder::default();
    ack_wired(&mut link, 0);

    link.uart_mut()
        .host_sends("VOL 35\nMUTE 1\nLRC CUR hello\nBOGUS\nSPK BEGIN\nSPK ITEM 2 Speakers\nSPK END\n");
    link.poll(10, &mut recorder);

    assert_eq!(link.media().volume, 35);
    assert!(link.media().muted);
    assert_eq!(link.media().lyrics.current, "hello");
    assert_eq!(link.media().speakers.entries.len(), 1);
    assert_eq!(recorder.changes.len(), 6);
    assert_eq!(recorder.changes[0], MediaChange::Volume);
}

#[test]
fn test_oversized_wired_line_is_dropped() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    ack_wired(&mut link, 0);

    let long: String = core::iter::repeat('A').take(1500).collect();
    link.uart_mut().host_sends(&std::format!("LRC CUR {}\nVOL 12\n", long));
    for now_ms in 1..4 {
        link.poll(now_ms, &mut ());
    }

    assert_eq!(link.stats().count(LinkError::MalformedFrame), 1);
    assert!(link.media().lyrics.current.is_empty());
    assert_eq!(link.media().volume, 12);
}

#[test]
fn test_init_failure_disables_ble() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    link.gatt_mut().fail_name = true;
    link.start(0);

    assert_eq!(link.ble().state(), BleState::Disabled);
    assert_eq!(link.stats().count(LinkError::InitFailure), 1);

    link.handle_ble_event(&BleEvent::StackReady, 10, &mut ());
    assert_eq!(link.gatt().advertising, 0);

    // Wired keeps working
    assert_eq!(wired_out(&mut link), ["APP START"]);
    ack_wired(&mut link, 20);
    assert_eq!(link.send(&Command::VolumeGet, 30), Ok(Route::Wired));
}

#[test]
fn test_wired_disconnect_resets_handshake() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    ack_wired(&mut link, 0);

    link.uart_mut().disconnected = true;
    link.poll(10, &mut ());
    assert!(!link.wired_handshake().is_acked());
    assert!(wired_out(&mut link).is_empty());
}

#[test]
fn test_live_heartbeat() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, LinkConfig::default());

    // Nothing ready: no heartbeat, only the probe
    link.poll(0, &mut ());
    assert_eq!(wired_out(&mut link), ["HELLO"]);

    link.uart_mut().host_sends("HELLO\n");
    link.poll(1000, &mut ());
    assert_eq!(wired_out(&mut link), ["HELLO OK", "VOL GET", "APP LIVE"]);

    link.poll(1500, &mut ());
    assert!(wired_out(&mut link).is_empty());
    link.poll(2000, &mut ());
    assert_eq!(wired_out(&mut link), ["APP LIVE"]);
}

#[test]
fn test_status_snapshot() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    assert!(!link.status(0).is_ready());

    ack_wired(&mut link, 0);
    let status = link.status(100);
    assert!(status.wired.connected);
    assert!(status.wired.acked);
    assert!(status.wired.ready);
    assert!(!status.ble.connected);
    assert_eq!(status.route, Some(Route::Wired));
    assert_eq!(status.preference, LinkPreference::Auto);
}

#[test]
fn test_drain_ble_events_from_channel() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    let events: BleEvents<CriticalSectionRawMutex, 4, 4> = BleEvents::new();

    assert!(events.post(BleEvent::StackReady, &counters));
    assert!(events.post(BleEvent::Connected { conn_id: 9 }, &counters));
    assert!(events.post(BleEvent::SubscriptionChanged { cccd: 1 }, &counters));

    assert_eq!(link.drain_ble_events(&events, 0, &mut ()), 3);
    assert!(link.ble().is_ready());
    assert_eq!(link.drain_ble_events(&events, 0, &mut ()), 0);
}

#[test]
fn test_disconnect_during_write_burst_is_applied() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    let events: BleEvents<CriticalSectionRawMutex, 4, 8> = BleEvents::new();
    connect_ble(&mut link, 0);

    let line = std::format!("NP COV DATA {}\n", hex_pixels(100, 0x1234));
    let posted = (0..9)
        .filter(|_| events.post(BleEvent::write(Characteristic::CoverIn, line.as_bytes()), &counters))
        .count();
    assert_eq!(posted, 8);
    assert!(events.post(BleEvent::Disconnected, &counters));

    link.drain_ble_events(&events, 10, &mut ());
    assert!(!link.ble().is_connected());
    assert!(!link.ble().is_ready());
    assert_eq!(link.ble().state(), BleState::Advertising);
    assert_eq!(link.gatt().advertising, 2);
    // Writes of the dead connection are not delivered
    assert_eq!(link.cover().phase(), CoverPhase::Idle);
}

#[test]
fn test_writes_wait_for_pending_connect() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    let events: BleEvents<CriticalSectionRawMutex, 4, 4> = BleEvents::new();
    link.handle_ble_event(&BleEvent::StackReady, 0, &mut ());

    assert!(events.post(BleEvent::Connected { conn_id: 2 }, &counters));
    assert!(events.post(BleEvent::write(Characteristic::CommandIn, b"VOL 21\n"), &counters));

    // A wake on the write applies the connect first
    let write = events.writes().try_receive().unwrap();
    link.drain_ble_lifecycle(&events, 5, &mut ());
    link.handle_ble_event(&write, 5, &mut ());
    assert_eq!(link.media().volume, 21);
}

#[test]
fn test_ble_hello_follows_late_subscription() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    link.handle_ble_event(&BleEvent::StackReady, 0, &mut ());
    link.handle_ble_event(&BleEvent::Connected { conn_id: 1 }, 0, &mut ());

    link.poll(0, &mut ());
    link.poll(2000, &mut ());
    assert!(ble_out(&mut link).is_empty());

    link.handle_ble_event(&BleEvent::SubscriptionChanged { cccd: 1 }, 2100, &mut ());
    link.poll(2100, &mut ());
    assert_eq!(ble_out(&mut link), ["HELLO"]);

    link.poll(5099, &mut ());
    assert!(ble_out(&mut link).is_empty());
    link.poll(5100, &mut ());
    assert_eq!(ble_out(&mut link), ["HELLO"]);
}

#[test]
fn test_published_now_playing_over_wired() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    let mut recorder = Recorder::default();
    let pixels = gradient();

    for line in publish_now_playing(&pixels) {
        link.uart_mut().host_sends(&line);
        link.uart_mut().host_sends("\n");
    }
    let mut now_ms = 0;
    while !link.uart().rx.is_empty() {
        link.poll(now_ms, &mut recorder);
        now_ms += 10;
    }

    assert_eq!(link.media().now_playing.title, "Song");
    assert_eq!(link.media().now_playing.artist, "Band");
    assert_eq!(link.media().now_playing.duration_ms, 200_000);
    assert_cover_shown(&link, &pixels);
    assert_eq!(recorder.covers, [CoverOutcome::Committed { count: 1600 }]);
    let replies = wired_out(&mut link);
    assert!(replies.iter().any(|line| line == "APP RX NP COV END 1600"));
    assert_eq!(link.stats().count(LinkError::MalformedFrame), 0);
}

#[test]
fn test_published_now_playing_over_ble() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());
    let mut recorder = Recorder::default();
    let pixels = gradient();
    connect_ble(&mut link, 0);

    for line in publish_now_playing(&pixels) {
        let characteristic = if line.starts_with("NP COV") {
            Characteristic::CoverIn
        } else {
            Characteristic::CommandIn
        };
        let write = std::format!("{}\n", line);
        link.handle_ble_event(&BleEvent::write(characteristic, write.as_bytes()), 10, &mut recorder);
    }

    assert_eq!(link.media().now_playing.title, "Song");
    assert_eq!(link.media().now_playing.position_ms, 1000);
    assert_cover_shown(&link, &pixels);
    assert_eq!(recorder.covers, [CoverOutcome::Committed { count: 1600 }]);
    let replies = ble_out(&mut link);
    assert!(replies.iter().any(|line| line == "APP RX NP COV END 1600"));
}

#[test]
fn test_throughput_counts_wired_and_sent_bytes() {
    let counters = ByteCounters::new();
    let mut link = new_link(&counters, quiet_config());

    // First poll probes and opens the rate window
    link.poll(0, &mut ());
    assert_eq!(counters.tx_total(), 6);

    link.uart_mut().host_sends("HELLO\n");
    link.poll(500, &mut ());
    assert_eq!(counters.rx_total(), 6);
    // "HELLO OK\n" + "VOL GET\n"
    assert_eq!(counters.tx_total(), 6 + 17);

    link.poll(1000, &mut ());
    let status = link.status(1000);
    assert_eq!(status.rx_bytes_per_sec, 6);
    assert_eq!(status.tx_bytes_per_sec, 17);
}

proptest::proptest! {
    #[test]
    fn test_ble_write_split_is_invisible(split in 0usize..27) {
        let script = b"VOL 44\nLRC CUR a b c\nMUTE 1\n";
        let counters = ByteCounters::new();
        let mut link = new_link(&counters, quiet_config());
        connect_ble(&mut link, 0);

        let (head, tail) = script.split_at(split);
        for part in [head, tail] {
            link.handle_ble_event(&BleEvent::write(Characteristic::CommandIn, part), 0, &mut ());
        }

        proptest::prop_assert_eq!(link.media().volume, 44);
        proptest::prop_assert_eq!(link.media().lyrics.current.as_str(), "a b c");
        proptest::prop_assert!(link.media().muted);
    }
}
