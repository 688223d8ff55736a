//! Device link runtime
//!
//! [`DeviceLink`] owns both transports and all link state. It is driven from
//! a single loop: [`DeviceLink::poll`] reads the UART and advances timers,
//! [`DeviceLink::handle_ble_event`] applies events posted by the BLE stack.
//!
//! Received bytes of BLE writes are counted by whoever posts the event (see
//! [`post_ble_event`](crate::channels::post_ble_event)); the link counts
//! wired input and everything it sends.

mod dispatch;
mod observer;

#[cfg(test)]
mod tests;

pub use observer::LinkObserver;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use songlink_core::ble::{BleAction, BleEvent, BleLink, Characteristic, SendOutcome};
use songlink_core::config::LinkConfig;
use songlink_core::cover::CoverTransfer;
use songlink_core::link::{HandshakeManager, HandshakeTimings, LinkArbiter, LinkPreference, Route};
use songlink_core::state::MediaState;
use songlink_core::{LinkError, LinkStats, LinkStatus, TransportStatus};
use songlink_hal::{AdvertisingParams, GattServer, UartRx, UartTx};
use songlink_protocol::{Command, LineFramer, BLE_RX_CAPACITY, MAX_LINE_LEN, WIRED_RX_CAPACITY};

use crate::channels::BleEvents;

use crate::throughput::{ByteCounters, RateMeter};

/// Bytes read from the UART per call
const RX_CHUNK_SIZE: usize = 128;

/// UART reads per poll, so one poll never stalls the loop
const MAX_READS_PER_POLL: usize = 8;

/// Inbound line assembly, one framer per byte stream
struct Receivers {
    wired: LineFramer<WIRED_RX_CAPACITY>,
    command: LineFramer<BLE_RX_CAPACITY>,
    cover: LineFramer<BLE_RX_CAPACITY>,
}

impl Receivers {
    const fn new() -> Self {
        Self {
            wired: LineFramer::new(),
            command: LineFramer::new(),
            cover: LineFramer::new(),
        }
    }

    fn reset_ble(&mut self) {
        self.command.reset();
        self.cover.reset();
    }
}

/// Everything except the framers, so decoded lines can borrow a framer while
/// the rest of the link is updated
struct LinkCore<'a, U, G> {
    uart: U,
    gatt: G,
    config: LinkConfig,
    counters: &'a ByteCounters,
    wired_connected: bool,
    wired_handshake: HandshakeManager,
    ble: BleLink,
    ble_handshake: HandshakeManager,
    arbiter: LinkArbiter,
    cover: CoverTransfer,
    media: MediaState,
    stats: LinkStats,
    rates: RateMeter,
    /// Some transport was acked at the last check
    linked: bool,
    last_live_ms: Option<u32>,
}

/// Wired and BLE transports behind one command interface
pub struct DeviceLink<'a, U, G> {
    receivers: Receivers,
    core: LinkCore<'a, U, G>,
}

impl<'a, U, G> DeviceLink<'a, U, G>
where
    U: UartTx + UartRx,
    G: GattServer,
{
    /// Create the link; call [`start`](Self::start) before polling
    pub fn new(uart: U, gatt: G, config: LinkConfig, counters: &'a ByteCounters) -> Self {
        let timings = HandshakeTimings::from(&config);
        Self {
            receivers: Receivers::new(),
            core: LinkCore {
                uart,
                gatt,
                counters,
                wired_connected: false,
                wired_handshake: HandshakeManager::new(timings),
                ble: BleLink::new(config.ble_enabled, config.preferred_mtu),
                ble_handshake: HandshakeManager::new(timings),
                arbiter: LinkArbiter::new(config.preference),
                cover: CoverTransfer::new(),
                media: MediaState::new(),
                stats: LinkStats::new(),
                rates: RateMeter::new(),
                linked: false,
                last_live_ms: None,
                config,
            },
        }
    }

    /// Name the BLE device and announce the device on the wired transport
    ///
    /// Advertising starts once the stack reports [`BleEvent::StackReady`].
    pub fn start(&mut self, now_ms: u32) {
        info!("Link starting");

        if self.core.config.ble_enabled
            && self
                .core
                .gatt
                .set_device_name(&self.core.config.device_name)
                .is_err()
        {
            self.handle_ble_event(&BleEvent::InitFailed, now_ms, &mut ());
        }

        if self.core.transmit(Route::Wired, &Command::AppStart).is_err() {
            debug!("APP START not sent");
        }
    }

    /// One main-loop iteration: read the UART, then advance timers
    pub fn poll<O: LinkObserver>(&mut self, now_ms: u32, observer: &mut O) {
        self.poll_wired(now_ms, observer);
        self.core.poll_timers(now_ms, observer);
    }

    fn poll_wired<O: LinkObserver>(&mut self, now_ms: u32, observer: &mut O) {
        let connected = self.core.uart.is_connected();
        if connected != self.core.wired_connected {
            self.core.wired_connected = connected;
            if connected {
                info!("Wired host connected");
            } else {
                info!("Wired host disconnected");
                self.receivers.wired.reset();
                self.core.wired_handshake.reset();
            }
        }
        if !connected {
            return;
        }

        let mut buf = [0u8; RX_CHUNK_SIZE];
        for _ in 0..MAX_READS_PER_POLL {
            let n = match self.core.uart.read_available(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(_) => {
                    warn!("UART read error");
                    break;
                }
            };
            trace!("RX: {} bytes", n);
            self.core.counters.add_rx(n);

            let mut lines = self.receivers.wired.feed(&buf[..n]);
            while let Some(frame) = lines.next_event() {
                self.core.on_frame(Route::Wired, frame, now_ms, observer);
            }
        }
    }

    /// Apply one event from the BLE stack
    pub fn handle_ble_event<O: LinkObserver>(
        &mut self,
        event: &BleEvent,
        now_ms: u32,
        observer: &mut O,
    ) {
        if let BleEvent::SubscriptionChanged { cccd } = event {
            debug!("CCCD written: {}", cccd);
        }

        for action in self.core.ble.handle(event) {
            match action {
                BleAction::StartAdvertising => self.core.start_advertising(),
                BleAction::RequestMtu { conn_id, mtu } => {
                    if self.core.gatt.request_mtu(conn_id, mtu).is_err() {
                        debug!("MTU request refused");
                    }
                }
                BleAction::Flush => self.core.flush_ble(),
                BleAction::Deliver(characteristic) => {
                    let BleEvent::Write { data, .. } = event else {
                        continue;
                    };
                    let framer = match characteristic {
                        Characteristic::CoverIn => &mut self.receivers.cover,
                        _ => &mut self.receivers.command,
                    };
                    let mut lines = framer.feed(data);
                    while let Some(frame) = lines.next_event() {
                        self.core.on_frame(Route::Ble, frame, now_ms, observer);
                    }
                }
                BleAction::LinkUp => {
                    info!("BLE connected");
                    self.core.ble_handshake.reset();
                }
                BleAction::LinkDown => {
                    info!("BLE disconnected");
                    self.receivers.reset_ble();
                    self.core.ble_handshake.reset();
                }
                BleAction::Disabled => {
                    error!("BLE init failed, continuing on wired only");
                    self.core.stats.record(LinkError::InitFailure);
                    self.receivers.reset_ble();
                    self.core.ble_handshake.reset();
                }
            }
        }
    }

    /// Apply every event waiting in `events`
    ///
    /// Lifecycle events go first, then writes. Handles at most one channel's
    /// worth of each per call. Returns the number handled.
    pub fn drain_ble_events<M, O, const C: usize, const W: usize>(
        &mut self,
        events: &BleEvents<M, C, W>,
        now_ms: u32,
        observer: &mut O,
    ) -> usize
    where
        M: RawMutex,
        O: LinkObserver,
    {
        self.drain_ble_lifecycle(events, now_ms, observer)
            + self.drain_channel(events.writes(), now_ms, observer)
    }

    /// Apply pending lifecycle events only
    pub fn drain_ble_lifecycle<M, O, const C: usize, const W: usize>(
        &mut self,
        events: &BleEvents<M, C, W>,
        now_ms: u32,
        observer: &mut O,
    ) -> usize
    where
        M: RawMutex,
        O: LinkObserver,
    {
        self.drain_channel(events.control(), now_ms, observer)
    }

    fn drain_channel<M, O, const N: usize>(
        &mut self,
        channel: &Channel<M, BleEvent, N>,
        now_ms: u32,
        observer: &mut O,
    ) -> usize
    where
        M: RawMutex,
        O: LinkObserver,
    {
        let mut handled = 0;
        while handled < N {
            let Ok(event) = channel.try_receive() else {
                break;
            };
            self.handle_ble_event(&event, now_ms, observer);
            handled += 1;
        }
        handled
    }

    /// Send an application command on the transport picked by the arbiter
    ///
    /// Fails with `TransportUnavailable` when nothing is ready; `HELLO` still
    /// goes out on the wired transport then.
    pub fn send(&mut self, command: &Command<'_>, now_ms: u32) -> Result<Route, LinkError> {
        let route = self.core.route_for(command, now_ms).ok_or_else(|| {
            debug!("No transport ready, dropping command");
            self.core.stats.record(LinkError::TransportUnavailable);
            LinkError::TransportUnavailable
        })?;
        self.core.transmit(route, command)?;
        Ok(route)
    }

    /// Snapshot for the ready indicator and the UI
    pub fn status(&self, now_ms: u32) -> LinkStatus {
        let core = &self.core;
        LinkStatus {
            wired: TransportStatus {
                connected: core.uart.is_connected(),
                acked: core.wired_handshake.is_acked(),
                ready: core.wired_ready(now_ms),
            },
            ble: TransportStatus {
                connected: core.ble.is_connected(),
                acked: core.ble_handshake.is_acked(),
                ready: core.ble.is_ready(),
            },
            route: core.route(now_ms),
            preference: core.arbiter.preference(),
            rx_bytes_per_sec: core.rates.rx_per_sec(),
            tx_bytes_per_sec: core.rates.tx_per_sec(),
        }
    }

    /// Current transport preference
    pub fn preference(&self) -> LinkPreference {
        self.core.arbiter.preference()
    }

    /// Change the transport preference (settings menu)
    pub fn set_preference(&mut self, preference: LinkPreference) {
        self.core.arbiter.set_preference(preference);
        self.core.config.preference = preference;
    }

    pub fn config(&self) -> &LinkConfig {
        &self.core.config
    }

    /// Decoded host state
    pub fn media(&self) -> &MediaState {
        &self.core.media
    }

    /// Decoded host state, for local edits such as the volume hold
    pub fn media_mut(&mut self) -> &mut MediaState {
        &mut self.core.media
    }

    /// Cover art receiver; [`CoverTransfer::front`] is the published cover
    pub fn cover(&self) -> &CoverTransfer {
        &self.core.cover
    }

    /// Failure counters
    pub fn stats(&self) -> &LinkStats {
        &self.core.stats
    }

    pub fn ble(&self) -> &BleLink {
        &self.core.ble
    }

    pub fn wired_handshake(&self) -> &HandshakeManager {
        &self.core.wired_handshake
    }

    pub fn ble_handshake(&self) -> &HandshakeManager {
        &self.core.ble_handshake
    }

    pub fn uart(&self) -> &U {
        &self.core.uart
    }

    pub fn uart_mut(&mut self) -> &mut U {
        &mut self.core.uart
    }

    pub fn gatt(&self) -> &G {
        &self.core.gatt
    }

    pub fn gatt_mut(&mut self) -> &mut G {
        &mut self.core.gatt
    }
}

impl<U, G> LinkCore<'_, U, G>
where
    U: UartTx + UartRx,
    G: GattServer,
{
    fn wired_ready(&self, now_ms: u32) -> bool {
        self.uart.is_connected()
            && self
                .wired_handshake
                .is_fresh(now_ms, self.config.wired_stale_ms)
    }

    fn route(&self, now_ms: u32) -> Option<Route> {
        self.arbiter
            .route(self.wired_ready(now_ms), self.ble.is_ready())
    }

    fn route_for(&self, command: &Command<'_>, now_ms: u32) -> Option<Route> {
        self.arbiter
            .route_for(command, self.wired_ready(now_ms), self.ble.is_ready())
    }

    fn handshake_mut(&mut self, route: Route) -> &mut HandshakeManager {
        match route {
            Route::Wired => &mut self.wired_handshake,
            Route::Ble => &mut self.ble_handshake,
        }
    }

    /// Encode `command` and send it on `route`, counting failures
    fn transmit(&mut self, route: Route, command: &Command<'_>) -> Result<(), LinkError> {
        let result = match command.encode::<MAX_LINE_LEN>() {
            Ok(line) => self.send_line(route, &line),
            Err(e) => {
                warn!("Cannot encode command: {:?}", e);
                Err(LinkError::MalformedFrame)
            }
        };
        if let Err(e) = result {
            self.stats.record(e);
        }
        result
    }

    fn send_line(&mut self, route: Route, line: &str) -> Result<(), LinkError> {
        trace!("TX {:?}: {}", route, line);
        match route {
            Route::Wired => self.write_wired(line),
            Route::Ble => self.send_ble(line),
        }
    }

    fn write_wired(&mut self, line: &str) -> Result<(), LinkError> {
        if !self.uart.is_connected() {
            return Err(LinkError::TransportUnavailable);
        }
        let payload = terminated(line);
        self.uart.write(&payload).map_err(|_| {
            warn!("UART write failed");
            LinkError::TransportUnavailable
        })?;
        self.counters.add_tx(payload.len());
        Ok(())
    }

    fn send_ble(&mut self, line: &str) -> Result<(), LinkError> {
        let gatt = &mut self.gatt;
        let counters = self.counters;
        let outcome = self
            .ble
            .send(line, |conn_id, data| notify(gatt, counters, conn_id, data))?;

        if outcome == SendOutcome::QueuedEvicted {
            warn!("BLE queue full, oldest line dropped");
            self.stats.record(LinkError::QueueOverflow);
        }
        Ok(())
    }

    fn flush_ble(&mut self) {
        let gatt = &mut self.gatt;
        let counters = self.counters;
        let outcome = self
            .ble
            .flush(|conn_id, data| notify(gatt, counters, conn_id, data));

        if outcome.sent > 0 {
            trace!("Flushed {} queued lines", outcome.sent);
        }
        if outcome.stalled {
            debug!("BLE notify stalled, {} lines waiting", self.ble.queue().len());
        }
    }

    fn start_advertising(&mut self) {
        match self.gatt.start_advertising(&AdvertisingParams::default()) {
            Ok(()) => {
                info!("Advertising as {}", self.config.device_name.as_str());
                self.ble.handle(&BleEvent::AdvertisingStarted);
            }
            Err(_) => {
                warn!("Advertising failed to start");
                self.ble.handle(&BleEvent::AdvertisingFailed);
            }
        }
    }

    fn poll_timers<O: LinkObserver>(&mut self, now_ms: u32, observer: &mut O) {
        if self.wired_connected {
            let poll = self.wired_handshake.poll(now_ms, true);
            self.on_handshake_poll(Route::Wired, poll.timed_out, poll.send_probe);
        }
        if self.ble.is_connected() {
            // Probes wait for the notification path
            let poll = self.ble_handshake.poll(now_ms, self.ble.is_ready());
            self.on_handshake_poll(Route::Ble, poll.timed_out, poll.send_probe);
        }

        self.check_host_lost(observer);

        if self
            .media
            .expire_now_playing(now_ms, self.config.now_playing_timeout_ms)
        {
            info!("Now playing timed out");
            self.cover.clear();
            observer.on_now_playing_cleared();
        }

        self.heartbeat(now_ms);

        if self.ble.is_ready() && !self.ble.queue().is_empty() {
            self.flush_ble();
        }

        self.rates.update(now_ms, self.counters);
    }

    fn on_handshake_poll(&mut self, route: Route, timed_out: bool, send_probe: bool) {
        if timed_out {
            warn!("{:?} handshake timed out", route);
            self.stats.record(LinkError::HandshakeTimeout);
        }
        if send_probe {
            let _ = self.transmit(route, &Command::Hello);
        }
    }

    /// Drop host-provided state once no transport is acked any more
    fn check_host_lost<O: LinkObserver>(&mut self, observer: &mut O) {
        let linked = self.wired_handshake.is_acked() || self.ble_handshake.is_acked();
        if self.linked && !linked {
            info!("Host lost, clearing now playing");
            self.media.clear_now_playing();
            self.cover.clear();
            observer.on_now_playing_cleared();
        }
        self.linked = linked;
    }

    fn heartbeat(&mut self, now_ms: u32) {
        if !self.config.live_heartbeat {
            return;
        }
        let due = self.last_live_ms.map_or(true, |at| {
            now_ms.wrapping_sub(at) >= self.config.live_interval_ms
        });
        if !due {
            return;
        }
        self.last_live_ms = Some(now_ms);
        if let Some(route) = self.route(now_ms) {
            let _ = self.transmit(route, &Command::AppLive);
        }
    }
}

/// Hand a notification to the stack, counting what it accepted
fn notify<G: GattServer>(gatt: &mut G, counters: &ByteCounters, conn_id: u16, data: &[u8]) -> bool {
    match gatt.notify(conn_id, data) {
        Ok(()) => {
            counters.add_tx(data.len());
            true
        }
        Err(_) => false,
    }
}

/// `line` plus `\n`, truncated to the outbound line limit
fn terminated(line: &str) -> Vec<u8, MAX_LINE_LEN> {
    let mut payload = Vec::new();
    let len = line.len().min(MAX_LINE_LEN - 1);
    // Cannot fail: the terminator still fits after truncation
    let _ = payload.extend_from_slice(&line.as_bytes()[..len]);
    let _ = payload.push(b'\n');
    payload
}
