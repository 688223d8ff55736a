//! Link main loop
//!
//! Polls the UART every tick and wakes early when the BLE stack posts an
//! event, so writes are handled without waiting for the next tick.

use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant, Ticker};

use songlink_hal::{GattServer, UartRx, UartTx};

use crate::channels::{publish_status, BleEvents};
use crate::link::{DeviceLink, LinkObserver};

/// Poll interval in milliseconds
pub const TICK_INTERVAL_MS: u32 = 10;

/// Link task - drives a [`DeviceLink`] forever
///
/// Publishes a status snapshot after every iteration.
pub async fn link_task<U, G, O, M, const C: usize, const W: usize>(
    link: &mut DeviceLink<'_, U, G>,
    events: &BleEvents<M, C, W>,
    observer: &mut O,
) -> !
where
    U: UartTx + UartRx,
    G: GattServer,
    O: LinkObserver,
    M: RawMutex,
{
    info!("Link task started");

    let start = Instant::now();
    let mut ticker = Ticker::every(Duration::from_millis(u64::from(TICK_INTERVAL_MS)));

    link.start(elapsed_ms(start));

    loop {
        let woken = select3(
            ticker.next(),
            events.control().receive(),
            events.writes().receive(),
        )
        .await;

        let now_ms = elapsed_ms(start);
        match woken {
            Either3::First(()) => {}
            Either3::Second(event) => link.handle_ble_event(&event, now_ms, observer),
            Either3::Third(write) => {
                // Pending lifecycle events were posted first
                link.drain_ble_lifecycle(events, now_ms, observer);
                link.handle_ble_event(&write, now_ms, observer);
            }
        }
        link.drain_ble_events(events, now_ms, observer);
        link.poll(now_ms, observer);

        publish_status(link.status(now_ms));
    }
}

/// Milliseconds since `start`, wrapping like the rest of the link timers
fn elapsed_ms(start: Instant) -> u32 {
    start.elapsed().as_millis() as u32
}
