/*
 * Edge counting for the pulse input.
 *
 * Interrupt context bumps the counter with one atomic increment and nothing
 * else. The display task swaps the count back to zero once per window, so no
 * edge is counted twice or lost between the read and the reset.
 *
 * The frequency goes out on a character display that shares the bus with the
 * sensor and the thermostat display, so every refresh goes through the bus
 * arbiter with a bounded wait like any other bus user.
 */

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Ticker};

use crate::bus::BusArbiter;
use crate::display::render_frequency;
use crate::drivers::LineDisplay;
use crate::error::Error;

pub struct EdgeCounter {
    count: AtomicU32,
}

impl EdgeCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Count one edge. Safe to call from interrupt context.
    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and reset the count.
    pub fn take(&self) -> u32 {
        self.count.swap(0, Ordering::Relaxed)
    }
}

impl Default for EdgeCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Edges per second for `count` edges seen over `window`, saturating at
/// `u32::MAX`.
pub fn frequency_hz(count: u32, window: Duration) -> u32 {
    let window_ms = window.as_millis();
    if window_ms == 0 {
        return 0;
    }
    u32::try_from(count as u64 * 1000 / window_ms).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyDisplay {
    pub window: Duration,
    pub bus_timeout: Duration,
}

impl FrequencyDisplay {
    pub const fn new(window: Duration, bus_timeout: Duration) -> Self {
        Self {
            window,
            bus_timeout,
        }
    }

    /// Put one frequency on the display. Holds the bus only for the write.
    pub async fn show<BM, B, D>(
        &self,
        hz: u32,
        arbiter: &BusArbiter<BM, B>,
        display: &mut D,
    ) -> Result<(), Error>
    where
        BM: RawMutex,
        D: LineDisplay<B>,
    {
        let lines = render_frequency(hz);
        let mut bus = arbiter.acquire(self.bus_timeout).await?;
        let shown = display.show(&mut *bus, &lines).await;
        bus.release();
        shown
    }

    /// Show the edge frequency of every window, forever. A window whose
    /// refresh cannot get the bus is skipped; its edges are not carried over.
    pub async fn run<BM, B, D>(
        &self,
        counter: &EdgeCounter,
        arbiter: &BusArbiter<BM, B>,
        display: &mut D,
    ) -> !
    where
        BM: RawMutex,
        D: LineDisplay<B>,
    {
        info!("counting pulses over {} ms windows", self.window.as_millis());
        let mut ticker = Ticker::every(self.window);
        // Edges from before the first window started do not belong to it.
        counter.take();

        loop {
            ticker.next().await;
            let hz = frequency_hz(counter.take(), self.window);
            trace!("pulse input at {} Hz", hz);
            match self.show(hz, arbiter, display).await {
                Ok(()) => {}
                Err(Error::BusContention) => warn!("bus busy, frequency not shown"),
                Err(error) => warn!("frequency display failed: {}", error),
            }
        }
    }
}
