/*
 * Timing and sizing constants for the control node.
 *
 * Control law tuning lives with the law itself, see `ControlLaw::DEFAULT`.
 */

use embassy_time::Duration;

// The sampler runs once per period, paced by a ticker.
pub const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

// The sampler gives up on the bus after this long and skips the cycle.
pub const SENSOR_BUS_TIMEOUT: Duration = Duration::from_millis(100);

pub const RENDER_BUS_TIMEOUT: Duration = Duration::from_millis(250);

// Button edges closer together than this are treated as contact bounce.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(200);

pub const MAILBOX_CAPACITY: usize = 5;
const _: () = assert!(MAILBOX_CAPACITY >= 1 && MAILBOX_CAPACITY <= 10);

// 16x2 character display.
pub const LINE_WIDTH: usize = 16;
pub const LINE_COUNT: usize = 2;

pub const FREQUENCY_WINDOW: Duration = Duration::from_secs(1);
