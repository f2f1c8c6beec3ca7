/*
 * The devices the tasks talk to, as far as the tasks are concerned.
 *
 * Sensor and display live on the shared bus and get it passed in for the
 * duration of one call; the caller is the one holding the arbiter. The
 * actuator has a channel of its own and needs no bus.
 */

pub mod bmp280;
pub mod lcd;

use crate::control::Measurement;
use crate::display::Lines;
use crate::error::Error;

#[allow(async_fn_in_trait)]
pub trait Sensor<B> {
    /// One bus transaction's worth of sampling, converted to engineering units.
    async fn sample(&mut self, bus: &mut B) -> Result<Measurement, Error>;
}

#[allow(async_fn_in_trait)]
pub trait LineDisplay<B> {
    async fn show(&mut self, bus: &mut B, lines: &Lines) -> Result<(), Error>;
}

pub trait Actuator {
    /// Set the output level. `duty` is normalized, `0.0..=1.0`.
    fn set_duty(&mut self, duty: f32);
}
