/*
 * Coordination core of the thermostat node.
 *
 * Two tasks share one I2C bus: the sampler reads the sensor on a fixed
 * period and posts samples to a mailbox, the presenter drives the heater and
 * the display from each sample. A push button toggles what the display shows
 * and reaches the presenter through a latch that interrupt handlers may arm.
 *
 * Everything here is hardware agnostic; the firmware binary supplies the
 * board's bus, pins and timers.
 */
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod acquisition;
pub mod bus;
pub mod config;
pub mod control;
pub mod counter;
pub mod display;
pub mod drivers;
pub mod error;
pub mod latch;
pub mod mailbox;
pub mod presentation;

pub use control::{ControlLaw, Measurement};
pub use error::Error;
