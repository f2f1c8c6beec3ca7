/*
 * The sampler.
 *
 * Once per period: take the bus with a short timeout, read the sensor, give
 * the bus back, post the sample. If any step fails the sample is lost and the
 * next period tries again; nothing here waits past its timeout and nothing
 * is retried within a period.
 *
 * For sensors that interrupt when a conversion completes there is a second
 * shape: a periodic task only starts conversions, and the interrupt handler
 * converts the result and posts it without blocking.
 */

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Ticker};

use crate::bus::BusArbiter;
use crate::control::Measurement;
use crate::drivers::Sensor;
use crate::error::Error;
use crate::mailbox::{Mailbox, SendPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquisition {
    pub period: Duration,
    pub bus_timeout: Duration,
    pub policy: SendPolicy,
}

impl Acquisition {
    pub const fn new(period: Duration, bus_timeout: Duration, policy: SendPolicy) -> Self {
        Self {
            period,
            bus_timeout,
            policy,
        }
    }

    /// One sampling period, without the wait for the next one.
    pub async fn cycle<BM, B, S, QM, const N: usize>(
        &self,
        arbiter: &BusArbiter<BM, B>,
        sensor: &mut S,
        mailbox: &Mailbox<QM, Measurement, N>,
    ) -> Result<Measurement, Error>
    where
        BM: RawMutex,
        QM: RawMutex,
        S: Sensor<B>,
    {
        let mut bus = arbiter.acquire(self.bus_timeout).await?;
        let sample = sensor.sample(&mut *bus).await;
        bus.release();

        let measurement = sample?;
        mailbox.send(measurement, self.policy).await?;
        Ok(measurement)
    }

    pub async fn run<BM, B, S, QM, const N: usize>(
        &self,
        arbiter: &BusArbiter<BM, B>,
        sensor: &mut S,
        mailbox: &Mailbox<QM, Measurement, N>,
    ) -> !
    where
        BM: RawMutex,
        QM: RawMutex,
        S: Sensor<B>,
    {
        info!("sampling every {} ms", self.period.as_millis());
        let mut ticker = Ticker::every(self.period);

        loop {
            match self.cycle(arbiter, sensor, mailbox).await {
                Ok(measurement) => trace!("sampled {}", measurement.primary),
                Err(Error::BusContention) => warn!("bus busy, sample skipped"),
                Err(error) => warn!("sample lost: {}", error),
            }
            ticker.next().await;
        }
    }
}

/// Linear on-chip temperature sensor read through the ADC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalDiode {
    /// ADC reference voltage.
    pub full_scale: f32,
    pub resolution_bits: u8,
    /// Sensor voltage at `reference_celsius`.
    pub reference_volts: f32,
    pub reference_celsius: f32,
    /// Change in sensor voltage per degree, negative for a falling slope.
    pub volts_per_celsius: f32,
}

impl ThermalDiode {
    /// STM32F1 internal sensor: 1.43 V at 25 °C, falling 4.3 mV/°C.
    pub const STM32F1: ThermalDiode = ThermalDiode {
        full_scale: 3.3,
        resolution_bits: 12,
        reference_volts: 1.43,
        reference_celsius: 25.0,
        volts_per_celsius: -0.0043,
    };

    /// RP2040 internal sensor: 0.706 V at 27 °C, falling 1.721 mV/°C.
    pub const RP2040: ThermalDiode = ThermalDiode {
        full_scale: 3.3,
        resolution_bits: 12,
        reference_volts: 0.706,
        reference_celsius: 27.0,
        volts_per_celsius: -0.001721,
    };

    pub fn celsius(&self, raw: u16) -> f32 {
        let volts = raw as f32 * self.full_scale / (1u32 << self.resolution_bits) as f32;
        self.reference_celsius + (volts - self.reference_volts) / self.volts_per_celsius
    }

    pub fn convert(&self, raw: u16) -> Measurement {
        Measurement::new(self.celsius(raw))
    }
}

/// Interrupt side of conversion-driven sampling. Converts one finished
/// conversion and posts it without waiting; a full mailbox drops it.
pub fn publish_conversion<M: RawMutex, const N: usize>(
    mailbox: &Mailbox<M, Measurement, N>,
    raw: u16,
    convert: impl FnOnce(u16) -> Measurement,
) -> Result<(), Error> {
    mailbox.send_from_interrupt(convert(raw))
}

/// Task side of conversion-driven sampling: only starts a conversion per
/// period, the result arrives through the interrupt.
pub async fn run_conversion_trigger(period: Duration, mut start: impl FnMut()) -> ! {
    let mut ticker = Ticker::every(period);
    loop {
        start();
        ticker.next().await;
    }
}
