/*
 * Bosch BMP280 temperature and pressure sensor on I2C.
 *
 * The factory trim is read on the first sample and kept; after that every
 * sample is a single burst read of the six data registers. Compensation uses
 * the floating point formulas from the datasheet.
 */

use embedded_hal_async::i2c::I2c;

use super::Sensor;
use crate::control::Measurement;
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x76;

const REG_CALIBRATION: u8 = 0x88;
const REG_CHIP_ID: u8 = 0xD0;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_PRESS_MSB: u8 = 0xF7;

const CHIP_ID: u8 = 0x58;
// Standby 1000 ms, filter off.
const CONFIG: u8 = 0b101_000_00;
// Temperature and pressure oversampling x1, normal mode.
const CTRL_MEAS: u8 = 0b001_001_11;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
}

impl Calibration {
    pub fn from_registers(raw: &[u8; 24]) -> Self {
        let u = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        Self {
            t1: u(0),
            t2: s(2),
            t3: s(4),
            p1: u(6),
            p2: s(8),
            p3: s(10),
            p4: s(12),
            p5: s(14),
            p6: s(16),
            p7: s(18),
            p8: s(20),
            p9: s(22),
        }
    }

    /// Temperature in °C, plus the fine temperature the pressure formula needs.
    pub fn temperature(&self, adc_t: i32) -> (f32, f64) {
        let adc = adc_t as f64;
        let t1 = self.t1 as f64;
        let var1 = (adc / 16384.0 - t1 / 1024.0) * self.t2 as f64;
        let x = adc / 131072.0 - t1 / 8192.0;
        let var2 = x * x * self.t3 as f64;
        let t_fine = var1 + var2;
        ((t_fine / 5120.0) as f32, t_fine)
    }

    /// Pressure in Pa.
    pub fn pressure(&self, adc_p: i32, t_fine: f64) -> f32 {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * self.p6 as f64 / 32768.0;
        var2 += var1 * self.p5 as f64 * 2.0;
        var2 = var2 / 4.0 + self.p4 as f64 * 65536.0;
        var1 = (self.p3 as f64 * var1 * var1 / 524288.0 + self.p2 as f64 * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * self.p1 as f64;
        if var1 == 0.0 {
            return 0.0;
        }

        let mut p = 1048576.0 - adc_p as f64;
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        let var1 = self.p9 as f64 * p * p / 2147483648.0;
        let var2 = p * self.p8 as f64 / 32768.0;
        (p + (var1 + var2 + self.p7 as f64) / 16.0) as f32
    }
}

pub struct Bmp280 {
    address: u8,
    calibration: Option<Calibration>,
}

impl Bmp280 {
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            calibration: None,
        }
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    async fn configure<I: I2c>(&self, bus: &mut I) -> Result<Calibration, Error> {
        let mut id = [0u8; 1];
        bus.write_read(self.address, &[REG_CHIP_ID], &mut id)
            .await
            .map_err(|_| Error::Device)?;
        if id[0] != CHIP_ID {
            warn!("unexpected BMP280 chip id {:#x}", id[0]);
            return Err(Error::Device);
        }

        let mut trim = [0u8; 24];
        bus.write_read(self.address, &[REG_CALIBRATION], &mut trim)
            .await
            .map_err(|_| Error::Device)?;

        bus.write(self.address, &[REG_CONFIG, CONFIG])
            .await
            .map_err(|_| Error::Device)?;
        bus.write(self.address, &[REG_CTRL_MEAS, CTRL_MEAS])
            .await
            .map_err(|_| Error::Device)?;

        info!("BMP280 at {:#x} configured", self.address);
        Ok(Calibration::from_registers(&trim))
    }
}

impl<I: I2c> Sensor<I> for Bmp280 {
    async fn sample(&mut self, bus: &mut I) -> Result<Measurement, Error> {
        let calibration = match self.calibration {
            Some(calibration) => calibration,
            None => {
                let calibration = self.configure(bus).await?;
                self.calibration = Some(calibration);
                calibration
            }
        };

        let mut raw = [0u8; 6];
        bus.write_read(self.address, &[REG_PRESS_MSB], &mut raw)
            .await
            .map_err(|_| Error::Device)?;

        let adc_p = ((raw[0] as i32) << 12) | ((raw[1] as i32) << 4) | ((raw[2] as i32) >> 4);
        let adc_t = ((raw[3] as i32) << 12) | ((raw[4] as i32) << 4) | ((raw[5] as i32) >> 4);

        let (temperature, t_fine) = calibration.temperature(adc_t);
        let pressure = calibration.pressure(adc_p, t_fine);
        Ok(Measurement::with_secondary(temperature, pressure))
    }
}
