/*
 * HD44780 character display behind a PCF8574 I2C backpack, in 4-bit mode.
 *
 * Expander pins: P0 RS, P1 RW, P2 EN, P3 backlight, P4..P7 data D4..D7.
 * Every nibble goes out as one I2C write of two bytes, first with EN high and
 * then with EN low; the bus itself is slow enough to satisfy the controller's
 * timing for everything except the power-on sequence and clear/home.
 *
 * `init` needs millisecond waits and is meant to run once at startup, before
 * the bus is shared. `show` never waits and overwrites each line in place,
 * padding with spaces, so it does not need a clear.
 */

use embassy_time::Timer;
use embedded_hal_async::i2c::I2c;

use super::LineDisplay;
use crate::config::LINE_WIDTH;
use crate::display::Lines;
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x27;

const RS: u8 = 0x01;
const EN: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_INCREMENT: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;

const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

pub struct Lcd1602 {
    address: u8,
    backlight: bool,
}

impl Lcd1602 {
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            backlight: true,
        }
    }

    /// Power-on sequence: force 8-bit mode three times, switch to 4-bit,
    /// then configure and clear.
    pub async fn init<I: I2c>(&mut self, bus: &mut I) -> Result<(), Error> {
        Timer::after_millis(50).await;

        self.nibble(bus, 0x03, 0).await?;
        Timer::after_millis(5).await;
        self.nibble(bus, 0x03, 0).await?;
        Timer::after_millis(1).await;
        self.nibble(bus, 0x03, 0).await?;
        self.nibble(bus, 0x02, 0).await?;

        self.command(bus, CMD_FUNCTION_4BIT_2LINE).await?;
        self.command(bus, CMD_DISPLAY_ON).await?;
        self.command(bus, CMD_CLEAR).await?;
        Timer::after_millis(2).await;
        self.command(bus, CMD_ENTRY_INCREMENT).await?;

        info!("LCD at {:#x} initialized", self.address);
        Ok(())
    }

    pub fn set_backlight(&mut self, on: bool) {
        self.backlight = on;
    }

    pub async fn write_line<I: I2c>(&mut self, bus: &mut I, row: usize, text: &str) -> Result<(), Error> {
        let offset = ROW_OFFSETS.get(row).copied().ok_or(Error::Device)?;
        self.command(bus, CMD_SET_DDRAM | offset).await?;

        let mut chars = text.chars();
        for _ in 0..LINE_WIDTH {
            let c = chars.next().unwrap_or(' ');
            self.data(bus, glyph(c)).await?;
        }
        Ok(())
    }

    async fn command<I: I2c>(&mut self, bus: &mut I, byte: u8) -> Result<(), Error> {
        self.byte(bus, byte, 0).await
    }

    async fn data<I: I2c>(&mut self, bus: &mut I, byte: u8) -> Result<(), Error> {
        self.byte(bus, byte, RS).await
    }

    async fn byte<I: I2c>(&mut self, bus: &mut I, byte: u8, mode: u8) -> Result<(), Error> {
        self.nibble(bus, byte >> 4, mode).await?;
        self.nibble(bus, byte & 0x0F, mode).await
    }

    async fn nibble<I: I2c>(&mut self, bus: &mut I, nibble: u8, mode: u8) -> Result<(), Error> {
        let light = if self.backlight { BACKLIGHT } else { 0 };
        let bits = (nibble << 4) | light | mode;
        bus.write(self.address, &[bits | EN, bits])
            .await
            .map_err(|_| Error::Device)
    }
}

impl<I: I2c> LineDisplay<I> for Lcd1602 {
    async fn show(&mut self, bus: &mut I, lines: &Lines) -> Result<(), Error> {
        for (row, line) in lines.iter().enumerate() {
            self.write_line(bus, row, line).await?;
        }
        Ok(())
    }
}

// The controller's ROM covers printable ASCII; anything else shows as '?'.
fn glyph(c: char) -> u8 {
    if c.is_ascii() && !c.is_ascii_control() {
        c as u8
    } else {
        b'?'
    }
}
