/*
 * What goes on the two display lines.
 *
 * Rendering is plain formatting into fixed-size strings, so it can run before
 * the bus is taken and the arbiter is held only for the actual write.
 */

use core::fmt::{self, Write};

use enum_ordinalize::Ordinalize;
use heapless::String;

use crate::config::{LINE_COUNT, LINE_WIDTH};
use crate::control::{ControlLaw, Measurement};

#[derive(Debug, Ordinalize, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum DisplayMode {
    /// The raw measurement.
    #[default]
    Primary,
    /// Setpoint and signed control error.
    Diagnostic,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        Self::from_ordinal((self.ordinal() + 1) % Self::VARIANT_COUNT).unwrap_or(Self::Primary)
    }
}

pub type Line = String<LINE_WIDTH>;
pub type Lines = [Line; LINE_COUNT];

pub fn render(mode: DisplayMode, measurement: &Measurement, law: &ControlLaw) -> Lines {
    match mode {
        DisplayMode::Primary => {
            let second = match measurement.secondary {
                Some(pascal) => line(format_args!("Pres: {:.2} kPa", pascal / 1000.0)),
                None => {
                    let duty = law.duty(law.error(measurement)) * 100.0;
                    line(format_args!("Duty: {:.0}%", duty))
                }
            };
            [line(format_args!("Temp: {:.2} C", measurement.primary)), second]
        }
        DisplayMode::Diagnostic => [
            line(format_args!("Set: {:.2} C", law.setpoint)),
            line(format_args!("Err: {:+.2} C", law.error(measurement))),
        ],
    }
}

/// The pulse counter readout.
pub fn render_frequency(hz: u32) -> Lines {
    [line(format_args!("Pulse counter")), line(format_args!("Freq: {} Hz", hz))]
}

// Format into a roomier scratch buffer, then cut to the display width.
fn line(args: fmt::Arguments<'_>) -> Line {
    let mut scratch: String<48> = String::new();
    let _ = scratch.write_fmt(args);

    let mut line = Line::new();
    for c in scratch.chars().take(LINE_WIDTH) {
        if line.push(c).is_err() {
            break;
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &Lines) -> [&str; 2] {
        [lines[0].as_str(), lines[1].as_str()]
    }

    #[test]
    fn toggling_twice_is_identity() {
        let mode = DisplayMode::default();
        assert_eq!(mode, DisplayMode::Primary);
        assert_eq!(mode.toggled(), DisplayMode::Diagnostic);
        assert_eq!(mode.toggled().toggled(), mode);
    }

    #[test]
    fn primary_shows_both_quantities() {
        let lines = render(
            DisplayMode::Primary,
            &Measurement::with_secondary(23.456, 101_250.0),
            &ControlLaw::DEFAULT,
        );
        assert_eq!(texts(&lines), ["Temp: 23.46 C", "Pres: 101.25 kPa"]);
    }

    #[test]
    fn primary_without_secondary_shows_duty() {
        let law = ControlLaw::new(25.0, 1e-4, 50.0, 1.0);
        let lines = render(DisplayMode::Primary, &Measurement::new(50.0), &law);
        assert_eq!(texts(&lines), ["Temp: 50.00 C", "Duty: 50%"]);
    }

    #[test]
    fn diagnostic_shows_setpoint_and_signed_error() {
        let law = ControlLaw::DEFAULT;
        let below = render(DisplayMode::Diagnostic, &Measurement::new(23.77), &law);
        assert_eq!(texts(&below), ["Set: 25.00 C", "Err: +1.23 C"]);

        let above = render(DisplayMode::Diagnostic, &Measurement::new(26.5), &law);
        assert_eq!(texts(&above), ["Set: 25.00 C", "Err: -1.50 C"]);
    }

    #[test]
    fn frequency_readout_fits_the_display() {
        assert_eq!(texts(&render_frequency(9_500)), ["Pulse counter", "Freq: 9500 Hz"]);

        let widest = render_frequency(u32::MAX);
        assert_eq!(widest[1].as_str(), "Freq: 4294967295");
    }

    #[test]
    fn long_values_are_cut_to_width() {
        let lines = render(
            DisplayMode::Primary,
            &Measurement::with_secondary(-1234567.0, 987654321.0),
            &ControlLaw::DEFAULT,
        );
        for line in &lines {
            assert_eq!(line.len(), LINE_WIDTH);
        }
        assert!(lines[0].starts_with("Temp: -1234567"));
    }
}
