/*
 * The measurement handed from the sampler to the presenter, and the
 * proportional law that turns it into an actuator duty.
 *
 * The law is inverted compared to a textbook P controller: the actuator runs
 * hardest just outside the dead-band and fades out as the error grows. Inside
 * the dead-band and at or past the maximum error it is off.
 */

/// One sample. Copied by value through the mailbox and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// The controlled quantity, for example temperature in °C.
    pub primary: f32,
    /// A second quantity from the same sensor, for example pressure in Pa.
    pub secondary: Option<f32>,
}

impl Measurement {
    pub const fn new(primary: f32) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    pub const fn with_secondary(primary: f32, secondary: f32) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlLaw {
    pub setpoint: f32,
    pub dead_band: f32,
    pub max_error: f32,
    pub max_duty: f32,
}

impl ControlLaw {
    pub const DEFAULT: ControlLaw = ControlLaw::new(25.0, 0.5, 50.0, 1.0);

    pub const fn new(setpoint: f32, dead_band: f32, max_error: f32, max_duty: f32) -> Self {
        assert!(dead_band > 0.0 && dead_band < max_error);
        assert!(max_duty >= 0.0 && max_duty <= 1.0);
        Self {
            setpoint,
            dead_band,
            max_error,
            max_duty,
        }
    }

    /// Signed error, positive when the reading is below the setpoint.
    pub fn error(&self, measurement: &Measurement) -> f32 {
        self.setpoint - measurement.primary
    }

    /// Duty for a given error, always within `0.0..=max_duty`. Zero error is
    /// always off, even for a law built with an empty dead-band.
    pub fn duty(&self, error: f32) -> f32 {
        let magnitude = if error < 0.0 { -error } else { error };
        if !magnitude.is_finite()
            || magnitude == 0.0
            || magnitude < self.dead_band
            || magnitude >= self.max_error
        {
            return 0.0;
        }

        let fraction = (self.max_error - magnitude) / (self.max_error - self.dead_band);
        (self.max_duty * fraction).clamp(0.0, self.max_duty)
    }
}

impl Default for ControlLaw {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Scale a normalized duty to a PWM compare value, clamping out-of-range input.
pub fn duty_to_compare(duty: f32, max_compare: u16) -> u16 {
    let duty = if duty.is_nan() { 0.0 } else { duty.clamp(0.0, 1.0) };
    (duty * max_compare as f32 + 0.5) as u16
}
