/*
 * The board side of the thermostat.
 *
 * This module is the only part of the firmware that knows which pins and
 * peripherals are used: the I2C bus with the sensor and both displays, the
 * heater PWM, the mode button, and the pulse input with its test signal.
 * Embassy tasks cannot be generic, so the tasks here pin the library's
 * generic loops to the concrete board types.
 *
 * The edge tasks are meant for the high priority executor. They do nothing
 * but arm the latch or bump the counter, never touch the bus and never wait
 * on anything but their pin.
 */

use embassy_stm32::{
    exti::ExtiInput,
    i2c::I2c,
    mode::Async,
    peripherals::{TIM3, TIM4},
    time::Hertz,
    timer::simple_pwm::SimplePwm,
};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use thermostat::{
    ControlLaw, Measurement,
    acquisition::Acquisition,
    bus::BusArbiter,
    config::{
        DEBOUNCE_INTERVAL, FREQUENCY_WINDOW, MAILBOX_CAPACITY, RENDER_BUS_TIMEOUT,
        SAMPLE_PERIOD, SENSOR_BUS_TIMEOUT,
    },
    control::duty_to_compare,
    counter::{EdgeCounter, FrequencyDisplay},
    drivers::{Actuator, bmp280::Bmp280, lcd::Lcd1602},
    latch::EventLatch,
    mailbox::{Mailbox, SendPolicy},
    presentation::Presenter,
};

pub const SENSOR_ADDRESS: u8 = thermostat::drivers::bmp280::DEFAULT_ADDRESS;
pub const DISPLAY_ADDRESS: u8 = thermostat::drivers::lcd::DEFAULT_ADDRESS;
pub const BUS_FREQUENCY: Hertz = Hertz(100_000);
pub const HEATER_PWM_FREQUENCY: Hertz = Hertz(1_000);
// Second backpack on the same bus, showing the pulse counter.
pub const PULSE_DISPLAY_ADDRESS: u8 = 0x26;
// Square wave on PB8 for checking the pulse input, jumper it to PA0.
pub const TEST_SIGNAL_FREQUENCY: Hertz = Hertz(9_500);

pub type Bus = I2c<'static, Async>;
pub type SharedBus = BusArbiter<CriticalSectionRawMutex, Bus>;
pub type SampleMailbox = Mailbox<CriticalSectionRawMutex, Measurement, MAILBOX_CAPACITY>;

const SAMPLER: Acquisition =
    Acquisition::new(SAMPLE_PERIOD, SENSOR_BUS_TIMEOUT, SendPolicy::BestEffort);
const PULSE_READOUT: FrequencyDisplay = FrequencyDisplay::new(FREQUENCY_WINDOW, RENDER_BUS_TIMEOUT);

/// Heater output on a PWM channel. Duty 0 is off.
pub struct PwmHeater {
    pwm: SimplePwm<'static, TIM3>,
}

impl PwmHeater {
    pub fn new(mut pwm: SimplePwm<'static, TIM3>) -> Self {
        {
            let mut channel = pwm.ch1();
            channel.set_duty_cycle(0);
            channel.enable();
        }
        Self { pwm }
    }
}

impl Actuator for PwmHeater {
    fn set_duty(&mut self, duty: f32) {
        let mut channel = self.pwm.ch1();
        let compare = duty_to_compare(duty, channel.max_duty_cycle());
        channel.set_duty_cycle(compare);
    }
}

/// Start the test signal at half duty. Stops when `pwm` is dropped.
pub fn start_test_signal(pwm: &mut SimplePwm<'static, TIM4>) {
    let mut channel = pwm.ch3();
    let half = duty_to_compare(0.5, channel.max_duty_cycle());
    channel.set_duty_cycle(half);
    channel.enable();
}

#[embassy_executor::task]
pub async fn acquisition_task(
    bus: &'static SharedBus,
    mut sensor: Bmp280,
    mailbox: &'static SampleMailbox,
) -> ! {
    SAMPLER.run(bus, &mut sensor, mailbox).await
}

#[embassy_executor::task]
pub async fn presentation_task(
    bus: &'static SharedBus,
    mut display: Lcd1602,
    mut heater: PwmHeater,
    mailbox: &'static SampleMailbox,
    button: &'static EventLatch,
) -> ! {
    let mut presenter = Presenter::new(ControlLaw::DEFAULT, RENDER_BUS_TIMEOUT, DEBOUNCE_INTERVAL);
    presenter
        .run(mailbox, bus, &mut display, &mut heater, button)
        .await
}

#[embassy_executor::task]
pub async fn frequency_display_task(
    bus: &'static SharedBus,
    mut display: Lcd1602,
    counter: &'static EdgeCounter,
) -> ! {
    PULSE_READOUT.run(counter, bus, &mut display).await
}

// The mode button on the board is active-low.
#[embassy_executor::task]
pub async fn button_task(mut button: ExtiInput<'static>, latch: &'static EventLatch) -> ! {
    loop {
        button.wait_for_falling_edge().await;
        latch.signal();
    }
}

#[embassy_executor::task]
pub async fn pulse_task(mut input: ExtiInput<'static>, counter: &'static EdgeCounter) -> ! {
    loop {
        input.wait_for_rising_edge().await;
        counter.record();
    }
}
