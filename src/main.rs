#![no_std]
#![no_main]

// https://github.com/embassy-rs/embassy/blob/main/examples/stm32f4/src/bin/multiprio.rs
// https://docs.rust-embedded.org/book/concurrency/index.html

use defmt_rtt as _;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{OutputType, Pull};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::interrupt::{self, InterruptExt, Priority};
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::{bind_interrupts, peripherals};
use panic_halt as _;
use static_cell::StaticCell;

use thermostat::bus::BusArbiter;
use thermostat::counter::EdgeCounter;
use thermostat::drivers::{bmp280::Bmp280, lcd::Lcd1602};
use thermostat::latch::EventLatch;
use thermostat::mailbox::Mailbox;

mod io;

bind_interrupts!(struct Irqs {
    I2C1_EV => i2c::EventInterruptHandler<peripherals::I2C1>;
    I2C1_ER => i2c::ErrorInterruptHandler<peripherals::I2C1>;
});

// Edge tasks run here, preempting everything on the thread executor.
static EDGE_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

static BUS: StaticCell<io::SharedBus> = StaticCell::new();
static TEST_SIGNAL: StaticCell<SimplePwm<'static, peripherals::TIM4>> = StaticCell::new();
static MAILBOX: io::SampleMailbox = Mailbox::new();
static BUTTON: EventLatch = EventLatch::new();
static PULSES: EdgeCounter = EdgeCounter::new();

#[interrupt]
unsafe fn UART4() {
    unsafe { EDGE_EXECUTOR.on_interrupt() }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_stm32::init(Default::default());
    defmt::info!("thermostat starting");

    let mut i2c = I2c::new(
        p.I2C1,
        p.PB6, // SCL
        p.PB7, // SDA
        Irqs,
        p.DMA1_CH6,
        p.DMA1_CH7,
        io::BUS_FREQUENCY,
        Default::default(),
    );

    // The displays' power-on sequence waits between writes, so it runs
    // before the bus is shared.
    let mut display = Lcd1602::new(io::DISPLAY_ADDRESS);
    display.init(&mut i2c).await.unwrap();
    let mut pulse_display = Lcd1602::new(io::PULSE_DISPLAY_ADDRESS);
    pulse_display.init(&mut i2c).await.unwrap();

    let bus: &'static io::SharedBus = BUS.init(BusArbiter::new(i2c));

    let pwm = SimplePwm::new(
        p.TIM3,
        Some(PwmPin::new_ch1(p.PA6, OutputType::PushPull)),
        None,
        None,
        None,
        io::HEATER_PWM_FREQUENCY,
        CountingMode::EdgeAlignedUp,
    );
    let heater = io::PwmHeater::new(pwm);

    let test_signal = TEST_SIGNAL.init(SimplePwm::new(
        p.TIM4,
        None,
        None,
        Some(PwmPin::new_ch3(p.PB8, OutputType::PushPull)),
        None,
        io::TEST_SIGNAL_FREQUENCY,
        CountingMode::EdgeAlignedUp,
    ));
    io::start_test_signal(test_signal);

    let button = ExtiInput::new(p.PE11, p.EXTI11, Pull::Up);
    let pulses = ExtiInput::new(p.PA0, p.EXTI0, Pull::Down);

    interrupt::UART4.set_priority(Priority::P6);
    let edge_spawner = EDGE_EXECUTOR.start(interrupt::UART4);
    edge_spawner.spawn(io::button_task(button, &BUTTON)).unwrap();
    edge_spawner.spawn(io::pulse_task(pulses, &PULSES)).unwrap();

    spawner
        .spawn(io::acquisition_task(
            bus,
            Bmp280::new(io::SENSOR_ADDRESS),
            &MAILBOX,
        ))
        .unwrap();
    spawner
        .spawn(io::presentation_task(bus, display, heater, &MAILBOX, &BUTTON))
        .unwrap();
    spawner
        .spawn(io::frequency_display_task(bus, pulse_display, &PULSES))
        .unwrap();

    defmt::info!("all tasks running");
}
