/*
 * The presenter: consumer of samples, owner of the actuator and the display
 * mode.
 *
 * Per sample it works out the control error, drives the actuator, renders the
 * display under the bus arbiter, and finally looks at the button latch. The
 * actuator is set before the bus is even asked for, so a busy bus costs a
 * display refresh and never an actuation.
 *
 * The display mode and the debouncer are plain fields. Only this task reads
 * or writes them, so they need no lock; the interrupt side reaches them only
 * through the latch.
 */

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};

use crate::bus::BusArbiter;
use crate::control::{ControlLaw, Measurement};
use crate::display::{DisplayMode, render};
use crate::drivers::{Actuator, LineDisplay};
use crate::latch::{Debouncer, EventLatch};
use crate::mailbox::Mailbox;

/// What one presenter cycle did, mostly for tests and tracing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cycle {
    pub error: f32,
    pub duty: f32,
    pub rendered: bool,
    pub toggled: bool,
}

pub struct Presenter {
    law: ControlLaw,
    mode: DisplayMode,
    debouncer: Debouncer,
    render_timeout: Duration,
}

impl Presenter {
    pub const fn new(law: ControlLaw, render_timeout: Duration, debounce: Duration) -> Self {
        Self {
            law,
            mode: DisplayMode::Primary,
            debouncer: Debouncer::new(debounce),
            render_timeout,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn law(&self) -> &ControlLaw {
        &self.law
    }

    pub async fn cycle<BM, B, D, A>(
        &mut self,
        measurement: &Measurement,
        now: Instant,
        arbiter: &BusArbiter<BM, B>,
        display: &mut D,
        actuator: &mut A,
        button: &EventLatch,
    ) -> Cycle
    where
        BM: RawMutex,
        D: LineDisplay<B>,
        A: Actuator,
    {
        let error = self.law.error(measurement);
        let duty = self.law.duty(error).clamp(0.0, self.law.max_duty);
        actuator.set_duty(duty);

        let lines = render(self.mode, measurement, &self.law);
        let rendered = match arbiter.acquire(self.render_timeout).await {
            Ok(mut bus) => {
                let shown = display.show(&mut *bus, &lines).await;
                bus.release();
                match shown {
                    Ok(()) => true,
                    Err(error) => {
                        warn!("render failed: {}", error);
                        false
                    }
                }
            }
            Err(_) => {
                warn!("bus busy, render skipped");
                false
            }
        };

        let toggled = self.poll_button(button, now);

        let cycle = Cycle {
            error,
            duty,
            rendered,
            toggled,
        };
        trace!("{:?}", cycle);
        cycle
    }

    /// Take the button latch if armed and toggle the mode if the edge passes
    /// the debouncer. Returns whether the mode changed.
    pub fn poll_button(&mut self, button: &EventLatch, now: Instant) -> bool {
        if !button.try_take() {
            return false;
        }
        if !self.debouncer.accept(now) {
            debug!("button bounce ignored");
            return false;
        }

        self.mode = self.mode.toggled();
        info!("display mode now {:?}", self.mode);
        true
    }

    /// Wait for samples forever, one cycle per sample. This is the only wait
    /// in the system without a timeout; the presenter has nothing else to do.
    pub async fn run<QM, BM, B, D, A, const N: usize>(
        &mut self,
        mailbox: &Mailbox<QM, Measurement, N>,
        arbiter: &BusArbiter<BM, B>,
        display: &mut D,
        actuator: &mut A,
        button: &EventLatch,
    ) -> !
    where
        QM: RawMutex,
        BM: RawMutex,
        D: LineDisplay<B>,
        A: Actuator,
    {
        info!("presenter running, setpoint {}", self.law.setpoint);
        loop {
            if let Ok(measurement) = mailbox.receive(None).await {
                self.cycle(&measurement, Instant::now(), arbiter, display, actuator, button)
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Lines;
    use crate::error::Error;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    type Arbiter = BusArbiter<CriticalSectionRawMutex, ()>;

    #[derive(Default)]
    struct Screen {
        shown: std::vec::Vec<[std::string::String; 2]>,
        broken: bool,
    }

    impl LineDisplay<()> for Screen {
        async fn show(&mut self, _bus: &mut (), lines: &Lines) -> Result<(), Error> {
            if self.broken {
                return Err(Error::Device);
            }
            self.shown.push([lines[0].as_str().into(), lines[1].as_str().into()]);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Heater {
        duty: Option<f32>,
    }

    impl Actuator for Heater {
        fn set_duty(&mut self, duty: f32) {
            self.duty = Some(duty);
        }
    }

    const RENDER_TIMEOUT: Duration = Duration::from_millis(10);
    const DEBOUNCE: Duration = Duration::from_millis(200);

    fn presenter() -> Presenter {
        Presenter::new(ControlLaw::new(25.0, 1e-4, 50.0, 1.0), RENDER_TIMEOUT, DEBOUNCE)
    }

    #[tokio::test]
    async fn cycle_actuates_and_renders() {
        let arbiter = Arbiter::new(());
        let button = EventLatch::new();
        let mut screen = Screen::default();
        let mut heater = Heater::default();
        let mut presenter = presenter();

        let cycle = presenter
            .cycle(&Measurement::new(50.0), Instant::now(), &arbiter, &mut screen, &mut heater, &button)
            .await;

        assert_eq!(cycle.error, -25.0);
        assert!((cycle.duty - 0.5).abs() < 1e-3);
        assert_eq!(heater.duty, Some(cycle.duty));
        assert!(cycle.rendered && !cycle.toggled);
        assert_eq!(screen.shown.len(), 1);
        assert_eq!(screen.shown[0][0], "Temp: 50.00 C");
    }

    #[tokio::test]
    async fn busy_bus_skips_render_but_not_actuation() {
        let arbiter = Arbiter::new(());
        let button = EventLatch::new();
        let mut screen = Screen::default();
        let mut heater = Heater::default();
        let mut presenter = presenter();

        let _held = arbiter.try_acquire().unwrap();
        let cycle = presenter
            .cycle(&Measurement::new(40.0), Instant::now(), &arbiter, &mut screen, &mut heater, &button)
            .await;

        assert!(!cycle.rendered);
        assert!(screen.shown.is_empty());
        assert!(heater.duty.unwrap() > 0.0);
    }

    #[tokio::test]
    async fn broken_display_is_not_fatal() {
        let arbiter = Arbiter::new(());
        let button = EventLatch::new();
        let mut screen = Screen {
            broken: true,
            ..Screen::default()
        };
        let mut heater = Heater::default();
        let mut presenter = presenter();

        let cycle = presenter
            .cycle(&Measurement::new(25.0), Instant::now(), &arbiter, &mut screen, &mut heater, &button)
            .await;
        assert!(!cycle.rendered);
        assert_eq!(heater.duty, Some(0.0));
        assert!(arbiter.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn toggle_applies_from_next_render() {
        let arbiter = Arbiter::new(());
        let button = EventLatch::new();
        let mut screen = Screen::default();
        let mut heater = Heater::default();
        let mut presenter = presenter();
        let sample = Measurement::new(23.5);

        button.signal();
        let first = presenter
            .cycle(&sample, Instant::now(), &arbiter, &mut screen, &mut heater, &button)
            .await;
        assert!(first.toggled);
        assert_eq!(presenter.mode(), DisplayMode::Diagnostic);
        presenter
            .cycle(&sample, Instant::now(), &arbiter, &mut screen, &mut heater, &button)
            .await;

        assert_eq!(screen.shown[0][0], "Temp: 23.50 C");
        assert_eq!(screen.shown[1], ["Set: 25.00 C", "Err: +1.50 C"]);
    }

    #[test]
    fn edges_50_ms_apart_toggle_once() {
        let button = EventLatch::new();
        let mut presenter = presenter();
        let start = Instant::from_millis(10_000);

        button.signal();
        assert!(presenter.poll_button(&button, start));
        button.signal();
        assert!(!presenter.poll_button(&button, start + Duration::from_millis(50)));
        assert_eq!(presenter.mode(), DisplayMode::Diagnostic);
    }

    #[test]
    fn edges_far_apart_toggle_back() {
        let button = EventLatch::new();
        let mut presenter = presenter();
        let start = Instant::from_millis(10_000);

        button.signal();
        assert!(presenter.poll_button(&button, start));
        button.signal();
        assert!(presenter.poll_button(&button, start + Duration::from_millis(300)));
        assert_eq!(presenter.mode(), DisplayMode::Primary);
    }

    #[test]
    fn idle_latch_changes_nothing() {
        let button = EventLatch::new();
        let mut presenter = presenter();
        assert!(!presenter.poll_button(&button, Instant::from_millis(0)));
        assert_eq!(presenter.mode(), DisplayMode::Primary);
    }
}
