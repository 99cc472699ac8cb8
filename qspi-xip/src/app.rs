//! Top-level sequencer: bring-up, self-test, XIP and the terminal states.

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_storage::nor_flash::NorFlashError;

use crate::config::{ActiveLevel, DemoConfig, FlashConfig, PACKET_SIZE};
use crate::console::Console;
use crate::error::Error;
use crate::flash::SerialFlash;
use crate::selftest::SelfTest;
use crate::xip::{self, ExternalImage};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Running,
    /// Terminal: LED held at its active level.
    Failed(Error),
    /// Self-test and XIP verification passed, idle loop not entered yet.
    Succeeded,
    /// Terminal: LED toggling.
    IdleBlink,
}

/// User LED with a configurable active level.
///
/// Only [`OutputPin`] is required; the lit state is tracked here.
pub struct Indicator<P> {
    pin: P,
    active: ActiveLevel,
    lit: bool,
}

impl<P: OutputPin> Indicator<P> {
    /// The pin is assumed to start dark.
    pub const fn new(pin: P, active: ActiveLevel) -> Self {
        Self {
            pin,
            active,
            lit: false,
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn set(&mut self, lit: bool) -> Result<(), P::Error> {
        let high = lit == (self.active == ActiveLevel::High);
        if high {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.lit = lit;
        Ok(())
    }

    pub fn on(&mut self) -> Result<(), P::Error> {
        self.set(true)
    }

    pub fn off(&mut self) -> Result<(), P::Error> {
        self.set(false)
    }

    pub fn toggle(&mut self) -> Result<(), P::Error> {
        self.set(!self.lit)
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

pub struct XipDemo<W: Write, P, D> {
    config: DemoConfig,
    console: Console<W>,
    led: Indicator<P>,
    delay: D,
    state: State,
}

impl<W, P, D> XipDemo<W, P, D>
where
    W: Write,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(config: DemoConfig, console: W, led: P, delay: D) -> Self {
        let active = config.led_active_level;
        Self {
            config,
            console: Console::new(console),
            led: Indicator::new(led, active),
            delay,
            state: State::Running,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    pub fn console(&self) -> &Console<W> {
        &self.console
    }

    pub fn led(&self) -> &Indicator<P> {
        &self.led
    }

    /// Gives back console writer, LED pin and delay.
    pub fn release(self) -> (W, P, D) {
        (self.console.into_inner(), self.led.into_inner(), self.delay)
    }

    /// Runs the whole demonstration once.
    ///
    /// `init` receives the flash configuration and brings the driver up; it
    /// is not called when the configuration is invalid. On success the
    /// initialized device is handed back still in XIP mode. On failure the
    /// fail block has been printed, the LED is lit and the state is
    /// [`State::Failed`].
    ///
    /// Only runs from [`State::Running`]. After a failure the recorded error
    /// is returned again without touching the device.
    pub fn run<F, E, I>(&mut self, init: I, image: &ExternalImage) -> Result<F, Error>
    where
        F: SerialFlash,
        E: NorFlashError,
        I: FnOnce(&FlashConfig) -> Result<F, E>,
    {
        match self.state {
            State::Running => {}
            State::Failed(e) => return Err(e),
            State::Succeeded | State::IdleBlink => return Err(Error::AlreadyRun),
        }
        match self.sequence(init, image) {
            Ok(flash) => {
                self.state = State::Succeeded;
                Ok(flash)
            }
            Err(e) => {
                self.fail(e);
                Err(e)
            }
        }
    }

    fn sequence<F, E, I>(&mut self, init: I, image: &ExternalImage) -> Result<F, Error>
    where
        F: SerialFlash,
        E: NorFlashError,
        I: FnOnce(&FlashConfig) -> Result<F, E>,
    {
        self.console.banner(self.config.board_name);
        self.config.validate()?;

        let slot = &self.config.flash.slot;
        info!(
            "bringing up {} at {} Hz, window 0x{:x}",
            slot.name,
            self.config.flash.bus_frequency_hz,
            slot.base_address
        );
        let mut flash = init(&self.config.flash).map_err(|e| Error::Init { kind: e.kind() })?;

        SelfTest::<PACKET_SIZE>::new(self.config.erased_check).run(&mut flash, &mut self.console)?;
        xip::enter_xip(
            &mut flash,
            &mut self.console,
            self.config.flash.slot.base_address,
            image,
        )?;
        Ok(flash)
    }

    fn fail(&mut self, error: Error) {
        error!("demo failed: {}", error);
        self.console.failure(&error);
        if self.led.on().is_err() {
            warn!("could not drive the failure LED");
        }
        self.state = State::Failed(error);
    }

    /// One idle-loop iteration: toggle, then wait one blink period.
    ///
    /// Does nothing unless the run succeeded; a failure keeps the LED lit.
    pub fn blink_once(&mut self) {
        if !matches!(self.state, State::Succeeded | State::IdleBlink) {
            return;
        }
        if self.led.toggle().is_err() {
            warn!("LED toggle failed");
        }
        self.delay.delay_ms(self.config.blink_period_ms);
        self.state = State::IdleBlink;
    }

    /// Enters the terminal state for `result` and never returns.
    ///
    /// The device stays owned here so the XIP window remains mapped while
    /// the idle loop runs.
    pub fn finish<F>(mut self, result: Result<F, Error>) -> ! {
        match result {
            Ok(_flash) => loop {
                self.blink_once();
            },
            Err(_) => park(),
        }
    }
}

/// Halts forever.
pub fn park() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
