//! Front panel and lock supervision task
//!
//! Handles the channel up/down buttons and periodically checks that the
//! PLL is still locked. A lost lock gets one retune of the current
//! channel, which runs the calibration search if needed.

use defmt::*;
use embassy_futures::select::{select3, Either3};
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker, Timer};

use ns73_core::tuning::TuneOutcome;

use crate::Transmitter;

/// Controls task settings
#[derive(Clone, Copy)]
pub struct ControlsConfig {
    /// Time a button must stay pressed to count (ms)
    pub debounce_ms: u64,
    /// Lock check period (ms)
    pub lock_check_ms: u64,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 30,
            lock_check_ms: 10_000,
        }
    }
}

/// Button that was pressed
#[derive(Clone, Copy, PartialEq, Eq, Format)]
enum Button {
    Up,
    Down,
}

/// Controls task - owns the transmitter after bring-up
#[embassy_executor::task]
pub async fn controls_task(
    mut ns73: Transmitter,
    mut up: Input<'static>,
    mut down: Input<'static>,
    config: ControlsConfig,
) {
    info!("Controls task started");

    let mut ticker = Ticker::every(Duration::from_millis(config.lock_check_ms));

    loop {
        let event = select3(
            up.wait_for_falling_edge(),
            down.wait_for_falling_edge(),
            ticker.next(),
        )
        .await;

        match event {
            Either3::First(()) => {
                if debounced(&mut up, config.debounce_ms).await {
                    step_channel(&mut ns73, Button::Up);
                }
            }
            Either3::Second(()) => {
                if debounced(&mut down, config.debounce_ms).await {
                    step_channel(&mut ns73, Button::Down);
                }
            }
            Either3::Third(()) => supervise_lock(&mut ns73),
        }
    }
}

/// Wait out contact bounce, then check the button is still held
async fn debounced(button: &mut Input<'static>, debounce_ms: u64) -> bool {
    Timer::after_millis(debounce_ms).await;
    let pressed = button.is_low();
    if pressed {
        button.wait_for_high().await;
    }
    pressed
}

fn step_channel(ns73: &mut Transmitter, button: Button) {
    let result = match button {
        Button::Up => ns73.channel_up(),
        Button::Down => ns73.channel_down(),
    };

    match result {
        Ok(outcome) => {
            let label = ns73.channel().label();
            info!("{:?}: {} MHz, {:?}", button, label.as_str(), outcome);
        }
        Err(e) => error!("Channel change failed: {:?}", Debug2Format(&e)),
    }
}

fn supervise_lock(ns73: &mut Transmitter) {
    if !ns73.is_online() {
        return;
    }

    match ns73.has_lock() {
        Ok(true) => trace!("PLL locked"),
        Ok(false) => {
            let channel = ns73.channel();
            warn!("Lock lost on channel {}, retuning", channel.index());
            match ns73.set_channel(channel) {
                Ok(TuneOutcome::Unlocked) => {
                    error!("Channel {} still unlocked after retune", channel.index())
                }
                Ok(outcome) => info!("Retune: {:?}", outcome),
                Err(e) => error!("Retune failed: {:?}", Debug2Format(&e)),
            }
        }
        Err(e) => error!("Lock check failed: {:?}", Debug2Format(&e)),
    }
}
