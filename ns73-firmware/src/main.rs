//! NS73 - FM Transmitter Firmware
//!
//! Main firmware binary for RP2040 boards carrying an NS73M module.
//! Brings the transmitter up from the stored configuration, tunes the
//! startup channel and hands the chip to the controls task.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_time::Delay;
use {defmt_rtt as _, panic_probe as _};

use ns73_drivers::{Ns73, ThreeWireBus};
use ns73_hal_rp2040::{Rp2040Eeprom, Rp2040FlashStorage};

use crate::config::load_config;

mod config;
mod tasks;

/// Embedded default configuration (compiled into firmware)
/// Edit transmitter.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../transmitter.toml");

/// The transmitter as wired on this board
pub type Transmitter = Ns73<
    ThreeWireBus<Output<'static>, Output<'static>, Output<'static>>,
    Input<'static>,
    Rp2040Eeprom<'static>,
    Delay,
>;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("NS73 firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Configuration override and calibration image share the flash partition
    let mut flash = Rp2040FlashStorage::new(p.FLASH, p.DMA_CH0);
    let config = load_config(&mut flash, EMBEDDED_CONFIG).await;

    let eeprom = match Rp2040Eeprom::mount(flash).await {
        Ok(eeprom) => eeprom,
        Err(e) => defmt::panic!("Failed to mount calibration storage: {}", e),
    };
    info!("Calibration storage mounted");

    // Pin assignments are board-specific
    // DATA=GPIO2, CLK=GPIO3, LA=GPIO4, TEB=GPIO5
    let bus = ThreeWireBus::new(
        Output::new(p.PIN_2, Level::Low),
        Output::new(p.PIN_3, Level::Low),
        Output::new(p.PIN_4, Level::Low),
    );
    let teb = Input::new(p.PIN_5, Pull::None);

    // Channel buttons, active low: UP=GPIO14, DOWN=GPIO15
    let up = Input::new(p.PIN_14, Pull::Up);
    let down = Input::new(p.PIN_15, Pull::Up);

    let mut ns73: Transmitter = match Ns73::begin(bus, teb, eeprom, Delay, &config) {
        Ok(ns73) => ns73,
        Err(e) => defmt::panic!("NS73 bring-up failed: {:?}", Debug2Format(&e)),
    };
    info!("NS73 initialized");

    match ns73.configure(&config.startup) {
        Ok(outcome) => {
            let label = ns73.channel().label();
            info!(
                "Transmitting on {} MHz ({:?}), online={}",
                label.as_str(),
                outcome,
                ns73.is_online()
            );
        }
        Err(e) => error!("Startup configuration failed: {:?}", Debug2Format(&e)),
    }

    // Spawn tasks
    spawner
        .spawn(tasks::controls_task(ns73, up, down, tasks::ControlsConfig::default()))
        .unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
