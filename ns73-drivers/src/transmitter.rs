//! NS73 transmitter handle
//!
//! [`Ns73`] owns the bus, the TEB pin, the calibration store and a delay.
//! It only exists after a successful [`Ns73::begin`], so every method can
//! assume the chip has been brought up.
//!
//! All calls block. Retuning an online transmitter takes about 125 ms for
//! the lock check alone; a full calibration search can take a few seconds.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;

use ns73_core::calibration::{Cex, CexBands};
use ns73_core::channel::Channel;
use ns73_core::config::{StartupConfig, TimingConfig, TransmitterConfig};
use ns73_core::registers::{
    control, reg, with_cex, InputAttenuation, RegisterBank, TxPower, CHARGE_PUMP_FAST,
    CHARGE_PUMP_IDLE, MAX_ADDRESS, REGISTER_COUNT, SOFTWARE_RESET_VALUE,
};
use ns73_core::tuning::{TuneEvent, TuneOutcome, TuneState};
use ns73_hal::ByteStore;

use crate::bus::SerialBus;
use crate::lock::LockDetector;
use crate::store::CalibrationStore;

/// Transmitter errors
///
/// `B` is the bus error type, `P` the TEB pin error type and `S` the byte
/// store error type. The range variants are returned before anything is
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<B, P, S> {
    /// Serial bus error
    Bus(B),
    /// TEB pin error
    Pin(P),
    /// Persistent store error
    Store(S),
    /// Channel index past the end of the table
    InvalidChannel,
    /// Frequency outside 87.5 - 108.0 MHz
    InvalidFrequency,
    /// Register address not writable or not mirrored
    InvalidRegister,
    /// TX power not in 1..=3
    InvalidTxPower,
    /// Input attenuation not in 0..=2
    InvalidAttenuation,
}

impl<B, P, S> core::fmt::Display for Error<B, P, S>
where
    B: core::fmt::Debug,
    P: core::fmt::Debug,
    S: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {:?}", e),
            Error::Pin(e) => write!(f, "TEB pin error: {:?}", e),
            Error::Store(e) => write!(f, "calibration store error: {:?}", e),
            Error::InvalidChannel => f.write_str("channel out of range"),
            Error::InvalidFrequency => f.write_str("frequency out of range"),
            Error::InvalidRegister => f.write_str("invalid register address"),
            Error::InvalidTxPower => f.write_str("TX power out of range"),
            Error::InvalidAttenuation => f.write_str("input attenuation out of range"),
        }
    }
}

impl<B, P, S> core::error::Error for Error<B, P, S>
where
    B: core::fmt::Debug,
    P: core::fmt::Debug,
    S: core::fmt::Debug,
{
}

/// NS73 FM transmitter
pub struct Ns73<B, P, S, D> {
    bus: B,
    lock: LockDetector<P>,
    store: CalibrationStore<S>,
    delay: D,
    regs: RegisterBank,
    channel: Channel,
    timing: TimingConfig,
    bands: CexBands,
}

impl<B, P, S, D> Ns73<B, P, S, D>
where
    B: SerialBus,
    P: InputPin,
    S: ByteStore,
    D: DelayNs,
{
    /// Bring up the transmitter
    ///
    /// Writes a default calibration table if the store holds none, resets
    /// the serial interface and the chip, then pushes the power-on register
    /// defaults. The channel starts at 0 but is not tuned.
    pub fn begin(
        bus: B,
        lock_pin: P,
        store: S,
        delay: D,
        config: &TransmitterConfig,
    ) -> Result<Self, Error<B::Error, P::Error, S::Error>> {
        let timing = config.timing;
        let mut ns73 = Self {
            bus,
            lock: LockDetector::with_timing(
                lock_pin,
                timing.lock_samples,
                timing.lock_sample_interval_us,
            ),
            store: CalibrationStore::new(store),
            delay,
            regs: RegisterBank::new(),
            channel: Channel::MIN,
            timing,
            bands: config.bands,
        };

        ns73.store
            .ensure_valid(&ns73.bands)
            .map_err(Error::Store)?;

        ns73.bus.reset().map_err(Error::Bus)?;
        ns73.delay.delay_us(timing.bus_reset_settle_us);

        #[cfg(feature = "defmt")]
        defmt::debug!("ns73: serial interface reset");

        ns73.write(reg::SOFTWARE_RESET, SOFTWARE_RESET_VALUE)?;
        ns73.push_registers(0)?;

        Ok(ns73)
    }

    /// Apply a startup configuration and tune its channel
    ///
    /// TX power, attenuation and mute are set first, then the transmitter
    /// goes online if requested so the retune can check lock.
    pub fn configure(
        &mut self,
        startup: &StartupConfig,
    ) -> Result<TuneOutcome, Error<B::Error, P::Error, S::Error>> {
        let channel = startup.channel().ok_or(Error::InvalidChannel)?;

        self.set_tx_power(startup.tx_power)?;
        self.set_input_attenuation(startup.attenuation)?;
        if startup.muted {
            self.mute()?;
        } else {
            self.unmute()?;
        }
        if startup.online {
            self.go_online()?;
        } else {
            self.go_offline()?;
        }

        self.set_channel(channel)
    }

    fn write(&mut self, address: u8, value: u8) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        self.bus.write_register(address, value).map_err(Error::Bus)?;
        self.regs.record(address, value);
        Ok(())
    }

    fn push_registers(&mut self, first: u8) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        for address in first..REGISTER_COUNT as u8 {
            let value = self.regs.as_bytes()[address as usize];
            self.write(address, value)?;
        }
        Ok(())
    }

    /// Write a register
    ///
    /// Addresses 0-8 are mirrored; higher addresses up to 15 are sent
    /// but not remembered.
    pub fn set_register(&mut self, address: u8, value: u8) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        if address > MAX_ADDRESS {
            return Err(Error::InvalidRegister);
        }
        self.write(address, value)
    }

    /// Last value written to a mirrored register
    pub fn register(&self, address: u8) -> Option<u8> {
        self.regs.get(address)
    }

    /// Set bits in a mirrored register
    pub fn set_bits(&mut self, address: u8, mask: u8) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        let value = self.regs.get(address).ok_or(Error::InvalidRegister)?;
        self.write(address, value | mask)
    }

    /// Clear bits in a mirrored register
    pub fn clear_bits(&mut self, address: u8, mask: u8) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        let value = self.regs.get(address).ok_or(Error::InvalidRegister)?;
        self.write(address, value & !mask)
    }

    /// Re-send every mirrored register
    ///
    /// Use after the chip lost its state (brown-out, external reset).
    pub fn restore_registers(&mut self) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        self.push_registers(0)
    }

    /// Program a CEX value, waiting for the oscillator to settle
    ///
    /// Does nothing if the value is already active. Returns whether the
    /// register was written.
    pub fn apply_calibration(&mut self, cex: Cex) -> Result<bool, Error<B::Error, P::Error, S::Error>> {
        if self.regs.cex() == cex {
            return Ok(false);
        }
        let reg8 = self.regs.get(reg::BAND).unwrap_or_default();
        self.write(reg::BAND, with_cex(reg8, cex))?;
        self.delay.delay_ms(self.timing.cex_settle_ms);
        Ok(true)
    }

    /// Sample the TEB line (about 125 ms with default timing)
    pub fn has_lock(&mut self) -> Result<bool, Error<B::Error, P::Error, S::Error>> {
        self.lock.has_lock(&mut self.delay).map_err(Error::Pin)
    }

    /// Retune the synthesizer to `channel`
    ///
    /// Does not change [`channel`](Self::channel). When the chip is powered
    /// and the stored calibration does not lock, a calibration search runs
    /// and a working value is saved. The charge pump is returned to idle
    /// even when a step in between fails.
    pub fn tune_to(
        &mut self,
        channel: Channel,
    ) -> Result<TuneOutcome, Error<B::Error, P::Error, S::Error>> {
        let cex = self.store.lookup(channel).map_err(Error::Store)?;

        self.write(reg::CHARGE_PUMP, CHARGE_PUMP_FAST)?;
        let mut state = TuneState::Idle.transition(TuneEvent::Start);

        let tuned = self.tune_with_fast_pump(channel, cex, &mut state);
        let lowered = self.write(reg::CHARGE_PUMP, CHARGE_PUMP_IDLE);
        let outcome = tuned?;
        lowered?;

        state = state.transition(TuneEvent::ChargePumpLowered);
        debug_assert_eq!(state, TuneState::Idle);

        Ok(outcome)
    }

    fn tune_with_fast_pump(
        &mut self,
        channel: Channel,
        cex: Cex,
        state: &mut TuneState,
    ) -> Result<TuneOutcome, Error<B::Error, P::Error, S::Error>> {
        let divider = channel.divider();
        self.write(reg::FREQ_LOW, (divider & 0xFF) as u8)?;
        self.write(reg::FREQ_HIGH, (divider >> 8) as u8)?;
        *state = state.transition(TuneEvent::DividerWritten);

        self.apply_calibration(cex)?;
        *state = state.transition(TuneEvent::CalibrationWritten);

        let powered = if self.is_online() {
            TuneEvent::Online
        } else {
            TuneEvent::Offline
        };
        *state = state.transition(powered);

        if *state != TuneState::LockCheck {
            return Ok(TuneOutcome::Staged);
        }

        let outcome = if self.has_lock()? {
            *state = state.transition(TuneEvent::Locked);
            TuneOutcome::Locked
        } else {
            *state = state.transition(TuneEvent::Unlocked);

            #[cfg(feature = "defmt")]
            defmt::info!("ns73: no lock on channel {}, searching", channel.index());

            match self.search(channel)? {
                Some(found) => TuneOutcome::Recalibrated(found),
                None => TuneOutcome::Unlocked,
            }
        };
        *state = state.transition(TuneEvent::Finish);

        Ok(outcome)
    }

    /// Try every CEX value until the PLL locks
    ///
    /// Values are tried from 3 down to 0. The first one that locks is
    /// saved for `channel`. If none locks, CEX 0 stays active and the
    /// table is left alone.
    pub fn search(&mut self, channel: Channel) -> Result<Option<Cex>, Error<B::Error, P::Error, S::Error>> {
        for cex in Cex::SEARCH_ORDER {
            self.apply_calibration(cex)?;
            self.delay.delay_ms(self.timing.search_settle_ms);

            let locked = self.has_lock()?;

            #[cfg(feature = "defmt")]
            defmt::debug!("ns73: CEX {} -> lock {}", cex.value(), locked);

            if locked {
                if self.store.modify(channel, cex).map_err(Error::Store)? {
                    #[cfg(feature = "defmt")]
                    defmt::info!("ns73: saved CEX {} for channel {}", cex.value(), channel.index());
                }

                return Ok(Some(cex));
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("ns73: channel {} did not lock with any CEX", channel.index());

        Ok(None)
    }

    /// Select and tune a channel
    ///
    /// Accepts a [`Channel`] or a raw index; an index past the table is
    /// rejected without touching the chip.
    pub fn set_channel<C: TryInto<Channel>>(
        &mut self,
        channel: C,
    ) -> Result<TuneOutcome, Error<B::Error, P::Error, S::Error>> {
        let channel = channel.try_into().map_err(|_| Error::InvalidChannel)?;
        self.channel = channel;
        self.tune_to(channel)
    }

    /// Select and tune a frequency in tenths of MHz (`895` = 89.5 MHz)
    ///
    /// Frequencies between two channels round down.
    pub fn set_frequency(&mut self, tenths_mhz: u16) -> Result<TuneOutcome, Error<B::Error, P::Error, S::Error>> {
        let channel = Channel::from_frequency(tenths_mhz).ok_or(Error::InvalidFrequency)?;
        self.set_channel(channel)
    }

    /// Selected channel
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Selected frequency in tenths of MHz
    pub fn frequency(&self) -> u16 {
        self.channel.frequency()
    }

    /// Move one channel up and retune; stays put on the top channel
    pub fn channel_up(&mut self) -> Result<TuneOutcome, Error<B::Error, P::Error, S::Error>> {
        self.set_channel(self.channel.up())
    }

    /// Move one channel down and retune; stays put on the bottom channel
    pub fn channel_down(&mut self) -> Result<TuneOutcome, Error<B::Error, P::Error, S::Error>> {
        self.set_channel(self.channel.down())
    }

    /// Power up the transmitter
    ///
    /// Re-sends registers 1 to 8, then enables power with 75 µs
    /// pre-emphasis.
    pub fn go_online(&mut self) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        self.push_registers(1)?;
        self.set_bits(reg::CONTROL, control::PE | control::EMS)
    }

    /// Stop the oscillator and analog section
    pub fn go_offline(&mut self) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        self.clear_bits(reg::CONTROL, control::POWER_MASK)
    }

    /// Transmitter powered
    pub fn is_online(&self) -> bool {
        self.regs.is_powered()
    }

    /// Mute audio without going offline
    pub fn mute(&mut self) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        self.set_bits(reg::CONTROL, control::MUTE)
    }

    /// Unmute audio; does not power up
    pub fn unmute(&mut self) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        self.clear_bits(reg::CONTROL, control::MUTE)
    }

    /// Set the input level for full modulation
    ///
    /// Accepts an [`InputAttenuation`] or a raw level 0-2.
    pub fn set_input_attenuation<A: TryInto<InputAttenuation>>(
        &mut self,
        level: A,
    ) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        let level = level.try_into().map_err(|_| Error::InvalidAttenuation)?;
        let reg0 = self.regs.get(reg::CONTROL).unwrap_or_default();
        self.write(reg::CONTROL, level.apply(reg0))
    }

    /// Set the transmit power
    ///
    /// Accepts a [`TxPower`] or a raw level 1-3.
    pub fn set_tx_power<T: TryInto<TxPower>>(&mut self, power: T) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        let power = power.try_into().map_err(|_| Error::InvalidTxPower)?;
        let reg2 = self.regs.get(reg::POWER).unwrap_or_default();
        self.write(reg::POWER, power.apply(reg2))
    }

    /// Stored CEX for a channel
    pub fn calibration(&mut self, channel: Channel) -> Result<Cex, Error<B::Error, P::Error, S::Error>> {
        self.store.lookup(channel).map_err(Error::Store)
    }

    /// Discard learned calibration and write the band defaults
    pub fn reset_calibration(&mut self) -> Result<(), Error<B::Error, P::Error, S::Error>> {
        #[cfg(feature = "defmt")]
        defmt::info!("ns73: calibration table reset");

        self.store.reset(&self.bands).map_err(Error::Store)
    }

    /// Give back the bus, TEB pin, store and delay
    pub fn release(self) -> (B, P, S, D) {
        (
            self.bus,
            self.lock.release(),
            self.store.release(),
            self.delay,
        )
    }
}
