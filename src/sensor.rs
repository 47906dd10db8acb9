//! Ambient colour sensor (TCS3472x / TCS340x).
//!
//! The Sense HAT carries a TAOS colour sensor on the I2C bus: four 16-bit ADC channels (red,
//! green, blue and an unfiltered clear channel) whose full-scale count depends on how many
//! integration cycles a reading accumulates. [`ColourSensor`] turns raw channel counts into
//! calibrated 0–255 RGB.
//!
//! Hardware access goes through the [`SensorInterface`] capability trait with two implementations
//! selected at construction: [`Tcs3472x`] talks to the real part over the bus, and
//! [`SimulatedSensor`] serves fixture readings for development away from the hardware.

use std::{fmt, path::Path, thread, time::Duration};

use bitflags::bitflags;
use i2cdev::{
    core::I2CDevice,
    linux::{LinuxI2CDevice, LinuxI2CError},
};
use log::{debug, info};
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::color::Rgb;

/// Bus address of TCS3472x parts.
pub const TCS3472X_ADDR: u16 = 0x29;
/// Bus address of TCS340x parts.
pub const TCS340X_ADDR: u16 = 0x39;

const ENABLE_REG: u8 = 0x80;
const ATIME_REG: u8 = 0x81;
const CONTROL_REG: u8 = 0x8F;
const ID_REG: u8 = 0x92;
const STATUS_REG: u8 = 0x93;
const RDATA_REG: u8 = 0x96;
const GDATA_REG: u8 = 0x98;
const BDATA_REG: u8 = 0x9A;
const CDATA_REG: u8 = 0x94;

bitflags! {
    /// Bits of the ENABLE register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Enable: u8 {
        /// Oscillator power.
        const POWER_ON = 0x01;
        /// RGBC ADC enable.
        const ADC_ENABLE = 0x02;
    }
}

/// Analog gain applied to the sensor's RGBC channels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    /// 1× gain.
    #[default]
    X1,
    /// 4× gain.
    X4,
    /// 16× gain.
    X16,
    /// 60× gain, the top step on TCS3472x parts.
    X60,
    /// 64× gain, the top step on TCS340x parts. Shares a register encoding with [`Gain::X60`].
    X64,
}

impl Gain {
    /// Returns the gain matching a numeric level, or `None` for anything outside
    /// {1, 4, 16, 60, 64}.
    #[must_use]
    pub const fn from_level(level: u16) -> Option<Self> {
        match level {
            1 => Some(Self::X1),
            4 => Some(Self::X4),
            16 => Some(Self::X16),
            60 => Some(Self::X60),
            64 => Some(Self::X64),
            _ => None,
        }
    }

    /// Returns the numeric gain level.
    #[must_use]
    pub const fn level(self) -> u16 {
        match self {
            Self::X1 => 1,
            Self::X4 => 4,
            Self::X16 => 16,
            Self::X60 => 60,
            Self::X64 => 64,
        }
    }

    /// Encodes the gain as its CONTROL register value.
    ///
    /// The encoding is not injective: [`Gain::X60`] and [`Gain::X64`] are the same hardware step
    /// and both encode to `0x03`.
    #[must_use]
    pub const fn register(self) -> u8 {
        match self {
            Self::X1 => 0x00,
            Self::X4 => 0x01,
            Self::X16 => 0x02,
            Self::X60 | Self::X64 => 0x03,
        }
    }

    /// Decodes a CONTROL register value (low two bits) back to a gain.
    ///
    /// Because `0x03` encodes two logical gains, the decode resolves it to the lowest of them,
    /// [`Gain::X60`].
    #[must_use]
    pub const fn from_register(value: u8) -> Self {
        match value & 0x03 {
            0x00 => Self::X1,
            0x01 => Self::X4,
            0x02 => Self::X16,
            _ => Self::X60,
        }
    }
}

/// One raw RGBC reading, as returned by a single bus transaction sequence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// The red channel count.
    pub red: u16,
    /// The green channel count.
    pub green: u16,
    /// The blue channel count.
    pub blue: u16,
    /// The unfiltered clear channel count.
    pub clear: u16,
}

/// Capability interface over colour sensor hardware.
///
/// [`ColourSensor`] is generic over this trait so the backend is chosen at construction time:
/// [`Tcs3472x`] for the real bus-attached part, [`SimulatedSensor`] for fixture-backed use.
pub trait SensorInterface {
    /// Powers the sensor and its ADC on or off.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), SensorError>;

    /// Returns whether the sensor and its ADC are powered.
    fn enabled(&mut self) -> Result<bool, SensorError>;

    /// Applies an analog gain.
    fn set_gain(&mut self, gain: Gain) -> Result<(), SensorError>;

    /// Reads back the currently applied gain.
    fn gain(&mut self) -> Result<Gain, SensorError>;

    /// Applies an integration cycle count. Callers must pass a value in `1..=256`.
    fn set_integration_cycles(&mut self, cycles: u16) -> Result<(), SensorError>;

    /// Reads back the current integration cycle count.
    fn integration_cycles(&mut self) -> Result<u16, SensorError>;

    /// Returns the full-scale raw count for a given integration cycle count.
    fn max_count(&self, cycles: u16) -> u32;

    /// Reads all four raw channels. No partial sample is ever returned.
    fn read_raw(&mut self) -> Result<RawSample, SensorError>;
}

/// The real TCS3472x/TCS340x part on the I2C bus.
pub struct Tcs3472x {
    device: LinuxI2CDevice,
    address: u16,
}

impl Tcs3472x {
    /// Opens the sensor on the given I2C bus device, probing the ID register to tell the two
    /// supported part families apart.
    ///
    /// TCS340x parts answer with an ID in the `0x90` block and live at [`TCS340X_ADDR`];
    /// everything else is treated as a TCS3472x at [`TCS3472X_ADDR`].
    pub fn open(bus: impl AsRef<Path>) -> Result<Self, SensorError> {
        let bus = bus.as_ref();
        let mut device = LinuxI2CDevice::new(bus, TCS3472X_ADDR).context(BusSnafu)?;
        let id = device.smbus_read_byte_data(ID_REG).context(BusSnafu)?;

        let address = if id & 0xF8 == 0x90 {
            TCS340X_ADDR
        } else {
            TCS3472X_ADDR
        };
        if address != TCS3472X_ADDR {
            device = LinuxI2CDevice::new(bus, address).context(BusSnafu)?;
        }
        info!("colour sensor id {id:#04x} at bus address {address:#04x}");

        Ok(Self { device, address })
    }

    /// Returns the resolved bus address of the part.
    #[must_use]
    pub const fn address(&self) -> u16 {
        self.address
    }

    /// Reads the STATUS register. Bit 0 reports whether an RGBC cycle has completed since the
    /// ADC was enabled.
    pub fn status(&mut self) -> Result<u8, SensorError> {
        self.device.smbus_read_byte_data(STATUS_REG).context(BusSnafu)
    }

    /// Full-scale raw count for a given integration cycle count.
    ///
    /// Each cycle accumulates up to 1024 counts; the 16-bit channel registers saturate the full
    /// scale at 65536 from 64 cycles up.
    #[must_use]
    pub const fn full_scale(cycles: u16) -> u32 {
        let count = 1024 * cycles as u32;
        if count > 65536 { 65536 } else { count }
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
        self.device
            .smbus_write_byte_data(register, value)
            .context(BusSnafu)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, SensorError> {
        self.device.smbus_read_byte_data(register).context(BusSnafu)
    }

    /// 16-bit channel registers read little-endian, which is exactly the SMBus word order.
    fn read_channel(&mut self, register: u8) -> Result<u16, SensorError> {
        self.device.smbus_read_word_data(register).context(BusSnafu)
    }
}

impl fmt::Debug for Tcs3472x {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tcs3472x")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl SensorInterface for Tcs3472x {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), SensorError> {
        if enabled {
            // The oscillator must be powered for 2.4ms before the ADC may be enabled; collapsing
            // this into one write leaves the ADC running off a cold oscillator.
            self.write_register(ENABLE_REG, Enable::POWER_ON.bits())?;
            thread::sleep(Duration::from_micros(2400));
            self.write_register(
                ENABLE_REG,
                (Enable::POWER_ON | Enable::ADC_ENABLE).bits(),
            )
        } else {
            self.write_register(ENABLE_REG, Enable::empty().bits())
        }
    }

    fn enabled(&mut self) -> Result<bool, SensorError> {
        let bits = Enable::from_bits_truncate(self.read_register(ENABLE_REG)?);
        Ok(bits.contains(Enable::POWER_ON | Enable::ADC_ENABLE))
    }

    fn set_gain(&mut self, gain: Gain) -> Result<(), SensorError> {
        self.write_register(CONTROL_REG, gain.register())
    }

    fn gain(&mut self) -> Result<Gain, SensorError> {
        Ok(Gain::from_register(self.read_register(CONTROL_REG)?))
    }

    fn set_integration_cycles(&mut self, cycles: u16) -> Result<(), SensorError> {
        // ATIME is a countdown register: 256 cycles is 0x00, 1 cycle is 0xFF.
        self.write_register(ATIME_REG, (256 - cycles) as u8)
    }

    fn integration_cycles(&mut self) -> Result<u16, SensorError> {
        Ok(256 - u16::from(self.read_register(ATIME_REG)?))
    }

    fn max_count(&self, cycles: u16) -> u32 {
        Self::full_scale(cycles)
    }

    fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        Ok(RawSample {
            red: self.read_channel(RDATA_REG)?,
            green: self.read_channel(GDATA_REG)?,
            blue: self.read_channel(BDATA_REG)?,
            clear: self.read_channel(CDATA_REG)?,
        })
    }
}

/// Fixture-backed sensor for development and testing away from the hardware.
///
/// Setters update internal state, getters serve it back, and [`SensorInterface::read_raw`] always
/// returns the configured sample. The defaults mirror a sensor staring at a bright red object:
/// raw R/G/B/Clear of 255/128/64/32 with a full scale of 1024.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedSensor {
    enabled: bool,
    gain: Gain,
    integration_cycles: u16,
    raw: RawSample,
    max_count: u32,
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new(
            RawSample {
                red: 255,
                green: 128,
                blue: 64,
                clear: 32,
            },
            1024,
        )
    }
}

impl SimulatedSensor {
    /// Creates a simulated sensor serving the given sample at the given full-scale count.
    #[must_use]
    pub const fn new(raw: RawSample, max_count: u32) -> Self {
        Self {
            enabled: true,
            gain: Gain::X1,
            integration_cycles: 1,
            raw,
            max_count,
        }
    }

    /// Replaces the sample served by [`SensorInterface::read_raw`].
    pub fn set_raw(&mut self, raw: RawSample) {
        self.raw = raw;
    }
}

impl SensorInterface for SimulatedSensor {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), SensorError> {
        self.enabled = enabled;
        Ok(())
    }

    fn enabled(&mut self) -> Result<bool, SensorError> {
        Ok(self.enabled)
    }

    fn set_gain(&mut self, gain: Gain) -> Result<(), SensorError> {
        self.gain = gain;
        Ok(())
    }

    fn gain(&mut self) -> Result<Gain, SensorError> {
        Ok(self.gain)
    }

    fn set_integration_cycles(&mut self, cycles: u16) -> Result<(), SensorError> {
        self.integration_cycles = cycles;
        Ok(())
    }

    fn integration_cycles(&mut self) -> Result<u16, SensorError> {
        Ok(self.integration_cycles)
    }

    fn max_count(&self, _cycles: u16) -> u32 {
        self.max_count
    }

    fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        Ok(self.raw)
    }
}

/// The colour reading pipeline: validated exposure control plus raw-to-RGB scaling.
///
/// # Examples
///
/// ```no_run
/// use sensehat::sensor::ColourSensor;
///
/// let mut colour = ColourSensor::open("/dev/i2c-1")?;
/// colour.set_enabled(true)?;
/// colour.set_integration_cycles(64)?;
/// println!("ambient colour: {}", colour.rgb()?);
/// # Ok::<(), sensehat::sensor::SensorError>(())
/// ```
#[derive(Debug)]
pub struct ColourSensor<I: SensorInterface = Tcs3472x> {
    interface: I,
    gain: Gain,
    integration_cycles: u16,
    settle_interval: Duration,
}

impl ColourSensor<Tcs3472x> {
    /// Opens the sensor on the given I2C bus device.
    pub fn open(bus: impl AsRef<Path>) -> Result<Self, SensorError> {
        Ok(Self::new(Tcs3472x::open(bus)?))
    }
}

impl<I: SensorInterface> ColourSensor<I> {
    /// Settle time the hardware needs after an integration-time change before the next reading
    /// is valid.
    pub const SETTLE_INTERVAL: Duration = Duration::from_millis(24);

    /// Wraps a sensor backend with default exposure state (1× gain, 1 integration cycle).
    pub fn new(interface: I) -> Self {
        Self {
            interface,
            gain: Gain::default(),
            integration_cycles: 1,
            settle_interval: Self::SETTLE_INTERVAL,
        }
    }

    /// Powers the sensor and its ADC on or off.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), SensorError> {
        self.interface.set_enabled(enabled)
    }

    /// Returns whether the sensor and its ADC are powered.
    pub fn enabled(&mut self) -> Result<bool, SensorError> {
        self.interface.enabled()
    }

    /// Returns the gain configured through this pipeline.
    #[must_use]
    pub const fn gain(&self) -> Gain {
        self.gain
    }

    /// Applies an analog gain.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), SensorError> {
        self.interface.set_gain(gain)?;
        self.gain = gain;
        Ok(())
    }

    /// Applies an analog gain given as a numeric level.
    ///
    /// Levels outside {1, 4, 16, 60, 64} fail with [`SensorError::InvalidGain`] before any bus
    /// traffic.
    pub fn set_gain_level(&mut self, level: u16) -> Result<(), SensorError> {
        let gain = Gain::from_level(level).context(InvalidGainSnafu { level })?;
        self.set_gain(gain)
    }

    /// Returns the integration cycle count configured through this pipeline.
    #[must_use]
    pub const fn integration_cycles(&self) -> u16 {
        self.integration_cycles
    }

    /// Sets how many integration cycles each reading accumulates.
    ///
    /// `cycles` must be in `1..=256`; anything else fails with
    /// [`SensorError::InvalidIntegrationCycles`] before any bus traffic. On success the calling
    /// thread sleeps [`Self::SETTLE_INTERVAL`], since the hardware needs the settle period before
    /// its next reading is valid.
    pub fn set_integration_cycles(&mut self, cycles: u16) -> Result<(), SensorError> {
        ensure!(
            (1..=256).contains(&cycles),
            InvalidIntegrationCyclesSnafu { cycles }
        );

        self.interface.set_integration_cycles(cycles)?;
        self.integration_cycles = cycles;
        debug!("integration cycles set to {cycles}, settling");
        thread::sleep(self.settle_interval);
        Ok(())
    }

    /// Full-scale raw count at the current integration cycle count.
    pub fn max_count(&self) -> u32 {
        self.interface.max_count(self.integration_cycles)
    }

    /// Reads one raw RGBC sample.
    pub fn raw(&mut self) -> Result<RawSample, SensorError> {
        self.interface.read_raw()
    }

    /// Scales a raw sample to 0–255 RGB using the current full-scale count.
    ///
    /// The scaling factor is `max_count() / 256`; a full-scale count below 256 would make it
    /// zero, which fails with [`SensorError::Scaling`] instead of dividing by it.
    pub fn scale(&self, raw: RawSample) -> Result<Rgb<u8>, SensorError> {
        let max_count = self.max_count();
        let scaling = max_count / 256;
        ensure!(scaling > 0, ScalingSnafu { max_count });

        let channel = |count: u16| (u32::from(count) / scaling).min(255) as u8;
        Ok(Rgb::new(channel(raw.red), channel(raw.green), channel(raw.blue)))
    }

    /// Reads one sample and scales it to calibrated RGB.
    pub fn rgb(&mut self) -> Result<Rgb<u8>, SensorError> {
        let raw = self.raw()?;
        self.scale(raw)
    }
}

/// Errors that can occur when using the colour sensor.
#[derive(Debug, Snafu)]
pub enum SensorError {
    /// A gain level outside the supported set was requested.
    #[snafu(display("{level} is not a supported gain level (1, 4, 16, 60 or 64)"))]
    InvalidGain {
        /// The rejected level.
        level: u16,
    },

    /// An integration cycle count outside `1..=256` was requested.
    #[snafu(display("integration cycles must be within 1..=256, got {cycles}"))]
    InvalidIntegrationCycles {
        /// The rejected cycle count.
        cycles: u16,
    },

    /// The full-scale count is too small to derive a channel scaling factor.
    #[snafu(display("full-scale count {max_count} is too small to scale channels"))]
    Scaling {
        /// The degenerate full-scale count.
        max_count: u32,
    },

    /// An I2C transaction failed.
    #[snafu(display("I2C bus transaction failed"))]
    Bus {
        /// The underlying bus error.
        source: LinuxI2CError,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gain_levels_round_trip() {
        for gain in [Gain::X1, Gain::X4, Gain::X16, Gain::X60, Gain::X64] {
            assert_eq!(Gain::from_level(gain.level()), Some(gain));
        }
        assert_eq!(Gain::from_level(2), None);
        assert_eq!(Gain::from_level(0), None);
    }

    #[test]
    fn gain_encoding_is_not_injective() {
        assert_eq!(Gain::X60.register(), 0x03);
        assert_eq!(Gain::X64.register(), 0x03);
        // The shared encoding decodes to the lowest of the two logical gains.
        assert_eq!(Gain::from_register(0x03), Gain::X60);

        for gain in [Gain::X1, Gain::X4, Gain::X16] {
            assert_eq!(Gain::from_register(gain.register()), gain);
        }
    }

    #[test]
    fn full_scale_saturates_at_sixteen_bits() {
        assert_eq!(Tcs3472x::full_scale(1), 1024);
        assert_eq!(Tcs3472x::full_scale(63), 64512);
        assert_eq!(Tcs3472x::full_scale(64), 65536);
        assert_eq!(Tcs3472x::full_scale(256), 65536);
    }

    #[test]
    fn invalid_parameters_fail_before_state_changes() {
        let mut sensor = ColourSensor::new(SimulatedSensor::default());

        assert!(matches!(
            sensor.set_gain_level(8),
            Err(SensorError::InvalidGain { level: 8 })
        ));
        assert_eq!(sensor.gain(), Gain::X1);

        for cycles in [0, 257] {
            assert!(matches!(
                sensor.set_integration_cycles(cycles),
                Err(SensorError::InvalidIntegrationCycles { .. })
            ));
        }
        assert_eq!(sensor.integration_cycles(), 1);
    }

    #[test]
    fn exposure_setters_commit_on_success() {
        let mut sensor = ColourSensor::new(SimulatedSensor::default());

        sensor.set_gain_level(60).unwrap();
        assert_eq!(sensor.gain(), Gain::X60);

        sensor.set_integration_cycles(256).unwrap();
        assert_eq!(sensor.integration_cycles(), 256);

        sensor.set_enabled(false).unwrap();
        assert!(!sensor.enabled().unwrap());
    }

    #[test]
    fn scaling_divides_by_full_scale_step() {
        let fixture = SimulatedSensor::new(
            RawSample {
                red: 128,
                green: 64,
                blue: 32,
                clear: 255,
            },
            512,
        );
        let mut sensor = ColourSensor::new(fixture);

        // Full scale 512 gives a scaling factor of 2: every channel halves.
        assert_eq!(sensor.rgb().unwrap(), Rgb::new(64, 32, 16));
    }

    #[test]
    fn default_fixture_scales_like_the_real_mock() {
        let mut sensor = ColourSensor::new(SimulatedSensor::default());
        assert_eq!(sensor.max_count(), 1024);
        assert_eq!(sensor.rgb().unwrap(), Rgb::new(63, 32, 16));
    }

    #[test]
    fn degenerate_full_scale_is_guarded() {
        let mut sensor = ColourSensor::new(SimulatedSensor::new(RawSample::default(), 128));
        assert!(matches!(
            sensor.rgb(),
            Err(SensorError::Scaling { max_count: 128 })
        ));
    }

    #[test]
    fn full_channel_reading_clamps_to_eight_bits() {
        let fixture = SimulatedSensor::new(
            RawSample {
                red: 512,
                green: 0,
                blue: 0,
                clear: 512,
            },
            512,
        );
        let mut sensor = ColourSensor::new(fixture);

        // A saturated channel divides to 256, one past the u8 range.
        assert_eq!(sensor.rgb().unwrap(), Rgb::new(255, 0, 0));
    }
}
