//! Aggregate access to the HAT's peripherals.

use log::info;
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::{
    matrix::LedMatrix,
    platform::{self, PlatformError},
    sensor::{ColourSensor, SensorError, Tcs3472x},
};

/// A Sense HAT with its peripherals discovered and opened.
///
/// # Examples
///
/// ```no_run
/// use sensehat::SenseHat;
///
/// let mut hat = SenseHat::open()?;
/// hat.matrix.clear()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct SenseHat {
    /// The 8×8 LED matrix.
    pub matrix: LedMatrix,
    /// The ambient colour sensor.
    pub colour: ColourSensor<Tcs3472x>,
}

impl SenseHat {
    /// Verifies the platform, discovers the HAT's device nodes and opens its peripherals.
    pub fn open() -> Result<Self, HatError> {
        ensure!(platform::is_raspberry_pi_os(), NotRaspberryPiSnafu);
        ensure!(
            platform::i2c_enabled().context(PlatformSnafu)?,
            I2cDisabledSnafu
        );

        let framebuffer = platform::find_framebuffer()
            .context(PlatformSnafu)?
            .context(FramebufferNotFoundSnafu)?;
        let bus = platform::find_i2c_bus()
            .context(PlatformSnafu)?
            .context(I2cBusNotFoundSnafu)?;
        info!(
            "opening Sense HAT: matrix at {}, colour sensor on {}",
            framebuffer.display(),
            bus.display()
        );

        Ok(Self {
            matrix: LedMatrix::new(framebuffer),
            colour: ColourSensor::open(bus).context(SensorSnafu)?,
        })
    }
}

/// Errors that can occur when opening the HAT.
#[derive(Debug, Snafu)]
pub enum HatError {
    /// The system is not running Raspberry Pi OS.
    #[snafu(display("this system is not running Raspberry Pi OS"))]
    NotRaspberryPi,

    /// The I2C interface is disabled.
    #[snafu(display("I2C is not enabled; enable it with raspi-config"))]
    I2cDisabled,

    /// No framebuffer named `RPiSense FB` was found.
    #[snafu(display("no Sense HAT framebuffer device found"))]
    FramebufferNotFound,

    /// No `/dev/i2c-*` bus node was found.
    #[snafu(display("no I2C bus device found"))]
    I2cBusNotFound,

    /// Platform detection itself failed.
    #[snafu(display("platform detection failed"))]
    Platform {
        /// The underlying platform error.
        source: PlatformError,
    },

    /// The colour sensor could not be initialized.
    #[snafu(display("colour sensor initialization failed"))]
    Sensor {
        /// The underlying sensor error.
        source: SensorError,
    },
}
