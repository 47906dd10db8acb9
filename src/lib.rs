//! Hardware abstractions and peripheral access for the Raspberry Pi Sense HAT.
//!
//! # Overview
//!
//! The Sense HAT exposes its 8×8 RGB LED matrix as a Linux framebuffer device holding 64 packed
//! 16-bit (RGB565) cells, and its ambient colour sensor as a TCS3472x/TCS340x part on the I2C
//! bus. This crate wraps both behind typed APIs:
//!
//! - [`matrix::LedMatrix`] addresses pixels in rotation-independent logical coordinates and
//!   handles the RGB565 packing, per-operation device access and frame/image loading.
//! - [`sensor::ColourSensor`] drives the colour sensor's exposure parameters and converts its raw
//!   channel counts into calibrated RGB.
//!
//! Peripheral access usually begins at [`SenseHat::open`], which verifies the platform and
//! discovers the device nodes:
//!
//! ```no_run
//! use sensehat::{SenseHat, color::Rgb};
//!
//! let mut hat = SenseHat::open()?;
//! hat.matrix.set_rotation(180)?;
//! hat.matrix.fill(Rgb::new(0, 64, 0))?;
//!
//! hat.colour.set_enabled(true)?;
//! println!("ambient colour: {}", hat.colour.rgb()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Individual peripherals can also be constructed directly from known device paths, which is how
//! the fixture-backed [`sensor::SimulatedSensor`] backend is wired in for development away from
//! the hardware.
//!
//! All operations are synchronous and blocking; the crate takes no locks, so callers sharing a
//! peripheral across threads must serialize access themselves.

pub mod color;
pub mod hat;
pub mod matrix;
pub mod platform;
pub mod rotation;
pub mod sensor;

#[cfg(feature = "embedded-graphics")]
pub mod graphics;

pub use hat::SenseHat;
