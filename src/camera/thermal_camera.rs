// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::error::Error as StdError;

use anyhow::{anyhow, Context as _};
use embedded_hal::blocking::i2c;

use crate::frame::{RawFrame, COLS, ROWS};

/// The operations a thermal camera needs to have to be used as a frame source.
pub(crate) trait ThermalCamera {
    /// Read one full frame from the camera.
    fn thermal_image(&mut self) -> anyhow::Result<RawFrame>;

    fn set_frame_rate(&mut self, frame_rate: f32) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub(crate) struct Mlx90640<I2C> {
    camera: mlx9064x::Mlx90640Driver<I2C>,
    temperature_buffer: Vec<f32>,
}

impl<I2C> Mlx90640<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: 'static + StdError + Sync + Send,
    <I2C as i2c::Write>::Error: 'static + StdError + Sync + Send,
{
    pub(crate) fn new(camera: mlx9064x::Mlx90640Driver<I2C>) -> anyhow::Result<Self> {
        let (height, width) = (camera.height(), camera.width());
        if (height, width) != (ROWS, COLS) {
            return Err(anyhow!(
                "camera reports a {}x{} sensor, expected {}x{}",
                height,
                width,
                ROWS,
                COLS
            ));
        }
        Ok(Self {
            camera,
            temperature_buffer: vec![0f32; height * width],
        })
    }
}

impl<I2C> ThermalCamera for Mlx90640<I2C>
where
    I2C: 'static + i2c::WriteRead + i2c::Write,
    <I2C as i2c::WriteRead>::Error: 'static + StdError + Sync + Send,
    <I2C as i2c::Write>::Error: 'static + StdError + Sync + Send,
{
    fn thermal_image(&mut self) -> anyhow::Result<RawFrame> {
        self.camera
            .generate_image_to(&mut self.temperature_buffer)
            .context("Error reading frame from MLX90640")?;
        // mlx9064x uses row-major ordering, so the buffer can be used as-is.
        RawFrame::from_vec(self.temperature_buffer.clone())
    }

    fn set_frame_rate(&mut self, frame_rate: f32) -> anyhow::Result<()> {
        let mlx_frame_rate = mlx9064x::FrameRate::try_from(frame_rate)
            .map_err(|e| anyhow!("Invalid frame rate {}: {}", frame_rate, e))?;
        self.camera
            .set_frame_rate(mlx_frame_rate)
            .context("Error setting camera frame rate")
    }
}
