// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::fmt;

use anyhow::anyhow;
use ndarray::{s, Array2, ArrayView2};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Number of rows in an MLX90640 frame.
pub(crate) const ROWS: usize = 24;

/// Number of columns in an MLX90640 frame.
pub(crate) const COLS: usize = 32;

/// Counter-clockwise quarter turns applied to a frame before it is published.
///
/// Only the integers 0 through 3 are accepted when deserializing.
#[derive(Clone, Copy, Debug, Deserialize_repr, Eq, PartialEq, Serialize_repr)]
#[repr(u8)]
pub(crate) enum Rotation {
    Zero = 0,
    Ninety = 1,
    OneEighty = 2,
    TwoSeventy = 3,
}

impl Rotation {
    #[cfg(test)]
    pub(crate) const ALL: [Rotation; 4] = [
        Rotation::Zero,
        Rotation::Ninety,
        Rotation::OneEighty,
        Rotation::TwoSeventy,
    ];

    /// The rotation that undoes this one.
    #[cfg(test)]
    pub(crate) fn inverse(self) -> Self {
        match self {
            Self::Zero => Self::Zero,
            Self::Ninety => Self::TwoSeventy,
            Self::OneEighty => Self::OneEighty,
            Self::TwoSeventy => Self::Ninety,
        }
    }

    /// Whether rows and columns trade places under this rotation.
    pub(crate) fn swaps_axes(self) -> bool {
        matches!(self, Self::Ninety | Self::TwoSeventy)
    }

    /// The `(rows, cols)` of a `ROWS x COLS` frame after rotating.
    pub(crate) fn rotated_dim(self) -> (usize, usize) {
        if self.swaps_axes() {
            (COLS, ROWS)
        } else {
            (ROWS, COLS)
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::TwoSeventy
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", *self as u16 * 90)
    }
}

/// A single unrotated frame straight from a sensor, in degrees Celsius.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RawFrame(Array2<f32>);

impl RawFrame {
    /// Wrap a row-major buffer of exactly `ROWS * COLS` readings.
    pub(crate) fn from_vec(readings: Vec<f32>) -> anyhow::Result<Self> {
        let count = readings.len();
        Array2::from_shape_vec((ROWS, COLS), readings)
            .map(Self)
            .map_err(|_| {
                anyhow!(
                    "expected {} temperature readings, the sensor gave {}",
                    ROWS * COLS,
                    count
                )
            })
    }

    /// Build a frame by calling `f` with the `(row, col)` of every cell, in row-major order.
    pub(crate) fn from_fn<F>(f: F) -> Self
    where
        F: FnMut((usize, usize)) -> f32,
    {
        Self(Array2::from_shape_fn((ROWS, COLS), f))
    }

    pub(crate) fn grid(&self) -> ArrayView2<f32> {
        self.0.view()
    }

    /// The hottest reading in the frame.
    pub(crate) fn max_temperature(&self) -> f32 {
        self.0.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

impl TryFrom<Array2<f32>> for RawFrame {
    type Error = anyhow::Error;

    fn try_from(grid: Array2<f32>) -> anyhow::Result<Self> {
        let (rows, cols) = grid.dim();
        if (rows, cols) == (ROWS, COLS) {
            Ok(Self(grid))
        } else {
            Err(anyhow!(
                "expected a {}x{} temperature grid, got {}x{}",
                ROWS,
                COLS,
                rows,
                cols
            ))
        }
    }
}

/// A frame oriented for display, along with the statistics derived from it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ProcessedFrame {
    pub(crate) grid: Array2<f32>,
    pub(crate) rotation: Rotation,
    pub(crate) max_temperature: f32,
}

impl ProcessedFrame {
    /// The coldest value in the grid. Recomputed on every call.
    pub(crate) fn min_temperature(&self) -> f32 {
        self.grid.iter().copied().fold(f32::INFINITY, f32::min)
    }
}

/// Rotate a grid counter-clockwise by `rotation`.
///
/// This is only an index permutation, every value ends up in the output exactly once.
pub(crate) fn rotate(grid: ArrayView2<f32>, rotation: Rotation) -> Array2<f32> {
    let rotated = match rotation {
        Rotation::Zero => grid,
        Rotation::Ninety => grid.reversed_axes().slice_move(s![..;-1, ..]),
        Rotation::OneEighty => grid.slice_move(s![..;-1, ..;-1]),
        Rotation::TwoSeventy => grid.reversed_axes().slice_move(s![.., ..;-1]),
    };
    // Copy into a fresh row-major array so rows can be serialized in order.
    rotated.as_standard_layout().into_owned()
}

/// Orient a raw frame for display and compute its maximum temperature.
pub(crate) fn process(frame: RawFrame, rotation: Rotation) -> ProcessedFrame {
    let max_temperature = frame.max_temperature();
    let grid = rotate(frame.grid(), rotation);
    debug_assert_eq!(grid.dim(), rotation.rotated_dim());
    ProcessedFrame {
        grid,
        rotation,
        max_temperature,
    }
}
