// SPDX-License-Identifier: GPL-3.0-or-later
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use rand_distr::{Distribution, Uniform};

use crate::frame::{RawFrame, COLS, ROWS};
use crate::state::DisplaySettings;

/// How far inside the display range the background readings are kept.
const MARGIN: f64 = 5.0;

/// Side length of the warm square in the middle of the frame.
const HOTSPOT_SIZE: usize = 6;

/// How much warmer the middle square is than the background.
const HOTSPOT_OFFSET: f32 = 5.0;

/// Whether a cell is inside the centered `HOTSPOT_SIZE` square.
fn in_hotspot(row: usize, col: usize) -> bool {
    let half = HOTSPOT_SIZE / 2;
    let rows = (ROWS / 2 - half)..(ROWS / 2 + half);
    let cols = (COLS / 2 - half)..(COLS / 2 + half);
    rows.contains(&row) && cols.contains(&col)
}

/// Generates stand-in frames when there is no working camera.
///
/// Every cell is drawn uniformly from `[min_temp + 5, max_temp - 5]` with a 6x6 square in the
/// middle raised by 5 degrees. If the display range is narrower than 10 degrees those bounds
/// cross, and they are swapped instead.
#[derive(Clone, Debug)]
pub(crate) struct SyntheticCamera {
    rng: ChaCha8Rng,
}

impl SyntheticCamera {
    pub(crate) fn new() -> Self {
        Self::from_rng(ChaCha8Rng::from_entropy())
    }

    pub(crate) fn from_rng(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }

    /// The bounds background readings are drawn from for `settings`, lowest first.
    pub(crate) fn sample_range(settings: &DisplaySettings) -> (f32, f32) {
        let low = settings.min_temp as f64 + MARGIN;
        let high = settings.max_temp as f64 - MARGIN;
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        (low as f32, high as f32)
    }

    pub(crate) fn frame(&mut self, settings: &DisplaySettings) -> RawFrame {
        let (low, high) = Self::sample_range(settings);
        // Sampled in f64 so that very wide ranges don't overflow the distribution width.
        let background = Uniform::new_inclusive(low as f64, high as f64);
        let rng = &mut self.rng;
        RawFrame::from_fn(|(row, col)| {
            let reading = background.sample(&mut *rng) as f32;
            if in_hotspot(row, col) {
                reading + HOTSPOT_OFFSET
            } else {
                reading
            }
        })
    }
}
