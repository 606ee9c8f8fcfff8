//! Random downsampling of oversized samples.

use rand::seq::SliceRandom;
use rand::Rng;

/// Draw a uniform random subsample of at most `max_size` values, without
/// replacement. Samples already within the bound are returned unchanged.
///
/// Downsampling introduces sampling variance, so callers repeat the
/// downstream statistic across several draws rather than trusting one.
pub fn downsample<R: Rng + ?Sized>(data: &[f64], max_size: usize, rng: &mut R) -> Vec<f64> {
    if data.len() <= max_size {
        return data.to_vec();
    }
    data.choose_multiple(rng, max_size).copied().collect()
}
