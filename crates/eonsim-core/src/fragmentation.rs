//! Fragmentation metrics over a single link's spectrum.

use crate::spectrum::Spectrum;
use crate::units::Fsus;

/// Real-valued summaries of the free-slice width distribution. A closed
/// set, one variant per metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FragmentationMetric {
    /// `1 - max(free width) / available`; zero when nothing is free.
    Absolute,
    /// `1 - max(free width) / size`; zero when nothing is free.
    External,
    /// Shannon entropy of the free-slice widths at least `min_fsus` wide,
    /// each weighed by its share of the full spectrum. Infinite when
    /// nothing is free.
    EntropyBased { min_fsus: Fsus },
}

impl FragmentationMetric {
    pub fn measure(self, spectrum: &Spectrum) -> f64 {
        let available = spectrum.available();
        match self {
            Self::Absolute => {
                if available == 0 {
                    return 0.0;
                }
                1.0 - widest(spectrum) as f64 / available as f64
            }
            Self::External => {
                if available == 0 {
                    return 0.0;
                }
                1.0 - widest(spectrum) as f64 / spectrum.size() as f64
            }
            Self::EntropyBased { min_fsus } => {
                if available == 0 {
                    return f64::INFINITY;
                }
                let size = spectrum.size() as f64;
                -spectrum
                    .free_slices()
                    .iter()
                    .map(|slice| slice.width())
                    .filter(|&width| width as u64 >= min_fsus.into_u64())
                    .map(|width| {
                        let ratio = width as f64 / size;
                        ratio * ratio.ln()
                    })
                    .sum::<f64>()
            }
        }
    }
}

fn widest(spectrum: &Spectrum) -> usize {
    spectrum
        .free_slices()
        .iter()
        .map(|slice| slice.width())
        .max()
        .unwrap_or(0)
}
