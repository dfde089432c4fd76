//! Frequency histograms over a flat series of values.
//!
//! A histogram is a snapshot: it is computed from the values at the moment
//! it is asked for and is not kept in step with later additions.

use error::Error;
use stats;
use std::cmp::Ordering;

/// Pick a bin count from the number of distinct values.
///
/// Small series follow a fixed table. Past 1000 distinct values the Sturges
/// rule, `ceil(log2 n) + 1`, takes over.
pub fn number_of_bins(values: &[f64]) -> usize {
    match distinct(values) {
        0 => 0,
        1..=19 => 5,
        20..=50 => 6,
        51..=100 => 7,
        101..=200 => 8,
        201..=500 => 9,
        501..=1000 => 10,
        n => (n as f64).log2().ceil() as usize + 1,
    }
}

fn distinct(values: &[f64]) -> usize {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted.dedup();
    sorted.len()
}

/// Check that a histogram can be built from `values`.
pub fn validate(values: &[f64]) -> Result<(), Error> {
    if values.len() <= 1 {
        return Err(Error::InsufficientData(values.len()));
    }
    if number_of_bins(values) < 1 {
        return Err(Error::InsufficientBins);
    }
    Ok(())
}

/// The bin width that spreads `bins` bins evenly over the range of
/// `values`. With no `bins` the computed count is used.
pub fn delta(values: &[f64], bins: Option<usize>) -> Result<f64, Error> {
    let bins = match bins {
        Some(0) => return Err(Error::InsufficientBins),
        Some(n) => n,
        None => match number_of_bins(values) {
            0 => return Err(Error::InsufficientBins),
            n => n,
        },
    };
    Ok(stats::range(values) / bins as f64)
}

/// Overrides for the histogram layout. Anything left unset is computed from
/// the data.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Binning {
    bins: Option<usize>,
    first_bin: Option<f64>,
    width: Option<f64>,
}

impl Binning {
    /// Compute everything from the data.
    pub fn new() -> Binning {
        Binning::default()
    }

    /// Use exactly `bins` bins. Zero is an error at build time.
    pub fn bins(mut self, bins: usize) -> Binning {
        self.bins = Some(bins);
        self
    }

    /// Start the first bin at `first_bin` rather than the series minimum.
    /// Non-finite values are ignored.
    pub fn first_bin(mut self, first_bin: f64) -> Binning {
        if first_bin.is_finite() {
            self.first_bin = Some(first_bin);
        }
        self
    }

    /// Use a fixed bin width. Widths that are not finite and positive are
    /// ignored.
    pub fn width(mut self, width: f64) -> Binning {
        if width.is_finite() && width > 0.0 {
            self.width = Some(width);
        }
        self
    }
}

/// A single histogram bin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bin {
    /// The lower edge, for display.
    pub edge: f64,
    /// Values counted into this bin.
    pub frequency: usize,
}

/// Bins in ascending edge order, keyed by their index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    bins: Vec<Bin>,
}

impl Histogram {
    /// All bins.
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// The bin at `index`.
    pub fn get(&self, index: usize) -> Option<&Bin> {
        self.bins.get(index)
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True if there are no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Total values counted. Values below the first edge are not counted.
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.frequency).sum()
    }
}

/// Bin `values`.
///
/// Each value lands in the bin with the highest edge not above it.
pub fn histogram(values: &[f64], binning: &Binning) -> Result<Histogram, Error> {
    validate(values)?;
    let count = match binning.bins {
        Some(0) => return Err(Error::InsufficientBins),
        Some(n) => n,
        None => number_of_bins(values),
    };
    let width = match binning.width {
        Some(w) => w,
        None => delta(values, Some(count))?,
    };
    let first = binning.first_bin.unwrap_or_else(|| stats::min(values));

    let mut bins: Vec<Bin> = (0..count)
        .map(|i| Bin {
            edge: first + width * i as f64,
            frequency: 0,
        })
        .collect();
    for v in values {
        if let Some(bin) = bins.iter_mut().rev().find(|b| *v >= b.edge) {
            bin.frequency += 1;
        }
    }
    trace!("binned {} values into {} bins of width {}", values.len(), count, width);
    Ok(Histogram { bins: bins })
}
