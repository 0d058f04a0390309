//! Summary statistics, histograms and log-log fits.

use average::Mean;
use statrs::{
    distribution::{ContinuousCDF, StudentsT},
    statistics::{Data, Median},
};

/// Statistics summary for a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub count: usize,
}

/// Computes min, max, mean and median; `None` when `data` is empty.
pub fn calculate_stats(data: &[f64]) -> Option<Stats> {
    if data.is_empty() {
        return None;
    }

    Some(Stats {
        min: data.iter().copied().fold(f64::INFINITY, f64::min),
        max: data.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean: mean(data),
        median: median(data),
        count: data.len(),
    })
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let m: Mean = v.iter().collect();
    m.mean()
}

/// Median (mean of the two middle values for even lengths); 0.0 for an empty slice.
pub fn median(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    Data::new(v.to_vec()).median()
}

/// Mean and median of a per-bucket count sequence, rounded for labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSummary {
    pub mean: u64,
    pub median: u64,
    pub total: u64,
    pub buckets: usize,
}

pub fn summarize_counts(counts: &[u64]) -> CountSummary {
    let values: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    CountSummary {
        mean: mean(&values).round_ties_even() as u64,
        median: median(&values).round_ties_even() as u64,
        total: counts.iter().sum(),
        buckets: counts.len(),
    }
}

/// Equal-width histogram over `[min, max]`; the last bin is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` edges.
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// `(lo, hi, count)` per bin.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, u64)> + '_ {
        self.edges.windows(2).zip(&self.counts).map(|(e, &c)| (e[0], e[1], c))
    }
}

/// Histogram of the finite entries of `values`. A zero-width range is widened
/// to `[v - 0.5, v + 0.5]`.
pub fn histogram(values: &[f64], bins: usize) -> Histogram {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if bins == 0 || finite.is_empty() {
        return Histogram { edges: Vec::new(), counts: Vec::new() };
    }

    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0u64; bins];
    for v in finite {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Histogram { edges, counts }
}

/// `y = amplitude * x^exponent`, fitted as a straight line in log10 space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLawFit {
    pub exponent: f64,
    pub amplitude: f64,
    /// Pairs that entered the fit.
    pub n: usize,
}

impl PowerLawFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.amplitude * x.powf(self.exponent)
    }
}

/// Least-squares fit on `(log10 x, log10 y)` over pairs with `x >= 1` and `y >= 1`.
/// `None` when fewer than two distinct x values remain.
pub fn fit_power_law(x: &[f64], y: &[f64]) -> Option<PowerLawFit> {
    let (lx, ly) = log_pairs(x, y);
    let (slope, intercept) = linear_fit(&lx, &ly)?;
    Some(PowerLawFit {
        exponent: slope,
        amplitude: 10f64.powf(intercept),
        n: lx.len(),
    })
}

/// Log10 of the pairs where both values are at least one.
pub fn log_pairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter(|(a, b)| **a >= 1.0 && **b >= 1.0)
        .map(|(a, b)| (a.log10(), b.log10()))
        .unzip()
}

/// Ordinary least squares `y = slope * x + intercept`.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);
    let sxx: f64 = x[..n].iter().map(|a| (a - mx).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x[..n].iter().zip(&y[..n]).map(|(a, b)| (a - mx) * (b - my)).sum();
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub rho: f64,
    /// Two-sided, Student's t with n - 2 degrees of freedom.
    pub p_value: f64,
    pub n: usize,
}

/// Ranks starting at 1; tied values share their average rank.
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut out = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            out[k] = rank;
        }
        i = j + 1;
    }
    out
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let mx = mean(x);
    let my = mean(y);
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let sxx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    let syy: f64 = y.iter().map(|b| (b - my).powi(2)).sum();
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Spearman rank correlation; `None` below three pairs or for a constant input.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<Correlation> {
    let n = x.len().min(y.len());
    if n < 3 {
        return None;
    }
    let rho = pearson(&ranks(&x[..n]), &ranks(&y[..n]))?;

    let dof = (n - 2) as f64;
    let p_value = if rho.abs() >= 1.0 {
        0.0
    } else {
        let t = rho * (dof / (1.0 - rho * rho)).sqrt();
        match StudentsT::new(0.0, 1.0, dof) {
            Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
            Err(_) => f64::NAN,
        }
    };

    Some(Correlation { rho, p_value, n })
}
