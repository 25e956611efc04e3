//! Statistics shared by the selection algorithms

use std::collections::HashMap;

/// Equal-width binning; NaN gets its own bin (`bins`)
pub fn discretize(values: &[f64], bins: usize) -> Vec<u32> {
    let bins = bins.max(1);
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return bins as u32;
            }
            if max <= min {
                return 0;
            }
            let bin = ((v - min) / (max - min) * bins as f64) as usize;
            bin.min(bins - 1) as u32
        })
        .collect()
}

/// Labels for a target: categorical when it has at most `bins` distinct values
pub fn discretize_target(values: &[f64], bins: usize) -> Vec<u32> {
    let mut distinct: Vec<u64> = values.iter().map(|v| v.to_bits()).collect();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() > bins {
        return discretize(values, bins);
    }
    values
        .iter()
        .map(|v| distinct.binary_search(&v.to_bits()).unwrap_or(0) as u32)
        .collect()
}

/// Mutual information (nats) between two discrete variables
pub fn mutual_information(x: &[u32], y: &[u32]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }

    let mut joint: HashMap<(u32, u32), usize> = HashMap::new();
    let mut px: HashMap<u32, usize> = HashMap::new();
    let mut py: HashMap<u32, usize> = HashMap::new();
    for i in 0..n {
        *joint.entry((x[i], y[i])).or_insert(0) += 1;
        *px.entry(x[i]).or_insert(0) += 1;
        *py.entry(y[i]).or_insert(0) += 1;
    }

    let n = n as f64;
    joint
        .iter()
        .map(|(&(a, b), &count)| {
            let pxy = count as f64 / n;
            let pa = px[&a] as f64 / n;
            let pb = py[&b] as f64 / n;
            pxy * (pxy / (pa * pb)).ln()
        })
        .sum::<f64>()
        .max(0.0)
}

/// Population variance over finite values; 0 when fewer than two
pub fn variance(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return 0.0;
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / finite.len() as f64
}

/// Pearson correlation over rows where both values are finite; 0 if undefined
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .collect();
    if pairs.len() < 2 {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        cov += (a - mx) * (b - my);
        vx += (a - mx).powi(2);
        vy += (b - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return 0.0;
    }
    cov / (vx.sqrt() * vy.sqrt())
}
