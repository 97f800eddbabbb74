//! Spearman rank correlation between two rankings.
//!
//! # Overview
//!
//! Used to validate convergence and consistency across runs: agreement
//! between two independently scored snapshots of one collection, agreement
//! between a model-predicted ranking and a human-derived one, and rank
//! drift between the checkpoints of a single session.
//!
//! # Algorithm
//!
//! Both rankings must come from the same method (descending stable sort by
//! score, 0-based positions; see [`ranking`]). The statistic is computed
//! over the intersection of the two id domains; positions are re-ranked
//! within the intersection, so comparing a ranking with itself yields
//! exactly `1.0` no matter which ids the other side is missing. With
//! distinct ranks the coefficient reduces to
//!
//! ```text
//! rho = 1 - 6 * sum(d^2) / (n * (n^2 - 1))
//! ```
//!
//! Significance is the two-sided p-value of the Student-t transform
//! `t = rho * sqrt((n - 2) / (1 - rho^2))` with `n - 2` degrees of freedom,
//! evaluated through the regularized incomplete beta function. No crate in
//! this workspace's orbit ships these, so they are implemented here.

use std::collections::HashMap;

use faceoff_core::store::RecordStore;
use serde::Serialize;

/// One rank-correlation result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    /// Spearman's rho, in `[-1, 1]`.
    pub coefficient: f64,
    /// Two-sided significance of the coefficient.
    pub p_value: f64,
    /// Size of the id-domain intersection the statistic was computed over.
    pub n: usize,
}

/// Rank a store: descending stable sort by score, 0-based positions.
#[must_use]
pub fn ranking(store: &RecordStore) -> HashMap<String, usize> {
    let mut records: Vec<(&str, f64)> = store
        .records()
        .iter()
        .map(|r| (r.id.as_str(), r.score))
        .collect();
    // Stable on the prior store order, same as RecordStore::sort.
    records.sort_by(|a, b| b.1.total_cmp(&a.1));
    records
        .into_iter()
        .enumerate()
        .map(|(position, (id, _))| (id.to_string(), position))
        .collect()
}

/// Correlate two rankings over the intersection of their id domains.
///
/// Returns `None` when fewer than two ids are shared (no statistic exists).
#[must_use]
pub fn spearman(
    ranking_a: &HashMap<String, usize>,
    ranking_b: &HashMap<String, usize>,
) -> Option<Correlation> {
    let mut common: Vec<&String> = ranking_a
        .keys()
        .filter(|id| ranking_b.contains_key(*id))
        .collect();
    common.sort();

    let n = common.len();
    if n < 2 {
        return None;
    }

    let positions_a: Vec<usize> = common.iter().map(|id| ranking_a[*id]).collect();
    let positions_b: Vec<usize> = common.iter().map(|id| ranking_b[*id]).collect();
    let ranks_a = dense_ranks(&positions_a);
    let ranks_b = dense_ranks(&positions_b);

    let d_squared: f64 = ranks_a
        .iter()
        .zip(&ranks_b)
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let n_f64 = n as f64;
    let coefficient = 1.0 - 6.0 * d_squared / (n_f64 * (n_f64 * n_f64 - 1.0));

    Some(Correlation {
        coefficient,
        p_value: p_value(coefficient, n),
        n,
    })
}

/// Re-rank a vector of distinct positions to `0..n-1`, preserving order.
fn dense_ranks(positions: &[usize]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..positions.len()).collect();
    order.sort_unstable_by_key(|&i| positions[i]);

    let mut ranks = vec![0.0; positions.len()];
    for (rank, &i) in order.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let rank_f64 = rank as f64;
        ranks[i] = rank_f64;
    }
    ranks
}

/// Two-sided p-value for Spearman's rho at sample size `n`.
fn p_value(rho: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if rho.abs() >= 1.0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let df = (n - 2) as f64;
    let t = rho * (df / (1.0 - rho * rho)).sqrt();
    // P(|T| > t) for Student-t collapses to one incomplete beta evaluation.
    regularized_beta(df / 2.0, 0.5, df / (df + t * t))
}

/// Regularized incomplete beta function `I_x(a, b)`.
///
/// Continued-fraction evaluation; converges in well under the iteration cap
/// for every (a, b, x) the p-value transform can produce.
fn regularized_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // Use the symmetry I_x(a,b) = 1 - I_{1-x}(b,a) where the continued
    // fraction converges fastest.
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: usize = 200;
    const EPSILON: f64 = 3.0e-14;
    const TINY: f64 = 1.0e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        #[allow(clippy::cast_precision_loss)]
        let m_f64 = m as f64;
        let m2 = 2.0 * m_f64;

        let even = m_f64 * (b - m_f64) * x / ((qam + m2) * (a + m2));
        d = 1.0 + even * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + even / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let odd = -(a + m_f64) * (qab + m_f64) * x / ((a + m2) * (qap + m2));
        d = 1.0 + odd * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + odd / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }
    h
}

/// Lanczos approximation of `ln(Gamma(x))` for `x > 0`.
fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_9e-2,
        -0.539_523_938_495_3e-5,
    ];

    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut y = x;
    let mut series = 1.000_000_000_190_015;
    for coefficient in COEFFICIENTS {
        y += 1.0;
        series += coefficient / y;
    }
    -tmp + (2.506_628_274_631_000_5 * series / x).ln()
}
