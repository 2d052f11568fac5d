//! Univariate scoring functions
//!
//! Each function scores every feature of `x` against the target `y`
//! independently.

use crate::error::{PrepError, Result};
use crate::training::{check_target_len, unique_classes};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use statrs::function::gamma::digamma;

/// Neighbours used by the mutual information estimator
const MI_NEIGHBORS: usize = 3;

/// Survival function of F(d1, d2), with the infinite/NaN statistic handled
fn f_pvalue(dist: &FisherSnedecor, f: f64) -> f64 {
    if f.is_nan() {
        f64::NAN
    } else if f.is_infinite() {
        0.0
    } else {
        dist.sf(f)
    }
}

fn f_distribution(d1: f64, d2: f64) -> Result<FisherSnedecor> {
    FisherSnedecor::new(d1, d2).map_err(|e| {
        PrepError::DataError(format!(
            "F distribution with ({}, {}) degrees of freedom: {}",
            d1, d2, e
        ))
    })
}

/// Pearson correlation of every column of `x` with `y`.
/// Constant columns (or a constant target) give 0.
pub fn r_regression(x: &Array2<f64>, y: &Array1<f64>) -> Array1<f64> {
    let n = y.len() as f64;
    let y_mean = y.sum() / n;
    let y_centered = y.mapv(|v| v - y_mean);
    let y_norm = y_centered.dot(&y_centered).sqrt();

    Array1::from_iter(x.columns().into_iter().map(|col| {
        let col_mean = col.sum() / n;
        let centered = col.mapv(|v| v - col_mean);
        let r = centered.dot(&y_centered) / (centered.dot(&centered).sqrt() * y_norm);
        if r.is_finite() {
            r
        } else {
            0.0
        }
    }))
}

/// Univariate linear regression F-test.
///
/// `F = r² / (1 - r²) · (n - 2)` with p-values from `F(1, n - 2)`. A perfectly
/// correlated feature gets `F = f64::MAX` and `p = 0`.
pub fn f_regression(x: &Array2<f64>, y: &Array1<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
    check_target_len(x, y)?;
    let deg_of_freedom = y.len() as f64 - 2.0;
    if deg_of_freedom < 1.0 {
        return Err(PrepError::DataError(format!(
            "f_regression needs at least 3 samples, got {}",
            y.len()
        )));
    }

    let corr = r_regression(x, y);
    let f_dist = f_distribution(1.0, deg_of_freedom)?;

    let mut f_statistic = Array1::zeros(corr.len());
    let mut p_values = Array1::zeros(corr.len());
    for (i, &r) in corr.iter().enumerate() {
        let r2 = r * r;
        let f = r2 / (1.0 - r2) * deg_of_freedom;
        if f.is_infinite() {
            f_statistic[i] = f64::MAX;
            p_values[i] = 0.0;
        } else if f.is_nan() {
            f_statistic[i] = 0.0;
            p_values[i] = 1.0;
        } else {
            f_statistic[i] = f;
            p_values[i] = f_pvalue(&f_dist, f);
        }
    }

    Ok((f_statistic, p_values))
}

/// One-way ANOVA F-test of every feature against class labels.
///
/// p-values come from `F(k - 1, n - k)` for `k` classes. Constant features
/// yield NaN scores.
pub fn f_classif(x: &Array2<f64>, y: &Array1<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
    check_target_len(x, y)?;
    let classes = unique_classes(y);
    let n = y.len();
    let k = classes.len();
    if k < 2 || n <= k {
        return Err(PrepError::DataError(format!(
            "f_classif needs at least 2 classes and more samples than classes, got {} classes for {} samples",
            k, n
        )));
    }

    let labels: Vec<usize> = y
        .iter()
        .map(|v| classes.binary_search_by(|c| c.total_cmp(v)).unwrap_or(0))
        .collect();
    let mut class_sizes = vec![0usize; k];
    for &l in &labels {
        class_sizes[l] += 1;
    }

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    let f_dist = f_distribution(df_between, df_within)?;

    let mut f_statistic = Array1::zeros(x.ncols());
    let mut p_values = Array1::zeros(x.ncols());
    for (j, col) in x.columns().into_iter().enumerate() {
        let mut class_sums = vec![0.0f64; k];
        let mut total = 0.0;
        let mut total_sq = 0.0;
        for (&v, &l) in col.iter().zip(labels.iter()) {
            class_sums[l] += v;
            total += v;
            total_sq += v * v;
        }

        let correction = total * total / n as f64;
        let ss_total = total_sq - correction;
        let ss_between = class_sums
            .iter()
            .zip(class_sizes.iter())
            .map(|(s, &c)| s * s / c as f64)
            .sum::<f64>()
            - correction;
        let ss_within = ss_total - ss_between;

        let f = (ss_between / df_between) / (ss_within / df_within);
        f_statistic[j] = f;
        p_values[j] = f_pvalue(&f_dist, f);
    }

    Ok((f_statistic, p_values))
}

/// Largest representable value strictly below `r` (for `r > 0`)
fn next_down(r: f64) -> f64 {
    if r > 0.0 && r.is_finite() {
        f64::from_bits(r.to_bits() - 1)
    } else {
        r
    }
}

/// Mutual information between one continuous feature and discrete labels,
/// estimated from nearest-neighbour counts.
fn mi_continuous_discrete(c: ArrayView1<f64>, labels: &[usize], n_classes: usize) -> f64 {
    let n = c.len();
    let mut class_members: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &l) in labels.iter().enumerate() {
        class_members[l].push(i);
    }

    let mut radius = vec![0.0f64; n];
    let mut k_all = vec![0usize; n];
    let mut label_counts = vec![0usize; n];

    for members in &class_members {
        let count = members.len();
        if count < 2 {
            continue;
        }
        let k = MI_NEIGHBORS.min(count - 1);
        for &i in members {
            let mut distances: Vec<f64> = members
                .iter()
                .filter(|&&m| m != i)
                .map(|&m| (c[m] - c[i]).abs())
                .collect();
            distances.sort_by(f64::total_cmp);
            radius[i] = next_down(distances[k - 1]);
            k_all[i] = k;
            label_counts[i] = count;
        }
    }

    // Samples alone in their class carry no information
    let kept: Vec<usize> = (0..n).filter(|&i| label_counts[i] > 1).collect();
    if kept.is_empty() {
        return 0.0;
    }
    let n_kept = kept.len() as f64;

    let mut sum_k = 0.0;
    let mut sum_label = 0.0;
    let mut sum_m = 0.0;
    for &i in &kept {
        let m = kept
            .iter()
            .filter(|&&j| (c[j] - c[i]).abs() <= radius[i])
            .count();
        sum_k += digamma(k_all[i] as f64);
        sum_label += digamma(label_counts[i] as f64);
        sum_m += digamma(m as f64);
    }

    let mi = digamma(n_kept) + sum_k / n_kept - sum_label / n_kept - sum_m / n_kept;
    mi.max(0.0)
}

/// Mutual information of every feature with a discrete target, using the
/// k-nearest-neighbour estimator with 3 neighbours. Scores are non-negative;
/// there are no p-values.
pub fn mutual_info_classif(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
    check_target_len(x, y)?;
    let classes = unique_classes(y);
    let labels: Vec<usize> = y
        .iter()
        .map(|v| classes.binary_search_by(|c| c.total_cmp(v)).unwrap_or(0))
        .collect();

    let scores: Vec<f64> = (0..x.ncols())
        .into_par_iter()
        .map(|j| mi_continuous_discrete(x.column(j), &labels, classes.len()))
        .collect();

    Ok(Array1::from_vec(scores))
}
