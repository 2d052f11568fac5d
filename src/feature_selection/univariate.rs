//! Univariate feature selection: score every feature, keep those passing a rule

use crate::error::{PrepError, Result};
use crate::feature_selection::{check_target, scores, take_columns};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Scoring function used by [`UnivariateSelector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreFunction {
    /// [`scores::f_regression`]
    FRegression,
    /// [`scores::f_classif`]
    FClassif,
    /// [`scores::mutual_info_classif`]
    MutualInfoClassif,
}

impl ScoreFunction {
    /// Whether the function produces p-values
    pub fn has_pvalues(&self) -> bool {
        !matches!(self, ScoreFunction::MutualInfoClassif)
    }

    fn compute(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(Array1<f64>, Option<Array1<f64>>)> {
        match self {
            ScoreFunction::FRegression => scores::f_regression(x, y).map(|(f, p)| (f, Some(p))),
            ScoreFunction::FClassif => scores::f_classif(x, y).map(|(f, p)| (f, Some(p))),
            ScoreFunction::MutualInfoClassif => scores::mutual_info_classif(x, y).map(|s| (s, None)),
        }
    }
}

/// Rule turning scores (or p-values) into a feature mask
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SelectionRule {
    /// Keep the `k` highest scores
    KBest(usize),
    /// Keep the top `percentile` percent of scores
    Percentile(f64),
    /// Keep features with p-value below `alpha`
    Fpr(f64),
    /// Benjamini-Hochberg false discovery rate control at `alpha`
    Fdr(f64),
}

impl SelectionRule {
    pub fn needs_pvalues(&self) -> bool {
        matches!(self, SelectionRule::Fpr(_) | SelectionRule::Fdr(_))
    }

    fn validate(&self, n_features: usize) -> Result<()> {
        let invalid = |name: &str, value: String, reason: &str| PrepError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        };
        match *self {
            SelectionRule::KBest(k) if k > n_features => Err(invalid(
                "k",
                k.to_string(),
                &format!("cannot exceed the number of features ({})", n_features),
            )),
            SelectionRule::Percentile(p) if !(0.0..=100.0).contains(&p) => {
                Err(invalid("percentile", p.to_string(), "must be within [0, 100]"))
            }
            SelectionRule::Fpr(a) | SelectionRule::Fdr(a) if !(0.0..=1.0).contains(&a) => {
                Err(invalid("alpha", a.to_string(), "must be within [0, 1]"))
            }
            _ => Ok(()),
        }
    }

    /// Feature mask for the given scores and p-values
    fn support(&self, scores: &Array1<f64>, pvalues: Option<&Array1<f64>>) -> Result<Vec<bool>> {
        let n_features = scores.len();
        let scores = clean_nans(scores);

        match *self {
            SelectionRule::KBest(k) => {
                let mut mask = vec![false; n_features];
                if k == n_features {
                    return Ok(vec![true; n_features]);
                }
                let mut order: Vec<usize> = (0..n_features).collect();
                // Stable ascending sort; the last k win, so later features win ties
                order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
                for &j in &order[n_features - k..] {
                    mask[j] = true;
                }
                Ok(mask)
            }
            SelectionRule::Percentile(p) => {
                if p >= 100.0 {
                    return Ok(vec![true; n_features]);
                }
                if p <= 0.0 || n_features == 0 {
                    return Ok(vec![false; n_features]);
                }
                let mut sorted = scores.clone();
                sorted.sort_by(f64::total_cmp);
                let threshold = percentile(&sorted, 100.0 - p);

                let mut mask: Vec<bool> = scores.iter().map(|&s| s > threshold).collect();
                // Admit tied features only up to the percentile budget
                let max_features = (n_features as f64 * p / 100.0) as usize;
                let mut n_selected = mask.iter().filter(|&&m| m).count();
                for (j, &s) in scores.iter().enumerate() {
                    if s == threshold && n_selected < max_features {
                        mask[j] = true;
                        n_selected += 1;
                    }
                }
                Ok(mask)
            }
            SelectionRule::Fpr(alpha) => {
                let pvalues = require_pvalues(pvalues)?;
                Ok(pvalues.iter().map(|&p| p < alpha).collect())
            }
            SelectionRule::Fdr(alpha) => {
                let pvalues = require_pvalues(pvalues)?;
                let mut sorted: Vec<f64> = pvalues.iter().map(|&p| if p.is_nan() { 1.0 } else { p }).collect();
                sorted.sort_by(f64::total_cmp);

                let cutoff = sorted
                    .iter()
                    .enumerate()
                    .filter(|(i, &p)| p <= alpha / n_features as f64 * (*i + 1) as f64)
                    .map(|(_, &p)| p)
                    .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))));

                Ok(match cutoff {
                    Some(c) => pvalues.iter().map(|&p| p <= c).collect(),
                    None => vec![false; n_features],
                })
            }
        }
    }
}

fn require_pvalues(pvalues: Option<&Array1<f64>>) -> Result<&Array1<f64>> {
    pvalues.ok_or_else(|| {
        PrepError::InvalidArgument("Selection rule needs p-values the score function does not produce".to_string())
    })
}

/// NaN scores rank below every real score
fn clean_nans(scores: &Array1<f64>) -> Vec<f64> {
    scores.iter().map(|&s| if s.is_nan() { f64::MIN } else { s }).collect()
}

/// Linear-interpolated percentile of sorted values
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Selects features by a univariate score and a [`SelectionRule`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnivariateSelector {
    score_func: ScoreFunction,
    rule: SelectionRule,
    /// NaN for features the score function cannot rate (e.g. constant)
    #[serde(with = "crate::utils::nan_array")]
    scores: Option<Array1<f64>>,
    #[serde(with = "crate::utils::nan_array")]
    pvalues: Option<Array1<f64>>,
    support: Option<Vec<bool>>,
}

impl UnivariateSelector {
    /// Fails with `InvalidArgument` when the rule needs p-values the score
    /// function cannot provide.
    pub fn new(score_func: ScoreFunction, rule: SelectionRule) -> Result<Self> {
        if rule.needs_pvalues() && !score_func.has_pvalues() {
            return Err(PrepError::InvalidArgument(format!(
                "{:?} produces no p-values for {:?}",
                score_func, rule
            )));
        }
        Ok(Self {
            score_func,
            rule,
            scores: None,
            pvalues: None,
            support: None,
        })
    }

    pub fn score_func(&self) -> ScoreFunction {
        self.score_func
    }

    pub fn rule(&self) -> SelectionRule {
        self.rule
    }

    pub fn scores(&self) -> Option<&Array1<f64>> {
        self.scores.as_ref()
    }

    pub fn pvalues(&self) -> Option<&Array1<f64>> {
        self.pvalues.as_ref()
    }

    /// Mask of kept features
    pub fn get_support(&self) -> Option<&[bool]> {
        self.support.as_deref()
    }

    /// Indices of kept features, ascending
    pub fn selected_indices(&self) -> Vec<usize> {
        self.support
            .as_ref()
            .map(|s| s.iter().enumerate().filter(|(_, &m)| m).map(|(i, _)| i).collect())
            .unwrap_or_default()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_target(x, y)?;
        self.rule.validate(x.ncols())?;

        let (scores, pvalues) = self.score_func.compute(x, y)?;
        let support = self.rule.support(&scores, pvalues.as_ref())?;

        self.scores = Some(scores);
        self.pvalues = pvalues;
        self.support = Some(support);
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let support = self.support.as_ref().ok_or(PrepError::NotFitted {
            adapter: "UnivariateSelector",
        })?;
        take_columns(x, support)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Array2<f64>> {
        self.fit(x, y)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn support(rule: SelectionRule, scores: &[f64], pvalues: Option<&[f64]>) -> Vec<bool> {
        let scores = Array1::from_vec(scores.to_vec());
        let pvalues = pvalues.map(|p| Array1::from_vec(p.to_vec()));
        rule.support(&scores, pvalues.as_ref()).unwrap()
    }

    #[test]
    fn test_kbest_keeps_highest() {
        let mask = support(SelectionRule::KBest(2), &[1.0, 5.0, 3.0, 0.5], None);
        assert_eq!(mask, vec![false, true, true, false]);
    }

    #[test]
    fn test_kbest_nan_ranks_last() {
        let mask = support(SelectionRule::KBest(1), &[f64::NAN, -10.0], None);
        assert_eq!(mask, vec![false, true]);
    }

    #[test]
    fn test_percentile_trims_ties() {
        let mask = support(SelectionRule::Percentile(50.0), &[1.0, 1.0, 1.0, 1.0], None);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 2);

        let mask = support(SelectionRule::Percentile(50.0), &[4.0, 1.0, 3.0, 2.0], None);
        assert_eq!(mask, vec![true, false, true, false]);
    }

    #[test]
    fn test_fpr() {
        let mask = support(SelectionRule::Fpr(0.05), &[0.0; 3], Some(&[0.01, 0.05, 0.2]));
        assert_eq!(mask, vec![true, false, false]);
    }

    #[test]
    fn test_fdr_benjamini_hochberg() {
        // Thresholds for 4 features at alpha 0.05: 0.0125, 0.025, 0.0375, 0.05
        let p = [0.001, 0.03, 0.02, 0.9];
        let mask = support(SelectionRule::Fdr(0.05), &[0.0; 4], Some(&p));
        assert_eq!(mask, vec![true, true, true, false]);

        let none = support(SelectionRule::Fdr(0.05), &[0.0; 2], Some(&[0.5, 0.6]));
        assert_eq!(none, vec![false, false]);
    }

    #[test]
    fn test_kbest_f_regression_selector() {
        let x = Array2::from_shape_fn((20, 5), |(i, j)| {
            let t = i as f64;
            match j {
                1 => 2.0 * t,
                3 => t + ((i * 13) % 7) as f64,
                _ => ((i * (j + 3)) % 5) as f64,
            }
        });
        let y = Array1::from_shape_fn(20, |i| i as f64);

        let mut selector = UnivariateSelector::new(ScoreFunction::FRegression, SelectionRule::KBest(2)).unwrap();
        let out = selector.fit_transform(&x, &y).unwrap();
        assert_eq!(selector.selected_indices(), vec![1, 3]);
        assert_eq!(out.ncols(), 2);
        assert_eq!(out.column(0), x.column(1));
    }

    #[test]
    fn test_k_larger_than_features() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0]];
        let y = array![1.0, 2.0, 3.0];
        let mut selector = UnivariateSelector::new(ScoreFunction::FRegression, SelectionRule::KBest(5)).unwrap();
        assert!(matches!(selector.fit(&x, &y), Err(PrepError::InvalidParameter { .. })));
    }

    #[test]
    fn test_mutual_info_rejects_pvalue_rules() {
        assert!(UnivariateSelector::new(ScoreFunction::MutualInfoClassif, SelectionRule::Fdr(0.05)).is_err());
    }
}
