//! Supervised feature selection adapter

use super::{Adapter, FeatureSelectorConfig, FittedSlot};
use crate::error::{PrepError, Result};
use crate::feature_selection::{Direction, ProbeModel, ScoreFunction, SelectionRule, SequentialSelector, UnivariateSelector};
use crate::training::{DecisionTreeClassifier, KNNClassifier, KNNRegressor, LinearRegression, LogisticRegression};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Depth of the decision tree probe used by the `trees_class` methods
const PROBE_TREE_DEPTH: usize = 4;

/// Threshold rule of a univariate method name (`<rule>_<score>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    Fdr,
    Fpr,
    KBest,
    Percentile,
}

/// Probe model of a sequential method name (`<direction>_<probe>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeKind {
    LinearReg,
    KnnReg,
    KnnClass,
    Logistic,
    TreesClass,
}

/// Selection methods known to [`FeatureSelector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMethod {
    Univariate { rule: RuleKind, score: ScoreFunction },
    Sequential { direction: Direction, probe: ProbeKind },
}

impl Default for SelectionMethod {
    fn default() -> Self {
        SelectionMethod::Univariate {
            rule: RuleKind::Fdr,
            score: ScoreFunction::FRegression,
        }
    }
}

const RULES: [(RuleKind, &str); 4] = [
    (RuleKind::Fdr, "Fdr"),
    (RuleKind::Fpr, "Fpr"),
    (RuleKind::KBest, "KBest"),
    (RuleKind::Percentile, "Percentile"),
];

const SCORES: [(ScoreFunction, &str); 3] = [
    (ScoreFunction::FRegression, "f_reg"),
    (ScoreFunction::FClassif, "f_class"),
    (ScoreFunction::MutualInfoClassif, "mutual_class"),
];

const DIRECTIONS: [(Direction, &str); 2] = [(Direction::Forward, "forward"), (Direction::Backward, "backward")];

const PROBES: [(ProbeKind, &str); 5] = [
    (ProbeKind::LinearReg, "linear_reg"),
    (ProbeKind::KnnReg, "knn_reg"),
    (ProbeKind::KnnClass, "knn_class"),
    (ProbeKind::Logistic, "logistic"),
    (ProbeKind::TreesClass, "trees_class"),
];

fn name_of<T: PartialEq + Copy>(table: &[(T, &'static str)], value: T) -> &'static str {
    table.iter().find(|(v, _)| *v == value).map_or("", |(_, name)| name)
}

fn lookup<T: Copy>(table: &[(T, &'static str)], name: &str) -> Option<T> {
    table.iter().find(|(_, n)| *n == name).map(|(v, _)| *v)
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SelectionMethod::Univariate { rule, score } => {
                write!(f, "{}_{}", name_of(&RULES, rule), name_of(&SCORES, score))
            }
            SelectionMethod::Sequential { direction, probe } => {
                write!(f, "{}_{}", name_of(&DIRECTIONS, direction), name_of(&PROBES, probe))
            }
        }
    }
}

impl FromStr for SelectionMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        let parsed = s.split_once('_').and_then(|(head, tail)| {
            if let Some(rule) = lookup(&RULES, head) {
                let score = lookup(&SCORES, tail)?;
                // Mutual information has no p-values to threshold
                if score == ScoreFunction::MutualInfoClassif && matches!(rule, RuleKind::Fdr | RuleKind::Fpr) {
                    return None;
                }
                Some(SelectionMethod::Univariate { rule, score })
            } else {
                let direction = lookup(&DIRECTIONS, head)?;
                let probe = lookup(&PROBES, tail)?;
                Some(SelectionMethod::Sequential { direction, probe })
            }
        });
        parsed.ok_or_else(|| PrepError::InvalidConfiguration {
            adapter: FeatureSelector::NAME,
            name: s.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedSelector {
    Univariate(UnivariateSelector),
    Sequential(SequentialSelector),
}

impl FittedSelector {
    /// Mask of kept features
    pub fn support(&self) -> Option<&[bool]> {
        match self {
            FittedSelector::Univariate(s) => s.get_support(),
            FittedSelector::Sequential(s) => s.get_support(),
        }
    }

    pub fn selected_indices(&self) -> Vec<usize> {
        match self {
            FittedSelector::Univariate(s) => s.selected_indices(),
            FittedSelector::Sequential(s) => s.selected_indices(),
        }
    }
}

/// Keeps the features most related to the target. Needs `y` at fit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelector {
    config: FeatureSelectorConfig,
    state: FittedSlot<FittedSelector>,
}

impl FeatureSelector {
    pub fn new(config: FeatureSelectorConfig) -> Self {
        let state = FittedSlot::new(config.apply);
        Self { config, state }
    }

    pub fn config(&self) -> &FeatureSelectorConfig {
        &self.config
    }

    pub fn fitted(&self) -> Option<&FittedSelector> {
        self.state.get()
    }

    fn probe(config: &FeatureSelectorConfig, kind: ProbeKind) -> Result<ProbeModel> {
        let n_neighbors = config.n_neighbors;
        if n_neighbors == 0 && matches!(kind, ProbeKind::KnnReg | ProbeKind::KnnClass) {
            return Err(PrepError::invalid_parameter("n_neighbors", 0, "must be at least 1"));
        }
        Ok(match kind {
            ProbeKind::LinearReg => ProbeModel::LinearRegression(LinearRegression::new()),
            ProbeKind::KnnReg => ProbeModel::KnnRegressor(KNNRegressor::with_k(n_neighbors)),
            ProbeKind::KnnClass => ProbeModel::KnnClassifier(KNNClassifier::with_k(n_neighbors)),
            ProbeKind::Logistic => ProbeModel::LogisticRegression(LogisticRegression::new()),
            ProbeKind::TreesClass => ProbeModel::DecisionTree(DecisionTreeClassifier::new(PROBE_TREE_DEPTH)),
        })
    }

    fn build_and_fit(
        config: &FeatureSelectorConfig,
        x: &Array2<f64>,
        y: Option<&Array1<f64>>,
    ) -> Result<FittedSelector> {
        let method: SelectionMethod = config.method.parse()?;
        let y = y.ok_or_else(|| PrepError::InvalidArgument(format!("{} requires a target vector", config.method)))?;

        match method {
            SelectionMethod::Univariate { rule, score } => {
                let rule = match rule {
                    RuleKind::Fdr => SelectionRule::Fdr(config.alpha),
                    RuleKind::Fpr => SelectionRule::Fpr(config.alpha),
                    RuleKind::KBest => SelectionRule::KBest(config.k),
                    RuleKind::Percentile => SelectionRule::Percentile(config.percentile),
                };
                let mut selector = UnivariateSelector::new(score, rule)?;
                selector.fit(x, y)?;
                Ok(FittedSelector::Univariate(selector))
            }
            SelectionMethod::Sequential { direction, probe } => {
                let mut selector = SequentialSelector::new(Self::probe(config, probe)?, direction)
                    .with_cv(config.cv)
                    .with_tol(config.tol)
                    .with_n_jobs(config.n_jobs);
                selector.fit(x, y)?;
                Ok(FittedSelector::Sequential(selector))
            }
        }
    }
}

impl Default for FeatureSelector {
    fn default() -> Self {
        Self::new(FeatureSelectorConfig::default())
    }
}

impl Adapter for FeatureSelector {
    const NAME: &'static str = "FeatureSelector";

    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<&mut Self> {
        let config = &self.config;
        self.state
            .refit(Self::NAME, &config.method, x, || Self::build_and_fit(config, x, y))?;
        if let Some(fitted) = self.state.get() {
            tracing::debug!(
                adapter = Self::NAME,
                selected = fitted.selected_indices().len(),
                n_features = x.ncols(),
                "Features selected"
            );
        }
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.state.apply(Self::NAME, x, |fitted| match fitted {
            FittedSelector::Univariate(s) => s.transform(x),
            FittedSelector::Sequential(s) => s.transform(x),
        })
    }

    fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    fn is_bypassed(&self) -> bool {
        self.state.is_bypass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_all_method_names_parse() {
        let names = [
            "Fdr_f_reg",
            "Fpr_f_reg",
            "KBest_f_reg",
            "Percentile_f_reg",
            "Fdr_f_class",
            "Fpr_f_class",
            "KBest_f_class",
            "Percentile_f_class",
            "KBest_mutual_class",
            "Percentile_mutual_class",
            "forward_linear_reg",
            "backward_linear_reg",
            "forward_knn_reg",
            "backward_knn_reg",
            "forward_knn_class",
            "backward_knn_class",
            "forward_logistic",
            "backward_logistic",
            "forward_trees_class",
            "backward_trees_class",
        ];
        for name in names {
            let method: SelectionMethod = name.parse().unwrap();
            assert_eq!(method.to_string(), name);
        }
    }

    #[test]
    fn test_invalid_method_names() {
        for name in ["Fdr_mutual_class", "KBest", "sideways_logistic", "KBest_chi2", ""] {
            assert!(
                matches!(
                    name.parse::<SelectionMethod>(),
                    Err(PrepError::InvalidConfiguration { adapter: "FeatureSelector", .. })
                ),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_kbest_f_reg() {
        let x = Array2::from_shape_fn((20, 5), |(i, j)| match j {
            0 => i as f64,
            4 => i as f64 * 0.5 + ((i * 7) % 3) as f64,
            _ => ((i * (j + 2)) % 5) as f64,
        });
        let y = Array1::from_shape_fn(20, |i| 3.0 * i as f64);
        let config = FeatureSelectorConfig::new()
            .with_apply(true)
            .with_method_name("KBest_f_reg")
            .with_k(2);
        let mut selector = FeatureSelector::new(config);
        let out = selector.fit_transform(&x, Some(&y)).unwrap();
        assert_eq!(out.ncols(), 2);
        assert_eq!(selector.fitted().unwrap().selected_indices(), vec![0, 4]);
    }

    #[test]
    fn test_sequential_logistic() {
        let x = Array2::from_shape_fn((30, 3), |(i, j)| match j {
            1 => (if i % 2 == 0 { -2.0 } else { 2.0 }) + (i % 5) as f64 * 0.1,
            _ => ((i * (j + 3)) % 7) as f64,
        });
        let y = Array1::from_shape_fn(30, |i| (i % 2) as f64);
        let config = FeatureSelectorConfig::new()
            .with_apply(true)
            .with_method_name("forward_logistic");
        let mut selector = FeatureSelector::new(config);
        selector.fit(&x, Some(&y)).unwrap();
        assert_eq!(selector.fitted().unwrap().selected_indices(), vec![1]);
    }

    #[test]
    fn test_missing_target() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 0.0]];
        let mut selector = FeatureSelector::new(FeatureSelectorConfig::new().with_apply(true));
        assert!(matches!(selector.fit(&x, None), Err(PrepError::InvalidArgument(_))));
        assert!(!selector.is_fitted());
    }

    #[test]
    fn test_target_length_mismatch() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 0.0]];
        let y = array![1.0, 2.0];
        let mut selector = FeatureSelector::new(FeatureSelectorConfig::new().with_apply(true));
        assert!(matches!(selector.fit(&x, Some(&y)), Err(PrepError::InvalidArgument(_))));
    }

    #[test]
    fn test_bypass_ignores_missing_target() {
        let x = array![[1.0, 2.0]];
        let mut selector = FeatureSelector::default();
        assert_eq!(selector.fit_transform(&x, None).unwrap(), x);
    }
}
