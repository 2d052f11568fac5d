//! Depth-limited decision tree classifier (Gini impurity)

use crate::error::{PrepError, Result};
use crate::training::{check_target_len, unique_classes, Estimator, TaskType};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node predicting a class label
    Leaf { value: f64, n_samples: usize },
    /// Internal node: rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Binary classification tree grown greedily on Gini gain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    root: Option<TreeNode>,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    n_features: usize,
    classes: Vec<f64>,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new(4)
    }
}

impl DecisionTreeClassifier {
    pub fn new(max_depth: usize) -> Self {
        Self {
            root: None,
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Depth of the fitted tree (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }

    fn class_counts(&self, labels: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for &c in labels {
            counts[c] += 1;
        }
        counts
    }

    fn gini(counts: &[usize], n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
    }

    /// Majority class; ties resolve to the smallest label
    fn leaf_value(&self, counts: &[usize]) -> f64 {
        let mut best = 0;
        for (k, &c) in counts.iter().enumerate() {
            if c > counts[best] {
                best = k;
            }
        }
        self.classes.get(best).copied().unwrap_or(f64::NAN)
    }

    fn build_tree(&self, x: &Array2<f64>, labels: &[usize], indices: &[usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let subset: Vec<usize> = indices.iter().map(|&i| labels[i]).collect();
        let counts = self.class_counts(&subset);
        let leaf = TreeNode::Leaf {
            value: self.leaf_value(&counts),
            n_samples,
        };

        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if n_samples < self.min_samples_split || depth >= self.max_depth || is_pure {
            return leaf;
        }

        let parent_impurity = Self::gini(&counts, n_samples);
        let Some((feature_idx, threshold)) = self.find_best_split(x, labels, indices, parent_impurity) else {
            return leaf;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature_idx]] <= threshold);

        TreeNode::Split {
            feature_idx,
            threshold,
            left: Box::new(self.build_tree(x, labels, &left_indices, depth + 1)),
            right: Box::new(self.build_tree(x, labels, &right_indices, depth + 1)),
            n_samples,
        }
    }

    /// Best (feature, threshold) by Gini gain; earlier features win ties
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        labels: &[usize],
        indices: &[usize],
        parent_impurity: f64,
    ) -> Option<(usize, f64)> {
        let n_classes = self.classes.len();
        let n = indices.len();

        let feature_results: Vec<Option<(usize, f64, f64)>> = (0..x.ncols())
            .into_par_iter()
            .map(|feature_idx| {
                let mut rows: Vec<(f64, usize)> = indices
                    .iter()
                    .map(|&i| (x[[i, feature_idx]], labels[i]))
                    .collect();
                rows.sort_by(|a, b| a.0.total_cmp(&b.0));

                // Sweep thresholds left to right, moving one row at a time
                let mut left_counts = vec![0usize; n_classes];
                let mut right_counts = vec![0usize; n_classes];
                for &(_, c) in &rows {
                    right_counts[c] += 1;
                }

                let mut best: Option<(f64, f64)> = None;
                for split in 1..n {
                    let (value, class) = rows[split - 1];
                    left_counts[class] += 1;
                    right_counts[class] -= 1;

                    let next = rows[split].0;
                    if next <= value {
                        continue;
                    }
                    if split < self.min_samples_leaf || n - split < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (split as f64 * Self::gini(&left_counts, split)
                        + (n - split) as f64 * Self::gini(&right_counts, n - split))
                        / n as f64;
                    let gain = parent_impurity - weighted;
                    if gain > 1e-12 && best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, (value + next) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        let mut best: Option<(usize, f64, f64)> = None;
        for candidate in feature_results.into_iter().flatten() {
            if best.map_or(true, |b| candidate.2 > b.2) {
                best = Some(candidate);
            }
        }
        best.map(|(f, t, _)| (f, t))
    }

    fn predict_row(node: &TreeNode, row: ndarray::ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if row[*feature_idx] <= *threshold {
                    Self::predict_row(left, row)
                } else {
                    Self::predict_row(right, row)
                }
            }
        }
    }
}

impl Estimator for DecisionTreeClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_target_len(x, y)?;
        if x.nrows() == 0 {
            return Err(PrepError::DataError(
                "Cannot grow a tree on zero samples".to_string(),
            ));
        }

        self.classes = unique_classes(y);
        self.n_features = x.ncols();

        let labels: Vec<usize> = y
            .iter()
            .map(|v| self.classes.binary_search_by(|c| c.total_cmp(v)).unwrap_or(0))
            .collect();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build_tree(x, &labels, &indices, 0));

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PrepError::NotFitted {
            adapter: "DecisionTreeClassifier",
        })?;
        if x.ncols() != self.n_features {
            return Err(PrepError::feature_count(self.n_features, x.ncols()));
        }
        Ok(Array1::from_iter(
            x.rows().into_iter().map(|row| Self::predict_row(root, row)),
        ))
    }

    fn task(&self) -> TaskType {
        TaskType::Classification
    }
}
