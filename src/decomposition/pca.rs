//! Principal Component Analysis
//!
//! Computes the top-k eigenvectors of the sample covariance matrix using power
//! iteration with deflation, starting each component from a seeded random
//! vector.

use crate::error::{PrepError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const MAX_ITER: usize = 300;
const TOL: f64 = 1e-10;

/// PCA projection onto the leading principal components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pca {
    n_components: usize,
    random_state: u64,
    mean: Option<Array1<f64>>,
    /// One component per row, `(n_components, n_features)`
    components: Option<Array2<f64>>,
    explained_variance: Option<Array1<f64>>,
    explained_variance_ratio: Option<Array1<f64>>,
}

impl Pca {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            random_state: 123,
            mean: None,
            components: None,
            explained_variance: None,
            explained_variance_ratio: None,
        }
    }

    pub fn with_seed(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn components(&self) -> Option<&Array2<f64>> {
        self.components.as_ref()
    }

    /// Variance along each component (eigenvalues of the covariance matrix)
    pub fn explained_variance(&self) -> Option<&Array1<f64>> {
        self.explained_variance.as_ref()
    }

    /// Share of the total variance captured by each component
    pub fn explained_variance_ratio(&self) -> Option<&Array1<f64>> {
        self.explained_variance_ratio.as_ref()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let (n, d) = x.dim();
        if self.n_components == 0 || self.n_components > n.min(d) {
            return Err(PrepError::InvalidParameter {
                name: "n_components".to_string(),
                value: self.n_components.to_string(),
                reason: format!("must be between 1 and min(n_samples, n_features) = {}", n.min(d)),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PrepError::DataError(
                "PCA input contains NaN or infinite values".to_string(),
            ));
        }

        let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
        let centered = x - &mean;
        let cov = centered.t().dot(&centered) / (n as f64 - 1.0).max(1.0);
        let total_variance = cov.diag().sum();

        let (eigenvalues, components) = self.power_iteration(&cov);
        let ratio = if total_variance > 0.0 {
            eigenvalues.mapv(|ev| (ev / total_variance).max(0.0))
        } else {
            Array1::zeros(eigenvalues.len())
        };

        tracing::debug!(
            n_components = self.n_components,
            explained = ratio.sum(),
            "PCA fitted"
        );

        self.mean = Some(mean);
        self.components = Some(components);
        self.explained_variance = Some(eigenvalues);
        self.explained_variance_ratio = Some(ratio);
        Ok(self)
    }

    /// Leading eigenpairs of `cov`, sign-normalised so each component's
    /// largest absolute loading is positive
    fn power_iteration(&self, cov: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
        let d = cov.nrows();
        let k = self.n_components;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);

        let mut work = cov.clone();
        let mut eigenvalues = Array1::zeros(k);
        let mut components = Array2::zeros((k, d));

        for c in 0..k {
            let mut v = Array1::from_shape_fn(d, |_| rng.gen_range(-1.0..1.0));
            orthogonalize(&mut v, &components, c);
            normalize(&mut v);
            let mut eigenvalue = 0.0f64;

            for _ in 0..MAX_ITER {
                let mut w = work.dot(&v);
                eigenvalue = v.dot(&w);
                orthogonalize(&mut w, &components, c);
                if !normalize(&mut w) {
                    // Remaining variance is zero; keep the orthogonal start vector
                    break;
                }
                let diff = (&w - &v).mapv(|e| e * e).sum().sqrt();
                v = w;
                if diff < TOL {
                    break;
                }
            }

            let eigenvalue = eigenvalue.max(0.0);
            let pivot = v
                .iter()
                .copied()
                .fold(0.0f64, |best, e| if e.abs() > best.abs() { e } else { best });
            if pivot < 0.0 {
                v.mapv_inplace(|e| -e);
            }

            // Deflate: A -= λ v vᵀ
            for i in 0..d {
                for j in 0..d {
                    work[[i, j]] -= eigenvalue * v[i] * v[j];
                }
            }
            eigenvalues[c] = eigenvalue;
            components.row_mut(c).assign(&v);
        }

        (eigenvalues, components)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, components) = match (&self.mean, &self.components) {
            (Some(m), Some(c)) => (m, c),
            _ => return Err(PrepError::NotFitted { adapter: "Pca" }),
        };
        if x.ncols() != mean.len() {
            return Err(PrepError::feature_count(mean.len(), x.ncols()));
        }
        Ok((x - mean).dot(&components.t()))
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Remove the projections of `v` onto the first `count` rows of `basis`
fn orthogonalize(v: &mut Array1<f64>, basis: &Array2<f64>, count: usize) {
    for row in basis.outer_iter().take(count) {
        let proj = row.dot(v);
        v.scaled_add(-proj, &row);
    }
}

/// Scale to unit length; false when the vector is (numerically) zero
fn normalize(v: &mut Array1<f64>) -> bool {
    let norm = v.dot(v).sqrt();
    if norm < 1e-12 {
        return false;
    }
    v.mapv_inplace(|e| e / norm);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pca_line_has_one_component() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0], [5.0, 10.0]];
        let mut pca = Pca::new(1);
        let out = pca.fit_transform(&x).unwrap();

        assert_eq!(out.dim(), (5, 1));
        let ratio = pca.explained_variance_ratio().unwrap();
        assert!(ratio[0] > 0.999, "ratio = {}", ratio[0]);

        // Loadings are positive after sign normalisation, so projections increase
        let comp = pca.components().unwrap();
        assert!(comp[[0, 1]] > 0.0);
        assert!(out[[4, 0]] > out[[0, 0]]);
        assert!(out.column(0).sum().abs() < 1e-9);
    }

    #[test]
    fn test_pca_components_orthonormal() {
        let x = array![
            [1.0, 0.0, 0.5],
            [0.0, 1.0, 0.3],
            [1.0, 1.0, 0.8],
            [0.5, 0.5, 0.4],
            [0.2, 0.8, 0.6],
            [0.9, 0.1, 0.2]
        ];
        let mut pca = Pca::new(2);
        pca.fit(&x).unwrap();
        let c = pca.components().unwrap();
        let gram = c.dot(&c.t());
        assert!((gram[[0, 0]] - 1.0).abs() < 1e-6);
        assert!((gram[[1, 1]] - 1.0).abs() < 1e-6);
        assert!(gram[[0, 1]].abs() < 1e-6);

        let ev = pca.explained_variance().unwrap();
        assert!(ev[0] >= ev[1]);
        let total: f64 = pca.explained_variance_ratio().unwrap().sum();
        assert!(total > 0.0 && total <= 1.0 + 1e-9);
    }

    #[test]
    fn test_pca_same_seed_same_result() {
        let x = Array2::from_shape_fn((12, 4), |(i, j)| ((i * (j + 2)) % 7) as f64 + j as f64 * 0.3);
        let a = Pca::new(3).fit_transform(&x).unwrap();
        let b = Pca::new(3).fit_transform(&x).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pca_invalid_n_components() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0]];
        assert!(matches!(Pca::new(0).fit(&x), Err(PrepError::InvalidParameter { .. })));
        assert!(matches!(Pca::new(3).fit(&x), Err(PrepError::InvalidParameter { .. })));
    }

    #[test]
    fn test_pca_transform_checks() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0]];
        let unfitted = Pca::new(1);
        assert!(matches!(unfitted.transform(&x), Err(PrepError::NotFitted { .. })));

        let mut pca = Pca::new(1);
        pca.fit(&x).unwrap();
        assert!(matches!(
            pca.transform(&array![[1.0], [2.0]]),
            Err(PrepError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_pca_rejects_missing_values() {
        let x = array![[1.0, f64::NAN], [3.0, 4.0], [5.0, 7.0]];
        assert!(matches!(Pca::new(1).fit(&x), Err(PrepError::DataError(_))));
    }
}
