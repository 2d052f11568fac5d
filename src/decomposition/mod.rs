//! Linear dimensionality reduction

mod pca;

pub use pca::Pca;
