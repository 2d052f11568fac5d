//! Array helpers shared across the estimators

use ndarray::Array2;

/// Copy of the sub-matrix at the given rows and columns, in the given order.
/// Either index list may be empty.
pub(crate) fn submatrix(x: &Array2<f64>, rows: &[usize], cols: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), cols.len()), |(i, j)| x[[rows[i], cols[j]]])
}

/// All rows, selected columns
pub(crate) fn take_columns(x: &Array2<f64>, cols: &[usize]) -> Array2<f64> {
    let rows: Vec<usize> = (0..x.nrows()).collect();
    submatrix(x, &rows, cols)
}

/// Selected rows, all columns
pub(crate) fn take_rows(x: &Array2<f64>, rows: &[usize]) -> Array2<f64> {
    let cols: Vec<usize> = (0..x.ncols()).collect();
    submatrix(x, rows, &cols)
}

/// Indices where the mask is set
pub(crate) fn mask_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|(_, &keep)| keep)
        .map(|(i, _)| i)
        .collect()
}

/// Serde adapter for owned `f64` arrays that may hold NaN.
///
/// JSON has no NaN literal, so values are written as `null` and read back as
/// NaN. Use with `#[serde(with = "crate::utils::nan_array")]` on
/// `Option<Array<f64, D>>` fields.
pub(crate) mod nan_array {
    use ndarray::{Array, ArrayD, Dimension, IxDyn};
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Repr {
        shape: Vec<usize>,
        data: Vec<Option<f64>>,
    }

    pub(crate) fn serialize<D, S>(array: &Option<Array<f64, D>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        D: Dimension,
        S: Serializer,
    {
        array
            .as_ref()
            .map(|a| Repr {
                shape: a.shape().to_vec(),
                data: a.iter().map(|&v| if v.is_nan() { None } else { Some(v) }).collect(),
            })
            .serialize(serializer)
    }

    pub(crate) fn deserialize<'de, D, De>(deserializer: De) -> Result<Option<Array<f64, D>>, De::Error>
    where
        D: Dimension,
        De: Deserializer<'de>,
    {
        Option::<Repr>::deserialize(deserializer)?
            .map(|repr| {
                let data = repr.data.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                ArrayD::from_shape_vec(IxDyn(&repr.shape), data)
                    .and_then(|a| a.into_dimensionality::<D>())
                    .map_err(De::Error::custom)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Holder {
        #[serde(with = "nan_array")]
        values: Option<Array2<f64>>,
    }

    #[test]
    fn test_nan_array_json() {
        let holder = Holder {
            values: Some(array![[1.0, f64::NAN], [3.0, 4.5]]),
        };
        let json = serde_json::to_string(&holder).unwrap();
        let back: Holder = serde_json::from_str(&json).unwrap();
        let values = back.values.unwrap();
        assert_eq!(values.dim(), (2, 2));
        assert!(values[[0, 1]].is_nan());
        assert_eq!(values[[1, 1]], 4.5);

        let empty: Holder = serde_json::from_str(r#"{"values": null}"#).unwrap();
        assert!(empty.values.is_none());
    }

    #[test]
    fn test_submatrix() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        assert_eq!(submatrix(&x, &[2, 0], &[1]), array![[8.0], [2.0]]);
        assert_eq!(take_columns(&x, &[]).dim(), (3, 0));
        assert_eq!(take_rows(&x, &[1]), array![[4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_mask_indices() {
        assert_eq!(mask_indices(&[true, false, true]), vec![0, 2]);
    }
}
