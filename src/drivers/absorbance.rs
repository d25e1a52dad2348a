use ndarray::{Array1, Zip};
use crate::drivers::SpectroError;
/// Elementwise `log10(reference / current)`.
///
/// Zero or negative samples are not rejected: they come out as `NaN` or
/// `±inf` and are counted in the returned warning log.
pub fn absorbance(
    reference: &Array1<f64>,
    current: &Array1<f64>,
) -> Result<Array1<f64>, SpectroError> {
    if reference.len() != current.len() {
        return Err(SpectroError::LengthMismatch {
            expected: reference.len(),
            actual: current.len(),
        });
    }
    let out = Zip::from(reference)
        .and(current)
        .map_collect(|&r, &c| (r / c).log10());
    let bad = count_non_finite(&out);
    if bad > 0 {
        log::warn!("absorbance has {bad} non-finite points (zero or negative counts)");
    }
    Ok(out)
}
pub fn count_non_finite(curve: &Array1<f64>) -> usize {
    curve.iter().filter(|v| !v.is_finite()).count()
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    #[test]
    fn equal_curves_give_zero() {
        let r = array![10.0, 250.0, 4000.0];
        let a = absorbance(&r, &r.clone()).unwrap();
        assert!(a.iter().all(|v| v.abs() < 1e-12));
    }
    #[test]
    fn factor_of_ten_is_one_absorbance_unit() {
        let a = absorbance(&array![100.0, 1000.0], &array![10.0, 1.0]).unwrap();
        assert!((a[0] - 1.0).abs() < 1e-12);
        assert!((a[1] - 3.0).abs() < 1e-12);
    }
    #[test]
    fn non_positive_samples_propagate_as_non_finite() {
        let a = absorbance(&array![1.0, 1.0, -1.0], &array![0.0, 1.0, 1.0]).unwrap();
        assert!(a[0].is_infinite());
        assert!(a[2].is_nan());
        assert_eq!(count_non_finite(&a), 2);
    }
    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(matches!(
            absorbance(&array![1.0], &array![1.0, 2.0]),
            Err(SpectroError::LengthMismatch { expected: 1, actual: 2 })
        ));
    }
}
