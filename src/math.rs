use num_complex::Complex64;

pub const J: Complex64 = Complex64 { re: 0.0, im: 1.0 };

#[macro_export]
macro_rules! cmplx {
    () => {
        num_complex::Complex64::new(0.0, 0.0)
    };
    ($arg1:expr) => {
        num_complex::Complex64::new($arg1, 0.0)
    };
    ($arg1:expr, $arg2:expr) => {
        num_complex::Complex64::new($arg1, $arg2)
    };
}

/// Computes the infinity norm: `max(abs(a))`.
///
/// Returns NaN if any element is NaN, so that a non-finite mismatch never
/// passes a `norm_inf(f) < tol` test.
pub fn norm_inf(a: &[f64]) -> f64 {
    let mut max = 0.0_f64;
    for v in a {
        if v.is_nan() {
            return f64::NAN;
        }
        max = max.max(v.abs());
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_inf() {
        assert_eq!(norm_inf(&[]), 0.0);
        assert_eq!(norm_inf(&[0.5, -2.0, 1.0]), 2.0);
        assert!(norm_inf(&[1.0, f64::NAN]).is_nan());
        assert!(!(norm_inf(&[f64::NAN]) < 1e-6));
    }

    #[test]
    fn test_cmplx() {
        assert_eq!(cmplx!(), Complex64::new(0.0, 0.0));
        assert_eq!(cmplx!(2.0), Complex64::new(2.0, 0.0));
        assert_eq!(cmplx!(2.0, -1.0) * J, Complex64::new(1.0, 2.0));
    }
}
