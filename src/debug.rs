use crate::parse::to_phasor;
use num_complex::Complex64;
use pretty_dtoa::{dtoa, FmtFloatConfig};

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(false)
    .max_significant_digits(9);

// Shortest representation that reads back to the same value.
const EXACT_CONFIG: FmtFloatConfig = FmtFloatConfig::default().add_point_zero(false);

pub fn format_f64(f: f64) -> String {
    dtoa(f, FLOAT_CONFIG)
}

fn format_complex_with(z: &Complex64, config: FmtFloatConfig) -> String {
    format!(
        "{}{}{}j",
        dtoa(z.re, config),
        if z.im.is_sign_negative() { "-" } else { "+" },
        dtoa(z.im.abs(), config)
    )
}

/// Rectangular form `a+bj`, rounded for display.
pub fn format_complex(z: &Complex64) -> String {
    format_complex_with(z, FLOAT_CONFIG)
}

/// Rectangular form `a+bj` without rounding, readable by
/// [`parse_complex`](crate::parse::parse_complex).
pub fn format_rect(z: &Complex64) -> String {
    format_complex_with(z, EXACT_CONFIG)
}

/// Polar form `r∠θ°`.
pub fn format_polar(z: &Complex64) -> String {
    let (r, deg) = to_phasor(*z);
    format!(
        "{}\u{2220}{}\u{00B0}",
        dtoa(r, FLOAT_CONFIG),
        dtoa(deg, FLOAT_CONFIG)
    )
}
