use crate::error::{PowerFlowError, Result};
use num_complex::Complex64;
use std::str::FromStr;

/// Notation a complex value was written in.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Notation {
    /// `a+bj`, `a`, `bj`
    Rectangular,
    /// `magnitude<angle` with the angle in degrees
    Polar,
}

/// Outcome of a single parse stage: a value, or the reason the stage
/// rejected the text.
pub type Attempt = std::result::Result<Complex64, String>;

/// Parses an impedance, voltage or power entered as text.
///
/// The rectangular form is tried first and the polar form second. Blanks
/// anywhere in the text are ignored, as is one pair of enclosing
/// parentheses.
pub fn parse_complex(text: &str) -> Result<Complex64> {
    parse_complex_tagged(text).map(|(z, _)| z)
}

/// As [`parse_complex`] but also reports which notation matched.
pub fn parse_complex_tagged(text: &str) -> Result<(Complex64, Notation)> {
    let s = normalize(text);
    if s.is_empty() {
        return Err(PowerFlowError::format(text, "empty input"));
    }

    let rect_err = match parse_rect(&s) {
        Ok(z) => return Ok((z, Notation::Rectangular)),
        Err(reason) => reason,
    };
    let polar_err = match parse_polar(&s) {
        Ok(z) => return Ok((z, Notation::Polar)),
        Err(reason) => reason,
    };

    Err(PowerFlowError::format(
        text,
        format!("not rectangular ({}); not polar ({})", rect_err, polar_err),
    ))
}

/// Parses a real value such as a voltage magnitude, angle, power or
/// tolerance.
pub fn parse_real(text: &str) -> Result<f64> {
    let s = normalize(text);
    match f64::from_str(&s) {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(PowerFlowError::format(text, "value is not finite")),
        Err(err) => Err(PowerFlowError::format(text, err.to_string())),
    }
}

/// Returns magnitude and angle (degrees) of `z`.
pub fn to_phasor(z: Complex64) -> (f64, f64) {
    let (r, theta) = z.to_polar();
    (r, theta.to_degrees())
}

fn normalize(text: &str) -> String {
    let s: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    match s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => inner.to_string(),
        None => s,
    }
}

/// Rectangular stage: `3+4j`, `-0.1-2.5e-1j`, `1000j`, `5`.
pub fn parse_rect(s: &str) -> Attempt {
    if s.contains('<') {
        return Err("contains '<'".to_string());
    }
    let z = Complex64::from_str(s).map_err(|err| err.to_string())?;
    if z.is_finite() {
        Ok(z)
    } else {
        Err("value is not finite".to_string())
    }
}

/// Polar stage: `magnitude<angle_degrees`.
pub fn parse_polar(s: &str) -> Attempt {
    let (mag, ang) = s
        .split_once('<')
        .ok_or_else(|| "missing '<' separator".to_string())?;
    if ang.contains('<') {
        return Err("more than one '<' separator".to_string());
    }
    let mag = f64::from_str(mag).map_err(|err| format!("magnitude: {}", err))?;
    let ang = f64::from_str(ang).map_err(|err| format!("angle: {}", err))?;
    if !mag.is_finite() || !ang.is_finite() {
        return Err("value is not finite".to_string());
    }
    Ok(Complex64::from_polar(mag, ang.to_radians()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use anyhow::{format_err, Result};

    fn close(a: Complex64, b: Complex64, tol: f64) -> bool {
        (a - b).norm() < tol
    }

    #[test]
    fn test_parse_rect() -> Result<()> {
        let cases = [
            ("0.05+0.25j", cmplx!(0.05, 0.25)),
            ("3 + 4j", cmplx!(3.0, 4.0)),
            ("1000j", cmplx!(0.0, 1000.0)),
            ("-0.1-0.5j", cmplx!(-0.1, -0.5)),
            ("2.5", cmplx!(2.5, 0.0)),
            ("(1+1j)", cmplx!(1.0, 1.0)),
            ("1e-3+2e-2j", cmplx!(1e-3, 2e-2)),
        ];
        for (text, expected) in cases {
            let (z, notation) = parse_complex_tagged(text)?;
            if notation != Notation::Rectangular || !close(z, expected, 1e-15) {
                return Err(format_err!(
                    "'{}': expected {} (rectangular), got {} ({:?})",
                    text,
                    expected,
                    z,
                    notation
                ));
            }
        }
        Ok(())
    }

    #[test]
    fn test_parse_polar() -> Result<()> {
        let (z, notation) = parse_complex_tagged("5<53.13")?;
        assert_eq!(notation, Notation::Polar);
        assert!(close(z, cmplx!(3.0, 4.0), 1e-3));

        let z = parse_complex("2 < -90")?;
        assert!(close(z, cmplx!(0.0, -2.0), 1e-12));

        let z = parse_complex("0.5<78.69")?;
        assert!((z.norm() - 0.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_polar_round_trip() -> Result<()> {
        for (mag, deg) in [(5.0, 53.13), (0.25, -120.0), (1000.0, 90.0), (1.0, 0.0)] {
            let z = parse_complex(&format!("{}<{}", mag, deg))?;
            let (m, d) = to_phasor(z);
            if (m - mag).abs() > 1e-9 || (d - deg).abs() > 1e-9 {
                return Err(format_err!(
                    "{}<{} came back as {}<{}",
                    mag,
                    deg,
                    m,
                    d
                ));
            }
        }
        Ok(())
    }

    #[test]
    fn test_parse_invalid() {
        for text in ["", "abc", "3+4k", "5<", "<30", "5<30<2", "1<x"] {
            match parse_complex(text) {
                Err(PowerFlowError::Format { input, .. }) => assert_eq!(input, text),
                other => panic!("'{}' should be a format error, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_parse_real() -> Result<()> {
        assert_eq!(parse_real(" 1.05 ")?, 1.05);
        assert_eq!(parse_real("1e-6")?, 1e-6);
        assert!(matches!(
            parse_real("1.0.0"),
            Err(PowerFlowError::Format { .. })
        ));
        assert!(matches!(parse_real("inf"), Err(PowerFlowError::Format { .. })));
        Ok(())
    }
}
