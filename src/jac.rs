use crate::error::{PowerFlowError, Result};
use crate::mpopt::Derivative;
use crate::power::{p_injection_at, q_injection_at, BusState};
use crate::ybus::Ybus;

/// Jacobian scalars and determinants smaller than this are singular.
pub const SINGULAR_TOL: f64 = 1e-10;

/// Step of the central-difference derivative.
pub const DIFF_STEP: f64 = 1e-6;

/// Jacobian entries used for one Newton update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jacobian {
    /// `dP2/dθ2` of the angle-only formulation.
    Angle(f64),
    /// Full polar Jacobian of the PQ formulation.
    Polar(PolarJac),
}

/// Forms `dP2/dθ2`:
///
/// ```text
/// H22 = V1·V2·(-G21·sin θ2 + B21·cos θ2)
/// ```
pub fn d_p_d_theta(ybus: &Ybus, state: &BusState) -> f64 {
    let (sin, cos) = state.theta2.sin_cos();
    state.v1 * state.v2 * (-ybus.g21() * sin + ybus.b21() * cos)
}

/// Approximates `dP2/dθ2` by a central difference:
/// `(P(θ + h) - P(θ - h)) / 2h`.
pub fn d_p_d_theta_numeric(ybus: &Ybus, state: &BusState, step: f64) -> f64 {
    let BusState { v1, v2, theta2 } = *state;
    let p_plus = p_injection_at(ybus, v1, v2, theta2 + step);
    let p_minus = p_injection_at(ybus, v1, v2, theta2 - step);
    (p_plus - p_minus) / (2.0 * step)
}

/// Forms `dP2/dθ2` by the requested method.
pub fn make_angle_jac(ybus: &Ybus, state: &BusState, derivative: Derivative) -> f64 {
    match derivative {
        Derivative::Analytic => d_p_d_theta(ybus, state),
        Derivative::Numerical => d_p_d_theta_numeric(ybus, state, DIFF_STEP),
    }
}

/// Solves `h · dθ = dp` for the angle step.
pub fn solve_angle(h: f64, dp: f64) -> Result<f64> {
    if !h.is_finite() || h.abs() < SINGULAR_TOL {
        return Err(PowerFlowError::SingularJacobian { value: h });
    }
    let dx = dp / h;
    if !dx.is_finite() {
        return Err(PowerFlowError::SingularJacobian { value: h });
    }
    Ok(dx)
}

/// Polar power flow Jacobian of the load bus.
///
/// ```text
/// | dP2 |   | H22  N22 |   | dθ2 |
/// |     | = |          | * |     |
/// | dQ2 |   | M22  L22 |   | dV2 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarJac {
    pub h: f64,
    pub n: f64,
    pub m: f64,
    pub l: f64,
}

impl PolarJac {
    pub fn det(&self) -> f64 {
        self.h * self.l - self.n * self.m
    }

    /// Solves for `(dθ2, dV2)` by Cramer's rule.
    pub fn solve(&self, dp: f64, dq: f64) -> Result<(f64, f64)> {
        let det = self.det();
        if !det.is_finite() || det.abs() < SINGULAR_TOL {
            return Err(PowerFlowError::SingularJacobian { value: det });
        }
        let d_theta = (dp * self.l - self.n * dq) / det;
        let d_v = (self.h * dq - dp * self.m) / det;
        if !d_theta.is_finite() || !d_v.is_finite() {
            return Err(PowerFlowError::SingularJacobian { value: det });
        }
        Ok((d_theta, d_v))
    }
}

/// Forms the polar Jacobian of the load bus.
pub fn make_jac(ybus: &Ybus, state: &BusState) -> PolarJac {
    let BusState { v1, v2, theta2 } = *state;
    let (g21, b21, g22, b22) = (ybus.g21(), ybus.b21(), ybus.g22(), ybus.b22());
    let (sin, cos) = theta2.sin_cos();

    let jac = PolarJac {
        h: v1 * v2 * (-g21 * sin + b21 * cos),
        n: 2.0 * v2 * g22 + v1 * (g21 * cos + b21 * sin),
        m: v1 * v2 * (g21 * cos + b21 * sin),
        l: -2.0 * v2 * b22 + v1 * (g21 * sin - b21 * cos),
    };
    log::trace!(
        "J: H22={} N22={} M22={} L22={} det={}",
        jac.h,
        jac.n,
        jac.m,
        jac.l,
        jac.det()
    );
    jac
}

/// Approximates the polar Jacobian by central differences.
pub fn make_jac_numeric(ybus: &Ybus, state: &BusState, step: f64) -> PolarJac {
    let BusState { v1, v2, theta2 } = *state;
    let diff = |f: fn(&Ybus, f64, f64, f64) -> f64, d_theta: f64, d_v: f64| {
        (f(ybus, v1, v2 + d_v, theta2 + d_theta) - f(ybus, v1, v2 - d_v, theta2 - d_theta))
            / (2.0 * step)
    };
    PolarJac {
        h: diff(p_injection_at, step, 0.0),
        n: diff(p_injection_at, 0.0, step),
        m: diff(q_injection_at, step, 0.0),
        l: diff(q_injection_at, 0.0, step),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use crate::ybus::make_ybus;
    use anyhow::{format_err, Result};

    fn rel_err(a: f64, b: f64) -> f64 {
        (a - b).abs() / a.abs().max(b.abs())
    }

    fn states() -> Vec<BusState> {
        vec![
            BusState::new(1.0, 1.0, 0.0),
            BusState::new(1.0, 0.97, -0.08),
            BusState::new(1.05, 1.01, 0.35),
        ]
    }

    #[test]
    fn test_numeric_angle_jac() -> Result<()> {
        let ybus = make_ybus(cmplx!(0.05, 0.25), cmplx!(0.0, 1000.0))?;
        for state in states() {
            let analytic = make_angle_jac(&ybus, &state, Derivative::Analytic);
            let numeric = make_angle_jac(&ybus, &state, Derivative::Numerical);
            if rel_err(analytic, numeric) > 1e-6 {
                return Err(format_err!(
                    "dP/dθ at {:?}: analytic {} numeric {}",
                    state,
                    analytic,
                    numeric
                ));
            }
        }
        Ok(())
    }

    #[test]
    fn test_numeric_polar_jac() -> Result<()> {
        let ybus = make_ybus(cmplx!(0.05, 0.25), cmplx!(0.0, 1000.0))?;
        for state in states() {
            let a = make_jac(&ybus, &state);
            let n = make_jac_numeric(&ybus, &state, DIFF_STEP);
            for (name, x, y) in [("H", a.h, n.h), ("N", a.n, n.n), ("M", a.m, n.m), ("L", a.l, n.l)] {
                if rel_err(x, y) > 1e-6 {
                    return Err(format_err!("{} at {:?}: analytic {} numeric {}", name, state, x, y));
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_angle_jac_matches_polar_h() -> Result<()> {
        let ybus = make_ybus(cmplx!(0.1, 0.5), cmplx!())?;
        for state in states() {
            assert_eq!(d_p_d_theta(&ybus, &state), make_jac(&ybus, &state).h);
        }
        Ok(())
    }

    #[test]
    fn test_angle_jac_singular() -> Result<()> {
        // dP/dθ vanishes where tan θ2 = B21 / G21.
        let ybus = make_ybus(cmplx!(0.05, 0.25), cmplx!(0.0, 1000.0))?;
        let theta2 = ybus.b21().atan2(ybus.g21());
        let h = d_p_d_theta(&ybus, &BusState::new(1.0, 1.0, theta2));
        assert!(h.abs() < SINGULAR_TOL);
        assert!(matches!(
            solve_angle(h, 0.3),
            Err(PowerFlowError::SingularJacobian { .. })
        ));
        assert!(matches!(
            solve_angle(f64::NAN, 0.3),
            Err(PowerFlowError::SingularJacobian { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_polar_solve() -> Result<()> {
        let jac = PolarJac {
            h: 4.0,
            n: 1.0,
            m: 2.0,
            l: 3.0,
        };
        assert_eq!(jac.det(), 10.0);
        let (d_theta, d_v) = jac.solve(6.0, 7.0)?;
        assert!((4.0 * d_theta + 1.0 * d_v - 6.0).abs() < 1e-12);
        assert!((2.0 * d_theta + 3.0 * d_v - 7.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_polar_jac_singular() -> Result<()> {
        // det = V1·V2·(2·V2·|Y21|² - V1·|Y21|²) at θ2 = 0 without shunt,
        // which vanishes at V2 = V1 / 2.
        let ybus = make_ybus(cmplx!(0.05, 0.25), cmplx!())?;
        let jac = make_jac(&ybus, &BusState::new(1.0, 0.5, 0.0));
        assert!(jac.det().abs() < SINGULAR_TOL);
        assert!(matches!(
            jac.solve(0.1, 0.1),
            Err(PowerFlowError::SingularJacobian { .. })
        ));
        Ok(())
    }
}
