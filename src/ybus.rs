use crate::error::{PowerFlowError, Result};
use num_complex::Complex64;
use num_traits::Zero;

/// Bus admittance matrix of a two-bus system joined by a single line.
///
/// Bus 0 is the slack bus and bus 1 the load bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ybus {
    y: [[Complex64; 2]; 2],
    y_line: Complex64,
    y_shunt: Complex64,
}

impl Ybus {
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.y[row][col]
    }

    pub fn values(&self) -> &[[Complex64; 2]; 2] {
        &self.y
    }

    /// Series admittance of the line.
    pub fn y_line(&self) -> Complex64 {
        self.y_line
    }

    /// Shunt admittance at each bus (zero when there is no shunt branch).
    pub fn y_shunt(&self) -> Complex64 {
        self.y_shunt
    }

    /// Mutual conductance.
    pub fn g21(&self) -> f64 {
        self.y[1][0].re
    }

    /// Mutual susceptance.
    pub fn b21(&self) -> f64 {
        self.y[1][0].im
    }

    /// Self conductance of the load bus.
    pub fn g22(&self) -> f64 {
        self.y[1][1].re
    }

    /// Self susceptance of the load bus.
    pub fn b22(&self) -> f64 {
        self.y[1][1].im
    }
}

/// Builds the bus admittance matrix from the series impedance of the line
/// and the shunt impedance connected at each end.
///
/// ```text
/// | Y11  Y12 |   | Yl + Ysh    -Yl    |
/// |          | = |                    |
/// | Y21  Y22 |   |   -Yl     Yl + Ysh |
/// ```
///
/// A shunt impedance of exactly zero (or an infinite one) means there is
/// no shunt branch.
pub fn make_ybus(z_line: Complex64, z_shunt: Complex64) -> Result<Ybus> {
    if z_line.is_zero() || !z_line.is_finite() {
        return Err(PowerFlowError::division(format!(
            "line impedance ({})",
            z_line
        )));
    }
    if z_shunt.is_nan() {
        return Err(PowerFlowError::division(format!(
            "shunt impedance ({})",
            z_shunt
        )));
    }

    let y_line = z_line.inv(); // series admittance
    let y_shunt = if z_shunt.is_zero() || z_shunt.is_infinite() {
        Complex64::zero()
    } else {
        z_shunt.inv()
    };

    let y_self = y_line + y_shunt;
    let y_mutual = -y_line;

    let ybus = Ybus {
        y: [[y_self, y_mutual], [y_mutual, y_self]],
        y_line,
        y_shunt,
    };
    log::debug!(
        "Ybus: G21={} B21={} G22={} B22={}",
        ybus.g21(),
        ybus.b21(),
        ybus.g22(),
        ybus.b22()
    );
    Ok(ybus)
}
