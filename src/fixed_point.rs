use crate::debug::format_rect;
use crate::error::{PowerFlowError, Result};
use crate::mpopt::FPOpt;
use crate::newton::Status;
use num_complex::Complex64;
use num_traits::Zero;
use std::path::Path;

/// Current and voltage produced by one recursion step.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct FPRecord {
    pub iteration: usize,
    pub current: Complex64,
    pub voltage: Complex64,
}

pub trait FPProgressMonitor {
    fn update(&self, record: &FPRecord);
}

#[derive(Debug, Clone, PartialEq)]
pub struct FPSolution {
    pub status: Status,
    pub iterations: usize,
    /// Load bus voltage fed into the last step.
    pub v2: Complex64,
    /// Current and voltage of the last step.
    pub current: Complex64,
    pub voltage: Complex64,
    /// (I, V) of every step.
    pub history: Vec<(Complex64, Complex64)>,
}

/// One step of the recursion:
///
/// ```text
/// I = S2 / V2
/// V = V2 + Z12·I
/// ```
pub fn fp_step(v2: Complex64, s2: Complex64, z12: Complex64) -> Result<(Complex64, Complex64)> {
    if v2.is_zero() {
        return Err(PowerFlowError::division("load bus voltage"));
    }
    let i = s2 / v2;
    let v = v2 + z12 * i;
    if !i.is_finite() || !v.is_finite() {
        return Err(PowerFlowError::division(format!("load bus voltage ({})", v2)));
    }
    Ok((i, v))
}

/// Estimates the bus voltage by repeating [`fp_step`] with `V2 ← V` until
/// successive currents and voltages differ by less than the tolerance.
pub fn fixed_point(
    v2: Complex64,
    s2: Complex64,
    z12: Complex64,
    opt: &FPOpt,
    progress: Option<&dyn FPProgressMonitor>,
) -> Result<FPSolution> {
    let mut v2 = v2;
    let mut i_prev = Complex64::zero();
    let mut v_prev = Complex64::zero();
    let mut history = Vec::new();
    let mut converged = false;

    while !converged && history.len() < opt.max_it {
        let (i, v) = fp_step(v2, s2, z12)?;
        history.push((i, v));

        let record = FPRecord {
            iteration: history.len(),
            current: i,
            voltage: v,
        };
        log::debug!("{:?}", record);
        if let Some(pm) = progress {
            pm.update(&record);
        }

        if (i - i_prev).norm() < opt.tolerance && (v - v_prev).norm() < opt.tolerance {
            converged = true;
        } else {
            i_prev = i;
            v_prev = v;
            v2 = v;
        }
    }

    let iterations = history.len();
    let (current, voltage) = history.last().copied().unwrap_or_default();
    let status = if converged {
        log::info!("Fixed-point iteration converged in {} iterations.", iterations);
        Status::Converged
    } else {
        log::info!(
            "Fixed-point iteration did not converge in {} iterations.",
            iterations
        );
        Status::Exhausted
    };

    Ok(FPSolution {
        status,
        iterations,
        v2,
        current,
        voltage,
        history,
    })
}

/// Writes the current/voltage history as two tab separated columns.
pub fn write_history(path: &Path, history: &[(Complex64, Complex64)]) -> Result<()> {
    let io_err = |source: csv::Error| PowerFlowError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(io_err)?;
    wtr.write_record(["current", "voltage"]).map_err(io_err)?;
    for (i, v) in history {
        wtr.write_record([format_rect(i), format_rect(v)])
            .map_err(io_err)?;
    }
    wtr.flush().map_err(|err| io_err(err.into()))?;
    Ok(())
}
