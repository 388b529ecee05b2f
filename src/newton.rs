use crate::error::{PowerFlowError, Result};
use crate::jac::{make_angle_jac, make_jac, make_jac_numeric, solve_angle, Jacobian, DIFF_STEP};
use crate::math::norm_inf;
use crate::mpopt::{Derivative, OnSingular, PFOpt};
use crate::power::{p_injection, s_injection, BusState};
use crate::ybus::Ybus;

/// Terminal state of an iterative solve.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Status {
    /// Mismatch below tolerance.
    Converged,
    /// Stopped on a singular Jacobian.
    Diverged,
    /// Iteration limit reached.
    Exhausted,
}

/// Specified minus calculated power at the load bus.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Mismatch {
    pub dp: f64,
    /// Only present when Q is specified.
    pub dq: Option<f64>,
}

impl Mismatch {
    pub fn norm_inf(&self) -> f64 {
        match self.dq {
            Some(dq) => norm_inf(&[self.dp, dq]),
            None => norm_inf(&[self.dp]),
        }
    }
}

/// Newton update applied to the state.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Step {
    pub d_theta: f64,
    pub d_v: Option<f64>,
}

/// Diagnostics of one Newton iteration.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Calculated injection the step was computed from.
    pub p: f64,
    pub q: Option<f64>,
    pub mismatch: Mismatch,
    pub jacobian: Jacobian,
    pub step: Step,
    /// State after the update.
    pub state: BusState,
}

pub trait ProgressMonitor {
    fn update(&self, record: &IterationRecord);

    /// Called when the Jacobian at `state` could not be used.
    fn singular(&self, _iteration: usize, _state: &BusState, _err: &PowerFlowError) {}
}

/// Result of a Newton power flow run.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Solution {
    pub state: BusState,
    pub status: Status,
    pub iterations: usize,
    /// Number of singular-Jacobian angle nudges applied.
    pub perturbations: usize,
    /// Injection and mismatch evaluated at `state`.
    pub p: f64,
    pub q: Option<f64>,
    pub mismatch: Mismatch,
}

impl Solution {
    pub fn converged(&self) -> bool {
        self.status == Status::Converged
    }
}

/// Solves for the load bus angle given its specified active power
/// (angle-only Newton's method, voltage magnitudes held fixed).
pub fn newtonpf(
    ybus: &Ybus,
    state0: BusState,
    p_spec: f64,
    opt: &PFOpt,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<Solution> {
    run_newton(ybus, state0, p_spec, None, opt, progress)
}

/// Solves for the load bus angle and magnitude given its specified active
/// and reactive power (full Newton's method, power/polar).
pub fn newtonpf_pq(
    ybus: &Ybus,
    state0: BusState,
    p_spec: f64,
    q_spec: f64,
    opt: &PFOpt,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<Solution> {
    run_newton(ybus, state0, p_spec, Some(q_spec), opt, progress)
}

fn check_state(state: &BusState) -> Result<()> {
    if !state.is_finite() {
        return Err(PowerFlowError::InvalidState(format!("{:?}", state)));
    }
    if state.v1 <= 0.0 || state.v2 <= 0.0 {
        return Err(PowerFlowError::InvalidState(format!(
            "voltage magnitudes must be positive (V1 = {}, V2 = {})",
            state.v1, state.v2
        )));
    }
    Ok(())
}

/// Evaluates the injection and mismatch at `state`.
fn evaluate(
    ybus: &Ybus,
    state: &BusState,
    p_spec: f64,
    q_spec: Option<f64>,
) -> (f64, Option<f64>, Mismatch) {
    match q_spec {
        Some(q_spec) => {
            let (p, q) = s_injection(ybus, state);
            let mis = Mismatch {
                dp: p_spec - p,
                dq: Some(q_spec - q),
            };
            (p, Some(q), mis)
        }
        None => {
            let p = p_injection(ybus, state);
            let mis = Mismatch {
                dp: p_spec - p,
                dq: None,
            };
            (p, None, mis)
        }
    }
}

/// Forms the Jacobian at `state` and solves for the update.
fn newton_step(
    ybus: &Ybus,
    state: &BusState,
    mis: &Mismatch,
    derivative: Derivative,
) -> Result<(Jacobian, Step)> {
    match mis.dq {
        None => {
            let h = make_angle_jac(ybus, state, derivative);
            let d_theta = solve_angle(h, mis.dp)?;
            Ok((Jacobian::Angle(h), Step { d_theta, d_v: None }))
        }
        Some(dq) => {
            let jac = match derivative {
                Derivative::Analytic => make_jac(ybus, state),
                Derivative::Numerical => make_jac_numeric(ybus, state, DIFF_STEP),
            };
            let (d_theta, d_v) = jac.solve(mis.dp, dq)?;
            Ok((
                Jacobian::Polar(jac),
                Step {
                    d_theta,
                    d_v: Some(d_v),
                },
            ))
        }
    }
}

fn run_newton(
    ybus: &Ybus,
    state0: BusState,
    p_spec: f64,
    q_spec: Option<f64>,
    opt: &PFOpt,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<Solution> {
    check_state(&state0)?;

    let tol = opt.tolerance;
    let max_it = opt.max_it;
    let name = if q_spec.is_some() { "PQ" } else { "angle only" };

    let mut state = state0;
    let mut i = 0;
    let mut perturbations = 0;
    let mut status = None;

    // evaluate F(x0)
    let (mut p, mut q, mut f) = evaluate(ybus, &state, p_spec, q_spec);
    log::debug!("x0: {:?}, F(x0): {:?}", state, f);

    // check tolerance
    if f.norm_inf() < tol {
        status = Some(Status::Converged);
    }

    // do Newton iterations
    while status.is_none() && i < max_it {
        let (jac, step) = match newton_step(ybus, &state, &f, opt.derivative) {
            Ok(update) => update,
            Err(err) => {
                if let Some(pm) = progress {
                    pm.singular(i, &state, &err);
                }
                match opt.on_singular {
                    OnSingular::Fail => {
                        log::warn!("{} at iteration {}, stopping", err, i);
                        status = Some(Status::Diverged);
                        break;
                    }
                    OnSingular::Perturb if perturbations >= opt.max_perturbations => {
                        log::warn!(
                            "{} at iteration {}, giving up after {} perturbations",
                            err,
                            i,
                            perturbations
                        );
                        status = Some(Status::Diverged);
                        break;
                    }
                    OnSingular::Perturb => {
                        log::warn!(
                            "{} at iteration {}, adjusting θ2 by {} rad",
                            err,
                            i,
                            opt.perturbation
                        );
                        perturbations += 1;
                        state.theta2 += opt.perturbation;

                        (p, q, f) = evaluate(ybus, &state, p_spec, q_spec);
                        if f.norm_inf() < tol {
                            status = Some(Status::Converged);
                        }
                        continue;
                    }
                }
            }
        };

        // update iteration counter
        i += 1;

        // update voltage
        state.theta2 += step.d_theta * opt.damping;
        if let Some(d_v) = step.d_v {
            state.v2 += d_v;
        }

        let record = IterationRecord {
            iteration: i,
            p,
            q,
            mismatch: f,
            jacobian: jac,
            step,
            state,
        };
        log::debug!("{:?}", record);
        if let Some(pm) = progress {
            pm.update(&record);
        }

        // evaluate F(x)
        (p, q, f) = evaluate(ybus, &state, p_spec, q_spec);

        // check for convergence
        if f.norm_inf() < tol {
            status = Some(Status::Converged);
        }
    }

    let status = status.unwrap_or(Status::Exhausted);
    match status {
        Status::Converged => log::info!(
            "Newton's method power flow ({}) converged in {} iterations.",
            name,
            i
        ),
        Status::Diverged => log::info!(
            "Newton's method power flow ({}) diverged after {} iterations.",
            name,
            i
        ),
        Status::Exhausted => log::info!(
            "Newton's method power flow ({}) did not converge in {} iterations.",
            name,
            i
        ),
    }

    Ok(Solution {
        state,
        status,
        iterations: i,
        perturbations,
        p,
        q,
        mismatch: f,
    })
}
