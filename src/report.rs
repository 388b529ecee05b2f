use crate::debug::{format_complex, format_f64, format_polar};
use crate::error::PowerFlowError;
use crate::fixed_point::{FPProgressMonitor, FPRecord, FPSolution};
use crate::jac::Jacobian;
use crate::newton::{IterationRecord, ProgressMonitor, Solution, Status};
use crate::power::BusState;
use crate::ybus::Ybus;
use std::fmt::Write;

pub fn format_ybus(ybus: &Ybus) -> String {
    let mut s = String::from("Admittance matrix:\n");
    for (i, row) in ybus.values().iter().enumerate() {
        for (j, y) in row.iter().enumerate() {
            let _ = writeln!(
                s,
                "  Y{}{} = {}  ({})",
                i + 1,
                j + 1,
                format_complex(y),
                format_polar(y)
            );
        }
    }
    s
}

fn format_coefficients(ybus: &Ybus) -> String {
    format!(
        "  G21 = {}  B21 = {}  G22 = {}  B22 = {}",
        format_f64(ybus.g21()),
        format_f64(ybus.b21()),
        format_f64(ybus.g22()),
        format_f64(ybus.b22())
    )
}

fn format_state(state: &BusState) -> String {
    format!(
        "V2 = {} pu, θ2 = {}° ({} rad)",
        format_f64(state.v2),
        format_f64(state.theta2.to_degrees()),
        format_f64(state.theta2)
    )
}

pub fn format_record(record: &IterationRecord) -> String {
    let mut s = format!("Iteration {}:\n", record.iteration);
    let _ = match record.q {
        Some(q) => writeln!(s, "  P = {} pu, Q = {} pu", format_f64(record.p), format_f64(q)),
        None => writeln!(s, "  P = {} pu", format_f64(record.p)),
    };
    let _ = match record.mismatch.dq {
        Some(dq) => writeln!(
            s,
            "  ΔP = {} pu, ΔQ = {} pu",
            format_f64(record.mismatch.dp),
            format_f64(dq)
        ),
        None => writeln!(s, "  ΔP = {} pu", format_f64(record.mismatch.dp)),
    };
    let _ = match record.step.d_v {
        Some(d_v) => writeln!(
            s,
            "  Δθ = {} rad, ΔV = {} pu",
            format_f64(record.step.d_theta),
            format_f64(d_v)
        ),
        None => writeln!(s, "  Δθ = {} rad", format_f64(record.step.d_theta)),
    };
    let _ = match record.jacobian {
        Jacobian::Angle(h) => writeln!(s, "  dP2/dθ2 = {}", format_f64(h)),
        Jacobian::Polar(jac) => writeln!(
            s,
            "  H22 = {}  N22 = {}  M22 = {}  L22 = {}",
            format_f64(jac.h),
            format_f64(jac.n),
            format_f64(jac.m),
            format_f64(jac.l)
        ),
    };
    let _ = writeln!(s, "  {}", format_state(&record.state));
    s
}

pub fn format_solution(sol: &Solution, p_spec: f64, q_spec: Option<f64>) -> String {
    let mut s = String::new();
    let _ = match sol.status {
        Status::Converged => writeln!(s, "Converged in {} iterations.", sol.iterations),
        Status::Diverged => writeln!(
            s,
            "Diverged: singular Jacobian after {} iterations.",
            sol.iterations
        ),
        Status::Exhausted => writeln!(s, "Did not converge in {} iterations!", sol.iterations),
    };
    if sol.perturbations > 0 {
        let _ = writeln!(s, "Singular Jacobian perturbations: {}", sol.perturbations);
    }
    let _ = writeln!(s, "{}", format_state(&sol.state));
    let _ = writeln!(s, "P = {} pu (specified {})", format_f64(sol.p), format_f64(p_spec));
    if let (Some(q), Some(q_spec)) = (sol.q, q_spec) {
        let _ = writeln!(s, "Q = {} pu (specified {})", format_f64(q), format_f64(q_spec));
    }
    let _ = writeln!(s, "Error: {:.2e} pu", sol.mismatch.norm_inf());
    s
}

pub fn format_fp_record(record: &FPRecord) -> String {
    format!(
        "Iteration {}:\n  I = {}  ({})\n  V = {}  ({})\n",
        record.iteration,
        format_complex(&record.current),
        format_polar(&record.current),
        format_complex(&record.voltage),
        format_polar(&record.voltage)
    )
}

pub fn format_fp_solution(sol: &FPSolution) -> String {
    let mut s = String::new();
    let _ = match sol.status {
        Status::Converged => writeln!(s, "Converged in {} iterations.", sol.iterations),
        _ => writeln!(s, "Did not converge in {} iterations!", sol.iterations),
    };
    let _ = writeln!(
        s,
        "I = {}  ({})",
        format_complex(&sol.current),
        format_polar(&sol.current)
    );
    let _ = writeln!(
        s,
        "V = {}  ({})",
        format_complex(&sol.voltage),
        format_polar(&sol.voltage)
    );
    s
}

/// Prints per-iteration diagnostics to stdout.
#[derive(Default)]
pub struct PrintProgress {
    ybus: Option<Ybus>,
}

impl PrintProgress {
    /// Also print the admittance coefficients with every iteration.
    pub fn with_ybus(ybus: &Ybus) -> Self {
        Self { ybus: Some(*ybus) }
    }
}

impl ProgressMonitor for PrintProgress {
    fn update(&self, record: &IterationRecord) {
        print!("{}", format_record(record));
        if let Some(ybus) = &self.ybus {
            println!("{}", format_coefficients(ybus));
        }
    }

    fn singular(&self, iteration: usize, state: &BusState, err: &PowerFlowError) {
        println!("Warning: {} at iteration {} ({})", err, iteration, format_state(state));
    }
}

impl FPProgressMonitor for PrintProgress {
    fn update(&self, record: &FPRecord) {
        print!("{}", format_fp_record(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use crate::mpopt::PFOpt;
    use crate::newton::{newtonpf, newtonpf_pq};
    use crate::ybus::make_ybus;
    use anyhow::Result;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Collect(RefCell<Vec<IterationRecord>>);

    impl ProgressMonitor for Collect {
        fn update(&self, record: &IterationRecord) {
            self.0.borrow_mut().push(*record);
        }
    }

    #[test]
    fn test_format_ybus() -> Result<()> {
        let ybus = make_ybus(cmplx!(0.1, 0.5), cmplx!())?;
        let s = format_ybus(&ybus);
        for name in ["Y11", "Y12", "Y21", "Y22"] {
            assert!(s.contains(name), "{}", s);
        }
        Ok(())
    }

    #[test]
    fn test_format_angle_report() -> Result<()> {
        let ybus = make_ybus(cmplx!(0.05, 0.25), cmplx!(0.0, 1000.0))?;
        let collect = Collect::default();
        let sol = newtonpf(&ybus, BusState::default(), 0.3, &PFOpt::default(), Some(&collect))?;

        let first = format_record(&collect.0.borrow()[0]);
        assert!(first.starts_with("Iteration 1:"));
        assert!(first.contains("ΔP = "));
        assert!(first.contains("dP2/dθ2 = "));
        assert!(!first.contains("ΔQ"));

        let s = format_solution(&sol, 0.3, None);
        assert!(s.starts_with("Converged in"));
        assert!(s.contains("Error: "));
        Ok(())
    }

    #[test]
    fn test_format_pq_report() -> Result<()> {
        let ybus = make_ybus(cmplx!(0.05, 0.25), cmplx!(0.0, 1000.0))?;
        let collect = Collect::default();
        let opt = PFOpt::pq().max_it(1).build()?;
        let sol = newtonpf_pq(&ybus, BusState::default(), -0.2, -0.01, &opt, Some(&collect))?;

        let first = format_record(&collect.0.borrow()[0]);
        for part in ["ΔQ = ", "ΔV = ", "H22 = ", "L22 = "] {
            assert!(first.contains(part), "{}", first);
        }

        let s = format_solution(&sol, -0.2, Some(-0.01));
        assert!(s.starts_with("Did not converge in 1 iterations!"));
        assert!(s.contains("Q = "));
        Ok(())
    }
}
