use crate::error::PowerFlowError;
use derive_builder::Builder;

/// How `dP2/dθ2` is evaluated by the angle-only Newton method.
#[derive(Debug, PartialEq, Copy, Clone, Default)]
pub enum Derivative {
    /// Closed form.
    #[default]
    Analytic,
    /// Central difference of the power equation.
    Numerical,
}

/// What the Newton loop does when the Jacobian is singular.
#[derive(Debug, PartialEq, Copy, Clone, Default)]
pub enum OnSingular {
    /// Nudge the angle by `PFOpt::perturbation` and retry without
    /// counting an iteration.
    #[default]
    Perturb,
    /// Stop and report divergence.
    Fail,
}

/// Newton power flow options.
///
/// Build with one of the presets and override fields as needed:
///
/// ```ignore
/// let opt = PFOpt::nr().tolerance(1e-8).build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(validate = "Self::validate", error = "PowerFlowError"))]
pub struct PFOpt {
    /// Termination tolerance on per unit P (& Q) mismatch. Default value is 1e-6.
    #[builder(default = "1e-6")]
    pub tolerance: f64,

    /// Maximum number of Newton iterations. Default value is 20.
    #[builder(default = "20")]
    pub max_it: usize,

    /// Fraction of the Newton step applied to the angle.
    #[builder(default = "1.0")]
    pub damping: f64,

    #[builder(default)]
    pub derivative: Derivative,

    #[builder(default)]
    pub on_singular: OnSingular,

    /// Angle nudge (radians) applied to escape a singular Jacobian.
    #[builder(default = "0.01")]
    pub perturbation: f64,

    /// Maximum number of singular retries in one run.
    #[builder(default = "100")]
    pub max_perturbations: usize,
}

impl PFOpt {
    /// Angle-only Newton method with the closed-form derivative.
    pub fn nr() -> PFOptBuilder {
        PFOptBuilder {
            max_it: Some(20),
            damping: Some(0.8),
            derivative: Some(Derivative::Analytic),
            on_singular: Some(OnSingular::Perturb),
            ..Default::default()
        }
    }

    /// Angle-only Newton method with a numerical derivative.
    pub fn nr_numeric() -> PFOptBuilder {
        PFOptBuilder {
            max_it: Some(100),
            damping: Some(1.0),
            derivative: Some(Derivative::Numerical),
            on_singular: Some(OnSingular::Perturb),
            ..Default::default()
        }
    }

    /// Newton method on angle and magnitude of a PQ bus.
    pub fn pq() -> PFOptBuilder {
        PFOptBuilder {
            max_it: Some(20),
            damping: Some(1.0),
            derivative: Some(Derivative::Analytic),
            on_singular: Some(OnSingular::Fail),
            ..Default::default()
        }
    }
}

impl PFOptBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(tol) = self.tolerance {
            if !(tol > 0.0 && tol.is_finite()) {
                return Err(format!("tolerance must be positive ({})", tol));
            }
        }
        if let Some(0) = self.max_it {
            return Err("max_it must be at least 1".to_string());
        }
        if let Some(damping) = self.damping {
            if !(damping > 0.0 && damping <= 1.0) {
                return Err(format!("damping must be in (0, 1] ({})", damping));
            }
        }
        if let Some(perturbation) = self.perturbation {
            if perturbation == 0.0 || !perturbation.is_finite() {
                return Err(format!("perturbation must be nonzero ({})", perturbation));
            }
        }
        Ok(())
    }
}

impl From<derive_builder::UninitializedFieldError> for PowerFlowError {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        PowerFlowError::InvalidOption(err.to_string())
    }
}

impl From<String> for PowerFlowError {
    fn from(msg: String) -> Self {
        PowerFlowError::InvalidOption(msg)
    }
}

impl Default for PFOpt {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_it: 20,
            damping: 0.8,
            derivative: Derivative::Analytic,
            on_singular: OnSingular::Perturb,
            perturbation: 0.01,
            max_perturbations: 100,
        }
    }
}

/// Fixed-point (current/voltage recursion) options.
#[derive(Debug, Clone, PartialEq)]
pub struct FPOpt {
    /// Termination tolerance on the change of I and V. Default value is 1e-4.
    pub tolerance: f64,
    /// Maximum number of iterations. Default value is 100.
    pub max_it: usize,
}

impl Default for FPOpt {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_it: 100,
        }
    }
}
