use crate::ybus::Ybus;

/// Voltage state of the two-bus system.
///
/// The slack bus has magnitude `v1` and angle zero. `v2` and `theta2`
/// (radians) belong to the load bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusState {
    pub v1: f64,
    pub v2: f64,
    pub theta2: f64,
}

impl BusState {
    pub fn new(v1: f64, v2: f64, theta2: f64) -> Self {
        Self { v1, v2, theta2 }
    }

    pub fn is_finite(&self) -> bool {
        self.v1.is_finite() && self.v2.is_finite() && self.theta2.is_finite()
    }
}

impl Default for BusState {
    /// Flat start.
    fn default() -> Self {
        Self::new(1.0, 1.0, 0.0)
    }
}

/// Active power injected at the load bus for an explicit angle `theta2`.
pub fn p_injection_at(ybus: &Ybus, v1: f64, v2: f64, theta2: f64) -> f64 {
    let (sin, cos) = theta2.sin_cos();
    v2 * v2 * ybus.g22() + v1 * v2 * (ybus.g21() * cos + ybus.b21() * sin)
}

/// Reactive power injected at the load bus for an explicit angle `theta2`.
pub fn q_injection_at(ybus: &Ybus, v1: f64, v2: f64, theta2: f64) -> f64 {
    let (sin, cos) = theta2.sin_cos();
    -v2 * v2 * ybus.b22() + v1 * v2 * (ybus.g21() * sin - ybus.b21() * cos)
}

/// Active power injected at the load bus.
pub fn p_injection(ybus: &Ybus, state: &BusState) -> f64 {
    p_injection_at(ybus, state.v1, state.v2, state.theta2)
}

/// Complex power `(P2, Q2)` injected at the load bus.
pub fn s_injection(ybus: &Ybus, state: &BusState) -> (f64, f64) {
    (
        p_injection_at(ybus, state.v1, state.v2, state.theta2),
        q_injection_at(ybus, state.v1, state.v2, state.theta2),
    )
}
