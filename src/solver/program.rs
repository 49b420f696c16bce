use serde::{Deserialize, Serialize};

/// Outcome reported by an LP backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    /// Converged only to the relaxed tolerances.
    OptimalInaccurate,
    Infeasible,
    Unbounded,
    MaxIterations,
    /// The per-solve wall-clock budget ran out.
    TimeLimit,
    SolverError,
}

impl SolveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::OptimalInaccurate => "optimal_inaccurate",
            Self::Infeasible => "infeasible",
            Self::Unbounded => "unbounded",
            Self::MaxIterations => "max_iterations",
            Self::TimeLimit => "time_limit",
            Self::SolverError => "solver_error",
        }
    }

    pub fn is_optimal(self) -> bool {
        matches!(self, Self::Optimal)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sparse linear row `Σ coeffs[j].1 · x[coeffs[j].0]` compared against `rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub coeffs: Vec<(usize, f64)>,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(coeffs: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self { coeffs, rhs }
    }

    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.coeffs.iter().map(|&(j, a)| a * x[j]).sum()
    }
}

/// `minimize cᵗx` subject to equality rows (`= rhs`) and inequality rows (`<= rhs`).
///
/// Variables are free unless bounded by an inequality row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearProgram {
    pub objective: Vec<f64>,
    pub equalities: Vec<LinearConstraint>,
    pub inequalities: Vec<LinearConstraint>,
}

impl LinearProgram {
    pub fn new(num_vars: usize) -> Self {
        Self {
            objective: vec![0.0; num_vars],
            equalities: Vec::new(),
            inequalities: Vec::new(),
        }
    }

    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.equalities.len() + self.inequalities.len()
    }

    pub fn add_equality(&mut self, coeffs: Vec<(usize, f64)>, rhs: f64) {
        self.equalities.push(LinearConstraint::new(coeffs, rhs));
    }

    pub fn add_inequality(&mut self, coeffs: Vec<(usize, f64)>, rhs: f64) {
        self.inequalities.push(LinearConstraint::new(coeffs, rhs));
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.iter().zip(x).map(|(c, v)| c * v).sum()
    }

    /// Largest violation of any row at `x` (0 when feasible).
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let eq = self
            .equalities
            .iter()
            .map(|c| (c.evaluate(x) - c.rhs).abs());
        let ineq = self
            .inequalities
            .iter()
            .map(|c| (c.evaluate(x) - c.rhs).max(0.0));
        eq.chain(ineq).fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    pub status: SolveStatus,
    pub objective_value: f64,
    pub x: Vec<f64>,
}

impl LpSolution {
    /// Failed solve with no usable assignment.
    pub fn failed(status: SolveStatus, num_vars: usize) -> Self {
        Self {
            status,
            objective_value: f64::NAN,
            x: vec![f64::NAN; num_vars],
        }
    }
}

/// Backend able to solve a [`LinearProgram`].
///
/// Implementations must not retry: a single attempt is made and its status is
/// returned as-is.
pub trait LpSolver: Send + Sync {
    fn solve(&self, program: &LinearProgram) -> LpSolution;
}

impl<S: LpSolver + ?Sized> LpSolver for &S {
    fn solve(&self, program: &LinearProgram) -> LpSolution {
        (**self).solve(program)
    }
}

impl<S: LpSolver + ?Sized> LpSolver for Box<S> {
    fn solve(&self, program: &LinearProgram) -> LpSolution {
        (**self).solve(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_counts_equalities_both_ways() {
        let mut lp = LinearProgram::new(2);
        lp.add_equality(vec![(0, 1.0), (1, 1.0)], 1.0);
        lp.add_inequality(vec![(0, -1.0)], 0.0);
        assert_eq!(lp.max_violation(&[0.5, 0.5]), 0.0);
        assert!((lp.max_violation(&[0.5, 0.7]) - 0.2).abs() < 1e-12);
        assert!((lp.max_violation(&[-0.1, 1.1]) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn status_strings() {
        assert_eq!(SolveStatus::Optimal.to_string(), "optimal");
        assert_eq!(SolveStatus::TimeLimit.as_str(), "time_limit");
        assert!(!SolveStatus::OptimalInaccurate.is_optimal());
    }
}
