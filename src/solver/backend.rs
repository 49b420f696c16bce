use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};

use crate::config::SolverConfig;
use crate::solver::program::{LinearConstraint, LinearProgram, LpSolution, LpSolver, SolveStatus};

/// Interior-point backend built on `clarabel`.
///
/// Equality rows map to the zero cone and `<=` rows to the nonnegative cone,
/// so `A·x + s = b` with `s` in the product cone.
#[derive(Debug, Clone)]
pub struct ClarabelSolver {
    max_iter: u32,
    time_limit_secs: Option<f64>,
    verbose: bool,
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self {
            max_iter: 200,
            time_limit_secs: None,
            verbose: false,
        }
    }
}

impl ClarabelSolver {
    pub fn new(max_iter: u32, time_limit_secs: Option<f64>, verbose: bool) -> Self {
        Self {
            max_iter: max_iter.max(1),
            time_limit_secs,
            verbose,
        }
    }

    pub fn from_config(cfg: &SolverConfig) -> Self {
        Self::new(cfg.max_iter, cfg.time_limit_secs, cfg.verbose)
    }
}

impl LpSolver for ClarabelSolver {
    fn solve(&self, program: &LinearProgram) -> LpSolution {
        let n = program.num_vars();
        let m = program.num_constraints();

        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let q = program.objective.clone();
        let a = constraint_matrix(program);
        let b: Vec<f64> = program
            .equalities
            .iter()
            .chain(program.inequalities.iter())
            .map(|c| c.rhs)
            .collect();

        let mut cones = Vec::with_capacity(2);
        if !program.equalities.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(program.equalities.len()));
        }
        if !program.inequalities.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(program.inequalities.len()));
        }

        let mut builder = DefaultSettingsBuilder::default();
        builder.max_iter(self.max_iter).verbose(self.verbose);
        if let Some(limit) = self.time_limit_secs {
            builder.time_limit(limit);
        }
        let settings = match builder.build() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "invalid clarabel settings");
                return LpSolution::failed(SolveStatus::SolverError, n);
            }
        };

        let mut solver = match DefaultSolver::new(&p, &q, &a, &b, &cones, settings) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = ?e, vars = n, rows = m, "failed to build clarabel problem");
                return LpSolution::failed(SolveStatus::SolverError, n);
            }
        };
        solver.solve();

        let status = map_status(solver.solution.status);
        tracing::trace!(
            vars = n,
            rows = m,
            status = %status,
            iterations = solver.solution.iterations,
            "clarabel solve finished"
        );

        match status {
            SolveStatus::Optimal | SolveStatus::OptimalInaccurate => LpSolution {
                status,
                objective_value: solver.solution.obj_val,
                x: solver.solution.x.clone(),
            },
            other => LpSolution::failed(other, n),
        }
    }
}

fn map_status(status: SolverStatus) -> SolveStatus {
    match status {
        SolverStatus::Solved => SolveStatus::Optimal,
        SolverStatus::AlmostSolved => SolveStatus::OptimalInaccurate,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            SolveStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            SolveStatus::Unbounded
        }
        SolverStatus::MaxIterations => SolveStatus::MaxIterations,
        SolverStatus::MaxTime => SolveStatus::TimeLimit,
        _ => SolveStatus::SolverError,
    }
}

/// Stack equality rows over inequality rows into a CSC matrix.
fn constraint_matrix(program: &LinearProgram) -> CscMatrix<f64> {
    let n = program.num_vars();
    let rows: Vec<&LinearConstraint> = program
        .equalities
        .iter()
        .chain(program.inequalities.iter())
        .collect();

    let mut triplets: Vec<(usize, usize, f64)> = rows
        .iter()
        .enumerate()
        .flat_map(|(r, c)| c.coeffs.iter().map(move |&(col, v)| (col, r, v)))
        .filter(|&(_, _, v)| v != 0.0)
        .collect();
    triplets.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut colptr = Vec::with_capacity(n + 1);
    let mut rowval = Vec::with_capacity(triplets.len());
    let mut nzval: Vec<f64> = Vec::with_capacity(triplets.len());
    colptr.push(0);

    let mut t = 0;
    for col in 0..n {
        let mut last_row = None;
        while t < triplets.len() && triplets[t].0 == col {
            let (_, r, v) = triplets[t];
            if last_row == Some(r) {
                // duplicate entry in the same row: accumulate
                if let Some(prev) = nzval.last_mut() {
                    *prev += v;
                }
            } else {
                rowval.push(r);
                nzval.push(v);
                last_row = Some(r);
            }
            t += 1;
        }
        colptr.push(rowval.len());
    }

    CscMatrix::new(rows.len(), n, colptr, rowval, nzval)
}
