pub mod backend;
pub mod program;

pub use backend::ClarabelSolver;
pub use program::{LinearConstraint, LinearProgram, LpSolution, LpSolver, SolveStatus};
