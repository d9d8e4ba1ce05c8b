//! Bilevel prosumer attack.
//!
//! An attacker perturbs the hourly demand by `delta[i] ∈ [lb[i], ub[i]]`
//! to maximize the deviation of the prosumer's cost-minimizing dispatch. The
//! lower-level dispatch LP is replaced by its KKT conditions so the problem
//! collapses to a single level:
//!
//! | Piece | Module |
//! |-------|--------|
//! | attacker variables and budget | [`upper`] |
//! | dispatch LP (primal feasibility) | [`primal`] |
//! | dual feasibility and objective | [`dual`] |
//! | complementary slackness encodings | [`complementarity`] |
//! | shared formulation | [`model`] |
//! | penalty alternating direction heuristic | [`padm`] |
//!
//! [`AttackOrchestrator`] is the entry point. Each operation builds its
//! own [`Model`](crate::solver::Model) and reports non-optimal solver
//! statuses as [`AttackError`] variants.

pub mod complementarity;
pub mod dual;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod padm;
pub mod primal;
pub mod solution;
pub mod upper;

pub use complementarity::{
    add_valid_inequality, BigMAdvisor, Complementarity, ComplementarityPair, PairEncoding,
    PairFamily, Reformulation,
};
pub use dual::{DualModel, DualRows, DualVars};
pub use error::{AttackError, SolveStage};
pub use model::HouseModel;
pub use orchestrator::AttackOrchestrator;
pub use padm::{PadmIterate, PadmOutcome, PadmSolver, PadmState, PadmTermination};
pub use primal::{Perturbation, PrimalDispatch, PrimalRows, PrimalVars};
pub use solution::{
    relative_gap, AttackOutcome, BaselineOutcome, BigMSide, BigMWarning, ComplementarityReport,
    DispatchSolution, DualBaselineOutcome, PairResidual,
};
pub use upper::{AbsEncoding, UpperLevel};
