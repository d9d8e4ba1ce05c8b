//! Boundary to the external LP/MILP solver.
//!
//! Formulations are written against the typed [`Model`]; a [`MilpBackend`]
//! turns it into a [`SolveReport`]. The default backend is
//! [`GoodLpBackend`], which runs `good_lp` engines and adds SOS1 branching.

mod backend;
mod branching;
mod good_lp_backend;
mod model;

pub use backend::{
    BackendCapabilities, BackendError, MilpBackend, SolveReport, SolveStatus, SolverConfig,
};
pub use good_lp_backend::{GoodLpBackend, LpEngine};
pub use model::{
    Assignment, ConstrId, ConstraintSense, LinExpr, LinearConstraint, Model, Objective, Pinned,
    Sense, Sos1Set, VarDef, VarId, VarKind,
};
