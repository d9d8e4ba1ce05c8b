//! Solver-independent optimization model.
//!
//! A [`Model`] is a plain description of variables, linear constraints,
//! SOS1 sets and an objective. Backends translate it into whatever their
//! engine expects on every solve, so the model can be modified between
//! solves (objective swaps, bound pins) without rebuilding formulations.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Deref, DerefMut, Mul, Neg, Range, Sub, SubAssign};

/// Handle of a variable inside one [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }

    /// VarIds are dense indices into [`Model::vars`].
    pub(crate) fn from_index(index: usize) -> Self {
        VarId(index)
    }
}

/// Handle of a linear constraint inside one [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstrId(usize);

impl ConstrId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Continuous,
    Binary,
}

/// Declaration of a single decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub kind: VarKind,
}

/// Affine expression `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(var: VarId, coef: f64) -> Self {
        Self {
            terms: vec![(var, coef)],
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) -> &mut Self {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
        self
    }

    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_part(&self) -> f64 {
        self.constant
    }

    /// Sums duplicate variables and drops zero coefficients.
    pub fn compact(&self) -> Self {
        let mut terms = self.terms.clone();
        terms.sort_by_key(|(var, _)| *var);
        let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(terms.len());
        for (var, coef) in terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == var => *acc += coef,
                _ => merged.push((var, coef)),
            }
        }
        merged.retain(|(_, coef)| *coef != 0.0);
        Self {
            terms: merged,
            constant: self.constant,
        }
    }

    /// Value of the expression for a dense variable assignment.
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, (var, coef)| acc + coef * values[var.0])
    }
}

impl From<VarId> for LinExpr {
    fn from(var: VarId) -> Self {
        LinExpr::term(var, 1.0)
    }
}

impl From<f64> for LinExpr {
    fn from(value: f64) -> Self {
        LinExpr::constant(value)
    }
}

impl<T: Into<LinExpr>> AddAssign<T> for LinExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl<T: Into<LinExpr>> SubAssign<T> for LinExpr {
    fn sub_assign(&mut self, rhs: T) {
        *self += -rhs.into();
    }
}

impl<T: Into<LinExpr>> Add<T> for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: T) -> LinExpr {
        self += rhs;
        self
    }
}

impl<T: Into<LinExpr>> Sub<T> for LinExpr {
    type Output = LinExpr;

    fn sub(mut self, rhs: T) -> LinExpr {
        self -= rhs;
        self
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        self * -1.0
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;

    fn mul(mut self, rhs: f64) -> LinExpr {
        for (_, coef) in &mut self.terms {
            *coef *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Mul<VarId> for f64 {
    type Output = LinExpr;

    fn mul(self, var: VarId) -> LinExpr {
        LinExpr::term(var, self)
    }
}

impl Mul<LinExpr> for f64 {
    type Output = LinExpr;

    fn mul(self, expr: LinExpr) -> LinExpr {
        expr * self
    }
}

impl<T: Into<LinExpr>> Add<T> for VarId {
    type Output = LinExpr;

    fn add(self, rhs: T) -> LinExpr {
        LinExpr::from(self) + rhs
    }
}

impl<T: Into<LinExpr>> Sub<T> for VarId {
    type Output = LinExpr;

    fn sub(self, rhs: T) -> LinExpr {
        LinExpr::from(self) - rhs
    }
}

impl Neg for VarId {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        LinExpr::term(self, -1.0)
    }
}

impl Sum for LinExpr {
    fn sum<I: Iterator<Item = LinExpr>>(iter: I) -> Self {
        iter.fold(LinExpr::new(), |acc, e| acc + e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintSense {
    /// `expr ≤ 0`
    Le,
    /// `expr = 0`
    Eq,
    /// `expr ≥ 0`
    Ge,
}

/// Linear constraint `expr (≤ | = | ≥) 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub expr: LinExpr,
    pub sense: ConstraintSense,
}

impl LinearConstraint {
    fn build(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>, sense: ConstraintSense) -> Self {
        Self {
            name: String::new(),
            expr: lhs.into() - rhs.into(),
            sense,
        }
    }

    /// `lhs ≤ rhs`
    pub fn leq(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::build(lhs, rhs, ConstraintSense::Le)
    }

    /// `lhs = rhs`
    pub fn eq(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::build(lhs, rhs, ConstraintSense::Eq)
    }

    /// `lhs ≥ rhs`
    pub fn geq(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::build(lhs, rhs, ConstraintSense::Ge)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Amount by which `values` violate the constraint (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.eval(values);
        match self.sense {
            ConstraintSense::Le => lhs.max(0.0),
            ConstraintSense::Eq => lhs.abs(),
            ConstraintSense::Ge => (-lhs).max(0.0),
        }
    }
}

/// Special ordered set of type 1: at most one member may be nonzero.
///
/// Members are ordered; the order is used as branching weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Sos1Set {
    pub name: String,
    pub vars: Vec<VarId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    Minimize,
    Maximize,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Minimize => write!(f, "minimize"),
            Sense::Maximize => write!(f, "maximize"),
        }
    }
}

/// Linear objective with an optional diagonal quadratic part `Σ q·x²`.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: Sense,
    pub linear: LinExpr,
    pub quadratic: Vec<(VarId, f64)>,
}

impl Objective {
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.quadratic
            .iter()
            .fold(self.linear.eval(values), |acc, (var, q)| {
                acc + q * values[var.0] * values[var.0]
            })
    }
}

impl Default for Objective {
    fn default() -> Self {
        Self {
            sense: Sense::Minimize,
            linear: LinExpr::new(),
            quadratic: Vec::new(),
        }
    }
}

/// Optimization model handed to a [`MilpBackend`](super::MilpBackend).
#[derive(Debug, Clone, Default)]
pub struct Model {
    name: String,
    vars: Vec<VarDef>,
    constraints: Vec<LinearConstraint>,
    sos1: Vec<Sos1Set>,
    objective: Objective,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_var(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        kind: VarKind,
    ) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarDef {
            name: name.into(),
            lower,
            upper,
            kind,
        });
        id
    }

    pub fn continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_var(name, lower, upper, VarKind::Continuous)
    }

    pub fn binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_var(name, 0.0, 1.0, VarKind::Binary)
    }

    /// Declares `n` variables named `prefix[0]`, ..., `prefix[n-1]`.
    pub fn add_vars(
        &mut self,
        prefix: &str,
        n: usize,
        lower: f64,
        upper: f64,
        kind: VarKind,
    ) -> Vec<VarId> {
        (0..n)
            .map(|i| self.add_var(format!("{prefix}[{i}]"), lower, upper, kind))
            .collect()
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) -> ConstrId {
        let id = ConstrId(self.constraints.len());
        self.constraints.push(constraint);
        id
    }

    /// Adds one constraint per index of `range`, named `prefix[i]`.
    pub fn add_constraints<F>(&mut self, prefix: &str, range: Range<usize>, mut build: F) -> Vec<ConstrId>
    where
        F: FnMut(usize) -> LinearConstraint,
    {
        range
            .map(|i| {
                let constraint = build(i).named(format!("{prefix}[{i}]"));
                self.add_constraint(constraint)
            })
            .collect()
    }

    pub fn add_sos1(&mut self, name: impl Into<String>, vars: Vec<VarId>) {
        self.sos1.push(Sos1Set {
            name: name.into(),
            vars,
        });
    }

    pub fn set_objective(&mut self, sense: Sense, expr: impl Into<LinExpr>) {
        self.objective = Objective {
            sense,
            linear: expr.into(),
            quadratic: Vec::new(),
        };
    }

    pub fn set_quadratic_objective(
        &mut self,
        sense: Sense,
        linear: impl Into<LinExpr>,
        quadratic: Vec<(VarId, f64)>,
    ) {
        self.objective = Objective {
            sense,
            linear: linear.into(),
            quadratic,
        };
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn var(&self, id: VarId) -> &VarDef {
        &self.vars[id.0]
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn constraint(&self, id: ConstrId) -> &LinearConstraint {
        &self.constraints[id.0]
    }

    pub fn sos1_sets(&self) -> &[Sos1Set] {
        &self.sos1
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn has_binaries(&self) -> bool {
        self.vars.iter().any(|v| v.kind == VarKind::Binary)
    }

    pub fn bounds(&self, id: VarId) -> (f64, f64) {
        let def = &self.vars[id.0];
        (def.lower, def.upper)
    }

    pub fn set_bounds(&mut self, id: VarId, lower: f64, upper: f64) {
        let def = &mut self.vars[id.0];
        def.lower = lower;
        def.upper = upper;
    }

    /// Temporarily fixes `ids[k]` to `values[k]` by tightening both bounds.
    ///
    /// The original bounds come back when the returned guard is dropped.
    /// The guard dereferences to the model, so it can be handed to a backend
    /// directly.
    pub fn pin(&mut self, ids: &[VarId], values: &[f64]) -> Pinned<'_> {
        assert_eq!(ids.len(), values.len(), "pin: ids and values differ in length");
        let mut saved = Vec::with_capacity(ids.len());
        for (&id, &value) in ids.iter().zip(values) {
            let (lower, upper) = self.bounds(id);
            saved.push((id, lower, upper));
            let value = self.pin_value(id, value);
            self.set_bounds(id, value, value);
        }
        Pinned { model: self, saved }
    }

    fn pin_value(&self, id: VarId, value: f64) -> f64 {
        match self.vars[id.0].kind {
            VarKind::Binary => value.round().clamp(0.0, 1.0),
            VarKind::Continuous => value,
        }
    }

    /// Largest bound, constraint or SOS1 violation of a dense assignment.
    pub fn max_violation(&self, values: &[f64], sos_tol: f64) -> f64 {
        let bounds = self
            .vars
            .iter()
            .zip(values)
            .map(|(def, &v)| (def.lower - v).max(v - def.upper).max(0.0))
            .fold(0.0_f64, f64::max);
        let rows = self
            .constraints
            .iter()
            .map(|c| c.violation(values))
            .fold(0.0_f64, f64::max);
        let sos = self
            .sos1
            .iter()
            .map(|set| {
                let mut mags: Vec<f64> = set.vars.iter().map(|v| values[v.0].abs()).collect();
                mags.sort_by(|a, b| b.total_cmp(a));
                mags.get(1).copied().filter(|m| *m > sos_tol).unwrap_or(0.0)
            })
            .fold(0.0_f64, f64::max);
        bounds.max(rows).max(sos)
    }
}

/// Scoped bound override created by [`Model::pin`].
pub struct Pinned<'a> {
    model: &'a mut Model,
    saved: Vec<(VarId, f64, f64)>,
}

impl Pinned<'_> {
    /// Number of variables held by this guard.
    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

impl Deref for Pinned<'_> {
    type Target = Model;

    fn deref(&self) -> &Model {
        self.model
    }
}

impl DerefMut for Pinned<'_> {
    fn deref_mut(&mut self) -> &mut Model {
        self.model
    }
}

impl Drop for Pinned<'_> {
    fn drop(&mut self) {
        for &(id, lower, upper) in self.saved.iter().rev() {
            self.model.set_bounds(id, lower, upper);
        }
    }
}

/// Variable values returned by a successful solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    values: Vec<f64>,
    objective: f64,
}

impl Assignment {
    pub fn new(values: Vec<f64>, objective: f64) -> Self {
        Self { values, objective }
    }

    pub fn value(&self, id: VarId) -> f64 {
        self.values[id.0]
    }

    pub fn values_of(&self, ids: &[VarId]) -> Vec<f64> {
        ids.iter().map(|&id| self.value(id)).collect()
    }

    pub fn eval(&self, expr: &LinExpr) -> f64 {
        expr.eval(&self.values)
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
