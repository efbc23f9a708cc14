//! Cassowary constraint solver.
//!
//! An implementation of the Cassowary linear arithmetic constraint solving
//! algorithm of Badros and Borning, using the incremental dual-simplex
//! formulation.  Edit variables follow the usual Cassowary treatment: a
//! suggestion shifts the tableau by the delta from the previous suggestion
//! and re-optimizes the dual, so repeated suggestions override each other.
//!
//! Constraints handed to [`Solver::add_constraint`] are queued and only
//! folded into the tableau by [`Solver::update_variables`]; contradictions
//! between required constraints are therefore reported at solve time.

use std::collections::HashMap;
use std::str::FromStr;

use indexmap::IndexMap;
use trellis_core::{ConfigError, ConstraintError};

/// Tolerance for floating-point comparisons inside the tableau.
pub const EPSILON: f64 = 1e-8;

fn near_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

/// Unique identifier for a solver variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable(pub(crate) usize);

impl Variable {
    /// The variable's index in its solver.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Symbols used internally in the tableau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Symbol {
    /// An external variable, the actual unknowns being solved for.
    External(usize),
    /// A slack variable introduced for an inequality.
    Slack(usize),
    /// An error variable introduced for a non-required constraint.
    Error(usize),
    /// A dummy variable introduced for a required equality.
    Dummy(usize),
}

impl Symbol {
    fn is_external(&self) -> bool {
        matches!(self, Symbol::External(_))
    }

    fn is_dummy(&self) -> bool {
        matches!(self, Symbol::Dummy(_))
    }

    fn is_pivotable(&self) -> bool {
        matches!(self, Symbol::Slack(_) | Symbol::Error(_))
    }
}

/// Constraint strength tiers, ordered weakest to strongest.
///
/// Non-required constraints may be violated when stronger constraints demand
/// it; the solver minimizes the strength-weighted violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strength {
    Weak,
    Medium,
    Strong,
    Required,
}

impl Strength {
    /// Objective weight of a violated constraint at this strength.
    pub fn weight(&self) -> f64 {
        match self {
            Strength::Weak => 1.0,
            Strength::Medium => 1e3,
            Strength::Strong => 1e6,
            Strength::Required => 1_001_001_000.0,
        }
    }

    /// Whether this is the required tier.
    pub fn is_required(&self) -> bool {
        matches!(self, Strength::Required)
    }
}

impl FromStr for Strength {
    type Err = ConfigError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "weak" => Ok(Strength::Weak),
            "medium" => Ok(Strength::Medium),
            "strong" => Ok(Strength::Strong),
            "required" => Ok(Strength::Required),
            other => Err(ConfigError::UnknownStrength { tag: other.to_string() }),
        }
    }
}

/// The relation of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

/// A linear expression: constant + sum of coefficient * variable.
///
/// A constraint holds the expression compared against zero, so
/// `x == y + 5` is expressed as `x - y - 5` with [`Relation::Equal`].
#[derive(Debug, Clone, Default)]
pub struct Expression {
    pub constant: f64,
    terms: IndexMap<Variable, f64>,
}

impl Expression {
    /// An empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn from_constant(value: f64) -> Self {
        Self {
            constant: value,
            terms: IndexMap::new(),
        }
    }

    /// An expression consisting of a single variable.
    pub fn from_variable(variable: Variable) -> Self {
        Self::new().term(variable, 1.0)
    }

    /// Add a term, merging with an existing coefficient for the variable.
    pub fn add_term(&mut self, variable: Variable, coefficient: f64) {
        let entry = self.terms.entry(variable).or_insert(0.0);
        *entry += coefficient;
        if near_zero(*entry) {
            self.terms.shift_remove(&variable);
        }
    }

    /// Builder form of [`Expression::add_term`].
    pub fn term(mut self, variable: Variable, coefficient: f64) -> Self {
        self.add_term(variable, coefficient);
        self
    }

    /// Builder form for the constant.
    pub fn minus(mut self, value: f64) -> Self {
        self.constant -= value;
        self
    }

    /// Iterate over the terms.
    pub fn terms(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.terms.iter().map(|(&v, &c)| (v, c))
    }
}

/// A constraint comparing an expression against zero.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub expression: Expression,
    pub relation: Relation,
    pub strength: Strength,
}

impl Constraint {
    pub fn new(expression: Expression, relation: Relation, strength: Strength) -> Self {
        Self {
            expression,
            relation,
            strength,
        }
    }
}

/// A row in the simplex tableau.
#[derive(Debug, Clone, Default)]
struct Row {
    constant: f64,
    cells: IndexMap<Symbol, f64>,
}

impl Row {
    fn new(constant: f64) -> Self {
        Self {
            constant,
            cells: IndexMap::new(),
        }
    }

    fn add(&mut self, symbol: Symbol, coefficient: f64) {
        let entry = self.cells.entry(symbol).or_insert(0.0);
        *entry += coefficient;
        if near_zero(*entry) {
            self.cells.shift_remove(&symbol);
        }
    }

    fn remove(&mut self, symbol: Symbol) {
        self.cells.shift_remove(&symbol);
    }

    fn coefficient(&self, symbol: Symbol) -> f64 {
        self.cells.get(&symbol).copied().unwrap_or(0.0)
    }

    fn reverse_sign(&mut self) {
        self.constant = -self.constant;
        for coeff in self.cells.values_mut() {
            *coeff = -*coeff;
        }
    }

    /// Make `symbol` the basic variable of this row: divide through so the
    /// row reads `symbol = constant + terms`.
    fn solve_for(&mut self, symbol: Symbol) {
        let Some(coeff) = self.cells.shift_remove(&symbol) else {
            return;
        };
        let multiplier = -1.0 / coeff;
        self.constant *= multiplier;
        for c in self.cells.values_mut() {
            *c *= multiplier;
        }
    }

    /// Pivot: make `rhs` basic in a row currently basic in `lhs`.
    fn solve_for_symbols(&mut self, lhs: Symbol, rhs: Symbol) {
        self.add(lhs, -1.0);
        self.solve_for(rhs);
    }

    /// Replace `symbol` with the right-hand side of its row.
    fn substitute(&mut self, symbol: Symbol, row: &Row) {
        if let Some(coeff) = self.cells.shift_remove(&symbol) {
            self.constant += coeff * row.constant;
            for (&sym, &c) in row.cells.iter() {
                self.add(sym, c * coeff);
            }
        }
    }
}

/// Marker symbols identifying a constraint inside the tableau.
#[derive(Debug, Clone, Copy)]
struct Tag {
    marker: Symbol,
    other: Option<Symbol>,
}

#[derive(Debug, Clone, Copy)]
struct EditInfo {
    tag: Tag,
    constant: f64,
}

/// The Cassowary constraint solver.
#[derive(Debug, Default)]
pub struct Solver {
    /// Current value of each external variable, indexed by variable id.
    values: Vec<f64>,
    /// Counter for slack/error/dummy symbol ids.
    symbol_counter: usize,
    /// The strength-weighted violation objective.
    objective: Row,
    /// Transient objective used while an artificial variable is in play.
    artificial: Option<Row>,
    /// Tableau rows keyed by their basic symbol.
    rows: IndexMap<Symbol, Row>,
    /// Registered edit variables.
    edits: HashMap<Variable, EditInfo>,
    /// Constraints accepted but not yet folded into the tableau.
    pending: Vec<Constraint>,
    /// Rows whose constants went negative and need a dual pass.
    infeasible_rows: Vec<Symbol>,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new variable, initially 0.
    pub fn new_variable(&mut self) -> Variable {
        let variable = Variable(self.values.len());
        self.values.push(0.0);
        variable
    }

    /// Current value of a variable, as of the last `update_variables` call.
    pub fn value(&self, variable: Variable) -> f64 {
        self.values.get(variable.0).copied().unwrap_or(0.0)
    }

    /// Queue a constraint.  It takes effect at the next
    /// [`Solver::update_variables`] call, which is where an unsatisfiable
    /// set of required constraints is reported.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.pending.push(constraint);
    }

    /// Register `variable` as an edit variable at the given strength.
    ///
    /// Edits take effect immediately so that suggestions can be applied
    /// before the next solve.
    pub fn add_edit_variable(
        &mut self,
        variable: Variable,
        strength: Strength,
    ) -> Result<(), ConstraintError> {
        if strength.is_required() {
            return Err(ConstraintError::InvalidEditStrength);
        }
        if self.edits.contains_key(&variable) {
            return Err(ConstraintError::DuplicateEditVariable);
        }
        let constraint = Constraint::new(
            Expression::from_variable(variable),
            Relation::Equal,
            strength,
        );
        let tag = self.add_constraint_now(&constraint)?;
        self.edits.insert(variable, EditInfo { tag, constant: 0.0 });
        Ok(())
    }

    /// Whether `variable` has a registered edit.
    pub fn has_edit_variable(&self, variable: Variable) -> bool {
        self.edits.contains_key(&variable)
    }

    /// Suggest a value for an edit variable.
    ///
    /// A later suggestion replaces an earlier one; suggestions never
    /// accumulate.  Suggesting the current value is a no-op.
    pub fn suggest_value(
        &mut self,
        variable: Variable,
        value: f64,
    ) -> Result<(), ConstraintError> {
        let (marker, other, delta) = {
            let info = self
                .edits
                .get_mut(&variable)
                .ok_or(ConstraintError::UnknownEditVariable)?;
            let delta = value - info.constant;
            info.constant = value;
            (info.tag.marker, info.tag.other, delta)
        };
        if near_zero(delta) {
            return Ok(());
        }
        self.apply_edit_delta(marker, other, delta);
        self.dual_optimize()
    }

    /// Fold queued constraints into the tableau and refresh all variable
    /// values.
    pub fn update_variables(&mut self) -> Result<(), ConstraintError> {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            for constraint in &pending {
                self.add_constraint_now(constraint)?;
            }
        }
        for id in 0..self.values.len() {
            self.values[id] = self
                .rows
                .get(&Symbol::External(id))
                .map_or(0.0, |row| row.constant);
        }
        Ok(())
    }

    fn new_symbol(&mut self, make: fn(usize) -> Symbol) -> Symbol {
        let id = self.symbol_counter;
        self.symbol_counter += 1;
        make(id)
    }

    fn add_constraint_now(&mut self, constraint: &Constraint) -> Result<Tag, ConstraintError> {
        let (mut row, tag) = self.create_row(constraint);
        let mut subject = Self::choose_subject(&row, &tag);

        if subject.is_none() && row.cells.keys().all(Symbol::is_dummy) {
            if !near_zero(row.constant) {
                return Err(ConstraintError::Unsatisfiable);
            }
            // Redundant constraint; park it on its marker.
            subject = Some(tag.marker);
        }

        match subject {
            Some(subject) => {
                row.solve_for(subject);
                self.substitute(subject, &row);
                self.rows.insert(subject, row);
            }
            None => {
                if !self.add_with_artificial_variable(&row)? {
                    return Err(ConstraintError::Unsatisfiable);
                }
            }
        }
        self.optimize(false)?;
        Ok(tag)
    }

    /// Translate a constraint into a tableau row, substituting any basic
    /// variables it references.
    fn create_row(&mut self, constraint: &Constraint) -> (Row, Tag) {
        let mut row = Row::new(constraint.expression.constant);
        for (variable, coeff) in constraint.expression.terms() {
            if near_zero(coeff) {
                continue;
            }
            let symbol = Symbol::External(variable.0);
            if let Some(basic) = self.rows.get(&symbol) {
                row.constant += coeff * basic.constant;
                for (&sym, &c) in basic.cells.iter() {
                    row.add(sym, c * coeff);
                }
            } else {
                row.add(symbol, coeff);
            }
        }

        let tag;
        match constraint.relation {
            Relation::LessOrEqual | Relation::GreaterOrEqual => {
                let coeff = if constraint.relation == Relation::LessOrEqual {
                    1.0
                } else {
                    -1.0
                };
                let slack = self.new_symbol(Symbol::Slack);
                row.add(slack, coeff);
                if constraint.strength.is_required() {
                    tag = Tag { marker: slack, other: None };
                } else {
                    let error = self.new_symbol(Symbol::Error);
                    row.add(error, -coeff);
                    self.objective.add(error, constraint.strength.weight());
                    tag = Tag { marker: slack, other: Some(error) };
                }
            }
            Relation::Equal => {
                if constraint.strength.is_required() {
                    let dummy = self.new_symbol(Symbol::Dummy);
                    row.add(dummy, 1.0);
                    tag = Tag { marker: dummy, other: None };
                } else {
                    let errplus = self.new_symbol(Symbol::Error);
                    let errminus = self.new_symbol(Symbol::Error);
                    row.add(errplus, -1.0);
                    row.add(errminus, 1.0);
                    self.objective.add(errplus, constraint.strength.weight());
                    self.objective.add(errminus, constraint.strength.weight());
                    tag = Tag { marker: errplus, other: Some(errminus) };
                }
            }
        }

        if row.constant < 0.0 {
            row.reverse_sign();
        }
        (row, tag)
    }

    /// Pick the symbol a new row should be solved for, if any.
    fn choose_subject(row: &Row, tag: &Tag) -> Option<Symbol> {
        for &symbol in row.cells.keys() {
            if symbol.is_external() {
                return Some(symbol);
            }
        }
        if tag.marker.is_pivotable() && row.coefficient(tag.marker) < 0.0 {
            return Some(tag.marker);
        }
        if let Some(other) = tag.other {
            if other.is_pivotable() && row.coefficient(other) < 0.0 {
                return Some(other);
            }
        }
        None
    }

    /// Introduce an artificial variable for a row with no viable subject.
    /// Returns false when the row cannot be satisfied.
    fn add_with_artificial_variable(&mut self, row: &Row) -> Result<bool, ConstraintError> {
        let art = self.new_symbol(Symbol::Slack);
        self.rows.insert(art, row.clone());
        self.artificial = Some(row.clone());
        self.optimize(true)?;

        let success = self
            .artificial
            .as_ref()
            .map_or(false, |obj| near_zero(obj.constant));
        self.artificial = None;

        if let Some(mut art_row) = self.rows.shift_remove(&art) {
            if art_row.cells.is_empty() {
                return Ok(success);
            }
            let entering = art_row
                .cells
                .keys()
                .copied()
                .find(Symbol::is_pivotable);
            let Some(entering) = entering else {
                return Ok(false);
            };
            art_row.solve_for_symbols(art, entering);
            self.substitute(entering, &art_row);
            self.rows.insert(entering, art_row);
        }

        for row in self.rows.values_mut() {
            row.remove(art);
        }
        self.objective.remove(art);
        Ok(success)
    }

    /// Replace `symbol` everywhere it appears parametrically.
    fn substitute(&mut self, symbol: Symbol, row: &Row) {
        for (&sym, r) in self.rows.iter_mut() {
            r.substitute(symbol, row);
            if !sym.is_external() && r.constant < 0.0 {
                self.infeasible_rows.push(sym);
            }
        }
        self.objective.substitute(symbol, row);
        if let Some(artificial) = &mut self.artificial {
            artificial.substitute(symbol, row);
        }
    }

    /// Primal simplex: pivot until the chosen objective has no negative
    /// coefficients.
    fn optimize(&mut self, use_artificial: bool) -> Result<(), ConstraintError> {
        loop {
            let entering = {
                let objective = if use_artificial {
                    match &self.artificial {
                        Some(row) => row,
                        None => return Err(ConstraintError::Internal("missing artificial objective")),
                    }
                } else {
                    &self.objective
                };
                objective
                    .cells
                    .iter()
                    .find(|(sym, coeff)| !sym.is_dummy() && **coeff < -EPSILON)
                    .map(|(&sym, _)| sym)
            };
            let Some(entering) = entering else {
                return Ok(());
            };
            let Some((leaving, mut row)) = self.take_leaving_row(entering) else {
                return Err(ConstraintError::Internal("the objective is unbounded"));
            };
            row.solve_for_symbols(leaving, entering);
            self.substitute(entering, &row);
            self.rows.insert(entering, row);
        }
    }

    /// Minimum-ratio test for the leaving row.
    fn take_leaving_row(&mut self, entering: Symbol) -> Option<(Symbol, Row)> {
        let mut min_ratio = f64::INFINITY;
        let mut found = None;
        for (&symbol, row) in &self.rows {
            if symbol.is_external() {
                continue;
            }
            let coeff = row.coefficient(entering);
            if coeff < -EPSILON {
                let ratio = -row.constant / coeff;
                if ratio < min_ratio {
                    min_ratio = ratio;
                    found = Some(symbol);
                }
            }
        }
        found.and_then(|symbol| self.rows.shift_remove(&symbol).map(|row| (symbol, row)))
    }

    /// Shift the tableau for an edit-variable delta.
    fn apply_edit_delta(&mut self, marker: Symbol, other: Option<Symbol>, delta: f64) {
        if let Some(row) = self.rows.get_mut(&marker) {
            row.constant -= delta;
            if row.constant < 0.0 {
                self.infeasible_rows.push(marker);
            }
            return;
        }
        if let Some(other) = other {
            if let Some(row) = self.rows.get_mut(&other) {
                row.constant += delta;
                if row.constant < 0.0 {
                    self.infeasible_rows.push(other);
                }
                return;
            }
        }
        for (&symbol, row) in self.rows.iter_mut() {
            let coeff = row.coefficient(marker);
            if coeff != 0.0 {
                row.constant += coeff * delta;
                if row.constant < 0.0 && !symbol.is_external() {
                    self.infeasible_rows.push(symbol);
                }
            }
        }
    }

    /// Dual simplex: restore feasibility after edit deltas while keeping the
    /// objective optimal.
    fn dual_optimize(&mut self) -> Result<(), ConstraintError> {
        while let Some(leaving) = self.infeasible_rows.pop() {
            let entering = match self.rows.get(&leaving) {
                Some(row) if row.constant < 0.0 => {
                    let mut min_ratio = f64::INFINITY;
                    let mut found = None;
                    for (&symbol, &coeff) in row.cells.iter() {
                        if coeff > EPSILON && !symbol.is_dummy() {
                            let ratio = self.objective.coefficient(symbol) / coeff;
                            if ratio < min_ratio {
                                min_ratio = ratio;
                                found = Some(symbol);
                            }
                        }
                    }
                    match found {
                        Some(symbol) => symbol,
                        None => {
                            return Err(ConstraintError::Internal(
                                "dual optimize found no entering symbol",
                            ))
                        }
                    }
                }
                _ => continue,
            };
            if let Some(mut row) = self.rows.shift_remove(&leaving) {
                row.solve_for_symbols(leaving, entering);
                self.substitute(entering, &row);
                self.rows.insert(entering, row);
            }
        }
        Ok(())
    }
}
