//! The model: entity records, the pending-change queue and its synchronization with a
//! [Solver], objective composition and attribute dispatch.
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::convert::{TryFrom, TryInto};
use std::ops::RangeBounds;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::attr::{self, AttrKey, AttrSpec, EntityKind, Resolved, Storage, UserFields, Value};
use crate::column::Column;
use crate::entity::{
    ConstrRecord, ConstrSolution, Entity, EntityState, Lifecycle, VarRecord, VarSolution,
};
use crate::error::{Error, Result};
use crate::expr::{LinExpr, TempConstr};
use crate::highs::HighsSolver;
use crate::pwl::{PiecewiseLinear, PwlExtrapolation, PwlFragment};
use crate::solver::{NativeAttr, ParamValue, Solver, Status};
use crate::{range_to_bounds, ConstrSense, Constr, Sense, Var, VarType, INFINITY};

static NEXT_MODEL_ID: AtomicU32 = AtomicU32::new(0);

/// Description of a variable to add with [Model::add_var]
#[derive(Clone, Debug, PartialEq)]
pub struct VarSpec {
    lb: f64,
    ub: f64,
    obj: f64,
    vtype: VarType,
    name: Option<String>,
    column: Column,
}

impl Default for VarSpec {
    fn default() -> Self {
        Self {
            lb: 0.,
            ub: INFINITY,
            obj: 0.,
            vtype: VarType::Continuous,
            name: None,
            column: Column::new(),
        }
    }
}

impl VarSpec {
    /// A continuous variable in `[0, +∞)`, with no objective coefficient
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower bound
    pub fn lb(mut self, lb: f64) -> Self {
        self.lb = lb;
        self
    }

    /// Upper bound
    pub fn ub(mut self, ub: f64) -> Self {
        self.ub = ub;
        self
    }

    /// Both bounds from a range; open ends are infinite.
    ///
    /// ```
    /// # use linmodel::VarSpec;
    /// let free = VarSpec::new().bounds::<f64, _>(..);
    /// let small = VarSpec::new().bounds(-1..=1);
    /// # let _ = (free, small);
    /// ```
    pub fn bounds<N: Into<f64> + Copy, B: RangeBounds<N>>(mut self, bounds: B) -> Self {
        let (lb, ub) = range_to_bounds(bounds);
        self.lb = lb;
        self.ub = ub;
        self
    }

    /// Linear objective coefficient
    pub fn obj(mut self, obj: f64) -> Self {
        self.obj = obj;
        self
    }

    /// Variable type
    pub fn vtype(mut self, vtype: VarType) -> Self {
        self.vtype = vtype;
        self
    }

    /// Name; defaults to `C<k>` with `k` the creation ordinal
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Coefficients of the new variable in existing constraints
    pub fn column(mut self, column: Column) -> Self {
        self.column = column;
        self
    }
}

/// Changes made since the last synchronization
#[derive(Debug, Default)]
struct PendingChanges {
    new_vars: VecDeque<usize>,
    new_constrs: VecDeque<usize>,
    removed_vars: Vec<usize>,
    removed_constrs: Vec<usize>,
    /// `(kind, ordinal, attribute)` of materialized entities whose local value changed
    dirty: BTreeSet<(EntityKind, usize, NativeAttr)>,
    /// `(constraint ordinal, variable ordinal, value)` between materialized entities
    coeffs: VecDeque<(usize, usize, f64)>,
    pwl_dirty: bool,
}

impl PendingChanges {
    fn is_empty(&self) -> bool {
        self.new_vars.is_empty()
            && self.new_constrs.is_empty()
            && self.removed_vars.is_empty()
            && self.removed_constrs.is_empty()
            && self.dirty.is_empty()
            && self.coeffs.is_empty()
            && !self.pwl_dirty
    }
}

/// A linear or mixed-integer program under construction.
///
/// The model is in one of two states. It is *pending* while it holds changes the solver
/// has not seen, and *synchronized* otherwise. Every structural edit and every attribute
/// write on a materialized entity makes it pending; [Model::update] pushes everything, in
/// creation order, and makes it synchronized again.
pub struct Model<S: Solver = HighsSolver> {
    id: u32,
    solver: S,
    name: String,
    sense: Sense,
    obj_con: f64,
    vars: Vec<VarRecord>,
    constrs: Vec<ConstrRecord>,
    pwl: Vec<(Var, PiecewiseLinear)>,
    pwl_extrapolation: PwlExtrapolation,
    range_count: usize,
    pending: PendingChanges,
    status: Status,
    obj_val: Option<f64>,
    user: UserFields,
}

impl Model<HighsSolver> {
    /// Create an empty model backed by a fresh, quiet HiGHS instance
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self::with_solver(name, HighsSolver::new()?))
    }
}

/// Load a model file (MPS or LP, as understood by HiGHS)
pub fn read(path: impl AsRef<Path>) -> Result<Model> {
    Model::from_file(HighsSolver::new()?, path)
}

impl<S: Solver> Model<S> {
    /// Create an empty model around a solver holding no entity
    pub fn with_solver(name: &str, solver: S) -> Self {
        let id = NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("Creating model {:?} (#{})", name, id);
        Self {
            id,
            solver,
            name: name.to_owned(),
            sense: Sense::Minimise,
            obj_con: 0.,
            vars: Vec::new(),
            constrs: Vec::new(),
            pwl: Vec::new(),
            pwl_extrapolation: PwlExtrapolation::default(),
            range_count: 0,
            pending: PendingChanges::default(),
            status: Status::Loaded,
            obj_val: None,
            user: UserFields::default(),
        }
    }

    /// Let `solver` load a model file, then wrap what it holds.
    /// The model is synchronized and named after the file stem.
    pub fn from_file(mut solver: S, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        solver.load_model(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut model = Self::with_solver(&name, solver);
        model.sense = model
            .solver
            .get_entity_attribute(EntityKind::Model, 0, NativeAttr::ObjSense)?
            .try_into()?;
        model.obj_con = model
            .solver
            .get_entity_attribute(EntityKind::Model, 0, NativeAttr::ObjOffset)?
            .to_f64("ObjCon")?;
        for i in 0..model.solver.entity_count(EntityKind::Var) {
            let get = |attr| model.solver.get_entity_attribute(EntityKind::Var, i, attr);
            let record = VarRecord {
                state: EntityState::materialized(i),
                lb: get(NativeAttr::ColLower)?.to_f64("LB")?,
                ub: get(NativeAttr::ColUpper)?.to_f64("UB")?,
                obj: get(NativeAttr::ColCost)?.to_f64("Obj")?,
                vtype: get(NativeAttr::ColType)?.try_into()?,
                name: get(NativeAttr::ColName)?.to_text("VarName")?,
                column: Vec::new(),
                solution: None,
            };
            model.vars.push(record);
        }
        for i in 0..model.solver.entity_count(EntityKind::Constr) {
            let get = |attr| model.solver.get_entity_attribute(EntityKind::Constr, i, attr);
            let record = ConstrRecord {
                state: EntityState::materialized(i),
                row: model.solver.constraint_row(i)?,
                sense: get(NativeAttr::RowSense)?.try_into()?,
                rhs: get(NativeAttr::RowRhs)?.to_f64("RHS")?,
                name: get(NativeAttr::RowName)?.to_text("ConstrName")?,
                solution: None,
            };
            model.constrs.push(record);
        }
        log::debug!(
            "Loaded {} variables and {} constraints from {}",
            model.vars.len(),
            model.constrs.len(),
            path.display()
        );
        Ok(model)
    }

    fn var_handle(&self, ordinal: usize) -> Var {
        Var {
            model: self.id,
            ordinal: ordinal as u32,
        }
    }

    fn constr_handle(&self, ordinal: usize) -> Constr {
        Constr {
            model: self.id,
            ordinal: ordinal as u32,
        }
    }

    fn state(&self, kind: EntityKind, ordinal: usize) -> Option<&EntityState> {
        match kind {
            EntityKind::Var => self.vars.get(ordinal).map(|r| &r.state),
            EntityKind::Constr => self.constrs.get(ordinal).map(|r| &r.state),
            EntityKind::Model => None,
        }
    }

    /// Ordinal of a live entity of this model
    fn check<E: Entity>(&self, entity: E) -> Result<usize> {
        let ordinal = entity.ordinal();
        let foreign = Error::ForeignEntity {
            kind: E::KIND,
            ordinal,
        };
        if entity.model_id() != self.id {
            return Err(foreign);
        }
        match self.state(E::KIND, ordinal) {
            Some(state) if state.is_removed() => Err(Error::EntityInvalid {
                kind: E::KIND,
                ordinal,
            }),
            Some(_) => Ok(ordinal),
            None => Err(foreign),
        }
    }

    /// Queue a native attribute write if the entity already exists in the solver.
    /// Pending entities are created with their current values anyway.
    fn touch(&mut self, kind: EntityKind, ordinal: usize, attr: NativeAttr) {
        let materialized = match kind {
            EntityKind::Model => true,
            kind => self
                .state(kind, ordinal)
                .map_or(false, |s| s.native().is_some()),
        };
        if materialized {
            self.pending.dirty.insert((kind, ordinal, attr));
            // the native bounds of a binary column depend on its type
            if attr == NativeAttr::ColType {
                self.pending.dirty.insert((kind, ordinal, NativeAttr::ColLower));
                self.pending.dirty.insert((kind, ordinal, NativeAttr::ColUpper));
            }
        }
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Add a variable. It reaches the solver at the next synchronization, but the handle
    /// can be used right away in expressions and for attribute access.
    pub fn add_var(&mut self, spec: VarSpec) -> Result<Var> {
        let ordinal = self.vars.len();
        let mut column = Vec::with_capacity(spec.column.len());
        for &(constr, coeff) in spec.column.entries() {
            column.push((self.check(constr)?, coeff));
        }
        for &(c, coeff) in &column {
            self.constrs[c].row.push((ordinal, coeff));
        }
        self.vars.push(VarRecord {
            state: EntityState::pending(),
            lb: spec.lb,
            ub: spec.ub,
            obj: spec.obj,
            vtype: spec.vtype,
            name: spec.name.unwrap_or_else(|| format!("C{}", ordinal)),
            column,
            solution: None,
        });
        self.pending.new_vars.push_back(ordinal);
        Ok(self.var_handle(ordinal))
    }

    /// Add the constraint `row sense rhs` obtained by moving every term of `constr` to
    /// the left and every constant to the right. An empty `name` stands for `R<k>` with
    /// `k` the creation ordinal.
    pub fn add_constr(&mut self, constr: TempConstr, name: &str) -> Result<Constr> {
        let (expr, sense, rhs) = constr.into_row();
        let mut row = Vec::with_capacity(expr.len());
        for (var, coeff) in expr.terms() {
            row.push((self.check(var)?, coeff));
        }
        let ordinal = self.constrs.len();
        let name = if name.is_empty() {
            format!("R{}", ordinal)
        } else {
            name.to_owned()
        };
        self.constrs.push(ConstrRecord {
            state: EntityState::pending(),
            row,
            sense,
            rhs,
            name,
            solution: None,
        });
        self.pending.new_constrs.push_back(ordinal);
        Ok(self.constr_handle(ordinal))
    }

    /// Add `lower <= expr <= upper` as the equality `expr - r = lower`, where `r` is a new
    /// variable in `[0, upper - lower]` named `RgR<n>`, `n` counting the calls to this
    /// method on the model.
    ///
    /// ```
    /// # use linmodel::{Model, VarSpec};
    /// let mut model = Model::new("ranges").unwrap();
    /// let x = model.add_var(VarSpec::new()).unwrap();
    /// model.add_range(2. * x, 1., 5., "").unwrap();
    /// model.update().unwrap();
    /// let aux = model.get_var_by_name("RgR0").unwrap();
    /// assert_eq!(aux.ub(&model).unwrap(), 4.);
    /// ```
    pub fn add_range(
        &mut self,
        expr: impl Into<LinExpr>,
        lower: f64,
        upper: f64,
        name: &str,
    ) -> Result<Constr> {
        if !lower.is_finite() {
            return Err(Error::invalid("the lower end of a range must be finite"));
        }
        if lower > upper {
            return Err(Error::invalid(format!(
                "empty range [{}, {}]",
                lower, upper
            )));
        }
        let expr = expr.into();
        for (var, _) in expr.terms() {
            self.check(var)?;
        }
        let aux = self.add_var(
            VarSpec::new()
                .ub(upper - lower)
                .name(format!("RgR{}", self.range_count)),
        )?;
        self.range_count += 1;
        self.add_constr(TempConstr::new(expr - aux, ConstrSense::Equal, lower), name)
    }

    /// Remove a variable. The handle becomes invalid immediately; the solver forgets the
    /// column at the next synchronization.
    pub fn remove_var(&mut self, var: Var) -> Result<()> {
        let ordinal = self.check(var)?;
        let record = &mut self.vars[ordinal];
        match record.state.lifecycle {
            Lifecycle::Pending => self.pending.new_vars.retain(|&o| o != ordinal),
            Lifecycle::Materialized(native) => {
                record.state.stale_native = Some(native);
                self.pending.removed_vars.push(ordinal);
            }
            Lifecycle::Removed => {}
        }
        record.state.lifecycle = Lifecycle::Removed;
        record.solution = None;
        let before = self.pwl.len();
        self.pwl.retain(|(v, _)| *v != var);
        if self.pwl.len() != before {
            self.pending.pwl_dirty = true;
        }
        Ok(())
    }

    /// Remove a constraint, see [Model::remove_var]
    pub fn remove_constr(&mut self, constr: Constr) -> Result<()> {
        let ordinal = self.check(constr)?;
        let record = &mut self.constrs[ordinal];
        match record.state.lifecycle {
            Lifecycle::Pending => self.pending.new_constrs.retain(|&o| o != ordinal),
            Lifecycle::Materialized(native) => {
                record.state.stale_native = Some(native);
                self.pending.removed_constrs.push(ordinal);
            }
            Lifecycle::Removed => {}
        }
        record.state.lifecycle = Lifecycle::Removed;
        record.solution = None;
        Ok(())
    }

    /// Set the coefficient of `var` in `constr`, replacing any previous one.
    /// A zero value removes the variable from the row.
    pub fn chg_coeff(&mut self, constr: Constr, var: Var, value: f64) -> Result<()> {
        let c = self.check(constr)?;
        let v = self.check(var)?;
        let row = &mut self.constrs[c].row;
        row.retain(|&(o, _)| o != v);
        if value != 0. {
            row.push((v, value));
        }
        let constr_native = self.constrs[c].state.native();
        let var_record = &mut self.vars[v];
        match (constr_native, var_record.state.native()) {
            (Some(_), Some(_)) => self.pending.coeffs.push_back((c, v, value)),
            // the column is handed to the solver when the variable is created
            (Some(_), None) => {
                var_record.column.retain(|&(o, _)| o != c);
                var_record.column.push((c, value));
            }
            // a pending constraint is created from its local row
            (None, _) => {}
        }
        Ok(())
    }

    /// The left hand side of a constraint, in insertion order
    pub fn get_row(&self, constr: Constr) -> Result<LinExpr> {
        let ordinal = self.check(constr)?;
        let mut expr = LinExpr::new();
        for &(v, coeff) in &self.constrs[ordinal].row {
            if !self.vars[v].state.is_removed() {
                expr.add_term(coeff, self.var_handle(v));
            }
        }
        Ok(expr)
    }

    /// Variables known to the solver, in native order
    pub fn get_vars(&self) -> Vec<Var> {
        (0..self.vars.len())
            .filter(|&o| self.vars[o].state.native().is_some())
            .map(|o| self.var_handle(o))
            .collect()
    }

    /// Constraints known to the solver, in native order
    pub fn get_constrs(&self) -> Vec<Constr> {
        (0..self.constrs.len())
            .filter(|&o| self.constrs[o].state.native().is_some())
            .map(|o| self.constr_handle(o))
            .collect()
    }

    /// First variable, in creation order, known to the solver under this exact name
    pub fn get_var_by_name(&self, name: &str) -> Option<Var> {
        self.vars
            .iter()
            .position(|r| r.state.native().is_some() && r.name == name)
            .map(|o| self.var_handle(o))
    }

    /// First constraint, in creation order, known to the solver under this exact name
    pub fn get_constr_by_name(&self, name: &str) -> Option<Constr> {
        self.constrs
            .iter()
            .position(|r| r.state.native().is_some() && r.name == name)
            .map(|o| self.constr_handle(o))
    }

    // ------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------

    /// True when the solver has seen every change made to the model
    pub fn is_synchronized(&self) -> bool {
        self.pending.is_empty()
    }

    /// Push every pending change to the solver: removals first, then attribute writes on
    /// existing entities, then new variables and new constraints in creation order,
    /// coefficient changes, and finally the piecewise-linear objective.
    /// Does nothing when the model is already synchronized.
    ///
    /// A change leaves the queue once the solver has accepted it. After an error the model
    /// stays pending with what is still missing, and the next call resumes from there.
    pub fn update(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        log::debug!(
            "Synchronizing model {:?}: +{} variables, +{} constraints, -{} variables, -{} constraints, {} attribute writes",
            self.name,
            self.pending.new_vars.len(),
            self.pending.new_constrs.len(),
            self.pending.removed_vars.len(),
            self.pending.removed_constrs.len(),
            self.pending.dirty.len()
        );
        self.apply_removals()?;
        while let Some(&(kind, ordinal, attr)) = self.pending.dirty.first() {
            self.flush_attribute(kind, ordinal, attr)?;
            self.pending.dirty.remove(&(kind, ordinal, attr));
        }
        while let Some(&ordinal) = self.pending.new_vars.front() {
            self.materialize_var(ordinal)?;
            self.pending.new_vars.pop_front();
        }
        while let Some(&ordinal) = self.pending.new_constrs.front() {
            self.materialize_constr(ordinal)?;
            self.pending.new_constrs.pop_front();
        }
        while let Some(&(c, v, value)) = self.pending.coeffs.front() {
            if let (Some(row), Some(col)) =
                (self.constrs[c].state.native(), self.vars[v].state.native())
            {
                self.solver.change_coefficient(row, col, value)?;
            }
            self.pending.coeffs.pop_front();
        }
        if self.pending.pwl_dirty {
            let fragments = self.pwl_fragments();
            self.solver
                .set_pwl_objective(&fragments, self.pwl_extrapolation)?;
            self.pending.pwl_dirty = false;
        }
        self.verify_counts()
    }

    /// Same as [Model::update]
    pub fn synchronize(&mut self) -> Result<()> {
        self.update()
    }

    fn apply_removals(&mut self) -> Result<()> {
        if !self.pending.removed_vars.is_empty() {
            let mut natives: Vec<usize> = self
                .pending
                .removed_vars
                .iter()
                .filter_map(|&o| self.vars[o].state.stale_native)
                .collect();
            natives.sort_unstable();
            self.solver.remove_variables(&natives)?;
            for ordinal in std::mem::take(&mut self.pending.removed_vars) {
                self.vars[ordinal].state.stale_native = None;
            }
            renumber(self.vars.iter_mut().map(|r| &mut r.state));
            // fragments address columns by native index, which removals shift
            self.pending.pwl_dirty |= !self.pwl.is_empty();
        }
        if !self.pending.removed_constrs.is_empty() {
            let mut natives: Vec<usize> = self
                .pending
                .removed_constrs
                .iter()
                .filter_map(|&o| self.constrs[o].state.stale_native)
                .collect();
            natives.sort_unstable();
            self.solver.remove_constraints(&natives)?;
            for ordinal in std::mem::take(&mut self.pending.removed_constrs) {
                self.constrs[ordinal].state.stale_native = None;
            }
            renumber(self.constrs.iter_mut().map(|r| &mut r.state));
        }
        Ok(())
    }

    fn local_native_value(
        &self,
        kind: EntityKind,
        ordinal: usize,
        attr: NativeAttr,
    ) -> Option<Value> {
        Some(match (kind, attr) {
            (EntityKind::Var, attr) => {
                let r = &self.vars[ordinal];
                match attr {
                    NativeAttr::ColLower => r.native_bounds().0.into(),
                    NativeAttr::ColUpper => r.native_bounds().1.into(),
                    NativeAttr::ColCost => r.obj.into(),
                    NativeAttr::ColType => r.vtype.into(),
                    NativeAttr::ColName => r.name.as_str().into(),
                    _ => return None,
                }
            }
            (EntityKind::Constr, attr) => {
                let r = &self.constrs[ordinal];
                match attr {
                    NativeAttr::RowRhs => r.rhs.into(),
                    NativeAttr::RowSense => r.sense.into(),
                    NativeAttr::RowName => r.name.as_str().into(),
                    _ => return None,
                }
            }
            (EntityKind::Model, NativeAttr::ObjSense) => self.sense.into(),
            (EntityKind::Model, NativeAttr::ObjOffset) => self.obj_con.into(),
            (EntityKind::Model, _) => return None,
        })
    }

    fn flush_attribute(
        &mut self,
        kind: EntityKind,
        ordinal: usize,
        attr: NativeAttr,
    ) -> Result<()> {
        let index = match kind {
            EntityKind::Model => 0,
            kind => match self.state(kind, ordinal).and_then(|s| s.native()) {
                Some(index) => index,
                None => return Ok(()),
            },
        };
        if let Some(value) = self.local_native_value(kind, ordinal, attr) {
            log::trace!("Setting {:?} of {} #{} to {}", attr, kind, index, value);
            self.solver.set_entity_attribute(kind, index, attr, &value)?;
        }
        Ok(())
    }

    fn materialize_var(&mut self, ordinal: usize) -> Result<()> {
        let record = &self.vars[ordinal];
        if record.state.lifecycle != Lifecycle::Pending {
            return Ok(());
        }
        // entries for pending constraints are already part of their rows
        let column = merge_duplicates(
            record
                .column
                .iter()
                .filter_map(|&(c, coeff)| self.constrs[c].state.native().map(|n| (n, coeff))),
        );
        let (lb, ub) = record.native_bounds();
        let index = self.solver.allocate_variable(
            lb,
            ub,
            record.obj,
            record.vtype,
            &record.name,
            &column,
        )?;
        let record = &mut self.vars[ordinal];
        record.state.lifecycle = Lifecycle::Materialized(index);
        record.column.clear();
        Ok(())
    }

    fn materialize_constr(&mut self, ordinal: usize) -> Result<()> {
        let record = &self.constrs[ordinal];
        if record.state.lifecycle != Lifecycle::Pending {
            return Ok(());
        }
        let row = merge_duplicates(
            record
                .row
                .iter()
                .filter_map(|&(v, coeff)| self.vars[v].state.native().map(|n| (n, coeff))),
        );
        let index =
            self.solver
                .allocate_constraint(&row, record.sense, record.rhs, &record.name)?;
        self.constrs[ordinal].state.lifecycle = Lifecycle::Materialized(index);
        Ok(())
    }

    fn pwl_fragments(&self) -> Vec<PwlFragment> {
        self.pwl
            .iter()
            .filter_map(|(var, function)| {
                self.vars[var.ordinal()].state.native().map(|col| PwlFragment {
                    col,
                    function: function.clone(),
                })
            })
            .collect()
    }

    fn verify_counts(&self) -> Result<()> {
        let expected = [
            (EntityKind::Var, self.vars.iter().filter(|r| r.state.native().is_some()).count()),
            (
                EntityKind::Constr,
                self.constrs.iter().filter(|r| r.state.native().is_some()).count(),
            ),
        ];
        for (kind, model) in expected {
            let solver = self.solver.entity_count(kind);
            if solver != model {
                return Err(Error::SyncMismatch {
                    kind,
                    model,
                    solver,
                });
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Optimization
    // ------------------------------------------------------------------

    /// Synchronize if needed, solve, and cache the results on every entity.
    /// When the solver produces no solution the caches are cleared and only the status
    /// changes.
    pub fn optimize(&mut self) -> Result<()> {
        self.update()?;
        log::debug!(
            "Optimizing model {:?} with {} variables and {} constraints",
            self.name,
            self.num_vars(),
            self.num_constrs()
        );
        self.clear_solution();
        self.status = Status::Loaded;
        self.status = self.solver.run_optimization()?;
        log::debug!("Model {:?} solved with status {}", self.name, self.status);
        if self.solver.has_solution() {
            self.cache_solution()?;
        }
        Ok(())
    }

    fn clear_solution(&mut self) {
        self.vars.iter_mut().for_each(|r| r.solution = None);
        self.constrs.iter_mut().for_each(|r| r.solution = None);
        self.obj_val = None;
    }

    fn cache_solution(&mut self) -> Result<()> {
        let solver = &self.solver;
        for record in &mut self.vars {
            if let Some(i) = record.state.native() {
                let get = |attr| solver.get_entity_attribute(EntityKind::Var, i, attr);
                record.solution = Some(VarSolution {
                    x: get(NativeAttr::ColValue)?.to_f64("X")?,
                    rc: optional(get(NativeAttr::ColDual), "RC")?,
                    start: get(NativeAttr::ColStart)?.to_f64("Start")?,
                });
            }
        }
        for record in &mut self.constrs {
            if let Some(i) = record.state.native() {
                let get = |attr| solver.get_entity_attribute(EntityKind::Constr, i, attr);
                record.solution = Some(ConstrSolution {
                    pi: optional(get(NativeAttr::RowDual), "Pi")?,
                    slack: get(NativeAttr::RowSlack)?.to_f64("Slack")?,
                });
            }
        }
        self.obj_val = Some(self.objective_value()?);
        Ok(())
    }

    /// Linear part plus constant plus every piecewise-linear fragment, at the cached solution
    fn objective_value(&self) -> Result<f64> {
        let mut total = self.obj_con;
        for (ordinal, record) in self.vars.iter().enumerate() {
            if record.obj != 0. && record.state.native().is_some() {
                total += record.obj * self.solution_value(self.var_handle(ordinal))?;
            }
        }
        for (var, function) in &self.pwl {
            if self.vars[var.ordinal()].state.native().is_some() {
                total += function.eval(self.solution_value(*var)?, self.pwl_extrapolation);
            }
        }
        Ok(total)
    }

    /// Forget the results of the last optimization and the solver's warm-start state.
    /// Entities, their attributes and pending changes are kept.
    pub fn reset(&mut self) -> Result<()> {
        log::debug!("Resetting model {:?}", self.name);
        self.clear_solution();
        self.status = Status::Loaded;
        self.solver.reset()
    }

    pub(crate) fn solution_value(&self, var: Var) -> Result<f64> {
        let ordinal = self.check(var)?;
        self.vars[ordinal]
            .solution
            .map(|s| s.x)
            .ok_or(Error::AttributeNotAvailable {
                kind: EntityKind::Var,
                name: "X",
            })
    }

    // ------------------------------------------------------------------
    // Objective
    // ------------------------------------------------------------------

    /// Replace the whole objective: linear coefficients, constant and piecewise-linear
    /// fragments. The sense is only changed when given.
    pub fn set_objective(
        &mut self,
        expr: impl Into<LinExpr>,
        sense: Option<Sense>,
    ) -> Result<()> {
        let expr = expr.into();
        let mut obj = vec![0.; self.vars.len()];
        for (var, coeff) in expr.terms() {
            obj[self.check(var)?] += coeff;
        }
        for (ordinal, &value) in obj.iter().enumerate() {
            let record = &mut self.vars[ordinal];
            if record.obj != value && !record.state.is_removed() {
                record.obj = value;
                self.touch(EntityKind::Var, ordinal, NativeAttr::ColCost);
            }
        }
        if self.obj_con != expr.constant() {
            self.obj_con = expr.constant();
            self.touch(EntityKind::Model, 0, NativeAttr::ObjOffset);
        }
        if let Some(sense) = sense {
            self.set_sense(sense);
        }
        if !self.pwl.is_empty() {
            self.pwl.clear();
            self.pending.pwl_dirty = true;
        }
        Ok(())
    }

    /// Add `f(var)` to the objective, `f` interpolating the points `(xs[i], ys[i])`.
    /// Fragments accumulate, including several on the same variable.
    pub fn set_pwl_obj(&mut self, var: Var, xs: &[f64], ys: &[f64]) -> Result<()> {
        self.check(var)?;
        let function = PiecewiseLinear::new(xs, ys)?;
        self.pwl.push((var, function));
        self.pending.pwl_dirty = true;
        Ok(())
    }

    /// The linear objective: non-zero coefficients of the live variables in creation
    /// order, plus the objective constant
    pub fn get_objective(&self) -> LinExpr {
        let mut expr = LinExpr::constant_expr(self.obj_con);
        for (ordinal, record) in self.vars.iter().enumerate() {
            if record.obj != 0. && !record.state.is_removed() {
                expr.add_term(record.obj, self.var_handle(ordinal));
            }
        }
        expr
    }

    /// How piecewise-linear fragments behave outside their breakpoints
    pub fn pwl_extrapolation(&self) -> PwlExtrapolation {
        self.pwl_extrapolation
    }

    /// Change how piecewise-linear fragments behave outside their breakpoints
    pub fn set_pwl_extrapolation(&mut self, extrapolation: PwlExtrapolation) {
        if self.pwl_extrapolation != extrapolation {
            self.pwl_extrapolation = extrapolation;
            self.pending.pwl_dirty |= !self.pwl.is_empty();
        }
    }

    /// Optimization sense
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Change the optimization sense (minimize by default)
    pub fn set_sense(&mut self, sense: Sense) {
        if self.sense != sense {
            self.sense = sense;
            self.touch(EntityKind::Model, 0, NativeAttr::ObjSense);
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Read an attribute of a variable or a constraint.
    ///
    /// The name is looked up without regard to case. Names starting with `_` are user
    /// fields, stored on the entity and never seen by the solver.
    pub fn get<E: Entity>(&self, entity: E, name: &str) -> Result<Value> {
        let ordinal = self.check(entity)?;
        let kind = E::KIND;
        match attr::resolve(kind, name)? {
            Resolved::UserField(name) => self.user_fields(kind, ordinal).get(kind, name),
            Resolved::Schema(spec) => match kind {
                EntityKind::Var => self.var_attr(ordinal, spec),
                EntityKind::Constr => self.constr_attr(ordinal, spec),
                EntityKind::Model => self.model_attr(spec),
            },
        }
    }

    /// Write an attribute of a variable or a constraint. The new value is visible at once
    /// through [Model::get] and reaches the solver at the next synchronization.
    pub fn set<E: Entity>(
        &mut self,
        entity: E,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let ordinal = self.check(entity)?;
        let kind = E::KIND;
        let value = value.into();
        let spec = match attr::resolve(kind, name)? {
            Resolved::UserField(name) => {
                self.user_fields_mut(kind, ordinal).set(name, value);
                return Ok(());
            }
            Resolved::Schema(spec) => writable(kind, spec)?,
        };
        match kind {
            EntityKind::Var => self.set_var_attr(ordinal, spec, value),
            EntityKind::Constr => self.set_constr_attr(ordinal, spec, value),
            EntityKind::Model => self.set_model_attr(spec, value),
        }
    }

    /// Read an attribute on several entities at once
    pub fn get_attr_list<E: Entity>(&self, name: &str, entities: &[E]) -> Result<Vec<Value>> {
        entities.iter().map(|&e| self.get(e, name)).collect()
    }

    /// Read a model attribute
    pub fn get_attr(&self, name: &str) -> Result<Value> {
        match attr::resolve(EntityKind::Model, name)? {
            Resolved::UserField(name) => self.user.get(EntityKind::Model, name),
            Resolved::Schema(spec) => self.model_attr(spec),
        }
    }

    /// Write a model attribute
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match attr::resolve(EntityKind::Model, name)? {
            Resolved::UserField(name) => {
                self.user.set(name, value);
                Ok(())
            }
            Resolved::Schema(spec) => {
                let spec = writable(EntityKind::Model, spec)?;
                self.set_model_attr(spec, value)
            }
        }
    }

    fn user_fields(&self, kind: EntityKind, ordinal: usize) -> &UserFields {
        match kind {
            EntityKind::Var => &self.vars[ordinal].state.user,
            EntityKind::Constr => &self.constrs[ordinal].state.user,
            EntityKind::Model => &self.user,
        }
    }

    fn user_fields_mut(&mut self, kind: EntityKind, ordinal: usize) -> &mut UserFields {
        match kind {
            EntityKind::Var => &mut self.vars[ordinal].state.user,
            EntityKind::Constr => &mut self.constrs[ordinal].state.user,
            EntityKind::Model => &mut self.user,
        }
    }

    fn var_attr(&self, ordinal: usize, spec: &AttrSpec) -> Result<Value> {
        let r = &self.vars[ordinal];
        let solution = || {
            r.solution.ok_or(Error::AttributeNotAvailable {
                kind: EntityKind::Var,
                name: spec.name,
            })
        };
        let unavailable = Error::AttributeNotAvailable {
            kind: EntityKind::Var,
            name: spec.name,
        };
        Ok(match spec.key {
            AttrKey::Lb => r.lb.into(),
            AttrKey::Ub => r.ub.into(),
            AttrKey::Obj => r.obj.into(),
            AttrKey::VType => r.vtype.into(),
            AttrKey::VarName => r.name.as_str().into(),
            AttrKey::X => solution()?.x.into(),
            AttrKey::Rc => solution()?.rc.ok_or(unavailable)?.into(),
            AttrKey::Start => solution()?.start.into(),
            _ => return Err(unavailable),
        })
    }

    fn constr_attr(&self, ordinal: usize, spec: &AttrSpec) -> Result<Value> {
        let r = &self.constrs[ordinal];
        let unavailable = || Error::AttributeNotAvailable {
            kind: EntityKind::Constr,
            name: spec.name,
        };
        Ok(match spec.key {
            AttrKey::Rhs => r.rhs.into(),
            AttrKey::Sense => r.sense.into(),
            AttrKey::ConstrName => r.name.as_str().into(),
            AttrKey::Pi => r.solution.and_then(|s| s.pi).ok_or_else(unavailable)?.into(),
            AttrKey::Slack => r.solution.ok_or_else(unavailable)?.slack.into(),
            _ => return Err(unavailable()),
        })
    }

    fn model_attr(&self, spec: &AttrSpec) -> Result<Value> {
        let unavailable = || Error::AttributeNotAvailable {
            kind: EntityKind::Model,
            name: spec.name,
        };
        Ok(match spec.key {
            AttrKey::ModelSense => self.sense.into(),
            AttrKey::ModelName => self.name.as_str().into(),
            AttrKey::ObjCon => self.obj_con.into(),
            AttrKey::ObjVal => self.obj_val.ok_or_else(unavailable)?.into(),
            AttrKey::Status => Value::Int(self.status.code()),
            AttrKey::NumVars => (self.num_vars() as i64).into(),
            AttrKey::NumConstrs => (self.num_constrs() as i64).into(),
            AttrKey::NumIntVars => (self.num_int_vars() as i64).into(),
            AttrKey::IsMip => (self.num_int_vars() > 0).into(),
            _ => return Err(unavailable()),
        })
    }

    fn set_var_attr(&mut self, ordinal: usize, spec: &AttrSpec, value: Value) -> Result<()> {
        let record = &mut self.vars[ordinal];
        match spec.key {
            AttrKey::Lb => record.lb = value.to_f64(spec.name)?,
            AttrKey::Ub => record.ub = value.to_f64(spec.name)?,
            AttrKey::Obj => record.obj = value.to_f64(spec.name)?,
            AttrKey::VType => record.vtype = VarType::try_from(value)?,
            AttrKey::VarName => record.name = value.to_text(spec.name)?,
            _ => return Err(read_only(EntityKind::Var, spec)),
        }
        self.touch_native(EntityKind::Var, ordinal, spec)
    }

    fn set_constr_attr(&mut self, ordinal: usize, spec: &AttrSpec, value: Value) -> Result<()> {
        let record = &mut self.constrs[ordinal];
        match spec.key {
            AttrKey::Rhs => record.rhs = value.to_f64(spec.name)?,
            AttrKey::Sense => record.sense = ConstrSense::try_from(value)?,
            AttrKey::ConstrName => record.name = value.to_text(spec.name)?,
            _ => return Err(read_only(EntityKind::Constr, spec)),
        }
        self.touch_native(EntityKind::Constr, ordinal, spec)
    }

    fn set_model_attr(&mut self, spec: &AttrSpec, value: Value) -> Result<()> {
        match spec.key {
            AttrKey::ModelSense => self.set_sense(Sense::try_from(value)?),
            AttrKey::ModelName => self.name = value.to_text(spec.name)?,
            AttrKey::ObjCon => {
                self.obj_con = value.to_f64(spec.name)?;
                self.touch(EntityKind::Model, 0, NativeAttr::ObjOffset);
            }
            _ => return Err(read_only(EntityKind::Model, spec)),
        }
        Ok(())
    }

    fn touch_native(&mut self, kind: EntityKind, ordinal: usize, spec: &AttrSpec) -> Result<()> {
        if let (Storage::Local, Some(native)) = (spec.storage, spec.key.native()) {
            self.touch(kind, ordinal, native);
        }
        Ok(())
    }

    /// Objective value of the last solution, piecewise-linear fragments included
    pub fn obj_val(&self) -> Result<f64> {
        self.get_attr("ObjVal")?.try_into()
    }

    /// Outcome of the last optimization
    pub fn status(&self) -> Status {
        self.status
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of variables known to the solver
    pub fn num_vars(&self) -> usize {
        self.vars.iter().filter(|r| r.state.native().is_some()).count()
    }

    /// Number of constraints known to the solver
    pub fn num_constrs(&self) -> usize {
        self.constrs
            .iter()
            .filter(|r| r.state.native().is_some())
            .count()
    }

    fn num_int_vars(&self) -> usize {
        self.vars
            .iter()
            .filter(|r| r.state.native().is_some() && r.vtype.is_integral())
            .count()
    }

    // ------------------------------------------------------------------
    // Solver pass-through
    // ------------------------------------------------------------------

    /// Set a solver parameter, see [HighsSolver] for the names it understands
    pub fn set_param(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<()> {
        self.solver.set_param(name, value.into())
    }

    /// Synchronize, then write the problem to a file whose format follows the extension
    pub fn write(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.update()?;
        let path = path.as_ref();
        log::debug!("Writing model {:?} to {}", self.name, path.display());
        self.solver.write_model(path)
    }
}

fn writable(kind: EntityKind, spec: &'static AttrSpec) -> Result<&'static AttrSpec> {
    if spec.writable {
        Ok(spec)
    } else {
        Err(read_only(kind, spec))
    }
}

fn read_only(kind: EntityKind, spec: &AttrSpec) -> Error {
    Error::ReadOnlyAttribute {
        kind,
        name: spec.name,
    }
}

/// A solution value that may legitimately be missing, such as duals of a MIP
fn optional(value: Result<Value>, name: &str) -> Result<Option<f64>> {
    match value {
        Ok(v) => v.to_f64(name).map(Some),
        Err(e) if e.is_not_available() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Reassign dense native indices, in creation order, to the materialized entities
fn renumber<'a>(states: impl Iterator<Item = &'a mut EntityState>) {
    let mut next = 0;
    for state in states {
        if let Lifecycle::Materialized(_) = state.lifecycle {
            state.lifecycle = Lifecycle::Materialized(next);
            next += 1;
        }
    }
}

/// Sum the coefficients of repeated indices, keeping first occurrences in order, and drop
/// the resulting zeros
fn merge_duplicates(entries: impl Iterator<Item = (usize, f64)>) -> Vec<(usize, f64)> {
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut merged: Vec<(usize, f64)> = Vec::new();
    for (index, coeff) in entries {
        match position.entry(index) {
            Entry::Occupied(e) => merged[*e.get()].1 += coeff,
            Entry::Vacant(e) => {
                e.insert(merged.len());
                merged.push((index, coeff));
            }
        }
    }
    merged.retain(|&(_, coeff)| coeff != 0.);
    merged
}
