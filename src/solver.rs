//! The contract between the modelling layer and a numerical backend.
//!
//! A [Model](crate::Model) never talks to HiGHS directly: everything goes through the
//! [Solver] trait, addressed by dense native indices that the backend hands out when an
//! entity is allocated.
use std::fmt;
use std::path::Path;

use crate::attr::{EntityKind, Value};
use crate::pwl::{PwlExtrapolation, PwlFragment};
use crate::{ConstrSense, Result, VarType};

/// Key of an attribute in the solver's own namespace
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NativeAttr {
    /// Column lower bound
    ColLower,
    /// Column upper bound
    ColUpper,
    /// Column objective coefficient
    ColCost,
    /// Column type, as a [VarType] character
    ColType,
    /// Column name
    ColName,
    /// Primal value of a column
    ColValue,
    /// Reduced cost of a column
    ColDual,
    /// Value a column started the last solve from
    ColStart,
    /// Right hand side of a row
    RowRhs,
    /// Sense of a row, as a [ConstrSense] character
    RowSense,
    /// Row name
    RowName,
    /// Dual value of a row
    RowDual,
    /// Right hand side minus row activity
    RowSlack,
    /// Objective sense, 1 for minimisation and -1 for maximisation
    ObjSense,
    /// Constant term of the objective
    ObjOffset,
}

/// Outcome of an optimization, as exposed through the `Status` model attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Nothing has been solved since the model was created or reset
    Loaded,
    /// An optimal solution is available
    Optimal,
    /// The model has no feasible point
    Infeasible,
    /// Infeasible or unbounded, the solver could not tell which
    InfOrUnbd,
    /// The objective is unbounded
    Unbounded,
    /// Stopped on the iteration limit
    IterationLimit,
    /// Stopped on the time limit
    TimeLimit,
    /// Any other solver-specific outcome, with the native status code
    Other(i32),
}

impl Status {
    /// Integer code of the status.
    /// Backend-specific outcomes are forwarded with their native code.
    pub fn code(self) -> i64 {
        match self {
            Status::Loaded => 1,
            Status::Optimal => 2,
            Status::Infeasible => 3,
            Status::InfOrUnbd => 4,
            Status::Unbounded => 5,
            Status::IterationLimit => 7,
            Status::TimeLimit => 9,
            Status::Other(native) => native.into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Other(native) => write!(f, "Other({})", native),
            status => fmt::Debug::fmt(status, f),
        }
    }
}

/// A solver parameter value
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// on/off switch
    Bool(bool),
    /// integer parameter
    Int(i32),
    /// real parameter
    Float(f64),
    /// string parameter
    Str(String),
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// A numerical backend able to hold and optimize a linear or mixed-integer program.
///
/// Native indices are dense and assigned in allocation order. Removing entities shifts
/// the indices of the survivors down, keeping their relative order.
pub trait Solver {
    /// Append a column. `column` holds `(native row, coefficient)` pairs for rows that
    /// already exist. Returns the native index of the new column.
    fn allocate_variable(
        &mut self,
        lb: f64,
        ub: f64,
        obj: f64,
        vtype: VarType,
        name: &str,
        column: &[(usize, f64)],
    ) -> Result<usize>;

    /// Append a row over existing columns, given as `(native column, coefficient)` pairs
    /// with no duplicate column. Returns the native index of the new row.
    fn allocate_constraint(
        &mut self,
        row: &[(usize, f64)],
        sense: ConstrSense,
        rhs: f64,
        name: &str,
    ) -> Result<usize>;

    /// Read an attribute. For [EntityKind::Model] the index is ignored.
    fn get_entity_attribute(&self, kind: EntityKind, index: usize, attr: NativeAttr)
        -> Result<Value>;

    /// Write an attribute. For [EntityKind::Model] the index is ignored.
    fn set_entity_attribute(
        &mut self,
        kind: EntityKind,
        index: usize,
        attr: NativeAttr,
        value: &Value,
    ) -> Result<()>;

    /// Set the coefficient of a column in a row
    fn change_coefficient(&mut self, row: usize, col: usize, value: f64) -> Result<()>;

    /// Delete columns
    fn remove_variables(&mut self, indices: &[usize]) -> Result<()>;

    /// Delete rows
    fn remove_constraints(&mut self, indices: &[usize]) -> Result<()>;

    /// Replace the piecewise-linear part of the objective
    fn set_pwl_objective(
        &mut self,
        fragments: &[PwlFragment],
        extrapolation: PwlExtrapolation,
    ) -> Result<()>;

    /// Non-zeros of a row, as `(native column, coefficient)` pairs
    fn constraint_row(&self, index: usize) -> Result<Vec<(usize, f64)>>;

    /// Number of variables or constraints held by the solver
    fn entity_count(&self, kind: EntityKind) -> usize;

    /// Solve the current problem
    fn run_optimization(&mut self) -> Result<Status>;

    /// Whether the last [Solver::run_optimization] produced a primal solution
    fn has_solution(&self) -> bool;

    /// Forget the solution and any warm-start information
    fn reset(&mut self) -> Result<()>;

    /// Set a solver parameter
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()>;

    /// Replace the whole problem by the content of a model file
    fn load_model(&mut self, path: &Path) -> Result<()>;

    /// Write the problem to a model file, the format is deduced from the extension
    fn write_model(&mut self, path: &Path) -> Result<()>;
}
