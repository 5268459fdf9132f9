#![forbid(missing_docs)]
//! Deferred-update modelling layer for linear and mixed-integer programs,
//! solved with [HiGHS](https://highs.dev).
//!
//! Variables and constraints are added to a [Model] and combined through [LinExpr] values.
//! Structural changes are queued and only reach the solver when the model is synchronized
//! (explicitly with [Model::update], or implicitly by [Model::optimize]). Every entity
//! exposes a small, case-insensitive attribute namespace ([Model::get], [Model::set]) that
//! serves both the modelling data and the results of the last optimization.
//!
//! ## Usage example
//!
//! ```
//! use linmodel::{Model, Sense, Status, VarSpec};
//! // max: x + 2y + z
//! // under constraints:
//! // c1: 3x +  y      <= 6
//! // c2:       y + 2z <= 7
//! let mut model = Model::new("example").unwrap();
//! // Each variable is bound between 0 and +∞ unless told otherwise
//! let x = model.add_var(VarSpec::new().name("x")).unwrap();
//! let y = model.add_var(VarSpec::new().name("y")).unwrap();
//! let z = model.add_var(VarSpec::new().name("z")).unwrap();
//! let c1 = model.add_constr((3. * x + y).leq(6.), "c1").unwrap();
//! let c2 = model.add_constr((y + 2. * z).leq(7.), "c2").unwrap();
//! model.set_objective(x + 2. * y + z, Some(Sense::Maximise)).unwrap();
//!
//! // Nothing reached the solver yet
//! assert!(!model.is_synchronized());
//! model.update().unwrap();
//! assert_eq!(model.num_vars(), 3);
//!
//! model.optimize().unwrap();
//! assert_eq!(model.status(), Status::Optimal);
//! // The expected solution is x=0  y=6  z=0.5
//! assert_eq!(x.x(&model).unwrap(), 0.);
//! assert_eq!(y.x(&model).unwrap(), 6.);
//! assert_eq!(z.x(&model).unwrap(), 0.5);
//! // Both constraints are tight
//! assert_eq!(c1.slack(&model).unwrap(), 0.);
//! assert_eq!(c2.slack(&model).unwrap(), 0.);
//! assert_eq!(model.obj_val().unwrap(), 12.5);
//! ```
//!
//! ### Attributes
//!
//! Attribute names ignore case. Names starting with `_` are free-form user fields.
//!
//! ```
//! use linmodel::{Model, Value, VarSpec};
//! let mut model = Model::new("attrs").unwrap();
//! let v = model.add_var(VarSpec::new().lb(100.)).unwrap();
//! model.set(v, "VarName", "load").unwrap();
//! assert_eq!(model.get(v, "varname").unwrap(), Value::from("load"));
//! assert_eq!(v.ub(&model).unwrap(), linmodel::INFINITY);
//!
//! model.set(v, "_tag", 42).unwrap();
//! assert_eq!(model.get(v, "_tag").unwrap(), Value::Int(42));
//! assert!(model.set(v, "tag", 42).is_err());
//! // No optimization happened yet
//! assert!(v.x(&model).unwrap_err().is_not_available());
//! ```
//!
//! ### Building a variable inside existing constraints with a [Column]
//!
//! ```
//! use linmodel::{Column, LinExpr, Model, Sense, VarSpec};
//! let mut model = Model::new("cakes").unwrap();
//! // We cannot use more then 5 units of sugar and 3 units of milk in total.
//! let sugar = model.add_constr(LinExpr::new().leq(5.), "sugar").unwrap();
//! let milk = model.add_constr(LinExpr::new().leq(3.), "milk").unwrap();
//! model.set_sense(Sense::Maximise);
//! // A first cake sells for 2€ and needs 1 unit of milk and 2 of sugar.
//! let first = model
//!     .add_var(VarSpec::new().obj(2.).column([(sugar, 2.), (milk, 1.)].into_iter().collect()))
//!     .unwrap();
//! // A second one sells for 8€ and needs 2 units of milk and 3 of sugar.
//! let second = model
//!     .add_var(VarSpec::new().obj(8.).column([(sugar, 3.), (milk, 2.)].into_iter().collect()))
//!     .unwrap();
//! model.optimize().unwrap();
//! // The best plan is to bake only 1.5 portions of the second cake
//! assert_eq!(first.x(&model).unwrap(), 0.);
//! assert_eq!(second.x(&model).unwrap(), 1.5);
//! assert_eq!(model.get_row(milk).unwrap().len(), 2);
//! ```
use std::convert::TryInto;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::os::raw::c_int;
use std::str::FromStr;

pub use attr::{attribute_names, is_private, EntityKind, Value, PRIVATE_PREFIX};
pub use column::Column;
pub use entity::{Constr, Entity, Var};
pub use error::{Error, Result};
pub use expr::{quicksum, LinExpr, TempConstr};
pub use highs::HighsSolver;
pub use model::{read, Model, VarSpec};
pub use pwl::{PiecewiseLinear, PwlExtrapolation, PwlFragment};
pub use solver::{NativeAttr, ParamValue, Solver, Status};
pub use status::{HighsModelStatus, HighsStatus};

mod attr;
mod column;
mod entity;
mod error;
mod expr;
mod highs;
mod model;
mod options;
mod pwl;
mod solver;
mod status;
#[cfg(test)]
mod testing;

/// Positive infinity, for unbounded variables
pub const INFINITY: f64 = f64::INFINITY;

/// Marker for a value the solver did not define, such as the start of a cold solve
pub const UNDEFINED: f64 = 1e101;

/// Whether to maximize or minimize the objective function
#[repr(C)]
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub enum Sense {
    /// max
    Maximise = -1,
    /// min
    #[default]
    Minimise = 1,
}

impl Sense {
    /// `1` for minimisation, `-1` for maximisation
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Inverse of [Sense::code]
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(Sense::Minimise),
            -1 => Ok(Sense::Maximise),
            n => Err(Error::invalid(format!("{} is not an objective sense", n))),
        }
    }
}

/// Sense of a linear constraint
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum ConstrSense {
    /// `row <= rhs`
    LessEqual,
    /// `row == rhs`
    Equal,
    /// `row >= rhs`
    GreaterEqual,
}

impl ConstrSense {
    /// Single character code: `<`, `=` or `>`
    pub fn code(self) -> char {
        match self {
            ConstrSense::LessEqual => '<',
            ConstrSense::Equal => '=',
            ConstrSense::GreaterEqual => '>',
        }
    }

    /// Inverse of [ConstrSense::code]
    pub fn from_code(code: char) -> Result<Self> {
        code.to_string().parse()
    }
}

impl FromStr for ConstrSense {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "<" | "<=" | "=<" | "L" => Ok(ConstrSense::LessEqual),
            "=" | "==" | "E" => Ok(ConstrSense::Equal),
            ">" | ">=" | "=>" | "G" => Ok(ConstrSense::GreaterEqual),
            _ => Err(Error::invalid(format!("unknown constraint sense {:?}", s))),
        }
    }
}

impl fmt::Display for ConstrSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstrSense::LessEqual => "<=",
            ConstrSense::Equal => "=",
            ConstrSense::GreaterEqual => ">=",
        })
    }
}

/// Domain of a variable
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Default)]
pub enum VarType {
    /// Any real value between the bounds
    #[default]
    Continuous,
    /// Whole values between the bounds
    Integer,
    /// 0 or 1
    Binary,
}

impl VarType {
    /// Single character code: `C`, `I` or `B`
    pub fn code(self) -> char {
        match self {
            VarType::Continuous => 'C',
            VarType::Integer => 'I',
            VarType::Binary => 'B',
        }
    }

    /// Inverse of [VarType::code], ignoring case
    pub fn from_code(code: char) -> Result<Self> {
        match code.to_ascii_uppercase() {
            'C' => Ok(VarType::Continuous),
            'I' => Ok(VarType::Integer),
            'B' => Ok(VarType::Binary),
            c => Err(Error::invalid(format!("unknown variable type {:?}", c))),
        }
    }

    /// Integer or binary
    pub fn is_integral(self) -> bool {
        self != VarType::Continuous
    }
}

fn bound_value<N: Into<f64> + Copy>(b: Bound<&N>) -> Option<f64> {
    match b {
        Bound::Included(v) | Bound::Excluded(v) => Some((*v).into()),
        Bound::Unbounded => None,
    }
}

/// Bounds of a range, infinite where the range is open
fn range_to_bounds<N: Into<f64> + Copy, B: RangeBounds<N>>(bounds: B) -> (f64, f64) {
    let low = bound_value(bounds.start_bound()).unwrap_or(f64::NEG_INFINITY);
    let high = bound_value(bounds.end_bound()).unwrap_or(f64::INFINITY);
    (low, high)
}

fn c(n: usize) -> Result<c_int> {
    n.try_into()
        .map_err(|_| Error::invalid(format!("{} does not fit in a HiGHS index", n)))
}
