//! [Solver] implementation over the HiGHS C API.
//!
//! Constraint senses are stored natively as row bounds: `<=` rows are `[-inf, rhs]`,
//! `>=` rows `[rhs, +inf]` and equalities `[rhs, rhs]`. Binary variables are integer
//! columns with bounds inside `[0, 1]`.
//!
//! HiGHS has no piecewise-linear objective. Fragments are lowered into extra columns and
//! rows for the duration of [Solver::run_optimization] only, then removed again, so the
//! native problem seen by everything else only ever holds the model's own entities.
use std::convert::TryFrom;
use std::ffi::{c_void, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

use highs_sys::*;

use crate::attr::{EntityKind, Value};
use crate::error::{Error, Result};
use crate::options::{self, HighsOptionValue, OptionType};
use crate::pwl::{PwlExtrapolation, PwlFragment};
use crate::solver::{NativeAttr, ParamValue, Solver, Status};
use crate::status::{try_handle_status, HighsModelStatus};
use crate::{c, ConstrSense, VarType, UNDEFINED};

macro_rules! highs_call {
    ($function_name:ident ($($param:expr),+)) => {
        try_handle_status(
            $function_name($($param),+),
            stringify!($function_name)
        )
    }
}

#[derive(Debug)]
struct HighsPtr(*mut c_void);

impl Drop for HighsPtr {
    fn drop(&mut self) {
        unsafe { Highs_destroy(self.0) }
    }
}

impl Default for HighsPtr {
    fn default() -> Self {
        Self(unsafe { Highs_create() })
    }
}

// SAFETY: a HiGHS instance is not tied to the thread that created it, and HighsPtr is its
// only owner.
unsafe impl Send for HighsPtr {}

impl HighsPtr {
    // Needed until https://github.com/ERGO-Code/HiGHS/issues/479 is fixed
    unsafe fn unsafe_mut_ptr(&self) -> *mut c_void {
        self.0
    }

    fn mut_ptr(&mut self) -> *mut c_void {
        self.0
    }
}

/// Results of the last run, restricted to the model's own columns and rows
#[derive(Clone, Debug)]
struct Snapshot {
    col_value: Vec<f64>,
    col_dual: Option<Vec<f64>>,
    col_start: Vec<f64>,
    row_dual: Option<Vec<f64>>,
    row_slack: Vec<f64>,
}

/// The HiGHS solver.
///
/// Besides the native HiGHS option names, [Solver::set_param] understands a few classic
/// parameter names, without regard to case:
///
/// | name         | HiGHS options                    |
/// |--------------|----------------------------------|
/// | `OutputFlag` | `output_flag`, `log_to_console`  |
/// | `TimeLimit`  | `time_limit`                     |
/// | `MIPGap`     | `mip_rel_gap`                    |
/// | `Threads`    | `threads`                        |
/// | `Presolve`   | `presolve` (0 off, 1 or 2 on, -1 choose) |
///
/// ```
/// use linmodel::{HighsSolver, Solver};
/// let mut solver = HighsSolver::new().unwrap();
/// solver.set_param("TimeLimit", 30.into()).unwrap();
/// solver.set_param("presolve", "off".into()).unwrap();
/// assert!(solver.set_param("no_such_option", 1.into()).is_err());
/// ```
#[derive(Debug)]
pub struct HighsSolver {
    highs: HighsPtr,
    pwl: Vec<PwlFragment>,
    extrapolation: PwlExtrapolation,
    solution: Option<Snapshot>,
    /// Primal values of the last solution, used as the start of the next run
    warm: Option<Vec<f64>>,
}

impl HighsSolver {
    /// A fresh HiGHS instance that prints nothing
    pub fn new() -> Result<Self> {
        let mut solver = Self {
            highs: HighsPtr::default(),
            pwl: Vec::new(),
            extrapolation: PwlExtrapolation::default(),
            solution: None,
            warm: None,
        };
        solver.make_quiet()?;
        Ok(solver)
    }

    /// Prevents writing anything to the standard output when solving the model
    pub fn make_quiet(&mut self) -> Result<()> {
        // setting log_file seems to cause a double free in Highs.
        // See https://github.com/rust-or/highs/issues/3
        self.set_param("OutputFlag", ParamValue::Bool(false))
    }

    /// Status HiGHS reports for the last run, if it is one this crate knows
    pub fn model_status(&self) -> Option<HighsModelStatus> {
        let status = unsafe { Highs_getModelStatus(self.highs.unsafe_mut_ptr()) };
        HighsModelStatus::try_from(status).ok()
    }

    fn num_cols(&self) -> usize {
        let n = unsafe { Highs_getNumCol(self.highs.unsafe_mut_ptr()) };
        usize::try_from(n).unwrap_or(0)
    }

    fn num_rows(&self) -> usize {
        let n = unsafe { Highs_getNumRow(self.highs.unsafe_mut_ptr()) };
        usize::try_from(n).unwrap_or(0)
    }

    fn check_index(&self, kind: EntityKind, index: usize) -> Result<c_int> {
        let len = match kind {
            EntityKind::Constr => self.num_rows(),
            _ => self.num_cols(),
        };
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        c(index)
    }

    /// `(cost, lower, upper)` of a column
    fn col_data(&self, col: usize) -> Result<(f64, f64, f64)> {
        let i = self.check_index(EntityKind::Var, col)?;
        let (mut num_col, mut num_nz): (c_int, c_int) = (0, 0);
        let (mut cost, mut lower, mut upper) = (0., 0., 0.);
        unsafe {
            highs_call!(Highs_getColsByRange(
                self.highs.unsafe_mut_ptr(),
                i,
                i,
                &mut num_col,
                &mut cost,
                &mut lower,
                &mut upper,
                &mut num_nz,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut()
            ))
        }?;
        Ok((cost, lower, upper))
    }

    /// Bounds of the rows `from..to`
    fn row_bounds(&self, from: usize, to: usize) -> Result<(Vec<f64>, Vec<f64>)> {
        let n = to.saturating_sub(from);
        let mut lower = vec![0.; n];
        let mut upper = vec![0.; n];
        if n > 0 {
            let (mut num_row, mut num_nz): (c_int, c_int) = (0, 0);
            unsafe {
                highs_call!(Highs_getRowsByRange(
                    self.highs.unsafe_mut_ptr(),
                    c(from)?,
                    c(to - 1)?,
                    &mut num_row,
                    lower.as_mut_ptr(),
                    upper.as_mut_ptr(),
                    &mut num_nz,
                    ptr::null_mut(),
                    ptr::null_mut(),
                    ptr::null_mut()
                ))
            }?;
        }
        Ok((lower, upper))
    }

    fn row_sense(&self, row: usize) -> Result<(ConstrSense, f64)> {
        self.check_index(EntityKind::Constr, row)?;
        let (lower, upper) = self.row_bounds(row, row + 1)?;
        Ok(sense_from_bounds(lower[0], upper[0]))
    }

    fn set_row_sense(&mut self, row: usize, sense: ConstrSense, rhs: f64) -> Result<()> {
        let i = self.check_index(EntityKind::Constr, row)?;
        let (lower, upper) = bounds_from_sense(sense, rhs);
        unsafe { highs_call!(Highs_changeRowBounds(self.highs.mut_ptr(), i, lower, upper)) }?;
        Ok(())
    }

    fn set_col_bounds(&mut self, col: usize, lower: f64, upper: f64) -> Result<()> {
        let i = self.check_index(EntityKind::Var, col)?;
        unsafe { highs_call!(Highs_changeColBounds(self.highs.mut_ptr(), i, lower, upper)) }?;
        Ok(())
    }

    fn is_integer(&self, col: usize) -> Result<bool> {
        let i = self.check_index(EntityKind::Var, col)?;
        let mut integrality: c_int = 0;
        // fails when the problem has no integrality information at all
        let status = unsafe {
            Highs_getColIntegrality(self.highs.unsafe_mut_ptr(), i, &mut integrality)
        };
        Ok(status == STATUS_OK && integrality == kHighsVarTypeInteger)
    }

    fn set_col_type(&mut self, col: usize, vtype: VarType) -> Result<()> {
        let i = self.check_index(EntityKind::Var, col)?;
        let integrality = if vtype.is_integral() {
            kHighsVarTypeInteger
        } else {
            kHighsVarTypeContinuous
        };
        unsafe {
            highs_call!(Highs_changeColIntegrality(self.highs.mut_ptr(), i, integrality))
        }?;
        if vtype == VarType::Binary {
            let (_, lower, upper) = self.col_data(col)?;
            self.set_col_bounds(col, lower.max(0.), upper.min(1.))?;
        }
        Ok(())
    }

    fn name(&self, kind: EntityKind, index: usize) -> Result<String> {
        let i = self.check_index(kind, index)?;
        let mut name_buf = vec![0u8; kHighsMaximumStringLength as usize];
        let name_ptr = name_buf.as_mut_ptr() as *mut c_char;
        unsafe {
            match kind {
                EntityKind::Constr => {
                    highs_call!(Highs_getRowName(self.highs.unsafe_mut_ptr(), i, name_ptr))
                }
                _ => highs_call!(Highs_getColName(self.highs.unsafe_mut_ptr(), i, name_ptr)),
            }
        }?;
        let len = name_buf.iter().position(|&b| b == 0).unwrap_or(name_buf.len());
        Ok(String::from_utf8_lossy(&name_buf[..len]).into_owned())
    }

    fn set_name(&mut self, kind: EntityKind, index: usize, name: &str) -> Result<()> {
        let i = self.check_index(kind, index)?;
        let c_name = CString::new(name)
            .map_err(|_| Error::invalid(format!("name {:?} contains a NUL byte", name)))?;
        unsafe {
            match kind {
                EntityKind::Constr => {
                    highs_call!(Highs_passRowName(self.highs.mut_ptr(), i, c_name.as_ptr()))
                }
                _ => highs_call!(Highs_passColName(self.highs.mut_ptr(), i, c_name.as_ptr())),
            }
        }?;
        Ok(())
    }

    fn objective_sense(&self) -> Result<c_int> {
        let mut sense: c_int = 0;
        unsafe {
            highs_call!(Highs_getObjectiveSense(
                self.highs.unsafe_mut_ptr(),
                &mut sense
            ))
        }?;
        Ok(sense)
    }

    fn objective_offset(&self) -> Result<f64> {
        let mut offset = 0.;
        unsafe {
            highs_call!(Highs_getObjectiveOffset(
                self.highs.unsafe_mut_ptr(),
                &mut offset
            ))
        }?;
        Ok(offset)
    }

    fn set_objective_offset(&mut self, offset: f64) -> Result<()> {
        unsafe { highs_call!(Highs_changeObjectiveOffset(self.highs.mut_ptr(), offset)) }?;
        Ok(())
    }

    fn int_info(&self, name: &str) -> Result<c_int> {
        let c_name = CString::new(name).map_err(|_| Error::invalid(name))?;
        let mut value: c_int = 0;
        unsafe {
            highs_call!(Highs_getIntInfoValue(
                self.highs.unsafe_mut_ptr(),
                c_name.as_ptr(),
                &mut value
            ))
        }?;
        Ok(value)
    }

    fn option_type(&self, option: &CString) -> Result<OptionType> {
        let mut code: c_int = -1;
        unsafe {
            highs_call!(Highs_getOptionType(
                self.highs.unsafe_mut_ptr(),
                option.as_ptr(),
                &mut code
            ))
        }?;
        OptionType::from_highs(code)
            .ok_or_else(|| Error::solver(code, "Highs_getOptionType: unknown option type"))
    }

    fn add_col(
        &mut self,
        cost: f64,
        lower: f64,
        upper: f64,
        column: &[(usize, f64)],
    ) -> Result<usize> {
        let rows = column.iter().map(|&(r, _)| c(r)).collect::<Result<Vec<_>>>()?;
        let values: Vec<f64> = column.iter().map(|&(_, v)| v).collect();
        unsafe {
            highs_call!(Highs_addCol(
                self.highs.mut_ptr(),
                cost,
                lower,
                upper,
                c(rows.len())?,
                rows.as_ptr(),
                values.as_ptr()
            ))
        }?;
        Ok(self.num_cols() - 1)
    }

    fn add_row(&mut self, lower: f64, upper: f64, row: &[(usize, f64)]) -> Result<usize> {
        let cols = row.iter().map(|&(col, _)| c(col)).collect::<Result<Vec<_>>>()?;
        let values: Vec<f64> = row.iter().map(|&(_, v)| v).collect();
        unsafe {
            highs_call!(Highs_addRow(
                self.highs.mut_ptr(),
                lower,
                upper,
                c(cols.len())?,
                cols.as_ptr(),
                values.as_ptr()
            ))
        }?;
        Ok(self.num_rows() - 1)
    }

    /// Forget solution data that refers to the previous column and row layout
    fn structure_changed(&mut self) {
        self.solution = None;
    }

    /// Delete a column or row that could not be set up completely
    fn discard(&mut self, kind: EntityKind, index: usize) -> Result<()> {
        log::debug!("Discarding {} #{} after a failed allocation", kind, index);
        let i = c(index)?;
        unsafe {
            match kind {
                EntityKind::Constr => {
                    highs_call!(Highs_deleteRowsByRange(self.highs.mut_ptr(), i, i))
                }
                _ => highs_call!(Highs_deleteColsByRange(self.highs.mut_ptr(), i, i)),
            }
        }?;
        Ok(())
    }

    /// Append the columns and rows modelling every piecewise-linear fragment, and shift
    /// the objective offset by the value of each fragment at its first breakpoint.
    ///
    /// Column `x` with breakpoints `x_0 < ... < x_n` becomes
    /// `x = x_0 + sum(d_k) - d_left + d_right`, with `d_k` in `[0, x_{k+1} - x_k]` costing
    /// the slope of segment `k`, and the extension columns `d_left`, `d_right` only present
    /// when extrapolating. When the function is not convex in the direction of the
    /// optimization, binaries force the segments to fill in order.
    fn lower_pwl_objective(&mut self) -> Result<()> {
        if self.pwl.is_empty() {
            return Ok(());
        }
        let minimise = self.objective_sense()? != OBJECTIVE_SENSE_MAXIMIZE;
        let mut offset = self.objective_offset()?;
        let fragments = self.pwl.clone();
        for fragment in &fragments {
            let f = &fragment.function;
            let x = fragment.col;
            let n = f.num_segments();
            let extend = self.extrapolation == PwlExtrapolation::Extend;
            let ordered = if minimise { f.is_convex() } else { f.is_concave() };
            offset += f.ys()[0];

            let deltas = (0..n)
                .map(|k| self.add_col(f.slope(k), 0., f.width(k), &[]))
                .collect::<Result<Vec<_>>>()?;
            let mut link: Vec<(usize, f64)> = vec![(x, 1.)];
            link.extend(deltas.iter().map(|&d| (d, -1.)));
            let mut extension = None;
            if extend {
                let (_, lower, upper) = self.col_data(x)?;
                let first = f.xs()[0];
                let last = f.xs()[n];
                let (left_max, right_max) = if ordered {
                    (f64::INFINITY, f64::INFINITY)
                } else if lower.is_finite() && upper.is_finite() {
                    ((first - lower).max(0.), (upper - last).max(0.))
                } else {
                    return Err(Error::invalid(format!(
                        "column {} needs finite bounds to extend a non-convex \
                         piecewise-linear objective",
                        x
                    )));
                };
                let left = self.add_col(-f.slope(0), 0., left_max, &[])?;
                let right = self.add_col(f.slope(n - 1), 0., right_max, &[])?;
                link.push((left, 1.));
                link.push((right, -1.));
                extension = Some((left, left_max, right, right_max));
            }
            let x0 = f.xs()[0];
            self.add_row(x0, x0, &link)?;

            if ordered {
                continue;
            }
            // z_k = 1 when segment k is full
            for k in 0..n.saturating_sub(1) {
                let z = self.add_col(0., 0., 1., &[])?;
                self.set_col_type(z, VarType::Integer)?;
                self.add_row(0., f64::INFINITY, &[(deltas[k], 1.), (z, -f.width(k))])?;
                self.add_row(f64::NEG_INFINITY, 0., &[(deltas[k + 1], 1.), (z, -f.width(k + 1))])?;
            }
            if let Some((left, left_max, right, right_max)) = extension {
                let z_left = self.add_col(0., 0., 1., &[])?;
                self.set_col_type(z_left, VarType::Integer)?;
                let z_right = self.add_col(0., 0., 1., &[])?;
                self.set_col_type(z_right, VarType::Integer)?;
                // going left of x_0 leaves every segment empty
                self.add_row(f64::NEG_INFINITY, 0., &[(left, 1.), (z_left, -left_max)])?;
                self.add_row(
                    f64::NEG_INFINITY,
                    f.width(0),
                    &[(deltas[0], 1.), (z_left, f.width(0))],
                )?;
                // going right of x_n needs every segment full
                self.add_row(f64::NEG_INFINITY, 0., &[(right, 1.), (z_right, -right_max)])?;
                self.add_row(
                    0.,
                    f64::INFINITY,
                    &[(deltas[n - 1], 1.), (z_right, -f.width(n - 1))],
                )?;
            }
        }
        self.set_objective_offset(offset)
    }

    /// Delete the columns and rows past the model's own, restore the objective offset
    fn drop_auxiliaries(&mut self, cols: usize, rows: usize, offset: f64) -> Result<()> {
        let (num_cols, num_rows) = (self.num_cols(), self.num_rows());
        if num_rows > rows {
            unsafe {
                highs_call!(Highs_deleteRowsByRange(
                    self.highs.mut_ptr(),
                    c(rows)?,
                    c(num_rows - 1)?
                ))
            }?;
        }
        if num_cols > cols {
            unsafe {
                highs_call!(Highs_deleteColsByRange(
                    self.highs.mut_ptr(),
                    c(cols)?,
                    c(num_cols - 1)?
                ))
            }?;
        }
        if !self.pwl.is_empty() {
            self.set_objective_offset(offset)?;
        }
        Ok(())
    }

    fn run_and_snapshot(&mut self, cols: usize, rows: usize, start: Vec<f64>) -> Result<Status> {
        unsafe { highs_call!(Highs_run(self.highs.mut_ptr())) }?;
        let code = unsafe { Highs_getModelStatus(self.highs.unsafe_mut_ptr()) };
        let status = match HighsModelStatus::try_from(code) {
            Ok(status) => status.to_status()?,
            Err(_) => Status::Other(code),
        };
        let (num_cols, num_rows) = (self.num_cols(), self.num_rows());
        let primal = num_cols == 0
            || self.int_info("primal_solution_status")? == kHighsSolutionStatusFeasible;
        if !primal {
            return Ok(status);
        }
        let dual = num_cols > 0
            && self.int_info("dual_solution_status")? == kHighsSolutionStatusFeasible;

        let mut col_value = vec![0.; num_cols];
        let mut col_dual = vec![0.; num_cols];
        let mut row_value = vec![0.; num_rows];
        let mut row_dual = vec![0.; num_rows];
        unsafe {
            highs_call!(Highs_getSolution(
                self.highs.unsafe_mut_ptr(),
                col_value.as_mut_ptr(),
                col_dual.as_mut_ptr(),
                row_value.as_mut_ptr(),
                row_dual.as_mut_ptr()
            ))
        }?;
        col_value.truncate(cols);
        col_dual.truncate(cols);
        row_dual.truncate(rows);
        let (lower, upper) = self.row_bounds(0, rows)?;
        let row_slack = (0..rows)
            .map(|i| sense_from_bounds(lower[i], upper[i]).1 - row_value[i])
            .collect();
        self.warm = Some(col_value.clone());
        self.solution = Some(Snapshot {
            col_value,
            col_dual: if dual { Some(col_dual) } else { None },
            col_start: start,
            row_dual: if dual { Some(row_dual) } else { None },
            row_slack,
        });
        Ok(status)
    }

    fn solution_value(
        &self,
        kind: EntityKind,
        index: usize,
        name: &'static str,
        pick: impl Fn(&Snapshot) -> Option<&Vec<f64>>,
    ) -> Result<Value> {
        self.solution
            .as_ref()
            .and_then(pick)
            .and_then(|values| values.get(index))
            .map(|&v| Value::Float(v))
            .ok_or(Error::AttributeNotAvailable { kind, name })
    }
}

/// Three-way sense of a row from its bounds. Ranged rows keep their upper side.
fn sense_from_bounds(lower: f64, upper: f64) -> (ConstrSense, f64) {
    if lower == upper {
        (ConstrSense::Equal, lower)
    } else if lower == f64::NEG_INFINITY {
        (ConstrSense::LessEqual, upper)
    } else if upper == f64::INFINITY {
        (ConstrSense::GreaterEqual, lower)
    } else {
        log::warn!(
            "Row bounded by [{}, {}] is read as <= {}, its lower bound is ignored",
            lower,
            upper,
            upper
        );
        (ConstrSense::LessEqual, upper)
    }
}

fn bounds_from_sense(sense: ConstrSense, rhs: f64) -> (f64, f64) {
    match sense {
        ConstrSense::LessEqual => (f64::NEG_INFINITY, rhs),
        ConstrSense::GreaterEqual => (rhs, f64::INFINITY),
        ConstrSense::Equal => (rhs, rhs),
    }
}

impl Solver for HighsSolver {
    fn allocate_variable(
        &mut self,
        lb: f64,
        ub: f64,
        obj: f64,
        vtype: VarType,
        name: &str,
        column: &[(usize, f64)],
    ) -> Result<usize> {
        let (lb, ub) = match vtype {
            VarType::Binary => (lb.max(0.), ub.min(1.)),
            _ => (lb, ub),
        };
        let index = self.add_col(obj, lb, ub, column)?;
        self.structure_changed();
        let typed = if vtype.is_integral() {
            self.set_col_type(index, vtype)
        } else {
            Ok(())
        };
        if let Err(err) = typed.and_then(|()| self.set_name(EntityKind::Var, index, name)) {
            self.discard(EntityKind::Var, index)?;
            return Err(err);
        }
        Ok(index)
    }

    fn allocate_constraint(
        &mut self,
        row: &[(usize, f64)],
        sense: ConstrSense,
        rhs: f64,
        name: &str,
    ) -> Result<usize> {
        let (lower, upper) = bounds_from_sense(sense, rhs);
        let index = self.add_row(lower, upper, row)?;
        self.structure_changed();
        if let Err(err) = self.set_name(EntityKind::Constr, index, name) {
            self.discard(EntityKind::Constr, index)?;
            return Err(err);
        }
        Ok(index)
    }

    fn get_entity_attribute(
        &self,
        kind: EntityKind,
        index: usize,
        attr: NativeAttr,
    ) -> Result<Value> {
        Ok(match attr {
            NativeAttr::ColLower => self.col_data(index)?.1.into(),
            NativeAttr::ColUpper => self.col_data(index)?.2.into(),
            NativeAttr::ColCost => self.col_data(index)?.0.into(),
            NativeAttr::ColType => {
                let (_, lower, upper) = self.col_data(index)?;
                match self.is_integer(index)? {
                    false => VarType::Continuous,
                    true if lower >= 0. && upper <= 1. => VarType::Binary,
                    true => VarType::Integer,
                }
                .into()
            }
            NativeAttr::ColName => self.name(EntityKind::Var, index)?.into(),
            NativeAttr::ColValue => {
                return self.solution_value(kind, index, "X", |s| Some(&s.col_value))
            }
            NativeAttr::ColDual => {
                return self.solution_value(kind, index, "RC", |s| s.col_dual.as_ref())
            }
            NativeAttr::ColStart => {
                return self.solution_value(kind, index, "Start", |s| Some(&s.col_start))
            }
            NativeAttr::RowRhs => self.row_sense(index)?.1.into(),
            NativeAttr::RowSense => self.row_sense(index)?.0.into(),
            NativeAttr::RowName => self.name(EntityKind::Constr, index)?.into(),
            NativeAttr::RowDual => {
                return self.solution_value(kind, index, "Pi", |s| s.row_dual.as_ref())
            }
            NativeAttr::RowSlack => {
                return self.solution_value(kind, index, "Slack", |s| Some(&s.row_slack))
            }
            NativeAttr::ObjSense => Value::Int(self.objective_sense()?.into()),
            NativeAttr::ObjOffset => self.objective_offset()?.into(),
        })
    }

    fn set_entity_attribute(
        &mut self,
        kind: EntityKind,
        index: usize,
        attr: NativeAttr,
        value: &Value,
    ) -> Result<()> {
        match attr {
            NativeAttr::ColLower => {
                let (_, _, upper) = self.col_data(index)?;
                self.set_col_bounds(index, value.to_f64("LB")?, upper)
            }
            NativeAttr::ColUpper => {
                let (_, lower, _) = self.col_data(index)?;
                self.set_col_bounds(index, lower, value.to_f64("UB")?)
            }
            NativeAttr::ColCost => {
                let i = self.check_index(EntityKind::Var, index)?;
                let cost = value.to_f64("Obj")?;
                unsafe { highs_call!(Highs_changeColCost(self.highs.mut_ptr(), i, cost)) }?;
                Ok(())
            }
            NativeAttr::ColType => {
                let vtype = VarType::try_from(value.clone())?;
                self.set_col_type(index, vtype)
            }
            NativeAttr::ColName => {
                self.set_name(EntityKind::Var, index, &value.to_text("VarName")?)
            }
            NativeAttr::RowRhs => {
                let (sense, _) = self.row_sense(index)?;
                self.set_row_sense(index, sense, value.to_f64("RHS")?)
            }
            NativeAttr::RowSense => {
                let (_, rhs) = self.row_sense(index)?;
                let sense = ConstrSense::try_from(value.clone())?;
                self.set_row_sense(index, sense, rhs)
            }
            NativeAttr::RowName => {
                self.set_name(EntityKind::Constr, index, &value.to_text("ConstrName")?)
            }
            NativeAttr::ObjSense => {
                let sense = c_int::try_from(value.to_i64("ModelSense")?)
                    .map_err(|_| Error::invalid(format!("{} is not an objective sense", value)))?;
                unsafe { highs_call!(Highs_changeObjectiveSense(self.highs.mut_ptr(), sense)) }?;
                Ok(())
            }
            NativeAttr::ObjOffset => self.set_objective_offset(value.to_f64("ObjCon")?),
            NativeAttr::ColValue
            | NativeAttr::ColDual
            | NativeAttr::ColStart
            | NativeAttr::RowDual
            | NativeAttr::RowSlack => Err(Error::invalid(format!(
                "{:?} of {} is computed by the solver",
                attr, kind
            ))),
        }
    }

    fn change_coefficient(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let r = self.check_index(EntityKind::Constr, row)?;
        let c = self.check_index(EntityKind::Var, col)?;
        unsafe { highs_call!(Highs_changeCoeff(self.highs.mut_ptr(), r, c, value)) }?;
        Ok(())
    }

    fn remove_variables(&mut self, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        let set = indices.iter().map(|&i| c(i)).collect::<Result<Vec<_>>>()?;
        unsafe {
            highs_call!(Highs_deleteColsBySet(
                self.highs.mut_ptr(),
                c(set.len())?,
                set.as_ptr()
            ))
        }?;
        if let Some(warm) = &mut self.warm {
            let mut col = 0;
            warm.retain(|_| {
                col += 1;
                !indices.contains(&(col - 1))
            });
        }
        self.structure_changed();
        Ok(())
    }

    fn remove_constraints(&mut self, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        let set = indices.iter().map(|&i| c(i)).collect::<Result<Vec<_>>>()?;
        unsafe {
            highs_call!(Highs_deleteRowsBySet(
                self.highs.mut_ptr(),
                c(set.len())?,
                set.as_ptr()
            ))
        }?;
        self.structure_changed();
        Ok(())
    }

    fn set_pwl_objective(
        &mut self,
        fragments: &[PwlFragment],
        extrapolation: PwlExtrapolation,
    ) -> Result<()> {
        for fragment in fragments {
            self.check_index(EntityKind::Var, fragment.col)?;
        }
        self.pwl = fragments.to_vec();
        self.extrapolation = extrapolation;
        Ok(())
    }

    fn constraint_row(&self, index: usize) -> Result<Vec<(usize, f64)>> {
        let i = self.check_index(EntityKind::Constr, index)?;
        let (mut lower, mut upper) = (0., 0.);
        let (mut num_row, mut num_nz): (c_int, c_int) = (0, 0);
        unsafe {
            highs_call!(Highs_getRowsByRange(
                self.highs.unsafe_mut_ptr(),
                i,
                i,
                &mut num_row,
                &mut lower,
                &mut upper,
                &mut num_nz,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut()
            ))
        }?;
        let nz = usize::try_from(num_nz).unwrap_or(0);
        let mut matrix_start: Vec<c_int> = vec![0; 1];
        let mut matrix_index: Vec<c_int> = vec![0; nz];
        let mut matrix_value = vec![0.; nz];
        unsafe {
            highs_call!(Highs_getRowsByRange(
                self.highs.unsafe_mut_ptr(),
                i,
                i,
                &mut num_row,
                &mut lower,
                &mut upper,
                &mut num_nz,
                matrix_start.as_mut_ptr(),
                matrix_index.as_mut_ptr(),
                matrix_value.as_mut_ptr()
            ))
        }?;
        Ok(matrix_index
            .into_iter()
            .map(|col| usize::try_from(col).unwrap_or(0))
            .zip(matrix_value)
            .collect())
    }

    fn entity_count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Var => self.num_cols(),
            EntityKind::Constr => self.num_rows(),
            EntityKind::Model => 1,
        }
    }

    fn run_optimization(&mut self) -> Result<Status> {
        self.solution = None;
        let (cols, rows) = (self.num_cols(), self.num_rows());
        let start = (0..cols)
            .map(|i| {
                self.warm
                    .as_ref()
                    .and_then(|w| w.get(i).copied())
                    .unwrap_or(UNDEFINED)
            })
            .collect();
        let offset = self.objective_offset()?;
        let outcome = self
            .lower_pwl_objective()
            .and_then(|()| self.run_and_snapshot(cols, rows, start));
        let restored = self.drop_auxiliaries(cols, rows, offset);
        let status = outcome?;
        restored?;
        Ok(status)
    }

    fn has_solution(&self) -> bool {
        self.solution.is_some()
    }

    fn reset(&mut self) -> Result<()> {
        unsafe { highs_call!(Highs_clearSolver(self.highs.mut_ptr())) }?;
        self.solution = None;
        self.warm = None;
        Ok(())
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        for (option, value) in options::expand(name, value)? {
            let c_option = CString::new(option.as_str())
                .map_err(|_| Error::invalid(format!("invalid option name {:?}", option)))?;
            let value = options::coerce(&option, value, self.option_type(&c_option)?)?;
            log::debug!("Setting HiGHS option {} to {:?}", option, value);
            let status = unsafe { value.apply_to_highs(self.highs.mut_ptr(), c_option.as_ptr()) };
            try_handle_status(status, "Highs_setOptionValue")?;
        }
        Ok(())
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        let c_path = path_to_cstring(path)?;
        log::debug!("Reading {} with HiGHS", path.display());
        unsafe { highs_call!(Highs_readModel(self.highs.mut_ptr(), c_path.as_ptr())) }?;
        self.pwl.clear();
        self.warm = None;
        self.structure_changed();
        Ok(())
    }

    fn write_model(&mut self, path: &Path) -> Result<()> {
        let c_path = path_to_cstring(path)?;
        unsafe { highs_call!(Highs_writeModel(self.highs.mut_ptr(), c_path.as_ptr())) }?;
        Ok(())
    }
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    path.to_str()
        .and_then(|p| CString::new(p).ok())
        .ok_or_else(|| Error::invalid(format!("unusable path {}", path.display())))
}
