//! In-memory [Solver] that keeps the problem in plain vectors and logs every call.
//!
//! Its "optimization" puts every column at its finite lower bound (or 0) and reports the
//! objective coefficient as reduced cost, which is enough to observe what the model caches.
use std::convert::TryFrom;
use std::path::Path;

use crate::attr::{EntityKind, Value};
use crate::error::{Error, Result};
use crate::pwl::{PwlExtrapolation, PwlFragment};
use crate::solver::{NativeAttr, ParamValue, Solver, Status};
use crate::{ConstrSense, VarType, UNDEFINED};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FakeCol {
    pub(crate) lb: f64,
    pub(crate) ub: f64,
    pub(crate) obj: f64,
    pub(crate) vtype: VarType,
    pub(crate) name: String,
}

impl FakeCol {
    fn value(&self) -> f64 {
        if self.lb.is_finite() {
            self.lb
        } else {
            0.
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FakeRow {
    pub(crate) entries: Vec<(usize, f64)>,
    pub(crate) sense: ConstrSense,
    pub(crate) rhs: f64,
    pub(crate) name: String,
}

#[derive(Debug)]
pub(crate) struct RecordingSolver {
    pub(crate) cols: Vec<FakeCol>,
    pub(crate) rows: Vec<FakeRow>,
    pub(crate) sense: i64,
    pub(crate) offset: f64,
    pub(crate) pwl: Vec<PwlFragment>,
    pub(crate) calls: Vec<String>,
    pub(crate) solved: bool,
    pub(crate) fail_run: bool,
    pub(crate) fail_load: bool,
    /// Names whose allocation is refused
    pub(crate) refused: Vec<String>,
}

impl Default for RecordingSolver {
    fn default() -> Self {
        Self {
            cols: Vec::new(),
            rows: Vec::new(),
            sense: 1,
            offset: 0.,
            pwl: Vec::new(),
            calls: Vec::new(),
            solved: false,
            fail_run: false,
            fail_load: false,
            refused: Vec::new(),
        }
    }
}

impl RecordingSolver {
    fn is_mip(&self) -> bool {
        self.cols.iter().any(|c| c.vtype.is_integral())
    }

    fn col(&self, index: usize) -> Result<&FakeCol> {
        self.cols.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.cols.len(),
        })
    }

    fn row(&self, index: usize) -> Result<&FakeRow> {
        self.rows.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    fn refuse(&self, name: &str, call: &str) -> Result<()> {
        if self.refused.iter().any(|r| r == name) {
            return Err(Error::solver(-1, call));
        }
        Ok(())
    }

    fn solution<T>(&self, kind: EntityKind, name: &'static str, value: T) -> Result<T> {
        if self.solved {
            Ok(value)
        } else {
            Err(Error::AttributeNotAvailable { kind, name })
        }
    }
}

impl Solver for RecordingSolver {
    fn allocate_variable(
        &mut self,
        lb: f64,
        ub: f64,
        obj: f64,
        vtype: VarType,
        name: &str,
        column: &[(usize, f64)],
    ) -> Result<usize> {
        self.refuse(name, "allocate_variable")?;
        let index = self.cols.len();
        self.calls.push(format!("add_var {}", name));
        self.cols.push(FakeCol {
            lb,
            ub,
            obj,
            vtype,
            name: name.to_owned(),
        });
        for &(row, coeff) in column {
            self.rows[row].entries.push((index, coeff));
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
        self.refuse(name, "allocate_constraint")?;
        self.calls.push(format!("add_constr {}", name));
        self.rows.push(FakeRow {
            entries: row.to_vec(),
            sense,
            rhs,
            name: name.to_owned(),
        });
        Ok(self.rows.len() - 1)
    }

    fn get_entity_attribute(
        &self,
        kind: EntityKind,
        index: usize,
        attr: NativeAttr,
    ) -> Result<Value> {
        Ok(match attr {
            NativeAttr::ColLower => self.col(index)?.lb.into(),
            NativeAttr::ColUpper => self.col(index)?.ub.into(),
            NativeAttr::ColCost => self.col(index)?.obj.into(),
            NativeAttr::ColType => self.col(index)?.vtype.into(),
            NativeAttr::ColName => self.col(index)?.name.as_str().into(),
            NativeAttr::ColValue => self.solution(kind, "X", self.col(index)?.value())?.into(),
            NativeAttr::ColDual => {
                let obj = self.solution(kind, "RC", self.col(index)?.obj)?;
                if self.is_mip() {
                    return Err(Error::AttributeNotAvailable { kind, name: "RC" });
                }
                obj.into()
            }
            NativeAttr::ColStart => self.solution(kind, "Start", UNDEFINED)?.into(),
            NativeAttr::RowRhs => self.row(index)?.rhs.into(),
            NativeAttr::RowSense => self.row(index)?.sense.into(),
            NativeAttr::RowName => self.row(index)?.name.as_str().into(),
            NativeAttr::RowDual => {
                self.solution(kind, "Pi", ())?;
                if self.is_mip() {
                    return Err(Error::AttributeNotAvailable { kind, name: "Pi" });
                }
                0f64.into()
            }
            NativeAttr::RowSlack => {
                let row = self.row(index)?;
                let activity: f64 = row
                    .entries
                    .iter()
                    .map(|&(c, coeff)| coeff * self.cols[c].value())
                    .sum();
                self.solution(kind, "Slack", row.rhs - activity)?.into()
            }
            NativeAttr::ObjSense => Value::Int(self.sense),
            NativeAttr::ObjOffset => self.offset.into(),
        })
    }

    fn set_entity_attribute(
        &mut self,
        kind: EntityKind,
        index: usize,
        attr: NativeAttr,
        value: &Value,
    ) -> Result<()> {
        self.calls.push(format!("set {} {:?} {}", kind, attr, value));
        match attr {
            NativeAttr::ColLower => self.cols[index].lb = value.to_f64("LB")?,
            NativeAttr::ColUpper => self.cols[index].ub = value.to_f64("UB")?,
            NativeAttr::ColCost => self.cols[index].obj = value.to_f64("Obj")?,
            NativeAttr::ColType => self.cols[index].vtype = VarType::try_from(value.clone())?,
            NativeAttr::ColName => self.cols[index].name = value.to_text("VarName")?,
            NativeAttr::RowRhs => self.rows[index].rhs = value.to_f64("RHS")?,
            NativeAttr::RowSense => self.rows[index].sense = ConstrSense::try_from(value.clone())?,
            NativeAttr::RowName => self.rows[index].name = value.to_text("ConstrName")?,
            NativeAttr::ObjSense => self.sense = value.to_i64("ModelSense")?,
            NativeAttr::ObjOffset => self.offset = value.to_f64("ObjCon")?,
            attr => return Err(Error::invalid(format!("{:?} is read-only", attr))),
        }
        Ok(())
    }

    fn change_coefficient(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        self.calls.push(format!("coeff {} {} {}", row, col, value));
        let entries = &mut self.rows[row].entries;
        match entries.iter().position(|&(c, _)| c == col) {
            Some(i) if value == 0. => {
                entries.remove(i);
            }
            Some(i) => entries[i].1 = value,
            None if value != 0. => entries.push((col, value)),
            None => {}
        }
        Ok(())
    }

    fn remove_variables(&mut self, indices: &[usize]) -> Result<()> {
        self.calls.push(format!("remove_vars {:?}", indices));
        for &index in indices.iter().rev() {
            self.cols.remove(index);
            for row in &mut self.rows {
                row.entries.retain(|&(c, _)| c != index);
                for (c, _) in &mut row.entries {
                    if *c > index {
                        *c -= 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn remove_constraints(&mut self, indices: &[usize]) -> Result<()> {
        self.calls.push(format!("remove_constrs {:?}", indices));
        for &index in indices.iter().rev() {
            self.rows.remove(index);
        }
        Ok(())
    }

    fn set_pwl_objective(
        &mut self,
        fragments: &[PwlFragment],
        _extrapolation: PwlExtrapolation,
    ) -> Result<()> {
        self.calls.push(format!("pwl {}", fragments.len()));
        self.pwl = fragments.to_vec();
        Ok(())
    }

    fn constraint_row(&self, index: usize) -> Result<Vec<(usize, f64)>> {
        Ok(self.row(index)?.entries.clone())
    }

    fn entity_count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Var => self.cols.len(),
            EntityKind::Constr => self.rows.len(),
            EntityKind::Model => 1,
        }
    }

    fn run_optimization(&mut self) -> Result<Status> {
        self.calls.push("run".to_owned());
        if self.fail_run {
            self.solved = false;
            return Err(Error::solver(-1, "run"));
        }
        self.solved = true;
        Ok(Status::Optimal)
    }

    fn has_solution(&self) -> bool {
        self.solved
    }

    fn reset(&mut self) -> Result<()> {
        self.calls.push("reset".to_owned());
        self.solved = false;
        Ok(())
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        self.calls.push(format!("param {} {:?}", name, value));
        Ok(())
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        self.calls.push(format!("load {}", path.display()));
        if self.fail_load {
            return Err(Error::solver(-1, "load"));
        }
        Ok(())
    }

    fn write_model(&mut self, path: &Path) -> Result<()> {
        self.calls.push(format!("write {}", path.display()));
        Ok(())
    }
}
