//! Linear expressions over variables.
//!
//! A [LinExpr] is an ordered list of `(variable, coefficient)` terms plus a constant.
//! Terms are never merged or reordered: combining expressions concatenates their terms,
//! so a variable may appear several times and positional access ([LinExpr::coeff],
//! [LinExpr::var]) always reflects insertion order. Expressions are plain values; building
//! them never touches a model or a solver.
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::entity::Var;
use crate::error::{Error, Result};
use crate::solver::Solver;
use crate::{ConstrSense, Model};

/// A linear expression: `sum(coeff_i * var_i) + constant`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(Var, f64)>,
    constant: f64,
}

impl LinExpr {
    /// The empty expression, equal to zero
    pub fn new() -> Self {
        Self::default()
    }

    /// An expression with no terms
    pub fn constant_expr(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    /// A single term `coeff * var`
    pub fn term(coeff: f64, var: Var) -> Self {
        Self {
            terms: vec![(var, coeff)],
            constant: 0.,
        }
    }

    /// Build from parallel lists of coefficients and variables
    pub fn from_terms(coeffs: &[f64], vars: &[Var]) -> Result<Self> {
        let mut expr = Self::new();
        expr.add_terms(coeffs, vars)?;
        Ok(expr)
    }

    /// Number of terms, duplicates included
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True when there is no term (the constant may be non-zero)
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Coefficient of the term at position `i`
    pub fn coeff(&self, i: usize) -> Result<f64> {
        self.term_at(i).map(|(_, c)| c)
    }

    /// Variable of the term at position `i`
    pub fn var(&self, i: usize) -> Result<Var> {
        self.term_at(i).map(|(v, _)| v)
    }

    fn term_at(&self, i: usize) -> Result<(Var, f64)> {
        self.terms
            .get(i)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index: i,
                len: self.terms.len(),
            })
    }

    /// The constant term
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Terms in insertion order
    pub fn terms(&self) -> impl ExactSizeIterator<Item = (Var, f64)> + '_ {
        self.terms.iter().copied()
    }

    /// Append `coeff * var`
    pub fn add_term(&mut self, coeff: f64, var: Var) {
        self.terms.push((var, coeff));
    }

    /// Append one term per pair of `coeffs` and `vars`
    pub fn add_terms(&mut self, coeffs: &[f64], vars: &[Var]) -> Result<()> {
        if coeffs.len() != vars.len() {
            return Err(Error::invalid(format!(
                "{} coefficients for {} variables",
                coeffs.len(),
                vars.len()
            )));
        }
        self.terms
            .extend(vars.iter().copied().zip(coeffs.iter().copied()));
        Ok(())
    }

    /// Add to the constant term
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Append `mult * other` in place
    pub fn add_expr(&mut self, other: &LinExpr, mult: f64) {
        self.terms
            .extend(other.terms.iter().map(|&(v, c)| (v, c * mult)));
        self.constant += other.constant * mult;
    }

    /// Remove the term at position `i`
    pub fn remove(&mut self, i: usize) -> Result<(Var, f64)> {
        let term = self.term_at(i)?;
        self.terms.remove(i);
        Ok(term)
    }

    /// Remove every term and the constant
    pub fn clear(&mut self) {
        self.terms.clear();
        self.constant = 0.;
    }

    /// `self + other`: terms of `self` followed by terms of `other`
    pub fn add(&self, other: &LinExpr) -> LinExpr {
        let mut sum = self.clone();
        sum.add_expr(other, 1.);
        sum
    }

    /// `self - other`: terms of `self` followed by the negated terms of `other`
    pub fn subtract(&self, other: &LinExpr) -> LinExpr {
        let mut diff = self.clone();
        diff.add_expr(other, -1.);
        diff
    }

    /// Multiply every coefficient and the constant. Zero coefficients are kept.
    pub fn scale(&self, k: f64) -> LinExpr {
        LinExpr {
            terms: self.terms.iter().map(|&(v, c)| (v, c * k)).collect(),
            constant: self.constant * k,
        }
    }

    /// `-self`
    pub fn negate(&self) -> LinExpr {
        self.scale(-1.)
    }

    /// Value of the expression at the solution cached by `model`.
    /// Fails if a variable has no solution value yet.
    pub fn value<S: Solver>(&self, model: &Model<S>) -> Result<f64> {
        self.terms.iter().try_fold(self.constant, |acc, &(v, c)| {
            Ok(acc + c * model.solution_value(v)?)
        })
    }

    /// `self <= rhs`
    pub fn leq(self, rhs: impl Into<LinExpr>) -> TempConstr {
        TempConstr::new(self, ConstrSense::LessEqual, rhs)
    }

    /// `self >= rhs`
    pub fn geq(self, rhs: impl Into<LinExpr>) -> TempConstr {
        TempConstr::new(self, ConstrSense::GreaterEqual, rhs)
    }

    /// `self == rhs`
    pub fn equal(self, rhs: impl Into<LinExpr>) -> TempConstr {
        TempConstr::new(self, ConstrSense::Equal, rhs)
    }
}

/// Concatenate expressions, in input order, into a single expression.
/// Nothing is merged or simplified.
///
/// ```
/// # use linmodel::{quicksum, LinExpr, Model, VarSpec};
/// let mut model = Model::new("sum").unwrap();
/// let x: Vec<_> = (0..3).map(|_| model.add_var(VarSpec::new()).unwrap()).collect();
/// let expr = quicksum(x.iter().enumerate().map(|(i, &v)| v * i as f64));
/// assert_eq!(expr.len(), 3);
/// assert_eq!(expr.coeff(2).unwrap(), 2.);
/// assert_eq!(expr.var(2).unwrap(), x[2]);
/// ```
pub fn quicksum<T: Into<LinExpr>>(items: impl IntoIterator<Item = T>) -> LinExpr {
    items.into_iter().fold(LinExpr::new(), |mut acc, item| {
        acc += item.into();
        acc
    })
}

impl<T: Into<LinExpr>> Sum<T> for LinExpr {
    fn sum<I: Iterator<Item = T>>(iter: I) -> Self {
        quicksum(iter)
    }
}

impl From<Var> for LinExpr {
    fn from(var: Var) -> Self {
        LinExpr::term(1., var)
    }
}

impl From<f64> for LinExpr {
    fn from(constant: f64) -> Self {
        LinExpr::constant_expr(constant)
    }
}

impl From<&LinExpr> for LinExpr {
    fn from(expr: &LinExpr) -> Self {
        expr.clone()
    }
}

impl fmt::Display for LinExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for &(var, coeff) in &self.terms {
            let sign = if coeff < 0. { "-" } else { "+" };
            if first {
                if coeff < 0. {
                    f.write_str("-")?;
                }
            } else {
                write!(f, " {} ", sign)?;
            }
            write!(f, "{} {}", coeff.abs(), var)?;
            first = false;
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant != 0. {
            let sign = if self.constant < 0. { "-" } else { "+" };
            write!(f, " {} {}", sign, self.constant.abs())
        } else {
            Ok(())
        }
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
        self.add_expr(&rhs.into(), -1.);
    }
}

impl MulAssign<f64> for LinExpr {
    fn mul_assign(&mut self, k: f64) {
        for (_, c) in &mut self.terms {
            *c *= k;
        }
        self.constant *= k;
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

impl<T: Into<LinExpr>> Add<T> for Var {
    type Output = LinExpr;

    fn add(self, rhs: T) -> LinExpr {
        LinExpr::from(self) + rhs
    }
}

impl<T: Into<LinExpr>> Sub<T> for Var {
    type Output = LinExpr;

    fn sub(self, rhs: T) -> LinExpr {
        LinExpr::from(self) - rhs
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;

    fn mul(mut self, k: f64) -> LinExpr {
        self *= k;
        self
    }
}

impl Mul<f64> for Var {
    type Output = LinExpr;

    fn mul(self, k: f64) -> LinExpr {
        LinExpr::term(k, self)
    }
}

impl Mul<LinExpr> for f64 {
    type Output = LinExpr;

    fn mul(self, expr: LinExpr) -> LinExpr {
        expr * self
    }
}

impl Mul<Var> for f64 {
    type Output = LinExpr;

    fn mul(self, var: Var) -> LinExpr {
        LinExpr::term(self, var)
    }
}

impl Add<LinExpr> for f64 {
    type Output = LinExpr;

    fn add(self, expr: LinExpr) -> LinExpr {
        LinExpr::from(self) + expr
    }
}

impl Add<Var> for f64 {
    type Output = LinExpr;

    fn add(self, var: Var) -> LinExpr {
        LinExpr::from(self) + var
    }
}

impl Sub<LinExpr> for f64 {
    type Output = LinExpr;

    fn sub(self, expr: LinExpr) -> LinExpr {
        LinExpr::from(self) - expr
    }
}

impl Sub<Var> for f64 {
    type Output = LinExpr;

    fn sub(self, var: Var) -> LinExpr {
        LinExpr::from(self) - var
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        self * -1.
    }
}

impl Neg for Var {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        LinExpr::term(-1., self)
    }
}

/// A constraint that has not been added to a model yet: `lhs sense rhs`
#[derive(Clone, Debug, PartialEq)]
pub struct TempConstr {
    lhs: LinExpr,
    sense: ConstrSense,
    rhs: LinExpr,
}

impl TempConstr {
    /// Compare two expressions (or variables, or constants)
    pub fn new(lhs: impl Into<LinExpr>, sense: ConstrSense, rhs: impl Into<LinExpr>) -> Self {
        Self {
            lhs: lhs.into(),
            sense,
            rhs: rhs.into(),
        }
    }

    /// The sense of the comparison
    pub fn sense(&self) -> ConstrSense {
        self.sense
    }

    /// Normal form `row sense rhs`: all terms on the left, the constant on the right
    pub fn into_row(self) -> (LinExpr, ConstrSense, f64) {
        let mut row = self.lhs;
        row -= self.rhs;
        let rhs = -row.constant;
        row.constant = 0.;
        (row, self.sense, rhs)
    }
}
