//! Column view of a variable: the constraints it appears in, used to create a variable
//! directly inside existing constraints.
use std::borrow::Borrow;

use crate::entity::Constr;
use crate::error::{Error, Result};

/// An ordered list of `(constraint, coefficient)` pairs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Column {
    entries: Vec<(Constr, f64)>,
}

impl Column {
    /// An empty column
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `coeff` in `constr`
    pub fn add_term(&mut self, coeff: f64, constr: Constr) {
        self.entries.push((constr, coeff));
    }

    /// Append several `(constraint, coefficient)` pairs
    pub fn add_terms<ITEM: Borrow<(Constr, f64)>, I: IntoIterator<Item = ITEM>>(
        &mut self,
        entries: I,
    ) {
        let iter = entries.into_iter();
        let (size, _) = iter.size_hint();
        self.entries.reserve(size);
        for e in iter {
            self.entries.push(*e.borrow());
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the column has no entry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, i: usize) -> Result<(Constr, f64)> {
        self.entries.get(i).copied().ok_or(Error::IndexOutOfRange {
            index: i,
            len: self.entries.len(),
        })
    }

    /// Coefficient of the entry at position `i`
    pub fn coeff(&self, i: usize) -> Result<f64> {
        self.entry(i).map(|(_, c)| c)
    }

    /// Constraint of the entry at position `i`
    pub fn constr(&self, i: usize) -> Result<Constr> {
        self.entry(i).map(|(r, _)| r)
    }

    /// Remove the entry at position `i`
    pub fn remove(&mut self, i: usize) -> Result<(Constr, f64)> {
        let entry = self.entry(i)?;
        self.entries.remove(i);
        Ok(entry)
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[(Constr, f64)] {
        &self.entries
    }
}

impl<ITEM: Borrow<(Constr, f64)>> FromIterator<ITEM> for Column {
    fn from_iter<I: IntoIterator<Item = ITEM>>(iter: I) -> Self {
        let mut col = Column::new();
        col.add_terms(iter);
        col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constrs(n: u32) -> Vec<Constr> {
        (0..n).map(|ordinal| Constr { model: 0, ordinal }).collect()
    }

    #[test]
    fn positional_access() {
        let r = constrs(3);
        let mut col = Column::new();
        col.add_term(2., r[1]);
        col.add_terms(&[(r[0], 1.), (r[2], -1.)]);
        assert_eq!(col.len(), 3);
        assert_eq!(col.constr(0).unwrap(), r[1]);
        assert_eq!(col.coeff(2).unwrap(), -1.);
        assert_eq!(
            col.coeff(3).unwrap_err(),
            Error::IndexOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn editing() {
        let r = constrs(2);
        let mut col: Column = vec![(r[0], 1.), (r[1], 5.)].into_iter().collect();
        assert_eq!(col.remove(0).unwrap(), (r[0], 1.));
        assert_eq!(col.constr(0).unwrap(), r[1]);
        assert!(col.remove(1).is_err());
        col.clear();
        assert!(col.is_empty());
    }
}
