//! Handles to variables and constraints, and the per-entity records a [Model] keeps for them.
//!
//! Handles are small `Copy` values identifying an entity by the model that created it and
//! by its creation ordinal. Equality and hashing are by identity. All attribute access
//! goes through the owning model's dispatch ([Model::get] / [Model::set]); the typed
//! accessors below are shorthands for the canonical attribute names.
use std::convert::TryInto;
use std::fmt;

use crate::attr::{EntityKind, UserFields, Value};
use crate::error::Result;
use crate::solver::Solver;
use crate::{ConstrSense, Model, VarType};

/// A decision variable
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var {
    pub(crate) model: u32,
    pub(crate) ordinal: u32,
}

/// A linear constraint
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constr {
    pub(crate) model: u32,
    pub(crate) ordinal: u32,
}

/// Shared behaviour of [Var] and [Constr]
pub trait Entity: Copy + Eq + std::hash::Hash + fmt::Debug {
    /// Which attribute table applies
    const KIND: EntityKind;

    /// Position of the entity in creation order
    fn ordinal(self) -> usize;

    #[doc(hidden)]
    fn model_id(self) -> u32;
}

impl Entity for Var {
    const KIND: EntityKind = EntityKind::Var;

    fn ordinal(self) -> usize {
        self.ordinal as usize
    }

    fn model_id(self) -> u32 {
        self.model
    }
}

impl Entity for Constr {
    const KIND: EntityKind = EntityKind::Constr;

    fn ordinal(self) -> usize {
        self.ordinal as usize
    }

    fn model_id(self) -> u32 {
        self.model
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var({})", self.ordinal)
    }
}

impl fmt::Debug for Constr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constr({})", self.ordinal)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.ordinal)
    }
}

impl fmt::Display for Constr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.ordinal)
    }
}

macro_rules! typed_getters {
    ($entity:ty { $($(#[$doc:meta])* $fn_name:ident -> $t:ty = $attr:literal;)* }) => {
        impl $entity {
            $(
                $(#[$doc])*
                pub fn $fn_name<S: Solver>(self, model: &Model<S>) -> Result<$t> {
                    model.get(self, $attr)?.try_into()
                }
            )*
        }
    };
}

macro_rules! typed_setters {
    ($entity:ty { $($(#[$doc:meta])* $fn_name:ident($t:ty) = $attr:literal;)* }) => {
        impl $entity {
            $(
                $(#[$doc])*
                pub fn $fn_name<S: Solver>(self, model: &mut Model<S>, value: $t) -> Result<()> {
                    model.set(self, $attr, value)
                }
            )*
        }
    };
}

typed_getters!(Var {
    /// Lower bound
    lb -> f64 = "LB";
    /// Upper bound
    ub -> f64 = "UB";
    /// Linear objective coefficient
    obj -> f64 = "Obj";
    /// Variable type
    vtype -> VarType = "VType";
    /// Name
    name -> String = "VarName";
    /// Value in the last solution
    x -> f64 = "X";
    /// Reduced cost in the last solution
    rc -> f64 = "RC";
    /// Value the last solve started from
    start -> f64 = "Start";
});

typed_setters!(Var {
    /// Change the lower bound
    set_lb(f64) = "LB";
    /// Change the upper bound
    set_ub(f64) = "UB";
    /// Change the objective coefficient
    set_obj(f64) = "Obj";
    /// Change the type
    set_vtype(VarType) = "VType";
    /// Rename
    set_name(&str) = "VarName";
});

typed_getters!(Constr {
    /// Right hand side
    rhs -> f64 = "RHS";
    /// Sense
    sense -> ConstrSense = "Sense";
    /// Name
    name -> String = "ConstrName";
    /// Dual value in the last solution
    pi -> f64 = "Pi";
    /// Right hand side minus activity in the last solution
    slack -> f64 = "Slack";
});

typed_setters!(Constr {
    /// Change the right hand side
    set_rhs(f64) = "RHS";
    /// Change the sense
    set_sense(ConstrSense) = "Sense";
    /// Rename
    set_name(&str) = "ConstrName";
});

impl Var {
    /// Get any attribute by name, see [Model::get]
    pub fn get<S: Solver>(self, model: &Model<S>, name: &str) -> Result<Value> {
        model.get(self, name)
    }

    /// Set any attribute by name, see [Model::set]
    pub fn set<S: Solver>(
        self,
        model: &mut Model<S>,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        model.set(self, name, value)
    }
}

impl Constr {
    /// Get any attribute by name, see [Model::get]
    pub fn get<S: Solver>(self, model: &Model<S>, name: &str) -> Result<Value> {
        model.get(self, name)
    }

    /// Set any attribute by name, see [Model::set]
    pub fn set<S: Solver>(
        self,
        model: &mut Model<S>,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        model.set(self, name, value)
    }
}

/// Lifecycle of an entity with respect to the solver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    /// Created, waiting for the next synchronization
    Pending,
    /// Present in the solver at this native index
    Materialized(usize),
    /// Removed; the removal reaches the solver at the next synchronization
    Removed,
}

/// State common to every entity record
#[derive(Clone, Debug)]
pub(crate) struct EntityState {
    pub(crate) lifecycle: Lifecycle,
    /// Native index still held in the solver after a removal, until synchronization
    pub(crate) stale_native: Option<usize>,
    pub(crate) user: UserFields,
}

impl EntityState {
    pub(crate) fn pending() -> Self {
        Self {
            lifecycle: Lifecycle::Pending,
            stale_native: None,
            user: UserFields::default(),
        }
    }

    pub(crate) fn materialized(index: usize) -> Self {
        Self {
            lifecycle: Lifecycle::Materialized(index),
            ..Self::pending()
        }
    }

    pub(crate) fn native(&self) -> Option<usize> {
        match self.lifecycle {
            Lifecycle::Materialized(i) => Some(i),
            _ => None,
        }
    }

    pub(crate) fn is_removed(&self) -> bool {
        self.lifecycle == Lifecycle::Removed
    }
}

/// Cached solver results for a variable
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct VarSolution {
    pub(crate) x: f64,
    pub(crate) rc: Option<f64>,
    pub(crate) start: f64,
}

/// Cached solver results for a constraint
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ConstrSolution {
    pub(crate) pi: Option<f64>,
    pub(crate) slack: f64,
}

#[derive(Clone, Debug)]
pub(crate) struct VarRecord {
    pub(crate) state: EntityState,
    pub(crate) lb: f64,
    pub(crate) ub: f64,
    pub(crate) obj: f64,
    pub(crate) vtype: VarType,
    pub(crate) name: String,
    /// `(constraint ordinal, coefficient)` pairs given through a [Column](crate::Column)
    pub(crate) column: Vec<(usize, f64)>,
    pub(crate) solution: Option<VarSolution>,
}

impl VarRecord {
    /// Bounds as the solver stores them: a binary column lives inside `[0, 1]`
    pub(crate) fn native_bounds(&self) -> (f64, f64) {
        match self.vtype {
            VarType::Binary => (self.lb.max(0.), self.ub.min(1.)),
            _ => (self.lb, self.ub),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ConstrRecord {
    pub(crate) state: EntityState,
    /// `(variable ordinal, coefficient)` pairs in insertion order, duplicates allowed
    pub(crate) row: Vec<(usize, f64)>,
    pub(crate) sense: ConstrSense,
    pub(crate) rhs: f64,
    pub(crate) name: String,
    pub(crate) solution: Option<ConstrSolution>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identity_includes_the_model() {
        let a = Var { model: 1, ordinal: 0 };
        let b = Var { model: 2, ordinal: 0 };
        let c = Var { model: 1, ordinal: 0 };
        assert_ne!(a, b);
        assert_eq!(a, c);
        let set: HashSet<Var> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn default_display_names() {
        assert_eq!(Var { model: 0, ordinal: 3 }.to_string(), "C3");
        assert_eq!(Constr { model: 0, ordinal: 4 }.to_string(), "R4");
        assert_eq!(format!("{:?}", Var { model: 0, ordinal: 3 }), "Var(3)");
    }

    #[test]
    fn lifecycle_native_index() {
        let mut state = EntityState::pending();
        assert_eq!(state.native(), None);
        state.lifecycle = Lifecycle::Materialized(7);
        assert_eq!(state.native(), Some(7));
        state.lifecycle = Lifecycle::Removed;
        assert!(state.is_removed());
        assert_eq!(state.native(), None);
    }
}
