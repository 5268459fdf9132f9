//! Attribute schema: which names each kind of entity understands, where their value lives,
//! and whether they can be assigned.
//!
//! Lookups ignore ASCII case, so `VarName`, `varname` and `VARNAME` are the same attribute.
//! Names starting with [PRIVATE_PREFIX] never reach the schema: they are user fields,
//! stored per entity in a [UserFields] map.
use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;

use crate::error::{Error, Result};
use crate::solver::NativeAttr;
use crate::{ConstrSense, Sense, VarType};

/// Names starting with this marker are free-form user fields
pub const PRIVATE_PREFIX: char = '_';

/// The three kinds of objects carrying attributes
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// The model itself
    Model,
    /// A decision variable
    Var,
    /// A linear constraint
    Constr,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Model => "model",
            EntityKind::Var => "variable",
            EntityKind::Constr => "constraint",
        })
    }
}

/// A dynamically typed attribute value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// real number
    Float(f64),
    /// integer
    Int(i64),
    /// single character code, such as a variable type or a constraint sense
    Char(char),
    /// text
    Str(String),
}

impl Value {
    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Float(_) => "float",
            Value::Int(_) => "int",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
        }
    }

    fn mismatch(&self, name: &str, expected: &'static str) -> Error {
        Error::AttributeType {
            name: name.to_owned(),
            expected,
            found: self.type_name(),
        }
    }

    /// Read as a real number. Integers are widened.
    pub fn to_f64(&self, name: &str) -> Result<f64> {
        match *self {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            _ => Err(self.mismatch(name, "float")),
        }
    }

    /// Read as an integer. Floats are accepted when they hold a whole number.
    pub fn to_i64(&self, name: &str) -> Result<i64> {
        match *self {
            Value::Int(v) => Ok(v),
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
            _ => Err(self.mismatch(name, "int")),
        }
    }

    /// Read as a character code. One-character strings are accepted.
    pub fn to_char(&self, name: &str) -> Result<char> {
        match self {
            Value::Char(c) => Ok(*c),
            Value::Str(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(self.mismatch(name, "char")),
                }
            }
            _ => Err(self.mismatch(name, "char")),
        }
    }

    /// Read as text
    pub fn to_text(&self, name: &str) -> Result<String> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            _ => Err(self.mismatch(name, "string")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident via $conv:expr),* $(,)?) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant($conv(v))
            }
        })*
    };
}

value_from! {
    f64 => Float via |v| v,
    f32 => Float via f64::from,
    i64 => Int via |v| v,
    i32 => Int via i64::from,
    u32 => Int via i64::from,
    bool => Int via i64::from,
    char => Char via |v| v,
    &str => Str via str::to_owned,
    String => Str via |v| v,
    VarType => Char via VarType::code,
    ConstrSense => Char via ConstrSense::code,
    Sense => Int via Sense::code,
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(v: Value) -> Result<f64> {
        v.to_f64("value")
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(v: Value) -> Result<i64> {
        v.to_i64("value")
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(v: Value) -> Result<String> {
        v.to_text("value")
    }
}

impl TryFrom<Value> for char {
    type Error = Error;

    fn try_from(v: Value) -> Result<char> {
        v.to_char("value")
    }
}

impl TryFrom<Value> for VarType {
    type Error = Error;

    fn try_from(v: Value) -> Result<VarType> {
        VarType::from_code(v.to_char("VType")?)
    }
}

impl TryFrom<Value> for ConstrSense {
    type Error = Error;

    fn try_from(v: Value) -> Result<ConstrSense> {
        match &v {
            Value::Str(s) => s.parse(),
            _ => ConstrSense::from_code(v.to_char("Sense")?),
        }
    }
}

impl TryFrom<Value> for Sense {
    type Error = Error;

    fn try_from(v: Value) -> Result<Sense> {
        Sense::from_code(v.to_i64("ModelSense")?)
    }
}

/// Where the authoritative value of an attribute lives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Storage {
    /// Kept by the model, mirrored to the solver at synchronization
    Local,
    /// Produced by the solver, cached by the model after each optimization
    Solution,
    /// Computed from the model state on every read
    Derived,
}

/// Identifies an attribute independently of the spelling used to look it up
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum AttrKey {
    Lb,
    Ub,
    Obj,
    VType,
    VarName,
    X,
    Rc,
    Start,
    Rhs,
    Sense,
    ConstrName,
    Pi,
    Slack,
    ModelSense,
    ModelName,
    ObjCon,
    ObjVal,
    Status,
    NumVars,
    NumConstrs,
    NumIntVars,
    IsMip,
}

impl AttrKey {
    /// Translation to the solver's key, for attributes the solver knows about
    pub(crate) fn native(self) -> Option<NativeAttr> {
        Some(match self {
            AttrKey::Lb => NativeAttr::ColLower,
            AttrKey::Ub => NativeAttr::ColUpper,
            AttrKey::Obj => NativeAttr::ColCost,
            AttrKey::VType => NativeAttr::ColType,
            AttrKey::VarName => NativeAttr::ColName,
            AttrKey::X => NativeAttr::ColValue,
            AttrKey::Rc => NativeAttr::ColDual,
            AttrKey::Start => NativeAttr::ColStart,
            AttrKey::Rhs => NativeAttr::RowRhs,
            AttrKey::Sense => NativeAttr::RowSense,
            AttrKey::ConstrName => NativeAttr::RowName,
            AttrKey::Pi => NativeAttr::RowDual,
            AttrKey::Slack => NativeAttr::RowSlack,
            AttrKey::ModelSense => NativeAttr::ObjSense,
            AttrKey::ObjCon => NativeAttr::ObjOffset,
            AttrKey::ModelName
            | AttrKey::ObjVal
            | AttrKey::Status
            | AttrKey::NumVars
            | AttrKey::NumConstrs
            | AttrKey::NumIntVars
            | AttrKey::IsMip => return None,
        })
    }
}

/// One row of an attribute table
#[derive(Clone, Copy, Debug)]
pub(crate) struct AttrSpec {
    pub(crate) name: &'static str,
    pub(crate) key: AttrKey,
    pub(crate) storage: Storage,
    pub(crate) writable: bool,
}

const fn spec(name: &'static str, key: AttrKey, storage: Storage, writable: bool) -> AttrSpec {
    AttrSpec {
        name,
        key,
        storage,
        writable,
    }
}

const VAR_ATTRS: &[AttrSpec] = &[
    spec("LB", AttrKey::Lb, Storage::Local, true),
    spec("UB", AttrKey::Ub, Storage::Local, true),
    spec("Obj", AttrKey::Obj, Storage::Local, true),
    spec("VType", AttrKey::VType, Storage::Local, true),
    spec("VarName", AttrKey::VarName, Storage::Local, true),
    spec("X", AttrKey::X, Storage::Solution, false),
    spec("RC", AttrKey::Rc, Storage::Solution, false),
    spec("Start", AttrKey::Start, Storage::Solution, false),
];

const CONSTR_ATTRS: &[AttrSpec] = &[
    spec("RHS", AttrKey::Rhs, Storage::Local, true),
    spec("Sense", AttrKey::Sense, Storage::Local, true),
    spec("ConstrName", AttrKey::ConstrName, Storage::Local, true),
    spec("Pi", AttrKey::Pi, Storage::Solution, false),
    spec("Slack", AttrKey::Slack, Storage::Solution, false),
];

const MODEL_ATTRS: &[AttrSpec] = &[
    spec("ModelSense", AttrKey::ModelSense, Storage::Local, true),
    spec("ModelName", AttrKey::ModelName, Storage::Local, true),
    spec("ObjCon", AttrKey::ObjCon, Storage::Local, true),
    spec("ObjVal", AttrKey::ObjVal, Storage::Solution, false),
    spec("Status", AttrKey::Status, Storage::Derived, false),
    spec("NumVars", AttrKey::NumVars, Storage::Derived, false),
    spec("NumConstrs", AttrKey::NumConstrs, Storage::Derived, false),
    spec("NumIntVars", AttrKey::NumIntVars, Storage::Derived, false),
    spec("IsMIP", AttrKey::IsMip, Storage::Derived, false),
];

/// The attribute table of an entity kind
pub(crate) fn table(kind: EntityKind) -> &'static [AttrSpec] {
    match kind {
        EntityKind::Model => MODEL_ATTRS,
        EntityKind::Var => VAR_ATTRS,
        EntityKind::Constr => CONSTR_ATTRS,
    }
}

/// Canonical names understood by an entity kind, in table order
pub fn attribute_names(kind: EntityKind) -> impl Iterator<Item = &'static str> {
    table(kind).iter().map(|s| s.name)
}

/// Whether a name designates a user field rather than a schema attribute
pub fn is_private(name: &str) -> bool {
    name.starts_with(PRIVATE_PREFIX)
}

/// Outcome of resolving a name against a table
#[derive(Debug, Clone, Copy)]
pub(crate) enum Resolved<'n> {
    Schema(&'static AttrSpec),
    UserField(&'n str),
}

/// Resolve a name for an entity kind, ignoring ASCII case
pub(crate) fn resolve(kind: EntityKind, name: &str) -> Result<Resolved<'_>> {
    if is_private(name) {
        return Ok(Resolved::UserField(name));
    }
    table(kind)
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .map(Resolved::Schema)
        .ok_or_else(|| Error::UnknownAttribute {
            kind,
            name: name.to_owned(),
        })
}

/// Per-instance user fields, kept apart from the schema
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct UserFields(HashMap<String, Value>);

impl UserFields {
    pub(crate) fn get(&self, kind: EntityKind, name: &str) -> Result<Value> {
        self.0
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownAttribute {
                kind,
                name: name.to_owned(),
            })
    }

    pub(crate) fn set(&mut self, name: &str, value: Value) {
        self.0.insert(name.to_owned(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(kind: EntityKind, name: &str) -> AttrKey {
        match resolve(kind, name).unwrap() {
            Resolved::Schema(spec) => spec.key,
            Resolved::UserField(_) => panic!("{} resolved to a user field", name),
        }
    }

    #[test]
    fn lookup_ignores_case() {
        for name in ["VarName", "varname", "Varname", "VARNAME"] {
            assert_eq!(key_of(EntityKind::Var, name), AttrKey::VarName);
        }
        assert_eq!(key_of(EntityKind::Constr, "rhs"), AttrKey::Rhs);
        assert_eq!(key_of(EntityKind::Model, "objval"), AttrKey::ObjVal);
    }

    #[test]
    fn tables_are_per_kind() {
        assert!(resolve(EntityKind::Constr, "LB").is_err());
        assert!(resolve(EntityKind::Var, "RHS").is_err());
        assert!(resolve(EntityKind::Model, "X").is_err());
    }

    #[test]
    fn private_names_skip_the_schema() {
        assert!(matches!(
            resolve(EntityKind::Var, "_LB"),
            Ok(Resolved::UserField("_LB"))
        ));
        let err = resolve(EntityKind::Model, "blah").unwrap_err();
        assert_eq!(
            err,
            Error::UnknownAttribute {
                kind: EntityKind::Model,
                name: "blah".into()
            }
        );
    }

    #[test]
    fn user_fields_roundtrip() {
        let mut fields = UserFields::default();
        assert!(fields.get(EntityKind::Var, "_blah").is_err());
        fields.set("_blah", Value::Int(5));
        assert_eq!(fields.get(EntityKind::Var, "_blah").unwrap(), Value::Int(5));
        assert!(fields.get(EntityKind::Var, "_BLAH").is_err());
    }

    #[test]
    fn solution_attributes_are_read_only() {
        for kind in [EntityKind::Model, EntityKind::Var, EntityKind::Constr] {
            for spec in table(kind) {
                if spec.storage != Storage::Local {
                    assert!(!spec.writable, "{} should be read-only", spec.name);
                }
            }
        }
    }

    #[test]
    fn value_conversions() {
        assert_eq!(Value::Int(3).to_f64("LB").unwrap(), 3.0);
        assert_eq!(Value::Float(-1.0).to_i64("ModelSense").unwrap(), -1);
        assert!(Value::Float(0.5).to_i64("ModelSense").is_err());
        assert_eq!(Value::from("B").to_char("VType").unwrap(), 'B');
        assert!(Value::from("BB").to_char("VType").is_err());
        assert_eq!(Value::from(VarType::Integer), Value::Char('I'));
        assert_eq!(Value::from(Sense::Maximise), Value::Int(-1));
        assert_eq!(
            ConstrSense::try_from(Value::from("<=")).unwrap(),
            ConstrSense::LessEqual
        );
        let err = Value::from("x").to_f64("LB").unwrap_err();
        assert_eq!(err.to_string(), "attribute `LB` expects a float value, got string");
    }
}
