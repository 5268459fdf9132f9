//! HiGHS options: how values are handed to the C API, and the classic parameter names
//! accepted on top of the native option names.
use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_int};

use crate::error::{Error, Result};
use crate::solver::ParamValue;

pub trait HighsOptionValue {
    unsafe fn apply_to_highs(self, highs: *mut c_void, option: *const c_char) -> c_int;
}

impl HighsOptionValue for bool {
    unsafe fn apply_to_highs(self, highs: *mut c_void, option: *const c_char) -> c_int {
        highs_sys::Highs_setBoolOptionValue(highs, option, if self { 1 } else { 0 })
    }
}

impl HighsOptionValue for i32 {
    unsafe fn apply_to_highs(self, highs: *mut c_void, option: *const c_char) -> c_int {
        highs_sys::Highs_setIntOptionValue(highs, option, self)
    }
}

impl HighsOptionValue for f64 {
    unsafe fn apply_to_highs(self, highs: *mut c_void, option: *const c_char) -> c_int {
        highs_sys::Highs_setDoubleOptionValue(highs, option, self)
    }
}

impl<'a> HighsOptionValue for &'a CStr {
    unsafe fn apply_to_highs(self, highs: *mut c_void, option: *const c_char) -> c_int {
        highs_sys::Highs_setStringOptionValue(highs, option, self.as_ptr())
    }
}

impl<'a> HighsOptionValue for &'a str {
    unsafe fn apply_to_highs(self, highs: *mut c_void, option: *const c_char) -> c_int {
        match CString::new(self) {
            Ok(value) => value.as_c_str().apply_to_highs(highs, option),
            Err(_) => highs_sys::STATUS_ERROR,
        }
    }
}

impl HighsOptionValue for ParamValue {
    unsafe fn apply_to_highs(self, highs: *mut c_void, option: *const c_char) -> c_int {
        match self {
            ParamValue::Bool(v) => v.apply_to_highs(highs, option),
            ParamValue::Int(v) => v.apply_to_highs(highs, option),
            ParamValue::Float(v) => v.apply_to_highs(highs, option),
            ParamValue::Str(v) => v.as_str().apply_to_highs(highs, option),
        }
    }
}

/// Type of a HiGHS option, as reported by `Highs_getOptionType`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OptionType {
    Bool,
    Int,
    Double,
    String,
}

impl OptionType {
    #[allow(non_upper_case_globals)]
    pub(crate) fn from_highs(code: c_int) -> Option<Self> {
        use highs_sys::*;
        match code {
            kHighsOptionTypeBool => Some(OptionType::Bool),
            kHighsOptionTypeInt => Some(OptionType::Int),
            kHighsOptionTypeDouble => Some(OptionType::Double),
            kHighsOptionTypeString => Some(OptionType::String),
            _ => None,
        }
    }
}

/// Native options set by a parameter name. Classic names are matched without regard to
/// case; anything else is taken as a native HiGHS option name.
pub(crate) fn expand(name: &str, value: ParamValue) -> Result<Vec<(String, ParamValue)>> {
    let native = |option: &str, value| vec![(option.to_owned(), value)];
    Ok(match name.to_ascii_lowercase().as_str() {
        "outputflag" => vec![
            ("output_flag".to_owned(), value.clone()),
            ("log_to_console".to_owned(), value),
        ],
        "timelimit" => native("time_limit", value),
        "mipgap" => native("mip_rel_gap", value),
        "threads" => native("threads", value),
        "presolve" => native("presolve", presolve_value(value)?),
        _ => native(name, value),
    })
}

/// HiGHS takes presolve as `off`, `choose` or `on`
fn presolve_value(value: ParamValue) -> Result<ParamValue> {
    Ok(ParamValue::Str(
        match value {
            ParamValue::Int(0) | ParamValue::Bool(false) => "off",
            ParamValue::Int(1) | ParamValue::Int(2) | ParamValue::Bool(true) => "on",
            ParamValue::Int(-1) => "choose",
            ParamValue::Str(s) => return Ok(ParamValue::Str(s)),
            other => {
                return Err(Error::invalid(format!("invalid presolve setting {:?}", other)))
            }
        }
        .to_owned(),
    ))
}

/// Convert a value to the type the option holds
pub(crate) fn coerce(option: &str, value: ParamValue, ty: OptionType) -> Result<ParamValue> {
    use ParamValue::*;
    let mismatch = |value: &ParamValue| {
        Error::invalid(format!(
            "option {} holds a {:?} value, got {:?}",
            option, ty, value
        ))
    };
    Ok(match (ty, value) {
        (OptionType::Bool, Bool(v)) => Bool(v),
        (OptionType::Bool, Int(v)) => Bool(v != 0),
        (OptionType::Int, Int(v)) => Int(v),
        (OptionType::Int, Bool(v)) => Int(v.into()),
        (OptionType::Int, Float(v))
            if v.fract() == 0. && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) =>
        {
            Int(v as i32)
        }
        (OptionType::Double, Float(v)) => Float(v),
        (OptionType::Double, Int(v)) => Float(v.into()),
        (OptionType::String, Str(v)) => Str(v),
        (ty, Str(v)) => {
            let parsed = match ty {
                OptionType::Bool => match v.to_ascii_lowercase().as_str() {
                    "true" | "on" | "1" => Some(Bool(true)),
                    "false" | "off" | "0" => Some(Bool(false)),
                    _ => None,
                },
                OptionType::Int => v.parse().ok().map(Int),
                OptionType::Double => v.parse().ok().map(Float),
                OptionType::String => Some(Str(v.clone())),
            };
            return parsed.ok_or_else(|| mismatch(&Str(v)));
        }
        (_, value) => return Err(mismatch(&value)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_names_expand_to_native_options() {
        let options = expand("OutputFlag", ParamValue::Int(0)).unwrap();
        assert_eq!(
            options,
            vec![
                ("output_flag".to_owned(), ParamValue::Int(0)),
                ("log_to_console".to_owned(), ParamValue::Int(0))
            ]
        );
        assert_eq!(
            expand("TIMELIMIT", 2.5.into()).unwrap(),
            vec![("time_limit".to_owned(), ParamValue::Float(2.5))]
        );
        assert_eq!(
            expand("Presolve", 0.into()).unwrap(),
            vec![("presolve".to_owned(), ParamValue::Str("off".into()))]
        );
        assert_eq!(
            expand("Presolve", (-1).into()).unwrap()[0].1,
            ParamValue::Str("choose".into())
        );
        assert!(expand("Presolve", 7.into()).is_err());
        assert_eq!(
            expand("simplex_strategy", 4.into()).unwrap(),
            vec![("simplex_strategy".to_owned(), ParamValue::Int(4))]
        );
    }

    #[test]
    fn values_follow_the_option_type() {
        assert_eq!(
            coerce("output_flag", ParamValue::Int(0), OptionType::Bool).unwrap(),
            ParamValue::Bool(false)
        );
        assert_eq!(
            coerce("time_limit", ParamValue::Int(10), OptionType::Double).unwrap(),
            ParamValue::Float(10.)
        );
        assert_eq!(
            coerce("threads", ParamValue::Float(4.), OptionType::Int).unwrap(),
            ParamValue::Int(4)
        );
        assert_eq!(
            coerce("mip_rel_gap", ParamValue::from("0.01"), OptionType::Double).unwrap(),
            ParamValue::Float(0.01)
        );
        assert!(coerce("threads", ParamValue::Float(0.5), OptionType::Int).is_err());
        assert!(coerce("solver", ParamValue::Int(1), OptionType::String).is_err());
    }
}
