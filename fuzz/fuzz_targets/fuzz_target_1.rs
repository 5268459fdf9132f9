#![no_main]
use linmodel::{LinExpr, Model, Sense, VarSpec, VarType};
use libfuzzer_sys::arbitrary;
use libfuzzer_sys::arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use std::ops::Range;

#[derive(Arbitrary)]
struct ColData {
    val: f64,
    range: Range<f64>,
    integrality: bool,
}

fn test(u: &mut Unstructured) -> arbitrary::Result<()> {
    let mut model = Model::new("fuzz").map_err(|_| arbitrary::Error::IncorrectFormat)?;
    let vars = u
        .arbitrary_iter::<ColData>()?
        .map(|cd| {
            let cd = cd?;
            let vtype = if cd.integrality {
                VarType::Integer
            } else {
                VarType::Continuous
            };
            let spec = VarSpec::new()
                .lb(cd.range.start)
                .ub(cd.range.end)
                .obj(cd.val)
                .vtype(vtype);
            model
                .add_var(spec)
                .map_err(|_| arbitrary::Error::IncorrectFormat)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let num_rows = u.arbitrary::<u8>()? as usize;

    let mut constrs = Vec::new();
    // every range brings its own auxiliary variable
    let mut ranges = 0;
    for _ in 0..num_rows {
        let mut expr = LinExpr::new();
        for _ in 0..3 {
            expr.add_term(u.arbitrary()?, *u.choose(&vars)?);
        }
        let (lower, upper) = (u.arbitrary::<f64>()?, u.arbitrary::<f64>()?);
        let constr = if u.arbitrary()? {
            let range = model.add_range(expr, lower, upper, "");
            ranges += range.is_ok() as usize;
            range
        } else {
            model.add_constr(expr.leq(upper), "")
        };
        if let Ok(constr) = constr {
            constrs.push(constr);
        }
    }
    // Drop a few entities before the first synchronization
    let mut removed = 0;
    for _ in 0..u.int_in_range(0..=2)? {
        if model.remove_var(*u.choose(&vars)?).is_ok() {
            removed += 1;
        }
    }
    model.set_sense(*u.choose(&[Sense::Maximise, Sense::Minimise])?);
    if model.optimize().is_ok() {
        // Every live entity reached the solver
        assert!(model.is_synchronized());
        assert_eq!(model.num_vars(), vars.len() + ranges - removed);
        assert_eq!(model.get_vars().len(), model.num_vars());
        assert_eq!(model.num_constrs(), constrs.len());
        for &constr in &constrs {
            assert!(model.get_row(constr).is_ok());
        }
    }
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let _ = test(&mut u);
});
