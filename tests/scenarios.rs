use linmodel::{
    quicksum, Column, ConstrSense, LinExpr, Model, Sense, Status, Value, Var, VarSpec, VarType,
};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}

const DIET_SOLUTION: [f64; 5] = [0., 0., 0., 1., 10.];
const DIET_RCS: [f64; 5] = [34. / 3., 20. / 3., 34. / 3., 0., 0.];
const DIET_PIS: [f64; 2] = [13. / 3., 10. / 3.];

fn diet() -> Model {
    let mut m = Model::new("diet").unwrap();
    let x: Vec<Var> = [20., 10., 31., 11., 12.]
        .iter()
        .enumerate()
        .map(|(i, &cost)| {
            m.add_var(VarSpec::new().obj(cost).name(format!("x.{}", i + 1)))
                .unwrap()
        })
        .collect();
    m.update().unwrap();
    let iron = 2. * x[0] + 3. * x[2] + x[3] + 2. * x[4];
    m.add_constr(iron.geq(21.), "nutrient.iron").unwrap();
    let calcium = x[1] + 2. * x[2] + 2. * x[3] + x[4];
    m.add_constr(
        linmodel::TempConstr::new(calcium, ConstrSense::GreaterEqual, 12.),
        "nutrient.calcium",
    )
    .unwrap();
    m
}

fn check_diet(m: &Model) {
    assert_eq!(m.status(), Status::Optimal);
    assert_close(m.obj_val().unwrap(), 131.);
    for i in 0..5 {
        let var = m.get_var_by_name(&format!("x.{}", i + 1)).unwrap();
        assert_close(var.x(m).unwrap(), DIET_SOLUTION[i]);
        assert_close(var.rc(m).unwrap(), DIET_RCS[i]);
    }
    for (name, pi) in ["nutrient.iron", "nutrient.calcium"].iter().zip(DIET_PIS) {
        let constr = m.get_constr_by_name(name).unwrap();
        assert_close(constr.pi(m).unwrap(), pi);
        assert_close(constr.slack(m).unwrap(), 0.);
    }
}

#[test]
fn diet_problem() {
    let mut m = diet();
    m.optimize().unwrap();
    check_diet(&m);
    assert_eq!(m.get_attr("Status").unwrap(), Value::Int(2));
}

#[test]
fn diet_dual() {
    let mut m = Model::new("diet_dual").unwrap();
    m.set_attr("ModelSense", -1).unwrap();
    let pi_i = m.add_var(VarSpec::new().obj(21.)).unwrap();
    let pi_c = m.add_var(VarSpec::new().obj(12.)).unwrap();
    m.update().unwrap();
    let foods = [
        m.add_constr((2. * pi_i).leq(20.), "").unwrap(),
        m.add_constr(LinExpr::from(pi_c).leq(10.), "").unwrap(),
        m.add_constr((3. * pi_i + 2. * pi_c).leq(31.), "").unwrap(),
        m.add_constr((pi_i + 2. * pi_c).leq(11.), "").unwrap(),
        m.add_constr((2. * pi_i + pi_c).leq(12.), "").unwrap(),
    ];
    m.optimize().unwrap();
    assert_close(m.obj_val().unwrap(), 131.);
    assert_close(pi_i.x(&m).unwrap(), DIET_PIS[0]);
    assert_close(pi_c.x(&m).unwrap(), DIET_PIS[1]);
    for (constr, rc) in foods.iter().zip(DIET_RCS) {
        assert_close(constr.slack(&m).unwrap(), rc);
    }
    assert_eq!(foods[2].name(&m).unwrap(), "R2");
}

#[test]
fn diet_written_and_read_back() {
    let path = std::env::temp_dir().join(format!("linmodel_diet_{}.lp", std::process::id()));
    let mut m = diet();
    m.write(&path).unwrap();
    assert!(m.is_synchronized());

    let mut read = linmodel::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(read.num_vars(), 5);
    assert_eq!(read.num_constrs(), 2);
    assert!(read.is_synchronized());
    let iron = read.get_constr_by_name("nutrient.iron").unwrap();
    assert_eq!(iron.sense(&read).unwrap(), ConstrSense::GreaterEqual);
    assert_close(iron.rhs(&read).unwrap(), 21.);
    assert_eq!(read.get_row(iron).unwrap().len(), 4);
    read.optimize().unwrap();
    check_diet(&read);
}

const WEIGHTS: [f64; 15] = [
    70., 73., 77., 80., 82., 87., 90., 94., 98., 106., 110., 113., 115., 118., 120.,
];
const VALUES: [f64; 15] = [
    135., 139., 149., 150., 156., 163., 173., 184., 192., 201., 210., 214., 221., 229., 240.,
];
const RELAXED: [f64; 15] = [
    1., 0., 1., 0., 0., 0., 1., 1., 1., 0., 0., 0., 0.721739130435, 1., 1.,
];
const INTEGRAL: [f64; 15] = [1., 0., 1., 0., 1., 0., 1., 1., 1., 0., 0., 0., 0., 1., 1.];

fn assert_solution(m: &Model, vars: &[Var], expected: &[f64]) {
    let values = m.get_attr_list("X", vars).unwrap();
    assert_eq!(values.len(), expected.len());
    for (value, &expected) in values.iter().zip(expected) {
        assert_close(value.to_f64("X").unwrap(), expected);
    }
}

#[test]
fn knapsack() {
    let mut m = Model::new("knapsack").unwrap();
    m.set_sense(Sense::Maximise);
    let items: Vec<Var> = VALUES
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            m.add_var(
                VarSpec::new()
                    .ub(1.)
                    .obj(value)
                    .name(format!("item_selected.{}", i)),
            )
            .unwrap()
        })
        .collect();
    m.update().unwrap();
    let weight = quicksum(WEIGHTS.iter().zip(&items).map(|(&w, &item)| w * item));
    m.add_constr(weight.leq(750.), "knapsack").unwrap();
    m.optimize().unwrap();
    let knapsack = m.get_constr_by_name("knapsack").unwrap();
    assert_close(knapsack.rhs(&m).unwrap(), 750.);
    assert_solution(&m, &items, &RELAXED);

    for &item in &items {
        item.set_vtype(&mut m, VarType::Binary).unwrap();
    }
    assert!(!m.is_synchronized());
    m.optimize().unwrap();
    assert_eq!(m.get_attr("NumIntVars").unwrap(), Value::Int(15));
    assert_solution(&m, &items, &INTEGRAL);
    assert_eq!(m.get_attr("ModelName").unwrap(), Value::from("knapsack"));
}

#[test]
fn knapsack_by_columns() {
    let mut m = Model::new("knapsack_column").unwrap();
    m.set_sense(Sense::Maximise);
    let knapsack = m.add_constr(LinExpr::new().leq(750.), "knapsack").unwrap();
    m.update().unwrap();
    let items: Vec<Var> = WEIGHTS
        .iter()
        .zip(&VALUES)
        .enumerate()
        .map(|(i, (&weight, &value))| {
            let mut column = Column::new();
            column.add_term(weight, knapsack);
            m.add_var(
                VarSpec::new()
                    .ub(1.)
                    .obj(value)
                    .name(format!("x.{}", i))
                    .column(column),
            )
            .unwrap()
        })
        .collect();
    m.optimize().unwrap();
    assert_solution(&m, &items, &RELAXED);
    assert_eq!(m.get_row(knapsack).unwrap().len(), 15);
    assert_eq!(m.name(), "knapsack_column");
}

#[test]
fn simple_mip() {
    let mut m = Model::new("mip").unwrap();
    let binary = |name: &str| VarSpec::new().vtype(VarType::Binary).name(name);
    let x = m.add_var(binary("x")).unwrap();
    let y = m.add_var(binary("y")).unwrap();
    let z = m.add_var(binary("z")).unwrap();
    m.update().unwrap();
    m.set_objective(x + y + 2. * z, Some(Sense::Maximise)).unwrap();
    let c0 = m.add_constr((x + 2. * y + 3. * z).leq(4.), "constraint0").unwrap();
    let c1 = m
        .add_constr(linmodel::TempConstr::new(x + y, ">".parse().unwrap(), 1.), "constraint1")
        .unwrap();
    m.add_constr((x + y).leq(1.), "").unwrap();
    m.optimize().unwrap();
    assert_close(x.x(&m).unwrap(), 1.);
    assert_close(y.x(&m).unwrap(), 0.);
    assert_close(z.x(&m).unwrap(), 1.);
    assert_close(m.obj_val().unwrap(), 3.);
    assert_close(c0.slack(&m).unwrap(), 0.);
    assert_close(c1.slack(&m).unwrap(), 0.);
    assert_eq!(x.name(&m).unwrap(), "x");
    assert_eq!(m.get(z, "varname").unwrap(), Value::from("z"));
    assert_eq!(c1.name(&m).unwrap(), "constraint1");
    assert_eq!(m.get_attr("IsMIP").unwrap(), Value::Int(1));
    // a MIP solution carries no dual information
    assert!(c0.pi(&m).unwrap_err().is_not_available());
}

#[test]
fn reset_keeps_the_structure() {
    let mut m = Model::new("reset").unwrap();
    let x: Vec<Var> = (0..10)
        .map(|i| {
            m.add_var(VarSpec::new().lb(i as f64).name(format!("x{}", i)))
                .unwrap()
        })
        .collect();
    m.reset().unwrap();
    let y: Vec<Var> = (0..5)
        .map(|i| {
            m.add_var(VarSpec::new().ub(1000. * i as f64).name(format!("y{}", i)))
                .unwrap()
        })
        .collect();
    m.update().unwrap();
    m.set_objective(quicksum(x.iter().copied()) - quicksum(y.iter().copied()), None)
        .unwrap();
    m.optimize().unwrap();
    assert_close(m.obj_val().unwrap(), 45. - 10_000.);
    for &var in &x {
        assert_close(var.x(&m).unwrap(), var.lb(&m).unwrap());
    }
    for &var in &y {
        assert_close(var.x(&m).unwrap(), var.ub(&m).unwrap());
    }

    m.reset().unwrap();
    assert_eq!(m.status(), Status::Loaded);
    assert!(x[0].x(&m).unwrap_err().is_not_available());
    assert!(m.obj_val().is_err());
}

#[test]
fn scaled_constraint() {
    for c1 in 1..4 {
        for c2 in 1..4 {
            let mut m = Model::new("scaled").unwrap();
            m.set_param("OutputFlag", 0).unwrap();
            let x: Vec<Var> = (0..100)
                .map(|_| m.add_var(VarSpec::new()).unwrap())
                .collect();
            m.update().unwrap();
            let mut expr = quicksum(x.iter().copied());
            m.add_constr((c1 as f64 * expr.clone()).geq(1.), "").unwrap();
            expr *= c2 as f64;
            m.set_objective(expr, None).unwrap();
            m.optimize().unwrap();
            assert_close(m.obj_val().unwrap(), c2 as f64 / c1 as f64);
        }
    }
}

#[test]
fn piecewise_linear_objective() {
    let mut m = Model::new("pwl").unwrap();
    let v1 = m.add_var(VarSpec::new()).unwrap();
    let v2 = m.add_var(VarSpec::new()).unwrap();
    m.update().unwrap();
    let (xs, ys) = ([0., 1., 2.], [0., 1., 4.]);
    m.set_pwl_obj(v1, &xs, &ys).unwrap();

    v1.set_lb(&mut m, 0.5).unwrap();
    m.optimize().unwrap();
    assert_close(v1.x(&m).unwrap(), 0.5);
    assert_close(m.obj_val().unwrap(), 0.5);

    v1.set_lb(&mut m, 1.5).unwrap();
    m.optimize().unwrap();
    assert_close(v1.x(&m).unwrap(), 1.5);
    assert_close(m.obj_val().unwrap(), 2.5);

    // a new objective drops the piecewise-linear part
    m.set_objective(100. * v2, None).unwrap();
    v2.set_lb(&mut m, 7.).unwrap();
    m.optimize().unwrap();
    assert_close(m.obj_val().unwrap(), 700.);

    m.set_pwl_obj(v1, &xs, &ys).unwrap();
    m.optimize().unwrap();
    assert_close(m.obj_val().unwrap(), 702.5);
    // the solver columns are only the model's own
    assert_eq!(m.num_vars(), 2);
}

#[test]
fn expression_values() {
    let mut m = Model::new("values").unwrap();
    for n in [10, 100] {
        let x: Vec<Var> = (0..n)
            .map(|i| m.add_var(VarSpec::new().lb(i as f64)).unwrap())
            .collect();
        m.update().unwrap();
        let expr = quicksum(x.iter().enumerate().map(|(i, &var)| i as f64 * var));
        m.set_objective(expr.clone(), None).unwrap();
        m.optimize().unwrap();
        assert_eq!(m.status(), Status::Optimal);
        let expected: f64 = (0..n).map(|i| (i * i) as f64).sum();
        assert_close(expr.value(&m).unwrap(), m.obj_val().unwrap());
        assert_close(m.get_objective().value(&m).unwrap(), expected);
        assert_close(expr.value(&m).unwrap(), expected);
    }
}

#[test]
fn ranges() {
    for scale in [1., 10., 100.] {
        let mut m = Model::new("ranges").unwrap();
        let x: Vec<Var> = (0..10).map(|_| m.add_var(VarSpec::new()).unwrap()).collect();
        m.update().unwrap();
        let objective = quicksum(x.iter().copied());
        for i in 1..=5 {
            let (lb, ub) = (i as f64, 10. - i as f64);
            let dummies: Vec<Var> = (0..i).map(|_| m.add_var(VarSpec::new()).unwrap()).collect();
            let constr = m.add_range(scale * objective.clone(), lb, ub, "").unwrap();
            let extra = m
                .add_var(VarSpec::new().name(format!("extra_var.{}", i)))
                .unwrap();
            m.update().unwrap();
            let vars = m.get_vars();
            let range_var = vars[vars.len() - 2];
            assert_eq!(range_var.name(&m).unwrap(), format!("RgR{}", i - 1));
            assert_close(range_var.ub(&m).unwrap(), 10. - 2. * i as f64);
            for var in dummies {
                assert!(!var.name(&m).unwrap().starts_with("Rg"));
            }
            assert_eq!(extra.name(&m).unwrap(), format!("extra_var.{}", i));

            m.set_objective(objective.clone(), Some(Sense::Minimise)).unwrap();
            m.optimize().unwrap();
            assert_close(m.obj_val().unwrap(), lb / scale);
            assert_close(constr.pi(&m).unwrap(), 1. / scale);
            m.set_objective(objective.clone(), Some(Sense::Maximise)).unwrap();
            m.optimize().unwrap();
            assert_close(m.obj_val().unwrap(), ub / scale);
            assert_close(constr.pi(&m).unwrap(), 1. / scale);
        }
    }
}

#[test]
fn attribute_writes_reach_the_solver() {
    let mut m = Model::new("attrs").unwrap();
    let var = m.add_var(VarSpec::new().obj(1.)).unwrap();
    let constr = m.add_constr((1. * var).leq(0.), "").unwrap();
    m.update().unwrap();

    m.set(var, "LB", 100.).unwrap();
    m.set(var, "UB", 200.).unwrap();
    m.set(constr, "rhs", 150.).unwrap();
    m.set(constr, "Sense", '>').unwrap();
    assert!(!m.is_synchronized());
    m.optimize().unwrap();
    assert_eq!(var.lb(&m).unwrap(), 100.);
    assert_eq!(m.get(var, "UB").unwrap(), Value::Float(200.));
    assert_eq!(constr.rhs(&m).unwrap(), 150.);
    assert_close(var.x(&m).unwrap(), 150.);
    assert_close(constr.slack(&m).unwrap(), 0.);

    assert!(m.set(var, "X", 1.).is_err());
    assert!(m.get(var, "blah").is_err());
    m.set(constr, "_blah", 5).unwrap();
    assert_eq!(m.get(constr, "_blah").unwrap(), Value::Int(5));
    assert!(m.get(constr, "_invalid").is_err());
}

#[test]
fn removal_and_coefficients() {
    let mut m = Model::new("edit").unwrap();
    let x = m.add_var(VarSpec::new().obj(1.).name("x")).unwrap();
    let y = m.add_var(VarSpec::new().obj(1.).name("y")).unwrap();
    let z = m.add_var(VarSpec::new().obj(3.).name("z")).unwrap();
    let c = m.add_constr((x + y + z).geq(4.), "c").unwrap();
    m.optimize().unwrap();
    assert_close(m.obj_val().unwrap(), 4.);

    m.remove_var(x).unwrap();
    m.chg_coeff(c, y, 2.).unwrap();
    m.optimize().unwrap();
    assert_eq!(m.num_vars(), 2);
    assert_close(y.x(&m).unwrap(), 2.);
    assert_close(m.obj_val().unwrap(), 2.);
    assert!(x.x(&m).is_err());

    m.remove_constr(c).unwrap();
    m.optimize().unwrap();
    assert_eq!(m.num_constrs(), 0);
    assert_close(m.obj_val().unwrap(), 0.);
    assert_eq!(m.get_vars(), vec![y, z]);
}

#[test]
fn infeasible_model() {
    let mut m = Model::new("infeasible").unwrap();
    let x = m.add_var(VarSpec::new().ub(1.)).unwrap();
    m.add_constr((1. * x).geq(2.), "").unwrap();
    m.optimize().unwrap();
    assert_eq!(m.status(), Status::Infeasible);
    assert!(x.x(&m).unwrap_err().is_not_available());
    assert!(m.obj_val().is_err());
}
