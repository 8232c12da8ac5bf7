use fibre_solver::prelude::*;

const YOUNGS_MODULUS: f64 = 2.06e11;
const AREA: f64 = 0.0125;
const MOMENT_OF_INERTIA: f64 = 4.57e-4;
const PERCENT_TOLERANCE: f64 = 0.02;

const DIVISIONS: usize = 10;
const BEAM_LENGTH: f64 = 10.0;
const Y_LOAD: f64 = -1e5;
const TRANSVERSE: usize = 2;

fn line_model(template: ElementTemplate) -> Model {
    let mesh = GlobalMesh::create_line_mesh(
        DIVISIONS,
        [[0.0, 0.0, 0.0], [BEAM_LENGTH, 0.0, 0.0]],
        &template,
    )
    .unwrap();
    Model::new(mesh)
}

fn elastic_template() -> ElementTemplate {
    ElementTemplate::LinearElastic(BasicSection::new(YOUNGS_MODULUS, AREA, MOMENT_OF_INERTIA))
}

fn build_cantilever(template: ElementTemplate) -> Model {
    let tip = DIVISIONS + 1;
    let mut model = line_model(template);
    model
        .add_restraint(NodalRestraint::fixed().with_nodes([1]))
        .unwrap();
    model.restrain_out_of_plane(2..=tip).unwrap();
    model.add_nodal_load(&[tip], &[TRANSVERSE], &[Y_LOAD]).unwrap();
    model.track_nodes(&[tip], &[TRANSVERSE]).unwrap();
    model
}

fn build_simply_supported(template: ElementTemplate) -> Model {
    let mid = DIVISIONS / 2 + 1;
    let mut model = line_model(template);

    let mut pin = NodalRestraint::new();
    pin.assign_dofs_restraints([0, 1, 2, 3, 4]).unwrap();
    model.add_restraint(pin.with_nodes([1])).unwrap();

    let mut roller = NodalRestraint::new();
    roller.assign_dofs_restraints([1, 2, 3, 4]).unwrap();
    model.add_restraint(roller.with_nodes([DIVISIONS + 1])).unwrap();

    model.restrain_out_of_plane(2..=DIVISIONS).unwrap();
    model.add_nodal_load(&[mid], &[TRANSVERSE], &[Y_LOAD]).unwrap();
    model.track_nodes(&[mid], &[TRANSVERSE]).unwrap();
    model
}

fn assert_within_percent(actual: f64, expected: f64) {
    let tolerance = (PERCENT_TOLERANCE * expected).abs();
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected:.6e} +/- {tolerance:.3e}, got {actual:.6e}"
    );
}

fn options() -> AnalysisOptions {
    AnalysisOptions::new()
        .with_load_factor(1.0)
        .with_steps(10)
        .with_tolerance(1e-2)
        .with_max_iter(30)
}

#[test]
fn cantilever_tip_deflection() {
    let tip = DIVISIONS + 1;
    let mut model = build_cantilever(elastic_template());
    let outcome = model.analyze(&options()).unwrap();
    assert!(outcome.succeeded);

    let correct = Y_LOAD * BEAM_LENGTH.powi(3) / (3.0 * YOUNGS_MODULUS * MOMENT_OF_INERTIA);
    let history = model.scribe.record(tip).unwrap().history(TRANSVERSE).unwrap();
    assert_eq!(history.len(), 10);
    assert_within_percent(*history.last().unwrap(), correct);
    assert_within_percent(history[4], correct / 2.0);
}

#[test]
fn simply_supported_midspan_deflection() {
    let mid = DIVISIONS / 2 + 1;
    let mut model = build_simply_supported(elastic_template());
    let outcome = model.analyze(&options()).unwrap();
    assert!(outcome.succeeded);

    let correct = Y_LOAD * BEAM_LENGTH.powi(3) / (48.0 * YOUNGS_MODULUS * MOMENT_OF_INERTIA);
    let latest = model.scribe.record(mid).unwrap().latest(TRANSVERSE).unwrap();
    assert_within_percent(latest, correct);

    // Symmetric load: no rotation at midspan
    assert!(model.node_displacement(mid).unwrap().rz.abs() < 1e-9);
}

#[test]
fn fibre_cantilever_below_yield_matches_beam_theory() {
    let steel = ElasticPlasticMaterial::new(YOUNGS_MODULUS, 550e6, 0.0);
    let section =
        FibreSection::i_section(&steel, 0.0, 19.6e-3, 192.8e-3, 11.4e-3, 467.2e-3, 4, 10).unwrap();
    let ei = section.tangent()[(1, 1)];

    // Well below first yield for the 10 m cantilever
    let load = -2e4;
    let tip = DIVISIONS + 1;
    let mut model = line_model(ElementTemplate::FibrePlastic(section));
    model
        .add_restraint(NodalRestraint::fixed().with_nodes([1]))
        .unwrap();
    model.restrain_out_of_plane(2..=tip).unwrap();
    model.add_nodal_load(&[tip], &[TRANSVERSE], &[load]).unwrap();

    let outcome = model.analyze(&options().with_steps(4)).unwrap();
    assert!(outcome.succeeded);

    let correct = load * BEAM_LENGTH.powi(3) / (3.0 * ei);
    assert_within_percent(model.node_displacement(tip).unwrap().dz, correct);
}

#[test]
fn skyline_solver_gives_the_same_answer() {
    let tip = DIVISIONS + 1;
    let mut lu = build_cantilever(elastic_template());
    let mut skyline = build_cantilever(elastic_template());
    lu.analyze(&options()).unwrap();
    skyline
        .analyze(&options().with_linear_solver(LinearSolverKind::Skyline))
        .unwrap();

    let a = lu.node_displacement(tip).unwrap();
    let b = skyline.node_displacement(tip).unwrap();
    assert!((a.dz - b.dz).abs() <= 1e-9 * a.dz.abs());
    assert!((a.rz - b.rz).abs() <= 1e-9 * a.rz.abs());
}

#[test]
fn load_on_restrained_dof_is_ignored() {
    let tip = DIVISIONS + 1;
    let mut reference = build_cantilever(elastic_template());
    let mut model = build_cantilever(elastic_template());
    // DoF 1 is restrained out of plane at the tip
    model.add_nodal_load(&[tip], &[1], &[5e4]).unwrap();

    reference.analyze(&options().with_steps(1)).unwrap();
    let outcome = model.analyze(&options().with_steps(1)).unwrap();
    assert!(outcome.succeeded);

    let a = reference.node_displacement(tip).unwrap();
    let b = model.node_displacement(tip).unwrap();
    assert_eq!(b.dy, 0.0);
    assert!((a.dz - b.dz).abs() <= 1e-12 * a.dz.abs());
}
