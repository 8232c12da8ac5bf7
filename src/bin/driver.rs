//! Fibre Driver - plastic cantilever under an increasing tip load
//!
//! Usage:
//!   fibre-driver <max_load_factor> <num_steps> <tolerance> <max_iterations>
//!   fibre-driver <options.json>
//!   fibre-driver
//!
//! Without arguments the default analysis options are used.

use anyhow::{bail, Context, Result};
use log::info;

use fibre_solver::prelude::*;

const DIVISIONS: usize = 10;
const BEAM_LENGTH: f64 = 3.0;
const YIELD_STRENGTH: f64 = 550e6;
const HARDENING_RATIO: f64 = 0.02;
const TIP_LOAD: f64 = -3.8e5;

fn parse_options(args: &[String]) -> Result<AnalysisOptions> {
    match args {
        [] => Ok(AnalysisOptions::default()),
        [path] => AnalysisOptions::from_json_file(path)
            .with_context(|| format!("failed to read analysis options from {path}")),
        [max_lf, steps, tol, max_iter] => {
            let options = AnalysisOptions::new()
                .with_load_factor(max_lf.parse().context("max_load_factor must be a number")?)
                .with_steps(steps.parse().context("num_steps must be a positive integer")?)
                .with_tolerance(tol.parse().context("tolerance must be a number")?)
                .with_max_iter(max_iter.parse().context("max_iterations must be a positive integer")?);
            options.validate()?;
            Ok(options)
        }
        _ => bail!(
            "expected <max_load_factor> <num_steps> <tolerance> <max_iterations> or <options.json>, got {} arguments",
            args.len()
        ),
    }
}

fn build_model() -> Result<Model> {
    let steel = ElasticPlasticMaterial::steel(YIELD_STRENGTH, HARDENING_RATIO);
    // UB 457x191x98, bottom flange face on the reference axis
    let section = FibreSection::i_section(&steel, 0.0, 19.6e-3, 192.8e-3, 11.4e-3, 467.2e-3, 4, 10)?;
    let template = ElementTemplate::FibrePlastic(section);
    let mesh = GlobalMesh::create_line_mesh(
        DIVISIONS,
        [[0.0, 0.0, 0.0], [BEAM_LENGTH, 0.0, 0.0]],
        &template,
    )?;

    let tip = DIVISIONS + 1;
    let mut model = Model::new(mesh);
    model.add_restraint(NodalRestraint::fixed().with_nodes([1]))?;
    model.restrain_out_of_plane(2..=tip)?;
    model.add_nodal_load(&[tip], &[2], &[TIP_LOAD])?;
    model.track_nodes(&[tip], &[2])?;
    model.track_elements(&[1])?;
    Ok(model)
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_options(&args)?;
    info!("Analysis options: {:?}", options);

    let mut model = build_model()?;
    let outcome = model.analyze(&options)?;

    if outcome.succeeded {
        println!("ANALYSIS_SUCCEEDED");
    } else {
        println!("ANALYSIS_FAILED");
    }
    println!("iterations: {}", outcome.total_iterations);
    println!("load factor: {:.6}", outcome.load_factor);
    println!("elapsed: {:.3} s", outcome.elapsed.as_secs_f64());

    let tip = model.node_displacement(DIVISIONS + 1)?;
    println!("tip deflection: {:.6e} m", tip.dz);
    Ok(())
}
