//! Fibre Solver Example - Plastic Portal Frame
//!
//!     4 -- 5 -- 6 -- 10     <- lateral load at node 4
//!     |              |         gravity at nodes 5 and 6
//!     3              9
//!     |              |
//!     2              8
//!     |              |
//!     1              7
//!     ^              ^
//!   Fixed          Fixed

use anyhow::Result;

use fibre_solver::prelude::*;

fn main() -> Result<()> {
    env_logger::init();
    println!("=== Fibre Solver Example: Portal Frame ===\n");

    let steel = ElasticPlasticMaterial::steel(355e6, 0.01);
    let column = FibreSection::i_section(&steel, -0.1, 15.0e-3, 200.0e-3, 9.0e-3, 200.0e-3, 4, 10)?;
    let beam = FibreSection::i_section(&steel, -0.2, 12.7e-3, 190.4e-3, 7.9e-3, 406.6e-3, 4, 10)?;

    // 6 m span, 4 m storey, beams in 3 and columns in 3 elements
    let frame = FrameMesh::new(1, 1, 6.0, 4.0, 3, 3)?;
    let mesh = GlobalMesh::create_frame_mesh(
        &frame,
        &ElementTemplate::FibrePlastic(column),
        &ElementTemplate::FibrePlastic(beam),
    )?;
    println!(
        "Mesh: {} nodes, {} elements",
        mesh.num_nodes(),
        mesh.num_elements()
    );

    let mut model = Model::new(mesh);
    model.add_restraint(NodalRestraint::fixed().with_nodes(frame.column_bases()))?;
    model.restrain_out_of_plane(frame.out_of_plane_nodes())?;

    let top_left = frame.vertex_id(0, 1)?;
    let top_right = frame.vertex_id(1, 1)?;
    let beam_nodes = frame.beam_node_ids(1, 1, false)?;
    model.add_nodal_load(&[top_left], &[0], &[50e3])?;
    // DoF 2 is the in-plane transverse translation, vertical for this frame
    model.add_nodal_load(&beam_nodes, &[2], &[-100e3])?;
    model.track_nodes(&[top_left, top_right], &[0, 2])?;

    let options = AnalysisOptions::new()
        .with_load_factor(1.0)
        .with_steps(20)
        .with_tolerance(1e-3)
        .with_max_iter(30)
        .with_backend(BackendKind::Distributed { partitions: 2 })
        .with_logging(5);
    let outcome = model.analyze(&options)?;

    println!("=== Analysis Results ===\n");
    println!(
        "{} after {} steps and {} iterations (load factor {:.3})",
        if outcome.succeeded { "Converged" } else { "Stopped" },
        outcome.num_steps(),
        outcome.total_iterations,
        outcome.load_factor
    );

    println!("\nNode Displacements:");
    for id in [top_left, top_right] {
        let d = model.node_displacement(id)?;
        println!(
            "  Node {}: sway = {:.4} mm, vertical = {:.4} mm, rotation = {:.6} rad",
            id,
            d.dx * 1000.0,
            d.dz * 1000.0,
            d.rz
        );
    }

    println!("\nSway history at node {}:", top_left);
    if let Some(history) = model.scribe.record(top_left).and_then(|r| r.history(0)) {
        for (lf, dx) in model.scribe.load_factors().iter().zip(history) {
            println!("  LF {:.2}: {:.4} mm", lf, dx * 1000.0);
        }
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
