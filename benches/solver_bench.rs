//! Benchmarks for the fibre solver

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fibre_solver::prelude::*;

fn i_section() -> FibreSection {
    let steel = ElasticPlasticMaterial::steel(550e6, 0.02);
    FibreSection::i_section(&steel, 0.0, 19.6e-3, 192.8e-3, 11.4e-3, 467.2e-3, 4, 10).unwrap()
}

fn create_plastic_cantilever(divisions: usize) -> Model {
    let template = ElementTemplate::FibrePlastic(i_section());
    let mesh =
        GlobalMesh::create_line_mesh(divisions, [[0.0, 0.0, 0.0], [3.0, 0.0, 0.0]], &template)
            .unwrap();
    let tip = divisions + 1;

    let mut model = Model::new(mesh);
    model.add_restraint(NodalRestraint::fixed().with_nodes([1])).unwrap();
    model.restrain_out_of_plane(2..=tip).unwrap();
    model.add_nodal_load(&[tip], &[2], &[-3.8e5]).unwrap();
    model
}

fn create_multi_story_frame(stories: usize, bays: usize) -> Model {
    let frame = FrameMesh::new(bays, stories, 6.0, 3.5, 4, 3).unwrap();
    let column = ElementTemplate::LinearElastic(BasicSection::rectangular(2.06e11, 0.4, 0.4));
    let beam = ElementTemplate::LinearElastic(BasicSection::rectangular(2.06e11, 0.3, 0.6));
    let mesh = GlobalMesh::create_frame_mesh(&frame, &column, &beam).unwrap();

    let mut model = Model::new(mesh);
    model
        .add_restraint(NodalRestraint::fixed().with_nodes(frame.column_bases()))
        .unwrap();
    model.restrain_out_of_plane(frame.out_of_plane_nodes()).unwrap();
    for story in 1..=stories {
        for column_line in 0..=bays {
            let id = frame.vertex_id(column_line, story).unwrap();
            model.add_nodal_load(&[id], &[2], &[-50000.0]).unwrap();
        }
    }
    model
}

fn options() -> AnalysisOptions {
    AnalysisOptions::new().with_steps(10).with_tolerance(1e-2)
}

fn benchmark_plastic_cantilever(c: &mut Criterion) {
    c.bench_function("cantilever_10_plastic", |b| {
        b.iter(|| {
            let mut model = create_plastic_cantilever(10);
            black_box(model.analyze(&options()).unwrap());
        })
    });
}

fn benchmark_small_frame(c: &mut Criterion) {
    c.bench_function("frame_3story_2bay_local", |b| {
        b.iter(|| {
            let mut model = create_multi_story_frame(3, 2);
            black_box(model.analyze(&options()).unwrap());
        })
    });
}

fn benchmark_medium_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_10story_5bay");
    group.bench_function("local_lu", |b| {
        b.iter(|| {
            let mut model = create_multi_story_frame(10, 5);
            black_box(model.analyze(&options()).unwrap());
        })
    });
    group.bench_function("local_skyline", |b| {
        b.iter(|| {
            let mut model = create_multi_story_frame(10, 5);
            let options = options().with_linear_solver(LinearSolverKind::Skyline);
            black_box(model.analyze(&options).unwrap());
        })
    });
    group.bench_function("distributed_4", |b| {
        b.iter(|| {
            let mut model = create_multi_story_frame(10, 5);
            let options = options().with_backend(BackendKind::Distributed { partitions: 4 });
            black_box(model.analyze(&options).unwrap());
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_plastic_cantilever,
    benchmark_small_frame,
    benchmark_medium_frame,
);

criterion_main!(benches);
