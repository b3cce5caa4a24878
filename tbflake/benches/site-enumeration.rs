#![allow(clippy::needless_return)]

use tbflake::{FreeformShape, Model, PeriodicLattice, Polygon, Vector3D};
use tbflake::model::{build_bonds, enumerate_sites};

use criterion::{BenchmarkGroup, Criterion, measurement::WallTime, SamplingMode};
use criterion::{black_box, criterion_group, criterion_main};

fn graphene() -> PeriodicLattice {
    let a = 0.24595;
    let mut lattice = PeriodicLattice::new(&[
        Vector3D::new(a, 0.0, 0.0),
        Vector3D::new(0.5 * a, 0.5 * f64::sqrt(3.0) * a, 0.0),
    ]).expect("invalid lattice");

    lattice.add_sublattice("A", Vector3D::new(0.0, 0.0, 0.0), 0.0).expect("invalid sublattice");
    lattice.add_sublattice("B", Vector3D::new(1.0 / 3.0, 1.0 / 3.0, 0.0), 0.0).expect("invalid sublattice");

    for relative_index in [[0, 0, 0], [-1, 0, 0], [0, -1, 0]] {
        lattice.add_hopping(relative_index, "A", "B", -2.8).expect("invalid hopping");
    }

    return lattice;
}

fn run_enumeration(mut group: BenchmarkGroup<WallTime>, test_mode: bool) {
    let lattice = graphene();

    let sizes: &[f64] = if test_mode { &[2.0] } else { &[5.0, 10.0, 20.0, 40.0] };
    for &size in sizes {
        let polygon = Polygon::regular(6, size, 0.0).expect("invalid polygon");
        group.bench_function(&format!("polygon/radius = {} nm", size), |b| b.iter(|| {
            black_box(enumerate_sites(&lattice, &polygon).expect("failed to enumerate sites"))
        }));

        let circle = FreeformShape::circle(size).expect("invalid shape");
        group.bench_function(&format!("freeform/radius = {} nm", size), |b| b.iter(|| {
            black_box(enumerate_sites(&lattice, &circle).expect("failed to enumerate sites"))
        }));

        let sites = enumerate_sites(&lattice, &polygon).expect("failed to enumerate sites");
        group.bench_function(&format!("bonds/radius = {} nm", size), |b| b.iter(|| {
            black_box(build_bonds(&lattice, &sites).expect("failed to build bonds"))
        }));

        group.bench_function(&format!("full model/radius = {} nm", size), |b| b.iter(|| {
            black_box(Model::new(&lattice, &polygon).expect("failed to build model"))
        }));
    }
}

fn site_enumeration(c: &mut Criterion) {
    let test_mode = std::env::args().any(|arg| arg == "--test");

    let mut group = c.benchmark_group("Site enumeration/Graphene");
    group.noise_threshold(0.05);
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);

    run_enumeration(group, test_mode);
}

criterion_group!(all, site_enumeration);
criterion_main!(all);
