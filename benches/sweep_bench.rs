use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use std::sync::Arc;

use sweepflow::axis::{DataAxis, DataStreamDescriptor, SharedAxis};
use sweepflow::parameter::Parameter;
use sweepflow::sweep::{generate_tuples, SweptItem, SweptParameter};

fn swept_axis(name: &str, points: usize) -> SweptItem {
    let parameter = Arc::new(Parameter::new_abstract(name));
    let values: Vec<f64> = (0..points).map(|i| i as f64).collect();
    let axis = SharedAxis::new(DataAxis::new(name, values));
    SweptItem::Single(SweptParameter::new(parameter, axis, None))
}

fn benchmark_tuple_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_tuples");
    for (outer, inner) in [(10usize, 10usize), (100, 100), (31, 1009)] {
        let items = vec![swept_axis("outer", outer), swept_axis("inner", inner)];
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{outer}x{inner}")),
            &items,
            |b, items| {
                b.iter(|| black_box(generate_tuples(items)).len());
            },
        );
    }
    group.finish();
}

fn benchmark_descriptor_num_points(c: &mut Criterion) {
    let mut descriptor = DataStreamDescriptor::new();
    for i in 0..8 {
        let values: Vec<f64> = (0..32).map(|p| p as f64).collect();
        descriptor.add_axis(SharedAxis::new(DataAxis::new(format!("axis{i}"), values)));
    }
    c.bench_function("descriptor_num_points_8_axes", |b| {
        b.iter(|| black_box(descriptor.num_points()));
    });
}

criterion_group!(
    benches,
    benchmark_tuple_generation,
    benchmark_descriptor_num_points
);
criterion_main!(benches);
