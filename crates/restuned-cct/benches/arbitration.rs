//! Hot-path throughput for the arbitration table: the insert/remove pair a
//! single consumer task executes for every tune and untune it drains.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use restuned_cct::{Cct, NullApplier};
use restuned_registry::{ResourceRegistry, TargetRegistry};
use restuned_types::{ApplyScope, DeviceMode, Permission, Policy, Priority, Resource, ResourceCode, ResourceConfig};

fn higher_better_registry(code: ResourceCode) -> ResourceRegistry {
    let registry = ResourceRegistry::new();
    registry.register(ResourceConfig {
        code,
        path: "/sys/fake/bench".into(),
        apply_scope: ApplyScope::Global,
        policy: Policy::HigherBetter,
        permission: Permission::System,
        modes: DeviceMode::RESUME,
        high_threshold: None,
        low_threshold: None,
        unit: None,
        default_value: 0,
    });
    registry
}

fn bench_insert_remove(c: &mut Criterion) {
    let code = ResourceCode::new(9, 1);
    let mut group = c.benchmark_group("cct_insert_remove");

    for concurrent in [1usize, 8, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(concurrent), &concurrent, |b, &concurrent| {
            b.iter(|| {
                let registry = higher_better_registry(code);
                let target = TargetRegistry::new();
                let mut cct = Cct::new(registry, target, NullApplier::default());

                let mut handles = Vec::with_capacity(concurrent);
                for i in 0..concurrent {
                    let resource = Resource::new(code, vec![i as i32]);
                    let h = cct.insert_resource(i as u64, Priority::SystemLow, resource).unwrap();
                    handles.push(h);
                }
                for h in handles {
                    cct.remove_resource(black_box(h)).unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert_remove);
criterion_main!(benches);
