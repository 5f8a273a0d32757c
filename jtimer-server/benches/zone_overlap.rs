#![allow(missing_docs)]
use std::collections::BTreeMap;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jtimer::{
    core::overlap,
    host::JoinRequest,
    timer::{Map, MapDefinition, PlayerClass, SegmentDefinition, ZoneDefinition},
    PlayerId, RawTransform, Timer, TimerConfig, Vec3,
};

fn zone(name: &str, x: f32) -> ZoneDefinition {
    ZoneDefinition::from_center(name, [x, 0.0, 64.0], [64.0, 64.0, 64.0])
}

/// Map with `courses` courses, each with a start, an end and four checkpoints.
fn build_map(courses: usize) -> Map {
    let segment = |base: f32| SegmentDefinition {
        name: String::new(),
        start: Some(zone("start", base)),
        end: Some(zone("end", base + 5000.0)),
        checkpoints: (1..=4).map(|i| zone("cp", base + 1000.0 * i as f32)).collect(),
    };
    let root = segment(0.0);
    Map::from_definition(&MapDefinition {
        name: "bench".into(),
        start: root.start,
        end: root.end,
        checkpoints: root.checkpoints,
        courses: (0..courses).map(|i| segment(10_000.0 * (i + 1) as f32)).collect(),
        bonuses: Vec::new(),
    })
}

fn bench_overlap(c: &mut Criterion) {
    let a = (Vec3::new(0.0, 0.0, 41.0), Vec3::new(24.0, 24.0, 41.0));
    let b = (Vec3::new(40.0, 10.0, 64.0), Vec3::new(64.0, 64.0, 64.0));
    c.bench_function("overlap", |bench| {
        bench.iter(|| overlap(black_box(a.0), black_box(a.1), black_box(b.0), black_box(b.1)))
    });
}

fn bench_update_timers(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_timers");
    for &players in &[1usize, 24, 64] {
        let mut timer = Timer::new(TimerConfig::default());
        timer.load_map(build_map(8));

        let mut transforms: BTreeMap<PlayerId, RawTransform> = BTreeMap::new();
        for i in 0..players {
            let id = timer.add_player(JoinRequest::new(format!("STEAM_0:0:{}", i), "bench", i as u32));
            transforms.insert(id, RawTransform::new([i as f32 * 100.0, 0.0, 0.0], [24.0, 24.0, 82.0], [0.0; 3]));
        }
        timer.wait_for_joins();
        for id in transforms.keys() {
            let _ = timer.player_spawned(id, PlayerClass::Scout);
        }

        group.throughput(Throughput::Elements(players as u64));
        group.bench_with_input(BenchmarkId::from_parameter(players), &players, |b, &_n| {
            b.iter(|| {
                let result = timer.update_timers(&transforms);
                black_box(result.events.len());
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_overlap, bench_update_timers);
criterion_main!(benches);
