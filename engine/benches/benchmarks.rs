//! Performance benchmarks for ranked-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ranked_engine::{
    Database, FieldDef, FieldType, Position, RankBounds, RankPolicy, Record, TableSchema,
};
use serde_json::json;

fn create_db(policy: RankPolicy) -> Database {
    let mut db = Database::new();
    db.create_table(TableSchema::new(
        "tasks",
        vec![
            FieldDef::required("title", FieldType::String),
            FieldDef::optional("list", FieldType::String),
            FieldDef::optional("row", FieldType::Int),
        ],
    ))
    .ranks(policy)
    .unwrap();
    db
}

fn populate(db: &mut Database, size: usize) {
    for i in 0..size {
        let mut task = Record::new(format!("task_{}", i), "tasks", json!({"title": "Task"}));
        db.save(&mut task).unwrap();
    }
}

fn save_at(db: &mut Database, id: usize, position: Position) {
    let mut task = Record::new(format!("new_{}", id), "tasks", json!({"title": "New"}));
    task.set_position("row_position", position);
    let _ = db.save(&mut task);
}

fn bench_positions(c: &mut Criterion) {
    let mut group = c.benchmark_group("positions");

    for size in [10, 100, 500].iter() {
        for (name, position) in [
            ("first", Position::First),
            ("last", Position::Last),
            ("middle_index", Position::Index(size / 2)),
        ] {
            group.bench_with_input(BenchmarkId::new(name, size), size, |b, &size| {
                let mut db = create_db(RankPolicy::new("row"));
                populate(&mut db, size);
                let mut id = 0usize;

                b.iter(|| {
                    id += 1;
                    save_at(black_box(&mut db), id, position.clone())
                })
            });
        }
    }

    group.finish();
}

fn bench_collisions(c: &mut Criterion) {
    let mut group = c.benchmark_group("collisions");

    // tight bounds force shifts and rebalances on nearly every insert
    for size in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("tight_bounds", size), size, |b, &size| {
            b.iter(|| {
                let bounds = RankBounds::new(0, (size as i64) * 4).unwrap();
                let mut db = create_db(RankPolicy::new("row").with_bounds(bounds));
                for i in 0..size {
                    save_at(&mut db, i, Position::Index(1));
                }
                db
            })
        });
    }

    group.finish();
}

fn bench_rebalance(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebalance");

    for size in [100, 500, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("group", size), size, |b, &size| {
            let policy = RankPolicy::new("row");
            let mut db = create_db(policy.clone());
            populate(&mut db, size);
            let mut task = db.find("tasks", "task_0").unwrap();

            b.iter(|| {
                policy
                    .bind(black_box(&mut task), black_box(&mut db))
                    .and_then(|mut mapper| mapper.rebalance())
            })
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    group.bench_function("policy_to_json", |b| {
        let policy = RankPolicy::new("row")
            .with_scope("open")
            .with_same(vec!["list", "owner"]);

        b.iter(|| serde_json::to_string(black_box(&policy)))
    });

    group.bench_function("position_from_json", |b| {
        let json = r#"["first", "last", "middle", 3, "12"]"#;

        b.iter(|| serde_json::from_str::<Vec<Position>>(black_box(json)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_positions,
    bench_collisions,
    bench_rebalance,
    bench_serialization,
);
criterion_main!(benches);
