//! Party backend benchmarks over an in-memory SQLite database.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mmodb_core::{Party, PartyChange, PartyDbConfig, PartyMember, PartySqlDb, PartyUpdate, PersistenceBackend};
use rusqlite::{params, Connection};

/// A database with `parties` parties of `size` members each.
fn populated(parties: u32, size: u32) -> PartySqlDb {
    let mut db = PartySqlDb::new(Connection::open_in_memory().unwrap(), PartyDbConfig::default());
    db.ensure_schema().unwrap();
    db.init().unwrap();

    let conn = db.connection();
    for char_id in 1..=parties * size {
        conn.lock()
            .execute(
                "INSERT INTO \"char\" (char_id, account_id, name) VALUES (?1, ?2, ?3)",
                params![char_id, char_id * 10, format!("char{char_id}")],
            )
            .unwrap();
    }

    for p in 0..parties {
        let first = p * size + 1;
        let mut party = Party::new(&format!("party{p}"), PartyMember::new(first * 10, first));
        db.create(&mut party).unwrap();
        for char_id in first + 1..first + size {
            party.members.push(PartyMember::new(char_id * 10, char_id));
            let index = party.members.len() - 1;
            db.save(&party, &PartyChange::AddMember(index).into()).unwrap();
        }
    }
    db
}

/// Benchmark loading a party with varying member counts.
fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("party_load");

    for size in [1, 6, 12] {
        let db = populated(100, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &db, |b, db| {
            b.iter(|| black_box(db.load(black_box(50)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark a basic-settings save.
fn bench_save(c: &mut Criterion) {
    let mut db = populated(100, 6);
    let mut party = db.load(50).unwrap().unwrap();
    let update: PartyUpdate = PartyChange::Basic.into();

    c.bench_function("party_save_basic", |b| {
        b.iter(|| {
            party.item_share = (party.item_share + 1) % 4;
            db.save(black_box(&party), &update).unwrap();
        });
    });
}

/// Benchmark name lookup and full iteration.
fn bench_scan(c: &mut Criterion) {
    let db = populated(500, 3);

    c.bench_function("party_id_by_name", |b| {
        b.iter(|| black_box(db.id_by_name(black_box("PARTY250")).unwrap()));
    });
    c.bench_function("party_iterate_500", |b| {
        b.iter(|| black_box(db.iter().unwrap().count()));
    });
}

criterion_group!(benches, bench_load, bench_save, bench_scan);
criterion_main!(benches);
