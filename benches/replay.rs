//! # Recovery and Processing Benchmarks
//!
//! | Benchmark | Measures |
//! |-----------|----------|
//! | `recover` | rebuilding a machine from journals of growing length |
//! | `recover_from_snapshot` | snapshot plus a short tail |
//! | `handle` | events through an instance and the in-memory journal |

#![allow(clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rfq_fsm::application::fsm::{FsmEvent, Outcome, PersistentFsm, TransitionTable};
use rfq_fsm::application::services::RfqProtocol;
use rfq_fsm::domain::events::RequestEvent;
use rfq_fsm::domain::value_objects::{BidOffer, PersistenceId};
use rfq_fsm::infrastructure::config::EngineConfig;
use rfq_fsm::infrastructure::persistence::in_memory::InMemoryEventLog;
use rfq_fsm::infrastructure::persistence::{JournalEntry, SnapshotRecord};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

/// Builds a journal of roughly `len` entries: an accepted firm quote that
/// expires, then repeated subject accepts and dealer counters.
fn journal(table: &Arc<TransitionTable<RfqProtocol>>, len: usize) -> (Vec<JournalEntry>, SnapshotRecord) {
    let mut fsm = PersistentFsm::new(PersistenceId::new("rfq-bench"), table.clone());
    let opening = [
        FsmEvent::Event(RequestEvent::submit_request("XS12345", BidOffer::Bid)),
        FsmEvent::Event(RequestEvent::dealer_accept(101.20, 3)),
        FsmEvent::StateTimeout,
    ];
    let mut entries = Vec::with_capacity(len);
    let mut snapshot = fsm.snapshot().unwrap();
    let mut counter = 0u32;

    let mut step = |fsm: &mut PersistentFsm<RfqProtocol>, input: &FsmEvent<RequestEvent>| {
        if let Ok(Outcome::GoTo(transition)) = fsm.decide(input) {
            let planned = fsm.plan(&transition).unwrap();
            entries.push(planned.entry().clone());
            fsm.commit(planned);
        }
    };

    for input in &opening {
        step(&mut fsm, input);
    }
    while fsm.sequence_nr() < len as u64 {
        step(&mut fsm, &FsmEvent::Event(RequestEvent::CustomerAccept));
        counter += 1;
        let price = 99.0 + f64::from(counter % 100) / 100.0;
        step(&mut fsm, &FsmEvent::Event(RequestEvent::dealer_counter(price)));
        if fsm.sequence_nr() + 10 >= len as u64 && snapshot.sequence_nr == 0 {
            snapshot = fsm.snapshot().unwrap();
        }
    }
    (entries, snapshot)
}

fn bench_recover(c: &mut Criterion) {
    let table = Arc::new(RfqProtocol::transition_table().unwrap());
    let mut group = c.benchmark_group("recover");

    for len in [10usize, 100, 1_000, 10_000] {
        let (entries, _) = journal(&table, len);
        group.throughput(Throughput::Elements(entries.len() as u64));
        group.bench_with_input(BenchmarkId::new("full_journal", len), &entries, |b, entries| {
            b.iter(|| {
                let fsm = PersistentFsm::recover(
                    PersistenceId::new("rfq-bench"),
                    table.clone(),
                    None,
                    black_box(entries),
                )
                .unwrap();
                black_box(fsm.sequence_nr())
            })
        });
    }

    group.finish();
}

fn bench_recover_from_snapshot(c: &mut Criterion) {
    let table = Arc::new(RfqProtocol::transition_table().unwrap());
    let (entries, snapshot) = journal(&table, 10_000);
    let tail: Vec<JournalEntry> = entries
        .into_iter()
        .filter(|entry| entry.sequence_nr > snapshot.sequence_nr)
        .collect();

    c.bench_function("recover_from_snapshot", |b| {
        b.iter(|| {
            let fsm = PersistentFsm::recover(
                PersistenceId::new("rfq-bench"),
                table.clone(),
                Some(black_box(&snapshot)),
                black_box(&tail),
            )
            .unwrap();
            black_box(fsm.sequence_nr())
        })
    });
}

fn bench_handle(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let log = Arc::new(InMemoryEventLog::new());
    let registry = RfqProtocol::registry(log, EngineConfig::default()).unwrap();
    let done = PersistenceId::new("rfq-bench-done");
    let haggling = PersistenceId::new("rfq-bench-haggling");

    runtime.block_on(async {
        for id in [&done, &haggling] {
            registry
                .handle(id, RequestEvent::submit_request("XS12345", BidOffer::Bid))
                .await
                .unwrap();
        }
        registry
            .handle(&done, RequestEvent::dealer_accept(101.20, 3_600))
            .await
            .unwrap();
        registry.handle(&done, RequestEvent::CustomerAccept).await.unwrap();

        registry
            .handle(&haggling, RequestEvent::dealer_accept(101.20, 1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1_100)).await;
    });

    let mut group = c.benchmark_group("handle");

    // Done ignores every event, so this measures the mailbox round trip.
    group.bench_function("stay_round_trip", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(registry.handle(&done, RequestEvent::CustomerReject).await.unwrap())
        })
    });

    // Subject accept followed by a dealer counter: two journaled transitions.
    group.throughput(Throughput::Elements(2));
    group.bench_function("counter_cycle", |b| {
        b.to_async(&runtime).iter(|| async {
            registry
                .handle(&haggling, RequestEvent::CustomerAccept)
                .await
                .unwrap();
            black_box(
                registry
                    .handle(&haggling, RequestEvent::dealer_counter(99.20))
                    .await
                    .unwrap(),
            )
        })
    });
    group.finish();

    runtime.block_on(registry.stop_all());
}

criterion_group!(benches, bench_recover, bench_recover_from_snapshot, bench_handle);
criterion_main!(benches);
