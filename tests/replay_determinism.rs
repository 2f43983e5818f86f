//! Recovery must rebuild exactly the machine that produced the journal.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use rfq_fsm::application::fsm::{FsmEvent, Outcome, PersistentFsm, TransitionTable};
use rfq_fsm::application::services::RfqProtocol;
use rfq_fsm::domain::entities::RequestData;
use rfq_fsm::domain::events::RequestEvent;
use rfq_fsm::domain::value_objects::{BidOffer, PersistenceId};
use rfq_fsm::infrastructure::persistence::{JournalEntry, SnapshotRecord};
use std::sync::Arc;

fn input() -> impl Strategy<Value = FsmEvent<RequestEvent>> {
    let price = (1u32..20_000).prop_map(|cents| f64::from(cents) / 100.0);
    prop_oneof![
        ("[A-Z]{2}[0-9]{5}", prop_oneof![Just(BidOffer::Bid), Just(BidOffer::Offer)])
            .prop_map(|(isin, side)| FsmEvent::Event(RequestEvent::submit_request(isin, side))),
        (price.clone(), 1u32..120)
            .prop_map(|(p, wiretime)| FsmEvent::Event(RequestEvent::dealer_accept(p, wiretime))),
        price.prop_map(|p| FsmEvent::Event(RequestEvent::dealer_counter(p))),
        Just(FsmEvent::Event(RequestEvent::DealerReject)),
        Just(FsmEvent::Event(RequestEvent::CustomerAccept)),
        Just(FsmEvent::Event(RequestEvent::CustomerReject)),
        Just(FsmEvent::StateTimeout),
    ]
}

struct Run {
    table: Arc<TransitionTable<RfqProtocol>>,
    live: PersistentFsm<RfqProtocol>,
    journal: Vec<JournalEntry>,
    snapshots: Vec<SnapshotRecord>,
}

/// Drives a machine the way an instance does, skipping rejected inputs.
fn run(inputs: &[FsmEvent<RequestEvent>]) -> Run {
    let table = Arc::new(RfqProtocol::transition_table().unwrap());
    let mut live = PersistentFsm::new(PersistenceId::new("rfq-prop"), table.clone());
    let mut journal = Vec::new();
    let mut snapshots = Vec::new();

    for input in inputs {
        let Ok(Outcome::GoTo(transition)) = live.decide(input) else {
            continue;
        };
        let step = live.plan(&transition).unwrap();
        journal.push(step.entry().clone());
        live.commit(step);
        snapshots.push(live.snapshot().unwrap());
    }

    Run {
        table,
        live,
        journal,
        snapshots,
    }
}

fn assert_same(
    recovered: &PersistentFsm<RfqProtocol>,
    live: &PersistentFsm<RfqProtocol>,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(recovered.state(), live.state());
    prop_assert_eq!(recovered.data(), live.data());
    prop_assert_eq!(recovered.sequence_nr(), live.sequence_nr());
    prop_assert_eq!(recovered.state_timeout(), live.state_timeout());
    Ok(())
}

proptest! {
    #[test]
    fn full_replay_matches_live_machine(inputs in prop::collection::vec(input(), 0..40)) {
        let Run { table, live, journal, .. } = run(&inputs);
        let recovered = PersistentFsm::recover(
            live.persistence_id().clone(),
            table,
            None,
            &journal,
        )
        .unwrap();
        assert_same(&recovered, &live)?;
    }

    #[test]
    fn snapshot_plus_tail_matches_live_machine(
        inputs in prop::collection::vec(input(), 1..40),
        cut in any::<prop::sample::Index>(),
    ) {
        let Run { table, live, journal, snapshots } = run(&inputs);
        prop_assume!(!snapshots.is_empty());

        let at = cut.index(snapshots.len());
        let snapshot = &snapshots[at];
        let tail = &journal[at + 1..];
        let recovered = PersistentFsm::recover(
            live.persistence_id().clone(),
            table,
            Some(snapshot),
            tail,
        )
        .unwrap();
        assert_same(&recovered, &live)?;
    }

    #[test]
    fn journaled_payloads_fold_to_live_data(inputs in prop::collection::vec(input(), 0..40)) {
        let Run { live, journal, .. } = run(&inputs);
        let events: Vec<RequestEvent> = journal
            .iter()
            .filter_map(|entry| entry.payload.clone())
            .map(|payload| serde_json::from_value(payload).unwrap())
            .collect();
        let folded = RequestData::default().replay(&events).unwrap();
        prop_assert_eq!(&folded, live.data());
    }

    #[test]
    fn gap_in_journal_is_rejected(inputs in prop::collection::vec(input(), 2..40)) {
        let Run { table, live, mut journal, .. } = run(&inputs);
        prop_assume!(journal.len() >= 2);
        journal.remove(0);
        let result = PersistentFsm::recover(
            live.persistence_id().clone(),
            table,
            None,
            &journal,
        );
        prop_assert!(result.is_err());
    }
}
