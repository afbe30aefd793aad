//! Property tests over random digit entries and commit/undo interleavings.

use proptest::prelude::*;

use splitclock::catalog::{parse_split_set, ComparisonEntry, ComparisonSplitSet};
use splitclock::input::{DigitEntry, SegmentDigits};
use splitclock::ledger::Ledger;
use splitclock::session::{Phase, SessionEvent, SessionState};

fn comparison(splits: usize) -> ComparisonSplitSet {
    let entry = ComparisonEntry {
        display_name: "World Record".to_string(),
        key: "wr.csv".to_string(),
    };
    let mut text = String::from("split,time\n");
    for i in 0..splits {
        text.push_str(&format!("S{},{}.5\n", i + 1, i + 1));
    }
    parse_split_set(&entry, &text).unwrap()
}

fn digits_ms(d: [u8; 6]) -> u64 {
    let d = d.map(u64::from);
    d[0] * 60_000 + (d[1] * 10 + d[2]) * 1_000 + d[3] * 100 + d[4] * 10 + d[5]
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Commit([u8; 6]),
    Undo,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::array::uniform6(0u8..=9).prop_map(Op::Commit),
        1 => Just(Op::Undo),
    ]
}

fn event() -> impl Strategy<Value = SessionEvent> {
    prop_oneof![
        1 => Just(SessionEvent::Start),
        1 => Just(SessionEvent::Stop),
        1 => Just(SessionEvent::Tick),
        1 => Just(SessionEvent::Undo),
        3 => prop::array::uniform6(0u8..=9).prop_map(|d| SessionEvent::Commit(digits_ms(d))),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_typed_digits_submit_their_decoded_value(d in prop::array::uniform6(0u8..=9)) {
        let expected = SegmentDigits::new(d.map(Some)).decode_ms();
        prop_assert_eq!(expected, digits_ms(d));
        prop_assert!(expected <= 599_999);

        let mut entry = DigitEntry::new();
        let typed: String = d.iter().map(|x| char::from(b'0' + x)).collect();
        prop_assert_eq!(entry.push_str(&typed), vec![expected]);
        prop_assert!(entry.is_empty());
    }

    #[test]
    fn prop_ledger_invariants_hold_for_any_sequence(
        splits in 1usize..6,
        ops in prop::collection::vec(op(), 0..40),
    ) {
        let cmp = comparison(splits);
        let mut ledger = Ledger::new(cmp.len());
        for op in ops {
            match op {
                Op::Commit(d) => {
                    let before = ledger.clone();
                    if ledger.commit(digits_ms(d), 0, &cmp).is_err() {
                        prop_assert!(before.is_complete());
                        prop_assert_eq!(&ledger, &before);
                    }
                }
                Op::Undo => {
                    ledger.undo();
                }
            }
            let sum: u64 = ledger.entries().iter().map(|e| e.segment_ms).sum();
            prop_assert_eq!(ledger.cumulative_ms(), sum);
            prop_assert_eq!(ledger.next_index(), ledger.entries().len());
            prop_assert!(ledger.next_index() <= ledger.max_splits());
        }
    }

    #[test]
    fn prop_undo_reverses_accepted_commit(
        splits in 1usize..6,
        events in prop::collection::vec(event(), 0..30),
        d in prop::array::uniform6(0u8..=9),
    ) {
        let mut state = SessionState::new();
        state.install_comparison(comparison(splits)).unwrap();
        for e in events {
            // rejected events leave the state as it was
            let before = state.clone();
            if state.reduce(e).is_err() {
                prop_assert_eq!(&state, &before);
            }
        }

        let before = state.clone();
        match state.reduce(SessionEvent::Commit(digits_ms(d))) {
            Ok(_) => {
                state.reduce(SessionEvent::Undo).unwrap();
                prop_assert_eq!(state.state_hash(), before.state_hash());
                prop_assert_eq!(&state, &before);
            }
            Err(_) => {
                prop_assert!(before.phase() != Phase::Running);
                prop_assert_eq!(&state, &before);
            }
        }
    }
}
