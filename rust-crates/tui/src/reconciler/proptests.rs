//! Property tests for the ordering guarantees: one pending move at a time,
//! and the most recently started history fetch wins.

#![allow(non_snake_case)]

use super::{
    fakes::*,
    *,
};
use futures::poll;
use proptest::prelude::*;
use std::{
    future::Future,
    pin::Pin,
};

type BoxedSubmit<'a> = Pin<Box<dyn Future<Output = Result<Submitted, SubmitError>> + 'a>>;
type BoxedRefresh<'a> =
    Pin<Box<dyn Future<Output = Result<RefreshOutcome, RefreshError>> + 'a>>;

#[derive(Clone, Debug)]
enum SubmitStep {
    Press(Move),
    Confirm,
    Reject,
}

fn arb_move() -> impl Strategy<Value = Move> {
    prop_oneof![Just(Move::First), Just(Move::Second), Just(Move::Third)]
}

fn arb_submit_step() -> impl Strategy<Value = SubmitStep> {
    prop_oneof![
        3 => arb_move().prop_map(SubmitStep::Press),
        1 => Just(SubmitStep::Confirm),
        1 => Just(SubmitStep::Reject),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

async fn connected() -> (Reconciler<FakeWallet>, FakeProgram) {
    let program = FakeProgram::new();
    let wallet = FakeWallet::new(program.clone());
    wallet.push_identity("0xABC");
    let reconciler = Reconciler::new(wallet, test_interface());
    reconciler.connect().await.unwrap();
    (reconciler, program)
}

fn history_of(len: usize) -> Vec<RoundRecord> {
    (0..len)
        .map(|i| {
            let player_move = Move::ALL[i % 3];
            round("0xABC", player_move, player_move.next(), Outcome::Lose)
        })
        .collect()
}

proptest! {
    #[test]
    fn submit__any_press_sequence__never_more_than_one_request_in_flight(
        steps in prop::collection::vec(arb_submit_step(), 1..40)
    ) {
        runtime().block_on(async {
            let (reconciler, program) = connected().await;
            let mut in_flight: Option<(BoxedSubmit<'_>, Gate<Receipt>)> = None;
            let mut accepted = 0usize;

            for step in steps {
                match step {
                    SubmitStep::Press(player_move) => {
                        if in_flight.is_some() {
                            let result = reconciler.submit(player_move).await;
                            prop_assert_eq!(result, Err(SubmitError::ActionInProgress));
                        } else {
                            let gate = program.gate_submit();
                            let mut fut: BoxedSubmit<'_> =
                                Box::pin(reconciler.submit(player_move));
                            prop_assert!(poll!(fut.as_mut()).is_pending());
                            accepted += 1;
                            in_flight = Some((fut, gate));
                        }
                    }
                    SubmitStep::Confirm | SubmitStep::Reject => {
                        let Some((fut, gate)) = in_flight.take() else {
                            continue;
                        };
                        let confirmed = matches!(step, SubmitStep::Confirm);
                        let answer = if confirmed {
                            Ok(receipt("0x01", Outcome::Win))
                        } else {
                            Err(Cause::new("rejected"))
                        };
                        let reads_before = program.history_reads();
                        gate.send(answer).unwrap();
                        let result = fut.await;
                        prop_assert_eq!(result.is_ok(), confirmed);
                        let expected_reads = usize::from(confirmed);
                        prop_assert_eq!(program.history_reads() - reads_before, expected_reads);
                    }
                }
                prop_assert_eq!(reconciler.action_outcome().is_pending(), in_flight.is_some());
                prop_assert_eq!(program.submitted_moves().len(), accepted);
            }
            Ok(())
        })?;
    }

    #[test]
    fn refresh__any_completion_order__latest_started_success_wins(
        (order, failures) in (1usize..8).prop_flat_map(|n| (
            Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
            prop::collection::vec(any::<bool>(), n),
        ))
    ) {
        runtime().block_on(async {
            let (reconciler, program) = connected().await;
            let mut pending: Vec<Option<(BoxedRefresh<'_>, Gate<Vec<RoundRecord>>)>> =
                Vec::new();
            for _ in 0..order.len() {
                let gate = program.gate_history();
                let mut fut: BoxedRefresh<'_> = Box::pin(reconciler.refresh());
                prop_assert!(poll!(fut.as_mut()).is_pending());
                pending.push(Some((fut, gate)));
            }

            for &index in &order {
                let Some((fut, gate)) = pending[index].take() else {
                    continue;
                };
                let answer = if failures[index] {
                    Err(Cause::new("flaky node"))
                } else {
                    Ok(history_of(index + 1))
                };
                gate.send(answer).unwrap();
                let _ = fut.await;
            }

            let expected = (0..order.len())
                .rev()
                .find(|&index| !failures[index])
                .map(|index| history_of(index + 1))
                .unwrap_or_default();
            prop_assert_eq!(reconciler.rounds(), expected);
            Ok(())
        })?;
    }
}
