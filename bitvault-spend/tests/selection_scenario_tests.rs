//! End-to-end selection scenarios over the pure pipeline:
//! confirmation filter, lock filter, selector and result builder.

mod test_helpers;

use bitcoin::{Amount, OutPoint};
use bitvault_spend::fee_estimation::{estimate_fee, FeeRate};
use bitvault_spend::pending::{locked_outpoints, revalidate, PendingTransactionLock};
use bitvault_spend::utxo_selection::{
    eligible_outputs, select_coins, SelectionCondition, UnspentOutput,
};
use std::collections::HashSet;
use test_helpers::{setup, txid, utxo, SECOND_TXID};

// 140 vbytes * 4929 sat/kvB / 1000 = 690
const S2_RATE: FeeRate = FeeRate::from_sat_per_kvb(4929);

#[test]
fn test_empty_outputs_are_insufficient() {
    setup();

    for rate in [FeeRate::MIN_RELAY, S2_RATE, FeeRate::from_sat_per_vb(250)] {
        let result = select_coins(&[], Amount::from_sat(50_000), rate).unwrap();
        assert!(!result.sufficient_funds());
        assert!(result.selected_outputs().is_empty());
        assert_eq!(result.total_input_value(), Amount::ZERO);
        assert_eq!(result.change_amount(), Amount::ZERO);
        assert_eq!(result.condition(), SelectionCondition::NoEligibleOutputs);
    }
}

#[test]
fn test_single_confirmed_output_covers_amount_and_fee() {
    setup();
    assert_eq!(estimate_fee(1, 2, S2_RATE), Amount::from_sat(690));

    let outputs = vec![utxo(0, 100_000, 10)];
    let candidates = eligible_outputs(&outputs, 6, &HashSet::new());
    let result = select_coins(&candidates, Amount::from_sat(50_000), S2_RATE).unwrap();

    assert!(result.sufficient_funds());
    assert_eq!(result.selected_outputs(), &outputs[..]);
    assert_eq!(result.fee_amount(), Amount::from_sat(690));
    assert_eq!(result.change_amount(), Amount::from_sat(49_310));
    assert_eq!(result.condition(), SelectionCondition::Sufficient);
    assert_eq!(result.shortfall(), Amount::ZERO);
}

#[test]
fn test_output_smaller_than_amount_is_insufficient() {
    setup();

    let outputs = vec![utxo(0, 30_000, 10)];
    let candidates = eligible_outputs(&outputs, 1, &HashSet::new());
    let result = select_coins(&candidates, Amount::from_sat(50_000), FeeRate::MIN_RELAY).unwrap();

    assert!(!result.sufficient_funds());
    assert_eq!(result.condition(), SelectionCondition::InsufficientFunds);
    assert_eq!(result.change_amount(), Amount::ZERO);
    // 50_000 + 140 - 30_000
    assert_eq!(result.shortfall(), Amount::from_sat(20_140));
}

#[test]
fn test_low_heights_are_filtered_to_no_eligible_outputs() {
    setup();

    let outputs = vec![utxo(0, 60_000, 5), utxo(1, 40_000, 5)];
    let candidates = eligible_outputs(&outputs, 6, &HashSet::new());
    assert!(candidates.is_empty());

    let result = select_coins(&candidates, Amount::from_sat(50_000), FeeRate::MIN_RELAY).unwrap();
    assert!(!result.sufficient_funds());
    assert_eq!(result.condition(), SelectionCondition::NoEligibleOutputs);
}

#[test]
fn test_locked_output_is_not_spendable() {
    setup();

    let locked_output = UnspentOutput::new(
        OutPoint::new(*SECOND_TXID, 3),
        Amount::from_sat(100_000),
        20,
    )
    .unwrap();
    let pending = PendingTransactionLock::new(txid(77), [locked_output.outpoint()]);
    let locked = locked_outpoints(&[pending]);

    let candidates = eligible_outputs(&[locked_output], 1, &locked);
    let result = select_coins(&candidates, Amount::from_sat(50_000), FeeRate::MIN_RELAY).unwrap();

    assert!(!result.sufficient_funds());
    assert_eq!(result.condition(), SelectionCondition::NoEligibleOutputs);
}

#[test]
fn test_largest_outputs_are_taken_first() {
    setup();

    let outputs = vec![utxo(0, 10_000, 50), utxo(1, 50_000, 50), utxo(2, 70_000, 50)];
    let rate = FeeRate::from_sat_per_vb(1);
    let result = select_coins(&outputs, Amount::from_sat(90_000), rate).unwrap();

    assert!(result.sufficient_funds());
    let values: Vec<u64> = result
        .selected_outputs()
        .iter()
        .map(|o| o.value().to_sat())
        .collect();
    assert_eq!(values, vec![70_000, 50_000]);

    // 10 + 2 * 68 + 2 * 31 = 208 vbytes
    assert_eq!(result.fee_amount(), Amount::from_sat(208));
    assert_eq!(result.change_amount(), Amount::from_sat(120_000 - 90_000 - 208));
    assert!(!result.selected_outpoints().contains(&outputs[0].outpoint()));
}

#[test]
fn test_duplicate_outpoints_are_spent_once() {
    setup();

    let output = utxo(0, 40_000, 10);
    let outputs = vec![output.clone(), output];
    let result = select_coins(&outputs, Amount::from_sat(50_000), FeeRate::MIN_RELAY).unwrap();

    assert!(!result.sufficient_funds());
    assert_eq!(result.selected_outputs().len(), 1);
    assert_eq!(result.total_input_value(), Amount::from_sat(40_000));
}

#[test]
fn test_unconfirmed_outputs_never_pass_a_zero_floor() {
    setup();

    let outputs = vec![utxo(0, 80_000, 0), utxo(1, 20_000, 1)];
    let candidates = eligible_outputs(&outputs, 0, &HashSet::new());
    assert_eq!(candidates, vec![outputs[1].clone()]);
}

#[test]
fn test_revalidate_detects_late_lock() {
    setup();

    let outputs = vec![utxo(0, 60_000, 10), utxo(1, 40_000, 10)];
    let result = select_coins(&outputs, Amount::from_sat(50_000), FeeRate::MIN_RELAY).unwrap();
    assert!(result.sufficient_funds());
    assert!(revalidate(&result, &HashSet::new()).is_ok());

    let late = PendingTransactionLock::new(txid(5), [outputs[0].outpoint()]);
    let conflicts = revalidate(&result, &locked_outpoints(&[late])).unwrap_err();
    assert_eq!(conflicts, vec![outputs[0].outpoint()]);
}
