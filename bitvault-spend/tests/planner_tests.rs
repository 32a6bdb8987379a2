//! Tests for the async transaction plan pipeline

mod test_helpers;

use async_trait::async_trait;
use bitcoin::{Amount, Network, OutPoint};
use bitvault_spend::error::{SpendError, SpendResult};
use bitvault_spend::fee_estimation::FeeRate;
use bitvault_spend::pending::{InMemoryPendingStore, PendingTransactionLock};
use bitvault_spend::planner::{compute_transaction_plan, SpendPlanner};
use bitvault_spend::providers::{ProviderRegistry, StaticUtxoProvider, UtxoProvider};
use bitvault_spend::utxo_selection::{SelectionCondition, UnspentOutput};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{setup, txid, utxo, ADDRESS};

// Provider that never answers in time
struct StalledProvider;

#[async_trait]
impl UtxoProvider for StalledProvider {
    async fn fetch_unspent_outputs(
        &self,
        _address: &str,
        _network: Network,
    ) -> SpendResult<Vec<UnspentOutput>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

fn planner_with(
    outputs: Vec<UnspentOutput>,
) -> (SpendPlanner, Arc<StaticUtxoProvider>, Arc<InMemoryPendingStore>) {
    let provider = Arc::new(StaticUtxoProvider::new().with_outputs(
        ADDRESS,
        Network::Testnet,
        outputs,
    ));
    let pending = Arc::new(InMemoryPendingStore::new());
    let planner = SpendPlanner::new(
        ProviderRegistry::new().with_provider(Network::Testnet, provider.clone()),
        pending.clone(),
        Network::Testnet,
    );
    (planner, provider, pending)
}

#[tokio::test]
async fn test_plan_covers_amount_and_fee() {
    setup();
    let (planner, _, _) = planner_with(vec![utxo(0, 100_000, 10)]);

    let plan = planner
        .compute_transaction_plan(
            ADDRESS,
            Amount::from_sat(50_000),
            FeeRate::from_sat_per_kvb(4929),
            6,
        )
        .await
        .unwrap();

    assert!(plan.sufficient_funds());
    assert_eq!(plan.fee_amount(), Amount::from_sat(690));
    assert_eq!(plan.change_amount(), Amount::from_sat(49_310));
}

#[tokio::test]
async fn test_plan_skips_locked_and_unconfirmed_outputs() {
    setup();
    let (planner, _, pending) = planner_with(vec![
        utxo(0, 500_000, 0),
        utxo(1, 200_000, 30),
        utxo(2, 80_000, 30),
    ]);
    pending.record(
        ADDRESS,
        PendingTransactionLock::new(txid(42), [utxo(1, 200_000, 30).outpoint()]),
    );

    let plan = planner
        .compute_transaction_plan(ADDRESS, Amount::from_sat(50_000), FeeRate::MIN_RELAY, 1)
        .await
        .unwrap();

    assert!(plan.sufficient_funds());
    assert_eq!(plan.candidate_count(), 1);
    assert_eq!(plan.selected_outpoints(), vec![utxo(2, 80_000, 30).outpoint()]);
}

#[tokio::test]
async fn test_plan_reports_no_eligible_outputs() {
    setup();
    let (planner, _, _) = planner_with(vec![utxo(0, 60_000, 5), utxo(1, 40_000, 5)]);

    let plan = planner
        .compute_transaction_plan(ADDRESS, Amount::from_sat(50_000), FeeRate::MIN_RELAY, 6)
        .await
        .unwrap();

    assert!(!plan.sufficient_funds());
    assert_eq!(plan.condition(), SelectionCondition::NoEligibleOutputs);
}

#[tokio::test]
async fn test_plan_surfaces_provider_outage() {
    setup();
    let (planner, provider, _) = planner_with(vec![utxo(0, 100_000, 10)]);
    provider.set_unavailable(true);

    let err = planner
        .compute_transaction_plan(ADDRESS, Amount::from_sat(50_000), FeeRate::MIN_RELAY, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, SpendError::ProviderUnavailable { .. }));
    assert!(err.is_retryable());

    provider.set_unavailable(false);
    assert!(planner
        .compute_transaction_plan(ADDRESS, Amount::from_sat(50_000), FeeRate::MIN_RELAY, 1)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_plan_times_out_slow_provider() {
    setup();
    let planner = SpendPlanner::new(
        ProviderRegistry::new().with_provider(Network::Testnet, Arc::new(StalledProvider)),
        Arc::new(InMemoryPendingStore::new()),
        Network::Testnet,
    )
    .with_provider_timeout(Duration::from_millis(20));

    let err = planner
        .compute_transaction_plan(ADDRESS, Amount::from_sat(50_000), FeeRate::MIN_RELAY, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, SpendError::ProviderUnavailable { .. }));
}

#[tokio::test]
async fn test_plan_rejects_bad_arguments() {
    setup();
    let (planner, _, _) = planner_with(vec![utxo(0, 100_000, 10)]);

    let zero_amount = planner
        .compute_transaction_plan(ADDRESS, Amount::ZERO, FeeRate::MIN_RELAY, 1)
        .await;
    assert!(matches!(zero_amount, Err(SpendError::InvalidArgument(_))));

    let zero_rate = planner
        .compute_transaction_plan(ADDRESS, Amount::from_sat(1_000), FeeRate::from_sat_per_kvb(0), 1)
        .await;
    assert!(matches!(zero_rate, Err(SpendError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_free_function_uses_given_collaborators() {
    setup();
    let provider = StaticUtxoProvider::new().with_outputs(
        ADDRESS,
        Network::Regtest,
        vec![utxo(0, 30_000, 10)],
    );
    let pending = InMemoryPendingStore::new();

    let plan = compute_transaction_plan(
        &provider,
        &pending,
        ADDRESS,
        Network::Regtest,
        Amount::from_sat(50_000),
        FeeRate::MIN_RELAY,
        1,
    )
    .await
    .unwrap();

    assert_eq!(plan.condition(), SelectionCondition::InsufficientFunds);
    assert_eq!(plan.total_input_value(), Amount::from_sat(30_000));
}

#[tokio::test]
async fn test_exclusive_plans_serialise_per_address() {
    setup();
    let (planner, _, pending) = planner_with(vec![utxo(0, 100_000, 10), utxo(1, 90_000, 10)]);

    let (first, guard) = planner
        .plan_exclusive(ADDRESS, Amount::from_sat(50_000), FeeRate::MIN_RELAY, 1)
        .await
        .unwrap();
    assert_eq!(guard.address(), ADDRESS);
    assert!(planner.build_locks().try_acquire(ADDRESS).is_none());

    // Broadcast, then record the spent inputs before releasing the build lock
    pending.record(
        ADDRESS,
        PendingTransactionLock::new(txid(9), first.selected_outpoints()),
    );
    drop(guard);

    let (second, _guard) = planner
        .plan_exclusive(ADDRESS, Amount::from_sat(50_000), FeeRate::MIN_RELAY, 1)
        .await
        .unwrap();

    let first_inputs: Vec<OutPoint> = first.selected_outpoints();
    assert!(second
        .selected_outpoints()
        .iter()
        .all(|outpoint| !first_inputs.contains(outpoint)));
    assert!(second.sufficient_funds());
}
