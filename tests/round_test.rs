//! End-to-end coin-flip round scenarios.
//!
//! The timer-driven test runs a complete round on a manually advanced clock;
//! the others walk the coordinator through its transitions directly.

use skinfall::broadcast::GameEvent;
use skinfall::config::{BonusConfig, RoundConfig};
use skinfall::types::{CoinSide, RoundPhase};
use skinfall::{
    ChannelBroadcaster, LedgerService, ManualClock, MemoryStore, NullBroadcaster,
    RoundCoordinator,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

async fn funded_account(ledger: &LedgerService, name: &str, balance: f64) -> Uuid {
    let account = ledger
        .register(name, chrono::Utc::now())
        .await
        .expect("register");
    let delta = balance - account.balance;
    if delta > 0.0 {
        ledger.credit(account.id, delta).await.expect("credit");
    } else if delta < 0.0 {
        ledger.debit(account.id, -delta).await.expect("debit");
    }
    account.id
}

async fn wait_for_phase(coordinator: &RoundCoordinator, phase: RoundPhase) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while coordinator.phase().await != phase {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("round never reached {}", phase));
}

#[tokio::test]
async fn test_timer_driven_round_runs_full_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(LedgerService::new(store, BonusConfig::default()));
    let clock = Arc::new(ManualClock::new());
    let broadcaster = Arc::new(ChannelBroadcaster::default());
    let mut events = broadcaster.subscribe();

    let config = RoundConfig::default();
    let coordinator = Arc::new(RoundCoordinator::new(
        config.clone(),
        clock.clone(),
        ledger.clone(),
        broadcaster,
    ));

    let player = funded_account(&ledger, "player", 500.0).await;
    coordinator
        .place_bet(player, 100.0, CoinSide::Heads)
        .await
        .expect("bet");

    let runner = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run_one_round().await })
    };

    // Betting window elapses.
    tokio::time::sleep(Duration::from_millis(20)).await;
    clock.advance(Duration::from_secs(config.betting_window_secs));
    wait_for_phase(&coordinator, RoundPhase::Locked).await;

    // Reveal delay elapses; settlement follows. The short real-time pauses
    // let the coordinator enter its next sleep before the clock moves.
    tokio::time::sleep(Duration::from_millis(20)).await;
    clock.advance(Duration::from_secs(config.reveal_delay_secs));
    wait_for_phase(&coordinator, RoundPhase::PaidOut).await;

    // Cooldown elapses; a fresh round opens.
    tokio::time::sleep(Duration::from_millis(20)).await;
    clock.advance(Duration::from_secs(config.cooldown_secs));
    wait_for_phase(&coordinator, RoundPhase::OpenForBets).await;
    runner.await.expect("round task");

    let snapshot = coordinator.snapshot().await;
    assert!(snapshot.bets.is_empty());
    assert!(snapshot.outcome.is_none());

    // The drawn outcome determines the final balance: 100 staked, winners
    // paid double.
    let mut outcome = None;
    while let Ok(envelope) = events.try_recv() {
        if let GameEvent::RoundResult { outcome: side } = envelope.event {
            outcome = Some(side);
        }
    }
    let balance = ledger.account(player).await.expect("account").balance;
    match outcome.expect("result event was broadcast") {
        CoinSide::Heads => assert_eq!(balance, 600.0),
        CoinSide::Tails => assert_eq!(balance, 400.0),
    }
}

#[tokio::test]
async fn test_multi_player_round_settles_each_side() {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(LedgerService::new(store, BonusConfig::default()));
    let coordinator = RoundCoordinator::new(
        RoundConfig::default(),
        Arc::new(ManualClock::new()),
        ledger.clone(),
        Arc::new(NullBroadcaster),
    );

    let alice = funded_account(&ledger, "alice", 500.0).await;
    let bob = funded_account(&ledger, "bob", 500.0).await;
    let carol = funded_account(&ledger, "carol", 500.0).await;

    coordinator
        .place_bet(alice, 100.0, CoinSide::Heads)
        .await
        .expect("alice bet");
    coordinator
        .place_bet(bob, 250.0, CoinSide::Tails)
        .await
        .expect("bob bet");
    coordinator
        .place_bet(carol, 50.0, CoinSide::Heads)
        .await
        .expect("carol bet");

    coordinator.lock_bets().await.expect("lock");
    coordinator
        .resolve_with(CoinSide::Heads)
        .await
        .expect("resolve");
    let payouts = coordinator.settle().await.expect("settle");

    assert_eq!(payouts.len(), 2);
    assert_eq!(ledger.account(alice).await.unwrap().balance, 600.0);
    assert_eq!(ledger.account(bob).await.unwrap().balance, 250.0);
    assert_eq!(ledger.account(carol).await.unwrap().balance, 550.0);
}

#[tokio::test]
async fn test_settlement_is_idempotent_across_retries() {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(LedgerService::new(store, BonusConfig::default()));
    let coordinator = RoundCoordinator::new(
        RoundConfig::default(),
        Arc::new(ManualClock::new()),
        ledger.clone(),
        Arc::new(NullBroadcaster),
    );

    let player = funded_account(&ledger, "retry", 500.0).await;
    coordinator
        .place_bet(player, 100.0, CoinSide::Tails)
        .await
        .expect("bet");
    coordinator.lock_bets().await.expect("lock");
    coordinator
        .resolve_with(CoinSide::Tails)
        .await
        .expect("resolve");

    coordinator.settle().await.expect("first settle");
    for _ in 0..3 {
        let repeat = coordinator.settle().await.expect("repeat settle");
        assert!(repeat.is_empty());
    }
    assert_eq!(ledger.account(player).await.unwrap().balance, 600.0);
}

#[tokio::test]
async fn test_stakes_are_kept_when_round_is_lost() {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(LedgerService::new(store, BonusConfig::default()));
    let coordinator = RoundCoordinator::new(
        RoundConfig::default(),
        Arc::new(ManualClock::new()),
        ledger.clone(),
        Arc::new(NullBroadcaster),
    );

    let player = funded_account(&ledger, "loser", 500.0).await;
    coordinator
        .place_bet(player, 100.0, CoinSide::Heads)
        .await
        .expect("bet");
    coordinator.lock_bets().await.expect("lock");
    coordinator
        .resolve_with(CoinSide::Tails)
        .await
        .expect("resolve");
    let payouts = coordinator.settle().await.expect("settle");

    assert!(payouts.is_empty());
    assert_eq!(ledger.account(player).await.unwrap().balance, 400.0);
}
