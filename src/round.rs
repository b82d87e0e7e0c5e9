//! RoundCoordinator: timed, multi-participant coin-flip rounds.
//!
//! The coordinator exclusively owns the live `Round`; readers only ever see
//! immutable snapshots, and every phase transition is driven by the single
//! timer loop in `run` over the injected clock. Clients cannot advance phases.
//! Stakes are debited the moment a bet is admitted, so a disconnect after
//! betting does not return the stake.

use crate::broadcast::{EventBroadcaster, GameEvent};
use crate::clock::Clock;
use crate::config::RoundConfig;
use crate::errors::{EngineError, EngineResult};
use crate::ledger::LedgerService;
use crate::types::{AccountId, CoinSide, Round, RoundPhase, RoundSnapshot};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// One settled winner of a round.
#[derive(Debug, Clone, PartialEq)]
pub struct Payout {
    pub account: AccountId,
    pub stake: f64,
    pub amount: f64,
}

pub struct RoundCoordinator {
    round: Mutex<Round>,
    config: RoundConfig,
    clock: Arc<dyn Clock>,
    ledger: Arc<LedgerService>,
    broadcaster: Arc<dyn EventBroadcaster>,
}

impl RoundCoordinator {
    pub fn new(
        config: RoundConfig,
        clock: Arc<dyn Clock>,
        ledger: Arc<LedgerService>,
        broadcaster: Arc<dyn EventBroadcaster>,
    ) -> Self {
        let round = Round::fresh(clock.now());
        Self {
            round: Mutex::new(round),
            config,
            clock,
            ledger,
            broadcaster,
        }
    }

    /// Immutable view of the live round.
    pub async fn snapshot(&self) -> RoundSnapshot {
        self.round.lock().await.snapshot()
    }

    pub async fn phase(&self) -> RoundPhase {
        self.round.lock().await.phase
    }

    /// Admit a bet: validate the stake, reject duplicates, debit immediately
    /// through the ledger, record the wager and broadcast the updated round.
    pub async fn place_bet(
        &self,
        account: AccountId,
        amount: f64,
        choice: CoinSide,
    ) -> EngineResult<RoundSnapshot> {
        if !amount.is_finite() || amount < self.config.min_stake || amount > self.config.max_stake
        {
            return Err(EngineError::validation(format!(
                "Bet must be between {} and {}",
                self.config.min_stake, self.config.max_stake
            )));
        }

        let (snapshot, summary) = {
            let mut round = self.round.lock().await;
            if round.phase != RoundPhase::OpenForBets {
                return Err(EngineError::validation("Bets are closed for this round"));
            }
            if round.bets.contains_key(&account) {
                return Err(EngineError::duplicate(
                    "Bet already placed for this round",
                ));
            }

            // Debit before recording; a failed debit leaves the round as if
            // the bet never happened. The round lock is held so a duplicate
            // submission (e.g. a reconnect replay) cannot interleave.
            let summary = self.ledger.debit_wager(account, amount).await?;
            round.bets.insert(account, amount);
            round.choices.insert(account, choice);
            (round.snapshot(), summary)
        };

        info!(%account, amount, %choice, round = %snapshot.round_id, "Bet admitted");
        self.broadcaster.send_to(
            account,
            GameEvent::UserDataUpdated {
                wallet_balance: summary.balance,
                xp: summary.xp,
                level: summary.level,
            },
        );
        self.broadcaster
            .broadcast(GameEvent::RoundState(snapshot.clone()));
        Ok(snapshot)
    }

    /// OPEN_FOR_BETS -> LOCKED.
    pub async fn lock_bets(&self) -> EngineResult<()> {
        let snapshot = {
            let mut round = self.round.lock().await;
            if round.phase != RoundPhase::OpenForBets {
                return Err(EngineError::validation(format!(
                    "Cannot lock round in phase {}",
                    round.phase
                )));
            }
            round.phase = RoundPhase::Locked;
            round.snapshot()
        };
        self.broadcaster.broadcast(GameEvent::RoundState(snapshot));
        Ok(())
    }

    /// LOCKED -> RESOLVING with the given outcome. The outcome is drawn
    /// independently of the accumulated bets.
    pub async fn resolve_with(&self, outcome: CoinSide) -> EngineResult<()> {
        let snapshot = {
            let mut round = self.round.lock().await;
            if round.phase != RoundPhase::Locked {
                return Err(EngineError::validation(format!(
                    "Cannot resolve round in phase {}",
                    round.phase
                )));
            }
            round.phase = RoundPhase::Resolving;
            round.outcome = Some(outcome);
            round.snapshot()
        };
        info!(round = %snapshot.round_id, %outcome, "Round resolved");
        self.broadcaster
            .broadcast(GameEvent::RoundResult { outcome });
        self.broadcaster.broadcast(GameEvent::RoundState(snapshot));
        Ok(())
    }

    /// RESOLVING -> PAID_OUT. Winners are credited stake x 2 exactly once,
    /// enforced by the per-round paid set; calling settle again for the same
    /// round is a no-op. Account locks are never held here; each credit is an
    /// independent ledger operation.
    pub async fn settle(&self) -> EngineResult<Vec<Payout>> {
        let (due, snapshot) = {
            let mut round = self.round.lock().await;
            match round.phase {
                RoundPhase::Resolving => {}
                // Re-delivered settle (reconnect, duplicate timer event) must
                // not double-pay.
                RoundPhase::PaidOut => return Ok(Vec::new()),
                phase => {
                    return Err(EngineError::validation(format!(
                        "Cannot settle round in phase {}",
                        phase
                    )))
                }
            }
            let outcome = round
                .outcome
                .ok_or_else(|| EngineError::transaction("Resolving round has no outcome"))?;

            let mut due = Vec::new();
            let winners: Vec<AccountId> = round
                .choices
                .iter()
                .filter(|(_, choice)| **choice == outcome)
                .map(|(account, _)| *account)
                .collect();
            for account in winners {
                if !round.paid.insert(account) {
                    continue;
                }
                let stake = round.bets.get(&account).copied().unwrap_or(0.0);
                due.push(Payout {
                    account,
                    stake,
                    amount: stake * 2.0,
                });
            }
            round.phase = RoundPhase::PaidOut;
            (due, round.snapshot())
        };

        for payout in &due {
            match self
                .ledger
                .credit_winnings(payout.account, payout.amount)
                .await
            {
                Ok(summary) => {
                    self.broadcaster.send_to(
                        payout.account,
                        GameEvent::UserDataUpdated {
                            wallet_balance: summary.balance,
                            xp: summary.xp,
                            level: summary.level,
                        },
                    );
                }
                Err(e) => {
                    // The paid marker stands: a failed credit is an
                    // operational incident, not a license to retry into a
                    // double payout.
                    error!(account = %payout.account, amount = payout.amount, "Payout credit failed: {}", e);
                }
            }
        }

        self.broadcaster.broadcast(GameEvent::RoundState(snapshot));
        Ok(due)
    }

    /// Replace the settled round with a brand-new one. Nothing carries over.
    pub async fn reset(&self) {
        let snapshot = {
            let mut round = self.round.lock().await;
            if round.phase != RoundPhase::PaidOut {
                warn!(phase = %round.phase, "Resetting a round that was not paid out");
            }
            *round = Round::fresh(self.clock.now());
            round.snapshot()
        };
        self.broadcaster.broadcast(GameEvent::RoundState(snapshot));
    }

    /// Drive rounds forever on the coordinator's own timeline. This is the
    /// only place phase transitions are initiated.
    pub async fn run(self: Arc<Self>) {
        loop {
            self.run_one_round().await;
        }
    }

    /// One full cycle: betting window, lock, resolve, reveal delay, payout,
    /// cooldown, fresh round.
    pub async fn run_one_round(&self) {
        self.broadcaster
            .broadcast(GameEvent::RoundState(self.snapshot().await));

        self.clock
            .sleep(Duration::from_secs(self.config.betting_window_secs))
            .await;
        if let Err(e) = self.lock_bets().await {
            error!("Phase transition failed: {}", e);
            return;
        }

        let outcome = if rand::thread_rng().gen::<bool>() {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        };
        if let Err(e) = self.resolve_with(outcome).await {
            error!("Phase transition failed: {}", e);
            return;
        }

        self.clock
            .sleep(Duration::from_secs(self.config.reveal_delay_secs))
            .await;
        if let Err(e) = self.settle().await {
            error!("Settlement failed: {}", e);
        }

        self.clock
            .sleep(Duration::from_secs(self.config.cooldown_secs))
            .await;
        self.reset().await;
    }
}
