//! Score, money, and streak-multiplier bookkeeping.
//!
//! The ledger reacts to defeat and leak reports in a fixed order so that
//! streak resets, multiplier steps, and sign flips always compose the same
//! way. Score can never go below zero and purchases are all-or-nothing.

use bulwark_core::EnemyTypeDefinition;

/// Tunable parameters for the economy ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EconomyConfig {
    /// Money granted at session start.
    pub starting_money: u32,
    /// Multiplier the ledger opens with.
    pub starting_multiplier: i32,
    /// Upper clamp for the streak multiplier.
    pub max_multiplier: i32,
    /// Lower clamp for the streak multiplier.
    pub min_multiplier: i32,
    /// Consecutive defeats required to raise the multiplier one step.
    pub kills_for_increase: u32,
    /// Consecutive leaks required to lower the multiplier one step.
    pub leaks_for_decrease: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_money: 100,
            starting_multiplier: 1,
            max_multiplier: 10,
            min_multiplier: -10,
            kills_for_increase: 1,
            leaks_for_decrease: 1,
        }
    }
}

/// Session-scoped ledger holding score, money, and the streak multiplier.
#[derive(Debug, Clone)]
pub(crate) struct EconomyLedger {
    config: EconomyConfig,
    score: u32,
    money: u32,
    multiplier: i32,
    consecutive_kills: u32,
    consecutive_leaks: u32,
}

impl EconomyLedger {
    pub(crate) fn new(config: EconomyConfig) -> Self {
        Self {
            score: 0,
            money: config.starting_money,
            multiplier: config.starting_multiplier,
            consecutive_kills: 0,
            consecutive_leaks: 0,
            config,
        }
    }

    pub(crate) fn score(&self) -> u32 {
        self.score
    }

    pub(crate) fn money(&self) -> u32 {
        self.money
    }

    pub(crate) fn multiplier(&self) -> i32 {
        self.multiplier
    }

    /// Records a defeated enemy. Ordering is load-bearing: the leak streak
    /// resets first, then the kill streak may step the multiplier, then a
    /// negative multiplier snaps to one before score and money are granted.
    pub(crate) fn record_defeat(&mut self, definition: &EnemyTypeDefinition) {
        self.consecutive_leaks = 0;
        self.consecutive_kills += 1;
        if self.consecutive_kills >= self.config.kills_for_increase {
            self.consecutive_kills = 0;
            self.multiplier = (self.multiplier + 1).min(self.config.max_multiplier);
        }
        if self.multiplier < 0 {
            self.multiplier = 1;
        }
        let gain = definition.score_value.saturating_mul(self.multiplier.unsigned_abs());
        self.score = self.score.saturating_add(gain);
        self.money = self.money.saturating_add(definition.reward);
    }

    /// Records a leaked enemy. The kill streak resets first, then the leak
    /// streak may step the multiplier down, then a positive multiplier snaps
    /// to minus one before the score penalty lands. Score floors at zero.
    pub(crate) fn record_leak(&mut self, definition: &EnemyTypeDefinition) {
        self.consecutive_kills = 0;
        self.consecutive_leaks += 1;
        if self.consecutive_leaks >= self.config.leaks_for_decrease {
            self.consecutive_leaks = 0;
            self.multiplier = (self.multiplier - 1).max(self.config.min_multiplier);
        }
        if self.multiplier > 0 {
            self.multiplier = -1;
        }
        let penalty = definition.score_value.saturating_mul(self.multiplier.unsigned_abs());
        self.score = self.score.saturating_sub(penalty);
    }

    /// Deducts `cost` when affordable. No partial deduction happens on
    /// failure.
    pub(crate) fn try_purchase(&mut self, cost: u32) -> bool {
        if self.money < cost {
            return false;
        }
        self.money -= cost;
        true
    }
}
