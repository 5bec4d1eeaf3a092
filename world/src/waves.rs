//! Wave progression and phase timing.
//!
//! The tracker alternates between the placement and defense phases, ends the
//! session in victory once the final wave is survived, and ends it in defeat
//! once the leak limit is reached. Terminal states freeze the tracker.

use std::time::Duration;

use bulwark_core::{Event, GameStatus, Phase};
use tracing::{debug, warn};

/// Tunable parameters for wave pacing and loss conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveConfig {
    /// Length of each placement window.
    pub placement_duration: Duration,
    /// Nominal length of each defense phase.
    pub defense_duration: Duration,
    /// Minimum defense time that must elapse before the phase may end early.
    pub early_exit_guard: Duration,
    /// Last wave; surviving it wins the session.
    pub final_wave: u32,
    /// Total leaks that end the session in defeat.
    pub max_leaks: u32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            placement_duration: Duration::from_secs(5),
            defense_duration: Duration::from_secs(18),
            early_exit_guard: Duration::from_secs(2),
            final_wave: 10,
            max_leaks: 5,
        }
    }
}

#[derive(Debug)]
pub(crate) struct WaveTracker {
    config: WaveConfig,
    wave: u32,
    phase: Phase,
    status: GameStatus,
    time_remaining: Duration,
    phase_elapsed: Duration,
    leaks: u32,
    spawning_complete: bool,
    opening_announced: bool,
}

impl WaveTracker {
    pub(crate) fn new(config: WaveConfig) -> Self {
        Self {
            wave: 1,
            phase: Phase::Placement,
            status: GameStatus::Playing,
            time_remaining: config.placement_duration,
            phase_elapsed: Duration::ZERO,
            leaks: 0,
            spawning_complete: false,
            opening_announced: false,
            config,
        }
    }

    pub(crate) fn wave(&self) -> u32 {
        self.wave
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn status(&self) -> GameStatus {
        self.status
    }

    pub(crate) fn time_remaining(&self) -> Duration {
        self.time_remaining
    }

    pub(crate) fn leaks(&self) -> u32 {
        self.leaks
    }

    /// Marks wave spawning as finished. The report is ignored when it names
    /// a wave other than the one in progress.
    pub(crate) fn mark_spawning_complete(&mut self, wave: u32) {
        if wave != self.wave {
            warn!(
                reported = wave,
                current = self.wave,
                "spawning-complete report for a different wave ignored"
            );
            return;
        }
        self.spawning_complete = true;
    }

    /// Counts a leaked enemy. Returns true when this leak reaches the limit
    /// and the session transitions to game over.
    pub(crate) fn record_leak(&mut self) -> bool {
        if self.status != GameStatus::Playing {
            return false;
        }
        self.leaks += 1;
        if self.leaks >= self.config.max_leaks {
            self.status = GameStatus::GameOver;
            return true;
        }
        false
    }

    /// Advances phase timers and runs due transitions. `alive` is the number
    /// of enemies still on the route.
    pub(crate) fn advance(&mut self, dt: Duration, alive: usize, events: &mut Vec<Event>) {
        if self.status != GameStatus::Playing {
            return;
        }
        // Wave 1's placement window starts with the session rather than
        // through a transition, so its entry is announced on the first tick.
        if !self.opening_announced {
            self.opening_announced = true;
            events.push(Event::PhaseChanged {
                phase: self.phase,
                wave: self.wave,
                time_remaining: self.time_remaining,
            });
        }
        self.time_remaining = self.time_remaining.saturating_sub(dt);
        self.phase_elapsed += dt;
        match self.phase {
            Phase::Placement => {
                if self.time_remaining.is_zero() {
                    self.enter_defense(events);
                }
            }
            Phase::Defense => {
                let guard_met = self.phase_elapsed
                    >= self
                        .config
                        .defense_duration
                        .saturating_sub(self.config.early_exit_guard);
                let cleared = self.spawning_complete && alive == 0 && guard_met;
                if self.time_remaining.is_zero() || cleared {
                    self.complete_wave(events);
                }
            }
        }
    }

    fn enter_defense(&mut self, events: &mut Vec<Event>) {
        self.phase = Phase::Defense;
        self.time_remaining = self.config.defense_duration;
        self.phase_elapsed = Duration::ZERO;
        self.spawning_complete = false;
        debug!(wave = self.wave, "defense phase started");
        events.push(Event::PhaseChanged {
            phase: Phase::Defense,
            wave: self.wave,
            time_remaining: self.config.defense_duration,
        });
    }

    fn complete_wave(&mut self, events: &mut Vec<Event>) {
        events.push(Event::WaveCompleted { wave: self.wave });
        if self.wave >= self.config.final_wave {
            self.status = GameStatus::Victory;
            debug!(waves = self.wave, "final wave survived");
            events.push(Event::VictoryAchieved {
                waves_survived: self.wave,
            });
            return;
        }
        self.wave += 1;
        self.phase = Phase::Placement;
        self.time_remaining = self.config.placement_duration;
        self.phase_elapsed = Duration::ZERO;
        self.spawning_complete = false;
        debug!(wave = self.wave, "placement phase started");
        events.push(Event::PhaseChanged {
            phase: Phase::Placement,
            wave: self.wave,
            time_remaining: self.config.placement_duration,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WaveConfig {
        WaveConfig {
            placement_duration: Duration::from_secs(2),
            defense_duration: Duration::from_secs(10),
            early_exit_guard: Duration::from_secs(2),
            final_wave: 2,
            max_leaks: 3,
        }
    }

    fn run(tracker: &mut WaveTracker, seconds: u64, alive: usize) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..seconds {
            tracker.advance(Duration::from_secs(1), alive, &mut events);
        }
        events
    }

    #[test]
    fn session_start_announces_the_opening_placement() {
        let mut tracker = WaveTracker::new(config());
        let events = run(&mut tracker, 1, 0);
        assert!(matches!(
            events.as_slice(),
            [Event::PhaseChanged {
                phase: Phase::Placement,
                wave: 1,
                time_remaining,
            }] if *time_remaining == config().placement_duration
        ));
        // Announced once, not every tick.
        let mut events = Vec::new();
        tracker.advance(Duration::from_millis(500), 0, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn placement_expires_into_defense() {
        let mut tracker = WaveTracker::new(config());
        let events = run(&mut tracker, 2, 0);
        assert_eq!(tracker.phase(), Phase::Defense);
        assert!(matches!(
            events.as_slice(),
            [
                Event::PhaseChanged {
                    phase: Phase::Placement,
                    wave: 1,
                    ..
                },
                Event::PhaseChanged {
                    phase: Phase::Defense,
                    wave: 1,
                    ..
                }
            ]
        ));
    }

    #[test]
    fn defense_ends_early_once_cleared_past_the_guard() {
        let mut tracker = WaveTracker::new(config());
        let _ = run(&mut tracker, 2, 0);
        tracker.mark_spawning_complete(1);
        // Guard window: no exit before 8s of defense even with nothing alive.
        let _ = run(&mut tracker, 7, 0);
        assert_eq!(tracker.phase(), Phase::Defense);
        let events = run(&mut tracker, 1, 0);
        assert_eq!(tracker.wave(), 2);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::WaveCompleted { wave: 1 })));
    }

    #[test]
    fn defense_waits_for_spawning_and_clearance() {
        let mut tracker = WaveTracker::new(config());
        let _ = run(&mut tracker, 2, 0);
        // Enemies alive: the wave runs its full duration.
        let _ = run(&mut tracker, 9, 3);
        assert_eq!(tracker.wave(), 1);
        let _ = run(&mut tracker, 1, 3);
        assert_eq!(tracker.wave(), 2);
        assert_eq!(tracker.phase(), Phase::Placement);
    }

    #[test]
    fn surviving_the_final_wave_is_victory() {
        let mut tracker = WaveTracker::new(config());
        let _ = run(&mut tracker, 2, 0);
        let _ = run(&mut tracker, 10, 1);
        assert_eq!(tracker.wave(), 2);
        let _ = run(&mut tracker, 2, 0);
        let events = run(&mut tracker, 10, 1);
        assert_eq!(tracker.status(), GameStatus::Victory);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::VictoryAchieved { waves_survived: 2 })));
        // Frozen: further time does nothing.
        let events = run(&mut tracker, 5, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn leak_limit_triggers_game_over_exactly_at_the_threshold() {
        let mut tracker = WaveTracker::new(config());
        assert!(!tracker.record_leak());
        assert!(!tracker.record_leak());
        assert!(tracker.record_leak());
        assert_eq!(tracker.status(), GameStatus::GameOver);
        assert_eq!(tracker.leaks(), 3);
        assert!(!tracker.record_leak());
        assert_eq!(tracker.leaks(), 3);
    }

    #[test]
    fn spawning_report_for_a_stale_wave_is_ignored() {
        let mut tracker = WaveTracker::new(config());
        let _ = run(&mut tracker, 2, 0);
        tracker.mark_spawning_complete(7);
        let _ = run(&mut tracker, 9, 0);
        assert_eq!(tracker.wave(), 1);
    }
}
