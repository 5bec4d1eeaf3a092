//! In-flight tower payloads.
//!
//! Seeking projectiles home toward a live target and fall back to its
//! last-known position once the handle goes stale. Ballistic payloads fly
//! toward a fixed, pre-predicted impact point on a timed arc; the arc height
//! is purely cosmetic and never changes the impact time.

use std::f32::consts::PI;
use std::time::Duration;

use bulwark_core::{EnemyHandle, Position, TowerKind};

use crate::registry::EnemyRegistry;

#[derive(Debug, Clone)]
pub(crate) enum Flight {
    Seeking {
        target: EnemyHandle,
        last_known: Position,
    },
    Ballistic {
        origin: Position,
        impact: Position,
        flight_time: Duration,
        elapsed: Duration,
        arc_height: f32,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Projectile {
    pub(crate) weapon: TowerKind,
    pub(crate) position: Position,
    pub(crate) speed: f32,
    pub(crate) damage: f32,
    pub(crate) splash_radius: f32,
    pub(crate) flight: Flight,
}

/// Where and how a finished projectile lands.
#[derive(Debug, Clone)]
pub(crate) struct ImpactReport {
    pub(crate) weapon: TowerKind,
    pub(crate) at: Position,
    pub(crate) damage: f32,
    pub(crate) splash_radius: f32,
    /// Set for seeking projectiles without splash; damage lands on this
    /// enemy only, and on nobody if the handle went stale in flight.
    pub(crate) direct_target: Option<EnemyHandle>,
}

impl Projectile {
    /// Advances the projectile by `dt`. Returns the impact report once the
    /// projectile lands this step.
    pub(crate) fn advance(&mut self, dt: Duration, registry: &EnemyRegistry) -> Option<ImpactReport> {
        match &mut self.flight {
            Flight::Seeking { target, last_known } => {
                if let Some(slot) = registry.get(*target) {
                    *last_known = slot.position;
                }
                let step = self.speed * dt.as_secs_f32();
                if self.position.distance_to(*last_known) <= step {
                    self.position = *last_known;
                    return Some(ImpactReport {
                        weapon: self.weapon,
                        at: *last_known,
                        damage: self.damage,
                        splash_radius: self.splash_radius,
                        direct_target: (self.splash_radius <= 0.0).then_some(*target),
                    });
                }
                self.position = self.position.step_toward(*last_known, step);
                None
            }
            Flight::Ballistic {
                origin,
                impact,
                flight_time,
                elapsed,
                ..
            } => {
                *elapsed += dt;
                if *elapsed >= *flight_time {
                    self.position = *impact;
                    return Some(ImpactReport {
                        weapon: self.weapon,
                        at: *impact,
                        damage: self.damage,
                        splash_radius: self.splash_radius,
                        direct_target: None,
                    });
                }
                let t = elapsed.as_secs_f32() / flight_time.as_secs_f32();
                self.position = Position::new(
                    origin.x() + (impact.x() - origin.x()) * t,
                    origin.y() + (impact.y() - origin.y()) * t,
                );
                None
            }
        }
    }

    /// Cosmetic altitude above the ground plane for presentation.
    pub(crate) fn height(&self) -> f32 {
        match &self.flight {
            Flight::Seeking { .. } => 0.0,
            Flight::Ballistic {
                flight_time,
                elapsed,
                arc_height,
                ..
            } => {
                let t = (elapsed.as_secs_f32() / flight_time.as_secs_f32()).clamp(0.0, 1.0);
                arc_height * (PI * t).sin()
            }
        }
    }
}
