//! Anti-stalemate monitor
//!
//! Runs every two seconds during a match. Players that stop meeting, or that
//! orbit the same small area, are sent back toward each other.

use std::f32::consts::{FRAC_PI_4, FRAC_PI_6};

use glam::Vec2;
use rand::Rng;

use crate::{angle_of, heading, is_near_axis};

/// Players closer than this count as an encounter
pub const ENCOUNTER_DISTANCE: f32 = 150.0;
/// A player that moved more than this since the last check is not stalled
pub const MOVEMENT_THRESHOLD: f32 = 70.0;
/// Consecutive stalled checks that trigger a redirect
pub const STALLED_CHECKS: u32 = 3;
/// Time without an encounter that triggers a redirect
pub const ENCOUNTER_TIMEOUT_MS: f64 = 10_000.0;

/// One player as seen by a check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSample {
    pub position: Vec2,
    pub velocity: Vec2,
    pub target_speed: f32,
}

/// What a check decided
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckOutcome {
    pub triggered: bool,
    pub midpoint: Vec2,
    /// New velocity per seat, `None` to leave it unchanged
    pub velocities: [Option<Vec2>; 2],
}

#[derive(Debug, Clone)]
pub struct StalemateMonitor {
    last_encounter_ms: f64,
    low_movement_checks: u32,
    last_positions: [Vec2; 2],
}

impl StalemateMonitor {
    pub fn new(now_ms: f64, positions: [Vec2; 2]) -> Self {
        Self {
            last_encounter_ms: now_ms,
            low_movement_checks: 0,
            last_positions: positions,
        }
    }

    /// Forget history, as at the start of a match
    pub fn reset(&mut self, now_ms: f64, positions: [Vec2; 2]) {
        *self = Self::new(now_ms, positions);
    }

    #[inline]
    pub fn low_movement_checks(&self) -> u32 {
        self.low_movement_checks
    }

    #[inline]
    pub fn last_encounter_ms(&self) -> f64 {
        self.last_encounter_ms
    }

    /// Run one periodic check
    pub fn check<R: Rng + ?Sized>(
        &mut self,
        now_ms: f64,
        players: &[MonitorSample; 2],
        rng: &mut R,
    ) -> CheckOutcome {
        let positions = [players[0].position, players[1].position];
        let midpoint = positions[0].midpoint(positions[1]);

        if positions[0].distance(positions[1]) < ENCOUNTER_DISTANCE {
            self.last_encounter_ms = now_ms;
        }
        let encounter_timeout = now_ms - self.last_encounter_ms > ENCOUNTER_TIMEOUT_MS;

        let stalled = positions
            .iter()
            .zip(&self.last_positions)
            .all(|(now, before)| now.distance(*before) <= MOVEMENT_THRESHOLD);
        self.last_positions = positions;
        if stalled {
            self.low_movement_checks += 1;
            log::debug!("Low movement check {}", self.low_movement_checks);
        } else {
            self.low_movement_checks = 0;
        }

        let triggered = self.low_movement_checks >= STALLED_CHECKS || encounter_timeout;
        let mut velocities = [None; 2];
        let mut current = [players[0].velocity, players[1].velocity];

        if triggered {
            log::debug!(
                "Stalemate (stalled checks {}, timeout {encounter_timeout}), redirecting toward {midpoint}",
                self.low_movement_checks
            );
            for (seat, sample) in players.iter().enumerate() {
                let side = if seat == 0 { 1.0 } else { -1.0 };
                let vel = redirect_toward(sample.position, midpoint, sample.target_speed, side, rng);
                current[seat] = vel;
                velocities[seat] = Some(vel);
            }
            self.low_movement_checks = 0;
            self.last_encounter_ms = now_ms;
        }

        for (seat, vel) in current.iter().enumerate() {
            if let Some(straight) = straighten(*vel, rng) {
                velocities[seat] = Some(straight);
            }
        }

        CheckOutcome {
            triggered,
            midpoint,
            velocities,
        }
    }
}

/// Head toward `target` at `speed`, turned 30° to 60° to one side so the two
/// players do not collide head on. `side` is `1.0` or `-1.0`.
pub fn redirect_toward<R: Rng + ?Sized>(
    from: Vec2,
    target: Vec2,
    speed: f32,
    side: f32,
    rng: &mut R,
) -> Vec2 {
    let base = angle_of(target - from);
    let offset = side * (FRAC_PI_6 + rng.random_range(0.0..FRAC_PI_6));
    heading(base + offset) * speed
}

/// Turn axis-aligned travel onto a diagonal-ish heading, keeping speed.
/// `None` when the velocity is already off the axes.
pub fn straighten<R: Rng + ?Sized>(velocity: Vec2, rng: &mut R) -> Option<Vec2> {
    if !is_near_axis(velocity) {
        return None;
    }
    let mut angle = angle_of(velocity) + rng.random_range(-FRAC_PI_4..FRAC_PI_4);
    let (sin, cos) = angle.sin_cos();
    if cos.abs() < 0.3 || sin.abs() < 0.3 {
        angle += FRAC_PI_4;
    }
    Some(heading(angle) * velocity.length())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn sample(x: f32, y: f32, vx: f32, vy: f32) -> MonitorSample {
        MonitorSample {
            position: Vec2::new(x, y),
            velocity: Vec2::new(vx, vy),
            target_speed: 4.2,
        }
    }

    #[test]
    fn test_three_stalled_checks_trigger() {
        let mut rng = Pcg32::seed_from_u64(1);
        let start = [Vec2::new(100.0, 250.0), Vec2::new(500.0, 250.0)];
        let mut monitor = StalemateMonitor::new(0.0, start);
        let players = [sample(120.0, 260.0, 3.0, 3.0), sample(480.0, 240.0, -3.0, 3.0)];

        assert!(!monitor.check(2000.0, &players, &mut rng).triggered);
        assert_eq!(monitor.low_movement_checks(), 1);
        assert!(!monitor.check(4000.0, &players, &mut rng).triggered);
        assert_eq!(monitor.low_movement_checks(), 2);

        let outcome = monitor.check(6000.0, &players, &mut rng);
        assert!(outcome.triggered);
        assert_eq!(monitor.low_movement_checks(), 0);
        assert_eq!(outcome.midpoint, Vec2::new(300.0, 250.0));

        // Both head toward the midpoint, within 60° of it, at target speed
        for (seat, sample) in players.iter().enumerate() {
            let vel = outcome.velocities[seat].unwrap();
            assert!((vel.length() - 4.2).abs() < 1e-4);
            let to_mid = (outcome.midpoint - sample.position).normalize();
            assert!(vel.normalize().dot(to_mid) >= (std::f32::consts::FRAC_PI_3).cos() - 1e-4);
        }
    }

    #[test]
    fn test_movement_resets_counter() {
        let mut rng = Pcg32::seed_from_u64(2);
        let start = [Vec2::new(100.0, 100.0), Vec2::new(200.0, 100.0)];
        let mut monitor = StalemateMonitor::new(0.0, start);
        let still = [sample(100.0, 100.0, 3.0, 3.0), sample(200.0, 100.0, 3.0, 3.0)];
        monitor.check(2000.0, &still, &mut rng);
        assert_eq!(monitor.low_movement_checks(), 1);

        let moved = [sample(300.0, 100.0, 3.0, 3.0), sample(200.0, 100.0, 3.0, 3.0)];
        monitor.check(4000.0, &moved, &mut rng);
        assert_eq!(monitor.low_movement_checks(), 0);
    }

    #[test]
    fn test_encounter_timeout_triggers() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut monitor = StalemateMonitor::new(0.0, [Vec2::ZERO, Vec2::ZERO]);
        let mut x = 50.0;
        let mut triggered_at = None;
        for check in 1..=6 {
            // Always far apart, always moving
            x += 100.0;
            let players = [sample(x, 50.0, 3.0, 3.0), sample(x, 450.0, 3.0, 3.0)];
            if monitor.check(check as f64 * 2000.0, &players, &mut rng).triggered {
                triggered_at = Some(check);
                break;
            }
        }
        // 12 s is the first check more than 10 s after the last encounter
        assert_eq!(triggered_at, Some(6));
        assert_eq!(monitor.last_encounter_ms(), 12_000.0);
    }

    #[test]
    fn test_encounter_refreshes_timer() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut monitor = StalemateMonitor::new(0.0, [Vec2::ZERO, Vec2::ZERO]);
        let players = [sample(200.0, 250.0, 3.0, 3.0), sample(300.0, 250.0, 3.0, 3.0)];
        monitor.check(2000.0, &players, &mut rng);
        assert_eq!(monitor.last_encounter_ms(), 2000.0);
    }

    #[test]
    fn test_straighten() {
        let mut rng = Pcg32::seed_from_u64(5);
        assert!(straighten(Vec2::new(3.0, 3.0), &mut rng).is_none());
        for _ in 0..50 {
            let v = straighten(Vec2::new(4.2, 0.1), &mut rng).unwrap();
            assert!((v.length() - Vec2::new(4.2, 0.1).length()).abs() < 1e-4);
        }
    }

    #[test]
    fn test_straighten_applied_without_trigger() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut monitor = StalemateMonitor::new(0.0, [Vec2::new(0.0, 0.0), Vec2::new(500.0, 0.0)]);
        let players = [sample(200.0, 250.0, 4.2, 0.0), sample(300.0, 250.0, 3.0, 3.0)];
        let outcome = monitor.check(2000.0, &players, &mut rng);
        assert!(!outcome.triggered);
        assert!(outcome.velocities[0].is_some());
        assert!(outcome.velocities[1].is_none());
    }
}
