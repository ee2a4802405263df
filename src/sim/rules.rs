//! Game rules applied to contacts
//!
//! [`resolve_contacts`] is a pure fold from one step's contacts to a list of
//! [`Effect`]s. It keeps a private copy of gear possession and of consumed
//! items, so several contacts in the same step see each other's outcome.

use std::collections::BTreeSet;
use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use rand::Rng;

use super::step::{BodySnapshot, Contact};
use super::timers::Task;
use super::world::BodyRole;
use crate::consts::*;
use crate::store::{ItemId, PlayerId};
use crate::{angle_of, heading, is_near_axis};

/// Largest random deviation from the tangent on a player-player rebound
pub const REBOUND_SPREAD: f32 = 0.2 * PI;
/// Largest random turn applied when a corrected velocity runs along an axis
pub const AXIS_NUDGE: f32 = PI / 12.0;

/// What the rules need to know about a player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub has_gear: bool,
}

/// A state change requested by the rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Player picks up the gear; the gear item is destroyed
    GrantGear { player: PlayerId, item: ItemId },
    /// Player eats the heart: +1 hp, heart destroyed
    Heal { player: PlayerId, item: ItemId },
    /// Gear holder hits the other player: target loses 1 hp, attacker loses the gear
    Strike { attacker: PlayerId, target: PlayerId },
    /// Overwrite a player's velocity
    SetVelocity { player: PlayerId, velocity: Vec2 },
    /// Queue follow-up work
    Schedule { delay_ms: f64, task: Task },
}

/// Fold this step's contacts into effects, in contact order
pub fn resolve_contacts<R: Rng + ?Sized>(
    contacts: &[Contact],
    players: &[PlayerSnapshot],
    rng: &mut R,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    let mut players: Vec<PlayerSnapshot> = players.to_vec();
    let mut consumed: BTreeSet<ItemId> = BTreeSet::new();
    let mut needs_correction: Vec<PlayerId> = Vec::new();

    for contact in contacts {
        if let Contact::Bodies { a, b } = contact {
            match (a.role, b.role) {
                (BodyRole::Player(player), BodyRole::Gear(item))
                | (BodyRole::Gear(item), BodyRole::Player(player)) => {
                    pick_up_gear(player, item, &mut players, &mut consumed, &mut effects);
                }
                (BodyRole::Player(player), BodyRole::Heart(item))
                | (BodyRole::Heart(item), BodyRole::Player(player)) => {
                    eat_heart(player, item, &players, &mut consumed, &mut effects, rng);
                }
                (BodyRole::Player(_), BodyRole::Player(_)) => {
                    player_clash(a, b, &mut players, &mut effects, rng);
                }
                _ => {}
            }
        }

        for id in contact.players().into_iter().flatten() {
            if !needs_correction.contains(&id) {
                needs_correction.push(id);
            }
        }
    }

    for id in needs_correction {
        effects.push(Effect::Schedule {
            delay_ms: VELOCITY_CORRECTION_DELAY_MS,
            task: Task::CorrectVelocity(id),
        });
    }

    effects
}

fn pick_up_gear(
    player: PlayerId,
    item: ItemId,
    players: &mut [PlayerSnapshot],
    consumed: &mut BTreeSet<ItemId>,
    effects: &mut Vec<Effect>,
) {
    let Some(snapshot) = players.iter_mut().find(|p| p.id == player) else {
        return;
    };
    if !consumed.insert(item) {
        return;
    }
    snapshot.has_gear = true;
    log::debug!("{player} picked up {item}");
    effects.push(Effect::GrantGear { player, item });
}

fn eat_heart<R: Rng + ?Sized>(
    player: PlayerId,
    item: ItemId,
    players: &[PlayerSnapshot],
    consumed: &mut BTreeSet<ItemId>,
    effects: &mut Vec<Effect>,
    rng: &mut R,
) {
    if !players.iter().any(|p| p.id == player) || !consumed.insert(item) {
        return;
    }
    log::debug!("{player} ate {item}");
    effects.push(Effect::Heal { player, item });
    effects.push(Effect::Schedule {
        delay_ms: rng.random_range(HEART_RESPAWN_DELAY_MS),
        task: Task::SpawnHeart,
    });
}

fn player_clash<R: Rng + ?Sized>(
    a: &BodySnapshot,
    b: &BodySnapshot,
    players: &mut [PlayerSnapshot],
    effects: &mut Vec<Effect>,
    rng: &mut R,
) {
    let (Some(id_a), Some(id_b)) = (a.role.player(), b.role.player()) else {
        return;
    };

    let strike = if holds_gear(players, id_a) {
        Some((id_a, id_b))
    } else if holds_gear(players, id_b) {
        Some((id_b, id_a))
    } else {
        None
    };

    if let Some((attacker, target)) = strike {
        if let Some(holder) = players.iter_mut().find(|p| p.id == attacker) {
            holder.has_gear = false;
        }
        log::debug!("{attacker} hit {target} with the gear");
        effects.push(Effect::Strike { attacker, target });
        effects.push(Effect::Schedule {
            delay_ms: rng.random_range(GEAR_RESPAWN_DELAY_MS),
            task: Task::SpawnGear,
        });
    }

    let [vel_a, vel_b] = rebound_velocities(a, b, rng);
    effects.push(Effect::SetVelocity {
        player: id_a,
        velocity: vel_a,
    });
    effects.push(Effect::SetVelocity {
        player: id_b,
        velocity: vel_b,
    });
}

fn holds_gear(players: &[PlayerSnapshot], id: PlayerId) -> bool {
    players.iter().any(|p| p.id == id && p.has_gear)
}

/// Re-aim two colliding players along opposite sides of the tangent at the
/// contact, each with its own random spread. Pre-contact speeds are kept.
pub fn rebound_velocities<R: Rng + ?Sized>(
    a: &BodySnapshot,
    b: &BodySnapshot,
    rng: &mut R,
) -> [Vec2; 2] {
    let base = angle_of(b.position - a.position);
    let spread_a = rng.random_range(-REBOUND_SPREAD..REBOUND_SPREAD);
    let spread_b = rng.random_range(-REBOUND_SPREAD..REBOUND_SPREAD);
    [
        heading(base + FRAC_PI_2 + spread_a) * a.velocity.length(),
        heading(base - FRAC_PI_2 + spread_b) * b.velocity.length(),
    ]
}

/// Delayed post-contact cleanup: back to target speed, and off the axes.
/// Returns `None` when the velocity is already fine.
pub fn correct_after_collision<R: Rng + ?Sized>(
    velocity: Vec2,
    target_speed: f32,
    tolerance: f32,
    rng: &mut R,
) -> Option<Vec2> {
    let off_target = (velocity.length() - target_speed).abs() > tolerance;
    let along_axis = is_near_axis(velocity);
    if !off_target && !along_axis {
        return None;
    }

    let mut angle = angle_of(velocity);
    if along_axis {
        angle += rng.random_range(-AXIS_NUDGE..AXIS_NUDGE);
    }
    Some(heading(angle) * target_speed)
}
