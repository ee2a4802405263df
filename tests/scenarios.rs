use std::collections::BTreeSet;

use gear_clash::sim::Task;
use gear_clash::{GameStore, ItemKind, MatchState, PlayerId, SimConfig, Simulation, StartupError};
use glam::Vec2;

const A: PlayerId = PlayerId(1);
const B: PlayerId = PlayerId(2);

fn config() -> SimConfig {
    SimConfig {
        seed: Some(7),
        ..SimConfig::default()
    }
}

fn simulation(config: SimConfig) -> Simulation<MatchState> {
    let store = MatchState::new(config.max_hp, config.match_duration_ms());
    Simulation::new(config, store).expect("default setup is valid")
}

fn started(config: SimConfig) -> Simulation<MatchState> {
    let mut sim = simulation(config);
    sim.start();
    sim.start_match();
    sim
}

fn place(sim: &mut Simulation<MatchState>, id: PlayerId, pos: Vec2, vel: Vec2) {
    let body = sim.world_mut().player_body_mut(id).expect("player body");
    body.pos = pos;
    body.vel = vel;
}

fn tick_until(sim: &mut Simulation<MatchState>, ms: f64) {
    while sim.now_ms() < ms {
        sim.tick();
    }
}

fn due_times(sim: &Simulation<MatchState>, task: Task) -> Vec<f64> {
    sim.pending_tasks()
        .into_iter()
        .filter(|(_, t)| *t == task)
        .map(|(due, _)| due)
        .collect()
}

/// Due time of the single `task` entry that was not pending before
fn new_due(before: &[f64], sim: &Simulation<MatchState>, task: Task) -> f64 {
    let added: Vec<f64> = due_times(sim, task)
        .into_iter()
        .filter(|due| !before.contains(due))
        .collect();
    assert_eq!(added.len(), 1, "expected one new {task:?}, got {added:?}");
    added[0]
}

#[test]
fn gear_pickup_then_strike() {
    let mut sim = started(config());
    place(&mut sim, A, Vec2::new(300.0, 250.0), Vec2::new(3.0, 3.0));
    place(&mut sim, B, Vec2::new(500.0, 100.0), Vec2::new(-3.0, 3.0));

    let gear = sim.create_gear(Some(Vec2::new(300.0, 250.0))).expect("gear spawns");
    sim.tick();

    assert!(sim.store().player(A).unwrap().has_gear);
    assert!(sim.store().item(gear).is_none());
    assert!(sim.world().item_body(gear).is_none());
    assert!(sim.store().has_gear_entity());

    let a_pos = sim.world().player_body(A).unwrap().pos;
    place(&mut sim, A, a_pos, Vec2::new(2.97, 2.97));
    place(&mut sim, B, a_pos + Vec2::new(50.0, 0.0), Vec2::new(-2.97, 2.97));
    let before = due_times(&sim, Task::SpawnGear);
    sim.tick();

    assert_eq!(sim.store().player(B).unwrap().hp, 4);
    assert_eq!(sim.store().player(A).unwrap().hp, 5);
    assert!(!sim.store().player(A).unwrap().has_gear);
    assert!(!sim.store().has_gear_entity());

    let delay = new_due(&before, &sim, Task::SpawnGear) - sim.now_ms();
    assert!((1000.0..2000.0).contains(&delay), "respawn in {delay} ms");
}

#[test]
fn heart_heals_and_respawns() {
    let mut sim = started(config());
    place(&mut sim, B, Vec2::new(450.0, 350.0), Vec2::new(3.0, 3.0));
    place(&mut sim, A, Vec2::new(100.0, 100.0), Vec2::new(3.0, -3.0));
    sim.store_mut().player_mut(A).unwrap().hp = 3;

    let heart = sim.create_heart(Vec2::new(100.0, 100.0)).expect("heart spawns");
    let before = due_times(&sim, Task::SpawnHeart);
    sim.tick();

    assert_eq!(sim.store().player(A).unwrap().hp, 4);
    assert!(sim.store().item(heart).is_none());
    assert!(sim.world().item_body(heart).is_none());

    let due = new_due(&before, &sim, Task::SpawnHeart);
    let delay = due - sim.now_ms();
    assert!((2000.0..4000.0).contains(&delay), "respawn in {delay} ms");

    tick_until(&mut sim, due);
    let spawned: Vec<_> = sim
        .store()
        .items()
        .iter()
        .filter(|item| item.kind() == ItemKind::Heart && item.id.created_ms == sim.now_ms() as u64)
        .collect();
    assert!(!spawned.is_empty());
    for item in spawned {
        assert!(item.position.x >= 30.0 && item.position.x <= 570.0);
        assert!(item.position.y >= 30.0 && item.position.y <= 470.0);
    }
}

#[test]
fn heal_is_capped_at_max() {
    let mut sim = started(config());
    place(&mut sim, B, Vec2::new(450.0, 350.0), Vec2::new(3.0, 3.0));
    place(&mut sim, A, Vec2::new(200.0, 200.0), Vec2::new(3.0, -3.0));
    sim.create_heart(Vec2::new(200.0, 200.0));
    sim.tick();
    assert_eq!(sim.store().player(A).unwrap().hp, 5);
}

#[test]
fn stalled_players_trigger_redirect() {
    let mut sim = simulation(config());
    // Nearly stationary: well under 70 units per two-second check
    sim.update_player_speed(A, 0.01);
    sim.update_player_speed(B, 0.01);
    sim.start();
    sim.start_match();

    tick_until(&mut sim, 4100.0);
    assert_eq!(sim.monitor().low_movement_checks(), 2);
    assert_eq!(sim.monitor().last_encounter_ms(), 0.0);

    tick_until(&mut sim, 6100.0);
    assert_eq!(sim.monitor().low_movement_checks(), 0);
    assert!(sim.monitor().last_encounter_ms() >= 5999.0);
    for id in [A, B] {
        let speed = sim.world().player_body(id).unwrap().speed();
        assert!((speed - 0.07).abs() < 0.5);
    }
}

/// Hold both players in place at full speed so every check sees them stalled
fn pin_players(sim: &mut Simulation<MatchState>) {
    place(sim, A, Vec2::new(150.0, 250.0), Vec2::new(3.0, 3.0));
    place(sim, B, Vec2::new(450.0, 250.0), Vec2::new(-3.0, 3.0));
}

#[test]
fn stalemate_redirects_and_moves_the_gear() {
    let mut sim = started(config());
    pin_players(&mut sim);
    let gear = sim
        .create_gear(Some(Vec2::new(300.0, 80.0)))
        .expect("gear spawns");

    // Third stalled check at 6 s
    let mut triggered_at = None;
    while sim.now_ms() < 6100.0 {
        pin_players(&mut sim);
        sim.tick();
        if sim.monitor().last_encounter_ms() > 0.0 {
            triggered_at = Some(sim.now_ms());
            break;
        }
    }
    let now = triggered_at.expect("stalemate triggered");
    assert!(now >= 5999.0);

    assert!(sim.store().item(gear).is_none());
    assert!(sim.world().item_body(gear).is_none());

    let respawns: Vec<_> = sim
        .pending_tasks()
        .into_iter()
        .filter_map(|(due, task)| match task {
            Task::RespawnGearNear(target) => Some((due, target)),
            _ => None,
        })
        .collect();
    assert_eq!(respawns.len(), 1, "{respawns:?}");
    let (due, target) = respawns[0];
    assert!((due - now - 300.0).abs() < 1e-6);

    let a = sim.world().player_body(A).unwrap().clone();
    let b = sim.world().player_body(B).unwrap().clone();
    let mid = a.pos.midpoint(b.pos);
    assert!((target - mid).length() < 1e-3);
    for body in [a, b] {
        let to_mid = (mid - body.pos).normalize();
        assert!((body.speed() - 4.2).abs() < 1e-3);
        assert!(body.vel.normalize().dot(to_mid) >= 0.5 - 1e-4, "{} off course", body.vel);
    }

    while sim.now_ms() < due {
        pin_players(&mut sim);
        sim.tick();
    }
    let gears: Vec<_> = sim
        .store()
        .items()
        .iter()
        .filter(|item| item.kind() == ItemKind::Gear)
        .collect();
    assert_eq!(gears.len(), 1);
    assert_ne!(gears[0].id, gear);
    assert!((gears[0].position - target).abs().max_element() <= 30.0);
    assert_eq!(sim.world().item_body(gears[0].id).unwrap().pos, gears[0].position);
}

#[test]
fn uncollected_gear_is_relocated() {
    // A long arena keeps the players from reaching a gear at the far end
    let config = SimConfig {
        arena_width: 3000.0,
        ..config()
    };
    let mut sim = started(config);
    let gear = sim
        .create_gear(Some(Vec2::new(2900.0, 250.0)))
        .expect("gear spawns");

    tick_until(&mut sim, 6990.0);
    assert_eq!(sim.store().item(gear).unwrap().position, Vec2::new(2900.0, 250.0));

    tick_until(&mut sim, 7000.0);
    let item = sim.store().item(gear).expect("gear still uncollected");
    let players = sim.store().players();
    let mid = players[0].position.midpoint(players[1].position);
    assert!((item.position - mid).abs().max_element() <= 50.0);
    assert_eq!(sim.world().item_body(gear).unwrap().pos, item.position);
}

#[test]
fn tasks_from_a_previous_match_are_dropped() {
    let mut sim = started(config());
    tick_until(&mut sim, 500.0);
    sim.start_match();
    assert_eq!(sim.epoch(), 2);
    assert_eq!(due_times(&sim, Task::SpawnHeart).len(), 2);

    let last_due = due_times(&sim, Task::SpawnHeart)
        .into_iter()
        .fold(0.0, f64::max);
    let mut hearts = BTreeSet::new();
    while sim.now_ms() < last_due {
        sim.tick();
        for item in sim.store().items() {
            if item.kind() == ItemKind::Heart {
                hearts.insert(item.id);
            }
        }
    }
    // Only the current match's first heart appeared
    assert_eq!(hearts.len(), 1);
}

#[test]
fn ended_match_drops_pending_work() {
    let mut sim = started(config());
    for _ in 0..5 {
        sim.store_mut().damage_player(B);
    }
    assert!(sim.store().is_ended());
    tick_until(&mut sim, 6000.0);

    assert!(sim.store().items().is_empty());
    assert!(sim.pending_tasks().is_empty());
    assert_eq!(sim.store().winner().map(|p| p.id), Some(A));
}

#[test]
fn stopped_simulation_does_not_move() {
    let mut sim = started(config());
    sim.stop();
    let before = sim.world().player_body(A).unwrap().pos;
    assert_eq!(sim.advance(1000.0), 0);
    sim.tick();
    assert_eq!(sim.world().player_body(A).unwrap().pos, before);
    assert_eq!(sim.now_ms(), 0.0);
}

#[test]
fn startup_preconditions() {
    let err = Simulation::new(
        SimConfig {
            arena_height: 0.0,
            ..config()
        },
        MatchState::new(5, 90_000.0),
    )
    .unwrap_err();
    assert!(matches!(err, StartupError::ArenaNotSized { .. }));

    let err = Simulation::new(
        SimConfig {
            arena_width: 50.0,
            ..config()
        },
        MatchState::new(5, 90_000.0),
    )
    .unwrap_err();
    assert!(matches!(err, StartupError::ArenaTooSmall { .. }));

    let lonely = MatchState::with_players(
        vec![gear_clash::Player::new(A, "Solo", 5, Vec2::new(100.0, 100.0))],
        5,
        90_000.0,
    );
    let err = Simulation::new(config(), lonely).unwrap_err();
    assert!(matches!(err, StartupError::PlayerCount { found: 1 }));

    let err = Simulation::new(
        SimConfig {
            base_speed: -1.0,
            ..config()
        },
        MatchState::new(5, 90_000.0),
    )
    .unwrap_err();
    assert!(matches!(err, StartupError::Config(_)));
}

#[test]
fn speed_held_at_target_through_play() {
    let mut sim = started(config());
    for _ in 0..600 {
        sim.tick();
        for player in sim.store().players() {
            let target = sim.config().target_speed(player.speed_factor);
            let speed = sim.world().player_body(player.id).unwrap().speed();
            assert!((speed - target).abs() <= 0.5 + 1e-4, "{speed} vs {target}");
        }
    }
}
