//! The simulation driver
//!
//! [`Simulation`] owns the body registry, the stepper, the timer queue and
//! the stalemate monitor, and drives a [`GameStore`] through them. Each fixed
//! tick runs, in order:
//!
//! 1. physics step, collecting contacts that started
//! 2. state synchronization (positions out, player speed held at target)
//! 3. collision rules folded into effects, then applied (active match only)
//! 4. match clock countdown
//! 5. due timers

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::monitor::{MonitorSample, StalemateMonitor};
use super::rules::{self, Effect, PlayerSnapshot};
use super::spawn::{self, PlayerSample};
use super::step::Stepper;
use super::sync;
use super::timers::{Scheduler, Task, TimerHandle};
use super::world::{Arena, Body, World};
use crate::config::SimConfig;
use crate::consts::*;
use crate::error::StartupError;
use crate::store::{GameStore, ItemId, ItemKind, PlayerId};
use crate::{heading, launch_angle, random_angle};

/// Two-player arena simulation over a game-state container `S`
#[derive(Debug)]
pub struct Simulation<S: GameStore> {
    config: SimConfig,
    store: S,
    world: World,
    stepper: Stepper,
    scheduler: Scheduler,
    monitor: StalemateMonitor,
    rng: Pcg32,
    /// Simulation clock in ms, advanced one fixed tick at a time
    now_ms: f64,
    accumulator_ms: f64,
    /// Bumped on every match start; scheduled work from an older epoch is stale
    epoch: u64,
    watchdogs: Vec<TimerHandle>,
    /// A match was started and its end has not been handled yet
    match_live: bool,
}

impl<S: GameStore> Simulation<S> {
    /// Build the arena and a body for every seated player.
    ///
    /// Fails if the config is invalid, the arena is not sized or cannot fit
    /// the spawn margin, or the store does not hold exactly two players.
    pub fn new(config: SimConfig, store: S) -> Result<Self, StartupError> {
        config.validate()?;

        let (width, height) = (config.arena_width, config.arena_height);
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(StartupError::ArenaNotSized { width, height });
        }
        let min = 2.0 * config.player_radius.max(SPAWN_MARGIN);
        if width <= min || height <= min {
            return Err(StartupError::ArenaTooSmall { width, height, min });
        }
        let found = store.players().len();
        if found != 2 {
            return Err(StartupError::PlayerCount { found });
        }

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = Pcg32::seed_from_u64(seed);

        let mut world = World::new(Arena::new(width, height, config.wall_restitution));
        for player in store.players() {
            let velocity = heading(random_angle(&mut rng)) * config.target_speed(player.speed_factor);
            world.insert_player(
                player.id,
                Body::player(
                    player.id,
                    player.position,
                    velocity,
                    config.player_radius,
                    config.player_mass,
                    config.player_restitution,
                ),
            );
        }

        let positions = seat_positions(&store);
        log::info!("Simulation ready: arena {width}x{height}, seed {seed}");

        Ok(Self {
            config,
            store,
            world,
            stepper: Stepper::new(),
            scheduler: Scheduler::new(),
            monitor: StalemateMonitor::new(0.0, positions),
            rng,
            now_ms: 0.0,
            accumulator_ms: 0.0,
            epoch: 0,
            watchdogs: Vec::new(),
            match_live: false,
        })
    }

    // === Accessors ===

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access for hosts. Item records must be added and removed
    /// through the simulation so every item keeps its body; use
    /// [`reset_match`](Self::reset_match) rather than the store's own.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct body access, e.g. to place players for a scripted scene
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Simulation clock in ms
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn ticks(&self) -> u64 {
        self.stepper.ticks()
    }

    pub fn monitor(&self) -> &StalemateMonitor {
        &self.monitor
    }

    /// Scheduled work as `(due_ms, task)`, earliest first
    pub fn pending_tasks(&self) -> Vec<(f64, Task)> {
        self.scheduler.pending_tasks()
    }

    pub fn is_running(&self) -> bool {
        self.stepper.is_running()
    }

    // === Lifecycle ===

    /// Start stepping. No-op if already running.
    pub fn start(&mut self) {
        if !self.stepper.start() {
            return;
        }
        if self.store.is_active() {
            self.install_watchdogs();
        }
        log::info!("Simulation started");
    }

    /// Stop stepping and cancel the watchdogs. No-op if already stopped.
    /// Pending one-shot work stays queued.
    pub fn stop(&mut self) {
        if !self.stepper.stop() {
            return;
        }
        self.cancel_watchdogs();
        self.accumulator_ms = 0.0;
        log::info!("Simulation stopped");
    }

    /// Clear the field and begin a new match
    pub fn start_match(&mut self) {
        self.clear_field();
        self.store.start_match();
        self.epoch += 1;
        self.match_live = true;

        for player in self.store.players() {
            let velocity =
                heading(launch_angle(&mut self.rng)) * self.config.target_speed(player.speed_factor);
            if let Some(body) = self.world.player_body_mut(player.id) {
                body.vel = velocity;
            }
        }

        let gear_delay = self.rng.random_range(FIRST_GEAR_DELAY_MS);
        let heart_delay = self.rng.random_range(FIRST_HEART_DELAY_MS);
        self.schedule(gear_delay, Task::SpawnGear);
        self.schedule(heart_delay, Task::SpawnHeart);

        self.monitor.reset(self.now_ms, seat_positions(&self.store));
        self.install_watchdogs();

        log::info!(
            "Match {} started ({} s)",
            self.epoch,
            self.store.remaining_ms() / 1000.0
        );
    }

    /// Clear the field and put the store back to its pre-match state.
    /// Work scheduled for the old match is dropped when it comes due.
    pub fn reset_match(&mut self) {
        self.clear_field();
        self.store.reset_match();
        self.epoch += 1;
        self.match_live = false;
        self.cancel_watchdogs();
        self.monitor.reset(self.now_ms, seat_positions(&self.store));
        log::info!("Match reset");
    }

    fn clear_field(&mut self) {
        for id in self.world.item_ids() {
            self.destroy_item(id);
        }
    }

    fn install_watchdogs(&mut self) {
        self.cancel_watchdogs();
        for task in [Task::GearWatchdog, Task::StalemateCheck] {
            let handle = self
                .scheduler
                .schedule_every(self.now_ms, WATCHDOG_INTERVAL_MS, task, self.epoch);
            self.watchdogs.push(handle);
        }
    }

    fn cancel_watchdogs(&mut self) {
        for handle in self.watchdogs.drain(..) {
            self.scheduler.cancel(handle);
        }
    }

    fn schedule(&mut self, delay_ms: f64, task: Task) -> TimerHandle {
        self.scheduler
            .schedule_once(self.now_ms, delay_ms, task, self.epoch)
    }

    // === Items ===

    /// Place a gear, at `position` (clamped into the spawn area) or where the
    /// placement heuristic puts it. Skipped while a gear is already in play
    /// or no match is running.
    pub fn create_gear(&mut self, position: Option<Vec2>) -> Option<ItemId> {
        if !self.store.is_active() {
            log::debug!("No active match, gear not created");
            return None;
        }
        if self.store.has_gear_entity() {
            log::debug!("Gear already in play, skipping spawn");
            return None;
        }

        let position = match position {
            Some(p) => spawn::clamp_to_spawn_area(self.world.arena(), p),
            None => {
                let samples = self.player_samples()?;
                spawn::gear_position(
                    self.world.arena(),
                    &samples,
                    self.config.player_radius,
                    &mut self.rng,
                )
            }
        };

        let id = self.spawn_item(ItemKind::Gear, position, Some(Vec2::ZERO));
        self.schedule(GEAR_RELOCATE_AFTER_MS, Task::RelocateGear(id));
        Some(id)
    }

    /// Place a heart at `position`, clamped into the spawn area
    pub fn create_heart(&mut self, position: Vec2) -> Option<ItemId> {
        if !self.store.is_active() {
            log::debug!("No active match, heart not created");
            return None;
        }
        let position = spawn::clamp_to_spawn_area(self.world.arena(), position);
        Some(self.spawn_item(ItemKind::Heart, position, None))
    }

    fn spawn_item(&mut self, kind: ItemKind, position: Vec2, velocity: Option<Vec2>) -> ItemId {
        let id = self
            .store
            .add_item(kind, position, velocity, self.now_ms as u64);
        self.world.insert_item(
            id,
            Body::item(
                id,
                position,
                self.config.item_radius,
                self.config.item_restitution,
            ),
        );
        log::debug!("Spawned {id} at ({:.0}, {:.0})", position.x, position.y);
        id
    }

    /// Remove an item from the field. Returns false if it did not exist.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        self.destroy_item(id)
    }

    /// Drop an item's body and record together
    fn destroy_item(&mut self, id: ItemId) -> bool {
        let body = self.world.remove_item(id).is_some();
        let record = self.store.remove_item(id).is_some();
        if body || record {
            log::debug!("Removed {id}");
        }
        body || record
    }

    // === Players ===

    /// Set a player's speed factor and move it at the new target speed right
    /// away, keeping its heading
    pub fn update_player_speed(&mut self, id: PlayerId, speed_factor: f32) -> bool {
        if !speed_factor.is_finite() || speed_factor < 0.0 {
            log::debug!("Ignoring speed factor {speed_factor} for {id}");
            return false;
        }
        if self.store.player(id).is_none() {
            return false;
        }
        self.store.set_speed_factor(id, speed_factor);

        let target = self.config.target_speed(speed_factor);
        let angle = match self.world.player_body(id) {
            Some(body) if body.speed() > 1e-6 => crate::angle_of(body.vel),
            Some(_) => random_angle(&mut self.rng),
            None => return false,
        };
        if let Some(body) = self.world.player_body_mut(id) {
            body.vel = heading(angle) * target;
        }
        true
    }

    fn player_samples(&self) -> Option<[PlayerSample; 2]> {
        let [a, b] = self.store.players() else {
            return None;
        };
        let sample = |id| {
            self.world.player_body(id).map(|body| PlayerSample {
                position: body.pos,
                velocity: body.vel,
            })
        };
        Some([sample(a.id)?, sample(b.id)?])
    }

    // === Stepping ===

    /// Feed elapsed wall time and run the fixed ticks it covers, at most
    /// `MAX_SUBSTEPS` per call. Returns the number of ticks run.
    pub fn advance(&mut self, elapsed_ms: f64) -> u32 {
        if !self.stepper.is_running() {
            return 0;
        }
        if !elapsed_ms.is_finite() {
            log::warn!("Ignoring non-finite frame time {elapsed_ms}");
            return 0;
        }
        // Drop time a stalled host could never catch up on
        self.accumulator_ms += elapsed_ms.clamp(0.0, TICK_MS * MAX_SUBSTEPS as f64);

        let mut substeps = 0;
        while self.accumulator_ms >= TICK_MS && substeps < MAX_SUBSTEPS {
            self.tick();
            self.accumulator_ms -= TICK_MS;
            substeps += 1;
        }
        substeps
    }

    /// Run exactly one fixed tick. No-op while stopped.
    pub fn tick(&mut self) {
        if !self.stepper.is_running() {
            return;
        }
        self.now_ms += TICK_MS;

        let contacts = self.stepper.step(&mut self.world, 1.0);
        sync::synchronize(
            &mut self.world,
            &mut self.store,
            self.config.base_speed,
            self.config.speed_tolerance,
            &mut self.rng,
        );

        if self.store.is_active() {
            let players: Vec<PlayerSnapshot> = self
                .store
                .players()
                .iter()
                .map(|p| PlayerSnapshot {
                    id: p.id,
                    has_gear: p.has_gear,
                })
                .collect();
            for effect in rules::resolve_contacts(&contacts, &players, &mut self.rng) {
                self.apply(effect);
            }
            self.count_down();
        }
        self.finish_if_ended();

        self.run_due_tasks();
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::GrantGear { player, item } => {
                if self.destroy_item(item) {
                    if let Some(p) = self.store.player_mut(player) {
                        p.has_gear = true;
                    }
                }
            }
            Effect::Heal { player, item } => {
                if self.destroy_item(item) {
                    self.store.heal_player(player);
                }
            }
            Effect::Strike { attacker, target } => {
                if let Some(p) = self.store.player_mut(attacker) {
                    p.has_gear = false;
                }
                self.store.damage_player(target);
                if let Some(p) = self.store.player(target) {
                    log::debug!("{target} down to {} hp", p.hp);
                }
            }
            Effect::SetVelocity { player, velocity } => {
                if let Some(body) = self.world.player_body_mut(player) {
                    body.vel = velocity;
                }
            }
            Effect::Schedule { delay_ms, task } => {
                self.schedule(delay_ms, task);
            }
        }
    }

    fn count_down(&mut self) {
        let remaining = self.store.remaining_ms() - TICK_MS;
        self.store.set_remaining_ms(remaining);
        if remaining <= 0.0 {
            log::info!("Time up");
            self.store.end_match();
        }
    }

    fn finish_if_ended(&mut self) {
        if !self.match_live || self.store.is_active() {
            return;
        }
        self.match_live = false;
        self.cancel_watchdogs();
        match self.store.winner() {
            Some(winner) => log::info!("Match over: {} wins with {} hp", winner.name, winner.hp),
            None => log::info!("Match over: draw"),
        }
    }

    // === Scheduled work ===

    fn run_due_tasks(&mut self) {
        while let Some(fired) = self.scheduler.pop_due(self.now_ms) {
            if fired.epoch != self.epoch || !self.store.is_active() {
                log::debug!("Dropping stale {:?}", fired.task);
                self.scheduler.cancel(fired.handle);
                continue;
            }
            self.run_task(fired.task);
        }
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::SpawnGear => {
                self.create_gear(None);
            }
            Task::SpawnHeart => {
                let position = spawn::heart_position(self.world.arena(), &mut self.rng);
                self.create_heart(position);
            }
            Task::CorrectVelocity(id) => self.correct_velocity(id),
            Task::RelocateGear(id) => self.relocate_gear(id),
            Task::RespawnGearNear(target) => {
                let position = spawn::near_point(self.world.arena(), target, &mut self.rng);
                self.create_gear(Some(position));
            }
            Task::GearWatchdog => {
                if !self.store.has_gear_entity() {
                    log::debug!("No gear in play, spawning one");
                    self.create_gear(None);
                }
            }
            Task::StalemateCheck => self.check_stalemate(),
        }
    }

    fn correct_velocity(&mut self, id: PlayerId) {
        let Some(player) = self.store.player(id) else {
            return;
        };
        let target = self.config.target_speed(player.speed_factor);
        let tolerance = self.config.speed_tolerance;
        let Some(body) = self.world.player_body_mut(id) else {
            return;
        };
        if let Some(vel) = rules::correct_after_collision(body.vel, target, tolerance, &mut self.rng) {
            body.vel = vel;
        }
    }

    fn relocate_gear(&mut self, id: ItemId) {
        if self.store.item(id).is_none() {
            return;
        }
        let positions = seat_positions(&self.store);
        let position = spawn::relocation_position(self.world.arena(), &positions, &mut self.rng);
        if let Some(body) = self.world.item_body_mut(id) {
            body.pos = position;
        }
        if let Some(item) = self.store.item_mut(id) {
            item.position = position;
        }
        log::debug!("{id} uncollected, moved to ({:.0}, {:.0})", position.x, position.y);
    }

    fn check_stalemate(&mut self) {
        let [a, b] = self.store.players() else {
            return;
        };
        let sample = |id: PlayerId, speed_factor: f32| {
            self.world.player_body(id).map(|body| MonitorSample {
                position: body.pos,
                velocity: body.vel,
                target_speed: self.config.target_speed(speed_factor),
            })
        };
        let (Some(sa), Some(sb)) = (sample(a.id, a.speed_factor), sample(b.id, b.speed_factor)) else {
            return;
        };
        let ids = [a.id, b.id];

        let outcome = self.monitor.check(self.now_ms, &[sa, sb], &mut self.rng);
        for (id, velocity) in ids.into_iter().zip(outcome.velocities) {
            if let (Some(velocity), Some(body)) = (velocity, self.world.player_body_mut(id)) {
                body.vel = velocity;
            }
        }

        if !outcome.triggered {
            return;
        }
        let gear = self
            .store
            .items()
            .iter()
            .find(|item| item.kind() == ItemKind::Gear)
            .map(|item| item.id);
        if let Some(gear) = gear {
            self.destroy_item(gear);
            self.schedule(STALEMATE_RESPAWN_DELAY_MS, Task::RespawnGearNear(outcome.midpoint));
        }
    }
}

fn seat_positions<S: GameStore>(store: &S) -> [Vec2; 2] {
    match store.players() {
        [a, b, ..] => [a.position, b.position],
        _ => [Vec2::ZERO; 2],
    }
}
