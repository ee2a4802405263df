//! Deterministic simulation module
//!
//! All gameplay logic lives here. Given the same seed and the same sequence
//! of calls the simulation replays exactly:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (slot order for bodies, id order for records)
//! - No rendering or platform dependencies

pub mod collision;
pub mod engine;
pub mod monitor;
pub mod rules;
pub mod spawn;
pub mod step;
pub mod sync;
pub mod timers;
pub mod world;

pub use collision::CollisionResult;
pub use engine::Simulation;
pub use monitor::{CheckOutcome, MonitorSample, StalemateMonitor};
pub use rules::{Effect, PlayerSnapshot, resolve_contacts};
pub use spawn::PlayerSample;
pub use step::{BodySnapshot, Contact, Stepper};
pub use timers::{Scheduler, Task, TimerHandle};
pub use world::{Arena, Body, BodyKey, BodyRole, WallSide, World};
