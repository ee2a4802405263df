//! Gear Clash headless runner
//!
//! Plays one match at simulated 60 Hz with no rendering and prints the result.
//!
//! Usage: `gear-clash [config.json] [max_seconds]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use gear_clash::{GameStore, MatchState, SimConfig, Simulation};

    env_logger::init();
    log::info!("Gear Clash (headless) starting...");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimConfig::load_or_default(path),
        None => SimConfig::default(),
    };
    let max_seconds: f64 = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(f64::from(config.match_duration_secs) + 5.0);

    let store = MatchState::new(config.max_hp, config.match_duration_ms());
    let mut sim = match Simulation::new(config, store) {
        Ok(sim) => sim,
        Err(e) => {
            log::error!("Cannot start: {e}");
            std::process::exit(1);
        }
    };

    sim.start();
    sim.start_match();

    // Frame-sized chunks, as a display loop would feed them
    const FRAME_MS: f64 = 16.0;
    while sim.store().is_active() && sim.now_ms() < max_seconds * 1000.0 {
        sim.advance(FRAME_MS);
    }
    sim.stop();

    println!("\nAfter {:.1} s ({} ticks):", sim.now_ms() / 1000.0, sim.ticks());
    for player in sim.store().players() {
        let gear = if player.has_gear { " [gear]" } else { "" };
        println!("  {:<12} {} hp{gear}", player.name, player.hp);
    }
    match sim.store().winner() {
        Some(winner) => println!("Winner: {}", winner.name),
        None if sim.store().is_ended() => println!("Draw"),
        None => println!("Match still running"),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // A wasm host embeds the library directly; there is nothing to run here
}
