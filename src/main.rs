mod api;
mod blockchain;
mod config;
mod engine;
mod transaction;

use actix_web::{App, HttpServer, rt, web};
use dotenvy::dotenv;
use log::debug;
use std::time::{Duration, Instant};

use api::AppState;
use config::SimConfig;
use engine::Simulation;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let cfg = SimConfig::from_env();
    println!(
        "⛓️ Starting blockchain visualizer at http://{}:{}",
        cfg.host, cfg.port
    );

    let state = web::Data::new(AppState::new(Simulation::new(cfg.engine.clone())));
    spawn_ticker(state.clone(), cfg.tick_interval_ms);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((cfg.host.as_str(), cfg.port))?
    .run()
    .await
}

/// Drive `update` at a fixed cadence with the measured frame delta.
fn spawn_ticker(state: web::Data<AppState>, interval_ms: u64) {
    debug!("ticker running every {interval_ms} ms");
    rt::spawn(async move {
        let mut interval = rt::time::interval(Duration::from_millis(interval_ms));
        let mut last = Instant::now();
        loop {
            interval.tick().await;
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f64();
            last = now;
            state.simulation.lock().expect("mutex poisoned").update(dt);
        }
    });
}
