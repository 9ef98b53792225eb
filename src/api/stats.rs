use actix_web::{HttpResponse, Responder, get, web};

use super::models::AppState;

/// Dashboard counters for the current frame.
#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let sim = state.simulation.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(sim.stats())
}

/// Everything the renderer draws: chain, pool, in-flight block, nodes,
/// particles and arrows.
#[get("/scene/")]
pub async fn get_scene(state: web::Data<AppState>) -> impl Responder {
    let sim = state.simulation.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(sim.scene())
}
