use actix_web::{HttpResponse, Responder, get, post, web};
use log::warn;

use super::models::{
    AppState, DifficultyResponse, DisplayRequest, ResetResponse, SetDifficultyRequest,
    SetSpeedRequest, SpeedResponse,
};
use crate::blockchain::{DIFF_MAX, DIFF_MIN};

/// Get the current mining difficulty.
#[get("/difficulty/")]
pub async fn get_difficulty(state: web::Data<AppState>) -> impl Responder {
    let sim = state.simulation.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: sim.difficulty(),
    })
}

/// Update the difficulty; the in-flight attempt keeps its nonce.
#[post("/difficulty/")]
pub async fn set_difficulty(
    state: web::Data<AppState>,
    body: web::Json<SetDifficultyRequest>,
) -> impl Responder {
    if !(DIFF_MIN..=DIFF_MAX).contains(&body.difficulty) {
        warn!("rejected difficulty {}", body.difficulty);
        return HttpResponse::BadRequest()
            .body(format!("difficulty must be between {DIFF_MIN} and {DIFF_MAX}"));
    }
    let mut sim = state.simulation.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: sim.set_difficulty(body.difficulty),
    })
}

#[post("/speed/")]
pub async fn set_speed(
    state: web::Data<AppState>,
    body: web::Json<SetSpeedRequest>,
) -> impl Responder {
    let mut sim = state.simulation.lock().expect("mutex poisoned");
    if !sim.set_speed(body.speed) {
        warn!("rejected speed {}", body.speed);
        return HttpResponse::BadRequest().body("speed must be a positive number");
    }
    HttpResponse::Ok().json(SpeedResponse { speed: sim.speed() })
}

/// Flip any subset of the renderer toggles and echo the full set.
#[post("/display/")]
pub async fn set_display(
    state: web::Data<AppState>,
    body: web::Json<DisplayRequest>,
) -> impl Responder {
    let mut sim = state.simulation.lock().expect("mutex poisoned");
    if let Some(on) = body.show_hashes {
        sim.set_show_hashes(on);
    }
    if let Some(on) = body.show_mining {
        sim.set_show_mining(on);
    }
    if let Some(on) = body.show_network {
        sim.set_show_network(on);
    }
    if let Some(on) = body.auto_mine {
        sim.set_auto_mine(on);
    }
    HttpResponse::Ok().json(sim.display())
}

#[post("/reset/")]
pub async fn reset(state: web::Data<AppState>) -> impl Responder {
    let mut sim = state.simulation.lock().expect("mutex poisoned");
    sim.reset();
    HttpResponse::Ok().json(ResetResponse {
        reset: true,
        stats: sim.stats(),
    })
}
