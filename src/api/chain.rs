use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, ChainResponse, MempoolResponse};

/// Get the committed chain with its integrity verdict.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let sim = state.simulation.lock().expect("mutex poisoned");
    let ledger = sim.ledger();
    let resp = ChainResponse {
        length: ledger.len(),
        difficulty: sim.difficulty(),
        valid: ledger.is_valid_chain(),
        chain: &ledger.chain,
    };
    HttpResponse::Ok().json(resp)
}

/// Pending pool, oldest first.
#[get("/mempool/")]
pub async fn get_mempool(state: web::Data<AppState>) -> impl Responder {
    let sim = state.simulation.lock().expect("mutex poisoned");
    let pending = &sim.ledger().pending;
    HttpResponse::Ok().json(MempoolResponse {
        size: pending.len(),
        transactions: pending,
    })
}
