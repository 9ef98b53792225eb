mod chain;
mod controls;
mod health;
pub mod models;
mod stats;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(stats::get_stats)
            .service(stats::get_scene)
            .service(chain::get_chain)
            .service(chain::get_mempool)
            .service(controls::get_difficulty)
            .service(controls::set_difficulty)
            .service(controls::set_speed)
            .service(controls::set_display)
            .service(controls::reset),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};
    use serde_json::{Value, json};

    use super::{AppState, init_routes};
    use crate::engine::tests::sim;

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState::new(sim()))
    }

    #[actix_web::test]
    async fn health_answers() {
        let app = test::init_service(App::new().configure(init_routes)).await;
        let req = test::TestRequest::get().uri("/api/v1/health/").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn stats_report_the_fresh_world() {
        let app =
            test::init_service(App::new().app_data(state()).configure(init_routes)).await;
        let req = test::TestRequest::get().uri("/api/v1/stats/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["blocks"], 1);
        assert_eq!(body["pending"], 5);
        assert_eq!(body["nodes"], 8);
        assert_eq!(body["phase"], "mining");
    }

    #[actix_web::test]
    async fn chain_is_valid_and_mempool_lists_pool() {
        let app =
            test::init_service(App::new().app_data(state()).configure(init_routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/chain/").to_request();
        let chain: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(chain["length"], 1);
        assert_eq!(chain["valid"], true);
        assert_eq!(chain["chain"][0]["is_genesis"], true);

        let req = test::TestRequest::get().uri("/api/v1/mempool/").to_request();
        let pool: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(pool["size"], 5);
        assert_eq!(pool["transactions"][0]["status"], "pending");
    }

    #[actix_web::test]
    async fn difficulty_is_bounded() {
        let app =
            test::init_service(App::new().app_data(state()).configure(init_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/difficulty/")
            .set_json(json!({ "difficulty": 7 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/difficulty/")
            .set_json(json!({ "difficulty": 4 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["difficulty"], 4);

        let req = test::TestRequest::get().uri("/api/v1/difficulty/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["difficulty"], 4);
    }

    #[actix_web::test]
    async fn speed_rejects_non_positive() {
        let app =
            test::init_service(App::new().app_data(state()).configure(init_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/speed/")
            .set_json(json!({ "speed": 0.0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/speed/")
            .set_json(json!({ "speed": 2.5 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["speed"], 2.5);
    }

    #[actix_web::test]
    async fn stats_survive_a_huge_speed() {
        let app =
            test::init_service(App::new().app_data(state()).configure(init_routes)).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/speed/")
            .set_json(json!({ "speed": 1e17 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        for _ in 0..2 {
            let req = test::TestRequest::get().uri("/api/v1/stats/").to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["hash_rate"], u64::MAX);
        }
    }

    #[actix_web::test]
    async fn display_updates_only_given_toggles() {
        let app =
            test::init_service(App::new().app_data(state()).configure(init_routes)).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/display/")
            .set_json(json!({ "show_hashes": false }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["show_hashes"], false);
        assert_eq!(body["show_mining"], true);
        assert_eq!(body["auto_mine"], true);
    }

    #[actix_web::test]
    async fn reset_restores_defaults() {
        let data = state();
        data.simulation.lock().unwrap().set_speed(3.0);
        let app =
            test::init_service(App::new().app_data(data.clone()).configure(init_routes)).await;

        let req = test::TestRequest::post().uri("/api/v1/reset/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["reset"], true);
        assert_eq!(body["stats"]["blocks"], 1);
        assert_eq!(data.simulation.lock().unwrap().speed(), 1.0);
    }

    #[actix_web::test]
    async fn scene_exposes_nodes_and_particles() {
        let app =
            test::init_service(App::new().app_data(state()).configure(init_routes)).await;
        let req = test::TestRequest::get().uri("/api/v1/scene/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["nodes"].as_array().map(Vec::len), Some(8));
        assert!(body["particles"].is_object());
        assert_eq!(body["mining_block"]["index"], 1);
    }
}
