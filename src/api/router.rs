//! HTTP router for the clinic portal.
//!
//! Returns a composable `Router` with every route under `/api/`.
//!
//! Middleware stack on protected routes (outermost → innermost):
//! 1. Extension(ApiContext) → 2. Auth validator → 3. Audit logger

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::api::websocket;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

pub(crate) fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/auth/me", get(endpoints::auth::me))
        .route("/doctors", get(endpoints::directory::doctors))
        .route("/patients", get(endpoints::directory::patients))
        .route(
            "/availability",
            get(endpoints::schedule::my_availability).put(endpoints::schedule::save_availability),
        )
        .route(
            "/doctors/:id/availability",
            get(endpoints::schedule::doctor_availability),
        )
        .route("/doctors/:id/slots", get(endpoints::schedule::slots))
        .route(
            "/appointments",
            get(endpoints::appointments::mine).post(endpoints::appointments::book),
        )
        .route("/appointments/pending", get(endpoints::appointments::pending))
        .route("/appointments/upcoming", get(endpoints::appointments::upcoming))
        .route(
            "/appointments/:id/decision",
            post(endpoints::appointments::decide),
        )
        .route(
            "/prescriptions",
            get(endpoints::prescriptions::active).post(endpoints::prescriptions::create),
        )
        .route("/prescriptions/today", get(endpoints::prescriptions::today))
        .route(
            "/prescriptions/:id/medicines/:index/purchase",
            post(endpoints::prescriptions::purchase),
        )
        .route(
            "/prescriptions/:id/medicines/:index/doses",
            post(endpoints::prescriptions::take_dose),
        )
        .route("/adherence", get(endpoints::adherence::mine))
        .route("/patients/:id/adherence", get(endpoints::adherence::for_patient))
        .route(
            "/community/posts",
            get(endpoints::community::list_posts).post(endpoints::community::create_post),
        )
        .route("/community/posts/:id", get(endpoints::community::get_post))
        .route(
            "/community/posts/:id/comments",
            get(endpoints::community::list_comments).post(endpoints::community::add_comment),
        )
        .route(
            "/community/comments/:id/replies",
            get(endpoints::community::list_replies).post(endpoints::community::add_reply),
        )
        .route("/community/:kind/:id/vote", post(endpoints::community::vote))
        .route("/notifications", get(endpoints::notifications::inbox))
        .route("/notifications/:id/read", post(endpoints::notifications::mark_read))
        .route("/pharmacy/alerts", get(endpoints::notifications::pharmacy_alerts))
        .route(
            "/pharmacy/alerts/:id/offer",
            post(endpoints::notifications::send_offer),
        )
        .route("/chat", post(endpoints::chat::send))
        .route("/chat/conversations", get(endpoints::chat::conversations))
        .route("/chat/conversations/:id", get(endpoints::chat::conversation))
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (no session required)
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/login", post(endpoints::auth::login))
        .route("/news", get(endpoints::news::headlines))
        .with_state(ctx.clone());

    // WebSocket upgrade route (token passed as a query parameter)
    let ws_routes = Router::new()
        .route("/ws/subscribe", get(websocket::ws_subscribe))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::core_state::Clock;
    use crate::events::{Event, Topic};
    use crate::news::{Article, MockNewsSource};
    use crate::symptom_chat::{MockSymptomModel, APOLOGY};

    /// Monday 2026-10-19, 08:00.
    fn monday_morning() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn article(title: &str, description: &str) -> Article {
        Article {
            title: title.into(),
            description: description.into(),
            url: format!("https://news.example.com/{}", title.len()),
            image_url: None,
            published_at: Some("2026-10-19T07:00:00Z".into()),
            source_name: "Example".into(),
            content: None,
        }
    }

    fn test_core_with(chat: MockSymptomModel) -> (Arc<CoreState>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig::with_data_dir(tmp.path().to_path_buf());
        let news = MockNewsSource::new(vec![
            article("New vaccine trial results", "Researchers report strong immunity"),
            article("Hospital opens new wing", "More beds for surgery patients"),
            article("Football scores", "Weekend results from the league"),
        ]);
        let core = CoreState::new(config, Arc::new(news), Arc::new(chat))
            .with_clock(Clock::Fixed(monday_morning()));
        core.init_storage().unwrap();
        (Arc::new(core), tmp)
    }

    fn test_core() -> (Arc<CoreState>, tempfile::TempDir) {
        test_core_with(MockSymptomModel::new("Rest and drink fluids."))
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(
        core: &Arc<CoreState>,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        api_router(core.clone())
            .oneshot(request(method, uri, token, body))
            .await
            .unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn get_json(core: &Arc<CoreState>, uri: &str, token: &str) -> Value {
        body_json(send(core, "GET", uri, Some(token), None).await).await
    }

    /// Register an account and return (token, user id).
    async fn register(core: &Arc<CoreState>, name: &str, role: &str) -> (String, String) {
        let email = format!("{}@example.com", name.to_lowercase());
        let response = send(
            core,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": name, "email": email, "password": "secret1", "role": role })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        (
            json["token"].as_str().unwrap().to_string(),
            json["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn health_is_public() {
        let (core, _tmp) = test_core();
        let response = send(&core, "GET", "/api/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn protected_route_requires_token() {
        let (core, _tmp) = test_core();
        let response = send(&core, "GET", "/api/auth/me", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "AUTH_REQUIRED");

        let response = send(&core, "GET", "/api/auth/me", Some("bogus"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_login_me_and_logout() {
        let (core, _tmp) = test_core();
        let (token, _) = register(&core, "Dana", "doctor").await;

        let response = send(&core, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
        let me = body_json(response).await;
        assert_eq!(me["user"]["role"], "doctor");
        assert_eq!(me["landing_page"], "/doctor-dashboard");

        let response = send(
            &core,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "DANA@example.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&core, "POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&core, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (core, _tmp) = test_core();
        register(&core, "Ana", "patient").await;
        let response = send(
            &core,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "nope123" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "AUTH_FAILED");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (core, _tmp) = test_core();
        register(&core, "Ana", "patient").await;
        let response = send(
            &core,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Ana",
                "email": "ana@example.com",
                "password": "secret1",
                "role": "patient"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn role_gating_is_enforced() {
        let (core, _tmp) = test_core();
        let (patient, _) = register(&core, "Ana", "patient").await;
        let (pharmacy, _) = register(&core, "Corner", "pharmacy").await;

        let response = send(&core, "GET", "/api/appointments/pending", Some(&patient), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let response = send(&core, "GET", "/api/pharmacy/alerts", Some(&patient), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let response = send(&core, "GET", "/api/prescriptions", Some(&pharmacy), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let response = send(&core, "GET", "/api/patients", Some(&patient), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn booking_outside_the_grid_window_is_rejected() {
        let (core, _tmp) = test_core();
        let (doctor, doctor_id) = register(&core, "Dana", "doctor").await;
        let (patient, _) = register(&core, "Ana", "patient").await;
        let template = json!({ "days": { "Monday": ["09:00"] } });
        send(&core, "PUT", "/api/availability", Some(&doctor), Some(template)).await;

        for instant in ["2020-01-06T09:00:00", "2099-01-05T09:00:00", "2026-10-26T09:00:00"] {
            let book = json!({ "doctor_id": doctor_id, "slot_instant": instant });
            let response =
                send(&core, "POST", "/api/appointments", Some(&patient), Some(book)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{instant}");
        }
        let mine = get_json(&core, "/api/appointments", &patient).await;
        assert!(mine.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn booking_flow_end_to_end() {
        let (core, _tmp) = test_core();
        let (doctor, doctor_id) = register(&core, "Dana", "doctor").await;
        let (patient, _) = register(&core, "Ana", "patient").await;
        let (other, _) = register(&core, "Ben", "patient").await;

        let response = send(
            &core,
            "PUT",
            "/api/availability",
            Some(&doctor),
            Some(json!({ "days": { "Monday": ["10:00", "09:00"], "Wednesday": ["14:00"] } })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let slots_uri = format!("/api/doctors/{doctor_id}/slots");
        let grid = get_json(&core, &slots_uri, &patient).await;
        let monday = &grid["days"][0];
        assert_eq!(monday["weekday"], "Monday");
        assert_eq!(monday["slots"][0]["slot_instant"], "2026-10-19T09:00:00");
        assert_eq!(monday["slots"][0]["is_booked"], false);

        let book = json!({ "doctor_id": doctor_id, "slot_instant": "2026-10-19T10:00:00" });
        let response =
            send(&core, "POST", "/api/appointments", Some(&patient), Some(book.clone())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let appointment = body_json(response).await;
        assert_eq!(appointment["status"], "pending");

        let response = send(&core, "POST", "/api/appointments", Some(&other), Some(book)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let grid = get_json(&core, &slots_uri, &patient).await;
        assert_eq!(grid["days"][0]["slots"][1]["is_booked"], true);

        let pending = get_json(&core, "/api/appointments/pending", &doctor).await;
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let appointment_id = appointment["id"].as_str().unwrap();
        let decision_uri = format!("/api/appointments/{appointment_id}/decision");
        let response = send(
            &core,
            "POST",
            &decision_uri,
            Some(&doctor),
            Some(json!({ "decision": "confirmed" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "confirmed");

        let upcoming = get_json(&core, "/api/appointments/upcoming", &doctor).await;
        assert_eq!(upcoming.as_array().unwrap().len(), 1);

        let response = send(
            &core,
            "POST",
            &decision_uri,
            Some(&doctor),
            Some(json!({ "decision": "rejected" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn slot_outside_template_is_bad_request() {
        let (core, _tmp) = test_core();
        let (doctor, doctor_id) = register(&core, "Dana", "doctor").await;
        let (patient, _) = register(&core, "Ana", "patient").await;
        send(
            &core,
            "PUT",
            "/api/availability",
            Some(&doctor),
            Some(json!({ "days": { "Monday": ["10:00"] } })),
        )
        .await;

        let response = send(
            &core,
            "POST",
            "/api/appointments",
            Some(&patient),
            Some(json!({ "doctor_id": doctor_id, "slot_instant": "2026-10-19T11:00:00" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dose_flow_raises_low_stock_and_offer() {
        let (core, _tmp) = test_core();
        let (doctor, _) = register(&core, "Dana", "doctor").await;
        let (patient, patient_id) = register(&core, "Ana", "patient").await;
        let (pharmacy, _) = register(&core, "Corner", "pharmacy").await;

        let mut subscription = core.events.subscribe(Topic::Role(crate::models::Role::Pharmacy));

        let response = send(
            &core,
            "POST",
            "/api/prescriptions",
            Some(&doctor),
            Some(json!({
                "patient_id": patient_id,
                "medicines": [{
                    "name": "Amoxicillin",
                    "total_days": 5,
                    "dose": { "morning": true }
                }]
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let rx_id = body_json(response).await["id"].as_str().unwrap().to_string();

        let purchase_uri = format!("/api/prescriptions/{rx_id}/medicines/0/purchase");
        let purchase = json!({ "count": 6 });
        let response = send(&core, "POST", &purchase_uri, Some(&patient), Some(purchase)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["remaining_count"], 6);

        let today = get_json(&core, "/api/prescriptions/today", &patient).await;
        assert_eq!(today["morning"][0]["medicine_name"], "Amoxicillin");
        assert_eq!(today["morning"][0]["taken"], false);

        let dose_uri = format!("/api/prescriptions/{rx_id}/medicines/0/doses");
        let response = send(
            &core,
            "POST",
            &dose_uri,
            Some(&patient),
            Some(json!({ "dose_time": "morning" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["remaining_count"], 5);
        assert_eq!(outcome["notifications"].as_array().unwrap().len(), 2);

        let response = send(
            &core,
            "POST",
            &dose_uri,
            Some(&patient),
            Some(json!({ "dose_time": "morning" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        match subscription.next().await {
            Some(Event::NotificationCreated { notification }) => {
                assert_eq!(notification.medicine_name.as_deref(), Some("Amoxicillin"));
            }
            other => panic!("Expected pharmacy notification, got {other:?}"),
        }

        let alerts = get_json(&core, "/api/pharmacy/alerts", &pharmacy).await;
        let alert_id = alerts[0]["id"].as_str().unwrap().to_string();

        let offer_uri = format!("/api/pharmacy/alerts/{alert_id}/offer");
        let response = send(
            &core,
            "POST",
            &offer_uri,
            Some(&pharmacy),
            Some(json!({ "message": "10% off refills" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let inbox = get_json(&core, "/api/notifications", &patient).await;
        let offers: Vec<&Value> = inbox
            .as_array()
            .unwrap()
            .iter()
            .filter(|n| n["kind"] == "pharmacy_offer")
            .collect();
        assert_eq!(offers.len(), 1);
        assert_eq!(
            offers[0]["message"],
            "Offer from Corner for Amoxicillin: 10% off refills"
        );

        let adherence = send(&core, "GET", "/api/adherence", Some(&patient), None).await;
        assert_eq!(adherence.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn community_votes_toggle() {
        let (core, _tmp) = test_core();
        let (ana, _) = register(&core, "Ana", "patient").await;
        let (ben, _) = register(&core, "Ben", "patient").await;

        let response = send(
            &core,
            "POST",
            "/api/community/posts",
            Some(&ana),
            Some(json!({ "content": "Walking helps my back pain", "category": "Wellness" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let post = body_json(response).await;
        let post_id = post["id"].as_str().unwrap();
        assert_eq!(post["category"], "wellness");

        let vote_uri = format!("/api/community/posts/{post_id}/vote");
        let up = json!({ "direction": "up" });
        let response = send(&core, "POST", &vote_uri, Some(&ana), Some(up.clone())).await;
        let tally = body_json(response).await;
        assert_eq!(tally["upvotes"], 1);
        let response = send(&core, "POST", &vote_uri, Some(&ben), Some(up.clone())).await;
        let tally = body_json(response).await;
        assert_eq!(tally["score"], 2);
        let tally = body_json(send(&core, "POST", &vote_uri, Some(&ana), Some(up)).await).await;
        assert_eq!(tally["upvotes"], 1);
        let tally = body_json(
            send(&core, "POST", &vote_uri, Some(&ana), Some(json!({ "direction": "down" }))).await,
        )
        .await;
        assert_eq!(tally["score"], 0);

        let comments_uri = format!("/api/community/posts/{post_id}/comments");
        let response = send(
            &core,
            "POST",
            &comments_uri,
            Some(&ben),
            Some(json!({ "content": "Same here" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let filtered = body_json(
            send(&core, "GET", "/api/community/posts?category=nutrition", Some(&ana), None).await,
        )
        .await;
        assert!(filtered.as_array().unwrap().is_empty());

        let fetched = get_json(&core, &format!("/api/community/posts/{post_id}"), &ana).await;
        assert_eq!(fetched["comment_count"], 1);

        let response = send(
            &core,
            "POST",
            &format!("/api/community/widgets/{post_id}/vote"),
            Some(&ana),
            Some(json!({ "direction": "up" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn news_is_public_and_filtered() {
        let (core, _tmp) = test_core();
        let response = send(&core, "GET", "/api/news?filter=medical", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        let titles: Vec<&str> = page["articles"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap())
            .collect();
        assert!(titles.contains(&"Hospital opens new wing"));
        assert!(!titles.contains(&"Football scores"));
    }

    #[tokio::test]
    async fn news_upstream_failure_is_502() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig::with_data_dir(tmp.path().to_path_buf());
        let core = Arc::new(CoreState::new(
            config,
            Arc::new(MockNewsSource::failing()),
            Arc::new(MockSymptomModel::new("ok")),
        ));
        let response = send(&core, "GET", "/api/news", None, None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "UPSTREAM_FAILED");
    }

    #[tokio::test]
    async fn chat_saves_exchange_and_lists_conversation() {
        let (core, _tmp) = test_core();
        let (patient, _) = register(&core, "Ana", "patient").await;

        let response = send(
            &core,
            "POST",
            "/api/chat",
            Some(&patient),
            Some(json!({ "message": "I have a headache" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let reply = body_json(response).await;
        assert_eq!(reply["answered"], true);
        assert_eq!(reply["text"], "Rest and drink fluids.");
        let conversation_id = reply["conversation_id"].as_str().unwrap();

        let history = get_json(&core, "/api/chat/conversations", &patient).await;
        assert_eq!(history.as_array().unwrap().len(), 1);

        let uri = format!("/api/chat/conversations/{conversation_id}");
        let exchanges = get_json(&core, &uri, &patient).await;
        assert_eq!(exchanges[0]["user_message"], "I have a headache");

        let response = send(
            &core,
            "POST",
            "/api/chat",
            Some(&patient),
            Some(json!({ "message": "   " })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_failure_apologises_without_saving() {
        let (core, _tmp) = test_core_with(MockSymptomModel::failing());
        let (patient, _) = register(&core, "Ana", "patient").await;

        let reply = body_json(
            send(
                &core,
                "POST",
                "/api/chat",
                Some(&patient),
                Some(json!({ "message": "Fever" })),
            )
            .await,
        )
        .await;
        assert_eq!(reply["answered"], false);
        assert_eq!(reply["text"], APOLOGY);

        let history = get_json(&core, "/api/chat/conversations", &patient).await;
        assert!(history.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn not_found_for_unknown_route() {
        let (core, _tmp) = test_core();
        let response = send(&core, "GET", "/api/nonexistent", None, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let (core, _tmp) = test_core();
        let (patient, _) = register(&core, "Ana", "patient").await;
        let uri = "/api/doctors/not-a-uuid/slots";
        let response = send(&core, "GET", uri, Some(&patient), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
