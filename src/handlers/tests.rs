use actix_web::{App, http::StatusCode, test, web};
use serde_json::{Value, json};

use crate::config::IdentityConfig;
use crate::middlewares::AuthMiddleware;
use crate::models::ExternalIdentity;
use crate::services::*;
use crate::test_utils::{admin_config, events_config, setup_db};
use crate::utils::IdentityVerifier;

const ADMIN_EMAIL: &str = "admin@school.de";

fn verifier() -> IdentityVerifier {
    IdentityVerifier::new(&IdentityConfig {
        jwt_secret: "handler-test-secret".to_string(),
        issuer: None,
        audience: None,
    })
}

fn token_for(email: &str) -> String {
    let identity = ExternalIdentity {
        external_id: format!("ext-{email}"),
        email: email.to_string(),
        first_name: Some(email.split('@').next().unwrap_or("user").to_string()),
        last_name: None,
        image_url: None,
    };
    verifier().sign(&identity, 3600).unwrap()
}

fn bearer(email: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token_for(email)))
}

macro_rules! test_app {
    ($db:expr) => {{
        let db = $db;
        let event_service = EventService::new(db.clone());
        test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(verifier()))
                .app_data(web::Data::new(IdentityService::new(
                    db.clone(),
                    admin_config(&[ADMIN_EMAIL]),
                )))
                .app_data(web::Data::new(ClassService::new(db.clone())))
                .app_data(web::Data::new(event_service.clone()))
                .app_data(web::Data::new(ParticipantService::new(
                    db.clone(),
                    event_service.clone(),
                    events_config(),
                )))
                .app_data(web::Data::new(AssignmentService::new(db.clone())))
                .app_data(web::Data::new(PresentService::new(db.clone())))
                .app_data(web::Data::new(StatisticsService::new(db.clone(), 30)))
                .configure(super::health_config)
                .service(
                    web::scope("/api")
                        .configure(super::users_config)
                        .configure(super::classes_config)
                        .configure(super::events_config)
                        .configure(super::participants_config)
                        .configure(super::assignments_config)
                        .configure(super::presents_config)
                        .configure(super::statistics_config),
                ),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_health_is_public() {
    let app = test_app!(setup_db().await);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_missing_or_invalid_token_is_unauthorized() {
    let app = test_app!(setup_db().await);

    let req = test::TestRequest::get().uri("/api/events").to_request();
    let err = test::try_call_service(&app, req).await.err().unwrap();
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/events")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let err = test::try_call_service(&app, req).await.err().unwrap();
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_non_admin_gets_forbidden_on_admin_routes() {
    let app = test_app!(setup_db().await);

    for (method, uri) in [
        ("POST", "/api/assignments"),
        ("GET", "/api/participants"),
        ("GET", "/api/statistics"),
        ("GET", "/api/users/list"),
    ] {
        let req = match method {
            "POST" => test::TestRequest::post(),
            _ => test::TestRequest::get(),
        }
        .uri(uri)
        .insert_header(bearer("kind@school.de"))
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "FORBIDDEN");
    }
}

#[actix_web::test]
async fn test_profile_sync_assigns_admin_role() {
    let app = test_app!(setup_db().await);

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(ADMIN_EMAIL))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["role"], "ADMIN");

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer("kind@school.de"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["role"], "USER");
}

#[actix_web::test]
async fn test_end_to_end_secret_santa_flow() {
    let app = test_app!(setup_db().await);
    let students = ["anna@school.de", "ben@school.de", "cem@school.de"];

    // 管理员创建活动
    let req = test::TestRequest::post()
        .uri("/api/events")
        .insert_header(bearer(ADMIN_EMAIL))
        .set_json(json!({
            "name": "Wichteln 2024",
            "registration_deadline": "2099-12-01T00:00:00Z",
            "assignment_date": "2099-12-02T00:00:00Z",
            "gift_deadline": "2099-12-15T00:00:00Z",
            "delivery_date": "2099-12-20T00:00:00Z"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let event_id = body["data"]["id"].as_str().unwrap().to_string();

    // 学生创建班级并报名
    let req = test::TestRequest::post()
        .uri("/api/classes")
        .insert_header(bearer(students[0]))
        .set_json(json!({ "name": "7b" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let class_id = body["data"]["id"].as_str().unwrap().to_string();

    for email in students {
        let req = test::TestRequest::post()
            .uri("/api/register")
            .insert_header(bearer(email))
            .set_json(json!({ "class_id": class_id, "interests": "Bücher" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // 生成分配
    let uri = format!("/api/assignments?event_id={event_id}");
    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(bearer(ADMIN_EMAIL))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["assignment_count"], 3);

    // 再次生成: 冲突，分配数量不变
    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(bearer(ADMIN_EMAIL))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "CONFLICT");

    let req = test::TestRequest::get()
        .uri("/api/assignments")
        .insert_header(bearer(ADMIN_EMAIL))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let all = body["data"].as_array().unwrap();
    assert_eq!(all.len(), 3);
    for a in all {
        assert_ne!(a["giver"]["participant_id"], a["receiver"]["participant_id"]);
    }

    // 学生查看自己的送礼对象
    let req = test::TestRequest::get()
        .uri("/api/assignments")
        .insert_header(bearer(students[1]))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["receiver"]["interests"], "Bücher");
    assert_eq!(body["data"]["present"]["status"], "NOT_SUBMITTED");

    let req = test::TestRequest::get()
        .uri("/api/presents")
        .insert_header(bearer(students[1]))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let giver_id = body["data"]["participant"]["id"].as_str().unwrap().to_string();

    // 未提交直接送达: 400
    let req = test::TestRequest::post()
        .uri("/api/presents")
        .insert_header(bearer(ADMIN_EMAIL))
        .set_json(json!({ "action": "mark_delivered", "participant_id": giver_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    for action in ["mark_submitted", "mark_delivered"] {
        let req = test::TestRequest::post()
            .uri("/api/presents")
            .insert_header(bearer(ADMIN_EMAIL))
            .set_json(json!({ "action": action, "participant_id": giver_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{action}");
    }

    let req = test::TestRequest::get()
        .uri("/api/presents")
        .insert_header(bearer(ADMIN_EMAIL))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["stats"]["total_participants"], 3);
    assert_eq!(body["data"]["stats"]["submitted_count"], 1);
    assert_eq!(body["data"]["stats"]["delivered_count"], 1);
    assert_eq!(body["data"]["stats"]["pending_count"], 2);

    // 已有报名的活动不能删除
    let req = test::TestRequest::delete()
        .uri(&format!("/api/events/{event_id}"))
        .insert_header(bearer(ADMIN_EMAIL))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/statistics?event_id={event_id}"))
        .insert_header(bearer(ADMIN_EMAIL))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["stats"]["total_participants"], 3);
    assert_eq!(body["data"]["stats"]["delivered_presents"], 1);
}
