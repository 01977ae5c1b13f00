//! Router tests for apartments and the invitation flow.

mod common;

use axum::http::{Method, StatusCode};
use common::{json_request_with_auth, parse_response_body, request_with_auth, TestApp};
use domain::models::UserType;
use domain::services::testing::{MockNotifier, SentNotification};
use serde_json::json;
use tower::ServiceExt;

fn invite_uri(apartment_id: i64, handle: &str) -> String {
    format!("/api/v1/manager/apartment/{apartment_id}/invite/resident/{handle}")
}

fn consume_uri(code: &str) -> String {
    format!("/api/v1/resident/apartment/invite/{code}")
}

#[tokio::test]
async fn test_create_apartment_and_list_residents() {
    let app = TestApp::new();
    let (_manager, token) = app.user("manager_anna", UserType::Manager, None);

    let request = json_request_with_auth(
        Method::POST,
        "/api/v1/manager/apartment",
        json!({ "apartment_name": "Maple Court", "address": "12 Maple St", "units_count": 24 }),
        &token,
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["apartment_name"], "Maple Court");
    let apartment_id = body["id"].as_i64().unwrap();

    let uri = format!("/api/v1/manager/apartment/{apartment_id}/residents");
    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(Method::GET, &uri, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["residents"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_resident_token_rejected_on_manager_routes() {
    let app = TestApp::new();
    let (_resident, token) = app.user("resident_rita", UserType::Resident, None);

    let request = json_request_with_auth(
        Method::POST,
        "/api/v1/manager/apartment",
        json!({ "apartment_name": "Nope", "address": "1 Nope St", "units_count": 1 }),
        &token,
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invite_then_consume_once() {
    let app = TestApp::new();
    let (manager, manager_token) = app.user("manager_anna", UserType::Manager, None);
    let (resident, resident_token) = app.user("resident_rita", UserType::Resident, Some("rita_tg"));
    let apartment = app.repos.add_apartment(manager.id);

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(
            Method::POST,
            &invite_uri(apartment.id, "@rita_tg"),
            &manager_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    let code = body["code"].as_str().unwrap().to_string();
    assert!(code.len() >= 8);
    assert!(body["invite_url"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/resident/apartment/invite/{code}")));
    assert!(app
        .notifier
        .sent()
        .iter()
        .any(|n| matches!(n, SentNotification::Invitation { handle, .. } if handle == "rita_tg")));

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(Method::GET, &consume_uri(&code), &resident_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["apartment_id"], apartment.id);
    assert!(app.repos.membership(resident.id, apartment.id).is_some());

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(Method::GET, &consume_uri(&code), &resident_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = parse_response_body(response).await;
    assert_eq!(body["message"], "Invitation not found or already used");
}

#[tokio::test]
async fn test_garbage_code_is_bad_request() {
    let app = TestApp::new();
    let (_resident, token) = app.user("resident_rita", UserType::Resident, None);

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(Method::GET, &consume_uri("!!not-a-code!!"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invite_unknown_handle_is_not_found() {
    let app = TestApp::new();
    let (manager, token) = app.user("manager_anna", UserType::Manager, None);
    let apartment = app.repos.add_apartment(manager.id);

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(
            Method::POST,
            &invite_uri(apartment.id, "nobody_here"),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invite_by_other_manager_is_forbidden() {
    let app = TestApp::new();
    let (owner, _) = app.user("manager_anna", UserType::Manager, None);
    let (_other, other_token) = app.user("manager_otto", UserType::Manager, None);
    app.user("resident_rita", UserType::Resident, Some("rita_tg"));
    let apartment = app.repos.add_apartment(owner.id);

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(
            Method::POST,
            &invite_uri(apartment.id, "rita_tg"),
            &other_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_failed_notification_still_returns_link() {
    let app = TestApp::with_notifier(MockNotifier::failing());
    let (manager, manager_token) = app.user("manager_anna", UserType::Manager, None);
    let (_resident, resident_token) = app.user("resident_rita", UserType::Resident, Some("rita_tg"));
    let apartment = app.repos.add_apartment(manager.id);

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(
            Method::POST,
            &invite_uri(apartment.id, "rita_tg"),
            &manager_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = parse_response_body(response).await;
    assert!(body["warning"].as_str().is_some());

    // The link in the warning body is still redeemable.
    let invite_url = body["invite_url"].as_str().unwrap();
    let path = &invite_url[invite_url.find("/api/v1").unwrap()..];
    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(Method::GET, path, &resident_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invitee_only_policy_rejects_other_holder() {
    let app = TestApp::with_overrides(&[("invitations.invitee_policy", "invitee_only")]);
    let (manager, manager_token) = app.user("manager_anna", UserType::Manager, None);
    app.user("resident_rita", UserType::Resident, Some("rita_tg"));
    let (_stranger, stranger_token) = app.user("resident_sam", UserType::Resident, None);
    let apartment = app.repos.add_apartment(manager.id);

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(
            Method::POST,
            &invite_uri(apartment.id, "rita_tg"),
            &manager_token,
        ))
        .await
        .unwrap();
    let code = parse_response_body(response).await["code"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(Method::GET, &consume_uri(&code), &stranger_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_resident_lists_and_leaves_apartment() {
    let app = TestApp::new();
    let (manager, _) = app.user("manager_anna", UserType::Manager, None);
    let (resident, token) = app.user("resident_rita", UserType::Resident, None);
    let apartment = app.repos.add_apartment(manager.id);
    app.repos.add_member(resident.id, apartment.id);

    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(Method::GET, "/api/v1/resident/apartments", &token))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["apartments"][0]["id"], apartment.id);

    let uri = format!("/api/v1/resident/apartment/{}", apartment.id);
    let response = app
        .router
        .clone()
        .oneshot(request_with_auth(Method::DELETE, &uri, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.repos.membership(resident.id, apartment.id).is_none());
}
