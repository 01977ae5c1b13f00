//! Router tests for apartment, bill and user management, profiles and history.

mod common;

use axum::http::{Method, StatusCode};
use common::{json_request_with_auth, parse_response_body, payment_request, request_with_auth, TestApp};
use domain::models::{BillType, PaymentStatus, User, UserType};
use serde_json::{json, Value};
use tower::ServiceExt;

struct Household {
    manager: User,
    manager_token: String,
    resident: User,
    resident_token: String,
    apartment_id: i64,
}

fn household(app: &TestApp) -> Household {
    let (manager, manager_token) = app.user("manager_mia", UserType::Manager, None);
    let (resident, resident_token) = app.user("resident_ray", UserType::Resident, Some("ray_tg"));
    let apartment = app.repos.add_apartment(manager.id);
    app.repos.add_member(resident.id, apartment.id);
    Household {
        manager,
        manager_token,
        resident,
        resident_token,
        apartment_id: apartment.id,
    }
}

async fn send(app: &TestApp, request: axum::http::Request<axum::body::Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

#[tokio::test]
async fn test_apartment_get_update_delete() {
    let app = TestApp::new();
    let home = household(&app);
    let uri = format!("/api/v1/manager/apartment?id={}", home.apartment_id);

    let (status, body) = send(&app, request_with_auth(Method::GET, &uri, &home.manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apartment_name"], "Test Apartment");

    let update = json!({ "apartment_name": "Oak Rows", "address": "9 Oak Ave", "units_count": 12 });
    let (status, body) = send(
        &app,
        json_request_with_auth(Method::PUT, &uri, update, &home.manager_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apartment_name"], "Oak Rows");
    assert_eq!(body["units_count"], 12);

    let invalid = json!({ "apartment_name": "", "address": "9 Oak Ave", "units_count": 12 });
    let (status, _) = send(
        &app,
        json_request_with_auth(Method::PUT, &uri, invalid, &home.manager_token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Residents are turned away by the manager extractor.
    let (status, _) = send(&app, request_with_auth(Method::DELETE, &uri, &home.resident_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, request_with_auth(Method::DELETE, &uri, &home.manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], home.apartment_id);
    assert!(app.repos.apartment(home.apartment_id).is_none());
    assert!(app.repos.membership(home.resident.id, home.apartment_id).is_none());
}

#[tokio::test]
async fn test_other_manager_cannot_touch_apartment() {
    let app = TestApp::new();
    let home = household(&app);
    let (_other, other_token) = app.user("manager_oleg", UserType::Manager, None);
    let uri = format!("/api/v1/manager/apartment?id={}", home.apartment_id);

    let (status, _) = send(&app, request_with_auth(Method::GET, &uri, &other_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, request_with_auth(Method::DELETE, &uri, &other_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.repos.apartment(home.apartment_id).is_some());
}

#[tokio::test]
async fn test_manager_lists_apartments_of_resident() {
    let app = TestApp::new();
    let home = household(&app);

    let uri = format!("/api/v1/manager/apartments/get-all/resident/{}", home.resident.id);
    let (status, body) = send(&app, request_with_auth(Method::GET, &uri, &home.manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apartments"][0]["id"], home.apartment_id);
}

#[tokio::test]
async fn test_bill_crud_and_listing() {
    let app = TestApp::new();
    let home = household(&app);
    let bill = app.repos.add_bill(home.apartment_id, BillType::Water, 3_000);
    let uri = format!("/api/v1/manager/bill?id={}", bill.id);

    let (status, body) = send(&app, request_with_auth(Method::GET, &uri, &home.manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_amount"], 30.0);

    let update = json!({ "bill_type": "gas", "total_amount": 42.5, "due_date": "2030-02-28" });
    let (status, body) = send(
        &app,
        json_request_with_auth(Method::PUT, &uri, update.clone(), &home.manager_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bill_type"], "gas");
    assert_eq!(body["total_amount"], 42.5);

    let list = format!("/api/v1/manager/bills/get-all?apartment_id={}", home.apartment_id);
    let (status, body) = send(&app, request_with_auth(Method::GET, &list, &home.manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bills"].as_array().unwrap().len(), 1);

    // Once divided, the bill is frozen.
    app.repos.add_payment(bill.id, home.resident.id, 4_250);
    let (status, _) = send(
        &app,
        json_request_with_auth(Method::PUT, &uri, update, &home.manager_token),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, request_with_auth(Method::DELETE, &uri, &home.manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.repos.bill(bill.id).is_none());

    let (status, _) = send(&app, request_with_auth(Method::GET, &uri, &home.manager_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bill_with_paid_share_cannot_be_deleted() {
    let app = TestApp::new();
    let home = household(&app);
    let bill = app.repos.add_bill(home.apartment_id, BillType::Electricity, 2_000);
    let payment = app.repos.add_payment(bill.id, home.resident.id, 2_000);

    let pay = format!("/api/v1/resident/bills/pay/{}", payment.id);
    let (status, _) = send(&app, payment_request(&pay, json!({}), &home.resident_token, "k-1")).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/v1/manager/bill?id={}", bill.id);
    let (status, _) = send(&app, request_with_auth(Method::DELETE, &uri, &home.manager_token)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(app.repos.bill(bill.id).is_some());
}

#[tokio::test]
async fn test_pay_single_payment() {
    let app = TestApp::new();
    let home = household(&app);
    let bill = app.repos.add_bill(home.apartment_id, BillType::Water, 1_000);
    let own = app.repos.add_payment(bill.id, home.resident.id, 500);
    let foreign = app.repos.add_payment(bill.id, home.manager.id, 500);

    let uri = format!("/api/v1/resident/bills/pay/{}", own.id);
    let (status, body) = send(&app, payment_request(&uri, json!({}), &home.resident_token, "single")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "payment successful");
    assert_eq!(app.repos.payment(own.id).unwrap().status, PaymentStatus::Paid);

    let (_, body) = send(&app, payment_request(&uri, json!({}), &home.resident_token, "single")).await;
    assert_eq!(body["status"], "already processed");

    let uri = format!("/api/v1/resident/bills/pay/{}", foreign.id);
    let (status, _) = send(&app, payment_request(&uri, json!({}), &home.resident_token, "single")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.repos.payment(foreign.id).unwrap().status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_payment_history_lists_own_payments() {
    let app = TestApp::new();
    let home = household(&app);
    let water = app.repos.add_bill(home.apartment_id, BillType::Water, 2_000);
    let gas = app.repos.add_bill(home.apartment_id, BillType::Gas, 4_000);
    app.repos.add_payment(water.id, home.resident.id, 1_000);
    app.repos.add_payment(gas.id, home.resident.id, 2_000);
    app.repos.add_payment(gas.id, home.manager.id, 2_000);

    let (status, body) = send(
        &app,
        request_with_auth(
            Method::GET,
            "/api/v1/resident/bills/payment-history",
            &home.resident_token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let payments = body["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0]["bill"]["bill_type"], "gas");
    assert_eq!(payments[0]["payment"]["amount"], 20.0);
    assert_eq!(payments[0]["apartment_name"], "Test Apartment");
}

#[tokio::test]
async fn test_profile_read_and_update() {
    let app = TestApp::new();
    let home = household(&app);
    app.repos.set_chat_id(home.resident.id, 4242);

    let (status, body) = send(
        &app,
        request_with_auth(Method::GET, "/api/v1/resident/profile", &home.resident_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "resident_ray");
    assert_eq!(body["telegram_connected"], true);

    let (status, body) = send(
        &app,
        json_request_with_auth(
            Method::PUT,
            "/api/v1/resident/profile",
            json!({ "full_name": "Ray Park", "telegram_user": "@ray_new_tg" }),
            &home.resident_token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Ray Park");
    assert_eq!(body["telegram_user"], "ray_new_tg");
    assert_eq!(body["telegram_connected"], false);

    let (status, _) = send(
        &app,
        json_request_with_auth(
            Method::PUT,
            "/api/v1/resident/profile",
            json!({ "username": "manager_mia" }),
            &home.resident_token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_manager_user_admin() {
    let app = TestApp::new();
    let home = household(&app);

    let (status, body) = send(
        &app,
        request_with_auth(Method::GET, "/api/v1/manager/user/get-all", &home.manager_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
    assert!(body["users"][0].get("email").is_none());

    let uri = format!("/api/v1/manager/user/{}", home.resident.id);
    let (status, body) = send(&app, request_with_auth(Method::GET, &uri, &home.manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "resident_ray");

    let (status, _) = send(&app, request_with_auth(Method::GET, &uri, &home.resident_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, request_with_auth(Method::DELETE, &uri, &home.manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.repos.user(home.resident.id).is_none());

    let (status, _) = send(&app, request_with_auth(Method::GET, &uri, &home.manager_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A manager of an apartment cannot be deleted while it exists.
    let own = format!("/api/v1/manager/user/{}", home.manager.id);
    let (status, _) = send(&app, request_with_auth(Method::DELETE, &own, &home.manager_token)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
