mod common;

use axum::http::StatusCode;
use chrono::{NaiveDate, NaiveTime, Utc};
use common::{parse_body, reservation_payload, TestApp};
use serde_json::json;
use std::sync::atomic::Ordering;
use uuid::Uuid;

const DATE: &str = "2024-12-20";

#[tokio::test]
async fn test_create_reservation_pending_payment() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;

    let res = app.request(
        "POST",
        &format!("/api/v1/venues/{}/reservations", venue_id),
        Some(reservation_payload(&court_id, DATE, "10:00", "11:00", "alice@example.com")),
    ).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;

    assert_eq!(body["duplicate"], false);
    assert_eq!(body["booking"]["status"], "PENDING_PAYMENT");
    assert_eq!(body["booking"]["payment_status"], "PENDING");
    assert_eq!(body["booking"]["total_price"], 300000);
    assert_eq!(body["slots"].as_array().unwrap().len(), 1);
    assert_eq!(body["slots"][0]["status"], "RESERVED");
    assert!(body["checkout_url"].as_str().unwrap().starts_with("https://pay.test/"));
    assert_eq!(app.gateway.sessions_created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_overlapping_reservation_conflicts() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;
    let uri = format!("/api/v1/venues/{}/reservations", venue_id);

    let res = app.request("POST", &uri,
        Some(reservation_payload(&court_id, DATE, "10:00", "11:00", "first@example.com"))).await;
    assert_eq!(res.status(), StatusCode::OK);

    // Different contact so the duplicate heuristic stays out of the way.
    let res = app.request("POST", &uri,
        Some(reservation_payload(&court_id, DATE, "10:30", "11:30", "second@example.com"))).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = parse_body(res).await;
    assert!(body["error"].as_str().unwrap().contains("10:00-11:00"));
}

#[tokio::test]
async fn test_touching_windows_both_succeed() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;
    let uri = format!("/api/v1/venues/{}/reservations", venue_id);

    let res = app.request("POST", &uri,
        Some(reservation_payload(&court_id, DATE, "09:00", "10:00", "a@example.com"))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.request("POST", &uri,
        Some(reservation_payload(&court_id, DATE, "10:00", "11:00", "b@example.com"))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.request("GET", &format!("/api/v1/courts/{}/slots?date={}", court_id, DATE), None).await;
    let body = parse_body(res).await;
    assert_eq!(body["slots"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_multi_window_reservation_creates_all_slots() {
    let app = TestApp::new().await;
    let (venue_id, court_a) = app.seed_venue_and_court().await;
    let court_b = app.add_court(&venue_id, "Court 2").await;

    let res = app.request("POST", &format!("/api/v1/venues/{}/reservations", venue_id), Some(json!({
        "date": DATE,
        "windows": [
            { "court_id": court_a, "start": "10:00", "end": "11:00" },
            { "court_id": court_b, "start": "10:00", "end": "11:00" }
        ],
        "name": "Alice Nguyen",
        "email": "alice@example.com",
        "total_price": 600000,
        "currency": "VND"
    }))).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["slots"].as_array().unwrap().len(), 2);

    let booking_id = body["booking"]["id"].as_str().unwrap();
    let detail = parse_body(app.request("GET", &format!("/api/v1/bookings/{}", booking_id), None).await).await;
    assert_eq!(detail["slots"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_internally_overlapping_request_rejected() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;

    let res = app.request("POST", &format!("/api/v1/venues/{}/reservations", venue_id), Some(json!({
        "date": DATE,
        "windows": [
            { "court_id": court_id, "start": "10:00", "end": "11:00" },
            { "court_id": court_id, "start": "10:30", "end": "11:30" }
        ],
        "name": "Alice Nguyen",
        "email": "alice@example.com",
        "total_price": 600000
    }))).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validation_rejects_bad_input() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;
    let uri = format!("/api/v1/venues/{}/reservations", venue_id);

    // Inverted window
    let res = app.request("POST", &uri,
        Some(reservation_payload(&court_id, DATE, "11:00", "10:00", "a@example.com"))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unparseable time
    let res = app.request("POST", &uri,
        Some(reservation_payload(&court_id, DATE, "25:99", "11:00", "a@example.com"))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unparseable date
    let res = app.request("POST", &uri,
        Some(reservation_payload(&court_id, "20-12-2024", "10:00", "11:00", "a@example.com"))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Zero price
    let mut payload = reservation_payload(&court_id, DATE, "10:00", "11:00", "a@example.com");
    payload["total_price"] = json!(0);
    let res = app.request("POST", &uri, Some(payload)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // No windows
    let res = app.request("POST", &uri, Some(json!({
        "date": DATE, "windows": [], "name": "A", "email": "a@a.com", "total_price": 1000
    }))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_court_and_venue_rejected() {
    let app = TestApp::new().await;
    let (venue_id, _court_id) = app.seed_venue_and_court().await;

    let res = app.request("POST", &format!("/api/v1/venues/{}/reservations", venue_id),
        Some(reservation_payload("missing-court", DATE, "10:00", "11:00", "a@example.com"))).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.request("POST", "/api/v1/venues/missing-venue/reservations",
        Some(reservation_payload("whatever", DATE, "10:00", "11:00", "a@example.com"))).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_court_from_other_venue_rejected() {
    let app = TestApp::new().await;
    let (venue_a, _court_a) = app.seed_venue_and_court().await;

    let other = app.post_json("/api/v1/venues", json!({
        "name": "Other Venue", "owner_name": "Owner"
    })).await;
    let venue_b = other["id"].as_str().unwrap();
    let court_b = app.add_court(venue_b, "Court B1").await;

    let res = app.request("POST", &format!("/api/v1/venues/{}/reservations", venue_a),
        Some(reservation_payload(&court_b, DATE, "10:00", "11:00", "a@example.com"))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_maintenance_slot_blocks_reservation() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;

    // Maintenance windows are seeded operationally; they belong to no
    // booking but still occupy their window.
    sqlx::query(
        "INSERT INTO slots (id, court_id, date, start_time, end_time, status, booking_id, created_at) \
         VALUES (?, ?, ?, ?, ?, 'MAINTENANCE', NULL, ?)"
    )
        .bind(Uuid::new_v4().to_string())
        .bind(&court_id)
        .bind(NaiveDate::from_ymd_opt(2024, 12, 20).unwrap())
        .bind(NaiveTime::from_hms_opt(9, 0, 0).unwrap())
        .bind(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
        .bind(Utc::now())
        .execute(&app.pool)
        .await
        .unwrap();

    let res = app.request("POST", &format!("/api/v1/venues/{}/reservations", venue_id),
        Some(reservation_payload(&court_id, DATE, "10:00", "11:00", "alice@example.com"))).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Outside the maintenance window the court books normally.
    let res = app.request("POST", &format!("/api/v1/venues/{}/reservations", venue_id),
        Some(reservation_payload(&court_id, DATE, "13:00", "14:00", "alice@example.com"))).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_double_submit_returns_existing_booking() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;
    let uri = format!("/api/v1/venues/{}/reservations", venue_id);
    let payload = reservation_payload(&court_id, DATE, "10:00", "11:00", "alice@example.com");

    let first = parse_body(app.request("POST", &uri, Some(payload.clone())).await).await;
    assert_eq!(first["duplicate"], false);

    let second_res = app.request("POST", &uri, Some(payload)).await;
    assert_eq!(second_res.status(), StatusCode::OK);
    let second = parse_body(second_res).await;

    assert_eq!(second["duplicate"], true);
    assert_eq!(second["booking"]["id"], first["booking"]["id"]);
    assert_eq!(second["checkout_url"], first["checkout_url"]);
    // The existing checkout session is reused, not recreated.
    assert_eq!(app.gateway.sessions_created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_duplicate_detection_tolerates_price_rounding() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;
    let uri = format!("/api/v1/venues/{}/reservations", venue_id);

    let first = parse_body(app.request("POST", &uri,
        Some(reservation_payload(&court_id, DATE, "10:00", "11:00", "alice@example.com"))).await).await;

    // Within 1% of 300000; same contact, same date.
    let mut payload = reservation_payload(&court_id, DATE, "10:00", "11:00", "alice@example.com");
    payload["total_price"] = json!(301500);
    let second = parse_body(app.request("POST", &uri, Some(payload)).await).await;

    assert_eq!(second["duplicate"], true);
    assert_eq!(second["booking"]["id"], first["booking"]["id"]);
}

#[tokio::test]
async fn test_distinct_customer_same_slot_is_conflict_not_duplicate() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;
    let uri = format!("/api/v1/venues/{}/reservations", venue_id);

    let res = app.request("POST", &uri,
        Some(reservation_payload(&court_id, DATE, "10:00", "11:00", "alice@example.com"))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let mut payload = reservation_payload(&court_id, DATE, "10:00", "11:00", "bob@example.com");
    payload["phone"] = json!("+84 999 888 777");
    let res = app.request("POST", &uri, Some(payload)).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_gateway_outage_keeps_reservation_and_recovers_on_resubmit() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;
    let uri = format!("/api/v1/venues/{}/reservations", venue_id);
    let payload = reservation_payload(&court_id, DATE, "10:00", "11:00", "alice@example.com");

    // The slot is held even though no checkout session could be opened.
    app.gateway.fail_checkout.store(true, Ordering::SeqCst);
    let first_res = app.request("POST", &uri, Some(payload.clone())).await;
    assert_eq!(first_res.status(), StatusCode::OK);
    let first = parse_body(first_res).await;
    assert!(first["checkout_url"].is_null());
    assert_eq!(first["booking"]["status"], "PENDING_PAYMENT");

    // Gateway recovers; the resubmit reuses the held booking and opens a
    // session for it instead of double-booking.
    app.gateway.fail_checkout.store(false, Ordering::SeqCst);
    let second = parse_body(app.request("POST", &uri, Some(payload)).await).await;
    assert_eq!(second["duplicate"], true);
    assert_eq!(second["booking"]["id"], first["booking"]["id"]);
    assert!(second["checkout_url"].as_str().unwrap().starts_with("https://pay.test/"));
    assert_eq!(app.gateway.sessions_created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_customer_cancel_releases_slots() {
    let app = TestApp::new().await;
    let (venue_id, court_id) = app.seed_venue_and_court().await;

    let body = parse_body(app.request("POST", &format!("/api/v1/venues/{}/reservations", venue_id),
        Some(reservation_payload(&court_id, DATE, "10:00", "11:00", "alice@example.com"))).await).await;
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    let res = app.request("POST", &format!("/api/v1/bookings/{}/cancel", booking_id), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cancelled = parse_body(res).await;
    assert_eq!(cancelled["status"], "CANCELLED");

    let slots = parse_body(app.request("GET", &format!("/api/v1/courts/{}/slots?date={}", court_id, DATE), None).await).await;
    assert_eq!(slots["slots"].as_array().unwrap().len(), 0);

    // Second cancel has nothing left to release.
    let res = app.request("POST", &format!("/api/v1/bookings/{}/cancel", booking_id), None).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // The window is bookable again.
    let res = app.request("POST", &format!("/api/v1/venues/{}/reservations", venue_id),
        Some(reservation_payload(&court_id, DATE, "10:00", "11:00", "bob@example.com"))).await;
    assert_eq!(res.status(), StatusCode::OK);
}
