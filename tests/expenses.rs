mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use common::{create_category, create_expense, register, send, test_app};

#[tokio::test]
async fn expenses_come_back_with_their_category() {
    let app = test_app();
    let token = register(&app, "ana@example.com").await;
    let food = create_category(&app, &token, "Food").await;

    let expense = create_expense(&app, &token, &food, "  Lunch ", 12.5, "2024-03-02").await;
    assert_eq!(expense["title"], "Lunch");
    assert_eq!(expense["payment_method"], "cash");
    assert_eq!(expense["category"]["name"], "Food");
    assert_eq!(expense["category"]["color"], "#3182CE");

    let uri = format!("/api/expenses/{}", expense["id"].as_str().unwrap());
    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expense"]["amount"].as_f64(), Some(12.5));
}

#[tokio::test]
async fn category_must_belong_to_the_caller() {
    let app = test_app();
    let owner = register(&app, "ben@example.com").await;
    let other = register(&app, "cy@example.com").await;
    let theirs = create_category(&app, &other, "Theirs").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/expenses",
        Some(&owner),
        Some(json!({
            "title": "Snack",
            "amount": 2.0,
            "category_id": theirs,
            "date": "2024-03-01"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "category_id");
    assert_eq!(body["errors"][0]["message"], "Category not found");
}

#[tokio::test]
async fn invalid_expense_lists_all_problems() {
    let app = test_app();
    let token = register(&app, "dee@example.com").await;
    let misc = create_category(&app, &token, "Misc").await;
    let tomorrow = (Utc::now() + Duration::days(1)).to_rfc3339();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/expenses",
        Some(&token),
        Some(json!({
            "title": "",
            "amount": -5.0,
            "category_id": misc,
            "date": tomorrow
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn list_filters_by_search_category_and_dates() {
    let app = test_app();
    let token = register(&app, "eve@example.com").await;
    let food = create_category(&app, &token, "Food").await;
    let travel = create_category(&app, &token, "Travel").await;
    create_expense(&app, &token, &food, "Coffee beans", 9.0, "2024-03-01").await;
    create_expense(&app, &token, &food, "Iced COFFEE", 4.0, "2024-03-05T18:30:00Z").await;
    create_expense(&app, &token, &travel, "Train", 30.0, "2024-03-10").await;

    let (status, body) = send(&app, Method::GET, "/api/expenses", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["expenses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Train", "Iced COFFEE", "Coffee beans"]);
    assert_eq!(body["pagination"]["total_items"], 3);

    let (_, body) = send(&app, Method::GET, "/api/expenses?search=coffee", Some(&token), None).await;
    assert_eq!(body["expenses"].as_array().unwrap().len(), 2);

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/expenses?category={travel}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["expenses"][0]["title"], "Train");
    assert_eq!(body["expenses"].as_array().unwrap().len(), 1);

    // A bare end date covers the whole day.
    let (_, body) = send(
        &app,
        Method::GET,
        "/api/expenses?start_date=2024-03-02&end_date=2024-03-05",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["expenses"].as_array().unwrap().len(), 1);
    assert_eq!(body["expenses"][0]["title"], "Iced COFFEE");

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/expenses?start_date=yesterday",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_and_delete_check_ownership() {
    let app = test_app();
    let owner = register(&app, "fay@example.com").await;
    let other = register(&app, "gus@example.com").await;
    let food = create_category(&app, &owner, "Food").await;
    let expense = create_expense(&app, &owner, &food, "Bagel", 3.0, "2024-03-01").await;
    let uri = format!("/api/expenses/{}", expense["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&owner),
        Some(json!({
            "title": "Two bagels",
            "amount": 6.0,
            "category_id": food,
            "date": "2024-03-01",
            "payment_method": "card",
            "tags": ["Breakfast"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["expense"]["title"], "Two bagels");
    assert_eq!(body["expense"]["payment_method"], "card");
    assert_eq!(body["expense"]["tags"], json!(["breakfast"]));

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_category_leaves_expense_unjoined() {
    let app = test_app();
    let token = register(&app, "hal@example.com").await;
    let gone = create_category(&app, &token, "Gone").await;
    let expense = create_expense(&app, &token, &gone, "Orphan", 1.0, "2024-03-01").await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/categories/{gone}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/expenses/{}", expense["id"].as_str().unwrap());
    let (_, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert!(body["expense"]["category"].is_null());
    assert_eq!(body["expense"]["category_id"], gone.as_str());
}

#[tokio::test]
async fn stats_rank_categories_and_order_days() {
    let app = test_app();
    let token = register(&app, "ida@example.com").await;
    let food = create_category(&app, &token, "Food").await;
    let fun = create_category(&app, &token, "Fun").await;
    let recent = (Utc::now() - Duration::hours(1)).to_rfc3339();
    let earlier = (Utc::now() - Duration::days(2)).to_rfc3339();

    create_expense(&app, &token, &food, "Lunch", 10.0, &recent).await;
    create_expense(&app, &token, &fun, "Concert", 60.0, &earlier).await;
    create_expense(&app, &token, &food, "Dinner", 20.0, &earlier).await;
    // Outside the week window.
    create_expense(&app, &token, &fun, "Old", 500.0, "2020-01-01").await;

    let (status, body) = send(&app, Method::GET, "/api/expenses/stats?period=week", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let stats = &body["stats"];
    assert_eq!(stats["period"], "week");
    assert_eq!(stats["total_expenses"].as_f64(), Some(90.0));
    assert_eq!(stats["total_transactions"], 3);

    let breakdown = stats["category_breakdown"].as_array().unwrap();
    assert_eq!(breakdown[0]["name"], "Fun");
    assert_eq!(breakdown[0]["total"].as_f64(), Some(60.0));
    assert_eq!(breakdown[1]["name"], "Food");
    assert_eq!(breakdown[1]["count"], 2);

    let trend = stats["daily_trend"].as_array().unwrap();
    assert_eq!(trend.len(), 2);
    assert!(trend[0]["date"].as_str().unwrap() < trend[1]["date"].as_str().unwrap());
    assert_eq!(trend[0]["total"].as_f64(), Some(80.0));
}

#[tokio::test]
async fn unknown_stats_period_falls_back_to_month() {
    let app = test_app();
    let token = register(&app, "jon@example.com").await;

    let (status, body) =
        send(&app, Method::GET, "/api/expenses/stats?period=decade", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["period"], "month");
    assert_eq!(body["stats"]["total_transactions"], 0);
}

#[tokio::test]
async fn amounts_must_fit_two_decimals_and_the_column() {
    let app = test_app();
    let token = register(&app, "kai@example.com").await;
    let misc = create_category(&app, &token, "Misc").await;

    for (amount, message) in [
        (json!(10.555), "Amount cannot have more than 2 decimal places"),
        (json!(0.001), "Amount cannot have more than 2 decimal places"),
        (json!(1_000_000_000_000_u64), "Amount must be less than 1000000000000"),
        (json!(1e25), "Amount must be less than 1000000000000"),
    ] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/expenses",
            Some(&token),
            Some(json!({
                "title": "Too precise",
                "amount": amount,
                "category_id": misc,
                "date": "2024-03-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}: {body}");
        assert_eq!(body["errors"][0]["field"], "amount");
        assert_eq!(body["errors"][0]["message"], message);
    }

    let (_, body) = send(&app, Method::GET, "/api/expenses", Some(&token), None).await;
    assert_eq!(body["pagination"]["total_items"], 0);
}
