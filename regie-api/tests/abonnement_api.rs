use rocket::http::{Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use regie_api::orm::testing::test_rocket;

async fn login(client: &Client, email: &str, password: &str) -> Header<'static> {
    let response = client
        .post("/api/1/login")
        .json(&json!({ "email": email, "password": password }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    Header::new(
        "Authorization",
        format!("Bearer {}", body["token"].as_str().unwrap()),
    )
}

async fn get(client: &Client, auth: &Header<'static>, uri: &str) -> (Status, Value) {
    let response = client.get(uri.to_string()).header(auth.clone()).dispatch().await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

async fn post(client: &Client, auth: &Header<'static>, uri: &str, body: Value) -> (Status, Value) {
    let response = client
        .post(uri.to_string())
        .header(auth.clone())
        .json(&body)
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

#[rocket::async_test]
async fn test_plans_are_ranked() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    let locataire = login(&client, "locataire@lac.ch", "password").await;

    let (status, body) = get(&client, &locataire, "/api/1/plans").await;
    assert_eq!(status, Status::Ok);
    let plans = body["data"].as_array().unwrap();
    assert!(plans.len() >= 2);
    let ranks: Vec<i64> = plans.iter().map(|p| p["rang"].as_i64().unwrap()).collect();
    let mut sorted = ranks.clone();
    sorted.sort();
    assert_eq!(ranks, sorted);
    assert!(plans.iter().any(|p| p["code"] == "essentiel"));
}

#[rocket::async_test]
async fn test_entreprise_subscribes_upgrades_and_cancels() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    let entreprise = login(&client, "entreprise@plomberie.ch", "password").await;

    let (status, body) = post(
        &client,
        &entreprise,
        "/api/1/abonnements",
        json!({ "plan_code": "essentiel" }),
    )
    .await;
    assert_eq!(status, Status::Created);
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["statut"], "actif");
    assert!(body["data"]["entreprise_id"].is_number());
    assert!(body["data"]["regie_id"].is_null());

    let (status, body) = post(
        &client,
        &entreprise,
        "/api/1/abonnements",
        json!({ "plan_code": "essentiel" }),
    )
    .await;
    assert_eq!(status, Status::Conflict);
    assert_eq!(body["error"], "Subscriber already has an active abonnement");

    let (status, body) = post(
        &client,
        &entreprise,
        &format!("/api/1/abonnements/{}/upgrade", id),
        json!({ "plan_code": "pro" }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["plan_code"], "pro");
    assert_eq!(body["data"]["id"], id);

    let (status, body) = post(
        &client,
        &entreprise,
        &format!("/api/1/abonnements/{}/upgrade", id),
        json!({ "plan_code": "essentiel" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Upgrade must move to a higher plan");

    let (status, body) = post(
        &client,
        &entreprise,
        &format!("/api/1/abonnements/{}/resilier", id),
        json!({}),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "resilie");
    assert!(body["data"]["date_fin"].is_string());

    let (status, _) = post(
        &client,
        &entreprise,
        &format!("/api/1/abonnements/{}/upgrade", id),
        json!({ "plan_code": "premium" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);

    // A cancelled subscription frees the slot
    let (status, _) = post(
        &client,
        &entreprise,
        "/api/1/abonnements",
        json!({ "plan_code": "premium" }),
    )
    .await;
    assert_eq!(status, Status::Created);
}

#[rocket::async_test]
async fn test_abonnement_ownership() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    let regie = login(&client, "regie@lac.ch", "password").await;
    let other_regie = login(&client, "regie@montagne.ch", "password").await;
    let locataire = login(&client, "locataire@lac.ch", "password").await;
    let admin = login(&client, "admin@regie.local", "admin").await;

    let (_, body) = get(&client, &regie, "/api/1/abonnements").await;
    let own = body["data"].as_array().unwrap();
    assert_eq!(own.len(), 1);
    let id = own[0]["id"].as_i64().unwrap();
    let regie_id = own[0]["regie_id"].as_i64().unwrap();

    let (_, body) = get(&client, &other_regie, "/api/1/abonnements").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = post(
        &client,
        &other_regie,
        &format!("/api/1/abonnements/{}/resilier", id),
        json!({}),
    )
    .await;
    assert_eq!(status, Status::NotFound);

    // Subscribing someone else
    let (status, _) = post(
        &client,
        &other_regie,
        "/api/1/abonnements",
        json!({ "plan_code": "pro", "regie_id": regie_id }),
    )
    .await;
    assert_eq!(status, Status::Forbidden);

    let (status, _) = get(&client, &locataire, "/api/1/abonnements").await;
    assert_eq!(status, Status::Forbidden);

    let (status, _) = post(
        &client,
        &regie,
        "/api/1/abonnements",
        json!({ "plan_code": "platine" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);

    // Administrators must name exactly one subscriber
    let (status, _) = post(&client, &admin, "/api/1/abonnements", json!({ "plan_code": "pro" })).await;
    assert_eq!(status, Status::BadRequest);

    let (_, body) = get(&client, &admin, "/api/1/abonnements").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = get(&client, &admin, "/api/1/admin/stats").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["abonnements_actifs_par_plan"]["essentiel"], 1);
}

#[rocket::async_test]
async fn test_admin_suspends_and_reactivates() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    let regie = login(&client, "regie@lac.ch", "password").await;
    let admin = login(&client, "admin@regie.local", "admin").await;

    let (_, body) = get(&client, &regie, "/api/1/abonnements").await;
    let id = body["data"][0]["id"].as_i64().unwrap();
    let suspendre = format!("/api/1/abonnements/{}/suspendre", id);
    let reactiver = format!("/api/1/abonnements/{}/reactiver", id);

    let (status, _) = post(&client, &regie, &suspendre, json!({})).await;
    assert_eq!(status, Status::Forbidden);

    let (status, body) = post(&client, &admin, &suspendre, json!({})).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "suspendu");

    let (status, body) = post(&client, &admin, &suspendre, json!({})).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["success"], false);

    let (status, _) = post(
        &client,
        &regie,
        &format!("/api/1/abonnements/{}/upgrade", id),
        json!({ "plan_code": "pro" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);

    let (status, body) = post(&client, &admin, &reactiver, json!({})).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "actif");

    let (status, _) = post(&client, &admin, "/api/1/abonnements/9999/suspendre", json!({})).await;
    assert_eq!(status, Status::NotFound);
}
