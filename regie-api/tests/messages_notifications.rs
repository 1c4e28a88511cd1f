use rocket::http::{Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use regie_api::orm::testing::test_rocket;

async fn login(client: &Client, email: &str) -> Header<'static> {
    let response = client
        .post("/api/1/login")
        .json(&json!({ "email": email, "password": "password" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    Header::new(
        "Authorization",
        format!("Bearer {}", body["token"].as_str().unwrap()),
    )
}

async fn get(client: &Client, auth: &Header<'static>, uri: String) -> (Status, Value) {
    let response = client.get(uri).header(auth.clone()).dispatch().await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

async fn post(
    client: &Client,
    auth: &Header<'static>,
    uri: String,
    body: Value,
) -> (Status, Value) {
    let response = client.post(uri).header(auth.clone()).json(&body).dispatch().await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

/// Ticket assigned to Plomberie Rapide with its technicien planned.
async fn planned_mission(client: &Client) -> i64 {
    let locataire = login(client, "locataire@lac.ch").await;
    let regie = login(client, "regie@lac.ch").await;
    let entreprise = login(client, "entreprise@plomberie.ch").await;

    let (_, body) = post(
        client,
        &locataire,
        "/api/1/tickets".into(),
        json!({ "titre": "Chauffe-eau", "description": "Plus d'eau chaude", "categorie": "sanitaire" }),
    )
    .await;
    let ticket_id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = get(client, &regie, "/api/1/entreprises".into()).await;
    let plomberie = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["nom"] == "Plomberie Rapide")
        .and_then(|e| e["id"].as_i64())
        .unwrap();
    let (_, body) = post(
        client,
        &regie,
        format!("/api/1/tickets/{}/assign", ticket_id),
        json!({ "entreprise_id": plomberie }),
    )
    .await;
    let mission_id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = get(client, &entreprise, "/api/1/techniciens".into()).await;
    let technicien_id = body["data"][0]["id"].as_i64().unwrap();
    let (status, _) = post(
        client,
        &entreprise,
        format!("/api/1/missions/{}/technicien", mission_id),
        json!({ "technicien_id": technicien_id }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    mission_id
}

#[rocket::async_test]
async fn test_participants_exchange_messages() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    let mission_id = planned_mission(&client).await;
    let uri = format!("/api/1/missions/{}/messages", mission_id);

    let locataire = login(&client, "locataire@lac.ch").await;
    let technicien = login(&client, "tech@plomberie.ch").await;
    let regie = login(&client, "regie@lac.ch").await;

    let (status, body) =
        post(&client, &technicien, uri.clone(), json!({ "contenu": "Je passe demain à 8h" })).await;
    assert_eq!(status, Status::Created);
    assert_eq!(body["data"]["contenu"], "Je passe demain à 8h");

    let (status, _) = post(&client, &locataire, uri.clone(), json!({ "contenu": "  Parfait  " })).await;
    assert_eq!(status, Status::Created);

    let (status, body) = get(&client, &regie, uri.clone()).await;
    assert_eq!(status, Status::Ok);
    let messages = body["data"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["contenu"], "Je passe demain à 8h");
    assert_eq!(messages[1]["contenu"], "Parfait");

    // Each side is told about the other's message, not its own
    let (_, body) = get(&client, &locataire, "/api/1/notifications".into()).await;
    let from_tech = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["kind"] == "nouveau_message")
        .count();
    assert_eq!(from_tech, 1);

    let (_, body) = get(&client, &technicien, "/api/1/notifications".into()).await;
    let from_locataire = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["kind"] == "nouveau_message")
        .count();
    assert_eq!(from_locataire, 1);
}

#[rocket::async_test]
async fn test_outsiders_and_bad_messages_are_rejected() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    let mission_id = planned_mission(&client).await;
    let uri = format!("/api/1/missions/{}/messages", mission_id);

    let outsider = login(&client, "tech@electricite.ch").await;
    let (status, _) = get(&client, &outsider, uri.clone()).await;
    assert_eq!(status, Status::Forbidden);
    let (status, _) = post(&client, &outsider, uri.clone(), json!({ "contenu": "Bonjour" })).await;
    assert_eq!(status, Status::Forbidden);

    let other_locataire = login(&client, "locataire2@montagne.ch").await;
    let (status, _) = get(&client, &other_locataire, uri.clone()).await;
    assert_eq!(status, Status::Forbidden);

    let locataire = login(&client, "locataire@lac.ch").await;
    let (status, body) = post(&client, &locataire, uri.clone(), json!({ "contenu": "   " })).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "contenu is required");

    let (status, _) = post(
        &client,
        &locataire,
        uri.clone(),
        json!({ "contenu": "x".repeat(4001) }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);

    let (status, _) = get(&client, &locataire, "/api/1/missions/99999/messages".into()).await;
    assert_eq!(status, Status::NotFound);
}

#[rocket::async_test]
async fn test_notification_inbox() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    planned_mission(&client).await;
    planned_mission(&client).await;

    let entreprise = login(&client, "entreprise@plomberie.ch").await;

    let (status, body) = get(&client, &entreprise, "/api/1/notifications".into()).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["success"], true);
    assert_eq!(body["unread_count"], 2);
    let notifications = body["data"].as_array().unwrap();
    assert_eq!(notifications.len(), 2);
    assert!(notifications.iter().all(|n| n["kind"] == "mission_assignee"));
    // Newest first
    assert!(notifications[0]["id"].as_i64() > notifications[1]["id"].as_i64());

    let (_, body) = get(&client, &entreprise, "/api/1/notifications?limit=1".into()).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["unread_count"], 2);

    let first_id = notifications[0]["id"].as_i64().unwrap();
    let (status, body) = post(
        &client,
        &entreprise,
        format!("/api/1/notifications/{}/read", first_id),
        json!({}),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["is_read"], true);
    assert!(body["data"]["read_at"].is_string());

    let (_, body) = get(&client, &entreprise, "/api/1/notifications?unread_only=true".into()).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["unread_count"], 1);

    // Someone else's notification does not exist for this caller
    let regie = login(&client, "regie@lac.ch").await;
    let (status, _) = post(
        &client,
        &regie,
        format!("/api/1/notifications/{}/read", first_id),
        json!({}),
    )
    .await;
    assert_eq!(status, Status::NotFound);

    let (status, body) =
        post(&client, &entreprise, "/api/1/notifications/read-all".into(), json!({})).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["updated"], 1);

    let (_, body) = get(&client, &entreprise, "/api/1/notifications".into()).await;
    assert_eq!(body["unread_count"], 0);
}
