//! End-to-end ticket → mission → facture flows over HTTP.

#[macro_use]
extern crate time_test;

use rocket::http::{Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use regie_api::orm::testing::test_rocket;

async fn login(client: &Client, email: &str) -> Header<'static> {
    let password = if email == "admin@regie.local" { "admin" } else { "password" };
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

async fn get_json(client: &Client, auth: &Header<'static>, uri: &str) -> (Status, Value) {
    let response = client.get(uri.to_string()).header(auth.clone()).dispatch().await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

async fn post_json(
    client: &Client,
    auth: &Header<'static>,
    uri: &str,
    body: Value,
) -> (Status, Value) {
    let response = client
        .post(uri.to_string())
        .header(auth.clone())
        .json(&body)
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

async fn post_empty(client: &Client, auth: &Header<'static>, uri: &str) -> (Status, Value) {
    let response = client.post(uri.to_string()).header(auth.clone()).dispatch().await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

async fn entreprise_id(client: &Client, regie: &Header<'static>, nom: &str) -> i64 {
    let (_, body) = get_json(client, regie, "/api/1/entreprises").await;
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["nom"] == nom)
        .and_then(|e| e["id"].as_i64())
        .unwrap_or_else(|| panic!("entreprise {} should exist", nom))
}

async fn file_ticket(client: &Client, locataire: &Header<'static>, titre: &str) -> i64 {
    let (status, body) = post_json(
        client,
        locataire,
        "/api/1/tickets",
        json!({
            "titre": titre,
            "description": "L'eau coule sous l'évier",
            "categorie": "plomberie",
            "priorite": "haute"
        }),
    )
    .await;
    assert_eq!(status, Status::Created);
    body["data"]["id"].as_i64().unwrap()
}

async fn notification_kinds(client: &Client, auth: &Header<'static>) -> Vec<String> {
    let (_, body) = get_json(client, auth, "/api/1/notifications").await;
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap().to_string())
        .collect()
}

#[rocket::async_test]
async fn test_full_lifecycle() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_full_lifecycle");

    let locataire = login(&client, "locataire@lac.ch").await;
    let regie = login(&client, "regie@lac.ch").await;
    let entreprise = login(&client, "entreprise@plomberie.ch").await;
    let technicien = login(&client, "tech@plomberie.ch").await;
    let admin = login(&client, "admin@regie.local").await;

    // Ticket
    let ticket_id = file_ticket(&client, &locataire, "Fuite cuisine").await;
    let (_, body) = get_json(&client, &locataire, &format!("/api/1/tickets/{}", ticket_id)).await;
    assert_eq!(body["data"]["statut"], "nouveau");
    assert_eq!(body["data"]["priorite"], "haute");
    assert!(notification_kinds(&client, &regie).await.contains(&"ticket_cree".to_string()));

    // Assignment to an entreprise creates the mission
    let plomberie = entreprise_id(&client, &regie, "Plomberie Rapide").await;
    let (status, body) = post_json(
        &client,
        &regie,
        &format!("/api/1/tickets/{}/assign", ticket_id),
        json!({ "entreprise_id": plomberie }),
    )
    .await;
    assert_eq!(status, Status::Created);
    let mission_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["statut"], "en_attente");
    let (_, body) = get_json(&client, &regie, &format!("/api/1/tickets/{}", ticket_id)).await;
    assert_eq!(body["data"]["statut"], "en_cours");
    assert!(
        notification_kinds(&client, &entreprise)
            .await
            .contains(&"mission_assignee".to_string())
    );

    // Technicien
    let (_, body) = get_json(&client, &entreprise, "/api/1/techniciens").await;
    let technicien_id = body["data"][0]["id"].as_i64().unwrap();
    let (status, body) = post_json(
        &client,
        &entreprise,
        &format!("/api/1/missions/{}/technicien", mission_id),
        json!({ "technicien_id": technicien_id }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "planifiee");
    assert_eq!(body["data"]["technicien_id"], technicien_id);

    // Field work
    let (status, body) =
        post_empty(&client, &technicien, &format!("/api/1/missions/{}/start", mission_id)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "en_cours");
    assert!(body["data"]["started_at"].is_string());
    assert!(
        notification_kinds(&client, &locataire)
            .await
            .contains(&"mission_demarree".to_string())
    );

    let (status, body) = post_json(
        &client,
        &technicien,
        &format!("/api/1/missions/{}/terminer", mission_id),
        json!({ "rapport": "Siphon remplacé" }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "terminee");
    assert_eq!(body["data"]["rapport"], "Siphon remplacé");

    // Billing: 1000.00 HT at 20% TVA, 10% régie commission
    let (status, body) = post_json(
        &client,
        &entreprise,
        &format!("/api/1/missions/{}/facture", mission_id),
        json!({ "montant_ht": 100000 }),
    )
    .await;
    assert_eq!(status, Status::Created);
    let facture_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["statut"], "brouillon");
    assert_eq!(body["data"]["montant_tva"], 20000);
    assert_eq!(body["data"]["montant_ttc"], 120000);
    assert_eq!(body["data"]["montant_commission"], 10000);
    assert!(body["data"]["numero"].as_str().unwrap().starts_with("FAC-"));

    let (status, _) = post_json(
        &client,
        &entreprise,
        &format!("/api/1/missions/{}/facture", mission_id),
        json!({ "montant_ht": 5000 }),
    )
    .await;
    assert_eq!(status, Status::Conflict);

    let (status, body) =
        post_empty(&client, &entreprise, &format!("/api/1/factures/{}/envoyer", facture_id)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "envoyee");

    let (status, body) =
        post_empty(&client, &regie, &format!("/api/1/factures/{}/payer", facture_id)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "payee");
    assert!(body["data"]["paid_at"].is_string());
    assert!(
        notification_kinds(&client, &entreprise)
            .await
            .contains(&"facture_payee".to_string())
    );

    // Validation closes the ticket
    let (status, body) =
        post_empty(&client, &regie, &format!("/api/1/missions/{}/valider", mission_id)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "validee");
    let (_, body) = get_json(&client, &locataire, &format!("/api/1/tickets/{}", ticket_id)).await;
    assert_eq!(body["data"]["statut"], "clos");

    let (status, body) =
        post_empty(&client, &regie, &format!("/api/1/missions/{}/valider", mission_id)).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["success"], false);

    // Stats reflect the paid facture
    let (status, body) = get_json(&client, &admin, "/api/1/admin/stats").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["chiffre_affaires_ttc"], 120000);
    assert_eq!(body["data"]["commissions"], 10000);
    assert_eq!(body["data"]["tickets_par_statut"]["clos"], 1);
    assert_eq!(body["data"]["missions_par_statut"]["validee"], 1);
    assert_eq!(body["data"]["factures_par_statut"]["payee"], 1);
    assert_eq!(body["data"]["regies"], 2);
    assert_eq!(body["data"]["locataires"], 3);
}

#[rocket::async_test]
async fn test_visibility_across_organisations() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_visibility_across_organisations");

    let locataire = login(&client, "locataire@lac.ch").await;
    let regie = login(&client, "regie@lac.ch").await;
    let other_regie = login(&client, "regie@montagne.ch").await;
    let other_locataire = login(&client, "locataire2@montagne.ch").await;
    let other_entreprise = login(&client, "entreprise@electricite.ch").await;

    let ticket_id = file_ticket(&client, &locataire, "Radiateur froid").await;
    let uri = format!("/api/1/tickets/{}", ticket_id);

    let (status, _) = get_json(&client, &other_regie, &uri).await;
    assert_eq!(status, Status::NotFound);
    let (status, _) = get_json(&client, &other_locataire, &uri).await;
    assert_eq!(status, Status::NotFound);

    let (_, body) = get_json(&client, &other_regie, "/api/1/tickets").await;
    assert_eq!(body["pagination"]["total"], 0);

    let plomberie = entreprise_id(&client, &regie, "Plomberie Rapide").await;
    let (status, _) = post_json(
        &client,
        &other_regie,
        &format!("/api/1/tickets/{}/assign", ticket_id),
        json!({ "entreprise_id": plomberie }),
    )
    .await;
    assert_eq!(status, Status::NotFound);

    let (_, body) = post_json(
        &client,
        &regie,
        &format!("/api/1/tickets/{}/assign", ticket_id),
        json!({ "entreprise_id": plomberie }),
    )
    .await;
    let mission_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) =
        get_json(&client, &other_entreprise, &format!("/api/1/missions/{}", mission_id)).await;
    assert_eq!(status, Status::NotFound);
    let (status, _) =
        get_json(&client, &locataire, &format!("/api/1/missions/{}", mission_id)).await;
    assert_eq!(status, Status::Forbidden);

    // Unfinished missions cannot be invoiced
    let entreprise = login(&client, "entreprise@plomberie.ch").await;
    let (status, _) = post_json(
        &client,
        &entreprise,
        &format!("/api/1/missions/{}/facture", mission_id),
        json!({ "montant_ht": 1000 }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
}

#[rocket::async_test]
async fn test_ticket_listing_filters_and_paginates() {
    let client = Client::tracked(test_rocket()).await.unwrap();

    let locataire = login(&client, "locataire@lac.ch").await;
    let regie = login(&client, "regie@lac.ch").await;
    for i in 0..3 {
        file_ticket(&client, &locataire, &format!("Ticket {}", i)).await;
    }

    let (_, body) = get_json(&client, &regie, "/api/1/tickets?limit=2&page=1").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["limit"], 2);

    let (_, body) = get_json(&client, &regie, "/api/1/tickets?limit=2&page=2").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = get_json(&client, &regie, "/api/1/tickets?statut=clos").await;
    assert_eq!(body["pagination"]["total"], 0);

    let (status, _) = get_json(&client, &regie, "/api/1/tickets?statut=ouvert").await;
    assert_eq!(status, Status::BadRequest);
}

#[rocket::async_test]
async fn test_ticket_input_validation() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    let locataire = login(&client, "locataire@lac.ch").await;

    let (status, body) = post_json(
        &client,
        &locataire,
        "/api/1/tickets",
        json!({ "titre": "  ", "description": "d", "categorie": "c" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "titre is required");

    let (status, _) = post_json(
        &client,
        &locataire,
        "/api/1/tickets",
        json!({ "titre": "t", "description": "d", "categorie": "c", "priorite": "extreme" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);

    let orphan = login(&client, "orphan@locataire.ch").await;
    let (status, _) = post_json(
        &client,
        &orphan,
        "/api/1/tickets",
        json!({ "titre": "t", "description": "d", "categorie": "c" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
}

#[rocket::async_test]
async fn test_cancellation_paths() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_cancellation_paths");

    let locataire = login(&client, "locataire@lac.ch").await;
    let regie = login(&client, "regie@lac.ch").await;
    let entreprise = login(&client, "entreprise@plomberie.ch").await;

    // A new ticket is cancelled directly
    let ticket_id = file_ticket(&client, &locataire, "Porte qui grince").await;
    let (status, body) =
        post_empty(&client, &locataire, &format!("/api/1/tickets/{}/annuler", ticket_id)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "annule");
    assert!(notification_kinds(&client, &regie).await.contains(&"ticket_annule".to_string()));

    // An assigned ticket goes through its mission
    let ticket_id = file_ticket(&client, &locataire, "Volet bloqué").await;
    let plomberie = entreprise_id(&client, &regie, "Plomberie Rapide").await;
    let (_, body) = post_json(
        &client,
        &regie,
        &format!("/api/1/tickets/{}/assign", ticket_id),
        json!({ "entreprise_id": plomberie }),
    )
    .await;
    let mission_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) =
        post_empty(&client, &locataire, &format!("/api/1/tickets/{}/annuler", ticket_id)).await;
    assert_eq!(status, Status::BadRequest);

    let (status, _) =
        post_empty(&client, &locataire, &format!("/api/1/missions/{}/annuler", mission_id)).await;
    assert_eq!(status, Status::Forbidden);

    let (status, body) =
        post_empty(&client, &regie, &format!("/api/1/missions/{}/annuler", mission_id)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["data"]["statut"], "annulee");

    let (_, body) = get_json(&client, &locataire, &format!("/api/1/tickets/{}", ticket_id)).await;
    assert_eq!(body["data"]["statut"], "annule");
    assert!(
        notification_kinds(&client, &entreprise)
            .await
            .contains(&"mission_annulee".to_string())
    );

    // Terminal states stay terminal
    let (status, _) =
        post_empty(&client, &regie, &format!("/api/1/missions/{}/annuler", mission_id)).await;
    assert_eq!(status, Status::BadRequest);
}
