//! Per-mission conversation threads.

use diesel::prelude::*;

use crate::access::Actor;
use crate::error::AppError;
use crate::models::{Message, Mission, NewMessage, Ticket};
use crate::orm::last_insert_rowid;
use crate::orm::mission::{load_mission, refs, technicien_profile};
use crate::orm::notification::{kind, notify};
use crate::schema::messages;

/// Maximum message length, in characters.
pub const MAX_CONTENU_LEN: usize = 4000;

fn participant_mission(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
) -> Result<(Mission, Ticket), AppError> {
    let (mission, ticket) = load_mission(conn, mission_id)?;
    if actor.is_mission_participant(&mission, &ticket) {
        Ok((mission, ticket))
    } else {
        Err(AppError::forbidden("Not a participant of this mission"))
    }
}

/// Messages of a mission, oldest first.
pub fn list_messages(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
) -> Result<Vec<Message>, AppError> {
    let (mission, _) = participant_mission(conn, actor, mission_id)?;
    Ok(messages::table
        .filter(messages::mission_id.eq(mission.id))
        .order((messages::created_at.asc(), messages::id.asc()))
        .load(conn)?)
}

pub fn post_message(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
    contenu: &str,
) -> Result<Message, AppError> {
    let contenu = contenu.trim();
    if contenu.is_empty() {
        return Err(AppError::bad_request("contenu is required"));
    }
    if contenu.chars().count() > MAX_CONTENU_LEN {
        return Err(AppError::bad_request(format!(
            "contenu must be at most {} characters",
            MAX_CONTENU_LEN
        )));
    }

    conn.transaction(|conn| {
        let (mission, ticket) = participant_mission(conn, actor, mission_id)?;

        diesel::insert_into(messages::table)
            .values(&NewMessage {
                mission_id: mission.id,
                sender_id: actor.profile_id,
                contenu: contenu.to_string(),
            })
            .execute(conn)?;
        let message: Message = messages::table.find(last_insert_rowid(conn)?).first(conn)?;

        let mut recipients = vec![ticket.locataire_id];
        if let Some(profile_id) = technicien_profile(conn, &mission)? {
            recipients.push(profile_id);
        }
        recipients.retain(|id| *id != actor.profile_id);
        notify(
            conn,
            &recipients,
            kind::NOUVEAU_MESSAGE,
            "Nouveau message",
            &format!("Nouveau message sur la mission #{}", mission.id),
            refs(&mission),
        )?;

        Ok(message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignTechnicienInput, AssignTicketInput, Role, TicketInput};
    use crate::orm::mission::assign_technicien;
    use crate::orm::notification::list_notifications;
    use crate::orm::testing::{actor_for, setup_seeded_test_db};
    use crate::orm::ticket::{assign_ticket, create_ticket};

    fn planned_mission(conn: &mut SqliteConnection) -> i32 {
        let locataire = actor_for(conn, "locataire@lac.ch");
        let regie = actor_for(conn, "regie@lac.ch");
        let entreprise = actor_for(conn, "entreprise@plomberie.ch");
        let tech = actor_for(conn, "tech@plomberie.ch");

        let ticket = create_ticket(
            conn,
            &locataire,
            TicketInput {
                titre: "Robinet".to_string(),
                description: "Goutte".to_string(),
                categorie: "plomberie".to_string(),
                priorite: Some("basse".to_string()),
            },
        )
        .unwrap();
        let mission = assign_ticket(
            conn,
            &regie,
            ticket.id,
            AssignTicketInput {
                entreprise_id: entreprise.entreprise_id.unwrap(),
                date_intervention: None,
            },
        )
        .unwrap();
        assign_technicien(
            conn,
            &entreprise,
            mission.id,
            AssignTechnicienInput {
                technicien_id: tech.technicien_id.unwrap(),
                date_intervention: None,
            },
        )
        .unwrap();
        mission.id
    }

    #[test]
    fn test_thread_is_oldest_first_and_notifies_others() {
        let mut conn = setup_seeded_test_db();
        let mission_id = planned_mission(&mut conn);
        let locataire = actor_for(&mut conn, "locataire@lac.ch");
        let tech = actor_for(&mut conn, "tech@plomberie.ch");

        post_message(&mut conn, &locataire, mission_id, "Je suis absent mardi").unwrap();
        post_message(&mut conn, &tech, mission_id, "  Mercredi alors  ").unwrap();

        let thread = list_messages(&mut conn, &locataire, mission_id).unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].sender_id, locataire.profile_id);
        assert_eq!(thread[1].contenu, "Mercredi alors");

        let count_kind = |conn: &mut SqliteConnection, profile_id| {
            list_notifications(conn, profile_id, false, 50)
                .unwrap()
                .into_iter()
                .filter(|n| n.kind == kind::NOUVEAU_MESSAGE)
                .count()
        };
        assert_eq!(count_kind(&mut conn, tech.profile_id), 1);
        assert_eq!(count_kind(&mut conn, locataire.profile_id), 1);
    }

    #[test]
    fn test_outsiders_and_empty_messages_are_rejected() {
        let mut conn = setup_seeded_test_db();
        let mission_id = planned_mission(&mut conn);

        let outsider = actor_for(&mut conn, "locataire2@montagne.ch");
        assert!(matches!(
            list_messages(&mut conn, &outsider, mission_id),
            Err(AppError::Forbidden(_))
        ));
        let other_tech = actor_for(&mut conn, "tech@electricite.ch");
        assert!(matches!(
            post_message(&mut conn, &other_tech, mission_id, "Bonjour"),
            Err(AppError::Forbidden(_))
        ));

        let regie = actor_for(&mut conn, "regie@lac.ch");
        assert!(matches!(
            post_message(&mut conn, &regie, mission_id, "   "),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            list_messages(&mut conn, &regie, 9999),
            Err(AppError::NotFound(_))
        ));

        let admin = Actor {
            profile_id: regie.profile_id,
            role: Role::AdminJtec,
            regie_id: None,
            entreprise_id: None,
            technicien_id: None,
        };
        assert!(list_messages(&mut conn, &admin, mission_id).unwrap().is_empty());
    }
}
