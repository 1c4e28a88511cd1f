//! Ticket procedures: filing, listing, assignment to an entreprise and
//! cancellation.

use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::access::Actor;
use crate::error::AppError;
use crate::models::{
    AssignTicketInput, Mission, NewMission, NewTicket, Role, Ticket, TicketInput,
};
use crate::orm::entreprise::get_entreprise;
use crate::orm::last_insert_rowid;
use crate::orm::notification::{NotificationRefs, kind, notify};
use crate::orm::profile::{entreprise_profile_ids, regie_profile_ids};
use crate::pagination::Page;
use crate::schema::{missions, tickets};
use crate::workflow::{Lifecycle, Priorite, TicketStatus, ensure_transition};

type BoxedTickets = tickets::BoxedQuery<'static, Sqlite>;

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::bad_request(format!("{} is required", field)))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Tickets the actor may list. Techniciens work on missions, not tickets.
fn visible_tickets(actor: &Actor) -> Result<BoxedTickets, AppError> {
    let query = tickets::table.into_boxed();
    Ok(match actor.role {
        Role::AdminJtec => query,
        Role::Locataire => query.filter(tickets::locataire_id.eq(actor.profile_id)),
        Role::Regie => query.filter(tickets::regie_id.eq(actor.regie()?)),
        Role::Entreprise => query.filter(
            tickets::id.eq_any(
                missions::table
                    .filter(missions::entreprise_id.eq(actor.entreprise()?))
                    .select(missions::ticket_id),
            ),
        ),
        Role::Technicien => return Err(AppError::forbidden("Techniciens cannot list tickets")),
    })
}

pub(crate) fn load_ticket(conn: &mut SqliteConnection, ticket_id: i32) -> Result<Ticket, AppError> {
    tickets::table
        .find(ticket_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("Ticket"))
}

/// Moves a ticket along its lifecycle. Callers run inside a transaction.
pub(crate) fn set_ticket_status(
    conn: &mut SqliteConnection,
    ticket: &Ticket,
    to: TicketStatus,
) -> Result<(), AppError> {
    let from = TicketStatus::from_stored(&ticket.statut)?;
    ensure_transition(from, to)?;
    diesel::update(tickets::table.find(ticket.id))
        .set((
            tickets::statut.eq(to.as_str()),
            tickets::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn create_ticket(
    conn: &mut SqliteConnection,
    actor: &Actor,
    input: TicketInput,
) -> Result<Ticket, AppError> {
    if actor.role != Role::Locataire {
        return Err(AppError::forbidden("Only a locataire may file a ticket"));
    }
    let regie_id = actor
        .regie_id
        .ok_or_else(|| AppError::bad_request("Locataire is not attached to a régie"))?;

    let priorite = match input.priorite.as_deref() {
        Some(p) => p.parse::<Priorite>()?,
        None => Priorite::Normale,
    };
    let new_ticket = NewTicket {
        locataire_id: actor.profile_id,
        regie_id,
        titre: required(&input.titre, "titre")?,
        description: required(&input.description, "description")?,
        categorie: required(&input.categorie, "categorie")?,
        priorite: priorite.as_str().to_string(),
    };

    conn.transaction(|conn| {
        diesel::insert_into(tickets::table)
            .values(&new_ticket)
            .execute(conn)?;
        let ticket: Ticket = tickets::table.find(last_insert_rowid(conn)?).first(conn)?;

        let recipients = regie_profile_ids(conn, regie_id)?;
        notify(
            conn,
            &recipients,
            kind::TICKET_CREE,
            "Nouveau ticket",
            &format!("Ticket #{}: {}", ticket.id, ticket.titre),
            NotificationRefs {
                ticket_id: Some(ticket.id),
                ..Default::default()
            },
        )?;
        Ok(ticket)
    })
}

pub fn list_tickets(
    conn: &mut SqliteConnection,
    actor: &Actor,
    statut: Option<TicketStatus>,
    page: Page,
) -> Result<(Vec<Ticket>, i64), AppError> {
    let filtered = |actor: &Actor| -> Result<BoxedTickets, AppError> {
        let query = visible_tickets(actor)?;
        Ok(match statut {
            Some(s) => query.filter(tickets::statut.eq(s.as_str())),
            None => query,
        })
    };

    let total: i64 = filtered(actor)?.count().get_result(conn)?;
    let rows = filtered(actor)?
        .order((tickets::created_at.desc(), tickets::id.desc()))
        .limit(page.limit)
        .offset(page.offset())
        .load(conn)?;
    Ok((rows, total))
}

pub fn get_ticket(
    conn: &mut SqliteConnection,
    actor: &Actor,
    ticket_id: i32,
) -> Result<Ticket, AppError> {
    if actor.role == Role::Technicien {
        return Err(AppError::forbidden("Techniciens cannot read tickets"));
    }
    let ticket = load_ticket(conn, ticket_id)?;
    let mission_entreprise: Option<i32> = missions::table
        .filter(missions::ticket_id.eq(ticket.id))
        .select(missions::entreprise_id)
        .first(conn)
        .optional()?;

    if actor.can_see_ticket(&ticket, mission_entreprise) {
        Ok(ticket)
    } else {
        Err(AppError::not_found("Ticket"))
    }
}

/// Creates the ticket's mission for an entreprise and moves the ticket to
/// `en_cours`.
pub fn assign_ticket(
    conn: &mut SqliteConnection,
    actor: &Actor,
    ticket_id: i32,
    input: AssignTicketInput,
) -> Result<Mission, AppError> {
    let regie_id = actor.regie()?;

    conn.transaction(|conn| {
        let ticket = load_ticket(conn, ticket_id)?;
        if ticket.regie_id != regie_id {
            return Err(AppError::not_found("Ticket"));
        }
        let entreprise = get_entreprise(conn, input.entreprise_id)?
            .ok_or_else(|| AppError::bad_request("Unknown entreprise"))?;

        set_ticket_status(conn, &ticket, TicketStatus::EnCours)?;

        diesel::insert_into(missions::table)
            .values(&NewMission {
                ticket_id: ticket.id,
                entreprise_id: entreprise.id,
                date_intervention: input.date_intervention,
            })
            .execute(conn)?;
        let mission: Mission = missions::table.find(last_insert_rowid(conn)?).first(conn)?;

        let recipients = entreprise_profile_ids(conn, entreprise.id)?;
        notify(
            conn,
            &recipients,
            kind::MISSION_ASSIGNEE,
            "Nouvelle mission",
            &format!("Mission #{} pour le ticket \"{}\"", mission.id, ticket.titre),
            NotificationRefs {
                ticket_id: Some(ticket.id),
                mission_id: Some(mission.id),
                facture_id: None,
            },
        )?;

        info!(
            "Ticket {} assigned to entreprise {} as mission {}",
            ticket.id, entreprise.id, mission.id
        );
        Ok(mission)
    })
}

/// Cancels a ticket that has no mission yet. Tickets already assigned are
/// cancelled through their mission.
pub fn cancel_ticket(
    conn: &mut SqliteConnection,
    actor: &Actor,
    ticket_id: i32,
) -> Result<Ticket, AppError> {
    conn.transaction(|conn| {
        let ticket = load_ticket(conn, ticket_id)?;
        let owns = match actor.role {
            Role::Locataire => ticket.locataire_id == actor.profile_id,
            Role::Regie => actor.regie_id == Some(ticket.regie_id),
            _ => return Err(AppError::forbidden("Only the locataire or the régie may cancel a ticket")),
        };
        if !owns {
            return Err(AppError::not_found("Ticket"));
        }
        if TicketStatus::from_stored(&ticket.statut)? == TicketStatus::EnCours {
            return Err(AppError::bad_request(
                "Ticket has a mission; cancel the mission instead",
            ));
        }

        set_ticket_status(conn, &ticket, TicketStatus::Annule)?;

        if actor.role == Role::Locataire {
            let recipients = regie_profile_ids(conn, ticket.regie_id)?;
            notify(
                conn,
                &recipients,
                kind::TICKET_ANNULE,
                "Ticket annulé",
                &format!("Le locataire a annulé le ticket #{}", ticket.id),
                NotificationRefs {
                    ticket_id: Some(ticket.id),
                    ..Default::default()
                },
            )?;
        }
        Ok(load_ticket(conn, ticket.id)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::notification::list_notifications;
    use crate::orm::testing::{actor_for, setup_seeded_test_db};

    fn input(titre: &str) -> TicketInput {
        TicketInput {
            titre: titre.to_string(),
            description: "L'eau coule".to_string(),
            categorie: "plomberie".to_string(),
            priorite: Some("haute".to_string()),
        }
    }

    #[test]
    fn test_create_ticket_notifies_regie() {
        let mut conn = setup_seeded_test_db();
        let locataire = actor_for(&mut conn, "locataire@lac.ch");
        let regie = actor_for(&mut conn, "regie@lac.ch");

        let ticket = create_ticket(&mut conn, &locataire, input("Fuite")).unwrap();
        assert_eq!(ticket.statut, "nouveau");
        assert_eq!(ticket.priorite, "haute");
        assert_eq!(Some(ticket.regie_id), regie.regie_id);

        let notes = list_notifications(&mut conn, regie.profile_id, false, 10).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].ticket_id, Some(ticket.id));
    }

    #[test]
    fn test_create_ticket_validation() {
        let mut conn = setup_seeded_test_db();
        let orphan = actor_for(&mut conn, "orphan@locataire.ch");
        let err = create_ticket(&mut conn, &orphan, input("Fuite")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let locataire = actor_for(&mut conn, "locataire@lac.ch");
        let err = create_ticket(&mut conn, &locataire, input("   ")).unwrap_err();
        assert_eq!(err.to_string(), "titre is required");

        let mut bad = input("Fuite");
        bad.priorite = Some("critique".to_string());
        assert!(create_ticket(&mut conn, &locataire, bad).is_err());
    }

    #[test]
    fn test_list_is_scoped_to_owner() {
        let mut conn = setup_seeded_test_db();
        let lac = actor_for(&mut conn, "locataire@lac.ch");
        let montagne = actor_for(&mut conn, "locataire2@montagne.ch");
        create_ticket(&mut conn, &lac, input("A")).unwrap();
        create_ticket(&mut conn, &lac, input("B")).unwrap();
        create_ticket(&mut conn, &montagne, input("C")).unwrap();

        let regie = actor_for(&mut conn, "regie@lac.ch");
        let (rows, total) = list_tickets(&mut conn, &regie, None, Page::default()).unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].titre, "B");

        let (rows, total) = list_tickets(&mut conn, &montagne, None, Page::default()).unwrap();
        assert_eq!((rows.len(), total), (1, 1));

        let entreprise = actor_for(&mut conn, "entreprise@plomberie.ch");
        let (_, total) = list_tickets(&mut conn, &entreprise, None, Page::default()).unwrap();
        assert_eq!(total, 0);

        let tech = actor_for(&mut conn, "tech@plomberie.ch");
        assert!(matches!(
            list_tickets(&mut conn, &tech, None, Page::default()),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_assign_and_cancel_rules() {
        let mut conn = setup_seeded_test_db();
        let locataire = actor_for(&mut conn, "locataire@lac.ch");
        let regie = actor_for(&mut conn, "regie@lac.ch");
        let other_regie = actor_for(&mut conn, "regie@montagne.ch");
        let entreprise = actor_for(&mut conn, "entreprise@plomberie.ch");
        let entreprise_id = entreprise.entreprise_id.unwrap();

        let ticket = create_ticket(&mut conn, &locataire, input("Fuite")).unwrap();
        let assign = AssignTicketInput {
            entreprise_id,
            date_intervention: None,
        };

        let err = assign_ticket(&mut conn, &other_regie, ticket.id, assign.clone()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let mission = assign_ticket(&mut conn, &regie, ticket.id, assign.clone()).unwrap();
        assert_eq!(mission.statut, "en_attente");
        assert_eq!(get_ticket(&mut conn, &entreprise, ticket.id).unwrap().statut, "en_cours");

        let err = assign_ticket(&mut conn, &regie, ticket.id, assign).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let err = cancel_ticket(&mut conn, &locataire, ticket.id).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let second = create_ticket(&mut conn, &locataire, input("Volet")).unwrap();
        let cancelled = cancel_ticket(&mut conn, &locataire, second.id).unwrap();
        assert_eq!(cancelled.statut, "annule");
    }
}
