//! Mission procedures. Every transition also moves the parent ticket where
//! the two lifecycles are coupled:
//!
//! | mission | ticket |
//! |---|---|
//! | created (`en_attente`) | `nouveau` -> `en_cours` |
//! | `en_cours` -> `terminee` | `en_cours` -> `termine` |
//! | `terminee` -> `validee` | `termine` -> `clos` |
//! | any -> `annulee` | `en_cours` -> `annule` |

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::access::Actor;
use crate::error::AppError;
use crate::models::{AssignTechnicienInput, Mission, Role, Ticket};
use crate::orm::notification::{NotificationRefs, kind, notify};
use crate::orm::profile::{entreprise_profile_ids, regie_profile_ids};
use crate::orm::technicien::get_technicien;
use crate::orm::ticket::{load_ticket, set_ticket_status};
use crate::pagination::Page;
use crate::schema::{missions, techniciens, tickets};
use crate::workflow::{Lifecycle, MissionStatus, TicketStatus, ensure_transition};

type BoxedMissions = missions::BoxedQuery<'static, Sqlite>;

fn visible_missions(actor: &Actor) -> Result<BoxedMissions, AppError> {
    let query = missions::table.into_boxed();
    Ok(match actor.role {
        Role::AdminJtec => query,
        Role::Entreprise => query.filter(missions::entreprise_id.eq(actor.entreprise()?)),
        Role::Technicien => {
            let technicien_id = actor
                .technicien_id
                .ok_or_else(|| AppError::forbidden("Profile is not attached to a technicien"))?;
            query.filter(missions::technicien_id.eq(technicien_id))
        }
        Role::Regie => query.filter(
            missions::ticket_id.eq_any(
                tickets::table
                    .filter(tickets::regie_id.eq(actor.regie()?))
                    .select(tickets::id),
            ),
        ),
        Role::Locataire => return Err(AppError::forbidden("Locataires cannot list missions")),
    })
}

pub(crate) fn load_mission(
    conn: &mut SqliteConnection,
    mission_id: i32,
) -> Result<(Mission, Ticket), AppError> {
    let mission: Mission = missions::table
        .find(mission_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("Mission"))?;
    let ticket = load_ticket(conn, mission.ticket_id)?;
    Ok((mission, ticket))
}

/// Loads a mission the actor can see, or reports it as not found.
fn visible_mission(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
) -> Result<(Mission, Ticket), AppError> {
    if actor.role == Role::Locataire {
        return Err(AppError::forbidden("Locataires cannot read missions"));
    }
    let (mission, ticket) = load_mission(conn, mission_id)?;
    if actor.can_see_mission(&mission, &ticket) {
        Ok((mission, ticket))
    } else {
        Err(AppError::not_found("Mission"))
    }
}

fn set_mission_status(
    conn: &mut SqliteConnection,
    mission: &Mission,
    to: MissionStatus,
) -> Result<(), AppError> {
    let from = MissionStatus::from_stored(&mission.statut)?;
    ensure_transition(from, to)?;
    diesel::update(missions::table.find(mission.id))
        .set((
            missions::statut.eq(to.as_str()),
            missions::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;
    Ok(())
}

fn reload(conn: &mut SqliteConnection, mission_id: i32) -> Result<Mission, AppError> {
    Ok(missions::table.find(mission_id).first(conn)?)
}

/// The assigned technicien or the entreprise carrying the mission.
fn ensure_field_actor(actor: &Actor, mission: &Mission) -> Result<(), AppError> {
    let allowed = match actor.role {
        Role::Technicien => {
            actor.technicien_id.is_some() && actor.technicien_id == mission.technicien_id
        }
        Role::Entreprise => actor.entreprise_id == Some(mission.entreprise_id),
        _ => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "Only the assigned technicien or the entreprise may do this",
        ))
    }
}

pub(crate) fn technicien_profile(conn: &mut SqliteConnection, mission: &Mission) -> QueryResult<Option<i32>> {
    match mission.technicien_id {
        Some(id) => techniciens::table
            .find(id)
            .select(techniciens::profile_id)
            .first(conn)
            .optional(),
        None => Ok(None),
    }
}

pub(crate) fn refs(mission: &Mission) -> NotificationRefs {
    NotificationRefs {
        ticket_id: Some(mission.ticket_id),
        mission_id: Some(mission.id),
        facture_id: None,
    }
}

pub fn list_missions(
    conn: &mut SqliteConnection,
    actor: &Actor,
    statut: Option<MissionStatus>,
    page: Page,
) -> Result<(Vec<Mission>, i64), AppError> {
    let filtered = |actor: &Actor| -> Result<BoxedMissions, AppError> {
        let query = visible_missions(actor)?;
        Ok(match statut {
            Some(s) => query.filter(missions::statut.eq(s.as_str())),
            None => query,
        })
    };

    let total: i64 = filtered(actor)?.count().get_result(conn)?;
    let rows = filtered(actor)?
        .order((missions::created_at.desc(), missions::id.desc()))
        .limit(page.limit)
        .offset(page.offset())
        .load(conn)?;
    Ok((rows, total))
}

pub fn get_mission(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
) -> Result<Mission, AppError> {
    visible_mission(conn, actor, mission_id).map(|(mission, _)| mission)
}

/// Assigns (or re-assigns) a technicien of the mission's entreprise.
pub fn assign_technicien(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
    input: AssignTechnicienInput,
) -> Result<Mission, AppError> {
    let entreprise_id = actor.entreprise()?;

    conn.transaction(|conn| {
        let (mission, _) = visible_mission(conn, actor, mission_id)?;
        let technicien = get_technicien(conn, input.technicien_id)?
            .filter(|t| t.entreprise_id == entreprise_id)
            .ok_or_else(|| {
                AppError::bad_request("Technicien does not belong to this entreprise")
            })?;

        set_mission_status(conn, &mission, MissionStatus::Planifiee)?;
        let date_intervention: Option<NaiveDateTime> =
            input.date_intervention.or(mission.date_intervention);
        diesel::update(missions::table.find(mission.id))
            .set((
                missions::technicien_id.eq(Some(technicien.id)),
                missions::date_intervention.eq(date_intervention),
            ))
            .execute(conn)?;

        notify(
            conn,
            &[technicien.profile_id],
            kind::TECHNICIEN_ASSIGNE,
            "Mission assignée",
            &format!("Vous intervenez sur la mission #{}", mission.id),
            refs(&mission),
        )?;
        reload(conn, mission.id)
    })
}

pub fn start_mission(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
) -> Result<Mission, AppError> {
    conn.transaction(|conn| {
        let (mission, ticket) = visible_mission(conn, actor, mission_id)?;
        ensure_field_actor(actor, &mission)?;

        set_mission_status(conn, &mission, MissionStatus::EnCours)?;
        diesel::update(missions::table.find(mission.id))
            .set(missions::started_at.eq(Some(Utc::now().naive_utc())))
            .execute(conn)?;

        notify(
            conn,
            &[ticket.locataire_id],
            kind::MISSION_DEMARREE,
            "Intervention en cours",
            &format!("L'intervention pour \"{}\" a commencé", ticket.titre),
            refs(&mission),
        )?;
        reload(conn, mission.id)
    })
}

pub fn complete_mission(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
    rapport: Option<String>,
) -> Result<Mission, AppError> {
    let rapport = rapport
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    conn.transaction(|conn| {
        let (mission, ticket) = visible_mission(conn, actor, mission_id)?;
        ensure_field_actor(actor, &mission)?;

        set_mission_status(conn, &mission, MissionStatus::Terminee)?;
        diesel::update(missions::table.find(mission.id))
            .set((
                missions::completed_at.eq(Some(Utc::now().naive_utc())),
                missions::rapport.eq(rapport),
            ))
            .execute(conn)?;
        set_ticket_status(conn, &ticket, TicketStatus::Termine)?;

        let mut recipients = regie_profile_ids(conn, ticket.regie_id)?;
        recipients.push(ticket.locataire_id);
        notify(
            conn,
            &recipients,
            kind::MISSION_TERMINEE,
            "Intervention terminée",
            &format!("La mission #{} est terminée", mission.id),
            refs(&mission),
        )?;
        reload(conn, mission.id)
    })
}

pub fn validate_mission(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
) -> Result<Mission, AppError> {
    let regie_id = actor.regie()?;

    conn.transaction(|conn| {
        let (mission, ticket) = load_mission(conn, mission_id)?;
        if ticket.regie_id != regie_id {
            return Err(AppError::not_found("Mission"));
        }

        set_mission_status(conn, &mission, MissionStatus::Validee)?;
        diesel::update(missions::table.find(mission.id))
            .set(missions::validated_at.eq(Some(Utc::now().naive_utc())))
            .execute(conn)?;
        set_ticket_status(conn, &ticket, TicketStatus::Clos)?;

        let recipients = entreprise_profile_ids(conn, mission.entreprise_id)?;
        notify(
            conn,
            &recipients,
            kind::MISSION_VALIDEE,
            "Mission validée",
            &format!("La régie a validé la mission #{}", mission.id),
            refs(&mission),
        )?;
        reload(conn, mission.id)
    })
}

/// Cancels the mission and its ticket. The ticket is not reopened.
pub fn cancel_mission(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
) -> Result<Mission, AppError> {
    if !matches!(actor.role, Role::Regie | Role::Entreprise) {
        return Err(AppError::forbidden(
            "Only the régie or the entreprise may cancel a mission",
        ));
    }

    conn.transaction(|conn| {
        let (mission, ticket) = visible_mission(conn, actor, mission_id)?;

        set_mission_status(conn, &mission, MissionStatus::Annulee)?;
        set_ticket_status(conn, &ticket, TicketStatus::Annule)?;

        let mut recipients = match actor.role {
            Role::Regie => entreprise_profile_ids(conn, mission.entreprise_id)?,
            _ => regie_profile_ids(conn, ticket.regie_id)?,
        };
        recipients.push(ticket.locataire_id);
        if let Some(profile_id) = technicien_profile(conn, &mission)? {
            recipients.push(profile_id);
        }
        notify(
            conn,
            &recipients,
            kind::MISSION_ANNULEE,
            "Mission annulée",
            &format!("La mission #{} a été annulée", mission.id),
            refs(&mission),
        )?;

        warn!("Mission {} cancelled by profile {}", mission.id, actor.profile_id);
        reload(conn, mission.id)
    })
}
