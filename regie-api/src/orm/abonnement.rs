//! Plans and subscriptions.
//!
//! An abonnement belongs to exactly one régie or one entreprise, and a
//! subscriber holds at most one `actif` abonnement at a time. An upgrade
//! changes the plan of the existing row in place; history is not kept.

use chrono::Utc;
use diesel::prelude::*;

use crate::access::Actor;
use crate::error::AppError;
use crate::models::{Abonnement, AbonnementInput, NewAbonnement, Plan, Role};
use crate::orm::entreprise::get_entreprise;
use crate::orm::last_insert_rowid;
use crate::orm::regie::get_regie;
use crate::schema::{abonnements, plans};
use crate::workflow::{AbonnementStatus, Lifecycle, ensure_transition};

/// Plans ordered from the entry level up.
pub fn list_plans(conn: &mut SqliteConnection) -> QueryResult<Vec<Plan>> {
    plans::table.order(plans::rang.asc()).load(conn)
}

pub fn get_plan(conn: &mut SqliteConnection, code: &str) -> QueryResult<Option<Plan>> {
    plans::table.find(code).first(conn).optional()
}

fn require_plan(conn: &mut SqliteConnection, code: &str) -> Result<Plan, AppError> {
    get_plan(conn, code.trim())?
        .ok_or_else(|| AppError::bad_request(format!("Unknown plan '{}'", code.trim())))
}

pub fn list_abonnements(
    conn: &mut SqliteConnection,
    actor: &Actor,
) -> Result<Vec<Abonnement>, AppError> {
    let query = abonnements::table.into_boxed();
    let query = match actor.role {
        Role::AdminJtec => query,
        Role::Regie => query.filter(abonnements::regie_id.eq(actor.regie()?)),
        Role::Entreprise => query.filter(abonnements::entreprise_id.eq(actor.entreprise()?)),
        Role::Locataire | Role::Technicien => {
            return Err(AppError::forbidden(
                "Abonnements are restricted to régies and entreprises",
            ));
        }
    };
    Ok(query
        .order((abonnements::created_at.desc(), abonnements::id.desc()))
        .load(conn)?)
}

/// Works out who is subscribing. Régies and entreprises subscribe
/// themselves; an administrator names exactly one subscriber.
fn subscriber_for(
    conn: &mut SqliteConnection,
    actor: &Actor,
    input: &AbonnementInput,
) -> Result<(Option<i32>, Option<i32>), AppError> {
    match actor.role {
        Role::Regie => {
            let own = actor.regie()?;
            if input.entreprise_id.is_some() || input.regie_id.is_some_and(|id| id != own) {
                return Err(AppError::forbidden("A régie may only subscribe itself"));
            }
            Ok((Some(own), None))
        }
        Role::Entreprise => {
            let own = actor.entreprise()?;
            if input.regie_id.is_some() || input.entreprise_id.is_some_and(|id| id != own) {
                return Err(AppError::forbidden("An entreprise may only subscribe itself"));
            }
            Ok((None, Some(own)))
        }
        Role::AdminJtec => match (input.regie_id, input.entreprise_id) {
            (Some(regie_id), None) => {
                get_regie(conn, regie_id)?
                    .ok_or_else(|| AppError::bad_request("Unknown régie"))?;
                Ok((Some(regie_id), None))
            }
            (None, Some(entreprise_id)) => {
                get_entreprise(conn, entreprise_id)?
                    .ok_or_else(|| AppError::bad_request("Unknown entreprise"))?;
                Ok((None, Some(entreprise_id)))
            }
            _ => Err(AppError::bad_request(
                "Exactly one of regie_id or entreprise_id is required",
            )),
        },
        Role::Locataire | Role::Technicien => {
            Err(AppError::forbidden("Only régies and entreprises hold abonnements"))
        }
    }
}

fn active_count(
    conn: &mut SqliteConnection,
    regie_id: Option<i32>,
    entreprise_id: Option<i32>,
) -> QueryResult<i64> {
    let query = abonnements::table
        .filter(abonnements::statut.eq(AbonnementStatus::Actif.as_str()))
        .into_boxed();
    let query = match (regie_id, entreprise_id) {
        (Some(id), _) => query.filter(abonnements::regie_id.eq(id)),
        (None, Some(id)) => query.filter(abonnements::entreprise_id.eq(id)),
        (None, None) => return Ok(0),
    };
    query.count().get_result(conn)
}

pub fn create_abonnement(
    conn: &mut SqliteConnection,
    actor: &Actor,
    input: AbonnementInput,
) -> Result<Abonnement, AppError> {
    conn.transaction(|conn| {
        let (regie_id, entreprise_id) = subscriber_for(conn, actor, &input)?;
        let plan = require_plan(conn, &input.plan_code)?;

        if active_count(conn, regie_id, entreprise_id)? > 0 {
            return Err(AppError::conflict("Subscriber already has an active abonnement"));
        }

        diesel::insert_into(abonnements::table)
            .values(&NewAbonnement {
                regie_id,
                entreprise_id,
                plan_code: plan.code.clone(),
                date_debut: Utc::now().naive_utc(),
            })
            .execute(conn)?;
        let abonnement: Abonnement = abonnements::table
            .find(last_insert_rowid(conn)?)
            .first(conn)?;

        info!(
            "Abonnement {} created on plan {} (regie={:?}, entreprise={:?})",
            abonnement.id, plan.code, regie_id, entreprise_id
        );
        Ok(abonnement)
    })
}

/// Loads an abonnement the actor owns. Another organisation's row is
/// reported as not found.
fn owned_abonnement(
    conn: &mut SqliteConnection,
    actor: &Actor,
    abonnement_id: i32,
) -> Result<Abonnement, AppError> {
    if matches!(actor.role, Role::Locataire | Role::Technicien) {
        return Err(AppError::forbidden("Only régies and entreprises hold abonnements"));
    }
    let abonnement: Abonnement = abonnements::table
        .find(abonnement_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("Abonnement"))?;
    if actor.owns_subscription(abonnement.regie_id, abonnement.entreprise_id) {
        Ok(abonnement)
    } else {
        Err(AppError::not_found("Abonnement"))
    }
}

pub fn upgrade_abonnement(
    conn: &mut SqliteConnection,
    actor: &Actor,
    abonnement_id: i32,
    plan_code: &str,
) -> Result<Abonnement, AppError> {
    conn.transaction(|conn| {
        let abonnement = owned_abonnement(conn, actor, abonnement_id)?;
        if AbonnementStatus::from_stored(&abonnement.statut)? != AbonnementStatus::Actif {
            return Err(AppError::bad_request("Only an active abonnement can be upgraded"));
        }

        let current = require_plan(conn, &abonnement.plan_code)?;
        let target = require_plan(conn, plan_code)?;
        if target.rang <= current.rang {
            return Err(AppError::bad_request("Upgrade must move to a higher plan"));
        }

        diesel::update(abonnements::table.find(abonnement.id))
            .set((
                abonnements::plan_code.eq(&target.code),
                abonnements::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;

        info!(
            "Abonnement {} upgraded from {} to {}",
            abonnement.id, current.code, target.code
        );
        Ok(abonnements::table.find(abonnement.id).first(conn)?)
    })
}

pub fn cancel_abonnement(
    conn: &mut SqliteConnection,
    actor: &Actor,
    abonnement_id: i32,
) -> Result<Abonnement, AppError> {
    conn.transaction(|conn| {
        let abonnement = owned_abonnement(conn, actor, abonnement_id)?;
        let from = AbonnementStatus::from_stored(&abonnement.statut)?;
        ensure_transition(from, AbonnementStatus::Resilie)?;

        let now = Utc::now().naive_utc();
        diesel::update(abonnements::table.find(abonnement.id))
            .set((
                abonnements::statut.eq(AbonnementStatus::Resilie.as_str()),
                abonnements::date_fin.eq(Some(now)),
                abonnements::updated_at.eq(now),
            ))
            .execute(conn)?;
        Ok(abonnements::table.find(abonnement.id).first(conn)?)
    })
}

/// Moves an abonnement between `actif` and `suspendu`. Administrators only.
fn set_suspension(
    conn: &mut SqliteConnection,
    actor: &Actor,
    abonnement_id: i32,
    to: AbonnementStatus,
) -> Result<Abonnement, AppError> {
    if actor.role != Role::AdminJtec {
        return Err(AppError::forbidden("Only an administrator can suspend abonnements"));
    }
    conn.transaction(|conn| {
        let abonnement: Abonnement = abonnements::table
            .find(abonnement_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("Abonnement"))?;
        let from = AbonnementStatus::from_stored(&abonnement.statut)?;
        ensure_transition(from, to)?;

        if to == AbonnementStatus::Actif
            && active_count(conn, abonnement.regie_id, abonnement.entreprise_id)? > 0
        {
            return Err(AppError::conflict("Subscriber already has an active abonnement"));
        }

        diesel::update(abonnements::table.find(abonnement.id))
            .set((
                abonnements::statut.eq(to.as_str()),
                abonnements::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;

        info!("Abonnement {} moved from {} to {}", abonnement.id, from, to);
        Ok(abonnements::table.find(abonnement.id).first(conn)?)
    })
}

pub fn suspend_abonnement(
    conn: &mut SqliteConnection,
    actor: &Actor,
    abonnement_id: i32,
) -> Result<Abonnement, AppError> {
    set_suspension(conn, actor, abonnement_id, AbonnementStatus::Suspendu)
}

pub fn reactivate_abonnement(
    conn: &mut SqliteConnection,
    actor: &Actor,
    abonnement_id: i32,
) -> Result<Abonnement, AppError> {
    set_suspension(conn, actor, abonnement_id, AbonnementStatus::Actif)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::{actor_for, setup_seeded_test_db};

    fn admin() -> Actor {
        Actor {
            profile_id: 0,
            role: Role::AdminJtec,
            regie_id: None,
            entreprise_id: None,
            technicien_id: None,
        }
    }

    fn input(plan_code: &str, regie_id: Option<i32>, entreprise_id: Option<i32>) -> AbonnementInput {
        AbonnementInput {
            plan_code: plan_code.to_string(),
            regie_id,
            entreprise_id,
        }
    }

    #[test]
    fn test_plans_are_ordered_by_rang() {
        let mut conn = setup_seeded_test_db();
        let codes: Vec<String> = list_plans(&mut conn).unwrap().into_iter().map(|p| p.code).collect();
        assert_eq!(codes, vec!["essentiel", "pro", "premium"]);
    }

    #[test]
    fn test_self_subscription_rules() {
        let mut conn = setup_seeded_test_db();
        let entreprise = actor_for(&mut conn, "entreprise@plomberie.ch");
        let own = entreprise.entreprise_id;

        let err = create_abonnement(&mut conn, &entreprise, input("pro", None, Some(own.unwrap() + 1))).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = create_abonnement(&mut conn, &entreprise, input("gold", None, None)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let abonnement = create_abonnement(&mut conn, &entreprise, input("pro", None, own)).unwrap();
        assert_eq!(abonnement.entreprise_id, own);
        assert_eq!(abonnement.statut, "actif");

        let err = create_abonnement(&mut conn, &entreprise, input("premium", None, None)).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let locataire = actor_for(&mut conn, "locataire@lac.ch");
        let err = create_abonnement(&mut conn, &locataire, input("pro", None, None)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_admin_must_name_one_subscriber() {
        let mut conn = setup_seeded_test_db();
        let montagne = actor_for(&mut conn, "regie@montagne.ch").regie_id;
        let plomberie = actor_for(&mut conn, "entreprise@plomberie.ch").entreprise_id;

        let err = create_abonnement(&mut conn, &admin(), input("pro", None, None)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = create_abonnement(&mut conn, &admin(), input("pro", montagne, plomberie)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let abonnement = create_abonnement(&mut conn, &admin(), input("pro", montagne, None)).unwrap();
        assert_eq!(abonnement.regie_id, montagne);
        assert_eq!(list_abonnements(&mut conn, &admin()).unwrap().len(), 2);
    }

    #[test]
    fn test_upgrade_only_moves_up() {
        let mut conn = setup_seeded_test_db();
        let regie = actor_for(&mut conn, "regie@lac.ch");
        let abonnement = list_abonnements(&mut conn, &regie).unwrap().remove(0);
        assert_eq!(abonnement.plan_code, "essentiel");

        let err = upgrade_abonnement(&mut conn, &regie, abonnement.id, "essentiel").unwrap_err();
        assert_eq!(err.to_string(), "Upgrade must move to a higher plan");

        let upgraded = upgrade_abonnement(&mut conn, &regie, abonnement.id, "premium").unwrap();
        assert_eq!(upgraded.plan_code, "premium");
        let err = upgrade_abonnement(&mut conn, &regie, abonnement.id, "pro").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let other = actor_for(&mut conn, "regie@montagne.ch");
        let err = upgrade_abonnement(&mut conn, &other, abonnement.id, "premium").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_resilier_ends_subscription() {
        let mut conn = setup_seeded_test_db();
        let regie = actor_for(&mut conn, "regie@lac.ch");
        let abonnement = list_abonnements(&mut conn, &regie).unwrap().remove(0);

        let ended = cancel_abonnement(&mut conn, &regie, abonnement.id).unwrap();
        assert_eq!(ended.statut, "resilie");
        assert!(ended.date_fin.is_some());

        let err = upgrade_abonnement(&mut conn, &regie, abonnement.id, "pro").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = cancel_abonnement(&mut conn, &regie, abonnement.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        // A new subscription is allowed once the old one is over.
        create_abonnement(&mut conn, &regie, input("pro", None, None)).unwrap();
    }

    #[test]
    fn test_suspend_and_reactivate() {
        let mut conn = setup_seeded_test_db();
        let regie = actor_for(&mut conn, "regie@lac.ch");
        let abonnement = list_abonnements(&mut conn, &regie).unwrap().remove(0);

        let err = suspend_abonnement(&mut conn, &regie, abonnement.id).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = suspend_abonnement(&mut conn, &admin(), 9999).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let suspended = suspend_abonnement(&mut conn, &admin(), abonnement.id).unwrap();
        assert_eq!(suspended.statut, "suspendu");
        let err = suspend_abonnement(&mut conn, &admin(), abonnement.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        let err = upgrade_abonnement(&mut conn, &regie, abonnement.id, "pro").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let active = reactivate_abonnement(&mut conn, &admin(), abonnement.id).unwrap();
        assert_eq!(active.statut, "actif");
        assert_eq!(active.plan_code, "essentiel");
        let err = reactivate_abonnement(&mut conn, &admin(), abonnement.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        // A suspended abonnement can still be ended
        suspend_abonnement(&mut conn, &admin(), abonnement.id).unwrap();
        let ended = cancel_abonnement(&mut conn, &regie, abonnement.id).unwrap();
        assert_eq!(ended.statut, "resilie");
        let err = reactivate_abonnement(&mut conn, &admin(), abonnement.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn test_reactivation_respects_single_active() {
        let mut conn = setup_seeded_test_db();
        let regie = actor_for(&mut conn, "regie@lac.ch");
        let old = list_abonnements(&mut conn, &regie).unwrap().remove(0);

        suspend_abonnement(&mut conn, &admin(), old.id).unwrap();
        create_abonnement(&mut conn, &regie, input("pro", None, None)).unwrap();

        let err = reactivate_abonnement(&mut conn, &admin(), old.id).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
