//! In-app notifications.
//!
//! Notifications are written by the lifecycle procedures inside their own
//! transaction, so a rolled back transition never leaves a stray
//! notification behind.

use chrono::Utc;
use diesel::prelude::*;

use crate::error::AppError;
use crate::models::{NewNotification, Notification};
use crate::schema::notifications;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

pub mod kind {
    pub const TICKET_CREE: &str = "ticket_cree";
    pub const TICKET_ANNULE: &str = "ticket_annule";
    pub const MISSION_ASSIGNEE: &str = "mission_assignee";
    pub const TECHNICIEN_ASSIGNE: &str = "technicien_assigne";
    pub const MISSION_DEMARREE: &str = "mission_demarree";
    pub const MISSION_TERMINEE: &str = "mission_terminee";
    pub const MISSION_VALIDEE: &str = "mission_validee";
    pub const MISSION_ANNULEE: &str = "mission_annulee";
    pub const FACTURE_ENVOYEE: &str = "facture_envoyee";
    pub const FACTURE_PAYEE: &str = "facture_payee";
    pub const NOUVEAU_MESSAGE: &str = "nouveau_message";
}

/// Rows a notification points at.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationRefs {
    pub ticket_id: Option<i32>,
    pub mission_id: Option<i32>,
    pub facture_id: Option<i32>,
}

/// Inserts one notification per recipient. Duplicate ids are notified once.
pub fn notify(
    conn: &mut SqliteConnection,
    recipients: &[i32],
    kind: &str,
    titre: &str,
    message: &str,
    refs: NotificationRefs,
) -> QueryResult<usize> {
    let mut recipients = recipients.to_vec();
    recipients.sort_unstable();
    recipients.dedup();

    let rows: Vec<NewNotification> = recipients
        .into_iter()
        .map(|profile_id| NewNotification {
            profile_id,
            kind: kind.to_string(),
            titre: titre.to_string(),
            message: message.to_string(),
            ticket_id: refs.ticket_id,
            mission_id: refs.mission_id,
            facture_id: refs.facture_id,
        })
        .collect();

    if rows.is_empty() {
        return Ok(0);
    }
    diesel::insert_into(notifications::table)
        .values(&rows)
        .execute(conn)
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// A profile's notifications, newest first.
pub fn list_notifications(
    conn: &mut SqliteConnection,
    profile_id: i32,
    unread_only: bool,
    limit: i64,
) -> QueryResult<Vec<Notification>> {
    let mut query = notifications::table
        .filter(notifications::profile_id.eq(profile_id))
        .into_boxed();
    if unread_only {
        query = query.filter(notifications::is_read.eq(false));
    }
    query
        .order((notifications::created_at.desc(), notifications::id.desc()))
        .limit(limit)
        .load(conn)
}

pub fn count_unread(conn: &mut SqliteConnection, profile_id: i32) -> QueryResult<i64> {
    notifications::table
        .filter(notifications::profile_id.eq(profile_id))
        .filter(notifications::is_read.eq(false))
        .count()
        .get_result(conn)
}

/// Marks one of the caller's notifications as read. Reading it again keeps
/// the first `read_at`.
pub fn mark_read(
    conn: &mut SqliteConnection,
    profile_id: i32,
    notification_id: i32,
) -> Result<Notification, AppError> {
    conn.transaction(|conn| {
        let notification: Notification = notifications::table
            .find(notification_id)
            .filter(notifications::profile_id.eq(profile_id))
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("Notification"))?;

        if notification.is_read {
            return Ok(notification);
        }

        diesel::update(notifications::table.find(notification_id))
            .set((
                notifications::is_read.eq(true),
                notifications::read_at.eq(Some(Utc::now().naive_utc())),
            ))
            .execute(conn)?;
        Ok(notifications::table.find(notification_id).first(conn)?)
    })
}

pub fn mark_all_read(conn: &mut SqliteConnection, profile_id: i32) -> QueryResult<usize> {
    diesel::update(
        notifications::table
            .filter(notifications::profile_id.eq(profile_id))
            .filter(notifications::is_read.eq(false)),
    )
    .set((
        notifications::is_read.eq(true),
        notifications::read_at.eq(Some(Utc::now().naive_utc())),
    ))
    .execute(conn)
}
