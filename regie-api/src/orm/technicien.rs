use diesel::prelude::*;

use crate::models::{NewTechnicien, Technicien};
use crate::orm::last_insert_rowid;
use crate::schema::techniciens;

pub fn insert_technicien(
    conn: &mut SqliteConnection,
    new_technicien: NewTechnicien,
) -> QueryResult<Technicien> {
    diesel::insert_into(techniciens::table)
        .values(&new_technicien)
        .execute(conn)?;
    let id = last_insert_rowid(conn)?;
    techniciens::table.find(id).first(conn)
}

pub fn get_technicien(
    conn: &mut SqliteConnection,
    technicien_id: i32,
) -> QueryResult<Option<Technicien>> {
    techniciens::table.find(technicien_id).first(conn).optional()
}

pub fn get_technicien_by_profile(
    conn: &mut SqliteConnection,
    profile_id: i32,
) -> QueryResult<Option<Technicien>> {
    techniciens::table
        .filter(techniciens::profile_id.eq(profile_id))
        .first(conn)
        .optional()
}

/// All techniciens, or those of one entreprise.
pub fn list_techniciens(
    conn: &mut SqliteConnection,
    entreprise_id: Option<i32>,
) -> QueryResult<Vec<Technicien>> {
    let mut query = techniciens::table.into_boxed();
    if let Some(entreprise_id) = entreprise_id {
        query = query.filter(techniciens::entreprise_id.eq(entreprise_id));
    }
    query.order(techniciens::nom.asc()).load(conn)
}
