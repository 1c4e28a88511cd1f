use diesel::prelude::*;

use crate::models::{Entreprise, NewEntreprise};
use crate::orm::last_insert_rowid;
use crate::schema::entreprises;

pub fn insert_entreprise(
    conn: &mut SqliteConnection,
    new_entreprise: NewEntreprise,
) -> QueryResult<Entreprise> {
    diesel::insert_into(entreprises::table)
        .values(&new_entreprise)
        .execute(conn)?;
    let id = last_insert_rowid(conn)?;
    entreprises::table.find(id).first(conn)
}

pub fn get_entreprise(
    conn: &mut SqliteConnection,
    entreprise_id: i32,
) -> QueryResult<Option<Entreprise>> {
    entreprises::table.find(entreprise_id).first(conn).optional()
}

pub fn get_entreprise_by_name(
    conn: &mut SqliteConnection,
    nom: &str,
) -> QueryResult<Option<Entreprise>> {
    entreprises::table
        .filter(entreprises::nom.eq(nom))
        .first(conn)
        .optional()
}

pub fn list_entreprises(conn: &mut SqliteConnection) -> QueryResult<Vec<Entreprise>> {
    entreprises::table.order(entreprises::nom.asc()).load(conn)
}
