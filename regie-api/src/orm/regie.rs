use diesel::prelude::*;

use crate::models::{NewRegie, Regie};
use crate::orm::last_insert_rowid;
use crate::schema::regies;

pub fn insert_regie(conn: &mut SqliteConnection, new_regie: NewRegie) -> QueryResult<Regie> {
    diesel::insert_into(regies::table)
        .values(&new_regie)
        .execute(conn)?;
    let id = last_insert_rowid(conn)?;
    regies::table.find(id).first(conn)
}

pub fn get_regie(conn: &mut SqliteConnection, regie_id: i32) -> QueryResult<Option<Regie>> {
    regies::table.find(regie_id).first(conn).optional()
}

pub fn get_regie_by_name(conn: &mut SqliteConnection, nom: &str) -> QueryResult<Option<Regie>> {
    regies::table
        .filter(regies::nom.eq(nom))
        .first(conn)
        .optional()
}

pub fn list_regies(conn: &mut SqliteConnection) -> QueryResult<Vec<Regie>> {
    regies::table.order(regies::nom.asc()).load(conn)
}
