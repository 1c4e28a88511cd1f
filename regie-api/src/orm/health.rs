use diesel::prelude::*;
use diesel::sql_types::Integer;

#[derive(QueryableByName)]
struct Ping {
    #[diesel(sql_type = Integer)]
    ok: i32,
}

/// Round-trips `SELECT 1` through the connection.
pub fn ping(conn: &mut SqliteConnection) -> QueryResult<bool> {
    diesel::sql_query("SELECT 1 AS ok")
        .get_result::<Ping>(conn)
        .map(|row| row.ok == 1)
}
