use rocket::Route;
use rocket::serde::json::Json;

use crate::envelope::{Envelope, ok};
use crate::error::AppError;
use crate::models::AdminStats;
use crate::orm::DbConn;
use crate::orm::stats::admin_stats;
use crate::session_guards::AdminUser;

/// Admin Stats endpoint.
///
/// - **URL:** `/api/1/admin/stats`
/// - **Method:** `GET`
/// - **Authentication:** Required, role `admin_jtec`
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "success": true,
///   "data": {
///     "regies": 2,
///     "entreprises": 2,
///     "techniciens": 2,
///     "locataires": 3,
///     "tickets_par_statut": { "nouveau": 4, "clos": 1 },
///     "missions_par_statut": { "validee": 1 },
///     "factures_par_statut": { "payee": 1 },
///     "chiffre_affaires_ttc": 120000,
///     "commissions": 10000,
///     "abonnements_actifs_par_plan": { "essentiel": 1 }
///   }
/// }
/// ```
#[get("/1/admin/stats")]
pub async fn admin_stats_endpoint(
    db: DbConn,
    _admin: AdminUser,
) -> Result<Json<Envelope<AdminStats>>, AppError> {
    Ok(ok(db.run(admin_stats).await?))
}

pub fn routes() -> Vec<Route> {
    routes![admin_stats_endpoint]
}
