//! Invoice amount computation.
//!
//! Amounts are integer cents and rates are basis points (1/100 of a
//! percent). Products are rounded half-up so that a recomputation always
//! reproduces the stored figures.

use serde::Serialize;
use ts_rs::TS;

use crate::error::AppError;

pub const BASIS_POINTS: i64 = 10_000;

/// Commission of a régie created without an explicit rate (10 %).
pub const DEFAULT_COMMISSION_RATE_BP: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct FactureAmounts {
    pub montant_ht: i64,
    pub montant_tva: i64,
    pub montant_ttc: i64,
    pub montant_commission: i64,
}

/// `amount * rate_bp / 10000`, rounded half-up.
pub fn apply_rate(amount: i64, rate_bp: i32) -> i64 {
    let product = i128::from(amount) * i128::from(rate_bp);
    let half = i128::from(BASIS_POINTS / 2);
    ((product + half) / i128::from(BASIS_POINTS)) as i64
}

pub fn compute_amounts(
    montant_ht: i64,
    taux_tva_bp: i32,
    taux_commission_bp: i32,
) -> Result<FactureAmounts, AppError> {
    if montant_ht < 0 {
        return Err(AppError::bad_request("montant_ht must not be negative"));
    }
    if !(0..=10_000).contains(&taux_tva_bp) || !(0..=10_000).contains(&taux_commission_bp) {
        return Err(AppError::bad_request("Rates must be between 0 and 10000 basis points"));
    }

    let montant_tva = apply_rate(montant_ht, taux_tva_bp);
    let montant_ttc = montant_ht
        .checked_add(montant_tva)
        .ok_or_else(|| AppError::bad_request("montant_ht is too large"))?;
    Ok(FactureAmounts {
        montant_ht,
        montant_tva,
        montant_ttc,
        montant_commission: apply_rate(montant_ht, taux_commission_bp),
    })
}

/// Invoice numbers are `FAC-<year>-<sequence>` with a five digit sequence.
pub fn format_numero(year: i32, sequence: i64) -> String {
    format!("FAC-{}-{:05}", year, sequence)
}

/// Prefix shared by every invoice number of a given year.
pub fn numero_prefix(year: i32) -> String {
    format!("FAC-{}-", year)
}

/// Formats cents as a decimal amount, e.g. `12345` -> `123.45`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
