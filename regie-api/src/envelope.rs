//! `success`/`data` response envelopes.

use rocket::serde::json::Json;
use serde::Serialize;

use crate::pagination::PageInfo;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
    })
}

pub fn paginated<T: Serialize>(data: Vec<T>, pagination: PageInfo) -> Json<Paginated<T>> {
    Json(Paginated {
        success: true,
        data,
        pagination,
    })
}
