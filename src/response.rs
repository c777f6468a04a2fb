//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub status: &'static str,
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub status: &'static str,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u64,
}

impl Pagination {
    pub fn new(current_page: u32, per_page: u32, total: u64) -> Self {
        let per = u64::from(per_page.max(1));
        Pagination {
            current_page,
            per_page,
            total,
            last_page: total.div_ceil(per).max(1),
        }
    }
}

#[derive(Serialize)]
pub struct SuccessMessage {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { status: "success", data }))
}

pub fn success_many<T: Serialize>(data: Vec<T>, pagination: Pagination) -> (StatusCode, Json<SuccessMany<T>>) {
    (
        StatusCode::OK,
        Json(SuccessMany {
            status: "success",
            data,
            pagination,
        }),
    )
}

pub fn created(id: Value) -> (StatusCode, Json<SuccessMessage>) {
    (
        StatusCode::CREATED,
        Json(SuccessMessage {
            status: "success",
            message: "Record created successfully",
            id: Some(id),
        }),
    )
}

pub fn success_message(message: &'static str) -> (StatusCode, Json<SuccessMessage>) {
    (
        StatusCode::OK,
        Json(SuccessMessage {
            status: "success",
            message,
            id: None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_rounds_up_and_is_at_least_one() {
        assert_eq!(Pagination::new(1, 20, 41).last_page, 3);
        assert_eq!(Pagination::new(1, 20, 0).last_page, 1);
    }
}
