//! REST API module.
//!
//! Contains the drink handlers and the success envelopes they return.

mod drinks;

pub use drinks::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success envelope carrying a list of drinks.
#[derive(Debug, Serialize)]
pub struct DrinksResponse<T: Serialize> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T: Serialize> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

impl<T: Serialize> IntoResponse for DrinksResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Success envelope for a deletion.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: i64,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<T, AppError>;
