// HTTP routes
pub mod companies;
pub mod drive;
pub mod health;
pub mod sheets;

pub use companies::*;
pub use drive::*;
pub use health::*;
pub use sheets::*;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Successful response envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
