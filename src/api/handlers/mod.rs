pub mod auth;
pub mod cases;
pub mod clients;
pub mod consultations;
pub mod favorites;
pub mod files;
pub mod health;
pub mod reports;
pub mod services;

use serde::Serialize;
use utoipa::ToSchema;

/// Plain acknowledgment body used by logout and delete endpoints
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
