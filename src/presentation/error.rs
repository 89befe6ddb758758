// Mapping of service errors onto HTTP responses
use crate::application::panel_service::PanelError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status = match &self {
            PanelError::NotFound(_) => StatusCode::NOT_FOUND,
            PanelError::InvalidConfig(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PanelError::Player(e) => {
                tracing::error!("Player error: {:#}", e);
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        (status, self.to_string()).into_response()
    }
}
