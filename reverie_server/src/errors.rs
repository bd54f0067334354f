use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::*;
use reverie_engine::MarketError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Timeout(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
}

impl From<MarketError> for ServerError {
    fn from(e: MarketError) -> Self {
        match e {
            MarketError::ValidationError(_) => Self::ValidationError(e.to_string()),
            MarketError::NotFound(_) => Self::NoRecordFound(e.to_string()),
            MarketError::NotPermitted(_) => Self::InsufficientPermissions(e.to_string()),
            MarketError::InvalidTransition { .. } |
            MarketError::InsufficientResource { .. } |
            MarketError::AlreadyInitialized(_) |
            MarketError::UserAlreadyExists(_) => Self::Conflict(e.to_string()),
            MarketError::StoreTimeout(_) => Self::Timeout(e.to_string()),
            MarketError::StoreError(_) => Self::BackendError(e.to_string()),
            MarketError::PartialCommit { .. } => {
                error!("🚨️ {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use reverie_common::Category;
    use reverie_engine::{db_types::PostStatus, ResourceBound};

    use super::*;

    #[test]
    fn market_errors_map_to_status_codes() {
        let cases = [
            (MarketError::ValidationError("bad".into()), StatusCode::BAD_REQUEST),
            (MarketError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (MarketError::NotPermitted("no".into()), StatusCode::FORBIDDEN),
            (
                MarketError::InvalidTransition { expected: PostStatus::Open, actual: PostStatus::Ongoing },
                StatusCode::CONFLICT,
            ),
            (MarketError::insufficient(ResourceBound::VendorStock, vec![Category::Crane]), StatusCode::CONFLICT),
            (MarketError::AlreadyInitialized("v@x.y".into()), StatusCode::CONFLICT),
            (MarketError::StoreTimeout(Duration::from_secs(5)), StatusCode::GATEWAY_TIMEOUT),
            (MarketError::StoreError("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status_code(), status);
        }
        let unauth = ServerError::AuthenticationError(AuthError::MissingToken);
        assert_eq!(unauth.status_code(), StatusCode::UNAUTHORIZED);
    }
}
