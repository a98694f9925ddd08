use actix_web::{
    error::ResponseError,
    http::{
        header::{ContentType, WWW_AUTHENTICATE},
        StatusCode,
    },
    HttpResponse,
};
use storefront_engine::{helpers::SignatureError, FulfilmentError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("The payment provider could not create a payment link. {0}")]
    PaymentLinkFailure(String),
    #[error("Webhook rejected. {0}")]
    Signature(#[from] SignatureError),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentLinkFailure(_) => StatusCode::BAD_GATEWAY,
            Self::Signature(e) => match e {
                SignatureError::MissingSignature => StatusCode::BAD_REQUEST,
                SignatureError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
                SignatureError::InvalidSignature => StatusCode::UNAUTHORIZED,
                SignatureError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::AuthenticationError(e) => match e {
                AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // The provider re-delivers webhooks that did not succeed, which is what we want until someone reconciles.
            Self::Conflict(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        response.insert_header(ContentType::json());
        if self.status_code() == StatusCode::UNAUTHORIZED && matches!(self, Self::AuthenticationError(_)) {
            response.insert_header((WWW_AUTHENTICATE, "Basic realm=\"storefront\""));
        }
        response.body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No credentials were provided.")]
    MissingCredentials,
    #[error("The credentials are not valid.")]
    InvalidCredentials,
    #[error("Administration is not configured on this server.")]
    NotConfigured,
}

impl From<FulfilmentError> for ServerError {
    fn from(e: FulfilmentError) -> Self {
        match e {
            FulfilmentError::Validation(_) | FulfilmentError::UnknownSku(_) | FulfilmentError::Capacity { .. } => {
                Self::Validation(e.to_string())
            },
            FulfilmentError::Conflict { .. } => Self::Conflict(e.to_string()),
            FulfilmentError::NotFound(s) => Self::NoRecordFound(s),
            FulfilmentError::PaymentLink(s) => Self::PaymentLinkFailure(s),
            FulfilmentError::Backend(s) => Self::BackendError(s),
        }
    }
}
