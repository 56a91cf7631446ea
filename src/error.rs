//! Error handling


use std::env::VarError;
use std::io;
use std::result;

use actix_web::{HttpResponse, ResponseError};
use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use diesel::r2d2::PoolError;
use diesel::result::Error as DieselError;
use log::error;
use serde::Serialize;


/// Error type returned throughout the service
#[derive(Debug, Display)]
pub enum Error {

    /// Malformed or out-of-range request field
    #[display(fmt = "{}", _0)]
    Validation(String),

    /// Camera already exists at the requested intersection
    #[display(fmt = "{}", _0)]
    Conflict(String),

    /// Requested camera does not exist
    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "database error: {}", _0)]
    Database(DieselError),

    #[display(fmt = "connection pool error: {}", _0)]
    Pool(PoolError),

    #[display(fmt = "migration error: {}", _0)]
    Migration(Box<dyn std::error::Error + Send + Sync>),

    #[display(fmt = "blocking task failed: {}", _0)]
    Blocking(BlockingError),

    #[display(fmt = "environment error: {}", _0)]
    Env(VarError),

    /// Startup configuration is unusable
    #[display(fmt = "configuration error: {}", _0)]
    Config(String),

    #[display(fmt = "configuration file error: {}", _0)]
    Json(serde_json::Error),

    #[display(fmt = "I/O error: {}", _0)]
    Io(io::Error),
}

impl Error {

    /// Creates a validation error from any displayable message
    pub fn validation<M: ToString>(msg: M) -> Self {
        Error::Validation(msg.to_string())
    }
}

impl std::error::Error for Error {}

impl From<DieselError> for Error {
    fn from(err: DieselError) -> Self {
        Error::Database(err)
    }
}

impl From<PoolError> for Error {
    fn from(err: PoolError) -> Self {
        Error::Pool(err)
    }
}

impl From<BlockingError> for Error {
    fn from(err: BlockingError) -> Self {
        Error::Blocking(err)
    }
}

impl From<VarError> for Error {
    fn from(err: VarError) -> Self {
        Error::Env(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}


/// Body of every error response
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ResponseError for Error {

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::Conflict(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {

        let status = self.status_code();

        // Internal details stay in the log
        let detail = if status.is_server_error() {
            error!("request failed: {}", self);
            String::from("Internal server error")
        } else {
            self.to_string()
        };

        HttpResponse::build(status)
            .json(ErrorBody { detail })
    }
}


/// Result type used throughout the service
pub type Result<T> = result::Result<T, Error>;
