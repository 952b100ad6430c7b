use askama::Template;
use axum::{
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
};
use forum_api::{Error as ApiError, Uuid};

use crate::{
    pages::ErrorPage,
    routes::{Routes, Urls},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn permission_denied() -> Error {
        Error::Api(ApiError::PermissionDenied)
    }

    pub fn sign_in_required() -> Error {
        Error::Api(ApiError::SignInRequired)
    }

    pub fn not_found() -> Error {
        Error::Api(ApiError::NotFound)
    }

    pub fn not_acceptable() -> Error {
        Error::Api(ApiError::NotAcceptable)
    }

    pub fn uuid_already_used(uuid: Uuid) -> Error {
        Error::Api(ApiError::UuidAlreadyUsed(uuid))
    }

    pub fn name_already_used(name: String) -> Error {
        Error::Api(ApiError::NameAlreadyUsed(name))
    }

    /// Logs the error and turns it into what the client gets to see
    fn into_api_error(self) -> ApiError {
        match self {
            Error::Anyhow(err) => {
                tracing::error!(?err, "internal server error");
                #[cfg(not(test))]
                let err =
                    ApiError::Unknown(String::from("Internal server error, see logs for details"));
                #[cfg(test)]
                let err = ApiError::Unknown(format!("Internal server error: {err:?}"));
                err
            }
            Error::Api(err) => {
                tracing::info!("returning error to client: {err}");
                err
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let err = self.into_api_error();
        if err == ApiError::SignInRequired {
            return Redirect::to(&Routes.signin_form()).into_response();
        }
        match ErrorPage::new(&err).render() {
            Ok(page) => (err.status_code(), Html(page)).into_response(),
            Err(e) => {
                tracing::error!(?e, "failed rendering error page");
                (err.status_code(), err.to_string()).into_response()
            }
        }
    }
}

/// Error answered as JSON, for the API routes
#[derive(Debug)]
pub struct JsonError(pub Error);

impl From<Error> for JsonError {
    fn from(e: Error) -> JsonError {
        JsonError(e)
    }
}

impl From<ApiError> for JsonError {
    fn from(e: ApiError) -> JsonError {
        JsonError(Error::Api(e))
    }
}

impl From<anyhow::Error> for JsonError {
    fn from(e: anyhow::Error) -> JsonError {
        JsonError(Error::Anyhow(e))
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let err = self.0.into_api_error();
        (
            err.status_code(),
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            err.contents(),
        )
            .into_response()
    }
}
