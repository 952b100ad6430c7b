use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Signing in is required")]
    SignInRequired,

    #[error("Not found")]
    NotFound,

    #[error("No acceptable content type")]
    NotAcceptable,

    #[error("Uuid already used {0}")]
    UuidAlreadyUsed(Uuid),

    #[error("Name already used {0}")]
    NameAlreadyUsed(String),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Invalid login name {0:?}")]
    InvalidName(String),

    #[error("Invalid email address {0:?}")]
    InvalidEmail(String),

    #[error("Invalid website address {0:?}")]
    InvalidUrl(String),

    #[error("Missing required field {0:?}")]
    MissingField(String),

    #[error("Field is too long {0:?}")]
    FieldTooLong(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::SignInRequired => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Error::UuidAlreadyUsed(_) => StatusCode::CONFLICT,
            Error::NameAlreadyUsed(_) => StatusCode::CONFLICT,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::InvalidName(_) => StatusCode::BAD_REQUEST,
            Error::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            Error::MissingField(_) => StatusCode::BAD_REQUEST,
            Error::FieldTooLong(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::SignInRequired => json!({
                "message": "signing in is required",
                "type": "sign-in-required",
            }),
            Error::NotFound => json!({
                "message": "not found",
                "type": "not-found",
            }),
            Error::NotAcceptable => json!({
                "message": "no acceptable content type",
                "type": "not-acceptable",
            }),
            Error::UuidAlreadyUsed(u) => json!({
                "message": "uuid conflict",
                "type": "conflict-uuid",
                "uuid": u,
            }),
            Error::NameAlreadyUsed(n) => json!({
                "message": "name already used",
                "type": "conflict-name",
                "name": n,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::InvalidName(n) => json!({
                "message": "there was an invalid character in a login name",
                "type": "invalid-name",
                "name": n,
            }),
            Error::InvalidEmail(e) => json!({
                "message": "invalid email address",
                "type": "invalid-email",
                "email": e,
            }),
            Error::InvalidUrl(u) => json!({
                "message": "invalid website address",
                "type": "invalid-url",
                "url": u,
            }),
            Error::MissingField(f) => json!({
                "message": "a required field was left empty",
                "type": "missing-field",
                "field": f,
            }),
            Error::FieldTooLong(f) => json!({
                "message": "a field was longer than allowed",
                "type": "field-too-long",
                "field": f,
            }),
        })
        .expect("serializing error")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let field = |name: &str| -> anyhow::Result<String> {
            data.get(name)
                .and_then(|v| v.as_str())
                .map(String::from)
                .ok_or_else(|| anyhow!("error contents lacks a {name:?} string"))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(field("message").unwrap_or_default()),
                "permission-denied" => Error::PermissionDenied,
                "sign-in-required" => Error::SignInRequired,
                "not-found" => Error::NotFound,
                "not-acceptable" => Error::NotAcceptable,
                "conflict-uuid" => Error::UuidAlreadyUsed(
                    Uuid::from_str(&field("uuid")?).context("parsing conflicting uuid")?,
                ),
                "conflict-name" => Error::NameAlreadyUsed(field("name")?),
                "null-byte" => Error::NullByteInString(field("string")?),
                "invalid-name" => Error::InvalidName(field("name")?),
                "invalid-email" => Error::InvalidEmail(field("email")?),
                "invalid-url" => Error::InvalidUrl(field("url")?),
                "missing-field" => Error::MissingField(field("field")?),
                "field-too-long" => Error::FieldTooLong(field("field")?),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
