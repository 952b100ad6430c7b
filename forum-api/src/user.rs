use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use crate::{Error, Time, STUB_UUID};

lazy_static! {
    static ref LOGIN_PATTERN: Regex = Regex::new(concat!(
        r"^[-_.a-z0-9\x{1100}-\x{11ff}\x{3131}-\x{318e}",
        r"\x{3200}-\x{321e}\x{3260}-\x{327e}\x{a960}-\x{a97c}",
        r"\x{ac00}-\x{d7a3}\x{d7b0}-\x{d7c6}\x{d7cb}-\x{d7fb}",
        r"\x{ffa0}-\x{ffbe}\x{ffc2}-\x{ffc7}\x{ffca}-\x{ffcf}",
        r"\x{ffd2}-\x{ffd7}\x{ffda}-\x{ffdc}]{2,45}$",
    ))
    .expect("compiling login pattern");
    static ref EMAIL_PATTERN: Regex = Regex::new(concat!(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+",
        r"(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@",
        r"(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+",
        r"[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$",
    ))
    .expect("compiling email pattern");
    static ref URL_PATTERN: Regex =
        Regex::new(r"(?i)^https?://[^\s/?#@]+(?:[/?#]\S*)?$").expect("compiling url pattern");
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn stub() -> UserId {
        UserId(STUB_UUID)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct User {
    pub id: UserId,
    pub login: String,
    pub name: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Profile {
    pub user: User,
    pub email: Option<String>,
    pub url: Option<String>,
    pub created_at: Time,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewUser {
    pub id: UserId,
    pub login: String,
    pub name: String,
    pub email: Option<String>,

    /// Personal website shown on the profile
    #[serde(default)]
    pub url: Option<String>,

    pub initial_password_hash: String,
}

impl NewUser {
    pub fn new(
        id: UserId,
        login: String,
        name: String,
        email: Option<String>,
        initial_password: String,
    ) -> NewUser {
        NewUser {
            id,
            login,
            name,
            email,
            url: None,
            initial_password_hash: bcrypt::hash(&initial_password, bcrypt::DEFAULT_COST)
                .expect("failed hashing password"),
        }
    }

    pub fn with_url(self, url: Option<String>) -> NewUser {
        NewUser { url, ..self }
    }

    /// Normalizes the login, email and url, then checks every field
    pub fn validate(&mut self) -> Result<(), Error> {
        crate::validate_string(&self.initial_password_hash)?;
        self.login = normalize_login(&self.login)?;
        crate::validate_required("name", &self.name)?;
        if let Some(email) = self.email.take() {
            self.email = Some(normalize_email(&email)?);
        }
        if let Some(url) = self.url.take() {
            self.url = Some(normalize_url(&url)?);
        }
        Ok(())
    }
}

/// Trims and lower-cases a login name, failing if it is not a valid one
pub fn normalize_login(login: &str) -> Result<String, Error> {
    crate::validate_string(login)?;
    let login = login.trim().to_lowercase();
    if LOGIN_PATTERN.is_match(&login) {
        Ok(login)
    } else {
        Err(Error::InvalidName(login))
    }
}

pub fn normalize_email(email: &str) -> Result<String, Error> {
    crate::validate_string(email)?;
    let email = email.trim();
    if EMAIL_PATTERN.is_match(email) {
        Ok(String::from(email))
    } else {
        Err(Error::InvalidEmail(String::from(email)))
    }
}

/// Trims a website address, which must be an absolute http or https one
pub fn normalize_url(url: &str) -> Result<String, Error> {
    crate::validate_string(url)?;
    let url = url.trim();
    if URL_PATTERN.is_match(url) {
        Ok(String::from(url))
    } else {
        Err(Error::InvalidUrl(String::from(url)))
    }
}
