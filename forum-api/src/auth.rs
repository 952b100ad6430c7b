use uuid::Uuid;

use crate::{Comment, Error, Post, UserId, STUB_UUID};

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewSession {
    pub login: String,
    pub password: String,
    pub device: String,
}

impl NewSession {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.login)?;
        crate::validate_string(&self.password)?;
        crate::validate_string(&self.device)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AuthToken(pub Uuid);

impl AuthToken {
    pub fn stub() -> AuthToken {
        AuthToken(STUB_UUID)
    }
}

/// Whether `viewer` may edit or delete something written by `author`.
///
/// Anonymous viewers never can.
pub fn can_modify(viewer: Option<UserId>, author: UserId) -> bool {
    viewer == Some(author)
}

pub trait Authored {
    fn author_id(&self) -> UserId;

    fn can_be_modified_by(&self, viewer: Option<UserId>) -> bool {
        can_modify(viewer, self.author_id())
    }
}

impl Authored for Post {
    fn author_id(&self) -> UserId {
        self.author.id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> UserId {
        self.author.id
    }
}
