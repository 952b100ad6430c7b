use uuid::Uuid;

use crate::{Error, Time, User, STUB_UUID};

pub const TITLE_MAX_LEN: usize = 255;

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn stub() -> PostId {
        PostId(STUB_UUID)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Post {
    pub id: PostId,
    pub author: User,
    pub title: String,
    pub body: String,
    pub sticky: bool,
    pub created_at: Time,
    pub modified_at: Time,
}

/// Contents of a post, as submitted when writing or editing it
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub sticky: bool,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_required("title", &self.title)?;
        crate::validate_required("body", &self.body)?;
        if self.title.chars().count() > TITLE_MAX_LEN {
            return Err(Error::FieldTooLong(String::from("title")));
        }
        Ok(())
    }
}
