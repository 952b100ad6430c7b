mod auth;
pub use auth::{can_modify, Authored, AuthToken, NewSession};

mod comment;
pub use comment::{Comment, CommentId, CommentNode, NewComment};

mod error;
pub use error::Error;

mod pager;
pub use pager::{PageFlag, Pager, PagerIter};

mod post;
pub use post::{NewPost, Post, PostId, TITLE_MAX_LEN};

mod thread;
pub use thread::Thread;

mod user;
pub use user::{normalize_email, normalize_login, normalize_url, NewUser, Profile, User, UserId};

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<chrono::Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        Err(Error::NullByteInString(String::from(s)))
    } else {
        Ok(())
    }
}

/// Checks that a form field holds something other than whitespace
pub fn validate_required(field: &str, s: &str) -> Result<(), Error> {
    validate_string(s)?;
    if s.trim().is_empty() {
        return Err(Error::MissingField(String::from(field)));
    }
    Ok(())
}
