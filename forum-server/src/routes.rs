use forum_api::{CommentId, PostId};

pub const HOME: &str = "/";
pub const SIGNIN: &str = "/users/f/signin";
pub const SIGNOUT: &str = "/users/f/signout";
pub const PROFILE: &str = "/users/:login";
pub const POSTS: &str = "/posts/";
pub const WRITE: &str = "/posts/write";
pub const POST: &str = "/posts/:post_id";
pub const EDIT: &str = "/posts/:post_id/edit";
pub const COMMENTS: &str = "/posts/:post_id/comments";
pub const COMMENT: &str = "/posts/:post_id/comments/:comment_id";
pub const ADMIN_CREATE_USER: &str = "/api/admin/create-user";

/// Builds the addresses pages link to
pub trait Urls {
    fn user_profile(&self, login: &str) -> String;
    fn signin_form(&self) -> String;
    fn signout(&self) -> String;
    fn posts_page(&self, offset: usize, limit: usize) -> String;
    fn write_form(&self) -> String;
    fn post(&self, post: PostId) -> String;
    fn post_edit(&self, post: PostId) -> String;
    fn post_delete(&self, post: PostId) -> String;
    fn comment_form(&self, post: PostId) -> String;
    fn comment(&self, post: PostId, comment: CommentId) -> String;
    fn comment_delete(&self, post: PostId, comment: CommentId) -> String;
}

/// Addresses served by the router built in [`crate::router`]
#[derive(Clone, Copy, Debug, Default)]
pub struct Routes;

impl Urls for Routes {
    fn user_profile(&self, login: &str) -> String {
        format!("/users/{login}")
    }

    fn signin_form(&self) -> String {
        String::from(SIGNIN)
    }

    fn signout(&self) -> String {
        String::from(SIGNOUT)
    }

    fn posts_page(&self, offset: usize, limit: usize) -> String {
        match offset {
            0 => format!("{POSTS}?limit={limit}"),
            _ => format!("{POSTS}?offset={offset}&limit={limit}"),
        }
    }

    fn write_form(&self) -> String {
        String::from(WRITE)
    }

    fn post(&self, post: PostId) -> String {
        format!("/posts/{}", post.0)
    }

    fn post_edit(&self, post: PostId) -> String {
        format!("/posts/{}/edit", post.0)
    }

    fn post_delete(&self, post: PostId) -> String {
        self.post(post)
    }

    fn comment_form(&self, post: PostId) -> String {
        format!("/posts/{}/comments", post.0)
    }

    fn comment(&self, post: PostId, comment: CommentId) -> String {
        format!("/posts/{}#comment-{}", post.0, comment.0)
    }

    fn comment_delete(&self, post: PostId, comment: CommentId) -> String {
        format!("/posts/{}/comments/{}", post.0, comment.0)
    }
}
