use std::fmt;

use uuid::Uuid;

use crate::{Error, PostId, Time, User, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,

    /// Root post of the thread this comment is in
    pub post_id: PostId,

    /// Comment this one replies to, or `None` when it replies to the post itself
    pub parent_id: Option<CommentId>,

    pub author: User,
    pub body: String,
    pub created_at: Time,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub parent_id: Option<CommentId>,
    pub body: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_required("body", &self.body)
    }
}

/// A comment along with its replies, oldest first
///
/// Reply chains can be arbitrarily deep, so nothing here walks the tree
/// through the call stack, dropping included. Serialization goes through
/// [`crate::Thread`], which flattens the tree.
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl fmt::Debug for CommentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentNode")
            .field("comment", &self.comment)
            .field("subtree_len", &self.len())
            .finish()
    }
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.replies);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.replies);
        }
    }
}

impl CommentNode {
    pub fn leaf(comment: Comment) -> CommentNode {
        CommentNode {
            comment,
            replies: Vec::new(),
        }
    }

    /// Looks for `id` in this subtree, this node included
    pub fn find(&self, id: CommentId) -> Option<&CommentNode> {
        let mut stack = vec![self];
        while let Some(n) = stack.pop() {
            if n.comment.id == id {
                return Some(n);
            }
            stack.extend(n.replies.iter());
        }
        None
    }

    /// Number of comments in this subtree, this node included
    pub fn len(&self) -> usize {
        let mut res = 0;
        let mut stack = vec![self];
        while let Some(n) = stack.pop() {
            res += 1;
            stack.extend(n.replies.iter());
        }
        res
    }
}
