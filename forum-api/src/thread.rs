use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use serde::ser::SerializeStruct;

use crate::{Comment, CommentId, CommentNode, Post};

/// A post along with the whole tree of comments answering it.
///
/// Serialized flat, as `{"post": ..., "comments": [...]}` with the comments
/// in [`Thread::walk`] order: the nesting is carried by `parent_id` only.
pub struct Thread {
    pub post: Post,

    /// Direct replies to the post, oldest first
    pub replies: Vec<CommentNode>,
}

/// Pre-order walk over a thread, yielding each comment with its depth
pub struct Walk<'a> {
    stack: Vec<(usize, &'a CommentNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Comment);

    fn next(&mut self) -> Option<(usize, &'a Comment)> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.replies.iter().rev().map(|n| (depth + 1, n)));
        Some((depth, &node.comment))
    }
}

impl Thread {
    /// Nests the flat list of comments of `post`, which must be given in
    /// creation order.
    ///
    /// Comments whose parent is not in the list are shown as direct replies
    /// to the post. Comments that cannot be reached from the post at all
    /// (which would require a parent cycle) are dropped.
    pub fn build(post: Post, comments: Vec<Comment>) -> Thread {
        let known = comments.iter().map(|c| c.id).collect::<HashSet<_>>();
        let ids = comments.iter().map(|c| c.id).collect::<Vec<_>>();

        let mut children: HashMap<Option<CommentId>, Vec<usize>> = HashMap::new();
        for (i, c) in comments.iter().enumerate() {
            if c.post_id != post.id {
                tracing::warn!(comment=?c.id, post=?post.id, other_post=?c.post_id, "comment from another post in thread");
            }
            let parent = match c.parent_id {
                Some(p) if p != c.id && known.contains(&p) => Some(p),
                Some(p) => {
                    tracing::warn!(comment=?c.id, parent=?p, "comment parent not found, showing it as a reply to the post");
                    None
                }
                None => None,
            };
            children.entry(parent).or_default().push(i);
        }

        // Pre-order walk from the post: every comment comes after its parent
        let mut order = Vec::with_capacity(comments.len());
        let mut visited = vec![false; comments.len()];
        let mut stack = children
            .get(&None)
            .map(|roots| roots.iter().rev().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        while let Some(i) = stack.pop() {
            if std::mem::replace(&mut visited[i], true) {
                continue;
            }
            order.push(i);
            if let Some(kids) = children.get(&Some(ids[i])) {
                stack.extend(kids.iter().rev());
            }
        }
        if order.len() != comments.len() {
            tracing::warn!(
                post=?post.id,
                dropped = comments.len() - order.len(),
                "some comments are unreachable from their post"
            );
        }

        // Build nodes bottom-up, so that all replies exist before their parent
        let mut pending = comments.into_iter().map(Some).collect::<Vec<_>>();
        let mut built: Vec<Option<CommentNode>> = (0..pending.len()).map(|_| None).collect();
        let take_replies = |built: &mut Vec<Option<CommentNode>>,
                            parent: Option<CommentId>|
         -> Vec<CommentNode> {
            children
                .get(&parent)
                .map(|kids| kids.iter().filter_map(|&k| built[k].take()).collect())
                .unwrap_or_default()
        };
        for &i in order.iter().rev() {
            let replies = take_replies(&mut built, Some(ids[i]));
            if let Some(comment) = pending[i].take() {
                built[i] = Some(CommentNode { comment, replies });
            }
        }
        let replies = take_replies(&mut built, None);

        Thread { post, replies }
    }

    /// Total number of comments in the thread
    pub fn len(&self) -> usize {
        self.replies.iter().map(CommentNode::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    pub fn find(&self, id: CommentId) -> Option<&CommentNode> {
        self.replies.iter().find_map(|r| r.find(id))
    }

    /// Every comment, parents before their replies and siblings oldest
    /// first. Direct replies to the post have depth 1.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.replies.iter().rev().map(|n| (1, n)).collect(),
        }
    }
}

impl Clone for Thread {
    fn clone(&self) -> Thread {
        let comments = self.walk().map(|(_, c)| c.clone()).collect();
        Thread::build(self.post.clone(), comments)
    }
}

impl PartialEq for Thread {
    fn eq(&self, other: &Thread) -> bool {
        self.post == other.post && self.walk().eq(other.walk())
    }
}

impl Eq for Thread {}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("post", &self.post)
            .field("comments", &self.walk().collect::<Vec<_>>())
            .finish()
    }
}

struct FlatComments<'a>(&'a Thread);

impl serde::Serialize for FlatComments<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.walk().map(|(_, c)| c))
    }
}

impl serde::Serialize for Thread {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Thread", 2)?;
        s.serialize_field("post", &self.post)?;
        s.serialize_field("comments", &FlatComments(self))?;
        s.end()
    }
}

#[derive(serde::Deserialize)]
struct FlatThread {
    post: Post,
    comments: Vec<Comment>,
}

impl<'de> serde::Deserialize<'de> for Thread {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Thread, D::Error> {
        let FlatThread { post, comments } = FlatThread::deserialize(deserializer)?;
        Ok(Thread::build(post, comments))
    }
}
