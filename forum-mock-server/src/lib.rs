use std::collections::{BTreeMap, HashMap, HashSet};

use forum_api::{
    can_modify, AuthToken, Comment, CommentId, Error, NewComment, NewPost, NewSession, NewUser,
    Post, PostId, Thread, Time, User, UserId, Uuid,
};

/// In-memory forum behaving like the real server, used as a reference in
/// tests
pub struct MockServer {
    users: BTreeMap<UserId, DbUser>,
    sessions: HashMap<AuthToken, UserId>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
}

#[derive(Debug)]
struct DbUser {
    user: User,
    pass: String,
    pass_hash: String,
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            users: BTreeMap::new(),
            sessions: HashMap::new(),
            posts: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Return login & pass for user number `id`
    pub fn test_get_user_info(&self, id: usize) -> (&str, &str) {
        let u = self
            .users
            .values()
            .nth(id)
            .unwrap_or_else(|| panic!("getting user {id} among {}", self.users.len()));
        (&u.user.login, &u.pass)
    }

    /// Return the current number of users
    pub fn test_num_users(&self) -> usize {
        self.users.len()
    }

    pub fn admin_create_user(&mut self, mut u: NewUser, password: String) -> Result<(), Error> {
        u.validate()?;
        if self.users.values().any(|db| db.user.login == u.login) {
            return Err(Error::NameAlreadyUsed(u.login));
        }
        if self.users.contains_key(&u.id) {
            return Err(Error::UuidAlreadyUsed(u.id.0));
        }
        self.users.insert(
            u.id,
            DbUser {
                user: User {
                    id: u.id,
                    login: u.login,
                    name: u.name,
                },
                pass: password,
                pass_hash: u.initial_password_hash,
            },
        );
        Ok(())
    }

    /// Opens a session, `None` meaning wrong credentials
    pub fn sign_in(&mut self, s: NewSession) -> Result<Option<AuthToken>, Error> {
        s.validate()?;
        let login = match forum_api::normalize_login(&s.login) {
            Ok(login) => login,
            Err(_) => return Ok(None),
        };
        let user = match self.users.values().find(|u| u.user.login == login) {
            None => return Ok(None),
            Some(u) => u,
        };
        if !bcrypt::verify(&s.password, &user.pass_hash).unwrap_or(false) {
            return Ok(None);
        }
        let token = AuthToken(Uuid::new_v4());
        self.sessions.insert(token, user.user.id);
        Ok(Some(token))
    }

    pub fn sign_out(&mut self, tok: AuthToken) -> bool {
        self.sessions.remove(&tok).is_some()
    }

    pub fn whoami(&self, tok: Option<AuthToken>) -> Option<&User> {
        let id = self.sessions.get(&tok?)?;
        self.users.get(id).map(|u| &u.user)
    }

    fn signed_in(&self, tok: Option<AuthToken>) -> Result<User, Error> {
        self.whoami(tok).cloned().ok_or(Error::SignInRequired)
    }

    fn post_index(&self, id: PostId) -> Result<usize, Error> {
        self.posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(Error::NotFound)
    }

    /// Post sorted for the listing: sticky first, then newest first
    pub fn list_posts(&self, offset: usize, limit: usize) -> Vec<&Post> {
        let mut posts = self.posts.iter().collect::<Vec<_>>();
        posts.sort_by(|a, b| {
            b.sticky
                .cmp(&a.sticky)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });
        posts.into_iter().skip(offset).take(limit).collect()
    }

    pub fn create_post(
        &mut self,
        tok: Option<AuthToken>,
        id: PostId,
        p: NewPost,
        now: Time,
    ) -> Result<(), Error> {
        let author = self.signed_in(tok)?;
        p.validate()?;
        if self.posts.iter().any(|p| p.id == id) {
            return Err(Error::UuidAlreadyUsed(id.0));
        }
        self.posts.push(Post {
            id,
            author,
            title: p.title,
            body: p.body,
            sticky: p.sticky,
            created_at: now,
            modified_at: now,
        });
        Ok(())
    }

    fn own_post(&self, tok: Option<AuthToken>, id: PostId) -> Result<usize, Error> {
        let user = self.signed_in(tok)?;
        let idx = self.post_index(id)?;
        if !can_modify(Some(user.id), self.posts[idx].author.id) {
            return Err(Error::PermissionDenied);
        }
        Ok(idx)
    }

    pub fn edit_post(
        &mut self,
        tok: Option<AuthToken>,
        id: PostId,
        p: NewPost,
        now: Time,
    ) -> Result<(), Error> {
        let idx = self.own_post(tok, id)?;
        p.validate()?;
        let post = &mut self.posts[idx];
        post.title = p.title;
        post.body = p.body;
        post.sticky = p.sticky;
        post.modified_at = now;
        Ok(())
    }

    pub fn delete_post(&mut self, tok: Option<AuthToken>, id: PostId) -> Result<(), Error> {
        let idx = self.own_post(tok, id)?;
        self.posts.remove(idx);
        self.comments.retain(|c| c.post_id != id);
        Ok(())
    }

    pub fn create_comment(
        &mut self,
        tok: Option<AuthToken>,
        post: PostId,
        id: CommentId,
        c: NewComment,
        now: Time,
    ) -> Result<(), Error> {
        let author = self.signed_in(tok)?;
        c.validate()?;
        self.post_index(post)?;
        if let Some(parent) = c.parent_id {
            if !self
                .comments
                .iter()
                .any(|c| c.id == parent && c.post_id == post)
            {
                return Err(Error::NotFound);
            }
        }
        if self.comments.iter().any(|c| c.id == id) {
            return Err(Error::UuidAlreadyUsed(id.0));
        }
        self.comments.push(Comment {
            id,
            post_id: post,
            parent_id: c.parent_id,
            author,
            body: c.body,
            created_at: now,
        });
        Ok(())
    }

    /// Deletes a comment and every reply below it
    pub fn delete_comment(
        &mut self,
        tok: Option<AuthToken>,
        post: PostId,
        id: CommentId,
    ) -> Result<(), Error> {
        let user = self.signed_in(tok)?;
        let comment = self
            .comments
            .iter()
            .find(|c| c.id == id && c.post_id == post)
            .ok_or(Error::NotFound)?;
        if !can_modify(Some(user.id), comment.author.id) {
            return Err(Error::PermissionDenied);
        }

        let mut doomed = HashSet::from([id]);
        let mut stack = vec![id];
        while let Some(parent) = stack.pop() {
            for c in self.comments.iter().filter(|c| c.parent_id == Some(parent)) {
                if doomed.insert(c.id) {
                    stack.push(c.id);
                }
            }
        }
        self.comments.retain(|c| !doomed.contains(&c.id));
        Ok(())
    }

    pub fn fetch_thread(&self, post: PostId) -> Result<Thread, Error> {
        let post = self.posts[self.post_index(post)?].clone();
        let comments = self
            .comments
            .iter()
            .filter(|c| c.post_id == post.id)
            .cloned()
            .collect();
        Ok(Thread::build(post, comments))
    }
}
