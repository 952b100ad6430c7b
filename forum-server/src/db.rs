use anyhow::Context;
use forum_api::{
    AuthToken, Comment, CommentId, NewComment, NewPost, NewSession, NewUser, Post, PostId, Profile,
    Thread, Time, User, UserId, Uuid,
};

use crate::Error;

macro_rules! select_posts {
    ($($rest:literal),*) => {
        concat!(
            "
                SELECT
                    p.id,
                    p.author_id,
                    u.login AS author_login,
                    u.name AS author_name,
                    p.title,
                    p.body,
                    p.sticky,
                    p.created_at,
                    p.modified_at
                FROM posts p
                INNER JOIN users u
                    ON u.id = p.author_id
            ",
            $($rest),*
        )
    };
}

macro_rules! select_comments {
    ($($rest:literal),*) => {
        concat!(
            "
                SELECT
                    c.id,
                    c.post_id,
                    c.parent_id,
                    c.author_id,
                    u.login AS author_login,
                    u.name AS author_name,
                    c.body,
                    c.created_at
                FROM comments c
                INNER JOIN users u
                    ON u.id = c.author_id
            ",
            $($rest),*
        )
    };
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    login: String,
    name: String,
}

impl From<UserRow> for User {
    fn from(u: UserRow) -> User {
        User {
            id: UserId(u.id),
            login: u.login,
            name: u.name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    author_login: String,
    author_name: String,
    title: String,
    body: String,
    sticky: bool,
    created_at: Time,
    modified_at: Time,
}

impl From<PostRow> for Post {
    fn from(p: PostRow) -> Post {
        Post {
            id: PostId(p.id),
            author: User {
                id: UserId(p.author_id),
                login: p.author_login,
                name: p.author_name,
            },
            title: p.title,
            body: p.body,
            sticky: p.sticky,
            created_at: p.created_at,
            modified_at: p.modified_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    parent_id: Option<Uuid>,
    author_id: Uuid,
    author_login: String,
    author_name: String,
    body: String,
    created_at: Time,
}

impl From<CommentRow> for Comment {
    fn from(c: CommentRow) -> Comment {
        Comment {
            id: CommentId(c.id),
            post_id: PostId(c.post_id),
            parent_id: c.parent_id.map(CommentId),
            author: User {
                id: UserId(c.author_id),
                login: c.author_login,
                name: c.author_name,
            },
            body: c.body,
            created_at: c.created_at,
        }
    }
}

pub async fn create_user(conn: &mut sqlx::PgConnection, user: NewUser) -> Result<(), Error> {
    let res = sqlx::query(
        "
            INSERT INTO users (id, login, name, email, url, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
        ",
    )
    .bind(user.id.0)
    .bind(&user.login)
    .bind(&user.name)
    .bind(user.email.as_deref())
    .bind(user.url.as_deref())
    .bind(&user.initial_password_hash)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("creating user {:?}", user.login))?;
    if res.rows_affected() == 1 {
        return Ok(());
    }

    let login_taken =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE login = $1)")
            .bind(&user.login)
            .fetch_one(&mut *conn)
            .await
            .context("checking for login conflict")?;
    if login_taken {
        Err(Error::name_already_used(user.login))
    } else {
        Err(Error::uuid_already_used(user.id.0))
    }
}

/// Checks the credentials, opening a new session if they are right
pub async fn login_user(
    conn: &mut sqlx::PgConnection,
    session: &NewSession,
) -> anyhow::Result<Option<(AuthToken, User)>> {
    let login = match forum_api::normalize_login(&session.login) {
        Ok(login) => login,
        Err(_) => return Ok(None),
    };
    let row = sqlx::query_as::<_, (Uuid, String, String, String)>(
        "SELECT id, login, name, password_hash FROM users WHERE login = $1",
    )
    .bind(&login)
    .fetch_optional(&mut *conn)
    .await
    .with_context(|| format!("fetching password hash for {login:?}"))?;
    let (id, login, name, hash) = match row {
        None => return Ok(None),
        Some(row) => row,
    };
    if !bcrypt::verify(&session.password, &hash).unwrap_or(false) {
        return Ok(None);
    }

    let token = AuthToken(Uuid::new_v4());
    sqlx::query("INSERT INTO sessions (id, user_id, device) VALUES ($1, $2, $3)")
        .bind(token.0)
        .bind(id)
        .bind(&session.device)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("opening session for {login:?}"))?;
    Ok(Some((
        token,
        User {
            id: UserId(id),
            login,
            name,
        },
    )))
}

pub async fn logout_user(
    conn: &mut sqlx::PgConnection,
    token: AuthToken,
) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(token.0)
        .execute(conn)
        .await
        .context("closing session")?;
    Ok(res.rows_affected() == 1)
}

pub async fn recover_session(
    conn: &mut sqlx::PgConnection,
    token: AuthToken,
) -> anyhow::Result<Option<User>> {
    Ok(sqlx::query_as::<_, UserRow>(
        "
            SELECT u.id, u.login, u.name
            FROM sessions s
            INNER JOIN users u
                ON u.id = s.user_id
            WHERE s.id = $1
        ",
    )
    .bind(token.0)
    .fetch_optional(conn)
    .await
    .context("looking up session")?
    .map(User::from))
}

pub async fn fetch_users(conn: &mut sqlx::PgConnection) -> anyhow::Result<Vec<User>> {
    Ok(
        sqlx::query_as::<_, UserRow>("SELECT id, login, name FROM users ORDER BY login")
            .fetch_all(conn)
            .await
            .context("querying users table")?
            .into_iter()
            .map(User::from)
            .collect(),
    )
}

pub async fn fetch_profile(
    conn: &mut sqlx::PgConnection,
    login: &str,
) -> anyhow::Result<Option<Profile>> {
    let row = sqlx::query_as::<_, (Uuid, String, String, Option<String>, Option<String>, Time)>(
        "SELECT id, login, name, email, url, created_at FROM users WHERE login = $1",
    )
    .bind(login)
    .fetch_optional(conn)
    .await
    .with_context(|| format!("fetching profile of {login:?}"))?;
    Ok(row.map(|(id, login, name, email, url, created_at)| Profile {
        user: User {
            id: UserId(id),
            login,
            name,
        },
        email,
        url,
        created_at,
    }))
}

pub async fn count_posts(conn: &mut sqlx::PgConnection) -> anyhow::Result<usize> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
        .fetch_one(conn)
        .await
        .context("counting posts")?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// Posts for the listing, sticky ones first then newest first
pub async fn fetch_posts(
    conn: &mut sqlx::PgConnection,
    offset: usize,
    limit: usize,
) -> anyhow::Result<Vec<Post>> {
    Ok(sqlx::query_as::<_, PostRow>(select_posts!(
        "ORDER BY p.sticky DESC, p.created_at DESC, p.id LIMIT $1 OFFSET $2"
    ))
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .bind(i64::try_from(offset).unwrap_or(i64::MAX))
    .fetch_all(conn)
    .await
    .with_context(|| format!("listing {limit} posts from {offset}"))?
    .into_iter()
    .map(Post::from)
    .collect())
}

pub async fn fetch_posts_by_author(
    conn: &mut sqlx::PgConnection,
    author: UserId,
) -> anyhow::Result<Vec<Post>> {
    Ok(sqlx::query_as::<_, PostRow>(select_posts!(
        "WHERE p.author_id = $1 ORDER BY p.created_at DESC, p.id"
    ))
    .bind(author.0)
    .fetch_all(conn)
    .await
    .with_context(|| format!("listing posts of {author:?}"))?
    .into_iter()
    .map(Post::from)
    .collect())
}

pub async fn fetch_post(
    conn: &mut sqlx::PgConnection,
    post: PostId,
) -> anyhow::Result<Option<Post>> {
    Ok(
        sqlx::query_as::<_, PostRow>(select_posts!("WHERE p.id = $1"))
            .bind(post.0)
            .fetch_optional(conn)
            .await
            .with_context(|| format!("fetching post {post:?}"))?
            .map(Post::from),
    )
}

pub async fn create_post(
    conn: &mut sqlx::PgConnection,
    id: PostId,
    author: UserId,
    post: &NewPost,
    now: Time,
) -> Result<(), Error> {
    let res = sqlx::query(
        "
            INSERT INTO posts (id, author_id, title, body, sticky, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT DO NOTHING
        ",
    )
    .bind(id.0)
    .bind(author.0)
    .bind(&post.title)
    .bind(&post.body)
    .bind(post.sticky)
    .bind(now)
    .execute(conn)
    .await
    .with_context(|| format!("creating post {id:?}"))?;
    match res.rows_affected() {
        1 => Ok(()),
        _ => Err(Error::uuid_already_used(id.0)),
    }
}

pub async fn edit_post(
    conn: &mut sqlx::PgConnection,
    id: PostId,
    post: &NewPost,
    now: Time,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "UPDATE posts SET title = $2, body = $3, sticky = $4, modified_at = $5 WHERE id = $1",
    )
    .bind(id.0)
    .bind(&post.title)
    .bind(&post.body)
    .bind(post.sticky)
    .bind(now)
    .execute(conn)
    .await
    .with_context(|| format!("editing post {id:?}"))?;
    Ok(res.rows_affected() == 1)
}

/// Deletes a post, its comments going along with it
pub async fn delete_post(conn: &mut sqlx::PgConnection, id: PostId) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id.0)
        .execute(conn)
        .await
        .with_context(|| format!("deleting post {id:?}"))?;
    Ok(res.rows_affected() == 1)
}

/// Comments of a post, in creation order
pub async fn fetch_comments(
    conn: &mut sqlx::PgConnection,
    post: PostId,
) -> anyhow::Result<Vec<Comment>> {
    Ok(sqlx::query_as::<_, CommentRow>(select_comments!(
        "WHERE c.post_id = $1 ORDER BY c.created_at, c.seq"
    ))
    .bind(post.0)
    .fetch_all(conn)
    .await
    .with_context(|| format!("fetching comments of {post:?}"))?
    .into_iter()
    .map(Comment::from)
    .collect())
}

pub async fn fetch_thread(
    conn: &mut sqlx::PgConnection,
    post: PostId,
) -> anyhow::Result<Option<Thread>> {
    let post = match fetch_post(&mut *conn, post).await? {
        None => return Ok(None),
        Some(post) => post,
    };
    let comments = fetch_comments(&mut *conn, post.id).await?;
    Ok(Some(Thread::build(post, comments)))
}

pub async fn fetch_comment(
    conn: &mut sqlx::PgConnection,
    post: PostId,
    comment: CommentId,
) -> anyhow::Result<Option<Comment>> {
    Ok(sqlx::query_as::<_, CommentRow>(select_comments!(
        "WHERE c.post_id = $1 AND c.id = $2"
    ))
    .bind(post.0)
    .bind(comment.0)
    .fetch_optional(conn)
    .await
    .with_context(|| format!("fetching comment {comment:?} of {post:?}"))?
    .map(Comment::from))
}

/// Adds a comment to `post`, whose parent, if any, must be in the same post
pub async fn create_comment(
    conn: &mut sqlx::PgConnection,
    id: CommentId,
    post: PostId,
    author: UserId,
    comment: &NewComment,
    now: Time,
) -> Result<(), Error> {
    if let Some(parent) = comment.parent_id {
        let parent_in_post = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1 AND post_id = $2)",
        )
        .bind(parent.0)
        .bind(post.0)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("checking parent {parent:?} is in {post:?}"))?;
        if !parent_in_post {
            return Err(Error::not_found());
        }
    }
    let res = sqlx::query(
        "
            INSERT INTO comments (id, post_id, parent_id, author_id, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
        ",
    )
    .bind(id.0)
    .bind(post.0)
    .bind(comment.parent_id.map(|p| p.0))
    .bind(author.0)
    .bind(&comment.body)
    .bind(now)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("creating comment {id:?} in {post:?}"))?;
    match res.rows_affected() {
        1 => Ok(()),
        _ => Err(Error::uuid_already_used(id.0)),
    }
}

/// Deletes a comment along with all the replies below it
pub async fn delete_comment(
    conn: &mut sqlx::PgConnection,
    post: PostId,
    comment: CommentId,
) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM comments WHERE post_id = $1 AND id = $2")
        .bind(post.0)
        .bind(comment.0)
        .execute(conn)
        .await
        .with_context(|| format!("deleting comment {comment:?} of {post:?}"))?;
    Ok(res.rows_affected() == 1)
}
