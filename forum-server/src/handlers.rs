use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::Utc;
use forum_api::{
    Authored, CommentId, NewComment, NewPost, NewSession, NewUser, Pager, Post, PostId, Profile,
    User, Uuid,
};

use crate::{
    db,
    extractors::*,
    negotiate::{respond, Format},
    pages::*,
    render::render_thread,
    rewrite,
    routes::{Routes, Urls},
    Config, Error, JsonError,
};

const MAX_POSTS_PER_PAGE: usize = 100;

fn render_page<T: Template>(page: &T) -> Result<String, Error> {
    Ok(page.render().context("rendering page")?)
}

fn html_page<T: Template>(page: &T) -> Result<Response, Error> {
    Ok(Html(render_page(page)?).into_response())
}

fn see_other(url: &str) -> Response {
    Redirect::to(url).into_response()
}

pub async fn home(viewer: Viewer) -> Response {
    match viewer.0 {
        Some(user) => see_other(&Routes.user_profile(&user.login)),
        None => see_other(&Routes.signin_form()),
    }
}

pub async fn signin_form(
    viewer: Viewer,
    State(config): State<Arc<Config>>,
) -> Result<Response, Error> {
    html_page(&SigninPage {
        layout: Layout::new("Sign in", viewer.0.as_ref(), &config),
        action: Routes.signin_form(),
        login: String::new(),
        failed: false,
    })
}

#[derive(serde::Deserialize)]
pub struct SigninData {
    login: String,
    password: String,
}

pub async fn signin(
    State(config): State<Arc<Config>>,
    headers: HeaderMap,
    mut conn: PgConn,
    Form(data): Form<SigninData>,
) -> Result<Response, Error> {
    let device = headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .unwrap_or("unknown");
    let session = NewSession {
        login: data.login,
        password: data.password,
        device: String::from(device),
    };
    session.validate()?;
    match db::login_user(&mut *conn, &session)
        .await
        .context("logging user in")?
    {
        Some((token, user)) => {
            tracing::info!(login=%user.login, "user signed in");
            let mut resp = see_other(&Routes.user_profile(&user.login));
            resp.headers_mut()
                .insert(header::SET_COOKIE, session_cookie(token));
            Ok(resp)
        }
        None => html_page(&SigninPage {
            layout: Layout::new("Sign in", None, &config),
            action: Routes.signin_form(),
            login: session.login,
            failed: true,
        }),
    }
}

#[derive(serde::Deserialize)]
pub struct SignoutQuery {
    return_url: Option<String>,
}

/// Only same-site paths are followed after signing out
fn local_path(url: &str) -> Option<&str> {
    (url.starts_with('/') && !url.starts_with("//")).then_some(url)
}

/// Path part of an absolute or relative URL
fn url_path(url: &str) -> &str {
    match url.split_once("://") {
        None => url,
        Some((_, rest)) => rest.find('/').map(|p| &rest[p..]).unwrap_or("/"),
    }
}

pub async fn signout(
    headers: HeaderMap,
    State(pool): State<PgPool>,
    Query(query): Query<SignoutQuery>,
) -> Result<Response, Error> {
    if let Some(token) = session_token(&headers) {
        let mut conn = pool.acquire().await?;
        if !db::logout_user(&mut *conn, token).await? {
            tracing::debug!(?token, "signing out of an unknown session");
        }
    }
    let referer = headers
        .get(header::REFERER)
        .and_then(|r| r.to_str().ok())
        .map(url_path);
    let target = query
        .return_url
        .as_deref()
        .and_then(local_path)
        .or_else(|| referer.and_then(local_path))
        .unwrap_or(crate::routes::HOME);
    let mut resp = see_other(target);
    resp.headers_mut()
        .insert(header::SET_COOKIE, expired_session_cookie());
    Ok(resp)
}

#[derive(serde::Serialize)]
struct ProfileData<'a> {
    profile: &'a Profile,
    posts: &'a [Post],
}

pub async fn profile(
    format: Format,
    viewer: Viewer,
    State(config): State<Arc<Config>>,
    mut conn: PgConn,
    Path(login): Path<String>,
) -> Result<Response, Error> {
    let profile = db::fetch_profile(&mut *conn, &login)
        .await?
        .ok_or_else(Error::not_found)?;
    let posts = db::fetch_posts_by_author(&mut *conn, profile.user.id).await?;
    respond(
        format,
        &ProfileData {
            profile: &profile,
            posts: &posts,
        },
        || {
            let layout = Layout::new(profile.user.name.clone(), viewer.0.as_ref(), &config);
            render_page(&ProfilePage::new(layout, &profile, &posts))
        },
    )
}

#[derive(serde::Deserialize)]
pub struct Paging {
    offset: Option<usize>,
    limit: Option<usize>,
}

#[derive(serde::Serialize)]
struct PostListData<'a> {
    total: usize,
    offset: usize,
    limit: usize,
    posts: &'a [Post],
}

pub async fn posts(
    format: Format,
    viewer: Viewer,
    State(config): State<Arc<Config>>,
    mut conn: PgConn,
    Query(paging): Query<Paging>,
) -> Result<Response, Error> {
    let limit = paging
        .limit
        .unwrap_or(config.posts_per_page)
        .clamp(1, MAX_POSTS_PER_PAGE);
    let total = db::count_posts(&mut *conn).await?;
    let offset = paging.offset.unwrap_or(0).min(total);
    let posts = db::fetch_posts(&mut *conn, offset, limit).await?;
    respond(
        format,
        &PostListData {
            total,
            offset,
            limit,
            posts: &posts,
        },
        || {
            render_page(&PostListPage {
                layout: Layout::new("Posts", viewer.0.as_ref(), &config),
                posts: posts.iter().map(|p| PostSummary::new(p, &Routes)).collect(),
                pages: PageLink::list(Pager::for_offset(total, offset, limit), limit, &Routes),
                write_url: viewer.0.as_ref().map(|_| Routes.write_form()),
            })
        },
    )
}

#[derive(serde::Deserialize)]
pub struct PostData {
    title: String,
    body: String,
    #[serde(default)]
    sticky: Option<String>,
}

impl From<PostData> for NewPost {
    fn from(data: PostData) -> NewPost {
        NewPost {
            title: data.title,
            body: data.body,
            sticky: data.sticky.is_some(),
        }
    }
}

fn post_form(
    config: &Config,
    user: &User,
    heading: &'static str,
    action: String,
    cancel_url: String,
    post: NewPost,
    error: Option<forum_api::Error>,
) -> Result<Response, Error> {
    let status = match error {
        Some(_) => StatusCode::BAD_REQUEST,
        None => StatusCode::OK,
    };
    let page = PostFormPage {
        layout: Layout::new(heading, Some(user), config),
        heading,
        action,
        cancel_url,
        title: post.title,
        body: post.body,
        sticky: post.sticky,
        error: error.map(|e| e.to_string()),
    };
    Ok((status, Html(render_page(&page)?)).into_response())
}

fn empty_post() -> NewPost {
    NewPost {
        title: String::new(),
        body: String::new(),
        sticky: false,
    }
}

pub async fn write_form(
    SignedIn(user): SignedIn,
    State(config): State<Arc<Config>>,
) -> Result<Response, Error> {
    post_form(
        &config,
        &user,
        "Write a post",
        String::from(crate::routes::POSTS),
        Routes.posts_page(0, config.posts_per_page),
        empty_post(),
        None,
    )
}

pub async fn write(
    SignedIn(user): SignedIn,
    State(config): State<Arc<Config>>,
    mut conn: PgConn,
    Form(data): Form<PostData>,
) -> Result<Response, Error> {
    let post = NewPost::from(data);
    if let Err(e) = post.validate() {
        return post_form(
            &config,
            &user,
            "Write a post",
            String::from(crate::routes::POSTS),
            Routes.posts_page(0, config.posts_per_page),
            post,
            Some(e),
        );
    }
    let id = PostId(Uuid::new_v4());
    db::create_post(&mut *conn, id, user.id, &post, Utc::now()).await?;
    tracing::info!(?id, author=%user.login, "post written");
    Ok(see_other(&Routes.post(id)))
}

pub async fn post(
    format: Format,
    viewer: Viewer,
    State(config): State<Arc<Config>>,
    mut conn: PgConn,
    Path(id): Path<Uuid>,
) -> Result<Response, Error> {
    let thread = db::fetch_thread(&mut *conn, PostId(id))
        .await?
        .ok_or_else(Error::not_found)?;
    respond(format, &thread, || {
        let html = render_thread(&thread, viewer.id(), &Routes).context("rendering thread")?;
        render_page(&PostPage {
            layout: Layout::new(thread.post.title.clone(), viewer.0.as_ref(), &config),
            thread: html,
            comment_count: thread.len(),
            comment_action: viewer
                .0
                .as_ref()
                .map(|_| Routes.comment_form(thread.post.id)),
        })
    })
}

/// Fetches a post the signed in user is going to modify
async fn own_post(conn: &mut PgConn, user: &User, id: PostId) -> Result<Post, Error> {
    let post = db::fetch_post(&mut *conn, id)
        .await?
        .ok_or_else(Error::not_found)?;
    if !post.can_be_modified_by(Some(user.id)) {
        return Err(Error::permission_denied());
    }
    Ok(post)
}

fn edit_action(id: PostId) -> String {
    rewrite::override_method(&Routes.post(id), &axum::http::Method::PUT)
}

pub async fn edit_form(
    SignedIn(user): SignedIn,
    State(config): State<Arc<Config>>,
    mut conn: PgConn,
    Path(id): Path<Uuid>,
) -> Result<Response, Error> {
    let post = own_post(&mut conn, &user, PostId(id)).await?;
    post_form(
        &config,
        &user,
        "Edit post",
        edit_action(post.id),
        Routes.post(post.id),
        NewPost {
            title: post.title,
            body: post.body,
            sticky: post.sticky,
        },
        None,
    )
}

pub async fn edit(
    SignedIn(user): SignedIn,
    State(config): State<Arc<Config>>,
    mut conn: PgConn,
    Path(id): Path<Uuid>,
    Form(data): Form<PostData>,
) -> Result<Response, Error> {
    let post = own_post(&mut conn, &user, PostId(id)).await?;
    let edited = NewPost::from(data);
    if let Err(e) = edited.validate() {
        return post_form(
            &config,
            &user,
            "Edit post",
            edit_action(post.id),
            Routes.post(post.id),
            edited,
            Some(e),
        );
    }
    if !db::edit_post(&mut *conn, post.id, &edited, Utc::now()).await? {
        return Err(Error::not_found());
    }
    tracing::info!(id=?post.id, author=%user.login, "post edited");
    Ok(see_other(&Routes.post(post.id)))
}

pub async fn delete_post(
    SignedIn(user): SignedIn,
    State(config): State<Arc<Config>>,
    mut conn: PgConn,
    Path(id): Path<Uuid>,
) -> Result<Response, Error> {
    let post = own_post(&mut conn, &user, PostId(id)).await?;
    if !db::delete_post(&mut *conn, post.id).await? {
        return Err(Error::not_found());
    }
    tracing::info!(id=?post.id, author=%user.login, "post deleted");
    Ok(see_other(&Routes.posts_page(0, config.posts_per_page)))
}

#[derive(serde::Deserialize)]
pub struct CommentData {
    body: String,
    #[serde(default)]
    parent_id: Option<String>,
}

impl CommentData {
    fn parent(&self) -> Result<Option<CommentId>, Error> {
        match self.parent_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(p) => Uuid::try_from(p)
                .map(|p| Some(CommentId(p)))
                .map_err(|_| Error::not_found()),
        }
    }
}

pub async fn write_comment(
    SignedIn(user): SignedIn,
    mut conn: PgConn,
    Path(post_id): Path<Uuid>,
    Form(data): Form<CommentData>,
) -> Result<Response, Error> {
    let post = PostId(post_id);
    let parent_id = data.parent();
    let mut comment = NewComment {
        parent_id: None,
        body: data.body,
    };
    comment.validate()?;
    comment.parent_id = parent_id?;
    if db::fetch_post(&mut *conn, post).await?.is_none() {
        return Err(Error::not_found());
    }
    let id = CommentId(Uuid::new_v4());
    db::create_comment(&mut *conn, id, post, user.id, &comment, Utc::now()).await?;
    tracing::info!(?id, ?post, author=%user.login, "comment written");
    Ok(see_other(&Routes.comment(post, id)))
}

pub async fn delete_comment(
    SignedIn(user): SignedIn,
    mut conn: PgConn,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, Error> {
    let (post, id) = (PostId(post_id), CommentId(comment_id));
    let comment = db::fetch_comment(&mut *conn, post, id)
        .await?
        .ok_or_else(Error::not_found)?;
    if !comment.can_be_modified_by(Some(user.id)) {
        return Err(Error::permission_denied());
    }
    if !db::delete_comment(&mut *conn, post, id).await? {
        return Err(Error::not_found());
    }
    tracing::info!(?id, ?post, author=%user.login, "comment deleted");
    Ok(see_other(&Routes.post(post)))
}

pub async fn admin_create_user(
    AdminAuth: AdminAuth,
    State(pool): State<PgPool>,
    Json(mut data): Json<NewUser>,
) -> Result<(), JsonError> {
    data.validate()?;
    let mut conn = pool.acquire().await?;
    db::create_user(&mut *conn, data).await?;
    Ok(())
}
