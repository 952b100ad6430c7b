#![cfg(test)]

use async_recursion::async_recursion;
use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{self, header, request, Method, StatusCode},
    response::Response,
};
use chrono::Utc;
use forum_api::{
    AuthToken, CommentId, CommentNode, Error as ApiError, NewComment, NewPost, NewSession,
    NewUser, PostId, Thread, UserId, Uuid,
};
use forum_mock_server::MockServer;
use std::{cmp, fmt::Debug, ops::RangeTo, panic::AssertUnwindSafe, path::Path, sync::Arc};
use tower::{Service, ServiceExt};

use crate::{
    extractors::*,
    negotiate::negotiate,
    rewrite::override_method,
    routes::{Routes, Urls},
    *,
};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

fn build_pg_cluster(data: &Path) -> Option<postgresfixture::cluster::Cluster> {
    let mut runtime = None;
    let mut best_version = None;
    for r in postgresfixture::runtime::Runtime::find_on_path() {
        if let Ok(v) = r.version() {
            match (&mut runtime, &mut best_version) {
                (None, None) => {
                    runtime = Some(r);
                    best_version = Some(v);
                }
                (Some(runtime), Some(best_version)) => {
                    if *best_version < v {
                        *runtime = r;
                        *best_version = v;
                    }
                }
                _ => unreachable!(),
            }
        }
    }
    Some(postgresfixture::cluster::Cluster::new(data, runtime?))
}

macro_rules! do_sqlx_test {
    ( $name:ident, $gen:expr, $fn:expr $(, iterations = $iters:expr)? ) => {
        #[test]
        fn $name() {
            if std::env::var("RUST_LOG").is_ok() {
                tracing_subscriber::fmt::init();
            }
            let lockfile = tempfile::tempfile().expect("creating tempfile");
            let datadir = tempfile::tempdir().expect("creating tempdir");
            let datadir_path: &Path = datadir.as_ref();
            let cluster = match build_pg_cluster(datadir_path) {
                Some(cluster) => cluster,
                None => {
                    eprintln!(
                        "skipping {}: postgresql seems to not be installed in path",
                        stringify!($name)
                    );
                    return;
                }
            };
            let datadir_path: &str = datadir_path.to_str().expect("tempdir is not valid utf8");
            postgresfixture::coordinate::run_and_destroy(&cluster, lockfile.into(), || {
                cluster.createdb("test_db").expect("creating test_db database");
                let runtime = AssertUnwindSafe(
                    tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .expect("failed initializing tokio runtime"),
                );
                // create test db
                let pool = AssertUnwindSafe(runtime.block_on(async move {
                    let pool = create_sqlx_pool(&format!("postgresql://?host={}&dbname=test_db", datadir_path)).await.expect("creating sqlx pool");
                    MIGRATOR
                        .run(&mut *pool.acquire().await.expect("getting migrator connection"))
                        .await
                        .expect("failed applying migrations");
                    pool
                }));
                bolero::check!()
                    $(.with_iterations($iters))?
                    .with_generator($gen)
                    .cloned()
                    .for_each(move |v| {
                        let pool = pool.clone();
                        // run the test
                        let idle_before = pool.num_idle();
                        let v_str = format!("{v:?}");
                        let idle_after_res: Result<usize, _> = {
                            let pool = pool.clone();
                            std::panic::catch_unwind(AssertUnwindSafe(|| {
                                runtime.block_on(async move {
                                    let () = $fn(pool.clone(), v).await;
                                    let mut idle_after = pool.num_idle();
                                    let wait_release_since = std::time::Instant::now();
                                    while idle_after < idle_before
                                        && wait_release_since.elapsed()
                                            <= std::time::Duration::from_secs(1)
                                    {
                                        tokio::task::yield_now().await;
                                        idle_after = pool.num_idle();
                                    }
                                    idle_after
                                })
                            }))
                        };
                        runtime.block_on(async move {
                            // cleanup
                            let mut conn =
                                pool.acquire().await.expect("getting db cleanup connection");
                            sqlx::query(include_str!("../reset-test-db.sql"))
                                .execute(&mut *conn)
                                .await
                                .expect("failed cleaning up database");
                        });
                        // resume the panics
                        match idle_after_res {
                            Err(e) => std::panic::resume_unwind(e),
                            Ok(idle_after) => assert!(
                                idle_after >= idle_before,
                                "test {} held onto pool after exiting test: before there were {idle_before} connections, and after there were {idle_after} with value {v_str}",
                                stringify!($name)
                            ),
                        }
                    });
            })
            .expect("coordinating spinup and shutdown of the pg cluster");
        }
    };
}

do_tokio_test!(fuzz_preauth_extractor, String, |token| async move {
    if let Ok(req) = http::Request::builder()
        .method(Method::GET)
        .uri("/")
        .header(header::AUTHORIZATION, token)
        .body(())
    {
        let mut req = req.into_parts().0;
        let res = PreAuth::from_request_parts(&mut req, &()).await;
        match res {
            Ok(_) => (),
            Err(Error::Api(ApiError::PermissionDenied)) => (),
            Err(e) => panic!("got unexpected error: {e}"),
        }
    }
});

do_tokio_test!(fuzz_session_cookie, String, |cookie: String| async move {
    if let Ok(value) = http::HeaderValue::from_str(&cookie) {
        let mut headers = http::HeaderMap::new();
        headers.insert(header::COOKIE, value);
        if let Some(token) = session_token(&headers) {
            assert!(
                cookie.contains(SESSION_COOKIE),
                "found session {token:?} in {cookie:?}"
            );
        }
    }
});

do_tokio_test!(fuzz_accept_header, String, |accept: String| async move {
    let _ = negotiate(Some(&accept));
});

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    CreateUser {
        #[generator(bolero::generator::gen_with::<String>().len(1..20usize))]
        login: String,
        #[generator(bolero::generator::gen_with::<String>().len(0..20usize))]
        name: String,
        password: u8,
        stub_id: bool,
        url: Option<String>,
    },
    SignIn {
        uid: usize,
        wrong_password: bool,
    },
    SignOut {
        sid: usize,
    },
    WritePost {
        sid: Option<usize>,
        #[generator(bolero::generator::gen_with::<String>().len(0..300usize))]
        title: String,
        #[generator(bolero::generator::gen_with::<String>().len(0..100usize))]
        body: String,
        sticky: bool,
    },
    EditPost {
        sid: Option<usize>,
        pid: usize,
        #[generator(bolero::generator::gen_with::<String>().len(0..300usize))]
        title: String,
        #[generator(bolero::generator::gen_with::<String>().len(0..100usize))]
        body: String,
        sticky: bool,
    },
    DeletePost {
        sid: Option<usize>,
        pid: usize,
    },
    WriteComment {
        sid: Option<usize>,
        pid: usize,
        parent: Option<Parent>,
        #[generator(bolero::generator::gen_with::<String>().len(0..100usize))]
        body: String,
    },
    DeleteComment {
        sid: Option<usize>,
        cid: usize,
    },
    FetchThread {
        pid: usize,
    },
    ListPosts {
        offset: Option<usize>,
    },
}

/// `parent_id` sent along with a new comment
#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum Parent {
    /// Any comment written so far, possibly in another post
    Written(usize),
    Raw {
        #[generator(bolero::generator::gen_with::<String>().len(0..40usize))]
        text: String,
    },
}

/// What a request amounted to, whether it went through the browser flow or
/// straight to the mock
#[derive(Debug, Eq, PartialEq)]
enum Outcome {
    Done,
    SignInRequired,
    Failed(StatusCode),
}

impl Outcome {
    fn of_app(resp: &Response) -> Outcome {
        match resp.status() {
            StatusCode::SEE_OTHER if location(resp) == Some(Routes.signin_form()) => {
                Outcome::SignInRequired
            }
            StatusCode::SEE_OTHER => Outcome::Done,
            status => Outcome::Failed(status),
        }
    }

    fn of_mock(res: &Result<(), ApiError>) -> Outcome {
        match res {
            Ok(()) => Outcome::Done,
            Err(ApiError::SignInRequired) => Outcome::SignInRequired,
            Err(e) => Outcome::Failed(e.status_code()),
        }
    }
}

/// Part of a thread that does not depend on generated ids or timestamps
#[derive(Debug, Eq, PartialEq)]
struct Shape {
    author: String,
    body: String,
    replies: Vec<Shape>,
}

impl Shape {
    fn of_thread(thread: &Thread) -> Shape {
        Shape {
            author: thread.post.author.login.clone(),
            body: format!("{}\n{}\n{}", thread.post.title, thread.post.sticky, thread.post.body),
            replies: Shape::of_nodes(&thread.replies),
        }
    }

    fn of_nodes(nodes: &[CommentNode]) -> Vec<Shape> {
        nodes
            .iter()
            .map(|n| Shape {
                author: n.comment.author.login.clone(),
                body: n.comment.body.clone(),
                replies: Shape::of_nodes(&n.replies),
            })
            .collect()
    }
}

#[derive(serde::Deserialize)]
struct PostList {
    total: usize,
    posts: Vec<forum_api::Post>,
}

fn location(resp: &Response) -> Option<String> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|l| l.to_str().ok())
        .map(String::from)
}

fn form_body(fields: &[(&str, &str)]) -> Body {
    Body::from(
        fields
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&"),
    )
}

fn post_fields<'a>(title: &'a str, body: &'a str, sticky: bool) -> Vec<(&'a str, &'a str)> {
    let mut fields = vec![("title", title), ("body", body)];
    if sticky {
        fields.push(("sticky", "on"));
    }
    fields
}

async fn call(app: &mut ForumApp, req: request::Request<Body>) -> Response {
    app.ready().await.expect("waiting for app to be ready");
    app.call(req).await.expect("running request")
}

async fn body_bytes(resp: Response) -> hyper::body::Bytes {
    hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes")
}

/// Sends a request the way a browser would, with the session cookie and an
/// urlencoded form
async fn browse(
    app: &mut ForumApp,
    method: Method,
    uri: &str,
    session: Option<AuthToken>,
    form: Option<&[(&str, &str)]>,
) -> Response {
    let req = request::Builder::new().method(method).uri(uri);
    let req = match session {
        Some(token) => req.header(header::COOKIE, format!("{SESSION_COOKIE}={}", token.0)),
        None => req,
    };
    let req = match form {
        Some(fields) => req
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form_body(fields)),
        None => req.body(Body::empty()),
    };
    call(app, req.expect("building request")).await
}

async fn fetch_json<T>(app: &mut ForumApp, uri: &str) -> Result<T, StatusCode>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let req = request::Builder::new()
        .method(Method::GET)
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .expect("building request");
    let resp = call(app, req).await;
    let status = resp.status();
    if status != StatusCode::OK {
        return Err(status);
    }
    let body = body_bytes(resp).await;
    Ok(serde_json::from_slice(&body)
        .unwrap_or_else(|err| panic!("parsing json from {uri}: {err}, body is {body:?}")))
}

fn compare<T>(name: &str, app_res: T, mock_res: T)
where
    T: Debug + PartialEq,
{
    assert_eq!(
        app_res, mock_res,
        "app and mock did not return the same result for {name}"
    );
}

fn resize_int(fuzz_id: usize, RangeTo { end }: RangeTo<usize>) -> Option<usize> {
    if end == 0 {
        return None;
    }
    let bucket_size = cmp::max(1, usize::MAX / end); // in case we rounded to 0
    let id = fuzz_id / bucket_size;
    Some(cmp::min(id, end - 1)) // in case id was actually over end - 1 due to rounding
}

struct Session {
    app: AuthToken,
    mock: AuthToken,
}

struct Written<Id> {
    app: Id,
    mock: Id,
}

struct WrittenComment {
    post: Written<PostId>,
    comment: Written<CommentId>,
}

struct ComparativeFuzzer {
    admin_token: AuthToken,
    app: ForumApp,
    mock: MockServer,
    sessions: Vec<Session>,
    posts: Vec<Written<PostId>>,
    comments: Vec<WrittenComment>,
}

impl ComparativeFuzzer {
    fn new(pool: sqlx::PgPool) -> ComparativeFuzzer {
        let admin_token = AuthToken(Uuid::new_v4());
        let mut config = Config::new(String::from("postgresql://unused"));
        config.admin_token = Some(admin_token);
        let app = app(PgPool::new(pool), Arc::new(config)).expect("building app");
        ComparativeFuzzer {
            admin_token,
            app,
            mock: MockServer::new(),
            sessions: Vec::new(),
            posts: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Picks a session, `None` browsing anonymously
    fn session(&self, sid: Option<usize>) -> (Option<AuthToken>, Option<AuthToken>) {
        match sid.and_then(|sid| resize_int(sid, ..self.sessions.len())) {
            None => (None, None),
            Some(sid) => (Some(self.sessions[sid].app), Some(self.sessions[sid].mock)),
        }
    }

    async fn create_user(&mut self, user: NewUser, password: String) {
        let req = request::Builder::new()
            .method(Method::POST)
            .uri(crate::routes::ADMIN_CREATE_USER)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("bearer {}", self.admin_token.0))
            .body(Body::from(
                serde_json::to_vec(&user).expect("serializing request body to json"),
            ))
            .expect("building request");
        let resp = call(&mut self.app, req).await;
        let app_res = match resp.status() {
            StatusCode::OK => Ok(()),
            _ => {
                let body = body_bytes(resp).await;
                Err(ApiError::parse(&body).unwrap_or_else(|err| {
                    panic!("parsing error response body {err}, body is {body:?}")
                }))
            }
        };
        compare(
            "CreateUser",
            app_res,
            self.mock.admin_create_user(user, password),
        );
    }

    #[async_recursion]
    async fn execute_fuzz_op(&mut self, op: FuzzOp) {
        match op {
            FuzzOp::CreateUser {
                login,
                name,
                password,
                stub_id,
                url,
            } => {
                let password = format!("password{password}");
                let hash = bcrypt::hash(&password, 4).expect("hashing password");
                let id = match stub_id {
                    true => UserId::stub(),
                    false => UserId(Uuid::new_v4()),
                };
                let user = NewUser {
                    id,
                    login,
                    name,
                    email: None,
                    url,
                    initial_password_hash: hash,
                };
                self.create_user(user, password).await;
            }
            FuzzOp::SignIn {
                uid,
                wrong_password,
            } => {
                let uid = match resize_int(uid, ..self.mock.test_num_users()) {
                    Some(uid) => uid,
                    None => {
                        self.execute_fuzz_op(FuzzOp::CreateUser {
                            login: String::from("user"),
                            name: String::from("User"),
                            password: 0,
                            stub_id: false,
                            url: None,
                        })
                        .await;
                        return self
                            .execute_fuzz_op(FuzzOp::SignIn {
                                uid,
                                wrong_password,
                            })
                            .await;
                    }
                };
                let (login, password) = self.mock.test_get_user_info(uid);
                let login = String::from(login);
                let mut password = String::from(password);
                if wrong_password {
                    password.push('!');
                }
                let resp = browse(
                    &mut self.app,
                    Method::POST,
                    &Routes.signin_form(),
                    None,
                    Some(&[("login", login.as_str()), ("password", password.as_str())][..]),
                )
                .await;
                let app_tok = match resp.status() {
                    StatusCode::SEE_OTHER => {
                        let headers = http::HeaderMap::from_iter(
                            resp.headers()
                                .get_all(header::SET_COOKIE)
                                .iter()
                                .map(|c| (header::COOKIE, c.clone())),
                        );
                        Some(session_token(&headers).expect("signin did not set a session"))
                    }
                    StatusCode::OK => None,
                    status => panic!("unexpected signin status {status}"),
                };
                let mock_tok = self
                    .mock
                    .sign_in(NewSession {
                        login,
                        password,
                        device: String::from("unknown"),
                    })
                    .expect("signing in on the mock");
                compare("SignIn", app_tok.is_some(), mock_tok.is_some());
                if let (Some(app), Some(mock)) = (app_tok, mock_tok) {
                    self.sessions.push(Session { app, mock });
                }
            }
            FuzzOp::SignOut { sid } => {
                if let Some(sid) = resize_int(sid, ..self.sessions.len()) {
                    let resp = browse(
                        &mut self.app,
                        Method::GET,
                        &Routes.signout(),
                        Some(self.sessions[sid].app),
                        None,
                    )
                    .await;
                    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
                    self.mock.sign_out(self.sessions[sid].mock);
                    // the stale session is kept around to check it no longer works
                }
            }
            FuzzOp::WritePost {
                sid,
                title,
                body,
                sticky,
            } => {
                let (app_tok, mock_tok) = self.session(sid);
                let resp = browse(
                    &mut self.app,
                    Method::POST,
                    crate::routes::POSTS,
                    app_tok,
                    Some(post_fields(&title, &body, sticky).as_slice()),
                )
                .await;
                let app_res = Outcome::of_app(&resp);
                let mock_id = PostId(Uuid::new_v4());
                let mock_res = self.mock.create_post(
                    mock_tok,
                    mock_id,
                    NewPost {
                        title,
                        body,
                        sticky,
                    },
                    Utc::now(),
                );
                compare("WritePost", app_res, Outcome::of_mock(&mock_res));
                if mock_res.is_ok() {
                    let app_id = location(&resp)
                        .and_then(|l| l.strip_prefix("/posts/").map(String::from))
                        .and_then(|id| Uuid::try_from(id.as_str()).ok())
                        .expect("new post location");
                    self.posts.push(Written {
                        app: PostId(app_id),
                        mock: mock_id,
                    });
                }
            }
            FuzzOp::EditPost {
                sid,
                pid,
                title,
                body,
                sticky,
            } => {
                if let Some(pid) = resize_int(pid, ..self.posts.len()) {
                    let (app_tok, mock_tok) = self.session(sid);
                    let uri = override_method(&Routes.post(self.posts[pid].app), &Method::PUT);
                    let resp = browse(
                        &mut self.app,
                        Method::POST,
                        &uri,
                        app_tok,
                        Some(post_fields(&title, &body, sticky).as_slice()),
                    )
                    .await;
                    let mock_res = self.mock.edit_post(
                        mock_tok,
                        self.posts[pid].mock,
                        NewPost {
                            title,
                            body,
                            sticky,
                        },
                        Utc::now(),
                    );
                    compare(
                        "EditPost",
                        Outcome::of_app(&resp),
                        Outcome::of_mock(&mock_res),
                    );
                }
            }
            FuzzOp::DeletePost { sid, pid } => {
                if let Some(pid) = resize_int(pid, ..self.posts.len()) {
                    let (app_tok, mock_tok) = self.session(sid);
                    let uri =
                        override_method(&Routes.post_delete(self.posts[pid].app), &Method::DELETE);
                    let resp = browse(&mut self.app, Method::POST, &uri, app_tok, None).await;
                    let mock_res = self.mock.delete_post(mock_tok, self.posts[pid].mock);
                    compare(
                        "DeletePost",
                        Outcome::of_app(&resp),
                        Outcome::of_mock(&mock_res),
                    );
                }
            }
            FuzzOp::WriteComment {
                sid,
                pid,
                parent,
                body,
            } => {
                let pid = match resize_int(pid, ..self.posts.len()) {
                    Some(pid) => pid,
                    None => return,
                };
                let (post_app, post_mock) = (self.posts[pid].app, self.posts[pid].mock);
                let (parent_app, parent_mock) = match parent {
                    None => (String::new(), None),
                    Some(Parent::Written(cid)) => match resize_int(cid, ..self.comments.len()) {
                        None => (String::new(), None),
                        Some(cid) => {
                            let c = &self.comments[cid].comment;
                            (c.app.0.to_string(), Some(c.mock))
                        }
                    },
                    // the server reads the field as the mock would, unknown ids never match
                    Some(Parent::Raw { text }) => {
                        let mock = match text.trim() {
                            "" => None,
                            t => Some(CommentId(
                                Uuid::try_from(t).unwrap_or_else(|_| Uuid::new_v4()),
                            )),
                        };
                        (text, mock)
                    }
                };

                let (app_tok, mock_tok) = self.session(sid);
                let resp = browse(
                    &mut self.app,
                    Method::POST,
                    &Routes.comment_form(post_app),
                    app_tok,
                    Some(&[("parent_id", parent_app.as_str()), ("body", body.as_str())][..]),
                )
                .await;
                let mock_id = CommentId(Uuid::new_v4());
                let mock_res = self.mock.create_comment(
                    mock_tok,
                    post_mock,
                    mock_id,
                    NewComment {
                        parent_id: parent_mock,
                        body,
                    },
                    Utc::now(),
                );
                compare(
                    "WriteComment",
                    Outcome::of_app(&resp),
                    Outcome::of_mock(&mock_res),
                );
                if mock_res.is_ok() {
                    let app_id = location(&resp)
                        .and_then(|l| l.split_once("#comment-").map(|(_, c)| String::from(c)))
                        .and_then(|id| Uuid::try_from(id.as_str()).ok())
                        .expect("new comment location");
                    self.comments.push(WrittenComment {
                        post: Written {
                            app: post_app,
                            mock: post_mock,
                        },
                        comment: Written {
                            app: CommentId(app_id),
                            mock: mock_id,
                        },
                    });
                }
            }
            FuzzOp::DeleteComment { sid, cid } => {
                if let Some(cid) = resize_int(cid, ..self.comments.len()) {
                    let c = &self.comments[cid];
                    let (post_app, post_mock) = (c.post.app, c.post.mock);
                    let (comment_app, comment_mock) = (c.comment.app, c.comment.mock);
                    let (app_tok, mock_tok) = self.session(sid);
                    let uri = override_method(
                        &Routes.comment_delete(post_app, comment_app),
                        &Method::DELETE,
                    );
                    let resp = browse(&mut self.app, Method::POST, &uri, app_tok, None).await;
                    let mock_res = self.mock.delete_comment(mock_tok, post_mock, comment_mock);
                    compare(
                        "DeleteComment",
                        Outcome::of_app(&resp),
                        Outcome::of_mock(&mock_res),
                    );
                }
            }
            FuzzOp::FetchThread { pid } => {
                if let Some(pid) = resize_int(pid, ..self.posts.len()) {
                    let uri = Routes.post(self.posts[pid].app);
                    let app_res = fetch_json::<Thread>(&mut self.app, &uri)
                        .await
                        .map(|t| Shape::of_thread(&t));
                    let mock_res = self
                        .mock
                        .fetch_thread(self.posts[pid].mock)
                        .map(|t| Shape::of_thread(&t))
                        .map_err(|e| e.status_code());
                    compare("FetchThread", app_res, mock_res);
                }
            }
            FuzzOp::ListPosts { offset } => {
                let offset = offset.unwrap_or(0);
                let uri = Routes.posts_page(offset, 100);
                let app_res = fetch_json::<PostList>(&mut self.app, &uri)
                    .await
                    .map(|l| {
                        let titles = l.posts.into_iter().map(|p| p.title).collect::<Vec<_>>();
                        (l.total, titles)
                    });
                let mock_posts = self.mock.list_posts(offset, 100);
                let mock_res = Ok((
                    self.mock.list_posts(0, usize::MAX).len(),
                    mock_posts.into_iter().map(|p| p.title.clone()).collect(),
                ));
                compare("ListPosts", app_res, mock_res);
            }
        }
    }
}

do_sqlx_test!(
    comment_parents_stay_in_their_post,
    bolero::generator::gen::<()>(),
    |pool, ()| async move {
        let mut fuzzer = ComparativeFuzzer::new(pool);
        let mut ops = vec![FuzzOp::SignIn {
            uid: 0,
            wrong_password: false,
        }];
        for pid in [0, usize::MAX] {
            ops.push(FuzzOp::WritePost {
                sid: Some(0),
                title: format!("post {pid}"),
                body: String::from("body"),
                sticky: false,
            });
        }
        ops.push(FuzzOp::WriteComment {
            sid: Some(0),
            pid: 0,
            parent: None,
            body: String::from("in the first post"),
        });
        for op in ops {
            fuzzer.execute_fuzz_op(op).await;
        }
        assert_eq!(fuzzer.posts.len(), 2);
        assert_eq!(fuzzer.comments.len(), 1);

        let refused = [
            Parent::Written(0),
            Parent::Raw {
                text: String::from("not-a-uuid"),
            },
            Parent::Raw {
                text: Uuid::new_v4().to_string(),
            },
        ];
        for parent in refused {
            fuzzer
                .execute_fuzz_op(FuzzOp::WriteComment {
                    sid: Some(0),
                    pid: usize::MAX,
                    parent: Some(parent),
                    body: String::from("misplaced reply"),
                })
                .await;
        }
        assert_eq!(fuzzer.comments.len(), 1);

        fuzzer
            .execute_fuzz_op(FuzzOp::WriteComment {
                sid: Some(0),
                pid: 0,
                parent: Some(Parent::Written(0)),
                body: String::from("reply"),
            })
            .await;
        assert_eq!(fuzzer.comments.len(), 2);
        fuzzer
            .execute_fuzz_op(FuzzOp::ListPosts {
                offset: Some(usize::MAX),
            })
            .await;
    },
    iterations = 1
);

do_sqlx_test!(
    compare_with_mock,
    bolero::generator::gen_with::<Vec<FuzzOp>>().len(1..100usize),
    |pool, test: Vec<FuzzOp>| async move {
        let mut fuzzer = ComparativeFuzzer::new(pool);
        for op in test {
            fuzzer.execute_fuzz_op(op).await;
        }
    }
);
