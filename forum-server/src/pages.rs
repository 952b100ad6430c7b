use askama::Template;
use forum_api::{PageFlag, Pager, Post, Profile, User};

use crate::{
    config::{Config, Intersite},
    render::Timestamp,
    routes::{Routes, Urls},
};

pub struct Account {
    pub name: String,
    pub profile_url: String,
}

/// What every page shows around its contents
pub struct Layout {
    pub title: String,
    pub account: Option<Account>,
    pub intersites: Vec<Intersite>,
    pub posts_url: String,
    pub signin_url: String,
    pub signout_url: String,
}

impl Layout {
    pub fn new(title: impl Into<String>, viewer: Option<&User>, config: &Config) -> Layout {
        Layout {
            title: title.into(),
            account: viewer.map(|u| Account {
                name: u.name.clone(),
                profile_url: Routes.user_profile(&u.login),
            }),
            intersites: config.intersites.clone(),
            posts_url: Routes.posts_page(0, config.posts_per_page),
            signin_url: Routes.signin_form(),
            signout_url: Routes.signout(),
        }
    }

    /// Layout usable without any request context
    pub fn bare(title: impl Into<String>) -> Layout {
        Layout {
            title: title.into(),
            account: None,
            intersites: Vec::new(),
            posts_url: String::from(crate::routes::POSTS),
            signin_url: Routes.signin_form(),
            signout_url: Routes.signout(),
        }
    }
}

pub struct PostSummary {
    pub title: String,
    pub url: String,
    pub author_name: String,
    pub author_url: String,
    pub created: Timestamp,
    pub sticky: bool,
}

impl PostSummary {
    pub fn new<U: Urls>(post: &Post, urls: &U) -> PostSummary {
        PostSummary {
            title: post.title.clone(),
            url: urls.post(post.id),
            author_name: post.author.name.clone(),
            author_url: urls.user_profile(&post.author.login),
            created: Timestamp::new(&post.created_at),
            sticky: post.sticky,
        }
    }
}

pub struct PageLink {
    pub page: usize,
    pub url: String,
    pub selected: bool,
    pub gap_before: bool,
    pub gap_after: bool,
}

impl PageLink {
    pub fn list<U: Urls>(pager: Pager, limit: usize, urls: &U) -> Vec<PageLink> {
        pager
            .iter()
            .map(|(flag, page)| PageLink {
                page,
                url: urls.posts_page((page - 1) * limit, limit),
                selected: flag == PageFlag::Selected,
                gap_before: flag == PageFlag::Last,
                gap_after: flag == PageFlag::First,
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "user/signin_form.html")]
pub struct SigninPage {
    pub layout: Layout,
    pub action: String,
    pub login: String,
    pub failed: bool,
}

#[derive(Template)]
#[template(path = "user/profile.html")]
pub struct ProfilePage {
    pub layout: Layout,
    pub name: String,
    pub login: String,
    pub email: Option<String>,
    pub url: Option<String>,
    pub joined: Timestamp,
    pub posts: Vec<PostSummary>,
}

impl ProfilePage {
    pub fn new(layout: Layout, profile: &Profile, posts: &[Post]) -> ProfilePage {
        ProfilePage {
            layout,
            name: profile.user.name.clone(),
            login: profile.user.login.clone(),
            email: profile.email.clone(),
            url: profile.url.clone(),
            joined: Timestamp::new(&profile.created_at),
            posts: posts.iter().map(|p| PostSummary::new(p, &Routes)).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "forum/posts.html")]
pub struct PostListPage {
    pub layout: Layout,
    pub posts: Vec<PostSummary>,
    pub pages: Vec<PageLink>,
    pub write_url: Option<String>,
}

#[derive(Template)]
#[template(path = "forum/post.html")]
pub struct PostPage {
    pub layout: Layout,
    pub thread: String,
    pub comment_count: usize,
    pub comment_action: Option<String>,
}

#[derive(Template)]
#[template(path = "forum/post_form.html")]
pub struct PostFormPage {
    pub layout: Layout,
    pub heading: &'static str,
    pub action: String,
    pub cancel_url: String,
    pub title: String,
    pub body: String,
    pub sticky: bool,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub layout: Layout,
    pub status: u16,
    pub reason: String,
    pub message: String,
}

impl ErrorPage {
    pub fn new(err: &forum_api::Error) -> ErrorPage {
        let status = err.status_code();
        let reason = String::from(status.canonical_reason().unwrap_or("Error"));
        ErrorPage {
            layout: Layout::bare(reason.clone()),
            status: status.as_u16(),
            reason,
            message: err.to_string(),
        }
    }
}
