//! Prints SQL filling a fresh database with users, posts and comment threads
//!
//! Every user `userN` can sign in with password `passwordN`.

use chrono::{Duration, Utc};
use rand::Rng;
use uuid::Uuid;

const NUM_USERS: usize = 5;
const PASSWORD_COST: u32 = 8;

const NUM_POSTS: usize = 60;
const NUM_STICKY_POSTS: usize = 2;
const POST_PARAGRAPH_WORDS: usize = 40;

const MAX_COMMENTS_PER_POST: usize = 40;
const COMMENT_WORDS: usize = 20;

/// Chance for a comment to answer a previous comment rather than the post
const REPLY_PROBABILITY: f64 = 0.7;

fn gen_n_items(table: &str, n: usize, mut f: impl FnMut(usize) -> String) {
    if n == 0 {
        return;
    }
    println!("INSERT INTO {} VALUES", table);
    for i in 0..n {
        if i != 0 {
            println!(",");
        }
        print!("    {}", f(i));
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn gen_post_body(rng: &mut impl Rng) -> String {
    let paragraphs = rng.gen_range(1..=4);
    (0..paragraphs)
        .map(|_| lipsum::lipsum_words(rng.gen_range(5..=POST_PARAGRAPH_WORDS)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn main() {
    let mut rng = rand::thread_rng();
    let start = Utc::now() - Duration::days(30);

    // Generate users
    let mut users = Vec::new();
    gen_n_items(
        "users (id, login, name, email, url, password_hash, created_at)",
        NUM_USERS,
        |i| {
            let uuid = Uuid::new_v4();
            users.push(uuid);
            let hash = bcrypt::hash(format!("password{i}"), PASSWORD_COST)
                .expect("hashing test password");
            format!(
                "('{}', 'user{}', {}, 'user{}@example.org', {}, {}, '{}')",
                uuid,
                i,
                quote(&lipsum::lipsum_title()),
                i,
                match i % 2 {
                    0 => format!("'https://user{i}.example.org/'"),
                    _ => String::from("NULL"),
                },
                quote(&hash),
                start.to_rfc3339(),
            )
        },
    );

    // Generate posts, one every few hours
    let mut posts = Vec::new();
    gen_n_items(
        "posts (id, author_id, title, body, sticky, created_at, modified_at)",
        NUM_POSTS,
        |i| {
            let uuid = Uuid::new_v4();
            let created = start + Duration::hours(6 * i as i64 + 1);
            posts.push((uuid, created));
            let modified = match rng.gen_bool(0.2) {
                true => created + Duration::minutes(rng.gen_range(1..600)),
                false => created,
            };
            format!(
                "('{}', '{}', {}, {}, {}, '{}', '{}')",
                uuid,
                users[rng.gen_range(0..users.len())],
                quote(&lipsum::lipsum_title()),
                quote(&gen_post_body(&mut rng)),
                i < NUM_STICKY_POSTS,
                created.to_rfc3339(),
                modified.to_rfc3339(),
            )
        },
    );

    // Generate comment threads, parents always before their replies
    for (post, post_created) in posts {
        let n = rng.gen_range(0..=MAX_COMMENTS_PER_POST);
        let mut comments: Vec<Uuid> = Vec::new();
        gen_n_items(
            "comments (id, post_id, parent_id, author_id, body, created_at)",
            n,
            |i| {
                let uuid = Uuid::new_v4();
                let parent = match comments.is_empty() || !rng.gen_bool(REPLY_PROBABILITY) {
                    true => String::from("NULL"),
                    // favor recent comments to get deep threads
                    false => {
                        let from = comments.len().saturating_sub(3);
                        format!("'{}'", comments[rng.gen_range(from..comments.len())])
                    }
                };
                comments.push(uuid);
                format!(
                    "('{}', '{}', {}, '{}', {}, '{}')",
                    uuid,
                    post,
                    parent,
                    users[rng.gen_range(0..users.len())],
                    quote(&lipsum::lipsum_words(rng.gen_range(1..=COMMENT_WORDS))),
                    (post_created + Duration::minutes(5 * i as i64 + 1)).to_rfc3339(),
                )
            },
        );
    }
}
