//! Interactive administration shell reading commands from stdin

use anyhow::{anyhow, Context};
use forum_api::{NewUser, PostId, UserId, Uuid};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::{db, PgPool};

const HELP: &str = "\
Commands:
  help                                      show this message
  users                                     list users
  create-user LOGIN NAME PASSWORD [EMAIL [URL]]
                                            create a user
  posts                                     list the latest posts
  delete-post ID                            delete a post and its comments
  quit                                      leave the shell";

#[derive(Debug, Eq, PartialEq)]
pub enum Command {
    Nothing,
    Help,
    Users,
    CreateUser {
        login: String,
        name: String,
        password: String,
        email: Option<String>,
        url: Option<String>,
    },
    Posts,
    DeletePost(PostId),
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> anyhow::Result<Command> {
        let words = line.split_whitespace().collect::<Vec<_>>();
        Ok(match words.as_slice() {
            [] => Command::Nothing,
            ["help"] => Command::Help,
            ["users"] => Command::Users,
            ["create-user", login, name, password] => Command::CreateUser {
                login: String::from(*login),
                name: String::from(*name),
                password: String::from(*password),
                email: None,
                url: None,
            },
            ["create-user", login, name, password, email] => Command::CreateUser {
                login: String::from(*login),
                name: String::from(*name),
                password: String::from(*password),
                email: Some(String::from(*email)),
                url: None,
            },
            ["create-user", login, name, password, email, url] => Command::CreateUser {
                login: String::from(*login),
                name: String::from(*name),
                password: String::from(*password),
                email: Some(String::from(*email)),
                url: Some(String::from(*url)),
            },
            ["posts"] => Command::Posts,
            ["delete-post", id] => Command::DeletePost(PostId(
                Uuid::try_from(*id).with_context(|| format!("invalid post id {id:?}"))?,
            )),
            ["quit"] | ["exit"] => Command::Quit,
            [cmd, ..] => {
                return Err(anyhow!("unknown command or wrong arguments: {cmd}, try help"))
            }
        })
    }
}

async fn execute(pool: &PgPool, cmd: Command) -> anyhow::Result<String> {
    let mut conn = pool.acquire().await?;
    Ok(match cmd {
        Command::Nothing | Command::Quit => String::new(),
        Command::Help => format!("{HELP}\n"),
        Command::Users => db::fetch_users(&mut *conn)
            .await?
            .into_iter()
            .map(|u| format!("{}\t{}\t{}\n", u.id.0, u.login, u.name))
            .collect(),
        Command::CreateUser {
            login,
            name,
            password,
            email,
            url,
        } => {
            let mut user = NewUser::new(UserId(Uuid::new_v4()), login, name, email, password)
                .with_url(url);
            user.validate()?;
            let (id, login) = (user.id, user.login.clone());
            db::create_user(&mut *conn, user).await?;
            format!("created user {login} with id {}\n", id.0)
        }
        Command::Posts => db::fetch_posts(&mut *conn, 0, 50)
            .await?
            .into_iter()
            .map(|p| {
                format!(
                    "{}\t{}\t{}\t{}\n",
                    p.id.0,
                    p.created_at.format("%Y-%m-%d %H:%M"),
                    p.author.login,
                    p.title
                )
            })
            .collect(),
        Command::DeletePost(id) => match db::delete_post(&mut *conn, id).await? {
            true => format!("deleted post {}\n", id.0),
            false => format!("no post {}\n", id.0),
        },
    })
}

pub async fn run(pool: &PgPool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"forum> ").await.context("writing prompt")?;
        stdout.flush().await.context("flushing prompt")?;
        let line = match lines.next_line().await.context("reading command")? {
            None => return Ok(()),
            Some(line) => line,
        };
        let output = match Command::parse(&line) {
            Ok(Command::Quit) => return Ok(()),
            Ok(cmd) => execute(pool, cmd)
                .await
                .unwrap_or_else(|e| format!("error: {e:#}\n")),
            Err(e) => format!("error: {e:#}\n"),
        };
        stdout
            .write_all(output.as_bytes())
            .await
            .context("writing command output")?;
    }
}
