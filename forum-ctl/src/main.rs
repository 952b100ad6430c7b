use anyhow::{anyhow, Context};
use forum_api::{AuthToken, NewUser, UserId, Uuid};

#[derive(structopt::StructOpt)]
#[structopt(name = "forum-ctl", about = "Administrate a running forum")]
struct Opt {
    /// Base URL of the forum, like https://forum.example.org
    #[structopt(short, long)]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Create a user
    CreateUser {
        /// Login name
        login: String,

        /// Display name
        name: String,

        /// Initial password
        initial_password: String,

        #[structopt(long)]
        email: Option<String>,

        /// Personal website shown on the profile
        #[structopt(long)]
        url: Option<String>,
    },
}

fn admin_token() -> anyhow::Result<AuthToken> {
    let tok =
        std::env::var("ADMIN_TOKEN").context("retrieving ADMIN_TOKEN environment variable")?;
    let tok = Uuid::try_parse(&tok).context("parsing ADMIN_TOKEN as an auth token")?;
    Ok(AuthToken(tok))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    let client = reqwest::Client::new();

    match opt.cmd {
        Command::CreateUser {
            login,
            name,
            initial_password,
            email,
            url,
        } => {
            let id = UserId(Uuid::new_v4());
            let mut user = NewUser::new(id, login, name, email, initial_password).with_url(url);
            user.validate()?;
            let resp = client
                .post(format!(
                    "{}/api/admin/create-user",
                    opt.host.trim_end_matches('/')
                ))
                .json(&user)
                .bearer_auth(admin_token()?.0)
                .send()
                .await
                .with_context(|| format!("connecting to {}", opt.host))?;
            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.bytes().await.context("reading error response")?;
                return Err(match forum_api::Error::parse(&body) {
                    Ok(e) => anyhow!(e),
                    Err(_) => anyhow!("server answered {status}"),
                });
            }
            tracing::info!(login=%user.login, ?id, "created user");
        }
    }

    Ok(())
}
