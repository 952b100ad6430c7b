use std::{
    io::{BufRead, Write},
    net::SocketAddr,
    path::Path,
};

use anyhow::{anyhow, Context};
use axum::http::HeaderValue;
use forum_api::{AuthToken, Uuid};

/// External site linked from every page
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Intersite {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<AuthToken>,

    /// Value forced into the `Host` header of every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_rewrite: Option<String>,

    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: usize,

    #[serde(default)]
    pub intersites: Vec<Intersite>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_posts_per_page() -> usize {
    20
}

impl Config {
    pub fn new(database_url: String) -> Config {
        Config {
            database_url,
            listen: default_listen(),
            admin_token: None,
            host_rewrite: None,
            posts_per_page: default_posts_per_page(),
            intersites: Vec::new(),
        }
    }

    pub fn parse(contents: &str) -> anyhow::Result<Config> {
        toml::from_str(contents).context("parsing configuration")
    }

    /// Reads the configuration file, then applies environment overrides
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration file {}", path.display()))?;
        let mut config =
            Config::parse(&contents).with_context(|| format!("in {}", path.display()))?;
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Configuration coming only from the environment
    pub fn from_env() -> anyhow::Result<Config> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let mut config = Config::new(database_url);
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn apply_overrides(
        &mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(url) = get("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(token) = get("ADMIN_TOKEN") {
            let token = Uuid::try_from(token.trim())
                .with_context(|| format!("ADMIN_TOKEN is not a valid uuid: {token:?}"))?;
            self.admin_token = Some(AuthToken(token));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("serializing configuration")
    }

    pub fn host_header(&self) -> anyhow::Result<Option<HeaderValue>> {
        self.host_rewrite
            .as_deref()
            .map(|h| {
                HeaderValue::from_str(h).with_context(|| format!("invalid host_rewrite {h:?}"))
            })
            .transpose()
    }
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> anyhow::Result<String> {
    write!(output, "{question}").context("writing prompt")?;
    output.flush().context("flushing prompt")?;
    let mut line = String::new();
    input.read_line(&mut line).context("reading answer")?;
    Ok(String::from(line.trim()))
}

fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> anyhow::Result<bool> {
    let answer = prompt(input, output, &format!("{question} [y/N] "))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

/// Offers to write a new configuration file at `path`.
///
/// Returns the written configuration, or `None` if the user declined.
pub fn create_interactively<R: BufRead, W: Write>(
    path: &Path,
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<Option<Config>> {
    if !confirm(
        input,
        output,
        &format!("{} doesn't exist. Create it?", path.display()),
    )? {
        return Ok(None);
    }

    let database_url = prompt(input, output, "Database URL: ")?;
    if database_url.is_empty() {
        return Err(anyhow!("a database URL is required"));
    }
    let mut config = Config::new(database_url);

    if confirm(input, output, "Generate an admin API token?")? {
        let token = AuthToken(Uuid::new_v4());
        writeln!(output, "Admin token: {}", token.0).context("writing admin token")?;
        config.admin_token = Some(token);
    }

    while confirm(input, output, "Add a link to an external site?")? {
        let name = prompt(input, output, "Site name: ")?;
        let url = prompt(input, output, "Site URL: ")?;
        if name.is_empty() || url.is_empty() {
            writeln!(output, "Both a name and a URL are needed, skipping")
                .context("writing warning")?;
            continue;
        }
        config.intersites.push(Intersite { name, url });
    }

    std::fs::write(path, config.to_toml()?)
        .with_context(|| format!("writing configuration file {}", path.display()))?;
    tracing::info!(path=%path.display(), "wrote configuration file");
    Ok(Some(config))
}
