//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_GITHUB_REF: &str = "meta";
const DEFAULT_MEMORY_CAPACITY: usize = 512;

/// Command-line arguments for the Folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Folio blog content server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub globals: GlobalOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Overrides read on every invocation, with or without a subcommand.
#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Run in development mode: caching off, local content when configured.
    #[arg(
        long = "dev",
        env = "FOLIO_DEV",
        global = true,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub dev: Option<bool>,

    /// Local content directory.
    #[arg(long = "content-dir", env = "FOLIO_CONTENT_DIR", global = true, value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub content_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Folio HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Origin used for same-process `/cache/*` requests.
    #[arg(long = "public-url", value_name = "URL")]
    pub public_url: Option<String>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// GitHub repository holding the content (`owner/name`).
    #[arg(long = "github-repo", value_name = "REPO")]
    pub github_repo: Option<String>,

    /// Redis connection string for the remote cache tier.
    #[arg(long = "redis-url", value_name = "URL")]
    pub redis_url: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub mode: Mode,
    pub content: ContentSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub public_url: Url,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Production,
    Development,
}

impl Mode {
    pub fn is_development(self) -> bool {
        matches!(self, Mode::Development)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Mode::Production),
            "development" | "dev" => Ok(Mode::Development),
            other => Err(format!("unknown mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub local_dir: Option<PathBuf>,
    pub github: GitHubSettings,
}

#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub repo: Option<String>,
    pub token: Option<String>,
    pub reference: String,
    pub api_url: String,
}

/// Which content adapter serves reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBackend {
    Local(PathBuf),
    GitHub { repo: String },
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub memory_capacity: usize,
    pub redis_url: Option<String>,
    pub purge_secret: Option<String>,
}

impl Settings {
    /// Development mode switches every cache lookup to a direct load.
    pub fn cache_enabled(&self) -> bool {
        !self.mode.is_development()
    }

    /// Local content is used only in development mode with a directory set.
    pub fn content_backend(&self) -> Result<ContentBackend, LoadError> {
        if self.mode.is_development()
            && let Some(dir) = self.content.local_dir.as_ref()
        {
            return Ok(ContentBackend::Local(dir.clone()));
        }

        match self.content.github.repo.as_ref() {
            Some(repo) => Ok(ContentBackend::GitHub { repo: repo.clone() }),
            None => Err(LoadError::invalid(
                "content.github_repo",
                "required unless development mode uses a local content directory",
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FOLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }
    raw.apply_global_overrides(&cli.globals);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    mode: Option<String>,
    content: RawContentSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(dev) = overrides.dev {
            let mode = if dev { "development" } else { "production" };
            self.mode = Some(mode.to_string());
        }
        if let Some(dir) = overrides.content_dir.as_ref() {
            self.content.local_dir = Some(dir.clone());
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(url) = overrides.public_url.as_ref() {
            self.server.public_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(repo) = overrides.github_repo.as_ref() {
            self.content.github_repo = Some(repo.clone());
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            mode,
            content,
            cache,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let mode = match mode.as_deref().and_then(non_blank) {
            Some(value) => {
                Mode::from_str(&value).map_err(|reason| LoadError::invalid("mode", reason))?
            }
            None => Mode::Production,
        };
        let content = build_content_settings(content)?;
        let cache = build_cache_settings(cache)?;

        Ok(Self {
            server,
            logging,
            mode,
            content,
            cache,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let public_url = server
        .public_url
        .as_deref()
        .and_then(non_blank)
        .unwrap_or_else(|| format!("http://{host}:{port}"));
    let public_url = Url::parse(&public_url).map_err(|err| {
        LoadError::invalid("server.public_url", format!("invalid url `{public_url}`: {err}"))
    })?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        public_url,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let local_dir = content
        .local_dir
        .filter(|path| !path.as_os_str().is_empty());

    let repo = content.github_repo.as_deref().and_then(non_blank);
    if let Some(repo) = repo.as_deref()
        && repo.split('/').filter(|part| !part.is_empty()).count() != 2
    {
        return Err(LoadError::invalid(
            "content.github_repo",
            format!("expected `owner/name`, got `{repo}`"),
        ));
    }

    let api_url = content
        .github_api_url
        .as_deref()
        .and_then(non_blank)
        .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string());
    Url::parse(&api_url).map_err(|err| {
        LoadError::invalid("content.github_api_url", format!("invalid url `{api_url}`: {err}"))
    })?;

    Ok(ContentSettings {
        local_dir,
        github: GitHubSettings {
            repo,
            token: content.github_token.as_deref().and_then(non_blank),
            reference: content
                .github_ref
                .as_deref()
                .and_then(non_blank)
                .unwrap_or_else(|| DEFAULT_GITHUB_REF.to_string()),
            api_url,
        },
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let memory_capacity = cache.memory_capacity.unwrap_or(DEFAULT_MEMORY_CAPACITY);
    if memory_capacity == 0 {
        return Err(LoadError::invalid(
            "cache.memory_capacity",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        memory_capacity,
        redis_url: cache.redis_url.as_deref().and_then(non_blank),
        purge_secret: cache.purge_secret.as_deref().and_then(non_blank),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    public_url: Option<String>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    local_dir: Option<PathBuf>,
    github_repo: Option<String>,
    github_token: Option<String>,
    github_ref: Option<String>,
    github_api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    memory_capacity: Option<usize>,
    redis_url: Option<String>,
    purge_secret: Option<String>,
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
