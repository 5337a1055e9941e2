//! # QuickPin CLI (`qpi`)
//!
//! Command-line client for the QuickPin API: submit profiles for ingestion,
//! search, fetch resources, print a token, or follow the notification feed.
//!
//! ## Usage
//!
//! ```bash
//! qpi --url https://quickpin.example.com --username guest <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qpi submit-names <file> <site>` | Submit profiles by username |
//! | `qpi submit-ids <file> <site>` | Submit profiles by site user ID |
//! | `qpi search "<query>"` | Search indexed profiles and posts |
//! | `qpi get <resource>` | Fetch any API resource as JSON |
//! | `qpi token` | Print an API token for reuse with `--token` |
//! | `qpi notifications` | Print notifications as they arrive |
//!
//! ## Examples
//!
//! ```bash
//! # Avoid repeating connection settings
//! export QUICKPIN_URL=https://quickpin.example.com
//! export QUICKPIN_USER=guest
//! export QUICKPIN_PASSWORD=password
//!
//! # One username per line, one request every 5 seconds
//! qpi submit-names usernames.csv twitter --interval 5
//!
//! # 20 IDs per request, imported as stubs
//! qpi submit-ids ids.txt instagram --chunk 20 --stub
//!
//! # Reuse a token for later calls
//! export QUICKPIN_TOKEN=$(qpi token)
//! qpi search darpa --type profile
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use quickpin_api::config::{self, FileConfig};
use quickpin_api::input;
use quickpin_api::progress::ProgressMode;
use quickpin_api::{
    Auth, ClientConfig, Credentials, IdentityKind, QpiError, QuickPin, SearchQuery, Site,
    SubmitOptions, Token,
};

/// Config file read when `--config` is not given, if it exists.
const DEFAULT_CONFIG: &str = "./qpi.toml";

/// QuickPin CLI — submit, search and monitor profiles on a QuickPin server.
///
/// Connection settings come from flags, then environment variables, then the
/// optional TOML config file.
#[derive(Parser)]
#[command(
    name = "qpi",
    about = "QuickPin CLI — submit, search and monitor profiles on a QuickPin server",
    version
)]
struct Cli {
    /// Path to a TOML config file. Defaults to `./qpi.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// QuickPin base URL.
    #[arg(long, global = true, env = "QUICKPIN_URL")]
    url: Option<String>,

    /// Account email used to obtain a token.
    #[arg(long, global = true, env = "QUICKPIN_USER")]
    username: Option<String>,

    /// Account password.
    #[arg(long, global = true, env = "QUICKPIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Existing API token. Skips the login request.
    #[arg(long, global = true, env = "QUICKPIN_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Do not verify the server's TLS certificate (insecure).
    #[arg(long, global = true)]
    insecure: bool,

    /// Request timeout in seconds (0 = transport default).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug). Logs go to stderr.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Submit profiles by username.
    ///
    /// INPUT holds one username per line, or CSV lines of the form
    /// `username,"label1,label2"`.
    #[command(alias = "submit_names")]
    SubmitNames(SubmitArgs),

    /// Submit profiles by the site's user ID.
    ///
    /// INPUT holds one user ID per line, or CSV lines of the form
    /// `id,"label1,label2"`.
    #[command(alias = "submit_ids")]
    SubmitIds(SubmitArgs),

    /// Search indexed data.
    Search {
        /// The search query string.
        query: String,

        /// Restrict results to a type (e.g. `profile`, `post`).
        #[arg(long = "type")]
        r#type: Option<String>,

        /// Facet specification passed through to the server.
        #[arg(long)]
        facets: Option<String>,

        /// Results per page.
        #[arg(long, default_value_t = 100)]
        rpp: u32,

        /// Page number, starting at 1.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Sort specification (e.g. `-score`).
        #[arg(long)]
        sort: Option<String>,
    },

    /// Fetch an API resource (e.g. `/api/label/`) and print it as JSON.
    Get {
        /// Resource path relative to the base URL, or an absolute URL.
        resource: String,

        /// Page number, starting at 1.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Results per page.
        #[arg(long, default_value_t = 100)]
        rpp: u32,
    },

    /// Log in and print the API token.
    Token,

    /// Print notifications (one JSON object per line) until interrupted.
    Notifications,
}

#[derive(clap::Args)]
struct SubmitArgs {
    /// File of identifiers.
    input: PathBuf,

    /// Site the profiles belong to: `twitter` or `instagram`.
    site: Site,

    /// Import profiles as stubs.
    #[arg(long, overrides_with = "no_stub")]
    stub: bool,

    /// Import full profiles, overriding `stub = true` in the config file.
    #[arg(long, overrides_with = "stub")]
    no_stub: bool,

    /// Number of profiles per request [default: 1].
    #[arg(long)]
    chunk: Option<usize>,

    /// Seconds to wait between requests [default: 5].
    #[arg(long)]
    interval: Option<u64>,

    /// Progress output on stderr: `auto`, `human`, `json`, or `off`.
    #[arg(long, default_value = "auto", value_parser = ProgressMode::parse)]
    progress: ProgressMode,
}

impl SubmitArgs {
    /// The stub setting given on the command line, if any. The last of
    /// `--stub` / `--no-stub` wins.
    fn stub_flag(&self) -> Option<bool> {
        match (self.stub, self.no_stub) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_cfg = load_file_config(cli.config.as_deref())?;

    match cli.command {
        Commands::SubmitNames(ref args) => {
            run_submit(&cli, &file_cfg, args, IdentityKind::Username).await?;
        }
        Commands::SubmitIds(ref args) => {
            run_submit(&cli, &file_cfg, args, IdentityKind::UpstreamId).await?;
        }
        Commands::Search {
            ref query,
            ref r#type,
            ref facets,
            rpp,
            page,
            ref sort,
        } => {
            let client = connect(&cli, &file_cfg).await?;
            let query = SearchQuery {
                query: query.clone(),
                r#type: r#type.clone(),
                facets: facets.clone(),
                rpp,
                page,
                sort: sort.clone(),
            };
            let results = client.search(&query).await.context("search failed")?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Get {
            ref resource,
            page,
            rpp,
        } => {
            let client = connect(&cli, &file_cfg).await?;
            let body = client
                .get(resource, page, rpp)
                .await
                .with_context(|| format!("failed to fetch {}", resource))?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Commands::Token => {
            let client = connect(&cli, &file_cfg).await?;
            println!("{}", client.token().as_str());
        }
        Commands::Notifications => {
            let client = connect(&cli, &file_cfg).await?;
            let mut stream = client
                .listen()
                .await
                .context("failed to open notification stream")?;
            while let Some(event) = stream.next().await {
                let event = event.context("notification stream failed")?;
                println!("{}", serde_json::to_string(&event)?);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    match path {
        Some(p) => Ok(config::load_config(p)?),
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.exists() {
                Ok(config::load_config(default)?)
            } else {
                Ok(FileConfig::default())
            }
        }
    }
}

/// Resolve connection settings (flag/env > config file) and authenticate.
async fn connect(cli: &Cli, file_cfg: &FileConfig) -> Result<QuickPin> {
    let url = cli
        .url
        .clone()
        .or_else(|| file_cfg.server.url.clone())
        .context("no QuickPin URL: pass --url, set QUICKPIN_URL, or add [server] url to the config file")?;

    let client_cfg = ClientConfig {
        base_url: url,
        verify_tls: !cli.insecure && file_cfg.server.verify_tls,
        timeout_secs: cli.timeout.unwrap_or(file_cfg.server.timeout_secs),
    };

    let auth = match cli.token.clone().or_else(|| file_cfg.auth.token.clone()) {
        Some(token) => Auth::Token(Token::new(token)),
        None => {
            let username = cli
                .username
                .clone()
                .or_else(|| file_cfg.auth.username.clone());
            match (username, cli.password.clone()) {
                (Some(u), Some(p)) => Auth::Credentials(Credentials::new(u, p)),
                _ => bail!(
                    "no credentials: pass --token, or --username and --password \
                     (or set QUICKPIN_TOKEN / QUICKPIN_USER / QUICKPIN_PASSWORD)"
                ),
            }
        }
    };

    QuickPin::connect(client_cfg, auth)
        .await
        .context("failed to connect to QuickPin")
}

async fn run_submit(
    cli: &Cli,
    file_cfg: &FileConfig,
    args: &SubmitArgs,
    kind: IdentityKind,
) -> Result<()> {
    let options = SubmitOptions {
        stub: args.stub_flag().unwrap_or(file_cfg.submit.stub),
        chunk_size: args.chunk.unwrap_or(file_cfg.submit.chunk),
        interval_secs: args.interval.unwrap_or(file_cfg.submit.interval),
    };
    options.validate()?;

    let raw = std::fs::read(&args.input)
        .with_context(|| format!("failed to read input file: {}", args.input.display()))?;
    let parsed = input::parse_identifiers(&String::from_utf8_lossy(&raw));
    if parsed.is_empty() {
        println!("Empty file");
        return Ok(());
    }
    let labels = (!parsed.labels.is_empty()).then_some(&parsed.labels);

    let client = connect(cli, file_cfg).await?;
    let submission = match kind {
        IdentityKind::Username => {
            client.submit_usernames(parsed.identifiers.as_slice(), args.site, labels, options)
        }
        IdentityKind::UpstreamId => {
            client.submit_user_ids(parsed.identifiers.as_slice(), args.site, labels, options)
        }
    };
    let mut submission = match submission {
        Err(QpiError::EmptyInput) => {
            println!("Empty file");
            return Ok(());
        }
        other => other?.with_progress(args.progress.reporter()),
    };

    let total = submission.total_chunks();
    let mut done = 0;
    while let Some(result) = submission.next().await {
        let result = result.with_context(|| {
            format!("submission aborted after {} of {} chunks", done, total)
        })?;
        println!("{}", result.text());
        done += 1;
    }

    Ok(())
}
