use anyhow::{anyhow, Context};
use chrono::Duration;
use clap::{Parser, Subcommand};
use http::Method;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::DEFAULT_APP_URL;
use crate::manifest::load_table;
use crate::request::RouteRequest;
use crate::table::{Matched, RouteTable};
use crate::url::{Expiration, ParamBag, SigningKeys, UrlGenerator};

/// Command-line interface for signpost
///
/// Inspects route manifests: lists routes, matches requests, generates
/// URLs and exports the compiled table.
#[derive(Parser, Debug)]
#[command(name = "signpost")]
#[command(about = "Route manifest inspection and URLs", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every route in a manifest
    Routes {
        /// Route manifest (YAML, JSON or TOML)
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Match a request against a manifest and print the bound parameters
    Match {
        #[arg(short, long)]
        manifest: PathBuf,

        #[arg(long, default_value = "GET")]
        method: String,

        /// Request path, optionally with a query string
        #[arg(short, long)]
        path: String,

        /// Request host, for domain routes
        #[arg(long)]
        host: Option<String>,

        /// Treat the request as HTTPS
        #[arg(long, default_value_t = false)]
        secure: bool,
    },
    /// Generate the URL for a named route
    Url {
        #[arg(short, long)]
        manifest: PathBuf,

        /// Route name
        #[arg(short, long)]
        name: String,

        /// Route parameter as `key=value`; repeatable
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Emit a path instead of an absolute URL
        #[arg(long, default_value_t = false)]
        relative: bool,

        /// Application root URL
        #[arg(long, default_value = DEFAULT_APP_URL)]
        root: String,

        /// Sign the URL with this key (`base64:` prefix allowed)
        #[arg(long, env = "SIGNPOST_APP_KEY")]
        key: Option<String>,

        /// Signed URL lifetime in seconds; requires a key
        #[arg(long, requires = "key")]
        expires_in: Option<i64>,
    },
    /// Export the compiled route table as JSON
    Compile {
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

/// Parse arguments and execute, writing to stdout.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded, the request does not
/// match, or URL generation fails.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    execute(&cli, &mut stdout.lock())
}

/// Execute a parsed command against `out`.
pub fn execute(cli: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Routes { manifest } => {
            let table = load_table(manifest)?;
            print_routes(&table, out)
        }
        Commands::Match {
            manifest,
            method,
            path,
            host,
            secure,
        } => {
            let table = load_table(manifest)?;
            let method: Method = method
                .to_ascii_uppercase()
                .parse()
                .map_err(|_| anyhow!("invalid HTTP method `{method}`"))?;
            let mut request = RouteRequest::new(method, path).with_secure(*secure);
            if let Some(host) = host {
                request = request.with_domain(host.as_str());
            }
            print_match(&table, &request, out)
        }
        Commands::Url {
            manifest,
            name,
            params,
            relative,
            root,
            key,
            expires_in,
        } => {
            let table = Arc::new(load_table(manifest)?);
            let mut generator = UrlGenerator::new(table, root)?;
            let parameters: ParamBag = params.iter().cloned().collect();
            let url = match key {
                Some(key) => {
                    generator = generator.with_keys(SigningKeys::parse([key])?);
                    let expiration = expires_in
                        .map(|s| {
                            Duration::try_seconds(s)
                                .map(Expiration::In)
                                .ok_or_else(|| anyhow!("--expires-in {s} is out of range"))
                        })
                        .transpose()?;
                    generator
                        .signed_route(name, parameters, expiration, !relative)?
                }
                None => generator.route(name, parameters, !relative)?,
            };
            writeln!(out, "{url}")?;
            Ok(())
        }
        Commands::Compile {
            manifest,
            out: file,
        } => {
            let table = load_table(manifest)?;
            let json = serde_json::to_string_pretty(&table.export()?)?;
            match file {
                Some(file) => {
                    std::fs::write(file, json)
                        .with_context(|| format!("failed to write {}", file.display()))?
                }
                None => writeln!(out, "{json}")?,
            }
            Ok(())
        }
    }
}

fn print_routes(table: &RouteTable, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "{:<8} {:<40} {:<24} ACTION", "METHOD", "URI", "NAME")?;
    for route in table.routes() {
        let uri = match route.domain() {
            Some(domain) => format!("{domain}/{}", route.uri().trim_start_matches('/')),
            None => route.uri().to_string(),
        };
        let mut action = route.action().to_string();
        if route.is_fallback() {
            action.push_str(" (fallback)");
        }
        writeln!(
            out,
            "{:<8} {:<40} {:<24} {}",
            route.method().as_str(),
            uri,
            route.name().unwrap_or("-"),
            action
        )?;
    }
    Ok(())
}

fn print_match(
    table: &RouteTable,
    request: &RouteRequest,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let matched = table.match_request(request)?;
    match &matched {
        Matched::Route(bound) => {
            let route = bound.route();
            writeln!(
                out,
                "{} {} -> {} [{}]",
                request.method,
                request.path,
                route.action(),
                route.name().unwrap_or("-")
            )?;
            for (name, value) in bound.parameters()?.iter() {
                writeln!(out, "  {name} = {}", value.unwrap_or("null"))?;
            }
        }
        Matched::Options { .. } => {
            let allow = matched.allow_header().unwrap_or_default();
            writeln!(out, "{} {} -> Allow: {allow}", request.method, request.path)?;
        }
    }
    Ok(())
}
