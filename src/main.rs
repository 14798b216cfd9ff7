//! testrail-mcp - Model Context Protocol server for TestRail.
//!
//! Runs the stdio MCP server by default; the other subcommands inspect the
//! tool table or invoke a single operation from the shell.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use testrail_mcp::core::{ENV_API_KEY, ENV_URL, ENV_USERNAME};
use testrail_mcp::mcp::{format_tool, list_templates, read_resource, OPERATIONS};
use testrail_mcp::{Config, MCPServer, TestRailClient, ToolRegistry};

/// Model Context Protocol server for TestRail
#[derive(Parser)]
#[command(name = "testrail-mcp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// TestRail instance URL (e.g. https://example.testrail.io)
    #[arg(long, env = ENV_URL, global = true)]
    url: Option<String>,

    /// TestRail username or email
    #[arg(long, env = ENV_USERNAME, global = true)]
    username: Option<String>,

    /// TestRail API key
    #[arg(long, env = ENV_API_KEY, hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdin/stdout (default)
    Serve,

    /// List the available tools
    Tools {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the resource templates
    Resources,

    /// Invoke a single tool and print its JSON result
    Call {
        /// Tool name, e.g. get_case
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Read a resource, e.g. testrail://case/42
    Read {
        /// Resource URI
        uri: String,
    },
}

fn main() -> Result<()> {
    // Load .env before parsing so clap's env fallbacks can see it.
    let dotenv = dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    match &cli.command {
        None | Some(Commands::Serve) => cmd_serve(&cli),
        Some(Commands::Tools { format }) => cmd_tools(format),
        Some(Commands::Resources) => {
            cmd_resources();
            Ok(())
        }
        Some(Commands::Call { tool, args }) => cmd_call(&cli, tool, args),
        Some(Commands::Read { uri }) => cmd_read(&cli, uri),
    }
}

/// Logs go to stderr; stdout carries the protocol.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::new(cli.url.clone(), cli.username.clone(), cli.api_key.clone())?;
    tracing::debug!(?config, "Configuration loaded");
    Ok(config)
}

fn build_registry(cli: &Cli) -> Result<ToolRegistry> {
    let config = load_config(cli)?;
    let client = TestRailClient::new(&config).context("Failed to create TestRail client")?;
    Ok(ToolRegistry::new(Arc::new(client)))
}

fn cmd_serve(cli: &Cli) -> Result<()> {
    let server = Arc::new(MCPServer::new(build_registry(cli)?));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(server.serve_stdio())?;
    Ok(())
}

fn cmd_tools(format: &str) -> Result<()> {
    match format {
        "json" => {
            let tools: Vec<_> = OPERATIONS.iter().map(|op| op.to_mcp_tool()).collect();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        "text" => {
            println!("{} tools:\n", OPERATIONS.len());
            for op in OPERATIONS {
                println!("{}\n", format_tool(op));
            }
        }
        other => bail!("Unknown format '{}': expected text or json", other),
    }
    Ok(())
}

fn cmd_resources() {
    for template in list_templates() {
        println!(
            "{}  {}",
            template.uri_template,
            template.description.as_deref().unwrap_or_default()
        );
    }
}

fn cmd_call(cli: &Cli, tool: &str, args: &str) -> Result<()> {
    let arguments: Map<String, Value> = match serde_json::from_str(args)
        .with_context(|| format!("Invalid --args JSON: {}", args))?
    {
        Value::Object(map) => map,
        _ => bail!("--args must be a JSON object"),
    };

    if !OPERATIONS.iter().any(|op| op.name == tool) {
        bail!("Unknown tool '{}'. Run `testrail-mcp tools` to list them.", tool);
    }

    let registry = build_registry(cli)?;
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(registry.call(tool, &arguments))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_read(cli: &Cli, uri: &str) -> Result<()> {
    let registry = build_registry(cli)?;
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(read_resource(&registry, uri))?;

    for contents in result.contents {
        println!("{}", contents.text);
    }
    Ok(())
}
