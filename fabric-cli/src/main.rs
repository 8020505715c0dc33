mod files;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use fabric_core::diagnostics::Diagnostic;
use fabric_core::provider::{OperationContext, Provider, ProviderResult, Timeouts};
use fabric_core::resource::{ResourceId, State};
use fabric_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use fabric_provider_equinix::config::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use fabric_provider_equinix::resources::resource_types;
use fabric_provider_equinix::{Config, EquinixProvider};

#[derive(Parser)]
#[command(name = "fabric")]
#[command(about = "Manage Equinix Fabric layer 2 connections", long_about = None)]
struct Cli {
    #[command(flatten)]
    api: ApiArgs,

    /// Create timeout in seconds (defaults to the resource type's)
    #[arg(long, global = true)]
    create_timeout: Option<u64>,

    /// Delete timeout in seconds (defaults to the resource type's)
    #[arg(long, global = true)]
    delete_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ApiArgs {
    /// Fabric API base URL
    #[arg(long, env = "EQUINIX_API_ENDPOINT", default_value = DEFAULT_BASE_URL, global = true)]
    endpoint: String,

    /// OAuth2 client id
    #[arg(long, env = "EQUINIX_API_CLIENTID", global = true)]
    client_id: Option<String>,

    /// OAuth2 client secret
    #[arg(long, env = "EQUINIX_API_CLIENTSECRET", hide_env_values = true, global = true)]
    client_secret: Option<String>,

    /// Static API token, used instead of the client credentials
    #[arg(long, env = "EQUINIX_API_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "EQUINIX_API_TIMEOUT", global = true)]
    request_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the attribute schema of a resource type
    Schema {
        /// Resource type; all types when omitted
        resource_type: Option<String>,
    },
    #[command(flatten)]
    Operation(Operation),
}

/// Commands that call the Fabric API
#[derive(Subcommand)]
enum Operation {
    /// Create the resource described by a resource file
    Create {
        /// Path to resource JSON file
        resource: PathBuf,
    },
    /// Refresh a resource from its state file
    Read {
        /// Path to state JSON file
        state: PathBuf,
    },
    /// Import an existing remote object by its identifier
    Import {
        resource_type: String,
        name: String,
        identifier: String,
    },
    /// Update a resource in place
    Update {
        /// Path to state JSON file
        state: PathBuf,
        /// Path to resource JSON file
        resource: PathBuf,
    },
    /// Delete a resource
    Delete {
        /// Path to state JSON file
        state: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::Operation(operation) => {
            let ctx = operation_context(cli.create_timeout, cli.delete_timeout);
            run_operation(&cli.api, &ctx, operation).await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn operation_context(create_timeout: Option<u64>, delete_timeout: Option<u64>) -> OperationContext {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, cancelling...".yellow());
            on_signal.cancel();
        }
    });

    OperationContext::new()
        .with_timeouts(Timeouts {
            create: create_timeout.map(Duration::from_secs),
            delete: delete_timeout.map(Duration::from_secs),
        })
        .with_cancellation(cancel)
}

fn config_from_args(args: &ApiArgs) -> Config {
    Config {
        base_url: args.endpoint.clone(),
        client_id: args.client_id.clone(),
        client_secret: args.client_secret.clone(),
        token: args.token.clone(),
        request_timeout: args
            .request_timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
    }
}

async fn run_operation(
    args: &ApiArgs,
    ctx: &OperationContext,
    operation: Operation,
) -> Result<(), String> {
    let provider = EquinixProvider::from_config(&config_from_args(args))
        .await
        .map_err(|e| e.to_string())?;

    match operation {
        Operation::Create { resource } => {
            let resource = files::load_resource(&resource)?;
            print_state(provider.create(ctx, &resource).await)
        }
        Operation::Read { state } => {
            let prior = files::load_state(&state)?;
            print_state(provider.read(ctx, &prior).await)
        }
        Operation::Import {
            resource_type,
            name,
            identifier,
        } => {
            let id = ResourceId::new(resource_type, name);
            print_state(provider.import(ctx, &id, &identifier).await)
        }
        Operation::Update { state, resource } => {
            let from = files::load_state(&state)?;
            let to = files::load_resource(&resource)?;
            print_state(provider.update(ctx, &from, &to).await)
        }
        Operation::Delete { state } => run_delete(&provider, ctx, &state).await,
    }
}

async fn run_delete(
    provider: &EquinixProvider,
    ctx: &OperationContext,
    path: &Path,
) -> Result<(), String> {
    let state = files::load_state(path)?;
    let diagnostics = provider
        .delete(ctx, &state)
        .await
        .map_err(|e| e.to_string())?;
    print_diagnostics(&diagnostics);
    println!("{} {}", "Deleted".green(), state.id);
    Ok(())
}

fn print_state(result: ProviderResult<State>) -> Result<(), String> {
    let state = result.map_err(|e| e.to_string())?;
    if !state.exists {
        eprintln!("{} {} no longer exists", "Warning:".yellow().bold(), state.id);
    }
    println!("{}", files::state_to_json(&state)?);
    Ok(())
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let label = if diagnostic.is_warning() {
            "Warning:".yellow().bold()
        } else {
            "Error:".red().bold()
        };
        eprintln!("{} {}", label, diagnostic.summary);
        if let Some(ref detail) = diagnostic.detail {
            eprintln!("  {}", detail);
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let types = resource_types();
    let selected: Vec<_> = match resource_type {
        Some(name) => {
            let found: Vec<_> = types.into_iter().filter(|t| t.name() == name).collect();
            if found.is_empty() {
                return Err(format!("Unknown resource type: {}", name));
            }
            found
        }
        None => types,
    };

    for resource_type in selected {
        print_schema(&resource_type.schema());
    }
    Ok(())
}

fn print_schema(schema: &ResourceSchema) {
    println!("{}", schema.resource_type.bold());
    if let Some(ref description) = schema.description {
        println!("  {}", description.dimmed());
    }
    print_attributes(schema.attributes.values().collect(), "  ");
    println!();
}

fn print_attributes(mut attributes: Vec<&AttributeSchema>, indent: &str) {
    attributes.sort_by(|a, b| a.name.cmp(&b.name));
    for attr in attributes {
        println!(
            "{}{} {} {}",
            indent,
            attr.name.cyan(),
            attr.attr_type,
            attribute_flags(attr).dimmed()
        );
        if let AttributeType::Block(ref block) = attr.attr_type {
            print_attributes(block.attributes.values().collect(), &format!("{indent}  "));
        }
    }
}

fn attribute_flags(attr: &AttributeSchema) -> String {
    let mut flags = Vec::new();
    if attr.required {
        flags.push("required");
    } else if attr.optional {
        flags.push("optional");
    }
    if attr.computed {
        flags.push("computed");
    }
    if attr.force_new {
        flags.push("forces replacement");
    }
    if attr.sensitive {
        flags.push("sensitive");
    }
    format!("({})", flags.join(", "))
}
