//! transform-workitem CLI - run transform work requests from NDJSON or over HTTP
//!
//! `run` reads work requests line by line and writes one completion per request.
//! `serve` exposes the same handler as an HTTP endpoint.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use transform_workitem::{
    server, HandlerConfig, JsonArrayWriter, NdjsonReader, NdjsonWriter, WorkCompletion,
    WorkRequest,
};

#[derive(Parser)]
#[command(name = "transform-workitem")]
#[command(version, about = "Convert work item inputs between types using registered transforms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process NDJSON work requests and print completions
    Run {
        /// NDJSON file with one work request per line ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Handler configuration YAML
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format for completions
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Ndjson)]
        format: OutputFormat,
    },

    /// Serve work requests over HTTP
    Serve {
        /// Handler configuration YAML
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen port (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List registered transforms
    List {
        /// Handler configuration YAML
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a handler configuration without running anything
    Validate {
        /// Handler configuration YAML
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Ndjson,
    Array,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { input, config, format } => run_requests(input, config, format),
        Commands::Serve { config, port } => serve(config, port).await,
        Commands::List { config } => list_transforms(config),
        Commands::Validate { config } => validate_config(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Load configuration from file (or defaults) and apply env overrides
fn load_config(path: Option<PathBuf>) -> Result<HandlerConfig, String> {
    let config = match path {
        Some(path) => HandlerConfig::load_from_file(&path)?,
        None => HandlerConfig::default(),
    };
    Ok(config.with_env_overrides())
}

/// Process NDJSON work requests
fn run_requests(input: PathBuf, config: Option<PathBuf>, format: OutputFormat) -> Result<(), String> {
    let host = load_config(config)?.build_host()?;

    let reader: Box<dyn BufRead> = if input.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(&input)
            .map_err(|e| format!("Failed to open {}: {}", input.display(), e))?;
        Box::new(BufReader::new(file))
    };

    let completions = NdjsonReader::<_, WorkRequest>::new(reader).map(|request| match request {
        Ok(request) => host.process(request),
        Err(message) => host.reject(message),
    });

    let stdout = io::stdout();
    let (processed, failed) = match format {
        OutputFormat::Ndjson => {
            let mut writer = NdjsonWriter::new(stdout.lock());
            let mut counts = (0usize, 0usize);
            for completion in completions {
                count(&mut counts, &completion);
                writer.write(&completion).map_err(|e| e.to_string())?;
            }
            writer.flush().map_err(|e| e.to_string())?;
            counts
        }
        OutputFormat::Array => {
            let mut writer = JsonArrayWriter::new(stdout.lock()).map_err(|e| e.to_string())?;
            let mut counts = (0usize, 0usize);
            for completion in completions {
                count(&mut counts, &completion);
                writer.write(&completion).map_err(|e| e.to_string())?;
            }
            writer.finish().map_err(|e| e.to_string())?;
            writeln!(io::stdout()).map_err(|e| e.to_string())?;
            counts
        }
    };

    tracing::info!("Processed {} work requests ({} failed)", processed, failed);
    Ok(())
}

fn count(counts: &mut (usize, usize), completion: &WorkCompletion) {
    counts.0 += 1;
    if !completion.is_completed() {
        counts.1 += 1;
    }
}

/// Print registered transforms, one per line
fn list_transforms(config: Option<PathBuf>) -> Result<(), String> {
    let registry = load_config(config)?.build_registry()?;

    for (input, output) in registry.entries() {
        println!(
            "{} -> {}",
            registry.display_name(input),
            registry.display_name(output)
        );
    }
    Ok(())
}

/// Validate a configuration file
fn validate_config(config: PathBuf) -> Result<(), String> {
    println!("🔍 Validating {}...", config.display());

    let host = HandlerConfig::load_from_file(&config)?.build_host()?;

    println!("  ✓ {} transforms registered", host.registry().len());
    println!("  ✓ {} types with JSON codecs", host.codec().len());
    println!("✅ Configuration is valid");
    Ok(())
}

// HTTP server

async fn serve(config: Option<PathBuf>, port: Option<u16>) -> Result<(), String> {
    let config = load_config(config)?;
    let app = server::router(config.build_host()?);

    let ip: std::net::IpAddr = config
        .server
        .host
        .parse()
        .map_err(|e| format!("Invalid host '{}': {}", config.server.host, e))?;
    let addr = SocketAddr::new(ip, port.unwrap_or(config.server.port));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    tracing::info!("transform-workitem listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))
}
