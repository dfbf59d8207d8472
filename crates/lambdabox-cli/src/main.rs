//! lambdabox CLI - run lambdas through the sandbox pipeline locally

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use lambdabox_core::normalize::NormalizerRegistry;
use lambdabox_core::protocol::{self, Encoding, ExecuteRequest};
use lambdabox_core::{
    ExecutionResult, LambdaDefinition, LambdaService, Language, SandboxConfig, signature,
};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "lambdabox")]
#[command(author, version, about = "Sandboxed execution of JavaScript and TypeScript lambdas")]
struct Cli {
    /// JSON sandbox config file (LAMBDABOX_* env vars are applied on top)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Lang {
    Javascript,
    Typescript,
}

impl From<Lang> for Language {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::Javascript => Self::JavaScript,
            Lang::Typescript => Self::TypeScript,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a lambda once and print the result
    Run {
        /// Lambda source file (or - for stdin)
        file: String,

        /// Source dialect
        #[arg(short, long, value_enum, default_value = "javascript")]
        language: Lang,

        /// Input payload as JSON
        #[arg(short, long, default_value = "null")]
        data: String,

        /// Timeout in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },

    /// Run an ExecuteRequest file (.json or .msgpack)
    Request {
        /// Request file
        file: PathBuf,

        /// Write the result as msgpack to stdout instead of JSON
        #[arg(long)]
        msgpack: bool,
    },

    /// Check the entry-point signature only
    Check {
        /// Lambda source file (or - for stdin)
        file: String,
    },

    /// Print the source the sandbox would run
    Transpile {
        /// Lambda source file (or - for stdin)
        file: String,

        /// Source dialect
        #[arg(short, long, value_enum, default_value = "typescript")]
        language: Lang,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lambdabox_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            language,
            data,
            timeout_ms,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(ms) = timeout_ms {
                config.timeout = Some(Duration::from_millis(ms));
            }
            config.validate()?;

            let lambda = LambdaDefinition::new(read_source(&file)?, language.into());
            let data: serde_json::Value =
                serde_json::from_str(&data).context("--data is not valid JSON")?;

            let mut service = LambdaService::new(config);
            tracing::debug!(config = ?service.config(), "running lambda");
            let result = service.process(&lambda, &data);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(exit_code(&result))
        }

        Commands::Request { file, msgpack } => {
            let encoding = file
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(Encoding::from_extension)
                .with_context(|| format!("cannot tell the encoding of {}", file.display()))?;
            let bytes =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let request: ExecuteRequest = protocol::decode_as(&bytes, encoding)?;

            let config = load_config(cli.config.as_deref())?;
            let result = LambdaService::new(config).process(&request.lambda, &request.data);

            if msgpack {
                let bytes = protocol::encode_result(&result, Encoding::MessagePack)?;
                std::io::stdout().write_all(&bytes)?;
            } else {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Ok(exit_code(&result))
        }

        Commands::Check { file } => {
            let source = read_source(&file)?;
            match signature::validate(&source) {
                Ok(sig) => {
                    let params: Vec<&str> = sig.param_names().collect();
                    println!(
                        "ok: function({}), body at byte {}",
                        params.join(", "),
                        sig.body_start
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    println!("{e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Transpile { file, language } => {
            let source = read_source(&file)?;
            let lowered = NormalizerRegistry::default().normalize(&source, language.into())?;
            print!("{lowered}");
            if !lowered.ends_with('\n') {
                println!();
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SandboxConfig> {
    let base = match path {
        Some(path) => SandboxConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SandboxConfig::default(),
    };
    Ok(base.with_env()?)
}

fn read_source(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }
    std::fs::read_to_string(file).with_context(|| format!("reading {file}"))
}

fn exit_code(result: &ExecutionResult) -> ExitCode {
    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
