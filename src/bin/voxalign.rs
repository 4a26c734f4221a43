//! `voxalign` CLI: `align` runs a single alignment and writes §6.2 JSON,
//! `serve` starts the HTTP surface. Grounded in the teacher's `Args`/
//! `Config` CLI wiring, generalized to two subcommands.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use clap_serde_derive::ClapSerde;
use tracing::error;

use voxalign::config::Config;
use voxalign::io::export::{to_json, write_json};
use voxalign::models::{AlignBackend, AlignRequest, AsrBackend};
use voxalign::pipeline::run_alignment;
use voxalign::telemetry::init_telemetry;

#[derive(Parser)]
#[command(name = "voxalign", author, version, about = "Multilingual forced alignment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Align a transcript against an audio file and print/write §6.2 JSON
    Align(AlignArgs),
    /// Start the HTTP alignment server
    Serve(ServeArgs),
}

#[derive(Parser)]
struct AlignArgs {
    /// Path to a WAV audio file
    audio_path: String,
    /// Transcript text; if omitted, ASR must be enabled via --asr
    transcript: Option<String>,
    #[arg(long, default_value = "auto")]
    language: String,
    #[arg(long, value_enum, default_value = "uniform")]
    backend: AlignBackend,
    #[arg(long, value_enum, default_value = "disabled")]
    asr: AsrBackend,
    #[arg(long, default_value_t = false)]
    verbatim: bool,
    /// Omit phoneme-level boundaries from the output
    #[arg(long, default_value_t = false)]
    no_phonemes: bool,
    #[arg(long)]
    sample_rate_hz: Option<u32>,
    /// Write JSON to this path instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct ServeArgs {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = "VoxAlign.toml")]
    config_file: String,

    #[command(flatten)]
    opt_config: <Config as ClapSerde>::Opt,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Align(args) => run_align(args),
        Command::Serve(args) => run_serve(args),
    }
}

fn run_align(args: AlignArgs) -> ExitCode {
    let request = AlignRequest {
        audio_path: args.audio_path,
        transcript: args.transcript,
        language: args.language,
        backend: args.backend,
        asr: args.asr,
        verbatim: args.verbatim,
        include_phonemes: !args.no_phonemes,
        sample_rate_hz: args.sample_rate_hz,
    };

    let response = match run_alignment(&request) {
        Ok(response) => response,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    let write_result = match &args.output {
        Some(path) => write_json(&response, path).map(|()| None),
        None => to_json(&response).map(Some),
    };

    match write_result {
        Ok(Some(json)) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: failed to write output: {err}");
            ExitCode::from(2)
        }
    }
}

fn run_serve(args: ServeArgs) -> ExitCode {
    let config = match Config::from_toml(&args.config_file) {
        Ok(conf) => conf.merge(args.opt_config),
        Err(_) => Config::default().merge(args.opt_config),
    };

    init_telemetry(&config.otel_endpoint, config.console);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start async runtime: {err}");
            return ExitCode::from(2);
        }
    };

    let result = runtime.block_on(voxalign::server::serve(&config.address, config.port));
    voxalign::telemetry::shutdown_meter_provider();

    if let Err(err) = result {
        error!("server exited with error: {err}");
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}
