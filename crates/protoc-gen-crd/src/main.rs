use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use protoc_gen_crd::{run, RunnerError};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "protoc-gen-crd")]
#[command(about = "protoc plugin generating Kubernetes CRDs per release channel")]
#[command(version)]
struct Args {
    /// Read the encoded CodeGeneratorRequest from a file instead of stdin
    #[arg(long)]
    request: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset (error, warn, info, debug)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    crdgen_core::tracing::init_with_filter(&args.log_level);

    if let Err(e) = execute(&args) {
        eprintln!("protoc-gen-crd: {}", e);
        std::process::exit(1);
    }
}

fn execute(args: &Args) -> Result<(), RunnerError> {
    let input = match &args.request {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };
    debug!(bytes = input.len(), "read request");

    let output = run(&input)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&output)?;
    stdout.flush()?;
    Ok(())
}
