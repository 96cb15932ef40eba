//! Generate C++, Python or Wireshark Lua sources from MAVLink definition files.
//!
//! Usage:
//!   mavgen --xml-def common.xml --xml-def ardupilotmega.xml --output-dir out [--lang Python]

use anyhow::Context;
use clap::Parser;
use mavgen::{generate, GeneratorConfig, RenderContext, Target};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// MAVLink definition compiler
#[derive(Parser, Debug)]
#[command(name = "mavgen")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// MAVLink XML definition file; repeat for several files
    #[arg(long = "xml-def", value_name = "FILE")]
    xml_defs: Vec<PathBuf>,

    /// Directory for the generated sources
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output language: C++, Python or Lua
    #[arg(long, default_value = "C++")]
    lang: String,

    /// Put all definitions in one namespace instead of one per definition file
    #[arg(long)]
    merge_extensions: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let target: Target = args.lang.parse().context("invalid --lang")?;
    let config = GeneratorConfig {
        sources: args.xml_defs,
        output_dir: args.output_dir,
        target,
        context: RenderContext { merge_namespaces: args.merge_extensions },
    };
    config.validate().context("invalid arguments")?;

    let written = generate(&config).context("generation failed")?;
    for path in &written {
        info!("  {}", path.display());
    }
    Ok(())
}
