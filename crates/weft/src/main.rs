mod demo;

use std::path::PathBuf;

use clap::Parser;
use log::info;

use weft_core::kernel::constants::{FRAMEWORK_NAME, FRAMEWORK_VERSION};
use weft_core::BootstrapOptions;

/// weft: a modular service framework runtime
///
/// Configuration switches (`--KEY value`, `--MODULE_KEY=value`) pass through
/// to the kernel's CLI loader, so unknown flags are deliberately tolerated
/// here.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, ignore_errors = true)]
struct CliArgs {
    /// Liveness check: print pong and exit
    #[arg(long)]
    ping: bool,

    /// Bootstrap the demo application, report, and exit instead of serving
    #[arg(long)]
    check: bool,

    /// Alternate dotenv file (`--env-file <path>`)
    #[arg(long = "env-file", value_name = "PATH")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    if args.ping {
        println!("pong");
        return;
    }

    println!("{} v{}", FRAMEWORK_NAME, FRAMEWORK_VERSION);

    let app = match demo::demo_application() {
        Ok(app) => app,
        Err(e) => {
            eprintln!("invalid application definition [{}]: {}", e.code(), e);
            std::process::exit(1);
        }
    };

    let options = BootstrapOptions {
        env_file: args.env_file.clone(),
        ..Default::default()
    };

    let mut running = match app.bootstrap(options).await {
        Ok(running) => running,
        Err(e) => {
            eprintln!("bootstrap failed [{}]: {}", e.code(), e);
            std::process::exit(1);
        }
    };

    if args.check {
        println!("bootstrap ok");
        for module in running.config().keys() {
            println!("  module: {}", module);
        }
        for stage in running.completed_stages() {
            println!("  stage: {}", stage);
        }
        if let Err(e) = running.teardown().await {
            eprintln!("teardown failed [{}]: {}", e.code(), e);
            std::process::exit(1);
        }
        println!("check complete");
        return;
    }

    info!("running until SIGTERM or SIGINT");
    if let Err(e) = running.run_until_signal().await {
        eprintln!("shutdown failed [{}]: {}", e.code(), e);
        std::process::exit(1);
    }
}
