// src/main.rs

use std::process::ExitCode;

use assetflow::{cli, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("assetflow: {err:#}");
        return ExitCode::FAILURE;
    }

    match assetflow::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("assetflow: {err:#}");
            ExitCode::FAILURE
        }
    }
}
