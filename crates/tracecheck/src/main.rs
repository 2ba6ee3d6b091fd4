use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use tracecheck::runtime::{boot, pipeline, CliArgs, RunInputs, RunReport, EXIT_FATAL};

#[tokio::main]
async fn main() -> ExitCode {
    boot::init_logging();
    match try_main().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn try_main() -> Result<u8> {
    let args = CliArgs::parse();
    let config = boot::load_config(&args).context("failed to load configuration")?;

    let inputs = RunInputs {
        logfiles: args.logfiles().to_vec(),
        specfile: args
            .specfile()
            .context("missing spec file argument")?
            .to_path_buf(),
        skip_check: args.skip_check,
    };

    let outcome = pipeline::run(&config, &inputs).await?;
    let report = RunReport::from_outcome(&outcome);
    report.log();

    if let Some(path) = &args.report {
        report
            .write_json(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    Ok(report.exit_code)
}
