use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use pg_bootstrap::config::{Args, Configuration, ProcessEnv};
use pg_bootstrap::error::EXIT_PREFLIGHT_FAILURE;
use pg_bootstrap::postgres::PgConnector;
use pg_bootstrap::readiness::TokioClock;
use pg_bootstrap::render::{render_plan, render_summary};
use pg_bootstrap::Bootstrap;

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let cfg = match Configuration::resolve(&args, &ProcessEnv) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!("{err}");
            return ExitCode::from(EXIT_PREFLIGHT_FAILURE);
        }
    };

    let config_json = serde_json::to_string_pretty(&cfg).unwrap_or_else(|_| "{}".to_string());
    tracing::info!("config: {}", config_json);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!("failed to start runtime: {err}");
            return ExitCode::from(EXIT_PREFLIGHT_FAILURE);
        }
    };

    let connector = PgConnector::new(&cfg);
    let clock = TokioClock::new();
    let outcome = runtime.block_on(Bootstrap::new(&cfg, &connector, &clock).run());

    match outcome {
        Ok(outcome) => {
            if outcome.report.dry_run {
                print!("{}", render_plan(&outcome.plans));
            }
            print!("{}", render_summary(&outcome.report));
            ExitCode::from(outcome.report.exit_code())
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
