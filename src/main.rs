mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use cli::Cli;
use okurimail::config::Config;
use okurimail::telemetry::init_tracing;
use okurimail::{
    Ledger, MessageBuilder, OutreachError, Pacer, PacerState, RunLoop, RunSummary, Shutdown,
    SmtpDispatcher, SystemClock, TemplateSet,
};

fn main() -> ExitCode {
    // A missing .env is normal; variables may come from the shell
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    match run(cli) {
        Ok(summary) => {
            if summary.interrupted {
                println!("Interrupted. Run again to continue with the remaining contacts.");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal error: {e}");
            eprintln!("Fatal error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<RunSummary, OutreachError> {
    let mut config = Config::load(&cli.config)?;
    if let Some(ledger) = cli.ledger {
        config.ledger = ledger;
    }
    if let Some(templates) = cli.templates {
        config.templates = templates;
    }
    info!("Configuration loaded successfully for user: {}", config.smtp.user);

    let shutdown = Shutdown::new();
    shutdown.install_handler()?;

    let templates = TemplateSet::load(&config.templates);

    let sender = config.sender();
    let builder = MessageBuilder::new(&templates, &config.campaign, &sender);
    let dispatcher = SmtpDispatcher::new(config.smtp.clone());
    let clock = SystemClock::interruptible(shutdown.clone());
    let ledger = Ledger::new(config.ledger.clone());

    if cli.dry_run {
        info!("Dry run: no emails will be sent and the ledger will not be modified");
    }

    let mut state = PacerState::new();
    let summary = RunLoop::new(
        &ledger,
        builder,
        &dispatcher,
        Pacer::new(config.pacing)?,
        &clock,
    )
    .with_shutdown(shutdown)
    .dry_run(cli.dry_run)
    .run(&mut state);

    Ok(summary)
}
