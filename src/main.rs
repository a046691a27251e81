use clap::Parser;
use kabaddi_scorer::app::commands::{ConsoleCommand, HELP};
use kabaddi_scorer::app::console::{self, Flow};
use kabaddi_scorer::utils::error::{ErrorSeverity, ScorerError};
use kabaddi_scorer::utils::{logger, validation::Validate};
use kabaddi_scorer::{CliConfig, LiveMatch, MatchSession, ScorerConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

fn exit_code(e: &ScorerError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(context: &str, e: ScorerError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e).max(1));
}

fn load_config(cli: &CliConfig) -> ScorerConfig {
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            fail("Configuration could not be loaded", e);
        }
    };

    if config.logging.json {
        logger::init_json_logger(config.logging.verbose);
    } else {
        logger::init_cli_logger(config.logging.verbose);
    }

    if let Err(e) = cli.validate().and_then(|_| config.validate()) {
        fail("Configuration validation failed", e);
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();
    let config = load_config(&cli);

    tracing::info!("Starting kabaddi-scorer");
    tracing::debug!("Scorer config: {:?}", config);

    let store = config
        .build_store()
        .unwrap_or_else(|e| fail("Match store could not be created", e));
    let directory = config
        .build_directory()
        .unwrap_or_else(|e| fail("Player directory could not be created", e));

    let session = MatchSession::resume(&cli.match_id, config.rules(), store)
        .await
        .with_directory(directory);
    let handle = LiveMatch::spawn(session);

    // Clock-driven changes (raid expiry, half time) arrive without a command.
    let mut updates = handle.subscribe();
    let mut seen = updates.borrow().match_history.len();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            for event in state.match_history.iter().skip(seen) {
                println!("» {}", event.summary);
            }
            seen = state.match_history.len();
        }
    });

    println!("{}", HELP);
    let mut rng = rand::thread_rng();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                continue;
            }
        };

        match console::execute(&handle, command, &mut rng).await {
            Ok(Flow::Continue(output)) => println!("{}", output),
            Ok(Flow::Quit) => break,
            Err(ScorerError::SessionClosed) => fail("Match session stopped", ScorerError::SessionClosed),
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                if e.severity() != ErrorSeverity::Low {
                    eprintln!("💡 {}", e.recovery_suggestion());
                }
            }
        }
    }

    if let Err(e) = handle.shutdown().await {
        tracing::warn!("Shutdown: {}", e);
    }
    printer.abort();
    tracing::info!("✅ Match {} saved", cli.match_id);
    Ok(())
}
