use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use jit_funding::csv::{read_authorizations, read_cards, write_cards};
use jit_funding::{CardLedger, Config, MemoryStore};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let (Some(cards_path), Some(auths_path)) = (args.next(), args.next()) else {
        eprintln!("usage: jit-funding <cards.csv> <authorizations.csv>");
        return ExitCode::FAILURE;
    };

    let store = Arc::new(MemoryStore::with_reversal_code(config.reversal_type_code.clone()));
    let cards = match read_cards(cards_path) {
        Ok(cards) => cards,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    for result in cards {
        match result {
            Ok(card) => store.insert_card(card).await,
            Err(e) => warn!("{e}"),
        }
    }

    let authorizations = match read_authorizations(auths_path) {
        Ok(authorizations) => authorizations,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let ledger = CardLedger::new(store.clone(), config.reversal_type_code.clone());
    let (auth_sender, auth_receiver) = tokio::sync::mpsc::channel(config.channel_capacity);

    let reader = tokio::task::spawn_blocking(move || {
        for result in authorizations {
            match result {
                Ok(record) => {
                    if auth_sender.blocking_send(record).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    ledger.run(ReceiverStream::new(auth_receiver)).await;
    if let Err(e) = reader.await {
        error!("authorization reader failed: {e}");
        return ExitCode::FAILURE;
    }

    let cards = store.cards().await;
    if let Err(e) = write_cards(&cards, std::io::stdout().lock()) {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
