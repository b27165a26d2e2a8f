use std::env;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;

use peatmon_service::config::ServiceConfig;
use peatmon_service::dispatcher::TelegramSender;
use peatmon_service::enrich::WikiLookup;
use peatmon_service::ingest::archive::LocalArchive;
use peatmon_service::ingest::firms::FirmsOnline;
use peatmon_service::ingest::PointSource;
use peatmon_service::ledger::{JsonFileLedger, LedgerStore, PostgresLedger};
use peatmon_service::logging::{self, Component, LogLevel};
use peatmon_service::pipeline;
use peatmon_service::verify;

const CONFIG_PATH: &str = "peatmon.toml";

struct Args {
    source: String,
    send_cached: bool,
    preflight: bool,
    debug: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        source: "online".to_string(),
        send_cached: false,
        preflight: false,
        debug: false,
    };

    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--source" => {
                let value = it.next().ok_or("--source requires a value")?;
                if value != "online" && value != "local" {
                    return Err(format!("unknown source '{}', expected online|local", value));
                }
                args.source = value;
            }
            "--send-cached" => args.send_cached = true,
            "--preflight" => args.preflight = true,
            "--debug" => args.debug = true,
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(args)
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: peatmon_service [--source online|local] [--send-cached] [--preflight] [--debug]");
            return ExitCode::FAILURE;
        }
    };

    let cfg = match ServiceConfig::load(CONFIG_PATH) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let min_level = if args.debug { LogLevel::Debug } else { LogLevel::Info };
    logging::init_logger(min_level, cfg.log_file.as_deref());

    if args.preflight {
        return match verify::run_preflight(&cfg) {
            Ok(report) => {
                verify::print_summary(&report);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Preflight failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let token = match env::var("TELEGRAM_TOKEN") {
        Ok(t) if !t.is_empty() => t,
        _ => {
            eprintln!("Error: TELEGRAM_TOKEN is not set");
            return ExitCode::FAILURE;
        }
    };
    let timeout = Duration::from_secs(cfg.http_timeout_secs);
    let sender = TelegramSender::new(token, timeout);

    // DATABASE_URL switches the ledger to Postgres; the JSON file is the
    // default deployment.
    let mut ledger: Box<dyn LedgerStore> = match env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => match PostgresLedger::connect(&url) {
            Ok(l) => Box::new(l),
            Err(e) => {
                logging::error(Component::Ledger, None, &e.to_string());
                return ExitCode::FAILURE;
            }
        },
        _ => match JsonFileLedger::open(&cfg.ledger_path) {
            Ok(l) => Box::new(l),
            Err(e) => {
                logging::error(Component::Ledger, None, &e.to_string());
                return ExitCode::FAILURE;
            }
        },
    };

    let today = Utc::now().date_naive();

    if args.send_cached {
        return match pipeline::resend_cached(&cfg, ledger.as_mut(), &sender, today) {
            Ok(report) => {
                logging::info(
                    Component::System,
                    None,
                    &format!(
                        "cached resend: {} sent, {} deduped, {} failed",
                        report.sent, report.skipped_dedup, report.failed
                    ),
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                logging::error(Component::System, None, &e.to_string());
                ExitCode::FAILURE
            }
        };
    }

    let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: cannot build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let source: Box<dyn PointSource> = if args.source == "local" {
        Box::new(LocalArchive::new(&cfg.archive_dir))
    } else {
        Box::new(FirmsOnline)
    };

    let lookup = WikiLookup::new(&cfg.wiki_cache_path, timeout);

    match pipeline::run_pipeline(
        source.as_ref(),
        &client,
        &cfg,
        &lookup,
        ledger.as_mut(),
        &sender,
        today,
    ) {
        Ok(report) => {
            pipeline::print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::error(Component::System, None, &format!("run aborted: {}", e));
            ExitCode::FAILURE
        }
    }
}
