//! `msync update`: reconcile an "All Members" export against the database.

use std::path::PathBuf;

use serde::Serialize;

use membersync_io::{FileAuditSink, SpreadsheetSource, SqliteStore};
use membersync_recon::{run, ReconciliationStep, RunSummary};

use crate::exit_codes::{EXIT_ERROR, EXIT_RUN_FAILED};
use crate::CliError;

pub struct UpdateArgs {
    pub members: PathBuf,
    pub db: PathBuf,
    pub password: Option<String>,
    pub config: Option<PathBuf>,
    pub audit: Option<PathBuf>,
    pub sheet: Option<String>,
    pub json: bool,
}

#[derive(Serialize)]
struct UpdateReport {
    #[serde(flatten)]
    summary: RunSummary,
    members: PathBuf,
    database: PathBuf,
    audit_log: PathBuf,
    messages: Vec<String>,
}

pub fn cmd_update(args: UpdateArgs) -> Result<(), CliError> {
    let (mut config, origin) = crate::config::load(args.config.as_deref())?;
    if let Some(audit) = args.audit {
        config.audit_log = audit;
    }
    if let Some(sheet) = args.sheet {
        config.source.sheet = sheet;
    }
    crate::config::revalidate(&config, &origin)?;
    log::info!("config: {origin}");

    let source = SpreadsheetSource::new(&args.members, config.source.sheet.clone());
    let store = SqliteStore::new(&args.db, args.password, &config.store);
    let sink = FileAuditSink::new(&config.audit_log);
    let mut step = ReconciliationStep::new(source, store, sink, &config);

    let mut runner = run(&args.db, &mut step);
    let mut messages = Vec::new();
    for message in runner.by_ref() {
        if args.json {
            messages.push(message);
        } else {
            println!("{message}");
        }
    }
    let outcome = runner.outcome().cloned();
    drop(runner);

    let Some(outcome) = outcome else {
        return Err(CliError {
            code: EXIT_ERROR,
            message: "update ended without a result".into(),
            hint: None,
        });
    };
    let succeeded = outcome.is_success();

    if args.json {
        let report = UpdateReport {
            summary: RunSummary::new(outcome, step.counters()),
            members: args.members,
            database: args.db,
            audit_log: config.audit_log,
            messages,
        };
        let json = serde_json::to_string_pretty(&report).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{json}");
    }

    if succeeded {
        Ok(())
    } else {
        // The banner already explains the failure
        Err(CliError { code: EXIT_RUN_FAILED, message: String::new(), hint: None })
    }
}
