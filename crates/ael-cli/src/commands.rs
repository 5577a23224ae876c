use std::io::Write;

use ael_ledger::{Ledger, LedgerConfig, ResetRequest, ViolationKind};
use ael_store::LedgerStore;
use ael_types::{AuditEvent, DetailValue, LedgerEntry};
use anyhow::Context;
use colored::Colorize;
use tracing::debug;

use crate::cli::*;

/// Run a parsed command and return the process exit code.
pub fn run_command(cli: Cli) -> anyhow::Result<i32> {
    let mut config = match &cli.config {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };
    if let Some(path) = cli.ledger {
        config.store.path = path;
    }

    debug!(path = %config.store.path.display(), sync = ?config.store.sync, "opening ledger");
    let store = config
        .open_file_store()
        .with_context(|| format!("opening ledger {}", config.store.path.display()))?;
    let ledger = Ledger::with_config(store, config);

    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::Append(args) => cmd_append(&ledger, args, cli.format, &mut out),
        Command::Verify(_) => cmd_verify(&ledger, cli.format, &mut out),
        Command::Log(args) => cmd_log(&ledger, args, cli.format, &mut out),
        Command::Reset(args) => cmd_reset(&ledger, args, cli.format, &mut out),
    }
}

fn cmd_append<S: LedgerStore>(
    ledger: &Ledger<S>,
    args: AppendArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<i32> {
    let details = args
        .details
        .as_deref()
        .map(|raw| {
            serde_json::from_str::<serde_json::Value>(raw)
                .map(DetailValue::from)
                .context("--details must be a JSON document")
        })
        .transpose()?;

    let event = AuditEvent {
        actor_id: args.actor,
        action: args.action,
        resource: args.resource,
        http_method: args.http_method,
        outcome: args.outcome,
        reason: args.reason,
        target_actor_id: args.target_actor,
        details,
        ip_address: args.ip_address,
        user_agent: args.user_agent,
    };

    let entry = ledger.append(event)?;
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&entry)?)?,
        OutputFormat::Text => {
            writeln!(out, "{} Appended {}", "✓".green().bold(), entry.action().bold())?;
            write_entry_summary(out, &entry)?;
        }
    }
    Ok(0)
}

fn cmd_verify<S: LedgerStore>(
    ledger: &Ledger<S>,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<i32> {
    let report = ledger.verify()?;
    let code = if report.valid { 0 } else { 1 };

    if format == OutputFormat::Json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(code);
    }

    if report.valid {
        writeln!(out, "{} Audit chain integrity verified", "✓".green().bold())?;
        writeln!(out, "  Entries: {}", report.count.to_string().bold())?;
        writeln!(out, "  Hash chain: {}", "valid".green())?;
    } else {
        writeln!(
            out,
            "{} Audit chain integrity violated: {} violation(s) in {} entries",
            "✗".red().bold(),
            report.violations.len().to_string().bold(),
            report.count
        )?;
        for v in &report.violations {
            let kind = match v.kind {
                ViolationKind::BrokenLink => "BrokenLink".yellow(),
                ViolationKind::ContentTampered => "ContentTampered".red(),
            };
            writeln!(out, "  #{} {} {}", v.index, kind, v.detail)?;
        }
    }
    Ok(code)
}

fn cmd_log<S: LedgerStore>(
    ledger: &Ledger<S>,
    args: LogArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<i32> {
    let entries = ledger.recent(args.limit)?;
    if format == OutputFormat::Json {
        writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(0);
    }

    if entries.is_empty() {
        writeln!(out, "Audit ledger is empty.")?;
    }
    for entry in &entries {
        let r = &entry.record;
        writeln!(
            out,
            "{} {} {} {} {}",
            r.timestamp.to_string().dimmed(),
            r.hash.short_hex().yellow(),
            r.actor_id.cyan(),
            r.action.bold(),
            r.outcome.as_deref().unwrap_or("-")
        )?;
    }
    Ok(0)
}

fn cmd_reset<S: LedgerStore>(
    ledger: &Ledger<S>,
    args: ResetArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<i32> {
    let entry = ledger.reset(ResetRequest {
        actor_id: args.actor,
        reason: args.reason,
    })?;
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&entry)?)?,
        OutputFormat::Text => {
            writeln!(out, "{} Ledger reset; new chain started", "!".yellow().bold())?;
            write_entry_summary(out, &entry)?;
        }
    }
    Ok(0)
}

fn write_entry_summary(out: &mut impl Write, entry: &LedgerEntry) -> std::io::Result<()> {
    writeln!(out, "  Id: {}", entry.id)?;
    writeln!(out, "  Actor: {}", entry.record.actor_id.cyan())?;
    writeln!(out, "  Timestamp: {}", entry.timestamp())?;
    writeln!(out, "  Previous: {}", entry.previous_hash().to_string().dimmed())?;
    writeln!(out, "  Hash: {}", entry.hash().to_string().yellow())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ael_store::InMemoryLedgerStore;

    fn append_args(action: &str, details: Option<&str>) -> AppendArgs {
        AppendArgs {
            action: action.into(),
            actor: Some("cli-user".into()),
            resource: None,
            http_method: None,
            outcome: Some("SUCCESS".into()),
            reason: None,
            target_actor: None,
            details: details.map(Into::into),
            ip_address: None,
            user_agent: None,
        }
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn append_then_verify_succeeds() {
        let ledger = Ledger::new(InMemoryLedgerStore::new());
        let mut buf = Vec::new();
        let code = cmd_append(
            &ledger,
            append_args("LOGIN", Some(r#"{"mfa":true}"#)),
            OutputFormat::Text,
            &mut buf,
        )
        .unwrap();
        assert_eq!(code, 0);
        assert!(output(buf).contains("LOGIN"));

        let entry = ledger.head().unwrap().unwrap();
        assert_eq!(
            entry.record.details.as_ref().unwrap().get("mfa"),
            Some(&DetailValue::Bool(true))
        );

        let mut buf = Vec::new();
        assert_eq!(cmd_verify(&ledger, OutputFormat::Text, &mut buf).unwrap(), 0);
        assert!(output(buf).contains("valid"));
    }

    #[test]
    fn invalid_details_json_is_rejected() {
        let ledger = Ledger::new(InMemoryLedgerStore::new());
        let mut buf = Vec::new();
        let err = cmd_append(
            &ledger,
            append_args("LOGIN", Some("{not json")),
            OutputFormat::Text,
            &mut buf,
        )
        .unwrap_err();
        assert!(err.to_string().contains("--details"));
        assert!(ledger.is_empty().unwrap());
    }

    #[test]
    fn verify_reports_tampering_with_exit_code() {
        let ledger = Ledger::new(InMemoryLedgerStore::new());
        let mut sink = Vec::new();
        for action in ["A", "B"] {
            cmd_append(&ledger, append_args(action, None), OutputFormat::Text, &mut sink).unwrap();
        }
        ledger.store().rewrite_at(0, |r| r.actor_id = "someone-else".into());

        let mut buf = Vec::new();
        assert_eq!(cmd_verify(&ledger, OutputFormat::Json, &mut buf).unwrap(), 1);
        let json: serde_json::Value = serde_json::from_str(&output(buf)).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["violations"][0]["kind"], "ContentTampered");
        assert_eq!(json["violations"][0]["index"], 0);
    }

    #[test]
    fn log_shows_most_recent_entries() {
        let ledger = Ledger::new(InMemoryLedgerStore::new());
        let mut sink = Vec::new();
        for action in ["FIRST", "SECOND", "THIRD"] {
            cmd_append(&ledger, append_args(action, None), OutputFormat::Text, &mut sink).unwrap();
        }

        let mut buf = Vec::new();
        cmd_log(&ledger, LogArgs { limit: 2 }, OutputFormat::Text, &mut buf).unwrap();
        let text = output(buf);
        assert!(!text.contains("FIRST"));
        assert!(text.contains("SECOND"));
        assert!(text.contains("THIRD"));
    }

    #[test]
    fn reset_requires_configuration() {
        let ledger = Ledger::new(InMemoryLedgerStore::new());
        let mut buf = Vec::new();
        let err = cmd_reset(
            &ledger,
            ResetArgs {
                actor: "ops".into(),
                reason: "cleanup".into(),
            },
            OutputFormat::Text,
            &mut buf,
        )
        .unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn run_command_uses_ledger_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.jsonl");
        let cli = Cli {
            command: Command::Append(append_args("LOGIN", None)),
            config: None,
            ledger: Some(path.clone()),
            verbose: false,
            format: OutputFormat::Json,
        };
        assert_eq!(run_command(cli).unwrap(), 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("\"action\":\"LOGIN\""));
    }
}
