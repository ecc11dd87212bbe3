use std::{path::PathBuf, process::ExitCode};

use cert_revoke::{Verifier, config::Settings, telemetry};
use clap::Parser;
use color_eyre::eyre::WrapErr;
use serde::Serialize;

/// Check whether an X.509 certificate has been revoked
#[derive(Debug, Parser)]
#[command(name = "cert-revoke", version, about)]
struct Cli {
    /// PEM or DER encoded certificate
    file: PathBuf,

    /// Report incomplete checks as revoked
    #[arg(long)]
    strict: bool,

    /// Print the verdict as JSON
    #[arg(long)]
    json: bool,

    /// Log fetches and cache decisions
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    file: &'a str,
    revoked: bool,
    checked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init_tracing(if cli.verbose {
        telemetry::VERBOSE_DIRECTIVES
    } else {
        telemetry::DEFAULT_DIRECTIVES
    });

    let mut settings = Settings::load()?;
    settings.strict |= cli.strict;
    tracing::debug!("Loaded settings: {:?}", settings);

    let bytes = std::fs::read(&cli.file)
        .wrap_err_with(|| format!("failed to read {}", cli.file.display()))?;

    let verifier = Verifier::new(settings.verifier_config()?);
    let verdict = verifier.verify_bytes(&bytes);

    let file = cli.file.display().to_string();
    let report = Report {
        file: &file,
        revoked: verdict.revoked,
        checked: verdict.checked,
        error: verdict.error.as_ref().map(ToString::to_string),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let status = match (report.revoked, report.checked) {
            (true, _) => "REVOKED",
            (false, true) => "GOOD",
            (false, false) => "UNCHECKED",
        };
        match &report.error {
            Some(error) => println!("{}: {} ({})", report.file, status, error),
            None => println!("{}: {}", report.file, status),
        }
    }

    Ok(if report.revoked {
        ExitCode::from(1)
    } else if report.checked {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
