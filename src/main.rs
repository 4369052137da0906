use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod bundle;
mod dispatch;
mod grade;
mod mailer;
mod models;
mod render;
mod roster;
mod statuslog;

use dispatch::{Outcome, RecordOutcome};
use mailer::{SmtpConfig, SmtpMailer};
use statuslog::{CsvStatusLog, StatusLog};

#[derive(Parser)]
#[command(name = "gradecard-mailer")]
#[command(about = "Generates grade card PDFs from a student roster and emails them out", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a grade card PDF for every student in the roster
    Generate {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "grade_cards")]
        out_dir: PathBuf,
        #[arg(long, default_value = "assets")]
        assets_dir: PathBuf,
    },
    /// Email previously generated grade cards to each student
    Send {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "grade_cards")]
        out_dir: PathBuf,
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,
    },
    /// Render and email in one pass, logging every outcome
    Run {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "grade_cards")]
        out_dir: PathBuf,
        #[arg(long, default_value = "assets")]
        assets_dir: PathBuf,
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,
    },
    /// Bundle every generated grade card into one zip archive
    Bundle {
        #[arg(long, default_value = "grade_cards")]
        out_dir: PathBuf,
        #[arg(long, default_value = "grade_cards.zip")]
        out: PathBuf,
    },
    /// Show the accumulated email status log
    Log {
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            csv,
            out_dir,
            assets_dir,
        } => {
            let records = roster::read_roster(&csv)?;
            let outcomes = dispatch::generate_batch(&records, &out_dir, &assets_dir)?;
            print_outcomes(&outcomes);
            let rendered = outcomes
                .iter()
                .filter(|o| matches!(o.outcome, Outcome::Rendered(_)))
                .count();
            println!(
                "Generated {rendered} of {} grade cards in {}.",
                records.len(),
                out_dir.display()
            );
        }
        Commands::Send {
            csv,
            out_dir,
            log_dir,
        } => {
            let records = roster::read_roster(&csv)?;
            let config = SmtpConfig::from_env()?;
            let mailer = SmtpMailer::new(&config)?;
            let mut status_log = CsvStatusLog::new(&log_dir);
            let outcomes =
                dispatch::send_batch(&records, &out_dir, &mailer, &mut status_log).await?;
            print_outcomes(&outcomes);
            print_send_summary(&outcomes, &status_log);
        }
        Commands::Run {
            csv,
            out_dir,
            assets_dir,
            log_dir,
        } => {
            let records = roster::read_roster(&csv)?;
            let config = SmtpConfig::from_env()?;
            let mailer = SmtpMailer::new(&config)?;
            let mut status_log = CsvStatusLog::new(&log_dir);
            let outcomes = dispatch::run_batch(
                &records,
                &out_dir,
                &assets_dir,
                &mailer,
                &mut status_log,
            )
            .await?;
            print_outcomes(&outcomes);
            print_send_summary(&outcomes, &status_log);
        }
        Commands::Bundle { out_dir, out } => {
            let count = bundle::bundle_cards(&out_dir, &out)?;
            println!("Bundled {count} grade cards into {}.", out.display());
        }
        Commands::Log { log_dir, json } => {
            let status_log = CsvStatusLog::new(&log_dir);
            let entries = status_log.read_all()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No send outcomes logged yet.");
            } else {
                for entry in &entries {
                    println!("- {} ({}): {}", entry.name, entry.email, entry.status);
                }
            }
        }
    }

    Ok(())
}

fn print_outcomes(outcomes: &[RecordOutcome]) {
    for record in outcomes {
        match &record.outcome {
            Outcome::Rendered(path) => {
                println!("- {} ({}): wrote {}", record.name, record.email, path.display());
            }
            Outcome::Sent => println!("- {} ({}): sent", record.name, record.email),
            Outcome::Failed(reason) => {
                println!("- {} ({}): failed: {reason}", record.name, record.email);
            }
        }
    }
}

fn print_send_summary(outcomes: &[RecordOutcome], status_log: &CsvStatusLog) {
    let sent = outcomes
        .iter()
        .filter(|o| matches!(o.outcome, Outcome::Sent))
        .count();
    println!(
        "Batch complete: {sent} of {} grade cards sent. Outcomes recorded in {}.",
        outcomes.len(),
        status_log.path().display()
    );
}
