use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{info, warn};

use crate::mailer::{email_body, Mailer, OutgoingEmail, EMAIL_SUBJECT};
use crate::models::{StatusLogEntry, StudentRecord};
use crate::render;
use crate::statuslog::StatusLog;

#[derive(Debug)]
pub enum Outcome {
    Rendered(PathBuf),
    Sent,
    Failed(String),
}

#[derive(Debug)]
pub struct RecordOutcome {
    pub name: String,
    pub email: String,
    pub outcome: Outcome,
}

impl RecordOutcome {
    fn new(record: &StudentRecord, outcome: Outcome) -> Self {
        Self {
            name: record.name.clone(),
            email: record.email.clone(),
            outcome,
        }
    }
}

/// Renders a grade card for every record, in roster order. A failing record
/// yields a `Failed` outcome and the loop moves on to the next one.
pub fn generate_batch(
    records: &[StudentRecord],
    output_dir: &Path,
    assets_dir: &Path,
) -> anyhow::Result<Vec<RecordOutcome>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    let mut outcomes = Vec::with_capacity(records.len());
    for record in records {
        let outcome = match render::render(record, output_dir, assets_dir) {
            Ok(path) => {
                info!("rendered grade card for {} at {}", record.name, path.display());
                Outcome::Rendered(path)
            }
            Err(err) => {
                warn!("render failed for {}: {err}", record.name);
                Outcome::Failed(err.to_string())
            }
        };
        outcomes.push(RecordOutcome::new(record, outcome));
    }
    Ok(outcomes)
}

/// Emails the previously generated card of every record, appending one status
/// row per record. Fails up front if no cards have been generated at all;
/// after that, per-record failures never abort the batch.
pub async fn send_batch(
    records: &[StudentRecord],
    output_dir: &Path,
    mailer: &dyn Mailer,
    status_log: &mut dyn StatusLog,
) -> anyhow::Result<Vec<RecordOutcome>> {
    if !has_generated_cards(output_dir) {
        anyhow::bail!(
            "no grade cards found in {} - generate them first",
            output_dir.display()
        );
    }

    let mut outcomes = Vec::with_capacity(records.len());
    for record in records {
        outcomes.push(send_and_log(record, output_dir, mailer, status_log).await?);
    }
    Ok(outcomes)
}

/// The original one-button flow: render then send per record, with a status
/// row for every record whichever step failed.
pub async fn run_batch(
    records: &[StudentRecord],
    output_dir: &Path,
    assets_dir: &Path,
    mailer: &dyn Mailer,
    status_log: &mut dyn StatusLog,
) -> anyhow::Result<Vec<RecordOutcome>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    let mut outcomes = Vec::with_capacity(records.len());
    for record in records {
        let outcome = match render::render(record, output_dir, assets_dir) {
            Ok(_) => {
                outcomes.push(send_and_log(record, output_dir, mailer, status_log).await?);
                continue;
            }
            Err(err) => {
                warn!("render failed for {}: {err}", record.name);
                status_log.append(StatusLogEntry::failed(
                    &record.name,
                    &record.email,
                    &err.to_string(),
                ))?;
                Outcome::Failed(err.to_string())
            }
        };
        outcomes.push(RecordOutcome::new(record, outcome));
    }
    Ok(outcomes)
}

async fn send_and_log(
    record: &StudentRecord,
    output_dir: &Path,
    mailer: &dyn Mailer,
    status_log: &mut dyn StatusLog,
) -> anyhow::Result<RecordOutcome> {
    let outcome = match send_card(record, output_dir, mailer).await {
        Ok(()) => {
            info!("sent grade card to {} ({})", record.name, record.email);
            status_log.append(StatusLogEntry::sent(&record.name, &record.email))?;
            Outcome::Sent
        }
        Err(reason) => {
            warn!("send failed for {}: {reason}", record.name);
            status_log.append(StatusLogEntry::failed(&record.name, &record.email, &reason))?;
            Outcome::Failed(reason)
        }
    };
    Ok(RecordOutcome::new(record, outcome))
}

async fn send_card(
    record: &StudentRecord,
    output_dir: &Path,
    mailer: &dyn Mailer,
) -> Result<(), String> {
    let path = render::output_path(output_dir, &record.name);
    let attachment = fs::read(&path)
        .map_err(|err| format!("could not read grade card {}: {err}", path.display()))?;
    let attachment_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gradecard.pdf".to_string());

    let email = OutgoingEmail {
        to: record.email.clone(),
        subject: EMAIL_SUBJECT.to_string(),
        body: email_body(&record.name),
        attachment_name,
        attachment,
    };
    mailer.send(&email).await.map_err(|err| err.to_string())
}

fn has_generated_cards(output_dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(output_dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        entry
            .file_name()
            .to_string_lossy()
            .ends_with("_gradecard.pdf")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::SendError;
    use crate::models::SUBJECTS;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct MemoryLog {
        entries: Vec<StatusLogEntry>,
    }

    impl MemoryLog {
        fn new() -> Self {
            Self {
                entries: Vec::new(),
            }
        }
    }

    impl StatusLog for MemoryLog {
        fn append(&mut self, entry: StatusLogEntry) -> anyhow::Result<()> {
            self.entries.push(entry);
            Ok(())
        }

        fn read_all(&self) -> anyhow::Result<Vec<StatusLogEntry>> {
            Ok(self.entries.clone())
        }
    }

    struct FlakyMailer {
        fail_for: Vec<String>,
        sent_to: Mutex<Vec<String>>,
    }

    impl FlakyMailer {
        fn new(fail_for: &[&str]) -> Self {
            Self {
                fail_for: fail_for.iter().map(|s| s.to_string()).collect(),
                sent_to: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError> {
            if self.fail_for.contains(&email.to) {
                return Err(SendError::Transport("connection reset".to_string()));
            }
            assert!(email.attachment.starts_with(b"%PDF"));
            self.sent_to.lock().unwrap().push(email.to.clone());
            Ok(())
        }
    }

    fn student(name: &str, email: &str) -> StudentRecord {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), name.to_string());
        fields.insert("RollNo".to_string(), "17".to_string());
        fields.insert("Course".to_string(), "B.Sc. CS".to_string());
        fields.insert("Semester".to_string(), "VI".to_string());
        fields.insert("Email".to_string(), email.to_string());
        for subject in SUBJECTS {
            for part in ["UT", "Practical", "Final"] {
                fields.insert(format!("{subject}_{part}"), "40".to_string());
            }
        }
        StudentRecord::new(fields)
    }

    fn student_missing_scores(name: &str, email: &str) -> StudentRecord {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), name.to_string());
        fields.insert("Email".to_string(), email.to_string());
        StudentRecord::new(fields)
    }

    #[tokio::test]
    async fn send_failure_does_not_stop_later_records() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            student("Avery Lee", "avery@example.com"),
            student("Jules Moreno", "jules@example.com"),
            student("Kiara Patel", "kiara@example.com"),
        ];
        let mailer = FlakyMailer::new(&["jules@example.com"]);
        let mut log = MemoryLog::new();

        let outcomes = run_batch(
            &records,
            dir.path(),
            Path::new("assets"),
            &mailer,
            &mut log,
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0].outcome, Outcome::Sent));
        assert!(matches!(outcomes[1].outcome, Outcome::Failed(_)));
        assert!(matches!(outcomes[2].outcome, Outcome::Sent));

        assert_eq!(log.entries.len(), 3);
        assert!(log.entries[0].is_sent());
        assert_eq!(
            log.entries[1].status,
            "Failed: smtp failure: connection reset"
        );
        assert!(log.entries[2].is_sent());

        let sent = mailer.sent_to.lock().unwrap();
        assert_eq!(*sent, vec!["avery@example.com", "kiara@example.com"]);
    }

    #[tokio::test]
    async fn render_failure_is_logged_and_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            student_missing_scores("Avery Lee", "avery@example.com"),
            student("Jules Moreno", "jules@example.com"),
        ];
        let mailer = FlakyMailer::new(&[]);
        let mut log = MemoryLog::new();

        let outcomes = run_batch(
            &records,
            dir.path(),
            Path::new("assets"),
            &mailer,
            &mut log,
        )
        .await
        .unwrap();

        assert!(matches!(outcomes[0].outcome, Outcome::Failed(_)));
        assert!(matches!(outcomes[1].outcome, Outcome::Sent));
        assert_eq!(log.entries.len(), 2);
        assert!(log.entries[0].status.contains("missing required column"));
        assert!(!render::output_path(dir.path(), "Avery Lee").exists());
    }

    #[tokio::test]
    async fn send_batch_requires_generated_cards() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![student("Avery Lee", "avery@example.com")];
        let mailer = FlakyMailer::new(&[]);
        let mut log = MemoryLog::new();

        let err = send_batch(&records, dir.path(), &mailer, &mut log)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("generate them first"));
        assert!(log.entries.is_empty());
    }

    #[tokio::test]
    async fn send_batch_reports_a_missing_card_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let generated = vec![student("Avery Lee", "avery@example.com")];
        generate_batch(&generated, dir.path(), Path::new("assets")).unwrap();

        // Jules joined the roster after the generate pass; only his send fails.
        let records = vec![
            student("Avery Lee", "avery@example.com"),
            student("Jules Moreno", "jules@example.com"),
        ];
        let mailer = FlakyMailer::new(&[]);
        let mut log = MemoryLog::new();

        let outcomes = send_batch(&records, dir.path(), &mailer, &mut log)
            .await
            .unwrap();
        assert!(matches!(outcomes[0].outcome, Outcome::Sent));
        assert!(matches!(outcomes[1].outcome, Outcome::Failed(_)));
        assert!(log.entries[1].status.contains("could not read grade card"));
    }

    #[tokio::test]
    async fn generate_batch_renders_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("cards");
        let records = vec![
            student("Avery Lee", "avery@example.com"),
            student("Jules Moreno", "jules@example.com"),
        ];

        let outcomes = generate_batch(&records, &out_dir, Path::new("assets")).unwrap();
        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            assert!(matches!(outcome.outcome, Outcome::Rendered(_)));
        }
        assert!(render::output_path(&out_dir, "Avery Lee").exists());
        assert!(render::output_path(&out_dir, "Jules Moreno").exists());
    }
}
