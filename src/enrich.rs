use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::{self, Database};
use crate::digest::{DigestDocument, Marker};
use crate::models::{ResultFields, Stage, WorkArrangement};

// --- Collaborator ---

/// What the enrichment collaborator found out about one posting.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Findings {
    pub work_arrangement: WorkArrangement,
    pub organization: Option<String>,
    pub title: Option<String>,
    pub closed: bool,
}

/// `Found` means the posting was checked, even if nothing changed.
/// `Unavailable` means it could not be checked at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    Found(Findings),
    Unavailable { reason: String },
}

pub trait Enricher {
    fn probe(&mut self, identity: &str, url: &str) -> Result<Probe>;
}

/// Runs an external program per posting: `<program> <args..> <url>`, with the
/// job identity in `HUNTLOG_JOB_ID`. It prints one JSON object, either the
/// findings or `{"unavailable": "<reason>"}`.
#[derive(Debug)]
pub struct CommandEnricher {
    program: String,
    args: Vec<String>,
}

impl CommandEnricher {
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("enricher_command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Enricher for CommandEnricher {
    fn probe(&mut self, identity: &str, url: &str) -> Result<Probe> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .env("HUNTLOG_JOB_ID", identity)
            .output()
            .with_context(|| format!("Failed to run enricher '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(Probe::Unavailable {
                reason: format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            });
        }

        let stdout = String::from_utf8(output.stdout).context("Invalid UTF-8 in enricher output")?;
        parse_response(&stdout)
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    unavailable: Option<String>,
    #[serde(flatten)]
    findings: Findings,
}

/// Parse the collaborator's answer. Text around the JSON object is ignored;
/// anything unparseable is an error, never a silent "nothing found".
pub fn parse_response(text: &str) -> Result<Probe> {
    let start = text.find('{').ok_or_else(|| anyhow!("No JSON object in enricher output"))?;
    let end = text.rfind('}').ok_or_else(|| anyhow!("No JSON object in enricher output"))?;
    if end < start {
        return Err(anyhow!("No JSON object in enricher output"));
    }
    let response: Response =
        serde_json::from_str(&text[start..=end]).context("Failed to parse enricher output")?;
    Ok(match response.unavailable {
        Some(reason) => Probe::Unavailable { reason },
        None => Probe::Found(response.findings),
    })
}

// --- Batch loop ---

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Checkpoints re-applied to the document before the batch started.
    pub replayed: usize,
    pub completed: usize,
    pub removed: usize,
    pub enriched: usize,
    pub remaining: usize,
    pub aborted: Option<String>,
}

/// Pending-marker entries in document order. Lines the user already marked
/// applied or rejected are left alone.
fn candidates(doc: &DigestDocument) -> Vec<String> {
    doc.marked(Marker::Pending)
        .into_iter()
        .map(|entry| entry.identity.clone())
        .collect()
}

/// Identities still waiting for enrichment, in document order.
pub fn pending(db: &Database, doc: &DigestDocument, digest_id: &str) -> Result<Vec<String>> {
    db.pending_identities(digest_id, &candidates(doc))
}

/// Identities enrichment has taken out of this digest. They stay out.
pub fn removed_identities(db: &Database, digest_id: &str) -> Result<HashSet<String>> {
    Ok(db
        .get_enrichment(digest_id)?
        .into_iter()
        .filter(|(_, record)| record.stage == Stage::Removed)
        .map(|(identity, _)| identity)
        .collect())
}

/// Write a `pending` checkpoint for every candidate the store hasn't seen.
pub fn register(db: &Database, doc: &DigestDocument, digest_id: &str) -> Result<usize> {
    let known = db.get_enrichment(digest_id)?;
    let mut added = 0;
    for identity in candidates(doc) {
        if !known.contains_key(&identity) {
            db.upsert_enrichment(
                digest_id,
                &identity,
                &db::checkpoint(Stage::Pending, ResultFields::default()),
            )?;
            added += 1;
        }
    }
    Ok(added)
}

/// Re-apply finished checkpoints to the document. A crash between the
/// checkpoint write and the document write is repaired here; on a document
/// that is already up to date nothing changes.
pub fn replay_checkpoints(db: &Database, doc: &mut DigestDocument, digest_id: &str) -> Result<usize> {
    let mut changed = 0;
    for (identity, record) in db.get_enrichment(digest_id)? {
        let applied = match record.stage {
            Stage::Pending => false,
            Stage::Removed => doc.entry(&identity).is_some_and(|e| e.marker == Marker::Pending)
                && doc.remove(&identity).is_some(),
            Stage::Enriched => doc.rewrite(&identity, &record.result_fields),
        };
        if applied {
            debug!(identity = %identity, stage = record.stage.as_str(), "replayed checkpoint");
            changed += 1;
        }
    }
    if changed > 0 {
        doc.save()?;
    }
    Ok(changed)
}

/// Turn findings into the checkpoint for the item.
pub fn decide(findings: &Findings, config: &Config) -> (Stage, ResultFields) {
    let mut fields = ResultFields {
        title: findings.title.clone(),
        organization: findings.organization.clone(),
        work_arrangement: Some(findings.work_arrangement)
            .filter(|a| *a != WorkArrangement::Unknown),
        removal_reason: None,
    };
    if findings.closed {
        fields.removal_reason = Some("posting closed".to_string());
        return (Stage::Removed, fields);
    }
    if !config.arrangement_allowed(findings.work_arrangement) {
        fields.removal_reason = Some(format!(
            "work arrangement {} not wanted",
            findings.work_arrangement.label()
        ));
        return (Stage::Removed, fields);
    }
    (Stage::Enriched, fields)
}

/// Process at most `batch_size` pending items: probe, persist the checkpoint,
/// persist the document, then check whether to stop. An unavailable
/// collaborator ends the batch and leaves that item for the next run.
pub fn run_batch(
    db: &Database,
    doc: &mut DigestDocument,
    digest_id: &str,
    batch_size: usize,
    enricher: &mut dyn Enricher,
    config: &Config,
) -> Result<BatchReport> {
    let mut report = BatchReport {
        replayed: replay_checkpoints(db, doc, digest_id)?,
        ..Default::default()
    };
    register(db, doc, digest_id)?;

    let pending = db.pending_identities(digest_id, &candidates(doc))?;
    for identity in pending.into_iter().take(batch_size) {
        let Some(url) = doc.entry(&identity).map(|e| e.url.clone()) else {
            continue;
        };

        let findings = match enricher.probe(&identity, &url) {
            Ok(Probe::Found(findings)) => findings,
            Ok(Probe::Unavailable { reason }) => {
                report.aborted = Some(reason);
                break;
            }
            Err(e) => {
                report.aborted = Some(format!("{:#}", e));
                break;
            }
        };

        let (stage, fields) = decide(&findings, config);
        db.upsert_enrichment(digest_id, &identity, &db::checkpoint(stage, fields.clone()))?;

        let changed = match stage {
            Stage::Removed => doc.remove(&identity).is_some(),
            _ => doc.rewrite(&identity, &fields),
        };
        if changed {
            doc.save()?;
        }

        match stage {
            Stage::Removed => {
                info!(identity = %identity, reason = fields.removal_reason.as_deref().unwrap_or(""), "removed job");
                report.removed += 1;
            }
            _ => {
                info!(identity = %identity, changed, "enriched job");
                report.enriched += 1;
            }
        }
        report.completed += 1;
    }

    report.remaining = db.pending_identities(digest_id, &candidates(doc))?.len();
    if let Some(reason) = &report.aborted {
        warn!(
            digest = digest_id,
            completed = report.completed,
            remaining = report.remaining,
            reason = %reason,
            "enrichment batch aborted"
        );
    }
    Ok(report)
}
