use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::models::{
    Application, ApplicationStatus, EnrichmentRecord, Feedback, ResultFields, Stage, StatusEntry,
};

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS enrichment (
                digest_id TEXT NOT NULL,
                identity TEXT NOT NULL,
                stage TEXT NOT NULL CHECK (stage IN ('pending', 'removed', 'enriched')),
                result_fields TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL,
                PRIMARY KEY (digest_id, identity)
            );

            CREATE TABLE IF NOT EXISTS applications (
                id TEXT PRIMARY KEY,
                role TEXT NOT NULL,
                organization TEXT NOT NULL,
                applied_date TEXT NOT NULL,
                source TEXT NOT NULL,
                url TEXT,
                job_identity TEXT,
                status TEXT NOT NULL CHECK (status IN ('applied', 'responded', 'interview', 'offer', 'rejected', 'withdrawn')),
                response_date TEXT,
                response_days INTEGER,
                interview_dates TEXT NOT NULL DEFAULT '[]',
                offer_date TEXT,
                rejection_date TEXT,
                feedback_type TEXT,
                feedback_text TEXT,
                has_cover_letter INTEGER NOT NULL DEFAULT 0,
                resume_sent INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS status_history (
                application_id TEXT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                status TEXT NOT NULL,
                date TEXT NOT NULL,
                note TEXT,
                PRIMARY KEY (application_id, position)
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_applications_org ON applications(LOWER(organization));
            CREATE INDEX IF NOT EXISTS idx_applications_identity ON applications(job_identity);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='enrichment'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'huntlog init' first."));
        }
        Ok(())
    }

    // --- Enrichment checkpoint operations ---

    /// Every checkpoint recorded for a digest, keyed by job identity.
    pub fn get_enrichment(&self, digest_id: &str) -> Result<BTreeMap<String, EnrichmentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT identity, stage, result_fields, updated_at FROM enrichment WHERE digest_id = ?1",
        )?;
        let rows = stmt.query_map([digest_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, DateTime<Utc>>(3)?,
            ))
        })?;

        let mut records = BTreeMap::new();
        for row in rows {
            let (identity, stage, fields, updated_at) = row?;
            let record = EnrichmentRecord {
                stage: stage.parse()?,
                result_fields: serde_json::from_str(&fields)
                    .with_context(|| format!("Corrupt result fields for {}", identity))?,
                updated_at,
            };
            records.insert(identity, record);
        }
        Ok(records)
    }

    pub fn upsert_enrichment(
        &self,
        digest_id: &str,
        identity: &str,
        record: &EnrichmentRecord,
    ) -> Result<()> {
        let fields = serde_json::to_string(&record.result_fields)?;
        self.conn.execute(
            "INSERT INTO enrichment (digest_id, identity, stage, result_fields, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (digest_id, identity) DO UPDATE SET
                stage = excluded.stage,
                result_fields = excluded.result_fields,
                updated_at = excluded.updated_at",
            params![digest_id, identity, record.stage.as_str(), fields, record.updated_at],
        )?;
        Ok(())
    }

    /// Identities from `all` that still need enrichment, in the order given.
    pub fn pending_identities(&self, digest_id: &str, all: &[String]) -> Result<Vec<String>> {
        let records = self.get_enrichment(digest_id)?;
        Ok(all
            .iter()
            .filter(|identity| {
                records
                    .get(identity.as_str())
                    .is_none_or(|record| !record.stage.is_done())
            })
            .cloned()
            .collect())
    }

    // --- Application operations ---

    pub fn list_applications(&self) -> Result<Vec<Application>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY applied_date, id",
            APPLICATION_COLUMNS
        ))?;
        let rows = stmt.query_map([], Self::row_to_application)?;
        let mut apps = rows
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list applications")?;

        let mut history = self.load_history()?;
        for app in &mut apps {
            app.status_history = history.remove(&app.id).unwrap_or_default();
        }
        Ok(apps)
    }

    pub fn get_application(&self, id: &str) -> Result<Option<Application>> {
        let app = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", APPLICATION_COLUMNS),
                [id],
                Self::row_to_application,
            )
            .optional()?;
        match app {
            Some(mut app) => {
                app.status_history = self.load_history()?.remove(id).unwrap_or_default();
                Ok(Some(app))
            }
            None => Ok(None),
        }
    }

    /// Write one application (row and full history) and drop the records it
    /// absorbed, in a single transaction.
    pub fn save_application(&self, app: &Application, absorbed: &[String]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO applications (id, role, organization, applied_date, source, url, job_identity,
                status, response_date, response_days, interview_dates, offer_date, rejection_date,
                feedback_type, feedback_text, has_cover_letter, resume_sent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
             ON CONFLICT (id) DO UPDATE SET
                role = excluded.role, organization = excluded.organization,
                applied_date = excluded.applied_date, source = excluded.source, url = excluded.url,
                job_identity = excluded.job_identity, status = excluded.status,
                response_date = excluded.response_date, response_days = excluded.response_days,
                interview_dates = excluded.interview_dates, offer_date = excluded.offer_date,
                rejection_date = excluded.rejection_date, feedback_type = excluded.feedback_type,
                feedback_text = excluded.feedback_text, has_cover_letter = excluded.has_cover_letter,
                resume_sent = excluded.resume_sent",
            params![
                app.id,
                app.role,
                app.organization,
                app.applied_date,
                app.source,
                app.url,
                app.job_identity,
                app.status.as_str(),
                app.response_date,
                app.response_days,
                serde_json::to_string(&app.interview_dates)?,
                app.offer_date,
                app.rejection_date,
                app.feedback.as_ref().map(|f| f.kind.clone()),
                app.feedback.as_ref().map(|f| f.text.clone()),
                app.has_cover_letter,
                app.resume_sent,
            ],
        )?;

        tx.execute("DELETE FROM status_history WHERE application_id = ?1", [&app.id])?;
        for (position, entry) in app.status_history.iter().enumerate() {
            tx.execute(
                "INSERT INTO status_history (application_id, position, status, date, note)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![app.id, position as i64, entry.status.as_str(), entry.date, entry.note],
            )?;
        }

        for id in absorbed.iter().filter(|id| **id != app.id) {
            tx.execute("DELETE FROM status_history WHERE application_id = ?1", [id])?;
            tx.execute("DELETE FROM applications WHERE id = ?1", [id])?;
        }

        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('applications_updated_at', ?1)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            [Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn applications_updated_at(&self) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'applications_updated_at'",
                [],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn load_history(&self) -> Result<HashMap<String, Vec<StatusEntry>>> {
        let mut stmt = self.conn.prepare(
            "SELECT application_id, status, date, note FROM status_history
             ORDER BY application_id, position",
        )?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(1)?;
            Ok((
                row.get::<_, String>(0)?,
                StatusEntry {
                    status: parse_status(&status, 1)?,
                    date: row.get(2)?,
                    note: row.get(3)?,
                },
            ))
        })?;

        let mut history: HashMap<String, Vec<StatusEntry>> = HashMap::new();
        for row in rows {
            let (id, entry) = row?;
            history.entry(id).or_default().push(entry);
        }
        Ok(history)
    }

    fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<Application> {
        let status: String = row.get(7)?;
        let interview_dates: String = row.get(10)?;
        let feedback_type: Option<String> = row.get(13)?;
        let feedback_text: Option<String> = row.get(14)?;
        Ok(Application {
            id: row.get(0)?,
            role: row.get(1)?,
            organization: row.get(2)?,
            applied_date: row.get(3)?,
            source: row.get(4)?,
            url: row.get(5)?,
            job_identity: row.get(6)?,
            status: parse_status(&status, 7)?,
            status_history: Vec::new(),
            response_date: row.get(8)?,
            response_days: row.get(9)?,
            interview_dates: serde_json::from_str::<Vec<NaiveDate>>(&interview_dates)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?,
            offer_date: row.get(11)?,
            rejection_date: row.get(12)?,
            feedback: feedback_type.map(|kind| Feedback {
                kind,
                text: feedback_text.unwrap_or_default(),
            }),
            has_cover_letter: row.get(15)?,
            resume_sent: row.get(16)?,
        })
    }
}

const APPLICATION_COLUMNS: &str = "SELECT id, role, organization, applied_date, source, url, job_identity,
        status, response_date, response_days, interview_dates, offer_date, rejection_date,
        feedback_type, feedback_text, has_cover_letter, resume_sent
     FROM applications";

fn parse_status(value: &str, column: usize) -> rusqlite::Result<ApplicationStatus> {
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

/// A checkpoint stamped now.
pub fn checkpoint(stage: Stage, result_fields: ResultFields) -> EnrichmentRecord {
    EnrichmentRecord {
        stage,
        result_fields,
        updated_at: Utc::now(),
    }
}
