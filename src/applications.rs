use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::classify;
use crate::digest::{DigestDocument, Marker};
use crate::error::TrackerError;
use crate::identity::{self, Pick};
use crate::models::{Application, ApplicationStatus, Feedback, Origin, StatusEntry};

/// Jaro-Winkler score above which two normalized organization names are the same.
const ORG_SIMILARITY: f64 = 0.93;

const LEGAL_SUFFIXES: &[&str] = &[
    "inc", "llc", "ltd", "limited", "gmbh", "corp", "corporation", "co", "plc", "sa", "bv", "ag",
];

pub fn new_application_id() -> String {
    format!("app-{:08x}", rand::random::<u32>())
}

impl Application {
    pub fn new(
        id: String,
        role: &str,
        organization: &str,
        applied_date: NaiveDate,
        source: &str,
        origin: Origin,
    ) -> Self {
        Self {
            id,
            role: role.trim().to_string(),
            organization: organization.trim().to_string(),
            applied_date,
            source: source.to_string(),
            url: None,
            job_identity: None,
            status: ApplicationStatus::Applied,
            status_history: vec![StatusEntry {
                status: ApplicationStatus::Applied,
                date: applied_date,
                note: Some(format!("recorded via {}", origin.as_str())),
            }],
            response_date: None,
            response_days: None,
            interview_dates: Vec::new(),
            offer_date: None,
            rejection_date: None,
            feedback: None,
            has_cover_letter: false,
            resume_sent: origin == Origin::ResumeScan,
        }
    }

    /// Move to `status` on `date`. Every call is appended to the history,
    /// including moves backwards; derived dates are first-write-wins.
    pub fn transition(&mut self, status: ApplicationStatus, date: NaiveDate, note: Option<String>) {
        self.status_history.push(StatusEntry { status, date, note });
        self.status = status;

        match status {
            ApplicationStatus::Responded if self.response_date.is_none() => {
                self.response_date = Some(date);
                self.response_days = Some((date - self.applied_date).num_days());
            }
            ApplicationStatus::Interview if !self.interview_dates.contains(&date) => {
                self.interview_dates.push(date);
                self.interview_dates.sort();
            }
            ApplicationStatus::Offer if self.offer_date.is_none() => {
                self.offer_date = Some(date);
            }
            ApplicationStatus::Rejected if self.rejection_date.is_none() => {
                self.rejection_date = Some(date);
            }
            _ => {}
        }
    }

    pub fn set_feedback(&mut self, kind: &str, text: &str) {
        self.feedback = Some(Feedback {
            kind: kind.trim().to_string(),
            text: text.trim().to_string(),
        });
    }

    fn reached(&self, status: ApplicationStatus) -> bool {
        self.status_history.iter().any(|e| e.status == status)
    }

    /// Whether an interview was reached after a response was recorded.
    fn interviewed_after_response(&self) -> bool {
        let Some(first_response) = self
            .status_history
            .iter()
            .position(|e| e.status == ApplicationStatus::Responded)
        else {
            return false;
        };
        self.status_history[first_response..]
            .iter()
            .any(|e| e.status == ApplicationStatus::Interview)
    }

    fn latest_date_for(&self, status: ApplicationStatus) -> Option<NaiveDate> {
        self.status_history
            .iter()
            .filter(|e| e.status == status)
            .map(|e| e.date)
            .max()
    }
}

/// Lowercase, strip punctuation and legal suffixes.
pub fn normalize_organization(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while words.len() > 1 && words.last().is_some_and(|w| LEGAL_SUFFIXES.contains(w)) {
        words.pop();
    }
    words.join(" ")
}

pub fn same_organization(a: &str, b: &str) -> bool {
    let (a, b) = (normalize_organization(a), normalize_organization(b));
    if a.is_empty() || b.is_empty() || classify::is_placeholder(&a) || classify::is_placeholder(&b) {
        return false;
    }
    a == b || strsim::jaro_winkler(&a, &b) >= ORG_SIMILARITY
}

/// Two records describe the same act of applying when they share a job
/// identity, or (lacking conflicting identities) the same organization within
/// `tolerance_days` of each other.
pub fn is_duplicate(a: &Application, b: &Application, tolerance_days: i64) -> bool {
    match (&a.job_identity, &b.job_identity) {
        (Some(x), Some(y)) if x == y => return true,
        (Some(_), Some(_)) => return false,
        _ => {}
    }
    same_organization(&a.organization, &b.organization)
        && (a.applied_date - b.applied_date).num_days().abs() <= tolerance_days
}

/// Status after merging two records. Rejected/withdrawn are definitive and
/// always win; otherwise the most advanced state wins.
pub fn resolve_status(a: &Application, b: &Application) -> ApplicationStatus {
    match (a.status.progress_rank(), b.status.progress_rank()) {
        (None, Some(_)) => a.status,
        (Some(_), None) => b.status,
        (Some(ra), Some(rb)) => {
            if rb > ra {
                b.status
            } else {
                a.status
            }
        }
        (None, None) => {
            // both definitive: the later outcome stands, rejection on a tie
            let (da, db) = (a.latest_date_for(a.status), b.latest_date_for(b.status));
            if db > da || (db == da && b.status == ApplicationStatus::Rejected) {
                b.status
            } else {
                a.status
            }
        }
    }
}

fn earliest(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}

/// Fold `other` into `target`, field by field, upgrade-only.
pub fn merge(target: &mut Application, other: Application) {
    if identity::pick_text(Some(target.role.as_str()), 0, Some(other.role.as_str()), 0) == Pick::Take {
        target.role = other.role.clone();
    }
    if identity::pick_text(
        Some(target.organization.as_str()),
        0,
        Some(other.organization.as_str()),
        0,
    ) == Pick::Take {
        target.organization = other.organization.clone();
    }
    if classify::is_placeholder(&target.source) && !classify::is_placeholder(&other.source) {
        target.source = other.source.clone();
    }
    target.url = target.url.take().or_else(|| other.url.clone());
    target.job_identity = target.job_identity.take().or_else(|| other.job_identity.clone());
    target.status = resolve_status(target, &other);

    target.response_date = earliest(target.response_date, other.response_date);
    target.applied_date = target.applied_date.min(other.applied_date);
    // days are counted from the merged applied date
    if let Some(responded) = target.response_date {
        target.response_days = Some((responded - target.applied_date).num_days());
    }

    for date in &other.interview_dates {
        if !target.interview_dates.contains(date) {
            target.interview_dates.push(*date);
        }
    }
    target.interview_dates.sort();
    target.offer_date = earliest(target.offer_date, other.offer_date);
    target.rejection_date = earliest(target.rejection_date, other.rejection_date);
    target.feedback = target.feedback.take().or(other.feedback);
    target.has_cover_letter |= other.has_cover_letter;
    target.resume_sent |= other.resume_sent;

    for entry in other.status_history {
        if !target.status_history.contains(&entry) {
            target.status_history.push(entry);
        }
    }
    target.status_history.sort_by_key(|e| e.date);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub id: String,
    /// Ids of records folded into `id` (including the incoming one when merged).
    pub absorbed: Vec<String>,
    pub merged: bool,
}

/// The canonical set of applications, loaded from and saved back to the store
/// by the caller.
#[derive(Debug, Default)]
pub struct Tracker {
    applications: Vec<Application>,
    tolerance_days: i64,
}

impl Tracker {
    pub fn new(applications: Vec<Application>, tolerance_days: i64) -> Self {
        Self {
            applications,
            tolerance_days,
        }
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn get(&self, id: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.id == id)
    }

    /// Add a record from any ingestion path, merging it into an existing
    /// duplicate instead of creating a second one.
    pub fn record(&mut self, candidate: Application) -> Recorded {
        let tolerance = self.tolerance_days;
        if let Some(existing) = self
            .applications
            .iter_mut()
            .find(|a| is_duplicate(a, &candidate, tolerance))
        {
            let incoming_id = candidate.id.clone();
            info!(id = %existing.id, merged = %incoming_id, org = %existing.organization, "merged duplicate application");
            merge(existing, candidate);
            return Recorded {
                id: existing.id.clone(),
                absorbed: vec![incoming_id],
                merged: true,
            };
        }

        info!(id = %candidate.id, org = %candidate.organization, role = %candidate.role, "new application");
        let id = candidate.id.clone();
        self.applications.push(candidate);
        Recorded {
            id,
            absorbed: Vec::new(),
            merged: false,
        }
    }

    pub fn transition(
        &mut self,
        id: &str,
        status: ApplicationStatus,
        date: NaiveDate,
        note: Option<String>,
    ) -> Result<&Application, TrackerError> {
        let app = self.get_mut(id)?;
        if status.progress_rank() < app.status.progress_rank() && status.progress_rank().is_some() {
            info!(id = %id, from = %app.status, to = %status, "status moved backwards");
        }
        app.transition(status, date, note);
        Ok(&*app)
    }

    pub fn add_feedback(&mut self, id: &str, kind: &str, text: &str) -> Result<&Application, TrackerError> {
        let app = self.get_mut(id)?;
        app.set_feedback(kind, text);
        Ok(&*app)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Application, TrackerError> {
        self.applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }

    /// Merge every pair of duplicates already in the set. Returns, per
    /// surviving id, the ids folded into it.
    pub fn dedupe(&mut self) -> Vec<Recorded> {
        let existing = std::mem::take(&mut self.applications);
        let mut merges: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for app in existing {
            let recorded = self.record(app);
            if recorded.merged {
                merges.entry(recorded.id).or_default().extend(recorded.absorbed);
            }
        }
        merges
            .into_iter()
            .map(|(id, absorbed)| Recorded {
                id,
                absorbed,
                merged: true,
            })
            .collect()
    }

    pub fn metrics(&self) -> Metrics {
        Metrics::compute(&self.applications)
    }
}

/// Candidate applications for lines marked applied in a digest.
pub fn candidates_from_digest(doc: &DigestDocument, applied_date: NaiveDate) -> Vec<Application> {
    doc.marked(Marker::Applied)
        .into_iter()
        .map(|entry| {
            let mut app = Application::new(
                new_application_id(),
                &entry.title,
                entry.organization.as_deref().unwrap_or("Unknown Company"),
                applied_date,
                "digest",
                Origin::DigestMark,
            );
            app.url = Some(entry.url.clone());
            app.job_identity = Some(entry.identity.clone());
            app
        })
        .collect()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Breakdown {
    pub total: usize,
    pub responded: usize,
    pub interviews: usize,
    pub offers: usize,
    pub rejected: usize,
}

impl Breakdown {
    fn add(&mut self, app: &Application) {
        self.total += 1;
        if app.reached(ApplicationStatus::Responded) {
            self.responded += 1;
        }
        if app.reached(ApplicationStatus::Interview) {
            self.interviews += 1;
        }
        if app.reached(ApplicationStatus::Offer) {
            self.offers += 1;
        }
        if app.status == ApplicationStatus::Rejected {
            self.rejected += 1;
        }
    }
}

/// Reporting view over the current application set. Always recomputed from
/// the records; nothing here is stored.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metrics {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub response_rate: f64,
    pub interview_conversion_rate: f64,
    pub offer_conversion_rate: f64,
    pub average_response_days: Option<f64>,
    pub by_source: BTreeMap<String, Breakdown>,
    pub by_role: BTreeMap<String, Breakdown>,
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

impl Metrics {
    pub fn compute(apps: &[Application]) -> Self {
        let mut metrics = Metrics {
            total: apps.len(),
            ..Default::default()
        };

        let mut responded = 0;
        let mut interviewed_from_response = 0;
        let mut interviewed = 0;
        let mut offers = 0;
        let mut response_days = Vec::new();

        for app in apps {
            *metrics.by_status.entry(app.status.to_string()).or_default() += 1;

            if app.reached(ApplicationStatus::Responded) {
                responded += 1;
                if app.interviewed_after_response() {
                    interviewed_from_response += 1;
                }
            }
            if app.reached(ApplicationStatus::Interview) {
                interviewed += 1;
                if app.reached(ApplicationStatus::Offer) {
                    offers += 1;
                }
            }
            if let Some(days) = app.response_days {
                response_days.push(days);
            }

            metrics.by_source.entry(app.source.clone()).or_default().add(app);
            metrics
                .by_role
                .entry(app.role.trim().to_lowercase())
                .or_default()
                .add(app);
        }

        metrics.response_rate = ratio(responded, apps.len());
        metrics.interview_conversion_rate = ratio(interviewed_from_response, responded);
        metrics.offer_conversion_rate = ratio(offers, interviewed);
        if !response_days.is_empty() {
            metrics.average_response_days =
                Some(response_days.iter().sum::<i64>() as f64 / response_days.len() as f64);
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn app(id: &str, org: &str, applied: &str) -> Application {
        Application::new(id.to_string(), "Senior Product Manager", org, date(applied), "linkedin", Origin::Manual)
    }

    #[test]
    fn test_response_days_computed_once() {
        let mut a = app("a", "Acme", "2026-10-01");
        a.transition(ApplicationStatus::Responded, date("2026-10-06"), None);
        assert_eq!(a.response_days, Some(5));
        assert_eq!(a.response_date, Some(date("2026-10-06")));

        a.transition(ApplicationStatus::Interview, date("2026-10-10"), None);
        a.transition(ApplicationStatus::Responded, date("2026-10-20"), Some("follow-up".into()));
        assert_eq!(a.response_days, Some(5));
        assert_eq!(a.response_date, Some(date("2026-10-06")));
        assert_eq!(a.status, ApplicationStatus::Responded);
        assert_eq!(a.status_history.len(), 4);
    }

    #[test]
    fn test_interview_dates_idempotent() {
        let mut a = app("a", "Acme", "2026-10-01");
        a.transition(ApplicationStatus::Interview, date("2026-10-12"), None);
        a.transition(ApplicationStatus::Interview, date("2026-10-12"), None);
        a.transition(ApplicationStatus::Interview, date("2026-10-09"), None);
        assert_eq!(a.interview_dates, vec![date("2026-10-09"), date("2026-10-12")]);
        assert_eq!(a.status_history.len(), 4);
    }

    #[test]
    fn test_terminal_dates_first_write_wins() {
        let mut a = app("a", "Acme", "2026-10-01");
        a.transition(ApplicationStatus::Rejected, date("2026-10-05"), None);
        a.transition(ApplicationStatus::Rejected, date("2026-10-07"), Some("second email".into()));
        assert_eq!(a.rejection_date, Some(date("2026-10-05")));

        a.transition(ApplicationStatus::Offer, date("2026-11-01"), None);
        a.transition(ApplicationStatus::Offer, date("2026-11-03"), None);
        assert_eq!(a.offer_date, Some(date("2026-11-01")));
        assert_eq!(a.status_history.len(), 5);
    }

    #[test]
    fn test_regression_is_recorded() {
        let mut tracker = Tracker::new(vec![app("a", "Acme", "2026-10-01")], 3);
        tracker
            .transition("a", ApplicationStatus::Interview, date("2026-10-05"), None)
            .unwrap();
        let a = tracker
            .transition("a", ApplicationStatus::Applied, date("2026-10-06"), Some("mis-click".into()))
            .unwrap();
        assert_eq!(a.status, ApplicationStatus::Applied);
        assert_eq!(a.status_history.last().unwrap().note.as_deref(), Some("mis-click"));
        assert!(matches!(
            tracker.transition("zzz", ApplicationStatus::Offer, date("2026-10-06"), None),
            Err(TrackerError::NotFound(_))
        ));
    }

    #[test]
    fn test_same_organization() {
        assert!(same_organization("Acme", "ACME Inc."));
        assert!(same_organization("Acme Gaming Ltd", "acme gaming"));
        assert!(same_organization("SoftSwiss", "Softswiss"));
        assert!(!same_organization("Acme", "Bolt"));
        assert!(!same_organization("Unknown Company", "Unknown Company"));
        assert!(!same_organization("", ""));
    }

    #[test]
    fn test_is_duplicate() {
        let a = app("a", "Acme", "2026-10-01");
        let b = app("b", "Acme Inc", "2026-10-03");
        let c = app("c", "Acme", "2026-10-10");
        assert!(is_duplicate(&a, &b, 3));
        assert!(!is_duplicate(&a, &c, 3));

        let mut d = app("d", "Totally Different", "2026-12-01");
        let mut e = app("e", "Other Name", "2026-10-01");
        d.job_identity = Some("100".into());
        e.job_identity = Some("100".into());
        assert!(is_duplicate(&d, &e, 3));

        let mut f = a.clone();
        let mut g = b.clone();
        f.job_identity = Some("100".into());
        g.job_identity = Some("200".into());
        assert!(!is_duplicate(&f, &g, 3));
    }

    #[test]
    fn test_dedup_merge_two_paths() {
        let mut scanned = Application::new(
            "scan".into(),
            "Unknown Role",
            "Acme",
            date("2026-10-01"),
            "resume-folder",
            Origin::ResumeScan,
        );
        scanned.transition(ApplicationStatus::Responded, date("2026-10-04"), None);

        let mut marked = Application::new(
            "mark".into(),
            "Senior Product Manager",
            "Acme",
            date("2026-10-03"),
            "digest",
            Origin::DigestMark,
        );
        marked.url = Some("https://www.linkedin.com/jobs/view/100".into());
        marked.job_identity = Some("100".into());
        marked.transition(ApplicationStatus::Interview, date("2026-10-09"), None);

        let scanned_history = scanned.status_history.clone();
        let marked_history = marked.status_history.clone();

        let mut tracker = Tracker::new(vec![scanned], 3);
        let recorded = tracker.record(marked);
        assert!(recorded.merged);
        assert_eq!(recorded.id, "scan");
        assert_eq!(recorded.absorbed, vec!["mark".to_string()]);
        assert_eq!(tracker.applications().len(), 1);

        let merged = tracker.get("scan").unwrap();
        assert_eq!(merged.status, ApplicationStatus::Interview);
        assert_eq!(merged.role, "Senior Product Manager");
        assert_eq!(merged.job_identity.as_deref(), Some("100"));
        assert_eq!(merged.applied_date, date("2026-10-01"));
        assert_eq!(merged.response_days, Some(3));
        assert!(merged.resume_sent);
        for entry in scanned_history.iter().chain(&marked_history) {
            assert!(merged.status_history.contains(entry));
        }
        let dates: Vec<NaiveDate> = merged.status_history.iter().map(|e| e.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn test_merge_counts_response_days_from_earliest_application() {
        let scanned = Application::new(
            "scan".into(),
            "Unknown Role",
            "Acme",
            date("2026-10-01"),
            "resume-folder",
            Origin::ResumeScan,
        );
        let mut reply = Application::new(
            "reply".into(),
            "Senior Product Manager",
            "Acme",
            date("2026-10-03"),
            "email",
            Origin::ReplyEmail,
        );
        reply.transition(ApplicationStatus::Responded, date("2026-10-04"), None);
        assert_eq!(reply.response_days, Some(1));

        let mut tracker = Tracker::new(vec![scanned], 3);
        assert!(tracker.record(reply).merged);

        let merged = tracker.get("scan").unwrap();
        assert_eq!(merged.applied_date, date("2026-10-01"));
        assert_eq!(merged.response_date, Some(date("2026-10-04")));
        assert_eq!(merged.response_days, Some(3));
        assert_eq!(tracker.metrics().average_response_days, Some(3.0));
    }

    #[test]
    fn test_rejection_is_authoritative_in_merge() {
        let mut a = app("a", "Acme", "2026-10-01");
        a.transition(ApplicationStatus::Interview, date("2026-10-05"), None);
        let mut b = app("b", "Acme", "2026-10-02");
        b.transition(ApplicationStatus::Rejected, date("2026-10-04"), None);

        assert_eq!(resolve_status(&a, &b), ApplicationStatus::Rejected);
        assert_eq!(resolve_status(&b, &a), ApplicationStatus::Rejected);

        let mut c = app("c", "Acme", "2026-10-01");
        c.transition(ApplicationStatus::Withdrawn, date("2026-10-10"), None);
        assert_eq!(resolve_status(&b, &c), ApplicationStatus::Withdrawn);
        assert_eq!(resolve_status(&c, &b), ApplicationStatus::Withdrawn);

        let mut d = app("d", "Acme", "2026-10-01");
        d.transition(ApplicationStatus::Withdrawn, date("2026-10-04"), None);
        assert_eq!(resolve_status(&d, &b), ApplicationStatus::Rejected);
    }

    #[test]
    fn test_tracker_dedupe_pass() {
        let mut tracker = Tracker::new(
            vec![
                app("a", "Acme", "2026-10-01"),
                app("b", "Bolt", "2026-10-01"),
                app("c", "Acme Inc", "2026-10-02"),
                app("d", "ACME", "2026-10-03"),
            ],
            3,
        );
        let merges = tracker.dedupe();
        assert_eq!(tracker.applications().len(), 2);
        assert_eq!(
            merges,
            vec![Recorded {
                id: "a".into(),
                absorbed: vec!["c".into(), "d".into()],
                merged: true
            }]
        );
        assert!(tracker.dedupe().is_empty());
    }

    #[test]
    fn test_metrics() {
        let mut a = app("a", "Acme", "2026-10-01");
        a.transition(ApplicationStatus::Responded, date("2026-10-05"), None);
        a.transition(ApplicationStatus::Interview, date("2026-10-08"), None);
        a.transition(ApplicationStatus::Offer, date("2026-10-20"), None);

        let mut b = app("b", "Bolt", "2026-10-01");
        b.source = "indeed".into();
        b.transition(ApplicationStatus::Responded, date("2026-10-03"), None);
        b.transition(ApplicationStatus::Rejected, date("2026-10-06"), None);

        let mut c = app("c", "Cobalt", "2026-10-01");
        c.transition(ApplicationStatus::Interview, date("2026-10-03"), None);

        let d = app("d", "Delta", "2026-10-01");

        let tracker = Tracker::new(vec![a, b, c, d], 3);
        let m = tracker.metrics();
        assert_eq!(m.total, 4);
        assert_eq!(m.response_rate, 0.5);
        assert_eq!(m.interview_conversion_rate, 0.5);
        assert_eq!(m.offer_conversion_rate, 0.5);
        assert_eq!(m.average_response_days, Some(3.0));
        assert_eq!(m.by_status["rejected"], 1);
        assert_eq!(m.by_status["applied"], 1);
        assert_eq!(m.by_source["linkedin"].total, 3);
        assert_eq!(m.by_source["indeed"].rejected, 1);
        assert_eq!(m.by_role["senior product manager"].offers, 1);
    }

    #[test]
    fn test_metrics_recomputed_on_read() {
        let mut tracker = Tracker::new(vec![app("a", "Acme", "2026-10-01")], 3);
        assert_eq!(tracker.metrics().response_rate, 0.0);
        tracker
            .transition("a", ApplicationStatus::Responded, date("2026-10-02"), None)
            .unwrap();
        assert_eq!(tracker.metrics().response_rate, 1.0);
        assert_eq!(Metrics::compute(&[]), Metrics::default());
    }

    #[test]
    fn test_candidates_from_digest() {
        let text = "# Job digest 2026-10-18

**Best match:** 1 · **Other:** 1

## Best match

- [x] [Senior Product Manager · Acme · Remote](https://www.linkedin.com/jobs/view/100)

## Other

- [ ] [Product Owner · Bolt · Hybrid](https://www.linkedin.com/jobs/view/300)
";
        let doc = DigestDocument::parse(Path::new("d.md"), text).unwrap();
        let candidates = candidates_from_digest(&doc, date("2026-10-18"));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].organization, "Acme");
        assert_eq!(candidates[0].job_identity.as_deref(), Some("100"));

        // syncing the same digest twice doesn't duplicate
        let mut tracker = Tracker::new(Vec::new(), 3);
        tracker.record(candidates[0].clone());
        let again = candidates_from_digest(&doc, date("2026-10-18"));
        assert!(tracker.record(again[0].clone()).merged);
        assert_eq!(tracker.applications().len(), 1);
    }

    #[test]
    fn test_new_application_id_shape() {
        let id = new_application_id();
        assert!(id.starts_with("app-"));
        assert_eq!(id.len(), 12);
    }
}
