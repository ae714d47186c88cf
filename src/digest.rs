use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::classify;
use crate::error::DigestError;
use crate::identity::{self, Pick};
use crate::models::{JobPosting, ResultFields, WorkArrangement};

const BEST_HEADING: &str = "## Best match";
const OTHER_HEADING: &str = "## Other";
const LABEL_SEPARATOR: &str = " · ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    BestMatch,
    Other,
}

impl Section {
    pub fn for_score(score: Option<f64>, threshold: f64) -> Self {
        match score {
            Some(s) if s >= threshold => Section::BestMatch,
            _ => Section::Other,
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            Section::BestMatch => BEST_HEADING,
            Section::Other => OTHER_HEADING,
        }
    }
}

/// Completion marker in the checkbox of a digest line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Pending,
    Applied,
    Rejected,
}

impl Marker {
    fn symbol(&self) -> char {
        match self {
            Marker::Pending => ' ',
            Marker::Applied => 'x',
            Marker::Rejected => '-',
        }
    }

    fn from_symbol(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Marker::Pending),
            'x' | 'X' => Some(Marker::Applied),
            '-' => Some(Marker::Rejected),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Marker::Applied | Marker::Rejected)
    }
}

/// One job line: `- [x] [Title · Organization · Remote](https://...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub marker: Marker,
    pub title: String,
    pub organization: Option<String>,
    pub work_arrangement: WorkArrangement,
    pub url: String,
    pub identity: String,
    trailing: String,
    raw: String,
}

impl Entry {
    fn from_posting(posting: &JobPosting) -> Self {
        let mut entry = Entry {
            marker: Marker::Pending,
            title: posting.title.clone(),
            organization: posting.organization.clone(),
            work_arrangement: posting.work_arrangement,
            url: posting.url.clone(),
            identity: posting.identity.clone(),
            trailing: String::new(),
            raw: String::new(),
        };
        entry.raw = entry.render();
        entry
    }

    /// Parse a single line. Lines that don't follow the grammar, or whose URL
    /// yields no identity, are not entries.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix("- [")?;
        let mut chars = rest.chars();
        let marker = Marker::from_symbol(chars.next()?)?;
        let rest = chars.as_str().strip_prefix("] [")?;

        let split = rest.find("](")?;
        let label = &rest[..split];
        let after = &rest[split + 2..];
        let close = after.find(')')?;
        let url = &after[..close];
        if url.is_empty() || url.contains(char::is_whitespace) {
            return None;
        }
        let identity = identity::extract_identity(url)?;
        let (title, organization, work_arrangement) = parse_label(label);

        Some(Entry {
            marker,
            title,
            organization,
            work_arrangement,
            url: url.to_string(),
            identity,
            trailing: after[close + 1..].to_string(),
            raw: line.to_string(),
        })
    }

    pub fn label(&self) -> String {
        [
            sanitize(&self.title),
            sanitize(self.organization.as_deref().unwrap_or("—")),
            self.work_arrangement.label().to_string(),
        ]
        .join(LABEL_SEPARATOR)
    }

    fn render(&self) -> String {
        format!(
            "- [{}] [{}]({}){}",
            self.marker.symbol(),
            self.label(),
            self.url,
            self.trailing
        )
    }
}

fn sanitize(field: &str) -> String {
    field
        .replace('[', "(")
        .replace(']', ")")
        .replace('·', "-")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

fn parse_label(label: &str) -> (String, Option<String>, WorkArrangement) {
    let parts: Vec<&str> = label.split(LABEL_SEPARATOR).map(str::trim).collect();
    let (title, organization, arrangement) = match parts.len() {
        0 | 1 => (label.trim().to_string(), None, None),
        2 => (parts[0].to_string(), Some(parts[1]), None),
        n => (parts[..n - 2].join(LABEL_SEPARATOR), Some(parts[n - 2]), Some(parts[n - 1])),
    };
    let organization = organization
        .filter(|o| !classify::is_placeholder(o))
        .map(str::to_string);
    let arrangement = arrangement.map_or(WorkArrangement::Unknown, WorkArrangement::from_label);
    (title, organization, arrangement)
}

fn header_line(best: usize, other: usize) -> String {
    format!("**Best match:** {} · **Other:** {}", best, other)
}

fn parse_header(line: &str) -> Option<(usize, usize)> {
    let rest = line.trim_end().strip_prefix("**Best match:** ")?;
    let (best, other) = rest.split_once(" · **Other:** ")?;
    Some((best.parse().ok()?, other.parse().ok()?))
}

#[derive(Debug, Clone)]
enum Line {
    Text(String),
    Entry(Entry),
}

impl Line {
    fn as_str(&self) -> &str {
        match self {
            Line::Text(text) => text,
            Line::Entry(entry) => &entry.raw,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Line::Text(t) if t.trim().is_empty())
    }

    /// Indented note lines belong to the entry above them.
    fn is_continuation(&self) -> bool {
        matches!(self, Line::Text(t) if t.starts_with("  ") && !t.trim().is_empty())
    }
}

/// A job the reconciler should place into a section.
#[derive(Debug, Clone)]
pub struct RankedJob {
    pub posting: JobPosting,
    pub section: Section,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
    pub excluded: usize,
}

/// A digest file held as lines; untouched lines render back byte for byte.
#[derive(Debug, Clone)]
pub struct DigestDocument {
    path: PathBuf,
    lines: Vec<Line>,
    trailing_newline: bool,
}

impl DigestDocument {
    pub fn skeleton(path: &Path, digest_id: &str) -> Self {
        let text = format!(
            "# Job digest {}\n\n{}\n\n{}\n\n{}\n",
            digest_id,
            header_line(0, 0),
            BEST_HEADING,
            OTHER_HEADING
        );
        let lines = text.lines().map(|l| Line::Text(l.to_string())).collect();
        Self {
            path: path.to_path_buf(),
            lines,
            trailing_newline: true,
        }
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self, DigestError> {
        let lines: Vec<Line> = text
            .lines()
            .map(|line| match Entry::parse(line) {
                Some(entry) => Line::Entry(entry),
                None => Line::Text(line.to_string()),
            })
            .collect();

        let doc = Self {
            path: path.to_path_buf(),
            lines,
            trailing_newline: text.ends_with('\n'),
        };
        doc.header_index().ok_or_else(|| DigestError::MissingHeader {
            path: path.to_path_buf(),
        })?;
        for section in [Section::BestMatch, Section::Other] {
            doc.heading_index(section)
                .ok_or_else(|| DigestError::MissingSection {
                    path: path.to_path_buf(),
                    section: &section.heading()[3..],
                })?;
        }
        Ok(doc)
    }

    pub fn load(path: &Path) -> Result<Self, DigestError> {
        let text = fs::read_to_string(path).map_err(|source| DigestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    pub fn load_or_create(path: &Path, digest_id: &str) -> Result<Self, DigestError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::skeleton(path, digest_id))
        }
    }

    /// Write through a temp file and rename, so a killed run never leaves a
    /// half-written digest.
    pub fn save(&self) -> Result<(), DigestError> {
        let io_err = |source| DigestError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("md.tmp");
        fs::write(&tmp, self.render()).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn render(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(Line::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    fn header_index(&self) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| matches!(l, Line::Text(t) if parse_header(t).is_some()))
    }

    fn heading_index(&self, section: Section) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| matches!(l, Line::Text(t) if t.trim_end() == section.heading()))
    }

    /// Section of every line, by the nearest `## ` heading above it.
    fn sections(&self) -> Vec<Option<Section>> {
        let mut current = None;
        self.lines
            .iter()
            .map(|line| {
                if let Line::Text(t) = line {
                    let t = t.trim_end();
                    if t.starts_with("## ") {
                        current = match t {
                            BEST_HEADING => Some(Section::BestMatch),
                            OTHER_HEADING => Some(Section::Other),
                            _ => None,
                        };
                    }
                }
                current
            })
            .collect()
    }

    /// Entries in document order with their section.
    pub fn entries(&self) -> Vec<(Option<Section>, &Entry)> {
        self.sections()
            .into_iter()
            .zip(&self.lines)
            .filter_map(|(section, line)| match line {
                Line::Entry(entry) => Some((section, entry)),
                Line::Text(_) => None,
            })
            .collect()
    }

    pub fn entry(&self, identity: &str) -> Option<&Entry> {
        self.entry_index(identity).and_then(|idx| match &self.lines[idx] {
            Line::Entry(entry) => Some(entry),
            Line::Text(_) => None,
        })
    }

    fn entry_index(&self, identity: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| matches!(l, Line::Entry(e) if e.identity == identity))
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entry_index(identity).is_some()
    }

    /// Count of entries per section, as found in the body.
    pub fn body_counts(&self) -> (usize, usize) {
        self.entries()
            .into_iter()
            .fold((0, 0), |(best, other), (section, _)| match section {
                Some(Section::BestMatch) => (best + 1, other),
                Some(Section::Other) => (best, other + 1),
                None => (best, other),
            })
    }

    /// Counts as written in the header line.
    pub fn header_counts(&self) -> Option<(usize, usize)> {
        self.header_index()
            .and_then(|idx| parse_header(self.lines[idx].as_str()))
    }

    fn refresh_counts(&mut self) {
        let (best, other) = self.body_counts();
        if let Some(idx) = self.header_index() {
            if self.header_counts() != Some((best, other)) {
                self.lines[idx] = Line::Text(header_line(best, other));
            }
        }
    }

    /// Append a new pending entry at the end of its section.
    pub fn insert(&mut self, posting: &JobPosting, section: Section) {
        let sections = self.sections();
        let last_entry = (0..self.lines.len())
            .rev()
            .find(|&i| sections[i] == Some(section) && matches!(self.lines[i], Line::Entry(_)));

        let entry = Line::Entry(Entry::from_posting(posting));
        match last_entry {
            Some(idx) => {
                let mut pos = idx + 1;
                while pos < self.lines.len() && self.lines[pos].is_continuation() {
                    pos += 1;
                }
                self.lines.insert(pos, entry);
            }
            None => {
                let Some(heading) = self.heading_index(section) else {
                    return;
                };
                let mut pos = heading + 1;
                if pos < self.lines.len() && self.lines[pos].is_blank() {
                    pos += 1;
                } else {
                    self.lines.insert(pos, Line::Text(String::new()));
                    pos += 1;
                }
                self.lines.insert(pos, entry);
                if pos + 1 < self.lines.len() && !self.lines[pos + 1].is_blank() {
                    self.lines.insert(pos + 1, Line::Text(String::new()));
                }
            }
        }
        self.refresh_counts();
    }

    /// Delete an entry, its indented notes and the blank line it leaves doubled.
    pub fn remove(&mut self, identity: &str) -> Option<Entry> {
        let idx = self.entry_index(identity)?;
        let mut end = idx + 1;
        while end < self.lines.len() && self.lines[end].is_continuation() {
            end += 1;
        }
        let removed = self.lines.drain(idx..end).next();

        if idx < self.lines.len()
            && self.lines[idx].is_blank()
            && (idx == 0 || self.lines[idx - 1].is_blank())
        {
            self.lines.remove(idx);
        } else if idx == self.lines.len() && idx > 0 && self.lines[idx - 1].is_blank() {
            // removed the last line of the file after a blank separator
            self.lines.remove(idx - 1);
        }
        self.refresh_counts();

        match removed {
            Some(Line::Entry(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Apply enrichment results to an entry in place. Marker, URL, trailing
    /// text and position are preserved; the line is only re-rendered when a
    /// field actually changes. Returns whether it changed.
    pub fn rewrite(&mut self, identity: &str, fields: &ResultFields) -> bool {
        let Some(idx) = self.entry_index(identity) else {
            return false;
        };
        let Line::Entry(entry) = &mut self.lines[idx] else {
            return false;
        };

        let mut changed = false;
        if identity::pick_text(Some(&entry.title), 0, fields.title.as_deref(), 0) == Pick::Take {
            entry.title = fields.title.clone().unwrap_or_default();
            changed = true;
        }
        if identity::pick_text(entry.organization.as_deref(), 0, fields.organization.as_deref(), 0)
            == Pick::Take
        {
            entry.organization = fields.organization.clone();
            changed = true;
        }
        // The enrichment collaborator reads the posting itself; its answer wins.
        if let Some(arrangement) = fields.work_arrangement {
            if arrangement != WorkArrangement::Unknown && arrangement != entry.work_arrangement {
                entry.work_arrangement = arrangement;
                changed = true;
            }
        }

        if changed {
            entry.raw = entry.render();
        }
        changed
    }

    /// Merge freshly resolved jobs. Identities in `exclusions` and postings
    /// marked excluded are never inserted; identities already present are
    /// upgraded in place.
    pub fn reconcile(&mut self, jobs: &[RankedJob], exclusions: &HashSet<String>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for job in jobs {
            let identity = &job.posting.identity;
            if exclusions.contains(identity) {
                debug!(identity = %identity, "skipping job resolved in an earlier digest");
                report.excluded += 1;
                continue;
            }
            if job.posting.excluded {
                debug!(identity = %identity, "skipping job removed by enrichment");
                report.excluded += 1;
                continue;
            }
            if self.contains(identity) {
                let fields = ResultFields {
                    title: Some(job.posting.title.clone()),
                    organization: job.posting.organization.clone(),
                    work_arrangement: None,
                    removal_reason: None,
                };
                if self.rewrite(identity, &fields) {
                    report.updated += 1;
                }
                continue;
            }
            self.insert(&job.posting, job.section);
            report.inserted += 1;
        }
        self.refresh_counts();
        info!(
            digest = %self.path.display(),
            inserted = report.inserted,
            updated = report.updated,
            excluded = report.excluded,
            "reconciled digest"
        );
        report
    }

    /// Entries whose checkbox carries `marker`, in document order.
    pub fn marked(&self, marker: Marker) -> Vec<&Entry> {
        self.entries()
            .into_iter()
            .map(|(_, entry)| entry)
            .filter(|entry| entry.marker == marker)
            .collect()
    }
}

/// Free-function form of [`DigestDocument::reconcile`].
pub fn reconcile(
    mut document: DigestDocument,
    jobs: &[RankedJob],
    exclusions: &HashSet<String>,
) -> (DigestDocument, ReconcileReport) {
    let report = document.reconcile(jobs, exclusions);
    (document, report)
}

/// Identities marked applied or rejected in any digest under `dir`, other
/// than `current`. Files are scanned line by line, so a digest with a broken
/// header still contributes its resolved lines.
pub fn exclusion_set(dir: &Path, current: Option<&Path>) -> Result<HashSet<String>, DigestError> {
    let mut identities = HashSet::new();
    if !dir.exists() {
        return Ok(identities);
    }
    let io_err = |source| DigestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let current_name = current.and_then(Path::file_name);
    for dir_entry in fs::read_dir(dir).map_err(io_err)? {
        let path = dir_entry.map_err(io_err)?.path();
        if path.extension().is_none_or(|ext| ext != "md") {
            continue;
        }
        if current_name.is_some() && path.file_name() == current_name {
            continue;
        }
        let text = fs::read_to_string(&path).map_err(|source| DigestError::Io {
            path: path.clone(),
            source,
        })?;
        identities.extend(
            text.lines()
                .filter_map(Entry::parse)
                .filter(|entry| entry.marker.is_resolved())
                .map(|entry| entry.identity),
        );
    }
    debug!(count = identities.len(), "collected resolved identities");
    Ok(identities)
}
