use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::classify::{self, Scope};
use crate::config::Config;
use crate::models::{FieldSources, JobPosting, RawJobRecord, WorkArrangement};

/// Source-specific patterns that pull a stable posting id out of a URL.
/// The first capture group is the id; the prefix namespaces it.
const ID_PATTERNS: &[(&str, &str)] = &[
    ("", r"linkedin\.com/(?:comm/)?jobs/view/(?:[^/?#]*-)?(\d+)(?:[/?#]|$)"),
    ("", r"linkedin\.com/.*[?&]currentJobId=(\d+)"),
    ("indeed:", r"indeed\.[a-z.]+/.*[?&]jk=([0-9a-fA-F]+)"),
    ("greenhouse:", r"greenhouse\.io/.*/jobs/(\d+)"),
    ("lever:", r"jobs\.lever\.co/[^/]+/([0-9a-fA-F-]{36})"),
    ("djinni:", r"djinni\.co/jobs/(\d+)"),
];

static ID_REGEXES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ID_PATTERNS
        .iter()
        .filter_map(|(prefix, pattern)| Regex::new(pattern).ok().map(|re| (*prefix, re)))
        .collect()
});

/// Gap between title and company in alert-card text.
static CARD_GAP: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s{2,}").ok());

/// Phrases some sources glue onto titles.
const TITLE_BADGES: &[&str] = &[
    "(verified)",
    "with verification",
    "verified job",
    "(promoted)",
    "✓",
];

/// Canonical key for a posting URL: a source id when one is embedded,
/// otherwise the URL without query, fragment and trailing slashes.
pub fn extract_identity(url: &str) -> Option<String> {
    let url = url.trim();
    for (prefix, re) in ID_REGEXES.iter() {
        if let Some(caps) = re.captures(url) {
            return Some(format!("{}{}", prefix, caps[1].to_lowercase()));
        }
    }
    normalize_url(url)
}

pub fn normalize_url(url: &str) -> Option<String> {
    let url = url.trim();
    let (scheme, rest) = url.split_once("://")?;
    let scheme = scheme.to_lowercase();
    if scheme != "http" && scheme != "https" {
        return None;
    }

    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let rest = rest[..end].trim_end_matches('/');
    let (host, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    if host.is_empty() {
        return None;
    }
    Some(format!("{}://{}{}", scheme, host.to_lowercase(), path))
}

/// Alert-email card text: "Title<2+ spaces>Company · Location".
pub fn split_card_text(text: &str) -> Option<(String, String, String)> {
    let text = text.trim();
    let middot_idx = text.find('·')?;
    let before_middot = text[..middot_idx].trim();
    let location = text[middot_idx + '·'.len_utf8()..].trim().to_string();

    let re = CARD_GAP.as_ref()?;
    let space_match = re.find_iter(before_middot).last()?;
    let title = before_middot[..space_match.start()].trim().to_string();
    let company = before_middot[space_match.end()..].trim().to_string();

    if title.is_empty() || company.is_empty() {
        return None;
    }
    Some((title, company, location))
}

/// Strip badges, collapse whitespace, collapse "X X" repeats, cap length.
pub fn normalize_title(raw: &str, max_len: usize) -> String {
    let mut title = raw.to_string();
    for badge in TITLE_BADGES {
        title = replace_ignore_case(&title, badge, " ");
    }

    let words: Vec<&str> = title.split_whitespace().collect();
    let words = collapse_repeated(&words);
    let title = words.join(" ");

    if title.chars().count() > max_len {
        let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept.trim_end())
    } else {
        title
    }
}

fn collapse_repeated<'a>(words: &'a [&'a str]) -> &'a [&'a str] {
    let n = words.len();
    if n >= 2 && n % 2 == 0 {
        let (first, second) = words.split_at(n / 2);
        if first
            .iter()
            .zip(second)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
        {
            return first;
        }
    }
    words
}

fn replace_ignore_case(haystack: &str, needle: &str, with: &str) -> String {
    let lower_needle = needle.to_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    loop {
        // Lowercasing can change byte lengths; only match when it doesn't
        let lower_rest = rest.to_lowercase();
        match lower_rest.find(&lower_needle) {
            Some(idx) if lower_rest.len() == rest.len() && rest.is_char_boundary(idx) => {
                out.push_str(&rest[..idx]);
                out.push_str(with);
                rest = &rest[idx + needle.len()..];
            }
            _ => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Outcome of comparing one field across two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    Keep,
    Take,
}

/// Upgrade-only choice for a free-text field. Placeholders never win, a longer
/// value beats a shorter one, and equal-length conflicts go to the more
/// trusted source (lower rank). Ties keep the existing value.
pub fn pick_text(
    existing: Option<&str>,
    existing_rank: usize,
    incoming: Option<&str>,
    incoming_rank: usize,
) -> Pick {
    let incoming = match incoming {
        Some(v) if !classify::is_placeholder(v) => v.trim(),
        _ => return Pick::Keep,
    };
    let existing = match existing {
        Some(v) if !classify::is_placeholder(v) => v.trim(),
        _ => return Pick::Take,
    };

    if existing.eq_ignore_ascii_case(incoming) {
        return Pick::Keep;
    }
    let (existing_len, incoming_len) = (existing.chars().count(), incoming.chars().count());
    if incoming_len > existing_len {
        Pick::Take
    } else if incoming_len < existing_len {
        Pick::Keep
    } else if incoming_rank < existing_rank {
        Pick::Take
    } else {
        Pick::Keep
    }
}

pub fn pick_arrangement(
    existing: WorkArrangement,
    existing_rank: usize,
    incoming: WorkArrangement,
    incoming_rank: usize,
) -> Pick {
    if incoming == WorkArrangement::Unknown || incoming == existing {
        Pick::Keep
    } else if existing == WorkArrangement::Unknown || incoming_rank < existing_rank {
        Pick::Take
    } else {
        Pick::Keep
    }
}

/// The caller-owned set of postings seen during one run, in discovery order.
#[derive(Debug, Default)]
pub struct KnownJobs {
    order: Vec<String>,
    by_identity: HashMap<String, JobPosting>,
}

impl KnownJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &str) -> Option<&JobPosting> {
        self.by_identity.get(identity)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobPosting> {
        self.order.iter().filter_map(|id| self.by_identity.get(id))
    }

    fn insert(&mut self, posting: JobPosting) {
        self.order.push(posting.identity.clone());
        self.by_identity.insert(posting.identity.clone(), posting);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    MissingUrl,
    UnparseableUrl(String),
    SearchLink,
    Excluded(String),
    OutOfScope(String),
}

impl DropReason {
    pub fn kind(&self) -> &'static str {
        match self {
            DropReason::MissingUrl => "missing url",
            DropReason::UnparseableUrl(_) => "unparseable url",
            DropReason::SearchLink => "search link",
            DropReason::Excluded(_) => "already resolved",
            DropReason::OutOfScope(_) => "out of scope",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub identity: String,
    pub posting: JobPosting,
    pub is_new: bool,
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Admitted(Resolved),
    Dropped(DropReason),
}

/// Resolve one raw record against the run's known postings.
///
/// Records are dropped (never an error) when they have no usable URL, point at
/// a search page, are in `exclusions`, or are classified out of scope. Admitted
/// records are either inserted or merged field by field into the known posting.
pub fn resolve(
    raw: &RawJobRecord,
    known: &mut KnownJobs,
    exclusions: &HashSet<String>,
    config: &Config,
) -> Resolution {
    let url = match raw.url.as_deref().map(str::trim) {
        Some(u) if !u.is_empty() => u,
        _ => return Resolution::Dropped(DropReason::MissingUrl),
    };
    if classify::is_search_link(url) {
        return Resolution::Dropped(DropReason::SearchLink);
    }
    let Some(identity) = extract_identity(url) else {
        return Resolution::Dropped(DropReason::UnparseableUrl(url.to_string()));
    };
    if exclusions.contains(&identity) {
        return Resolution::Dropped(DropReason::Excluded(identity));
    }

    let incoming = build_posting(raw, identity.clone(), url, config);
    if !classify::is_placeholder(&incoming.title)
        && classify::classify_role(&incoming.title, &config.role_filter) == Scope::OutOfScope
    {
        return Resolution::Dropped(DropReason::OutOfScope(incoming.title));
    }

    if let Some(existing) = known.by_identity.get_mut(&identity) {
        merge_posting(existing, incoming, config);
        debug!(identity = %identity, title = %existing.title, "merged known posting");
        return Resolution::Admitted(Resolved {
            identity,
            posting: existing.clone(),
            is_new: false,
        });
    }

    debug!(identity = %identity, title = %incoming.title, source = %incoming.source_tag, "new posting");
    known.insert(incoming.clone());
    Resolution::Admitted(Resolved {
        identity,
        posting: incoming,
        is_new: true,
    })
}

fn build_posting(raw: &RawJobRecord, identity: String, url: &str, config: &Config) -> JobPosting {
    let mut title = raw.title.clone();
    let mut organization = raw.organization.clone().filter(|o| !classify::is_placeholder(o));
    let mut location = raw.location.clone().filter(|l| !classify::is_placeholder(l));

    if organization.is_none() {
        if let Some((t, company, loc)) = split_card_text(&raw.title) {
            title = t;
            organization = Some(company);
            location = location.or(Some(loc));
        }
    }

    let work_arrangement = raw
        .work_arrangement
        .filter(|a| *a != WorkArrangement::Unknown)
        .or_else(|| location.as_deref().map(classify::classify_arrangement))
        .filter(|a| *a != WorkArrangement::Unknown)
        .or_else(|| raw.description_text.as_deref().map(classify::classify_arrangement))
        .unwrap_or_default();

    let source = Some(raw.source_tag.clone());
    JobPosting {
        identity,
        url: normalize_url(url).unwrap_or_else(|| url.to_string()),
        title: normalize_title(&title, config.title_max_len),
        sources: FieldSources {
            title: source.clone(),
            organization: organization.as_ref().and(source.clone()),
            location: location.as_ref().and(source.clone()),
            work_arrangement: (work_arrangement != WorkArrangement::Unknown)
                .then(|| raw.source_tag.clone()),
        },
        organization: organization.map(|o| o.trim().to_string()),
        location: location.map(|l| l.trim().to_string()),
        work_arrangement,
        description_text: raw.description_text.clone().filter(|d| !d.trim().is_empty()),
        source_tag: raw.source_tag.clone(),
        score: raw.score,
        excluded: false,
    }
}

/// Per-field upgrade-only merge of `incoming` into `existing`.
pub fn merge_posting(existing: &mut JobPosting, incoming: JobPosting, config: &Config) {
    let rank = |source: &Option<String>| {
        source
            .as_deref()
            .map_or(usize::MAX, |s| config.source_rank(s))
    };
    let incoming_rank = config.source_rank(&incoming.source_tag);

    if pick_text(
        Some(&existing.title),
        rank(&existing.sources.title),
        Some(&incoming.title),
        incoming_rank,
    ) == Pick::Take
    {
        existing.title = incoming.title;
        existing.sources.title = Some(incoming.source_tag.clone());
    }

    if pick_text(
        existing.organization.as_deref(),
        rank(&existing.sources.organization),
        incoming.organization.as_deref(),
        incoming_rank,
    ) == Pick::Take
    {
        existing.organization = incoming.organization;
        existing.sources.organization = Some(incoming.source_tag.clone());
    }

    if pick_text(
        existing.location.as_deref(),
        rank(&existing.sources.location),
        incoming.location.as_deref(),
        incoming_rank,
    ) == Pick::Take
    {
        existing.location = incoming.location;
        existing.sources.location = Some(incoming.source_tag.clone());
    }

    if pick_arrangement(
        existing.work_arrangement,
        rank(&existing.sources.work_arrangement),
        incoming.work_arrangement,
        incoming_rank,
    ) == Pick::Take
    {
        existing.work_arrangement = incoming.work_arrangement;
        existing.sources.work_arrangement = Some(incoming.source_tag.clone());
    }

    if pick_text(
        existing.description_text.as_deref(),
        usize::MAX,
        incoming.description_text.as_deref(),
        incoming_rank,
    ) == Pick::Take
    {
        existing.description_text = incoming.description_text;
    }

    existing.score = match (existing.score, incoming.score) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, org: Option<&str>, url: &str, source: &str) -> RawJobRecord {
        RawJobRecord {
            title: title.to_string(),
            organization: org.map(str::to_string),
            url: Some(url.to_string()),
            source_tag: source.to_string(),
            ..Default::default()
        }
    }

    fn admitted(resolution: Resolution) -> Resolved {
        match resolution {
            Resolution::Admitted(r) => r,
            Resolution::Dropped(reason) => panic!("unexpected drop: {:?}", reason),
        }
    }

    #[test]
    fn test_id_patterns_all_compile() {
        assert_eq!(ID_REGEXES.len(), ID_PATTERNS.len());
        assert!(CARD_GAP.is_some());
    }

    #[test]
    fn test_extract_identity_source_ids() {
        assert_eq!(
            extract_identity("https://www.linkedin.com/jobs/view/4012345678/?refId=abc"),
            Some("4012345678".to_string())
        );
        assert_eq!(
            extract_identity("https://www.linkedin.com/comm/jobs/view/4012345678"),
            Some("4012345678".to_string())
        );
        assert_eq!(
            extract_identity("https://www.linkedin.com/jobs/view/senior-pm-at-acme-4012345678"),
            Some("4012345678".to_string())
        );
        assert_eq!(
            extract_identity("https://www.linkedin.com/jobs/collections/recommended/?currentJobId=4012345678"),
            Some("4012345678".to_string())
        );
        assert_eq!(
            extract_identity("https://www.indeed.com/viewjob?jk=AB12cd34&from=email"),
            Some("indeed:ab12cd34".to_string())
        );
        assert_eq!(
            extract_identity("https://boards.greenhouse.io/acme/jobs/7654321?gh_src=x"),
            Some("greenhouse:7654321".to_string())
        );
    }

    #[test]
    fn test_extract_identity_falls_back_to_normalized_url() {
        assert_eq!(
            extract_identity("https://Careers.Example.com/posting/pm-lead/?utm_source=feed#apply"),
            Some("https://careers.example.com/posting/pm-lead".to_string())
        );
        assert_eq!(extract_identity("not a url"), None);
        assert_eq!(extract_identity("mailto:jobs@example.com"), None);
        assert_eq!(extract_identity("https://"), None);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Senior PM (verified) Senior PM (verified)", 120), "Senior PM");
        assert_eq!(normalize_title("  Head   of\tProduct  ", 120), "Head of Product");
        assert_eq!(normalize_title("Product Lead with verification", 120), "Product Lead");
        assert_eq!(normalize_title("Go Go", 120), "Go");
        assert_eq!(normalize_title("Product Owner, Payments", 120), "Product Owner, Payments");
        assert_eq!(normalize_title("Principal Product Manager", 12), "Principal...");
    }

    #[test]
    fn test_split_card_text() {
        let parsed = split_card_text("Senior Product Manager             Acme · Lisbon, Portugal (Hybrid)");
        assert_eq!(
            parsed,
            Some((
                "Senior Product Manager".to_string(),
                "Acme".to_string(),
                "Lisbon, Portugal (Hybrid)".to_string()
            ))
        );
        assert_eq!(split_card_text("Senior Product Manager at Acme"), None);
        assert_eq!(split_card_text("Senior Product Manager Acme · Lisbon"), None);
    }

    #[test]
    fn test_pick_text_rules() {
        assert_eq!(pick_text(Some("View job"), 0, Some("Product Manager"), 5), Pick::Take);
        assert_eq!(pick_text(Some("Product Manager"), 5, Some("—"), 0), Pick::Keep);
        assert_eq!(pick_text(None, 5, Some("Acme"), 5), Pick::Take);
        assert_eq!(pick_text(Some("Acme"), 5, None, 0), Pick::Keep);
        assert_eq!(pick_text(Some("Acme"), 5, Some("Acme Corp"), 5), Pick::Take);
        assert_eq!(pick_text(Some("Acme Corp"), 5, Some("Acme"), 0), Pick::Keep);
        assert_eq!(pick_text(Some("ACME"), 5, Some("acme"), 0), Pick::Keep);
        // equal length, different value: more trusted source wins
        assert_eq!(pick_text(Some("Acme"), 3, Some("Bolt"), 1), Pick::Take);
        assert_eq!(pick_text(Some("Acme"), 1, Some("Bolt"), 3), Pick::Keep);
        assert_eq!(pick_text(Some("Acme"), 2, Some("Bolt"), 2), Pick::Keep);
    }

    #[test]
    fn test_scenario_repeated_badge_title_then_real_title() {
        let config = Config::default();
        let exclusions = HashSet::new();
        let mut known = KnownJobs::new();

        let first = admitted(resolve(
            &raw(
                "Senior PM (verified) Senior PM (verified)",
                None,
                "https://www.linkedin.com/jobs/view/123?x=1",
                "linkedin-alert",
            ),
            &mut known,
            &exclusions,
            &config,
        ));
        assert!(first.is_new);
        assert_eq!(first.identity, "123");
        assert_eq!(first.posting.title, "Senior PM");

        let second = admitted(resolve(
            &raw(
                "Senior Product Manager",
                Some("Acme"),
                "https://www.linkedin.com/jobs/view/123",
                "feed",
            ),
            &mut known,
            &exclusions,
            &config,
        ));
        assert!(!second.is_new);
        assert_eq!(known.len(), 1);

        let posting = known.get("123").unwrap();
        assert_eq!(posting.title, "Senior Product Manager");
        assert_eq!(posting.organization.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_placeholder_title_upgrade_is_order_independent() {
        let config = Config::default();
        let exclusions = HashSet::new();
        let url = "https://www.linkedin.com/jobs/view/555555";
        let placeholder = raw("View job", None, url, "linkedin-page");
        let real = raw("Group Product Manager", None, url, "scrape");

        let mut ab = KnownJobs::new();
        resolve(&placeholder, &mut ab, &exclusions, &config);
        resolve(&real, &mut ab, &exclusions, &config);
        assert_eq!(ab.get("555555").unwrap().title, "Group Product Manager");

        let mut ba = KnownJobs::new();
        resolve(&real, &mut ba, &exclusions, &config);
        resolve(&placeholder, &mut ba, &exclusions, &config);
        assert_eq!(ba.get("555555").unwrap().title, "Group Product Manager");
    }

    #[test]
    fn test_fields_merge_independently() {
        let config = Config::default();
        let exclusions = HashSet::new();
        let mut known = KnownJobs::new();
        let url = "https://www.linkedin.com/jobs/view/777777";

        let mut a = raw("Director of Product", Some("—"), url, "linkedin-alert");
        a.location = Some("Remote, EU".to_string());
        let b = raw("Job 777777", Some("Acme Gaming"), url, "scrape");

        resolve(&a, &mut known, &exclusions, &config);
        resolve(&b, &mut known, &exclusions, &config);

        let posting = known.get("777777").unwrap();
        assert_eq!(posting.title, "Director of Product");
        assert_eq!(posting.organization.as_deref(), Some("Acme Gaming"));
        assert_eq!(posting.work_arrangement, WorkArrangement::Remote);
        assert_eq!(posting.sources.title.as_deref(), Some("linkedin-alert"));
        assert_eq!(posting.sources.organization.as_deref(), Some("scrape"));
    }

    #[test]
    fn test_equal_length_conflict_uses_source_priority() {
        let config = Config::default();
        let exclusions = HashSet::new();
        let url = "https://www.linkedin.com/jobs/view/888888";

        let mut known = KnownJobs::new();
        resolve(&raw("Product Lead", Some("Acme"), url, "scrape"), &mut known, &exclusions, &config);
        resolve(&raw("Product Lead", Some("Bolt"), url, "linkedin-page"), &mut known, &exclusions, &config);
        assert_eq!(known.get("888888").unwrap().organization.as_deref(), Some("Bolt"));

        let mut known = KnownJobs::new();
        resolve(&raw("Product Lead", Some("Bolt"), url, "linkedin-page"), &mut known, &exclusions, &config);
        resolve(&raw("Product Lead", Some("Acme"), url, "scrape"), &mut known, &exclusions, &config);
        assert_eq!(known.get("888888").unwrap().organization.as_deref(), Some("Bolt"));
    }

    #[test]
    fn test_drops() {
        let mut config = Config::default();
        config.role_filter.exclude = vec!["engineer".to_string()];
        let exclusions: HashSet<String> = ["111111".to_string()].into_iter().collect();
        let mut known = KnownJobs::new();

        let mut no_url = raw("Product Manager", None, "", "feed");
        no_url.url = None;
        assert!(matches!(
            resolve(&no_url, &mut known, &exclusions, &config),
            Resolution::Dropped(DropReason::MissingUrl)
        ));
        assert!(matches!(
            resolve(&raw("Product Manager", None, "garbage", "feed"), &mut known, &exclusions, &config),
            Resolution::Dropped(DropReason::UnparseableUrl(_))
        ));
        assert!(matches!(
            resolve(
                &raw("Product Manager", None, "https://www.linkedin.com/jobs/view/111111", "feed"),
                &mut known,
                &exclusions,
                &config
            ),
            Resolution::Dropped(DropReason::Excluded(_))
        ));
        assert!(matches!(
            resolve(
                &raw("Backend Engineer", None, "https://www.linkedin.com/jobs/view/222222", "feed"),
                &mut known,
                &exclusions,
                &config
            ),
            Resolution::Dropped(DropReason::OutOfScope(_))
        ));
        assert!(matches!(
            resolve(
                &raw("Jobs similar to Senior PM", None, "https://www.linkedin.com/jobs/view/333333", "feed"),
                &mut known,
                &exclusions,
                &config
            ),
            Resolution::Dropped(DropReason::OutOfScope(_))
        ));
        assert!(matches!(
            resolve(
                &raw("Product Manager", None, "https://www.linkedin.com/jobs/search?keywords=pm", "feed"),
                &mut known,
                &exclusions,
                &config
            ),
            Resolution::Dropped(DropReason::SearchLink)
        ));
        assert!(known.is_empty());
    }

    #[test]
    fn test_card_text_split_on_resolve() {
        let config = Config::default();
        let mut known = KnownJobs::new();
        let record = raw(
            "Senior Product Manager             Acme · Lisbon, Portugal (Hybrid)",
            None,
            "https://www.linkedin.com/comm/jobs/view/999999?trackingId=x",
            "linkedin-alert",
        );
        let resolved = admitted(resolve(&record, &mut known, &HashSet::new(), &config));
        assert_eq!(resolved.posting.title, "Senior Product Manager");
        assert_eq!(resolved.posting.organization.as_deref(), Some("Acme"));
        assert_eq!(resolved.posting.work_arrangement, WorkArrangement::Hybrid);
        assert_eq!(resolved.posting.url, "https://www.linkedin.com/comm/jobs/view/999999");
    }

    #[test]
    fn test_known_jobs_keep_discovery_order() {
        let config = Config::default();
        let mut known = KnownJobs::new();
        for id in ["300000", "100000", "200000", "100000"] {
            let url = format!("https://www.linkedin.com/jobs/view/{}", id);
            resolve(&raw("Product Manager", None, &url, "feed"), &mut known, &HashSet::new(), &config);
        }
        let order: Vec<&str> = known.iter().map(|p| p.identity.as_str()).collect();
        assert_eq!(order, vec!["300000", "100000", "200000"]);
    }
}
