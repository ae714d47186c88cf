use crate::config::RoleFilter;
use crate::models::WorkArrangement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    InScope,
    OutOfScope,
}

/// Values sources emit when they don't actually know the field.
const PLACEHOLDERS: &[&str] = &[
    "",
    "—",
    "–",
    "-",
    "view job",
    "job",
    "unknown",
    "unknown role",
    "unknown company",
    "n/a",
];

pub fn is_placeholder(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    if PLACEHOLDERS.contains(&lower.as_str()) {
        return true;
    }
    // Scrapers fall back to "Job 4012345678" when no title is found
    match lower.strip_prefix("job ") {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Links inside alert emails and listing pages that are not job postings.
pub fn is_navigation_artifact(text: &str) -> bool {
    let text_lower = text.trim().to_lowercase();

    let artifacts = [
        "search for jobs",
        "see all jobs",
        "view all",
        "search other jobs",
        "jobs",
    ];
    if artifacts.contains(&text_lower.as_str()) {
        return true;
    }

    if text_lower.starts_with("jobs similar to")
        || text_lower.starts_with("jobs in ")
        || text_lower.starts_with("manage job")
        || text_lower.contains("unsubscribe")
        || text_lower.contains("privacy")
    {
        return true;
    }

    // "Engineering Manager jobs" links to a search page
    text_lower.ends_with(" jobs")
}

pub fn is_search_link(url: &str) -> bool {
    url.contains("/jobs/search") || url.contains("/search?") || url.contains("/jobs/alerts")
}

/// Decide whether a title belongs to the target discipline.
pub fn classify_role(title: &str, filter: &RoleFilter) -> Scope {
    if is_navigation_artifact(title) {
        return Scope::OutOfScope;
    }

    let lower = title.to_lowercase();
    if filter.exclude.iter().any(|term| contains_term(&lower, term)) {
        return Scope::OutOfScope;
    }
    if !filter.include.is_empty() && !filter.include.iter().any(|term| contains_term(&lower, term)) {
        return Scope::OutOfScope;
    }
    Scope::InScope
}

/// Work arrangement from free text (location line, description, badge).
pub fn classify_arrangement(text: &str) -> WorkArrangement {
    let lower = text.to_lowercase();

    if lower.contains("hybrid") {
        return WorkArrangement::Hybrid;
    }
    if ["remote", "work from home", "wfh", "anywhere"]
        .iter()
        .any(|kw| contains_term(&lower, kw))
    {
        return WorkArrangement::Remote;
    }
    if ["on-site", "onsite", "on site", "in office", "in-office", "office-based"]
        .iter()
        .any(|kw| contains_term(&lower, kw))
    {
        return WorkArrangement::OnSite;
    }
    WorkArrangement::Unknown
}

/// Case-insensitive phrase match on word boundaries. `haystack` must already be lowercase.
fn contains_term(haystack: &str, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(&term) {
        let begin = start + pos;
        let end = begin + term.len();
        let before_ok = haystack[..begin]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = begin + term.chars().next().map_or(1, char::len_utf8);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_filter() -> RoleFilter {
        RoleFilter {
            include: vec!["product".into(), "pm".into()],
            exclude: vec!["engineer".into(), "developer".into()],
        }
    }

    #[test]
    fn test_placeholders() {
        assert!(is_placeholder("—"));
        assert!(is_placeholder("  View job "));
        assert!(is_placeholder("Unknown Role"));
        assert!(is_placeholder("Job 4012345678"));
        assert!(is_placeholder(""));
        assert!(!is_placeholder("Job Coach"));
        assert!(!is_placeholder("Senior PM"));
    }

    #[test]
    fn test_navigation_artifacts() {
        assert!(is_navigation_artifact("Jobs similar to Head of Product at Gypsy Collective"));
        assert!(is_navigation_artifact("Jobs in Lisbon"));
        assert!(is_navigation_artifact("Product Manager jobs"));
        assert!(is_navigation_artifact("Manage job alerts"));
        assert!(is_navigation_artifact("SEARCH FOR JOBS"));
        assert!(!is_navigation_artifact("Senior PM"));
        assert!(!is_navigation_artifact("Jobs Program Manager"));
    }

    #[test]
    fn test_search_links() {
        assert!(is_search_link("https://www.linkedin.com/comm/jobs/search?keywords=pm"));
        assert!(is_search_link("https://www.linkedin.com/comm/jobs/alerts"));
        assert!(!is_search_link("https://www.linkedin.com/jobs/view/123"));
    }

    #[test]
    fn test_classify_role_product_discipline() {
        let filter = product_filter();
        assert_eq!(classify_role("Senior Product Manager", &filter), Scope::InScope);
        assert_eq!(classify_role("Senior PM", &filter), Scope::InScope);
        assert_eq!(classify_role("Staff Software Engineer", &filter), Scope::OutOfScope);
        assert_eq!(classify_role("Product Engineer", &filter), Scope::OutOfScope);
        assert_eq!(classify_role("Office Manager", &filter), Scope::OutOfScope);
        assert_eq!(
            classify_role("Jobs similar to Senior Product Manager", &filter),
            Scope::OutOfScope
        );
    }

    #[test]
    fn test_classify_role_word_boundaries() {
        let filter = product_filter();
        // "pm" inside "npm" is not a match
        assert_eq!(classify_role("npm Registry Steward", &filter), Scope::OutOfScope);
        // "engineering" is not "engineer"
        assert_eq!(
            classify_role("Product Manager, Engineering Tools", &filter),
            Scope::InScope
        );
    }

    #[test]
    fn test_empty_filter_admits_everything_but_artifacts() {
        let filter = RoleFilter::default();
        assert_eq!(classify_role("Barista", &filter), Scope::InScope);
        assert_eq!(classify_role("View all", &filter), Scope::OutOfScope);
    }

    #[test]
    fn test_classify_arrangement() {
        assert_eq!(classify_arrangement("Lisbon, Portugal (Hybrid)"), WorkArrangement::Hybrid);
        assert_eq!(classify_arrangement("United States (Remote)"), WorkArrangement::Remote);
        assert_eq!(classify_arrangement("Work from home, EU timezones"), WorkArrangement::Remote);
        assert_eq!(classify_arrangement("On-site in Berlin"), WorkArrangement::OnSite);
        assert_eq!(classify_arrangement("Office-based role"), WorkArrangement::OnSite);
        assert_eq!(classify_arrangement("Kyiv, Ukraine"), WorkArrangement::Unknown);
        assert_eq!(classify_arrangement("Remotely interesting"), WorkArrangement::Unknown);
    }
}
