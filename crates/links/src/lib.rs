//! Link Extractor (C3): derives entity references from prose and merges
//! them with the entities a turn actually touched.

use std::collections::HashSet;

use async_trait::async_trait;
use ca_domain::{Link, LinkKind};
use regex::Regex;

/// Compound-word tokens that match the bare-username shape (`word_word`) but
/// are not employee IDs — skill names, pagination fields, and the like.
const NON_EMPLOYEE_PATTERNS: &[&str] = &[
    "cv_engineering",
    "edge_ai",
    "machine_learning",
    "deep_learning",
    "data_engineering",
    "cloud_architecture",
    "backend_development",
    "frontend_development",
    "mobile_development",
    "devops_engineering",
    "security_engineering",
    "project_management",
    "technical_writing",
    "time_slice",
    "work_category",
    "deal_phase",
    "account_manager",
    "employee_id",
    "project_id",
    "customer_id",
    "next_offset",
];

fn prefixed_id_regex() -> Regex {
    Regex::new(r"\b((?:proj|emp|cust)_[a-z0-9_]+)\b").expect("static regex is valid")
}

fn bare_username_regex() -> Regex {
    Regex::new(r"\b([a-zA-Z0-9]+(?:_[a-zA-Z0-9]+)+)\b").expect("static regex is valid")
}

/// Extract entity links from free-form response prose.
pub fn extract_from_message(message: &str) -> Vec<Link> {
    let mut links = Vec::new();

    for cap in prefixed_id_regex().captures_iter(message) {
        let found = &cap[1];
        if let Some(prefix) = found.split('_').next() {
            if let Some(kind) = LinkKind::from_prefix(prefix) {
                links.push(Link::new(found, kind));
            }
        }
    }

    for cap in bare_username_regex().captures_iter(message) {
        let token = &cap[1];
        let has_entity_prefix = token.starts_with("proj_")
            || token.starts_with("emp_")
            || token.starts_with("cust_");

        if !has_entity_prefix && !NON_EMPLOYEE_PATTERNS.contains(&token) {
            links.push(Link::employee(token));
        }
        if let Some(suffix) = token.strip_prefix("emp_") {
            links.push(Link::employee(suffix));
        }
    }

    links
}

/// Normalize a raw JSON array of links (agent-supplied, possibly strings or
/// objects with varied key casing) into typed `Link`s. Entries whose kind
/// or id can't be resolved are dropped rather than propagated as errors —
/// the caller already has a best-effort response to work with.
pub fn normalize_links(raw: &[serde_json::Value]) -> Vec<Link> {
    raw.iter().filter_map(normalize_one).collect()
}

fn normalize_one(value: &serde_json::Value) -> Option<Link> {
    if let Some(s) = value.as_str() {
        let prefix = s.split('_').next().unwrap_or("");
        let kind = LinkKind::from_prefix(prefix)?;
        return Some(Link::new(s, kind));
    }

    let obj = value.as_object()?;
    let kind_str = obj
        .get("kind")
        .or_else(|| obj.get("Kind"))
        .or_else(|| obj.get("type"))
        .or_else(|| obj.get("Type"))
        .and_then(|v| v.as_str())?;
    let id = obj
        .get("id")
        .or_else(|| obj.get("ID"))
        .or_else(|| obj.get("value"))
        .or_else(|| obj.get("Value"))
        .and_then(|v| v.as_str())?;
    let kind = parse_kind(kind_str)?;
    Some(Link::new(id, kind))
}

fn parse_kind(s: &str) -> Option<LinkKind> {
    match s {
        "employee" => Some(LinkKind::Employee),
        "project" => Some(LinkKind::Project),
        "customer" => Some(LinkKind::Customer),
        "wiki" => Some(LinkKind::Wiki),
        "location" => Some(LinkKind::Location),
        _ => None,
    }
}

/// Append entities touched by mutations, plus the current user, skipping
/// any already present.
pub fn add_mutation_entities(
    links: &[Link],
    mutation_entities: &[Link],
    current_user: Option<&str>,
) -> Vec<Link> {
    let mut result = links.to_vec();
    for entity in mutation_entities {
        if !link_exists(&result, entity) {
            result.push(entity.clone());
        }
    }
    if let Some(user) = current_user {
        let user_link = Link::employee(user);
        if !link_exists(&result, &user_link) {
            result.push(user_link);
        }
    }
    result
}

/// Append entities touched by read-only searches, skipping any already
/// present.
pub fn add_search_entities(links: &[Link], search_entities: &[Link]) -> Vec<Link> {
    let mut result = links.to_vec();
    for entity in search_entities {
        if !link_exists(&result, entity) {
            result.push(entity.clone());
        }
    }
    result
}

/// Remove duplicates, preserving first-seen order.
pub fn deduplicate(links: &[Link]) -> Vec<Link> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(links.len());
    for link in links {
        if seen.insert((link.kind, link.id.clone())) {
            unique.push(link.clone());
        }
    }
    unique
}

fn link_exists(links: &[Link], candidate: &Link) -> bool {
    links.iter().any(|l| l == candidate)
}

/// Minimal back-office lookup the validator needs — kept separate from the
/// full back-office client trait so this crate doesn't depend on it.
#[async_trait]
pub trait EmployeeLookup: Send + Sync {
    async fn employee_exists(&self, id: &str) -> bool;
}

/// Drop employee links the back-office explicitly reports as not found.
/// Non-employee links, and employee links that error for any other
/// reason, pass through unchanged — an outage shouldn't silently erase a
/// true reference.
pub async fn validate_employee_links(links: Vec<Link>, lookup: &dyn EmployeeLookup) -> Vec<Link> {
    let mut validated = Vec::with_capacity(links.len());
    for link in links {
        if link.kind == LinkKind::Employee {
            if lookup.employee_exists(&link.id).await {
                validated.push(link);
            }
        } else {
            validated.push(link);
        }
    }
    validated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_prefixed_ids() {
        let links = extract_from_message("see proj_atlas and cust_acme for details");
        assert!(links.contains(&Link::project("proj_atlas")));
        assert!(links.contains(&Link::customer("cust_acme")));
    }

    #[test]
    fn bare_username_becomes_employee_link() {
        let links = extract_from_message("assigned to jonas_weiss this week");
        assert!(links.contains(&Link::employee("jonas_weiss")));
    }

    #[test]
    fn denylisted_compound_words_are_not_employees() {
        let links = extract_from_message("sorted by time_slice and work_category");
        assert!(!links.iter().any(|l| l.id == "time_slice"));
        assert!(!links.iter().any(|l| l.id == "work_category"));
    }

    #[test]
    fn emp_prefixed_token_yields_two_links() {
        let links = extract_from_message("owner emp_jonas_weiss approved it");
        assert!(links.contains(&Link::employee("emp_jonas_weiss")));
        assert!(links.contains(&Link::employee("jonas_weiss")));
    }

    #[test]
    fn normalize_accepts_strings_and_mixed_casing_objects() {
        let raw = serde_json::json!(["proj_atlas", {"Kind": "employee", "ID": "jonas_weiss"}]);
        let links = normalize_links(raw.as_array().unwrap());
        assert_eq!(links.len(), 2);
        assert!(links.contains(&Link::project("proj_atlas")));
        assert!(links.contains(&Link::employee("jonas_weiss")));
    }

    #[test]
    fn deduplicate_preserves_first_seen_order() {
        let links = vec![
            Link::employee("a"),
            Link::project("p"),
            Link::employee("a"),
        ];
        let unique = deduplicate(&links);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].id, "a");
    }

    struct AlwaysFound;
    struct AlwaysMissing;

    #[async_trait]
    impl EmployeeLookup for AlwaysFound {
        async fn employee_exists(&self, _id: &str) -> bool {
            true
        }
    }

    #[async_trait]
    impl EmployeeLookup for AlwaysMissing {
        async fn employee_exists(&self, _id: &str) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn validate_drops_only_confirmed_missing_employees() {
        let links = vec![Link::employee("ghost"), Link::project("proj_atlas")];
        let kept = validate_employee_links(links.clone(), &AlwaysMissing).await;
        assert_eq!(kept, vec![Link::project("proj_atlas")]);

        let kept = validate_employee_links(links, &AlwaysFound).await;
        assert_eq!(kept.len(), 2);
    }
}
