//! One-time startup wiring: a short wiki table-of-contents string handed
//! to every task's initial message, and the timestamp stamping this run's
//! log directories.

use ca_backoffice::BackOffice;

/// A short, human-readable summary of the available wiki pages for the
/// initial turn message. Falls back to a plain notice if the back-office
/// can't be reached at startup — a task will simply have to `wiki_list`
/// for itself in that case.
pub async fn summarize_wiki(backoffice: &dyn BackOffice) -> String {
    match backoffice.wiki_list().await {
        Ok(pages) if pages.is_empty() => "No wiki pages are available.".to_string(),
        Ok(pages) => {
            let files: Vec<&str> = pages.iter().map(|p| p.file.as_str()).collect();
            format!("Available wiki pages: {}.", files.join(", "))
        }
        Err(e) => {
            tracing::warn!(error = %e, "wiki_list failed at startup");
            "Wiki listing unavailable; call wiki_list if you need it.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_backoffice::MockBackOffice;
    use ca_domain::Identity;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn summarizes_known_wiki_pages() {
        let api = MockBackOffice::new(Identity::public(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), "h".into()));
        let summary = summarize_wiki(&api).await;
        assert!(summary.starts_with("Available wiki pages:") || summary.contains("No wiki pages"));
    }
}
