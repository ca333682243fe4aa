//! Fuzzy search across every entry of a workspace.

use crate::codec::EntryRecord;
use crate::workspace::Workspace;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;

pub const DEFAULT_LIMIT: usize = 10;

/// A matched entry with the path of the group holding it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub entry: EntryRecord,
    /// Group titles joined with `" / "`.
    pub path: String,
    pub score: i64,
}

/// Match `query` against each entry's title, username and group path.
///
/// Hits are ordered by descending score, ties keeping tree order. A blank
/// query matches nothing.
pub fn search_entries(workspace: &Workspace, query: &str, limit: usize) -> Vec<SearchHit> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut hits: Vec<SearchHit> = workspace
        .walk()
        .flat_map(|group| {
            let path = workspace.path_of(group.id()).join(" / ");
            workspace
                .entries_of(group.id())
                .map(move |entry| (entry, group.id(), path.clone()))
        })
        .filter_map(|(entry, group, path)| {
            let search_text = format!(
                "{} {} {}",
                entry.title(),
                entry.property("username").unwrap_or_default(),
                path
            );
            matcher.fuzzy_match(&search_text, query).map(|score| {
                let mut record = EntryRecord::from(entry);
                record.parent_id = Some(group.to_string());
                SearchHit {
                    entry: record,
                    path,
                    score,
                }
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        let mut ws = Workspace::default();
        let finance = ws.create_group(None, "Finance").unwrap();
        let bank = ws.create_entry(finance, "Bank").unwrap();
        ws.entry_mut(bank).unwrap().set_property("username", "alice");
        ws.create_entry(finance, "Brokerage").unwrap();
        let mail = ws.create_group(None, "Mail").unwrap();
        ws.create_entry(mail, "Webmail").unwrap();
        ws
    }

    #[test]
    fn blank_query_returns_nothing() {
        assert!(search_entries(&workspace(), "   ", DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn finds_by_title_and_reports_path() {
        let hits = search_entries(&workspace(), "webmail", DEFAULT_LIMIT);
        assert_eq!(hits[0].entry.properties["title"], "Webmail");
        assert_eq!(hits[0].path, "Mail");
        assert!(hits[0].entry.parent_id.is_some());
    }

    #[test]
    fn finds_by_username() {
        let hits = search_entries(&workspace(), "alice", DEFAULT_LIMIT);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.properties["title"], "Bank");
    }

    #[test]
    fn respects_limit() {
        let hits = search_entries(&workspace(), "finance", 1);
        assert_eq!(hits.len(), 1);
    }
}
