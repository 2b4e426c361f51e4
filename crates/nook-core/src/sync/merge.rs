//! Folding remote tasks into the local list.

use std::collections::{HashMap, HashSet};

use super::todoist::{RemoteSection, RemoteTask};
use crate::state::Task;

/// Section names that double as categories.
pub const SECTION_CATEGORIES: [&str; 4] = ["Work", "Study", "Creative", "Reading"];

const DEFAULT_CATEGORY: &str = "General";

fn is_word(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Find the first whitespace-delimited `/word` token.
///
/// Returns the word and the content with the token (plus one adjacent
/// whitespace character on each side) collapsed to a single space, trimmed.
pub fn extract_category(content: &str) -> Option<(String, String)> {
    let mut token_start = None;
    let mut iter = content.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if c.is_whitespace() {
            token_start = None;
            continue;
        }
        let start = *token_start.get_or_insert(i);
        let at_end = iter.peek().map_or(true, |(_, next)| next.is_whitespace());
        if !at_end {
            continue;
        }

        let token = &content[start..i + c.len_utf8()];
        let Some(word) = token.strip_prefix('/').filter(|w| is_word(w)) else {
            continue;
        };

        let before = content[..start]
            .chars()
            .next_back()
            .map_or(start, |ws| start - ws.len_utf8());
        let token_end = start + token.len();
        let after = content[token_end..]
            .chars()
            .next()
            .map_or(token_end, |ws| token_end + ws.len_utf8());

        let stripped = format!("{} {}", &content[..before], &content[after..]);
        return Some((word.to_string(), stripped.trim().to_string()));
    }
    None
}

/// Convert a remote task, deriving its category from a `/word` token or
/// an allow-listed section name.
pub fn remote_to_task(remote: RemoteTask, sections: &HashMap<String, String>) -> Task {
    let (category, text) = match extract_category(&remote.content) {
        Some((category, text)) => (category, text),
        None => {
            let section = remote
                .section_id
                .as_ref()
                .and_then(|id| sections.get(id))
                .filter(|name| SECTION_CATEGORIES.contains(&name.as_str()));
            let category = section.map_or_else(|| DEFAULT_CATEGORY.to_string(), Clone::clone);
            (category, remote.content)
        }
    };

    let mut task = Task::new(remote.id, text);
    task.priority = remote.priority;
    task.category = category;
    task.completed = remote.is_completed;
    task.due_date = remote.due.map(|d| d.date);
    task.created_at = remote.created_at;
    task
}

/// Section id to name.
pub fn section_names(sections: &[RemoteSection]) -> HashMap<String, String> {
    sections
        .iter()
        .map(|s| (s.id.clone(), s.name.clone()))
        .collect()
}

/// Merge a fresh remote list over the local one.
///
/// Matching ids keep their local pomodoro counts, created timestamp and
/// (when the remote has none) category; completion is sticky. Local tasks
/// missing remotely survive only when completed or still syncing.
pub fn merge_remote(local: &[Task], remote: Vec<Task>) -> Vec<Task> {
    let by_id: HashMap<&str, &Task> = local.iter().map(|t| (t.id.as_str(), t)).collect();
    let remote_ids: HashSet<String> = remote.iter().map(|t| t.id.clone()).collect();

    let mut merged: Vec<Task> = remote
        .into_iter()
        .map(|incoming| match by_id.get(incoming.id.as_str()) {
            Some(existing) => {
                let category = if incoming.category != DEFAULT_CATEGORY {
                    incoming.category
                } else {
                    existing.category.clone()
                };
                Task {
                    category,
                    completed: existing.completed || incoming.completed,
                    estimated_pomos: existing.estimated_pomos.max(1),
                    completed_pomos: existing.completed_pomos,
                    created_at: existing.created_at.clone().or(incoming.created_at),
                    archived_at: existing.archived_at,
                    ..incoming
                }
            }
            None => incoming,
        })
        .collect();

    merged.extend(
        local
            .iter()
            .filter(|t| !remote_ids.contains(&t.id) && (t.completed || t.is_syncing))
            .cloned(),
    );
    merged
}
