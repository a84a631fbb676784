//! Staff directory entries and assignee matching.
//!
//! Only used to decorate assignees for display; nothing here feeds money
//! math.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub job_title: String,
}

fn fold(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '.' || c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the directory entry for an assignee given as a name or an email.
///
/// Matches the full name case-insensitively first, then the email local
/// part with `.`/`_`/`-` read as spaces ("jane.doe@x.com" ~ "Jane Doe").
pub fn find_staff<'a>(directory: &'a [StaffMember], query: &str) -> Option<&'a StaffMember> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    let wanted = fold(query);
    if let Some(hit) = directory.iter().find(|m| fold(&m.name) == wanted) {
        return Some(hit);
    }
    let local = query.split_once('@').map(|(l, _)| l)?;
    let wanted = fold(local);
    directory.iter().find(|m| fold(&m.name) == wanted)
}
