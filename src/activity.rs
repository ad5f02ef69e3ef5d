//! Audit trail of what `save` did to each object

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::json_ld::Document;
use crate::model::KgObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Create,
    Update,
    Replacement,
    NoOp,
    CreateError,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::Create => "create",
            EntryKind::Update => "update",
            EntryKind::Replacement => "replacement",
            EntryKind::NoOp => "no-op",
            EntryKind::CreateError => "create-error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub kind: EntryKind,
    #[serde(rename = "type")]
    pub type_name: &'static str,
    pub id: Option<String>,
    pub space: Option<String>,
    /// What was sent, or what the store returned for a create
    pub delta: Option<Document>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivityLog {
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    pub fn new() -> ActivityLog {
        ActivityLog::default()
    }

    pub fn record(
        &mut self,
        object: &KgObject,
        kind: EntryKind,
        delta: Option<Document>,
        space: Option<&str>,
    ) {
        self.entries.push(ActivityEntry {
            kind,
            type_name: object.node_type().name,
            id: object.id().map(str::to_string),
            space: space.map(str::to_string),
            delta,
        });
    }

    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn of_kind(&self, kind: EntryKind) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use crate::model::KgObject;
    use crate::model::testing::LICENSE;

    use super::{ActivityLog, EntryKind};

    #[test]
    fn entries_serialize_with_kebab_kinds() -> Result<()> {
        let license = KgObject::new(&LICENSE).with_id("https://kg.example/l1");
        let mut log = ActivityLog::new();
        log.record(&license, EntryKind::NoOp, None, Some("controlled"));
        log.record(&license, EntryKind::CreateError, None, None);
        assert_eq!(log.of_kind(EntryKind::NoOp).count(), 1);

        let rendered: serde_json::Value = serde_json::from_str(&log.to_json()?)?;
        assert_eq!(
            rendered[0],
            json!({
                "kind": "no-op",
                "type": "test.License",
                "id": "https://kg.example/l1",
                "space": "controlled",
                "delta": null
            })
        );
        assert_eq!(rendered[1]["kind"], json!("create-error"));
        Ok(())
    }
}
