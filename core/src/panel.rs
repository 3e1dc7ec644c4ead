//! Panel controller: the project-scoped finding list UI.
//!
//! A second, independent reader/writer of the same store. It never touches
//! the page directly; everything page-side goes through the command channel
//! as a fire-and-forget message.

use anyhow::Result;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::command::{Command, CommandSender};
use crate::model::{Finding, Severity, Status};
use crate::store::SyncStore;

/// Full replacement field set for one finding, captured from an edit card.
/// `id` and `created_at` are deliberately absent; edits cannot change them.
#[derive(Debug, Clone)]
pub struct FindingEdits {
    pub vuln_type: String,
    pub severity: Severity,
    pub status: Status,
    pub description: String,
    pub steps: String,
    pub payload: String,
}

impl FindingEdits {
    /// Seeds an edit set from the finding's current values.
    pub fn from_finding(finding: &Finding) -> Self {
        Self {
            vuln_type: finding.vuln_type.clone(),
            severity: finding.severity,
            status: finding.status,
            description: finding.description.clone(),
            steps: finding.steps.clone(),
            payload: finding.payload.clone(),
        }
    }
}

/// Render model for one collapsible card.
#[derive(Debug, Clone)]
pub struct FindingCard {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub status: Status,
    pub reported: String,
    pub selector: String,
    pub description: String,
    pub steps: String,
    pub payload: String,
}

pub struct PanelController {
    page_key: String,
    findings: Vec<Finding>,
    enabled: bool,
    commands: CommandSender,
}

impl PanelController {
    /// Loads the list and enabled flag for a page key and pushes the current
    /// enabled state to the page side, mirroring the panel-open handshake.
    pub fn load(store: &SyncStore, page_key: &str, commands: CommandSender) -> Self {
        let findings = store.findings(page_key).items;
        let enabled = store.enabled(page_key);
        let _ = commands.send(Command::SetEnabled { enabled });
        Self {
            page_key: page_key.to_string(),
            findings,
            enabled,
            commands,
        }
    }

    pub fn page_key(&self) -> &str {
        &self.page_key
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn finding(&self, id: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn cards(&self) -> Vec<FindingCard> {
        self.findings
            .iter()
            .map(|f| FindingCard {
                id: f.id.clone(),
                title: f.vuln_type.clone(),
                severity: f.severity,
                status: f.status,
                reported: format_reported(&f.created_at),
                selector: f.selector.clone(),
                description: f.description.clone(),
                steps: f.steps.clone(),
                payload: f.payload.clone(),
            })
            .collect()
    }

    /// Asks the page side to begin element selection.
    pub fn start_selection(&self) {
        let _ = self.commands.send(Command::StartSelection);
    }

    /// Card-header click: ask the page side to jump to the element.
    /// Returns false when the id is unknown.
    pub fn open_card(&self, id: &str) -> bool {
        match self.finding(id) {
            Some(finding) => {
                let _ = self.commands.send(Command::GoTo {
                    selector: finding.selector.clone(),
                });
                true
            }
            None => false,
        }
    }

    /// Applies an edit in place, rewrites the full list, and asks the page
    /// side to resynchronize. `id` and `created_at` survive untouched.
    /// Returns false when the id is unknown.
    pub fn save_edits(&mut self, store: &mut SyncStore, id: &str, edits: FindingEdits) -> Result<bool> {
        if self.finding(id).is_none() {
            return Ok(false);
        }
        let record = store.update_findings(&self.page_key, |items| {
            if let Some(finding) = items.iter_mut().find(|f| f.id == id) {
                finding.vuln_type = edits.vuln_type.clone();
                finding.severity = edits.severity;
                finding.status = edits.status;
                finding.description = edits.description.clone();
                finding.steps = edits.steps.clone();
                finding.payload = edits.payload.clone();
            }
        })?;
        self.findings = record.items;
        let _ = self.commands.send(Command::Refresh);
        Ok(true)
    }

    /// Removes exactly the entry with `id`; the order of the rest is
    /// preserved. Returns false when the id is unknown.
    pub fn delete(&mut self, store: &mut SyncStore, id: &str) -> Result<bool> {
        if self.finding(id).is_none() {
            return Ok(false);
        }
        let record = store.update_findings(&self.page_key, |items| {
            items.retain(|f| f.id != id);
        })?;
        self.findings = record.items;
        let _ = self.commands.send(Command::Refresh);
        Ok(true)
    }

    /// Persists the rendering flag and notifies the page side. Never touches
    /// the finding list.
    pub fn set_enabled(&mut self, store: &mut SyncStore, enabled: bool) -> Result<()> {
        self.enabled = enabled;
        store.set_enabled(&self.page_key, enabled)?;
        let _ = self.commands.send(Command::SetEnabled { enabled });
        Ok(())
    }
}

/// `YYYY-MM-DD HH:MM` for display; unparseable input comes back verbatim.
fn format_reported(created_at: &str) -> String {
    let Ok(parsed) = OffsetDateTime::parse(created_at, &Rfc3339) else {
        return created_at.to_string();
    };
    parsed
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| created_at.to_string())
}
