pub mod command;
pub mod dom;
pub mod http;
pub mod model;
pub mod panel;
pub mod project;
pub mod selector;
pub mod store;
pub mod sync;

use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

pub use crate::command::{command_channel, Command, CommandReceiver, CommandSender};
pub use crate::dom::{NodeId, Page};
pub use crate::http::{ApiClient, DEFAULT_API_BASE_URL};
pub use crate::model::{Finding, FindingForm, Severity, Status};
pub use crate::panel::{FindingCard, FindingEdits, PanelController};
pub use crate::project::ProjectIdentity;
pub use crate::selector::compute_selector;
pub use crate::store::{SyncStore, DEFAULT_STORE_FILE};
pub use crate::sync::{ClickOutcome, HighlightSynchronizer};

/// Storage scope for a page: origin plus path, query and fragment dropped.
pub fn page_key(raw_url: &str) -> Result<String> {
    let url = Url::parse(raw_url).with_context(|| format!("invalid page URL '{}'", raw_url))?;
    Ok(format!("{}{}", url.origin().ascii_serialization(), url.path()))
}

/// Output abstraction for tagging flows.
/// The CLI implements this with colored terminal output; an embedding UI
/// would surface alerts as dialogs.
pub trait TagEventSink: Send + Sync {
    fn on_log(&self, level: &str, message: &str);
    fn on_alert(&self, message: &str);
    fn on_finding(&self, finding: &Finding);
}

pub type SinkRef = Arc<dyn TagEventSink>;

/// Terminal output sink for CLI usage.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new_ref() -> SinkRef {
        Arc::new(Self)
    }
}

impl TagEventSink for ConsoleSink {
    fn on_log(&self, level: &str, message: &str) {
        use colored::*;
        let colored = match level {
            "success" => message.green().to_string(),
            "error" => message.red().to_string(),
            "warn" => message.yellow().to_string(),
            "phase" => message.bright_cyan().bold().to_string(),
            _ => message.to_string(),
        };
        println!("{}", colored);
    }

    fn on_alert(&self, message: &str) {
        use colored::*;
        println!("{}", format!("[!] {}", message).red().bold());
    }

    fn on_finding(&self, finding: &Finding) {
        use colored::*;
        let severity = match finding.severity {
            Severity::High => finding.severity.to_string().red().bold(),
            Severity::Medium => finding.severity.to_string().yellow().bold(),
            Severity::Low => finding.severity.to_string().blue().bold(),
        };
        println!(
            "\n{} {} tagged!",
            "[+]".green().bold(),
            finding.vuln_type.white().bold()
        );
        println!("    Element:  {}", finding.selector.bright_yellow());
        println!("    Severity: {} | Status: {}", severity, finding.status);
        println!("    Page:     {}", finding.url.white());
        println!("{}", "──────────────────────────────────────────".dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_key_strips_query_and_fragment() {
        assert_eq!(
            page_key("https://example.com/app?q=1#top").unwrap(),
            "https://example.com/app"
        );
        assert_eq!(
            page_key("http://127.0.0.1:8000/login").unwrap(),
            "http://127.0.0.1:8000/login"
        );
        assert!(page_key("not a url").is_err());
    }
}
