//! Typed commands between the panel and the page-side synchronizer.
//!
//! The wire tags match the extension-era message strings, so a serialized
//! command is exactly the JSON the content script used to receive. Delivery
//! is fire-and-forget: no acknowledgement payloads exist.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "START_SELECTION")]
    StartSelection,
    #[serde(rename = "REFRESH_VULNS")]
    Refresh,
    #[serde(rename = "SET_ENABLED")]
    SetEnabled { enabled: bool },
    #[serde(rename = "GO_TO_VULN")]
    GoTo { selector: String },
}

pub type CommandSender = UnboundedSender<Command>;
pub type CommandReceiver = UnboundedReceiver<Command>;

/// Channel carrying panel commands to whoever owns the page.
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tags_match_extension_messages() {
        let json = serde_json::to_value(Command::SetEnabled { enabled: true }).unwrap();
        assert_eq!(json["type"], "SET_ENABLED");
        assert_eq!(json["enabled"], true);

        let cmd: Command =
            serde_json::from_str(r##"{"type":"GO_TO_VULN","selector":"#search"}"##).unwrap();
        assert_eq!(
            cmd,
            Command::GoTo {
                selector: "#search".to_string()
            }
        );

        let cmd: Command = serde_json::from_str(r#"{"type":"START_SELECTION"}"#).unwrap();
        assert_eq!(cmd, Command::StartSelection);
    }

    #[test]
    fn test_channel_is_fire_and_forget() {
        let (tx, mut rx) = command_channel();
        tx.send(Command::Refresh).unwrap();
        tx.send(Command::StartSelection).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Command::Refresh);
        assert_eq!(rx.try_recv().unwrap(), Command::StartSelection);
        assert!(rx.try_recv().is_err());
    }
}
