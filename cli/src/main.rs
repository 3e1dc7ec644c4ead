use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;

use vulntag_core::{
    command_channel, page_key, project, ApiClient, ClickOutcome, CommandReceiver, ConsoleSink,
    FindingEdits, FindingForm, HighlightSynchronizer, Page, PanelController, ProjectIdentity,
    Severity, SinkRef, Status, SyncStore, DEFAULT_API_BASE_URL, DEFAULT_STORE_FILE,
};

#[derive(Parser, Debug)]
#[command(
    name = "vulntag",
    version,
    about = "Element-level vulnerability tagging for security testing",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Tag a search field:        vulntag tag page.html --url https://target.com/app --element \"#search\" --bug-type \"Reflected XSS\"
  Review tagged findings:    vulntag list --url https://target.com/app
  Jump to a finding:         vulntag jump page.html --url https://target.com/app 1754550000000
  Pause highlights:          vulntag enable off --url https://target.com/app
  Create a project:          vulntag project create acme-audit --base-url https://target.com"
)]
struct Args {
    /// Store file shared by every command
    #[arg(long, global = true, default_value = DEFAULT_STORE_FILE)]
    store: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Tag an element on a page snapshot as vulnerable
    Tag {
        /// HTML snapshot of the page
        page: PathBuf,
        /// Address the page was served from (determines the page key)
        #[arg(long)]
        url: String,
        /// Selector hint resolving the element to tag
        #[arg(long)]
        element: String,
        #[arg(long = "bug-type", help = "e.g. \"Reflected XSS on search\"")]
        bug_type: Option<String>,
        #[arg(long, help = "High | Medium | Low (default High)")]
        severity: Option<String>,
        #[arg(long, help = "Open | \"In Progress\" | Fixed (default Open)")]
        status: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        steps: Option<String>,
        #[arg(long)]
        payload: Option<String>,
    },
    /// List the findings tagged on a page
    List {
        #[arg(long)]
        url: String,
    },
    /// Edit a finding's fields in place
    Edit {
        /// Finding id (see `list`)
        id: String,
        #[arg(long)]
        url: String,
        #[arg(long = "bug-type")]
        bug_type: Option<String>,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        steps: Option<String>,
        #[arg(long)]
        payload: Option<String>,
    },
    /// Delete a finding
    Delete {
        id: String,
        #[arg(long)]
        url: String,
    },
    /// Turn decoration rendering on or off for a page
    Enable {
        #[arg(value_parser = clap::builder::PossibleValuesParser::new(["on", "off"]))]
        state: String,
        #[arg(long)]
        url: String,
    },
    /// Render the decorations a page would show
    Show {
        page: PathBuf,
        #[arg(long)]
        url: String,
    },
    /// Scroll a page snapshot to a finding's element
    Jump {
        page: PathBuf,
        #[arg(long)]
        url: String,
        /// Finding id or raw selector
        target: String,
    },
    /// Manage the project identity used to scope findings
    Project {
        #[command(subcommand)]
        action: ProjectCmd,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectCmd {
    /// Create a new project on the backend
    Create {
        name: String,
        #[arg(long, default_value = "")]
        base_url: String,
        #[arg(long, default_value = DEFAULT_API_BASE_URL)]
        api: String,
    },
    /// Join an existing project by key
    Join {
        key: String,
        #[arg(long, default_value = DEFAULT_API_BASE_URL)]
        api: String,
    },
    /// Show the current project identity
    Show,
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    env_logger::init();
    let args = Args::parse();
    let sink = ConsoleSink::new_ref();

    if let Err(e) = run(args, &sink).await {
        sink.on_alert(&e.to_string());
        process::exit(1);
    }
}

async fn run(args: Args, sink: &SinkRef) -> Result<()> {
    let mut store = SyncStore::load(&args.store)?;

    match args.command {
        CliCommand::Tag {
            page,
            url,
            element,
            bug_type,
            severity,
            status,
            description,
            steps,
            payload,
        } => {
            let mut page = load_page(&page, &url)?;
            let mut sync = HighlightSynchronizer::attach(&mut page, &store)?;

            sync.start_selection();
            let Some(target) = page.query_selector(&element) else {
                bail!("no element matches '{}'", element);
            };
            sync.pointer_moved(&mut page, target);
            let outcome = sync.click(&mut page, target, 0, 0);
            let ClickOutcome::Selected { selector } = outcome else {
                bail!("selection click was not consumed");
            };

            let form = FindingForm {
                bug_type,
                severity: parse_severity(severity.as_deref())?,
                status: parse_status(status.as_deref())?,
                description,
                steps,
                payload,
            };
            let finding = sync.submit_new_finding(&mut page, &mut store, form, &selector)?;

            sink.on_finding(&finding);
            sink.on_log("success", &format!("[+] Saved finding {}", finding.id));
            sink.on_log("success", "[+] Vulnerability tagged and saved.");
            print_marker_summary(&page);
        }

        CliCommand::List { url } => {
            let key = page_key(&url)?;
            let (tx, mut rx) = command_channel();
            let panel = PanelController::load(&store, &key, tx);

            print_enabled_state(&panel);
            if panel.is_empty() {
                println!("No vulnerabilities tagged on this page yet.");
            } else {
                for card in panel.cards() {
                    print_card(&card);
                }
            }
            drain_commands(&mut rx);
        }

        CliCommand::Edit {
            id,
            url,
            bug_type,
            severity,
            status,
            description,
            steps,
            payload,
        } => {
            let key = page_key(&url)?;
            let (tx, mut rx) = command_channel();
            let mut panel = PanelController::load(&store, &key, tx);

            let Some(existing) = panel.finding(&id) else {
                bail!("no finding with id {} on {}", id, key);
            };
            let mut edits = FindingEdits::from_finding(existing);
            if let Some(t) = bug_type {
                edits.vuln_type = t;
            }
            if let Some(s) = parse_severity(severity.as_deref())? {
                edits.severity = s;
            }
            if let Some(s) = parse_status(status.as_deref())? {
                edits.status = s;
            }
            if let Some(d) = description {
                edits.description = d;
            }
            if let Some(s) = steps {
                edits.steps = s;
            }
            if let Some(p) = payload {
                edits.payload = p;
            }

            panel.save_edits(&mut store, &id, edits)?;
            sink.on_log("success", &format!("[+] Finding {} updated.", id));
            drain_commands(&mut rx);
        }

        CliCommand::Delete { id, url } => {
            let key = page_key(&url)?;
            let (tx, mut rx) = command_channel();
            let mut panel = PanelController::load(&store, &key, tx);

            if !panel.delete(&mut store, &id)? {
                bail!("no finding with id {} on {}", id, key);
            }
            sink.on_log("success", &format!("[+] Finding {} deleted.", id));
            drain_commands(&mut rx);
        }

        CliCommand::Enable { state, url } => {
            let key = page_key(&url)?;
            let (tx, mut rx) = command_channel();
            let mut panel = PanelController::load(&store, &key, tx);

            let enabled = state == "on";
            panel.set_enabled(&mut store, enabled)?;
            sink.on_log(
                "success",
                &format!(
                    "[+] Highlights {} for {}",
                    if enabled { "on" } else { "off" },
                    key
                ),
            );
            drain_commands(&mut rx);
        }

        CliCommand::Show { page, url } => {
            let mut page = load_page(&page, &url)?;
            let sync = HighlightSynchronizer::attach(&mut page, &store)?;

            let key = sync.page_key().to_string();
            println!(
                "[*] Highlights {} for {}",
                if sync.enabled() { "enabled" } else { "disabled" },
                key
            );
            for finding in store.findings(&key).items {
                match page.query_selector(&finding.selector) {
                    Some(_) => println!(
                        "{} {} -> {} ({})",
                        "[+]".green().bold(),
                        finding.selector.bright_yellow(),
                        finding.vuln_type,
                        finding.severity
                    ),
                    None => println!(
                        "{} {} -> {} (orphaned)",
                        "[-]".dimmed(),
                        finding.selector,
                        finding.vuln_type
                    ),
                }
            }
            print_marker_summary(&page);
        }

        CliCommand::Jump { page, url, target } => {
            let mut page = load_page(&page, &url)?;
            let mut sync = HighlightSynchronizer::attach(&mut page, &store)?;

            let key = sync.page_key().to_string();
            let selector = store
                .findings(&key)
                .items
                .iter()
                .find(|f| f.id == target)
                .map(|f| f.selector.clone())
                .unwrap_or(target);

            sync.jump_to(&mut page, &selector);
            match page.scroll {
                Some(_) => sink.on_log(
                    "success",
                    &format!("[+] Scrolled to {} (flash for 1.5s)", selector),
                ),
                None => sink.on_log("warn", &format!("[*] No element matches '{}'", selector)),
            }
        }

        CliCommand::Project { action } => match action {
            ProjectCmd::Create {
                name,
                base_url,
                api,
            } => {
                let client = ApiClient::new(&api, 10);
                let identity = project::create_project(&client, &mut store, &name, &base_url)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to create project: {}", e))?;
                sink.on_log("success", &format!("[+] Project:  {}", identity.name));
                sink.on_log("success", &format!("[+] Id:       {}", identity.id));
                // Shown in full exactly once so it can be shared.
                sink.on_log("success", &format!("[+] Key:      {}", identity.key));
            }
            ProjectCmd::Join { key, api } => {
                let client = ApiClient::new(&api, 10);
                let identity = project::join_project(&client, &mut store, &key)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to join project: {}", e))?;
                sink.on_log("success", &format!("[+] Joined project {}", identity.name));
            }
            ProjectCmd::Show => match ProjectIdentity::load(&store) {
                Some(identity) => {
                    println!("[+] Project: {}", identity.name);
                    println!("[+] Id:      {}", identity.id);
                    println!("[+] Key:     {}", project::mask_key(&identity.key));
                }
                None => println!("No project selected"),
            },
        },
    }

    Ok(())
}

fn load_page(path: &Path, url: &str) -> Result<Page> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("failed to read page snapshot {}", path.display()))?;
    Ok(Page::parse(&html, url))
}

fn parse_severity(raw: Option<&str>) -> Result<Option<Severity>> {
    raw.map(|s| s.parse::<Severity>().map_err(anyhow::Error::msg))
        .transpose()
}

fn parse_status(raw: Option<&str>) -> Result<Option<Status>> {
    raw.map(|s| s.parse::<Status>().map_err(anyhow::Error::msg))
        .transpose()
}

fn print_enabled_state(panel: &PanelController) {
    println!(
        "[*] Highlights {} for {}",
        if panel.enabled() { "enabled" } else { "disabled" },
        panel.page_key()
    );
}

fn print_card(card: &vulntag_core::FindingCard) {
    let severity = match card.severity {
        Severity::High => card.severity.to_string().red().bold(),
        Severity::Medium => card.severity.to_string().yellow().bold(),
        Severity::Low => card.severity.to_string().blue().bold(),
    };
    println!(
        "\n[{}] {}  ({} | {})",
        card.id.dimmed(),
        card.title.white().bold(),
        severity,
        card.status
    );
    println!("    Reported: {}", card.reported);
    println!("    Selector: {}", card.selector.bright_yellow());
    if !card.description.is_empty() {
        println!("    Description: {}", card.description);
    }
    if !card.steps.is_empty() {
        println!("    Steps: {}", card.steps);
    }
    if !card.payload.is_empty() {
        println!("    Payload: {}", card.payload);
    }
}

fn print_marker_summary(page: &Page) {
    let markers = page.query_selector_all(".vt-vuln-icon").len();
    println!("[*] {} marker(s) rendered.", markers);
}

/// Panel commands are fire-and-forget; with no live page attached they are
/// simply observed and dropped.
fn drain_commands(rx: &mut CommandReceiver) {
    while let Ok(cmd) = rx.try_recv() {
        log::debug!("panel command dispatched: {:?}", cmd);
    }
}
