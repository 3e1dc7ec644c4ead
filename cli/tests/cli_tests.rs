use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const PAGE_URL: &str = "https://example.com/app";

const SAMPLE_PAGE: &str = r#"
<html><body>
  <form class="search-form">
    <input id="search">
  </form>
  <p class="hint">results appear here</p>
</body></html>
"#;

struct Workspace {
    dir: TempDir,
    page: PathBuf,
    store: PathBuf,
}

fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("page.html");
    let store = dir.path().join("store.json");
    fs::write(&page, SAMPLE_PAGE).unwrap();
    Workspace { dir, page, store }
}

fn tag_search_field(ws: &Workspace) -> String {
    let output = cargo_bin_cmd!("vulntag")
        .args(&[
            "tag",
            ws.page.to_str().unwrap(),
            "--url",
            PAGE_URL,
            "--element",
            "#search",
            "--bug-type",
            "Reflected XSS",
            "--severity",
            "High",
            "--store",
            ws.store.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("[+] Saved finding "))
        .expect("tag output carries the finding id")
        .trim()
        .to_string()
}

/// Tagging an element stores the finding and renders exactly one marker.
#[test]
fn test_tag_renders_one_marker() {
    let ws = workspace();
    cargo_bin_cmd!("vulntag")
        .args(&[
            "tag",
            ws.page.to_str().unwrap(),
            "--url",
            PAGE_URL,
            "--element",
            "#search",
            "--bug-type",
            "Reflected XSS",
            "--store",
            ws.store.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vulnerability tagged and saved."))
        .stdout(predicate::str::contains("Element:  #search"))
        .stdout(predicate::str::contains("[*] 1 marker(s) rendered."));
}

/// The list view renders one card per finding with its badges.
#[test]
fn test_list_shows_tagged_finding() {
    let ws = workspace();
    tag_search_field(&ws);

    cargo_bin_cmd!("vulntag")
        .args(&["list", "--url", PAGE_URL, "--store", ws.store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reflected XSS"))
        .stdout(predicate::str::contains("#search"))
        .stdout(predicate::str::contains("High | Open"));
}

/// An untouched page lists the empty state.
#[test]
fn test_list_empty_state() {
    let ws = workspace();
    cargo_bin_cmd!("vulntag")
        .args(&["list", "--url", PAGE_URL, "--store", ws.store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No vulnerabilities tagged on this page yet.",
        ));
}

/// Disabling highlights leaves the data intact but renders zero markers.
#[test]
fn test_enable_off_renders_no_markers() {
    let ws = workspace();
    tag_search_field(&ws);

    cargo_bin_cmd!("vulntag")
        .args(&["enable", "off", "--url", PAGE_URL, "--store", ws.store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Highlights off"));

    cargo_bin_cmd!("vulntag")
        .args(&[
            "show",
            ws.page.to_str().unwrap(),
            "--url",
            PAGE_URL,
            "--store",
            ws.store.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Highlights disabled"))
        .stdout(predicate::str::contains("[*] 0 marker(s) rendered."));

    // The finding itself survived the toggle.
    cargo_bin_cmd!("vulntag")
        .args(&["list", "--url", PAGE_URL, "--store", ws.store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reflected XSS"));
}

/// Editing rewrites fields in place; deleting removes the card.
#[test]
fn test_edit_then_delete_finding() {
    let ws = workspace();
    let id = tag_search_field(&ws);

    cargo_bin_cmd!("vulntag")
        .args(&[
            "edit",
            &id,
            "--url",
            PAGE_URL,
            "--status",
            "Fixed",
            "--severity",
            "Medium",
            "--store",
            ws.store.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated."));

    cargo_bin_cmd!("vulntag")
        .args(&["list", "--url", PAGE_URL, "--store", ws.store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Medium | Fixed"));

    cargo_bin_cmd!("vulntag")
        .args(&["delete", &id, "--url", PAGE_URL, "--store", ws.store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted."));

    cargo_bin_cmd!("vulntag")
        .args(&["list", "--url", PAGE_URL, "--store", ws.store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No vulnerabilities tagged on this page yet.",
        ));
}

/// Jumping to a selector that no longer matches is a reported no-op.
#[test]
fn test_jump_to_missing_selector_is_noop() {
    let ws = workspace();
    cargo_bin_cmd!("vulntag")
        .args(&[
            "jump",
            ws.page.to_str().unwrap(),
            "--url",
            PAGE_URL,
            "#missing",
            "--store",
            ws.store.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("No element matches '#missing'"));
}

/// Jumping by finding id resolves through the stored selector.
#[test]
fn test_jump_by_finding_id() {
    let ws = workspace();
    let id = tag_search_field(&ws);

    cargo_bin_cmd!("vulntag")
        .args(&[
            "jump",
            ws.page.to_str().unwrap(),
            "--url",
            PAGE_URL,
            &id,
            "--store",
            ws.store.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scrolled to #search"));
}

/// An invalid severity is rejected at the boundary, before anything is stored.
#[test]
fn test_invalid_severity_is_rejected() {
    let ws = workspace();
    cargo_bin_cmd!("vulntag")
        .args(&[
            "tag",
            ws.page.to_str().unwrap(),
            "--url",
            PAGE_URL,
            "--element",
            "#search",
            "--severity",
            "Catastrophic",
            "--store",
            ws.store.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid severity"));

    cargo_bin_cmd!("vulntag")
        .args(&["list", "--url", PAGE_URL, "--store", ws.store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No vulnerabilities tagged on this page yet.",
        ));
}

/// Without a created or joined project, `project show` reports none.
#[test]
fn test_project_show_without_identity() {
    let ws = workspace();
    let _keep = &ws.dir;
    cargo_bin_cmd!("vulntag")
        .args(&["project", "show", "--store", ws.store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No project selected"));
}
