//! Highlight synchronizer: keeps the mapping from persisted findings to live
//! page decorations, and owns the transient interaction state (selection
//! mode, hover target, open tooltip, jump flash).
//!
//! The synchronizer never caches the finding list across redraws; every
//! redraw re-reads the store, so the panel and the page side can never drift
//! apart for longer than one refresh.

pub mod decor;

use std::time::{Duration, Instant};

use anyhow::Result;
use log::debug;

use crate::command::Command;
use crate::dom::{NodeId, Page, ScrollIntent};
use crate::model::{Finding, FindingForm};
use crate::selector::compute_selector;
use crate::store::SyncStore;

use decor::{
    icon_class, severity_class, strippable_classes, FLASH_CLASS, HIGHLIGHT_CLASS, HOVER_CLASS,
    ICON_CLASS, REPRODUCE_BUTTON_ID, TOOLTIP_CLASS,
};

/// How long the jump flash stays on an element.
pub const FLASH_DURATION: Duration = Duration::from_millis(1500);

/// One rendered decoration: the marker icon, the element it annotates, and
/// the finding it represents.
#[derive(Debug, Clone)]
pub struct Decoration {
    pub marker: NodeId,
    pub target: NodeId,
    pub finding: Finding,
}

/// The open detail popover. `armed` models the deferred registration of the
/// outside-click close listener: the opening click must not close it.
#[derive(Debug, Clone)]
pub struct Tooltip {
    pub node: NodeId,
    pub reproduce_button: NodeId,
    pub target: NodeId,
    pub finding: Finding,
    pub left: i32,
    pub top: i32,
    armed: bool,
}

#[derive(Debug, Clone)]
struct Flash {
    node: NodeId,
    expires_at: Instant,
}

/// Explicit interaction state owned by the synchronizer instance. Nothing
/// here survives a reattach, so a reload starts from a clean slate.
#[derive(Debug, Default)]
struct SyncState {
    selection_mode: bool,
    highlights_enabled: bool,
    current_hover: Option<NodeId>,
    current_tooltip: Option<Tooltip>,
    flash: Option<Flash>,
    decorated: Vec<Decoration>,
}

/// What an intercepted click amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Not ours; the page handles it.
    Ignored,
    /// Selection mode consumed the click; a record-creation form should open
    /// pre-filled with this selector.
    Selected { selector: String },
    /// A marker was clicked and its detail popover is now open.
    TooltipOpened,
    /// An outside click closed the open popover.
    TooltipClosed,
    /// The Auto Reproduce action ran. `injected` is true when the payload
    /// was actually written into an input/textarea value.
    PayloadReplayed { injected: bool },
}

impl ClickOutcome {
    /// Whether the click was captured before the page's own handlers
    /// (default action suppressed).
    pub fn consumed(&self) -> bool {
        matches!(
            self,
            ClickOutcome::Selected { .. }
                | ClickOutcome::TooltipOpened
                | ClickOutcome::PayloadReplayed { .. }
        )
    }
}

pub struct HighlightSynchronizer {
    page_key: String,
    state: SyncState,
}

impl HighlightSynchronizer {
    /// Page-load pass: read the stored enabled flag (absent means enabled)
    /// and decorate the page when it is on.
    pub fn attach(page: &mut Page, store: &SyncStore) -> Result<Self> {
        let page_key = crate::page_key(&page.url)?;
        let mut sync = Self {
            state: SyncState {
                highlights_enabled: store.enabled(&page_key),
                ..SyncState::default()
            },
            page_key,
        };
        if sync.state.highlights_enabled {
            sync.redraw_all(page, store)?;
        }
        Ok(sync)
    }

    pub fn page_key(&self) -> &str {
        &self.page_key
    }

    pub fn enabled(&self) -> bool {
        self.state.highlights_enabled
    }

    pub fn selection_mode(&self) -> bool {
        self.state.selection_mode
    }

    pub fn current_hover(&self) -> Option<NodeId> {
        self.state.current_hover
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.state.current_tooltip.as_ref()
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.state.decorated
    }

    /// Single dispatch point for panel commands.
    pub fn handle(&mut self, page: &mut Page, store: &SyncStore, command: Command) -> Result<()> {
        match command {
            Command::StartSelection => {
                self.start_selection();
                Ok(())
            }
            Command::Refresh => self.redraw_all(page, store),
            Command::SetEnabled { enabled } => self.set_enabled(page, store, enabled),
            Command::GoTo { selector } => {
                self.jump_to(page, &selector);
                Ok(())
            }
        }
    }

    /// Begins intercepting pointer movement and the next click.
    pub fn start_selection(&mut self) {
        self.state.selection_mode = true;
    }

    /// Unregisters the selection listeners and clears the hover visual.
    pub fn stop_selection(&mut self, page: &mut Page) {
        self.state.selection_mode = false;
        if let Some(hover) = self.state.current_hover.take() {
            page.remove_class(hover, HOVER_CLASS);
        }
    }

    /// Pointer moved over `target`. At most one element carries the hover
    /// class at any time.
    pub fn pointer_moved(&mut self, page: &mut Page, target: NodeId) {
        if !self.state.selection_mode {
            return;
        }
        if let Some(previous) = self.state.current_hover {
            if previous != target {
                page.remove_class(previous, HOVER_CLASS);
            }
        }
        self.state.current_hover = Some(target);
        page.add_class(target, HOVER_CLASS);
    }

    /// A click at `(x, y)` on `target`, seen in the capturing phase.
    pub fn click(&mut self, page: &mut Page, target: NodeId, x: i32, y: i32) -> ClickOutcome {
        if self.state.selection_mode {
            self.stop_selection(page);
            let selector = compute_selector(page, target);
            page.remove_class(target, HOVER_CLASS);
            return ClickOutcome::Selected { selector };
        }

        // Marker click: open the detail popover. Propagation stops here, so
        // the outside-click close below never sees this click.
        if page.element(target).finding_ref.is_some() {
            let decoration = self
                .state
                .decorated
                .iter()
                .find(|d| d.marker == target)
                .cloned();
            if let Some(decoration) = decoration {
                self.show_detail(page, x, y, &decoration.finding, decoration.target);
                return ClickOutcome::TooltipOpened;
            }
            return ClickOutcome::Ignored;
        }

        if let Some(tooltip) = &self.state.current_tooltip {
            if target == tooltip.reproduce_button {
                let injected = self.auto_reproduce(page);
                return ClickOutcome::PayloadReplayed { injected };
            }
            if tooltip.armed && !page.contains(tooltip.node, target) {
                self.close_tooltip(page);
                return ClickOutcome::TooltipClosed;
            }
        }

        ClickOutcome::Ignored
    }

    /// Builds the finding from the submitted form, appends it to the page's
    /// stored list, and redraws when highlighting is on.
    pub fn submit_new_finding(
        &mut self,
        page: &mut Page,
        store: &mut SyncStore,
        form: FindingForm,
        selector: &str,
    ) -> Result<Finding> {
        let finding = Finding::from_form(form, selector, &self.page_key);
        let appended = finding.clone();
        store.update_findings(&self.page_key, move |items| items.push(appended.clone()))?;
        if self.state.highlights_enabled {
            // Reload everything from the store rather than patching in the
            // one new decoration.
            self.redraw_all(page, store)?;
        }
        Ok(finding)
    }

    /// Clears every decoration, then re-reads the stored list and decorates
    /// each finding whose selector still resolves. Orphans are skipped
    /// silently.
    pub fn redraw_all(&mut self, page: &mut Page, store: &SyncStore) -> Result<()> {
        self.clear_all(page);
        if !self.state.highlights_enabled {
            return Ok(());
        }
        for finding in store.findings(&self.page_key).items {
            match page.query_selector(&finding.selector) {
                Some(element) => self.decorate(page, element, finding),
                None => debug!(
                    "finding {} orphaned: no element matches {:?}",
                    finding.id, finding.selector
                ),
            }
        }
        Ok(())
    }

    /// Removes every marker, strips decoration classes, and closes any open
    /// popover. Stored data is untouched.
    pub fn clear_all(&mut self, page: &mut Page) {
        let icon_selector = format!(".{}", ICON_CLASS);
        for marker in page.query_selector_all(&icon_selector) {
            page.detach(marker);
        }
        let highlight_selector = format!(".{}", HIGHLIGHT_CLASS);
        for element in page.query_selector_all(&highlight_selector) {
            for class in strippable_classes() {
                page.remove_class(element, &class);
            }
        }
        self.close_tooltip(page);
        self.state.decorated.clear();
    }

    fn decorate(&mut self, page: &mut Page, element: NodeId, finding: Finding) {
        page.add_class(element, HIGHLIGHT_CLASS);
        page.add_class(element, &severity_class(finding.severity));

        // Drop any stale marker so redraws never stack icons.
        let stale: Vec<NodeId> = page
            .element(element)
            .children
            .iter()
            .copied()
            .filter(|&child| page.has_class(child, ICON_CLASS))
            .collect();
        for marker in stale {
            page.detach(marker);
            self.state.decorated.retain(|d| d.marker != marker);
        }

        let marker = page.append_synthetic(element, "div", "!");
        page.add_class(marker, ICON_CLASS);
        page.add_class(marker, &icon_class(finding.severity));
        page.element_mut(marker).finding_ref = Some(finding.id.clone());

        // The marker anchors to the element, so promote static positioning
        // to relative; never demote an already-anchored scheme.
        if !page.element(element).position.anchors_children() {
            page.element_mut(element).position = crate::dom::CssPosition::Relative;
        }

        self.state.decorated.push(Decoration {
            marker,
            target: element,
            finding,
        });
    }

    /// Opens the detail popover near `(x, y)`. Exactly one popover exists at
    /// a time; the outside-click close arms on the next tick.
    pub fn show_detail(
        &mut self,
        page: &mut Page,
        x: i32,
        y: i32,
        finding: &Finding,
        element: NodeId,
    ) {
        self.close_tooltip(page);

        let node = page.append_synthetic(page.body(), "div", &decor::render_tooltip(finding));
        page.add_class(node, TOOLTIP_CLASS);
        let button = page.append_synthetic(node, "button", "Auto Reproduce");
        page.element_mut(button).id_attr = Some(REPRODUCE_BUTTON_ID.to_string());

        self.state.current_tooltip = Some(Tooltip {
            node,
            reproduce_button: button,
            target: element,
            finding: finding.clone(),
            left: x + 10,
            top: y + 10,
            armed: false,
        });
    }

    fn close_tooltip(&mut self, page: &mut Page) {
        if let Some(tooltip) = self.state.current_tooltip.take() {
            page.detach(tooltip.node);
        }
    }

    /// Writes the stored payload into the tooltip's target element, for
    /// input/textarea elements only. A convenience replay, not an execution
    /// sandbox.
    fn auto_reproduce(&mut self, page: &mut Page) -> bool {
        let Some(tooltip) = &self.state.current_tooltip else {
            return false;
        };
        let target = tooltip.target;
        let payload = tooltip.finding.payload.clone();
        if page.element(target).is_text_entry() {
            page.element_mut(target).value = Some(payload);
            return true;
        }
        false
    }

    /// Scrolls the selector's element into centered view and flashes it.
    /// A selector that no longer resolves is a silent no-op.
    pub fn jump_to(&mut self, page: &mut Page, selector: &str) {
        let Some(element) = page.query_selector(selector) else {
            return;
        };
        page.scroll = Some(ScrollIntent {
            target: element,
            smooth: true,
            centered: true,
        });
        page.add_class(element, FLASH_CLASS);
        self.state.flash = Some(Flash {
            node: element,
            expires_at: Instant::now() + FLASH_DURATION,
        });
    }

    /// Rendering toggle only: turning off clears decorations, turning on
    /// redraws from the store. Stored data is never mutated here.
    pub fn set_enabled(&mut self, page: &mut Page, store: &SyncStore, enabled: bool) -> Result<()> {
        self.state.highlights_enabled = enabled;
        if enabled {
            self.redraw_all(page, store)
        } else {
            self.clear_all(page);
            Ok(())
        }
    }

    /// Deferred-work pass: arms the popover's outside-click close listener
    /// and expires a finished jump flash.
    pub fn tick(&mut self, page: &mut Page, now: Instant) {
        if let Some(tooltip) = &mut self.state.current_tooltip {
            tooltip.armed = true;
        }
        if let Some(flash) = &self.state.flash {
            if now >= flash.expires_at {
                page.remove_class(flash.node, FLASH_CLASS);
                self.state.flash = None;
            }
        }
    }

}
