pub mod locate;

use crate::dom::{NodeId, Page};

/// Ancestor levels (node inclusive) a structural path may span.
const MAX_PATH_DEPTH: usize = 5;

/// Derives a string locator for an element, in priority order:
///
/// 1. `#<id>` when the element carries an id attribute.
/// 2. `<tag>[name="<name>"]` when it carries a name attribute.
/// 3. A bounded structural path of child combinators, root-most first, each
///    level `<tag>` plus at most the first class token.
///
/// Deterministic on identical markup but best-effort only: pages with
/// repeated structure can alias, and later markup changes can orphan the
/// selector. Callers skip a failed re-resolution silently.
pub fn compute_selector(page: &Page, node: NodeId) -> String {
    let el = page.element(node);
    if let Some(id) = &el.id_attr {
        return format!("#{}", id);
    }
    if let Some(name) = &el.name_attr {
        return format!("{}[name=\"{}\"]", el.tag, name);
    }

    let mut path = Vec::new();
    let mut current = Some(node);
    while let Some(id) = current {
        if path.len() >= MAX_PATH_DEPTH {
            break;
        }
        let el = page.element(id);
        let mut step = el.tag.clone();
        if let Some(class) = el.first_class() {
            step.push('.');
            step.push_str(class);
        }
        path.push(step);
        current = el.parent;
    }
    path.reverse();
    path.join(" > ")
}
