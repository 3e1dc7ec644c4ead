//! Resolution side of the selector engine: a parser and matcher for the
//! bounded grammar the engine emits.
//!
//! Supported: `#id`, `.class`, `tag`, `tag.class`, `tag[name="value"]`,
//! compounds of those, and chains joined with the child combinator `>`.
//! Anything outside the grammar simply fails to match; resolution never
//! errors.

use crate::dom::{Element, NodeId, Page};

/// One compound in a selector chain.
#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    /// `[attr="value"]` pair; only `name` is matchable.
    attr: Option<(String, String)>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn parse_compound(part: &str) -> Option<Compound> {
    let part = part.trim();
    if part.is_empty() {
        return None;
    }

    let mut compound = Compound::default();
    let mut chars = part.chars().peekable();

    if chars.peek().is_some_and(|c| is_ident_char(*c)) {
        compound.tag = Some(take_ident(&mut chars).to_ascii_lowercase());
    }

    while let Some(&c) = chars.peek() {
        match c {
            '#' => {
                chars.next();
                let id = take_ident(&mut chars);
                if id.is_empty() {
                    return None;
                }
                compound.id = Some(id);
            }
            '.' => {
                chars.next();
                let class = take_ident(&mut chars);
                if class.is_empty() {
                    return None;
                }
                compound.classes.push(class);
            }
            '[' => {
                chars.next();
                let key = take_ident(&mut chars);
                if key.is_empty() || chars.next() != Some('=') || chars.next() != Some('"') {
                    return None;
                }
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => value.push(c),
                        None => return None,
                    }
                }
                if chars.next() != Some(']') {
                    return None;
                }
                compound.attr = Some((key, value));
            }
            _ => return None,
        }
    }

    Some(compound)
}

/// Parses a full chain; `None` when any segment falls outside the grammar.
fn parse_chain(selector: &str) -> Option<Vec<Compound>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }
    selector.split('>').map(parse_compound).collect()
}

fn compound_matches(el: &Element, compound: &Compound) -> bool {
    if let Some(tag) = &compound.tag {
        if &el.tag != tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if el.id_attr.as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    for class in &compound.classes {
        if !el.has_class(class) {
            return false;
        }
    }
    if let Some((key, value)) = &compound.attr {
        if key != "name" || el.name_attr.as_deref() != Some(value.as_str()) {
            return false;
        }
    }
    true
}

/// Whether `node` matches the chain, walking direct parents right-to-left.
fn chain_matches(page: &Page, node: NodeId, chain: &[Compound]) -> bool {
    let (last, ancestors) = match chain.split_last() {
        Some(split) => split,
        None => return false,
    };
    if !compound_matches(page.element(node), last) {
        return false;
    }
    let mut current = page.element(node).parent;
    for compound in ancestors.iter().rev() {
        match current {
            Some(parent) if compound_matches(page.element(parent), compound) => {
                current = page.element(parent).parent;
            }
            _ => return false,
        }
    }
    true
}

/// First document-order match, or `None`.
pub fn query(page: &Page, selector: &str) -> Option<NodeId> {
    let chain = parse_chain(selector)?;
    page.document_order()
        .into_iter()
        .find(|&id| chain_matches(page, id, &chain))
}

/// Every document-order match.
pub fn query_all(page: &Page, selector: &str) -> Vec<NodeId> {
    match parse_chain(selector) {
        Some(chain) => page
            .document_order()
            .into_iter()
            .filter(|&id| chain_matches(page, id, &chain))
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> Page {
        Page::parse(
            r#"
            <html><body>
              <div class="card featured">
                <input name="email">
                <p class="hint">one</p>
              </div>
              <div class="card">
                <p class="hint">two</p>
              </div>
            </body></html>
            "#,
            "https://example.com/",
        )
    }

    #[test]
    fn test_id_and_class_queries() {
        let page = Page::parse(
            r#"<html><body><em id="x" class="a b">t</em></body></html>"#,
            "https://example.com/",
        );
        let em = page.query_selector("#x").unwrap();
        assert_eq!(page.query_selector("em.a.b"), Some(em));
        assert_eq!(page.query_selector(".b"), Some(em));
        assert_eq!(page.query_selector("strong"), None);
    }

    #[test]
    fn test_name_attribute_query() {
        let page = sample_page();
        let input = page.query_selector("input[name=\"email\"]").unwrap();
        assert_eq!(page.element(input).tag, "input");
        assert!(page.query_selector("input[name=\"missing\"]").is_none());
        // Non-name attributes are outside the grammar's matchable set.
        assert!(page.query_selector("input[type=\"text\"]").is_none());
    }

    #[test]
    fn test_child_chain_is_strict() {
        let page = sample_page();
        let hit = page.query_selector("div.featured > p.hint").unwrap();
        assert_eq!(page.element(hit).text, "one");
        // body is not the direct parent of p.hint
        assert!(page.query_selector("body > p.hint").is_none());
    }

    #[test]
    fn test_first_match_is_document_order() {
        let page = sample_page();
        let first = page.query_selector("p.hint").unwrap();
        assert_eq!(page.element(first).text, "one");
        assert_eq!(page.query_selector_all("p.hint").len(), 2);
        assert_eq!(page.query_selector_all("div.card").len(), 2);
    }

    #[test]
    fn test_malformed_selectors_never_error() {
        let page = sample_page();
        assert!(page.query_selector("").is_none());
        assert!(page.query_selector("   ").is_none());
        assert!(page.query_selector("#").is_none());
        assert!(page.query_selector("div >").is_none());
        assert!(page.query_selector("div[name=email]").is_none());
        assert!(page.query_selector("p:hover").is_none());
        assert!(page.query_selector_all("p:hover").is_empty());
    }
}
