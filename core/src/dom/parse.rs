//! HTML import built on `scraper`: one walk of the parsed tree fills the
//! mutable element arena.

use scraper::{ElementRef, Html};

use super::{CssPosition, Element, NodeId, Page};

pub(super) fn parse_document(html: &str, url: &str) -> Page {
    let document = Html::parse_document(html);
    let mut nodes = Vec::new();
    let root = import_element(&mut nodes, None, document.root_element());
    Page::from_arena(url, nodes, root)
}

fn import_element(nodes: &mut Vec<Element>, parent: Option<NodeId>, el: ElementRef<'_>) -> NodeId {
    let value = el.value();
    let mut element = Element {
        id_attr: value.attr("id").map(str::to_string),
        name_attr: value.attr("name").map(str::to_string),
        classes: value
            .attr("class")
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        position: value
            .attr("style")
            .map(CssPosition::from_style)
            .unwrap_or(CssPosition::Static),
        value: value.attr("value").map(str::to_string),
        parent,
        ..Element::new(value.name())
    };

    let id = NodeId(nodes.len());
    nodes.push(element.clone());

    let mut children = Vec::new();
    let mut text = String::new();
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            children.push(import_element(nodes, Some(id), child_el));
        } else if let Some(t) = child.value().as_text() {
            text.push_str(t);
        }
    }

    element.children = children;
    element.text = text.trim().to_string();
    nodes[id.0] = element;
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_reads_attributes_and_text() {
        let page = Page::parse(
            r#"<html><body><a id="home" class="nav primary" style="position: fixed">Home</a></body></html>"#,
            "https://example.com/",
        );
        let link = page.query_selector("#home").unwrap();
        let el = page.element(link);
        assert_eq!(el.tag, "a");
        assert_eq!(el.classes, vec!["nav", "primary"]);
        assert_eq!(el.position, CssPosition::Fixed);
        assert_eq!(el.text, "Home");
    }

    #[test]
    fn test_body_is_overlay_root() {
        let page = Page::parse("<html><body><p>hi</p></body></html>", "https://example.com/");
        assert_eq!(page.element(page.body()).tag, "body");
    }
}
