use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Plain text of an element: inline runs joined, `<br>` and block elements as line breaks.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    let mut builder = TextBuilder::default();
    for child in element.children() {
        visit_node(child, &mut builder);
    }
    builder.finish()
}

/// Plain text of an HTML fragment such as a feed entry body.
pub(crate) fn html_fragment_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    element_text(fragment.root_element())
}

fn visit_node(node: NodeRef<'_, Node>, builder: &mut TextBuilder) {
    match node.value() {
        Node::Text(text) => builder.append_text(text),
        Node::Element(element) => match element.name() {
            "br" => builder.ensure_newline(),
            "script" | "style" | "noscript" | "template" => {}
            "p" | "div" | "blockquote" | "pre" | "li" | "ul" | "ol" | "tr" | "h1" | "h2"
            | "h3" | "h4" | "h5" | "h6" => {
                builder.ensure_newline();
                visit_children(node, builder);
                builder.ensure_newline();
            }
            _ => visit_children(node, builder),
        },
        _ => visit_children(node, builder),
    }
}

fn visit_children(node: NodeRef<'_, Node>, builder: &mut TextBuilder) {
    for child in node.children() {
        visit_node(child, builder);
    }
}

#[derive(Default)]
struct TextBuilder {
    out: String,
    last_char: Option<char>,
}

impl TextBuilder {
    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if matches!(self.last_char, None | Some(' ') | Some('\n')) {
                    continue;
                }
                self.push_char(' ');
            } else {
                self.push_char(ch);
            }
        }
    }

    fn ensure_newline(&mut self) {
        if self.out.is_empty() || self.last_char == Some('\n') {
            return;
        }
        if self.last_char == Some(' ') {
            self.out.pop();
        }
        self.push_char('\n');
    }

    fn push_char(&mut self, ch: char) {
        self.out.push(ch);
        self.last_char = Some(ch);
    }

    fn finish(self) -> String {
        self.out.trim().to_string()
    }
}
