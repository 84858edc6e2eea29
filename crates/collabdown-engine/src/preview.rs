use pulldown_cmark::{Options, Parser, html};

/// Turns document text into something displayable
pub trait Renderer {
    fn render(&self, text: &str) -> String;
}

/// Live HTML preview of a markdown document
#[derive(Debug, Clone)]
pub struct MarkdownPreview {
    options: Options,
}

impl Default for MarkdownPreview {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_FOOTNOTES,
        }
    }
}

impl MarkdownPreview {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for MarkdownPreview {
    fn render(&self, text: &str) -> String {
        let parser = Parser::new_ext(text, self.options);
        let mut rendered = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut rendered, parser);
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_renders_heading_and_emphasis() {
        let html = MarkdownPreview::new().render("# Three Laws\n\nA robot may not **injure**");

        assert_eq!(
            html,
            "<h1>Three Laws</h1>\n<p>A robot may not <strong>injure</strong></p>\n"
        );
    }

    #[test]
    fn test_renders_reference_links() {
        let html = MarkdownPreview::new()
            .render("See the [First Law][1].\n\n[1]: http://example.com/first\n");

        assert!(html.contains(r#"<a href="http://example.com/first">First Law</a>"#));
    }

    #[test]
    fn test_strikethrough_is_enabled() {
        let html = MarkdownPreview::new().render("~~gone~~");

        assert!(html.contains("<del>gone</del>"));
    }
}
