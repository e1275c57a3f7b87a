use ammonia::Builder;
use std::collections::HashSet;

/// Cleans rich post content coming from the dashboard editor.
/// Keeps a safe subset of formatting tags and removes all scripting.
pub fn sanitize_post_content(html_input: &str) -> String {
    let tags_to_allow = [
        "h1", "h2", "h3", "h4", "h5", "h6", "b", "strong", "i", "em", "u", "p", "br", "a", "ul",
        "ol", "li", "blockquote", "code", "pre", "hr", "img", "table", "thead", "tbody", "tr",
        "th", "td", "s", "del", "span", "div",
    ];
    let safe_attributes = ["src", "href", "alt", "title", "class", "width", "height", "align"];

    Builder::new()
        .tags(tags_to_allow.iter().cloned().collect::<HashSet<_>>())
        .generic_attributes(safe_attributes.iter().cloned().collect::<HashSet<_>>())
        .link_rel(Some("nofollow ugc"))
        .clean(html_input)
        .to_string()
}

/// Strips every tag, for plain fields like titles, names and comments.
pub fn strip_all_html(input: &str) -> String {
    Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_removed_from_content() {
        let cleaned = sanitize_post_content("<p onclick=\"x()\">Hi</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>Hi</p>");
    }

    #[test]
    fn plain_fields_lose_their_tags() {
        assert_eq!(strip_all_html("<b>Annual</b> Week"), "Annual Week");
    }
}
