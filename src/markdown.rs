// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Markdown to HTML rendering for release notes and commit messages.

use std::sync::LazyLock;

use pulldown_cmark::{Options, Parser, html};
use regex::Regex;

const FORGE_WEB_ROOT: &str = "https://github.com";

/// Full pull request URLs not already inside a link target or attribute.
static PULL_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?P<lead>^|[^(\["'=/])(?P<url>https://github\.com/[\w.-]+/[\w.-]+/pull/(?P<number>[0-9]+))"#
    )
    .expect("pull request pattern is valid")
});

/// `@user` mentions at the start of the text or after whitespace.
static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<lead>\A|\s)@(?P<user>[\w-]+)").expect("mention pattern is valid")
});

/// Renders a Markdown body into HTML.
///
/// Pull request URLs are shortened into `#<number>` links and user mentions
/// are linked to the forge profile before rendering.
///
/// # Examples
///
/// ```
/// let html = releasegen::markdown::render("Thanks @octocat");
/// assert!(html.contains(r#"<a href="https://github.com/octocat">@octocat</a>"#));
/// ```
pub fn render(body: &str) -> String {
    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");
    let linked = PULL_REQUEST.replace_all(&normalized, r#"${lead}<a href="${url}">#${number}</a>"#);
    let linked = MENTION.replace_all(
        &linked,
        format!(r#"${{lead}}<a href="{FORGE_WEB_ROOT}/${{user}}">@${{user}}</a>"#).as_str()
    );

    let parser = Parser::new_ext(&linked, Options::empty());
    let mut output = String::with_capacity(linked.len() + linked.len() / 2);
    html::push_html(&mut output, parser);
    output
}

#[cfg(test)]
mod tests {
    use super::render;

    #[test]
    fn renders_basic_markdown() {
        let html = render("# Changes\n\n* first\n* second\n");
        assert!(html.contains("<h1>Changes</h1>"));
        assert!(html.contains("<li>first</li>"));
    }

    #[test]
    fn shortens_pull_request_urls() {
        let html = render("Fixed in https://github.com/example/widget/pull/42 today");
        assert!(html.contains(r#"<a href="https://github.com/example/widget/pull/42">#42</a>"#));
    }

    #[test]
    fn leaves_markdown_link_targets_alone() {
        let html = render("[see](https://github.com/example/widget/pull/7)");
        assert!(html.contains(r#"<a href="https://github.com/example/widget/pull/7">see</a>"#));
        assert!(!html.contains("#7"));
    }

    #[test]
    fn links_mentions_but_not_email_addresses() {
        let html = render("@alice reviewed, mail bob@example.com");
        assert!(html.contains(r#"<a href="https://github.com/alice">@alice</a>"#));
        assert!(html.contains("bob@example.com"));
        assert!(!html.contains("https://github.com/example"));
    }

    #[test]
    fn normalizes_carriage_returns() {
        assert_eq!(render("line one\r\nline two"), render("line one\nline two"));
    }
}
