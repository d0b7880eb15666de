// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Extraction of branch, tag and log data from cgit-rendered pages.
//!
//! The pages are machine-generated and regular, so matching is done on the
//! table rows, anchors and cells cgit emits rather than on a full DOM.

use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;

use crate::error::Error;

/// Text of the summary-page header row that precedes the tag list.
const TAG_HEADER: &str = "TagDownloadAuthorAge";

/// Timestamp layout used on commit pages, e.g. `2024-01-02 03:04:05 +0000`.
const COMMIT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

static SELECTED_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<option\b(?P<attrs>[^>]*\bselected\b[^>]*)>(?P<text>.*?)</option>")
        .expect("option pattern is valid")
});

static TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<table\b(?P<attrs>[^>]*)>(?P<body>.*?)</table>").expect("table pattern is valid")
});

static ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<tr\b(?P<attrs>[^>]*)>(?P<body>.*?)</tr>").expect("row pattern is valid")
});

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<a\b(?P<attrs>[^>]*)>(?P<text>.*?)</a>").expect("anchor pattern is valid")
});

static CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<td\b(?P<attrs>[^>]*)>(?P<text>.*?)</td>").expect("cell pattern is valid")
});

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:'(?P<single>[^']*)'|"(?P<double>[^"]*)")"#)
        .expect("href pattern is valid")
});

static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:'(?P<single>[^']*)'|"(?P<double>[^"]*)")"#)
        .expect("class pattern is valid")
});

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("markup pattern is valid"));

/// Commit hash and time of a tag, read from its commit page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCommit {
    pub commit:    String,
    /// Unix seconds.
    pub timestamp: i64
}

/// Default branch: the text of the selected entry in the branch selector.
pub fn default_branch(page: &str) -> Option<String> {
    SELECTED_OPTION
        .captures(page)
        .map(|captures| text_of(&captures["text"]))
        .filter(|branch| !branch.is_empty())
}

/// Names of the first `limit` `rev*` tags listed on a repository summary page.
///
/// Tag rows follow the `Tag Download Author Age` header and end at the next
/// header row. Each row links the tag first and its commit second.
pub fn tag_names(page: &str, limit: usize) -> Vec<String> {
    let mut tags = Vec::new();
    let mut in_tag_section = false;

    for row in ROW.captures_iter(page) {
        let is_header = has_class(&row["attrs"], "nohover");
        if !in_tag_section {
            in_tag_section = is_header && compact_text(&row["body"]) == TAG_HEADER;
            continue;
        }
        if is_header || tags.len() >= limit {
            break;
        }

        for (index, anchor) in ANCHOR.captures_iter(&row["body"]).enumerate() {
            if index % 2 != 0 || tags.len() >= limit {
                continue;
            }
            let Some(href) = attribute(&HREF, &anchor["attrs"]) else {
                continue;
            };
            let Some((_, name)) = href.split_once('=') else {
                continue;
            };
            let name = name.split('=').next().unwrap_or_default();
            if name.starts_with("rev") {
                tags.push(name.to_owned());
            }
        }
    }

    tags
}

/// Reads the commit hash and author time from a commit page.
///
/// # Errors
///
/// Returns [`Error::HtmlParse`] when the commit-info table or its timestamp
/// cell is missing and [`Error::Timestamp`] when the time cannot be parsed.
pub fn tag_commit(page: &str) -> Result<TagCommit, Error> {
    let table = table_with_class(page, "commit-info")
        .ok_or_else(|| Error::parse_html("commit page has no commit-info table"))?;

    let commit = ANCHOR
        .captures(table)
        .map(|anchor| text_of(&anchor["text"]))
        .unwrap_or_default();

    let raw_time = CELL
        .captures_iter(table)
        .find(|cell| has_class(&cell["attrs"], "right"))
        .map(|cell| text_of(&cell["text"]))
        .ok_or_else(|| Error::parse_html("commit page has no timestamp cell"))?;

    let timestamp = DateTime::parse_from_str(&raw_time, COMMIT_TIME_FORMAT)
        .map_err(|source| Error::Timestamp {
            value: raw_time.clone(),
            source
        })?
        .timestamp();

    Ok(TagCommit {
        commit,
        timestamp
    })
}

/// Number of commits on the default branch since the latest tag, read from
/// the log page.
///
/// Zero when the branch and tag decorations sit on the same row. Otherwise
/// the rows strictly between the two plus one. When the tag is not on this
/// page every row after the branch tip is counted, plus one.
///
/// # Errors
///
/// Returns [`Error::HtmlParse`] when the log table or the branch decoration
/// is missing.
pub fn new_commits(page: &str) -> Result<u64, Error> {
    let table = table_with_class(page, "list")
        .ok_or_else(|| Error::parse_html("log page has no commit list"))?;
    let rows: Vec<&str> = ROW
        .captures_iter(table)
        .filter_map(|row| row.name("body").map(|body| body.as_str()))
        .collect();

    let branch_row = decorated_row(&rows, "branch-deco")
        .ok_or_else(|| Error::parse_html("log page has no branch decoration"))?;
    let count = match decorated_row(&rows, "tag-deco") {
        Some(tag_row) if tag_row == branch_row || text_of(rows[branch_row]) == text_of(rows[tag_row]) => 0,
        Some(tag_row) if tag_row > branch_row => tag_row - branch_row,
        // The tag is above the branch tip or beyond the first log page: every
        // row after the tip counts.
        _ => rows.len() - branch_row
    };
    Ok(count as u64)
}

fn decorated_row(rows: &[&str], class: &str) -> Option<usize> {
    rows.iter().position(|row| {
        ANCHOR
            .captures_iter(row)
            .any(|anchor| has_class(&anchor["attrs"], class))
    })
}

fn table_with_class<'a>(page: &'a str, class: &str) -> Option<&'a str> {
    TABLE
        .captures_iter(page)
        .find(|table| has_class(&table["attrs"], class))
        .and_then(|table| table.name("body"))
        .map(|body| body.as_str())
}

fn attribute(pattern: &Regex, attrs: &str) -> Option<String> {
    pattern.captures(attrs).and_then(|captures| {
        captures
            .name("single")
            .or_else(|| captures.name("double"))
            .map(|value| decode_entities(value.as_str()))
    })
}

fn has_class(attrs: &str, class: &str) -> bool {
    attribute(&CLASS, attrs)
        .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
}

/// Tag-stripped, entity-decoded and trimmed text.
fn text_of(fragment: &str) -> String {
    decode_entities(&MARKUP.replace_all(fragment, "")).trim().to_owned()
}

/// Text with every whitespace character removed.
fn compact_text(fragment: &str) -> String {
    text_of(fragment)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::{TagCommit, default_branch, new_commits, tag_commit, tag_names};
    use crate::error::Error;

    const SUMMARY: &str = "\
<div class='content'><form><select name='h' onchange='this.form.submit();'>
<option value='feature'>feature</option>
<option value='main' selected='selected'>main</option>
</select></form>
<table summary='repository info' class='list nowrap'>
<tr class='nohover'><th class='left'>Branch</th><th class='left'>Commit message</th><th class='left'>Author</th><th class='left' colspan='2'>Age</th></tr>
<tr><td><a href='/widget/log/'>main</a></td><td><a href='/widget/commit/'>Fix</a></td><td>Dev</td><td>2 days</td></tr>
<tr class='nohover'><td colspan='5'>&nbsp;</td></tr>
<tr class='nohover'><th class='left'>Tag</th><th class='left'>Download</th><th class='left'>Author</th><th class='left' colspan='2'>Age</th></tr>
<tr><td><a href='/widget/tag/?h=rev42'>rev42</a></td><td><a href='/widget/commit/?id=rev42'>commit 1a2b3c</a></td><td>Dev</td><td>1 day</td></tr>
<tr><td><a href='/widget/tag/?h=v1.0'>v1.0</a></td><td><a href='/widget/commit/?id=v1.0'>commit 4d5e6f</a></td><td>Dev</td><td>3 days</td></tr>
<tr><td><a href='/widget/tag/?h=rev41'>rev41</a></td><td><a href='/widget/commit/?id=rev41'>commit 7a8b9c</a></td><td>Dev</td><td>4 days</td></tr>
<tr><td><a href='/widget/tag/?h=rev40'>rev40</a></td><td><a href='/widget/commit/?id=rev40'>commit 0a0b0c</a></td><td>Dev</td><td>5 days</td></tr>
<tr><td><a href='/widget/tag/?h=rev39'>rev39</a></td><td><a href='/widget/commit/?id=rev39'>commit 0d0e0f</a></td><td>Dev</td><td>6 days</td></tr>
<tr class='nohover'><td colspan='5'>&nbsp;</td></tr>
<tr class='nohover'><th class='left'>Age</th><th class='left'>Commit message</th></tr>
<tr><td><a href='/widget/tag/?h=rev1'>rev1</a></td></tr>
</table></div>";

    const COMMIT: &str = "\
<table summary='commit info' class='commit-info'>
<tr><th>author</th><td>Dev &lt;dev@example.test&gt;</td><td class='right'>2024-01-02 03:04:05 +0100</td></tr>
<tr><th>committer</th><td>Dev &lt;dev@example.test&gt;</td><td class='right'>2024-01-03 00:00:00 +0000</td></tr>
<tr><th>commit</th><td colspan='2' class='sha1'><a href='/widget/commit/?id=1a2b3c'>1a2b3c</a> (<a href='/widget/patch/?id=1a2b3c'>patch</a>)</td></tr>
</table>";

    fn log_page(rows: &[&str]) -> String {
        let mut page = String::from(
            "<table class='list nowrap'><tr class='nohover'><th class='left'>Age</th><th class='left'>Commit message</th></tr>"
        );
        for row in rows {
            page.push_str(row);
        }
        page.push_str("</table>");
        page
    }

    const PLAIN_ROW: &str = "<tr><td>1 day</td><td><a href='/widget/commit/?id=x'>Change</a></td></tr>";
    const BRANCH_ROW: &str = "<tr><td>1 hour</td><td><a href='/widget/commit/?id=a'>Tip</a><span class='decoration'><a class='branch-deco' href='/widget/log/?h=main'>main</a></span></td></tr>";
    const TAG_ROW: &str = "<tr><td>2 days</td><td><a href='/widget/commit/?id=b'>Release</a><span class='decoration'><a class='tag-deco' href='/widget/tag/?h=rev42'>rev42</a></span></td></tr>";
    const BOTH_ROW: &str = "<tr><td>1 hour</td><td><a href='/widget/commit/?id=a'>Tip</a><span class='decoration'><a class='branch-deco' href='/widget/log/?h=main'>main</a><a class='tag-deco' href='/widget/tag/?h=rev42'>rev42</a></span></td></tr>";

    #[test]
    fn default_branch_is_the_selected_option() {
        assert_eq!(default_branch(SUMMARY).as_deref(), Some("main"));
        assert_eq!(default_branch("<select><option>main</option></select>"), None);
    }

    #[test]
    fn tag_names_keep_first_three_rev_tags() {
        assert_eq!(tag_names(SUMMARY, 3), vec!["rev42", "rev41", "rev40"]);
    }

    #[test]
    fn tag_names_without_tag_section_are_empty() {
        assert!(tag_names("<table><tr class='nohover'><th>Branch</th></tr></table>", 3).is_empty());
    }

    #[test]
    fn tag_commit_reads_hash_and_author_time() {
        let commit = tag_commit(COMMIT).expect("commit info");
        assert_eq!(commit, TagCommit {
            commit:    "1a2b3c".to_owned(),
            timestamp: 1_704_161_045
        });
    }

    #[test]
    fn tag_commit_rejects_bad_timestamps() {
        let page = COMMIT.replace("2024-01-02 03:04:05 +0100", "yesterday");
        assert!(matches!(tag_commit(&page), Err(Error::Timestamp { .. })));
        assert!(matches!(tag_commit("<html></html>"), Err(Error::HtmlParse { .. })));
    }

    #[test]
    fn decorations_on_one_row_mean_no_new_commits() {
        let page = log_page(&[BOTH_ROW, PLAIN_ROW]);
        assert_eq!(new_commits(&page).expect("count"), 0);
    }

    #[test]
    fn rows_between_decorations_are_counted_plus_one() {
        let page = log_page(&[BRANCH_ROW, PLAIN_ROW, PLAIN_ROW, TAG_ROW, PLAIN_ROW]);
        assert_eq!(new_commits(&page).expect("count"), 3);

        let adjacent = log_page(&[BRANCH_ROW, TAG_ROW]);
        assert_eq!(new_commits(&adjacent).expect("count"), 1);
    }

    #[test]
    fn tag_beyond_first_log_page_counts_every_row_after_the_tip() {
        let mut rows = vec![BRANCH_ROW];
        rows.extend(std::iter::repeat_n(PLAIN_ROW, 49));
        let page = log_page(&rows);
        assert_eq!(new_commits(&page).expect("count"), 50);
    }

    #[test]
    fn missing_branch_decoration_is_an_error() {
        let page = log_page(&[TAG_ROW, PLAIN_ROW]);
        assert!(matches!(new_commits(&page), Err(Error::HtmlParse { .. })));
    }
}
