//! Wiki pages and their append-only revisions.
//!
//! # Invariants
//! - `name` is derived from the title, unique per project, `[A-Za-z0-9_]{1,20}`.
//! - Revisions are never updated after insert.
//! - `current_revision` always points at the newest revision once the page
//!   has been saved.

use super::account::UserId;
use super::project::{Project, ProjectId};
use super::{check_identifier, check_text, now_epoch_ms, EntityValidationError};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WikiPageId = Uuid;
pub type WikiRevisionId = Uuid;

pub const PAGE_NAME_MAX_LEN: usize = 20;
pub const PAGE_TITLE_MAX_LEN: usize = 200;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,3})\s+(.+?)\s*#*$").expect("valid heading regex"));
static WIKI_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([A-Za-z0-9_]+)\]\]").expect("valid wiki link regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("valid link regex"));
static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiPage {
    pub uuid: WikiPageId,
    pub project_uuid: ProjectId,
    /// URL name derived from the title.
    pub name: String,
    pub title: String,
    pub current_revision: Option<WikiRevisionId>,
    pub created_at: i64,
}

impl WikiPage {
    /// Creates an unsaved page whose name is derived from `title`.
    pub fn new(project_uuid: ProjectId, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            uuid: Uuid::new_v4(),
            project_uuid,
            name: page_name_from_title(&title),
            title,
            current_revision: None,
            created_at: now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        check_identifier("name", &self.name, PAGE_NAME_MAX_LEN)?;
        check_text("title", &self.title, PAGE_TITLE_MAX_LEN)
    }

    pub fn absolute_url(&self, project: &Project) -> String {
        format!("{}wiki/{}/", project.absolute_url(), self.name)
    }
}

/// Immutable snapshot of a page's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiPageRevision {
    pub uuid: WikiRevisionId,
    pub page_uuid: WikiPageId,
    pub user_uuid: UserId,
    pub wiki_text: String,
    /// `wiki_text` rendered by [`render_wiki_html`].
    pub html_text: String,
    pub created_at: i64,
}

impl WikiPageRevision {
    pub fn new(page_uuid: WikiPageId, user_uuid: UserId, wiki_text: impl Into<String>) -> Self {
        let wiki_text = wiki_text.into();
        Self {
            uuid: Uuid::new_v4(),
            page_uuid,
            user_uuid,
            html_text: render_wiki_html(&wiki_text),
            wiki_text,
            created_at: now_epoch_ms(),
        }
    }
}

/// Derives a page name: ASCII alphanumerics kept, other runs folded into `_`.
///
/// Returns an empty string when the title has no usable characters.
pub fn page_name_from_title(title: &str) -> String {
    let mut name = String::new();
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch);
        } else if !name.is_empty() && !name.ends_with('_') {
            name.push('_');
        }
    }
    let truncated: String = name.chars().take(PAGE_NAME_MAX_LEN).collect();
    truncated.trim_end_matches('_').to_string()
}

/// Renders wiki markup into HTML.
///
/// Supported: `#`..`###` headings, blank-line separated paragraphs,
/// `**bold**`, `[label](url)` and `[[PageName]]` links. Everything else is
/// escaped text.
pub fn render_wiki_html(wiki_text: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();

    for line in wiki_text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            continue;
        }
        if let Some(caps) = HEADING_RE.captures(line.trim_start()) {
            flush_paragraph(&mut paragraph, &mut blocks);
            let level = caps[1].len();
            blocks.push(format!("<h{level}>{}</h{level}>", render_inline(&caps[2])));
            continue;
        }
        paragraph.push(render_inline(line.trim()));
    }
    flush_paragraph(&mut paragraph, &mut blocks);

    blocks.join("\n")
}

fn flush_paragraph(paragraph: &mut Vec<String>, blocks: &mut Vec<String>) {
    if paragraph.is_empty() {
        return;
    }
    blocks.push(format!("<p>{}</p>", paragraph.join("\n")));
    paragraph.clear();
}

fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let with_wiki_links = WIKI_LINK_RE.replace_all(&escaped, r#"<a href="../$1/">$1</a>"#);
    let with_links = LINK_RE.replace_all(&with_wiki_links, |caps: &Captures<'_>| {
        let label = &caps[1];
        let url = &caps[2];
        if is_safe_link(url) {
            format!(r#"<a href="{url}">{label}</a>"#)
        } else {
            label.to_string()
        }
    });
    BOLD_RE
        .replace_all(&with_links, "<strong>$1</strong>")
        .into_owned()
}

const SAFE_SCHEMES: [&str; 3] = ["http:", "https:", "mailto:"];

/// Relative targets and the schemes in `SAFE_SCHEMES`. Anything else renders as plain text.
fn is_safe_link(url: &str) -> bool {
    let scheme_end = url.find(['/', '?', '#']).unwrap_or(url.len());
    match url[..scheme_end].find(':') {
        None => true,
        Some(colon) => {
            let scheme = url[..=colon].to_ascii_lowercase();
            SAFE_SCHEMES.contains(&scheme.as_str())
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{is_safe_link, page_name_from_title, render_wiki_html, WikiPage};
    use uuid::Uuid;

    #[test]
    fn page_name_folds_separators_and_truncates() {
        assert_eq!(page_name_from_title("Release Plan: Q3"), "Release_Plan_Q3");
        assert_eq!(page_name_from_title("  --Intro--  "), "Intro");
        assert_eq!(page_name_from_title("!!!"), "");
        assert_eq!(
            page_name_from_title("An extremely long page title here"),
            "An_extremely_long_pa"
        );
    }

    #[test]
    fn new_page_has_no_revision_yet() {
        let page = WikiPage::new(Uuid::new_v4(), "Home Page");
        assert_eq!(page.name, "Home_Page");
        assert!(page.current_revision.is_none());
        page.validate().unwrap();
    }

    #[test]
    fn renders_headings_paragraphs_and_inline_markup() {
        let html = render_wiki_html("# Title\n\nSee **this** and [[Other]].\nNext line\n\n[docs](https://example.com)");
        assert_eq!(
            html,
            "<h1>Title</h1>\n<p>See <strong>this</strong> and <a href=\"../Other/\">Other</a>.\nNext line</p>\n<p><a href=\"https://example.com\">docs</a></p>"
        );
    }

    #[test]
    fn escapes_markup_and_drops_script_links() {
        let html = render_wiki_html("<script>x</script> [go](javascript:alert)");
        assert_eq!(html, "<p>&lt;script&gt;x&lt;/script&gt; go</p>");
    }

    #[test]
    fn only_web_mail_and_relative_links_are_kept() {
        assert!(is_safe_link("https://example.com/a:b"));
        assert!(is_safe_link("HTTP://example.com"));
        assert!(is_safe_link("mailto:team@example.com"));
        assert!(is_safe_link("../Other/"));
        assert!(is_safe_link("files/report.pdf?v=1:2"));
        assert!(is_safe_link("#section"));

        assert!(!is_safe_link("data:text/html,hi"));
        assert!(!is_safe_link("VBScript:msgbox"));
        assert!(!is_safe_link("file:///etc/passwd"));

        let html = render_wiki_html("[a](data:text/html,x) [b](vbscript:run) [c](notes/today) [d](mailto:x@y.z)");
        assert_eq!(
            html,
            "<p>a b <a href=\"notes/today\">c</a> <a href=\"mailto:x@y.z\">d</a></p>"
        );
    }
}
