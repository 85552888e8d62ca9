/// HTML rendering of patch outcomes for the operator.
use std::fmt::Write;

use crate::runner::{PatchError, PatchOutcome};

/// Escape the five HTML-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Success page. A run that matched nothing is still a success, but is
/// phrased as "no change" so the operator can tell the two apart.
#[must_use]
pub fn render_success(outcome: &PatchOutcome, verify_url: &str) -> String {
    let mut html = String::new();

    if outcome.is_changed() {
        html.push_str("<h1>✅ SUCCESS!</h1>\n");
        let _ = writeln!(
            html,
            "<p>Snippet {} has been fixed ({} occurrence{} replaced).</p>",
            outcome.snippet_id,
            outcome.matches,
            if outcome.matches == 1 { "" } else { "s" }
        );
    } else {
        html.push_str("<h1>✅ SUCCESS (no change)</h1>\n");
        let _ = writeln!(
            html,
            "<p>The broken line was not found in snippet {}. The code was written back unchanged; it may already be fixed.</p>",
            outcome.snippet_id
        );
    }

    html.push_str("<p><strong>IMPORTANT: STOP AND REMOVE THIS TOOL NOW!</strong></p>\n");
    html.push_str("<hr>\n<h2>What was fixed:</h2>\n");
    let _ = writeln!(html, "<pre>{}</pre>", escape_html(&outcome.replacement));

    if let Some(n) = outcome.cache_flushed {
        let _ = writeln!(html, "<p>Cache flushed ({n} entries).</p>");
    }
    let _ = writeln!(
        html,
        "<p><small>Applied at {}</small></p>",
        outcome.applied_at.to_rfc3339()
    );
    let _ = writeln!(
        html,
        "<p><a href=\"{}\">Test the chatbot</a></p>",
        escape_html(verify_url)
    );
    html
}

/// Error page for failures that reached the store.
#[must_use]
pub fn render_failure(error: &PatchError) -> String {
    format!(
        "<h1>❌ ERROR</h1>\n<p>{}</p>\n",
        escape_html(&error.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;
    use chrono::Utc;

    fn outcome(matches: usize) -> PatchOutcome {
        PatchOutcome {
            snippet_id: 449,
            matches,
            replacement: "const a = (x && x.y) ? x.y : 'z';".to_string(),
            rows_updated: 1,
            cache_flushed: Some(2),
            applied_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_success_page() {
        let html = render_success(&outcome(1), "https://example.com/");
        assert!(html.contains("SUCCESS!"));
        assert!(html.contains("1 occurrence replaced"));
        assert!(html.contains("REMOVE THIS TOOL"));
        assert!(html.contains("const a = (x &amp;&amp; x.y) ? x.y : &#039;z&#039;;"));
        assert!(html.contains("Cache flushed (2 entries)"));
        assert!(html.contains(r#"<a href="https://example.com/">"#));
    }

    #[test]
    fn test_no_change_is_phrased_distinctly() {
        let html = render_success(&outcome(0), "/");
        assert!(html.contains("SUCCESS (no change)"));
        assert!(html.contains("was not found"));
        assert!(!html.contains("SUCCESS!"));
    }

    #[test]
    fn test_failure_page_includes_diagnostic() {
        let err = PatchError::Store(StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is <locked>".to_string()),
        )));
        let html = render_failure(&err);
        assert!(html.contains("ERROR"));
        assert!(html.contains("Failed to update the snippet. Error: database is &lt;locked&gt;"));
    }
}
