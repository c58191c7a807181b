//! Presentation helpers for chat transcripts.

use std::sync::LazyLock;

use regex::Regex;
use tera::escape_html;

/// Keywords emphasized in rendered SQL.
const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "JOIN", "WHERE", "GROUP BY", "ORDER BY", "DESC", "AS", "SUM", "NOW",
    "INTERVAL", "ON",
];

static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = SQL_KEYWORDS
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b({alternation})\b")).expect("keyword pattern is valid")
});

/// Render one line per SQL source line with keywords wrapped in spans.
///
/// The source is escaped first, so the output is safe to embed.
pub fn highlight_sql(sql: &str) -> Vec<String> {
    sql.lines()
        .map(|line| {
            KEYWORD_RE
                .replace_all(&escape_html(line), r#"<span class="kw">$1</span>"#)
                .into_owned()
        })
        .collect()
}

/// Avatar initial for a signed-in user.
pub fn user_initial(email: Option<&str>) -> char {
    email
        .and_then(|e| e.chars().find(char::is_ascii_alphanumeric))
        .map_or('U', |c| c.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_wrapped() {
        let lines = highlight_sql("SELECT a AS b\nFROM t");
        assert_eq!(
            lines[0],
            r#"<span class="kw">SELECT</span> a <span class="kw">AS</span> b"#
        );
        assert_eq!(lines[1], r#"<span class="kw">FROM</span> t"#);
    }

    #[test]
    fn test_multiword_keywords_and_word_boundaries() {
        let lines = highlight_sql("GROUP BY category_name ORDER BY total DESC");
        let line = &lines[0];
        assert!(line.contains(r#"<span class="kw">GROUP BY</span>"#));
        assert!(line.contains(r#"<span class="kw">ORDER BY</span>"#));
        // ASSET must not match AS.
        assert_eq!(highlight_sql("ASSET")[0], "ASSET");
    }

    #[test]
    fn test_source_is_escaped() {
        let lines = highlight_sql("WHERE a < '<b>'");
        assert_eq!(
            lines[0],
            r#"<span class="kw">WHERE</span> a &lt; &#x27;&lt;b&gt;&#x27;"#
        );
    }

    #[test]
    fn test_user_initial() {
        assert_eq!(user_initial(Some("jane@example.com")), 'J');
        assert_eq!(user_initial(Some("_x")), 'X');
        assert_eq!(user_initial(None), 'U');
    }
}
