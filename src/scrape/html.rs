use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::types::{ScrapeResult, TableData};

/// Elements dropped before any text is read.
static NOISE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, nav, footer, header").expect("valid noise selector")
});
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").expect("valid selector"));

#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub max_body_chars: usize,
    pub max_tables: usize,
}

/// Parse an HTML page into title, visible text and tables.
///
/// Kept synchronous: `Html` is not `Send`, so it must never live across an await.
pub fn parse_page(url: &str, html: &str, limits: PageLimits) -> ScrapeResult {
    let mut document = Html::parse_document(html);
    strip_noise(&mut document);

    let page_title = extract_title(&document).unwrap_or_default();
    let text: String = document.root_element().text().collect();
    let body_text = truncate_chars(&text, limits.max_body_chars);
    let tables = extract_tables(&document, limits.max_tables);

    ScrapeResult {
        source_url: url.to_string(),
        page_title,
        body_text,
        tables,
    }
}

fn strip_noise(document: &mut Html) {
    let ids: Vec<_> = document.select(&NOISE).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn extract_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

fn extract_tables(document: &Html, max_tables: usize) -> Vec<TableData> {
    document
        .select(&TABLE)
        .take(max_tables)
        .enumerate()
        .filter_map(|(index, table)| {
            let rows: Vec<Vec<String>> = table
                .select(&ROW)
                .map(|row| row.select(&CELL).map(cell_text).collect::<Vec<_>>())
                .filter(|cells| cells.iter().any(|c| !c.is_empty()))
                .collect();
            if rows.is_empty() {
                None
            } else {
                Some(TableData { index, rows })
            }
        })
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: PageLimits = PageLimits {
        max_body_chars: 30_000,
        max_tables: 5,
    };

    #[test]
    fn test_strips_noise_elements() {
        let html = r#"<html><head><title>Films</title><style>.x{color:red}</style></head>
            <body>
              <header>Site Header</header>
              <nav>Menu Home About</nav>
              <p>Avatar grossed a lot.</p>
              <script>var tracking = 1;</script>
              <footer>Copyright</footer>
            </body></html>"#;
        let page = parse_page("https://films.example", html, LIMITS);

        assert_eq!(page.page_title, "Films");
        assert!(page.body_text.contains("Avatar grossed a lot."));
        for noise in ["Site Header", "Menu Home", "tracking", "Copyright", "color:red"] {
            assert!(!page.body_text.contains(noise), "found {noise:?}");
        }
    }

    #[test]
    fn test_missing_title_is_empty() {
        let page = parse_page("https://x.example", "<p>hello</p>", LIMITS);
        assert_eq!(page.page_title, "");
        assert_eq!(page.source_url, "https://x.example");
    }

    #[test]
    fn test_table_rows_and_empty_rows_dropped() {
        let html = r#"<table>
              <tr><th>Rank</th><th> Title </th></tr>
              <tr><td></td><td>  </td></tr>
              <tr><td>1</td><td><a href="/a">Avatar</a></td></tr>
            </table>"#;
        let page = parse_page("u", html, LIMITS);

        assert_eq!(page.tables.len(), 1);
        assert_eq!(page.tables[0].index, 0);
        assert_eq!(
            page.tables[0].rows,
            vec![
                vec!["Rank".to_string(), "Title".to_string()],
                vec!["1".to_string(), "Avatar".to_string()],
            ]
        );
    }

    #[test]
    fn test_at_most_five_tables() {
        let html: String = (0..8)
            .map(|i| format!("<table><tr><td>t{i}</td></tr></table>"))
            .collect();
        let page = parse_page("u", &html, LIMITS);

        assert_eq!(page.tables.len(), 5);
        let indices: Vec<usize> = page.tables.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(page.tables[4].rows, vec![vec!["t4".to_string()]]);
    }

    #[test]
    fn test_empty_table_is_skipped_but_keeps_index() {
        let html = "<table><tr><td></td></tr></table><table><tr><td>x</td></tr></table>";
        let page = parse_page("u", html, LIMITS);
        assert_eq!(page.tables.len(), 1);
        assert_eq!(page.tables[0].index, 1);
    }

    #[test]
    fn test_body_text_capped() {
        let html = format!("<p>{}</p>", "é".repeat(40_000));
        let page = parse_page("u", &html, LIMITS);
        assert_eq!(page.body_text.chars().count(), 30_000);
    }

    #[test]
    fn test_truncate_chars_short_input_untouched() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }
}
