use anyhow::{Context, Result};
use regex::Regex;

/// Recognizes bullet (`-`, `*`, `•`) and numbered (`1.`, `2)`) list items.
#[derive(Debug)]
pub struct BulletParser {
    list_item: Regex,
}

impl BulletParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            list_item: Regex::new(r"^(?:[-*•]\s+|\d+[.)]\s+)(?P<body>.+)$")
                .context("failed to compile list item regex")?,
        })
    }

    /// Statements carried by list-item lines, in input order. Unmarked lines
    /// are skipped.
    pub fn extract_bullets(&self, body: &str) -> Vec<String> {
        body.lines()
            .filter_map(|line| self.bullet_statement(line))
            .collect()
    }

    /// Bulleted statements, or every non-blank line when the body has none.
    pub fn statements_or_lines(&self, body: &str) -> Vec<String> {
        let bullets = self.extract_bullets(body);
        if !bullets.is_empty() {
            return bullets;
        }

        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    fn bullet_statement(&self, raw_line: &str) -> Option<String> {
        let captures = self.list_item.captures(raw_line.trim())?;
        let text = captures.name("body")?.as_str().trim();

        (!text.is_empty()).then(|| text.to_string())
    }
}
