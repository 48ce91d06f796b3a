use serde::{Deserialize, Serialize};

pub const CONTEXT_TITLE: &str = "Context";
pub const UNTITLED_TITLE: &str = "Untitled Section";
const CONTEXT_LEVEL: usize = 2;

/// A titled block of narrative recovered from markdown headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub level: usize,
    pub content: String,
}

#[derive(Debug)]
struct OpenSection {
    title: String,
    level: usize,
    body_lines: Vec<String>,
}

impl OpenSection {
    fn new(title: &str, level: usize) -> Self {
        Self {
            title: title.to_string(),
            level,
            body_lines: Vec::new(),
        }
    }

    fn push_blank(&mut self) {
        if self
            .body_lines
            .last()
            .map(|line| !line.is_empty())
            .unwrap_or(false)
        {
            self.body_lines.push(String::new());
        }
    }

    fn finalize(self) -> Section {
        Section {
            title: self.title,
            level: self.level,
            content: normalize_body(&self.body_lines),
        }
    }
}

/// Splits markdown blocks into sections in document order.
///
/// Narrative that precedes the first heading lands in a synthetic
/// "Context" section; input without any heading yields exactly that one
/// section.
pub fn build_outline<S: AsRef<str>>(blocks: &[S]) -> Vec<Section> {
    let mut sections = Vec::<Section>::new();
    let mut current: Option<OpenSection> = None;

    for block in blocks {
        for raw_line in block.as_ref().lines() {
            let line = raw_line.trim();

            if let Some((level, title)) = parse_heading(line) {
                if let Some(open) = current.take() {
                    sections.push(open.finalize());
                }
                current = Some(OpenSection::new(title, level));
                continue;
            }

            if line.is_empty() {
                if let Some(open) = current.as_mut() {
                    open.push_blank();
                }
                continue;
            }

            current
                .get_or_insert_with(|| OpenSection::new(CONTEXT_TITLE, CONTEXT_LEVEL))
                .body_lines
                .push(line.to_string());
        }

        if let Some(open) = current.as_mut() {
            open.push_blank();
        }
    }

    if let Some(open) = current.take() {
        sections.push(open.finalize());
    }

    if sections.is_empty() {
        sections.push(OpenSection::new(CONTEXT_TITLE, CONTEXT_LEVEL).finalize());
    }

    sections
}

fn parse_heading(line: &str) -> Option<(usize, &str)> {
    if !line.starts_with('#') {
        return None;
    }

    let level = line.chars().take_while(|ch| *ch == '#').count().max(1);
    let title = line[level..].trim();
    let title = if title.is_empty() { UNTITLED_TITLE } else { title };
    Some((level, title))
}

/// Trims every line, keeps at most one blank line in a row and drops
/// leading and trailing blank lines.
pub fn normalize_body<S: AsRef<str>>(lines: &[S]) -> String {
    let mut kept = Vec::<&str>::with_capacity(lines.len());

    for raw in lines {
        let line = raw.as_ref().trim();
        if line.is_empty() && kept.last().map(|last| last.is_empty()).unwrap_or(true) {
            continue;
        }
        kept.push(line);
    }

    while kept.last().map(|last| last.is_empty()).unwrap_or(false) {
        kept.pop();
    }

    kept.join("\n")
}

/// First section whose title contains any keyword, case-insensitively.
pub fn find_section<'a>(sections: &'a [Section], keywords: &[&str]) -> Option<&'a Section> {
    sections
        .iter()
        .find(|section| title_matches(section, keywords))
}

pub fn find_sections<'a>(sections: &'a [Section], keywords: &[&str]) -> Vec<&'a Section> {
    sections
        .iter()
        .filter(|section| title_matches(section, keywords))
        .collect()
}

fn title_matches(section: &Section, keywords: &[&str]) -> bool {
    let title = section.title.to_lowercase();
    keywords.iter().any(|keyword| title.contains(keyword))
}
