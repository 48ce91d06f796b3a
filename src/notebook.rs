use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::util::sha256_hex;

/// Notebook content in the shape the insight engine consumes.
///
/// Every field defaults to empty so a partial mapping still deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedNotebook {
    #[serde(deserialize_with = "metadata_field")]
    pub metadata: NotebookMetadata,
    pub markdown_cells: Vec<CellRecord>,
    pub code_cells: Vec<CellRecord>,
    pub outputs: CategorizedOutputs,
    pub imports: Vec<String>,
    #[serde(deserialize_with = "function_list")]
    pub functions: Vec<FunctionRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotebookMetadata {
    pub kernel: String,
    pub language: String,
    pub title: String,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CellRecord {
    pub index: usize,
    #[serde(deserialize_with = "text_field")]
    pub source: String,
    pub execution_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizedOutputs {
    #[serde(deserialize_with = "text_list")]
    pub text: Vec<String>,
    pub plots: Vec<Value>,
    pub tables: Vec<Value>,
    pub errors: Vec<ErrorRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorRecord {
    pub name: Option<String>,
    pub value: Option<String>,
    pub traceback: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionRecord {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotebookStatistics {
    pub total_cells: usize,
    pub code_cells: usize,
    pub markdown_cells: usize,
    pub total_code_lines: usize,
    pub executed_cells: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotebookFormat {
    Ipynb,
    Parsed,
}

impl NotebookFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            NotebookFormat::Ipynb => "ipynb",
            NotebookFormat::Parsed => "parsed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedNotebook {
    pub notebook: ParsedNotebook,
    pub format: NotebookFormat,
    pub sha256: String,
}

impl ParsedNotebook {
    pub fn markdown_sources(&self) -> Vec<&str> {
        self.markdown_cells
            .iter()
            .map(|cell| cell.source.as_str())
            .collect()
    }

    pub fn statistics(&self) -> NotebookStatistics {
        NotebookStatistics {
            total_cells: self.markdown_cells.len() + self.code_cells.len(),
            code_cells: self.code_cells.len(),
            markdown_cells: self.markdown_cells.len(),
            total_code_lines: self
                .code_cells
                .iter()
                .map(|cell| source_line_count(&cell.source))
                .sum(),
            executed_cells: self
                .code_cells
                .iter()
                .filter(|cell| cell.execution_count.is_some())
                .count(),
        }
    }
}

/// Line count of a cell source, counting an empty source as one line.
pub fn source_line_count(source: &str) -> usize {
    source.split('\n').count()
}

pub fn load_notebook(path: &Path) -> Result<LoadedNotebook> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let (notebook, format) = parse_notebook_bytes(&raw)
        .with_context(|| format!("failed to load notebook {}", path.display()))?;

    Ok(LoadedNotebook {
        notebook,
        format,
        sha256: sha256_hex(&raw),
    })
}

pub fn parse_notebook_bytes(raw: &[u8]) -> Result<(ParsedNotebook, NotebookFormat)> {
    let value: Value = serde_json::from_slice(raw).context("notebook is not valid json")?;
    let Value::Object(object) = &value else {
        bail!("notebook json must be an object");
    };

    if is_raw_notebook(object) {
        let raw_notebook: RawNotebook =
            serde_json::from_value(value).context("failed to decode ipynb structure")?;
        return Ok((raw_notebook.into_parsed(), NotebookFormat::Ipynb));
    }

    let parsed: ParsedNotebook =
        serde_json::from_value(value).context("failed to decode parsed notebook mapping")?;
    Ok((parsed, NotebookFormat::Parsed))
}

fn is_raw_notebook(object: &Map<String, Value>) -> bool {
    object.contains_key("nbformat")
        || object
            .get("cells")
            .and_then(Value::as_array)
            .map(|cells| cells.iter().any(|cell| cell.get("cell_type").is_some()))
            .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
    #[serde(default)]
    cells: Vec<RawCell>,
    #[serde(default)]
    metadata: Value,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    #[serde(default)]
    cell_type: String,
    #[serde(default, deserialize_with = "text_field")]
    source: String,
    #[serde(default)]
    outputs: Vec<RawOutput>,
    #[serde(default)]
    execution_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    output_type: String,
    #[serde(default, deserialize_with = "text_field")]
    text: String,
    #[serde(default)]
    data: Map<String, Value>,
    #[serde(default)]
    ename: Option<String>,
    #[serde(default)]
    evalue: Option<String>,
    #[serde(default)]
    traceback: Vec<String>,
}

impl RawNotebook {
    fn into_parsed(self) -> ParsedNotebook {
        let mut parsed = ParsedNotebook {
            metadata: NotebookMetadata::from_value(&self.metadata),
            ..ParsedNotebook::default()
        };
        let mut imports = BTreeSet::<String>::new();

        for (index, cell) in self.cells.into_iter().enumerate() {
            match cell.cell_type.as_str() {
                "markdown" => parsed.markdown_cells.push(CellRecord {
                    index,
                    source: cell.source,
                    execution_count: None,
                }),
                "code" => {
                    collect_imports(&cell.source, &mut imports);
                    collect_functions(&cell.source, &mut parsed.functions);
                    for output in cell.outputs {
                        categorize_output(output, &mut parsed.outputs);
                    }
                    parsed.code_cells.push(CellRecord {
                        index,
                        source: cell.source,
                        execution_count: cell.execution_count,
                    });
                }
                _ => {}
            }
        }

        parsed.imports = imports.into_iter().collect();
        parsed
    }
}

fn categorize_output(output: RawOutput, outputs: &mut CategorizedOutputs) {
    match output.output_type.as_str() {
        "stream" => outputs.text.push(output.text),
        "execute_result" | "display_data" => {
            let data = output.data;
            if data.contains_key("image/png") || data.contains_key("image/jpeg") {
                outputs.plots.push(Value::Object(data));
            } else if let Some(html) = data.get("text/html") {
                outputs.tables.push(Value::String(value_to_text(html)));
            } else if let Some(plain) = data.get("text/plain") {
                outputs.text.push(value_to_text(plain));
            }
        }
        "error" => outputs.errors.push(ErrorRecord {
            name: output.ename,
            value: output.evalue,
            traceback: output.traceback,
        }),
        _ => {}
    }
}

fn collect_imports(source: &str, imports: &mut BTreeSet<String>) {
    for line in source.lines() {
        let line = line.trim();
        if line.starts_with("import ") || line.starts_with("from ") {
            imports.insert(line.to_string());
        }
    }
}

fn collect_functions(source: &str, functions: &mut Vec<FunctionRecord>) {
    for line in source.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("def ") else {
            continue;
        };

        let name = rest.split('(').next().unwrap_or_default().trim();
        if name.is_empty() {
            continue;
        }

        functions.push(FunctionRecord {
            name: name.to_string(),
            definition: line.to_string(),
        });
    }
}

impl NotebookMetadata {
    fn from_value(value: &Value) -> Self {
        let kernel = value
            .pointer("/kernelspec/display_name")
            .or_else(|| value.pointer("/kernelspec/name"))
            .or_else(|| value.get("kernel"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let language = value
            .pointer("/language_info/name")
            .or_else(|| value.pointer("/kernelspec/language"))
            .or_else(|| value.get("language"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let title = value
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        let authors = value
            .get("authors")
            .and_then(Value::as_array)
            .map(|authors| {
                authors
                    .iter()
                    .filter_map(|author| {
                        author
                            .as_str()
                            .or_else(|| author.get("name").and_then(Value::as_str))
                    })
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            kernel,
            language,
            title,
            authors,
        }
    }
}

/// Joins notebook text stored either as one string or as a list of lines.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(parts) => {
            let mut out = String::new();
            for part in parts {
                let piece = value_to_text(part);
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&piece);
            }
            out
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn text_field<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

fn text_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().map(value_to_text).collect(),
        Value::Null => Vec::new(),
        other => vec![value_to_text(&other)],
    })
}

fn metadata_field<'de, D>(deserializer: D) -> std::result::Result<NotebookMetadata, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(NotebookMetadata::from_value(&value))
}

fn function_list<'de, D>(deserializer: D) -> std::result::Result<Vec<FunctionRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(FunctionRecord {
                definition: format!("def {name}(...)"),
                name,
            }),
            Value::Object(_) => serde_json::from_value(item).ok(),
            _ => None,
        })
        .collect())
}
