//! Tool-result enrichment with generated artifact references.
//!
//! Tools that persist output report it as `Saved to: <dir>/<name>` in their
//! result text. The enricher turns that path into the public URL the file is
//! served under and, for chart documents, pulls the serialized figure
//! (trace array + layout object) out of the page's plotting call so clients
//! can render it natively.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use quarry_core::config::ArtifactConfig;

/// Plotting call sites scanned for, in priority order.
const PLOT_CALL_MARKERS: [&str; 2] = ["Plotly.newPlot(", "Plotly.react("];

/// Text that precedes an artifact path in tool results.
const SAVED_MARKER: &str = "Saved to: ";

/// Data and layout of a chart, as handed to the plotting library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    #[serde(rename = "data")]
    pub series: Vec<Value>,
    pub layout: Map<String, Value>,
}

/// A tool result after artifact detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub content: String,
    pub file_url: Option<String>,
    pub visualization: Option<Visualization>,
}

/// Detects artifact references in tool output and extracts chart payloads.
#[derive(Debug, Clone)]
pub struct ArtifactEnricher {
    /// Directory the relative artifact paths are resolved against.
    root: PathBuf,
    /// Artifact directory name as written in tool output.
    dir: String,
    public_prefix: String,
    saved_re: Regex,
}

impl ArtifactEnricher {
    /// Create an enricher resolving artifact paths relative to `root`.
    pub fn new(config: &ArtifactConfig, root: impl Into<PathBuf>) -> Self {
        let dir = config.dir.trim_end_matches('/').to_string();
        let pattern = format!("{}({}/\\S+)", regex::escape(SAVED_MARKER), regex::escape(&dir));
        let saved_re = Regex::new(&pattern).expect("escaped artifact pattern is valid");
        Self {
            root: root.into(),
            dir,
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
            saved_re,
        }
    }

    /// Directory generated files live in on disk.
    pub fn artifact_dir(&self) -> PathBuf {
        self.root.join(&self.dir)
    }

    /// Enrich one tool result. Never fails; anything not found is omitted.
    pub fn enrich(&self, tool_name: &str, content: &str) -> Enrichment {
        let mut enrichment = Enrichment {
            content: content.to_string(),
            file_url: None,
            visualization: None,
        };

        let Some(caps) = self.saved_re.captures(content) else {
            return enrichment;
        };
        let artifact_path = &caps[1];
        enrichment.file_url = Some(self.public_url(artifact_path));

        let escapes_dir = artifact_path.split('/').any(|component| component == "..");
        if artifact_path.ends_with(".html") && !escapes_dir {
            enrichment.visualization = extract_visualization(&self.root.join(artifact_path));
            if enrichment.visualization.is_none() {
                tracing::debug!(tool = tool_name, path = artifact_path, "No chart payload found");
            }
        }

        enrichment
    }

    /// Rewrite `<dir>/<name>` into `<public_prefix>/<name>`.
    fn public_url(&self, artifact_path: &str) -> String {
        let name = artifact_path
            .strip_prefix(&self.dir)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(artifact_path);
        format!("{}/{}", self.public_prefix, name)
    }
}

/// Extract the figure payload from a chart document.
///
/// A missing or unreadable file yields `None`, as does a document in which
/// no plotting call carries a parsable (array, object) argument pair.
pub fn extract_visualization(path: &Path) -> Option<Visualization> {
    let html = match std::fs::read_to_string(path) {
        Ok(html) => html,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Chart document unreadable");
            return None;
        }
    };
    extract_from_html(&html)
}

/// Scan every occurrence of each plotting call marker for a figure payload.
pub fn extract_from_html(html: &str) -> Option<Visualization> {
    PLOT_CALL_MARKERS.into_iter().find_map(|marker| {
        html.match_indices(marker)
            .find_map(|(idx, _)| parse_call_arguments(&html[idx + marker.len()..]))
    })
}

/// Parse `<target>, <array>, <object>` from the text following a call marker.
fn parse_call_arguments(args: &str) -> Option<Visualization> {
    let comma = args.find(',')?;
    let rest = &args[comma + 1..];

    let (data, consumed) = decode_prefix(rest)?;
    let Value::Array(series) = data else {
        return None;
    };

    let rest = rest[consumed..].trim_start();
    let rest = rest.strip_prefix(',').unwrap_or(rest);
    let (layout, _) = decode_prefix(rest)?;
    let Value::Object(layout) = layout else {
        return None;
    };

    Some(Visualization { series, layout })
}

/// Decode the first complete JSON value in `input`, returning it with the
/// byte offset just past its end. Trailing text is ignored.
fn decode_prefix(input: &str) -> Option<(Value, usize)> {
    let mut values = serde_json::Deserializer::from_str(input).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) => Some((value, values.byte_offset())),
        _ => None,
    }
}
