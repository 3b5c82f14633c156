//! PNG and SVG export of the composed avatar.
//!
//! - [`export_png`] encodes the canvas exactly as it is, without re-rendering.
//! - [`export_svg`] refetches the selected sources and merges the children of
//!   each document's root `<svg>` into one document, in layer order.
//!
//! Exported files are handed to a [`DownloadSink`] to be saved.

use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::join_all;
use image::ImageFormat;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::{EscapeError, unescape_with};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};

use crate::catalog::AssetFetcher;
use crate::category::Category;
use crate::error::ExportError;
use crate::selection::CurrentComposition;
use crate::surface::Canvas;

/// Width, height and viewBox extent of exported SVG documents.
pub const DEFAULT_SVG_EXPORT_SIZE: u32 = 32;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

// ============================================================================
// ExportFile
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Svg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// An exported file, ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    /// Wraps `bytes` under a timestamped name such as `emoji_1700000000000.png`.
    pub fn timestamped(format: ExportFormat, bytes: Vec<u8>) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self {
            file_name: format!("emoji_{millis}.{}", format.extension()),
            format,
            bytes,
        }
    }
}

// ============================================================================
// PNG
// ============================================================================

/// Encodes the canvas pixels as PNG.
#[tracing::instrument(skip(canvas))]
pub fn export_png(canvas: &Canvas) -> Result<ExportFile, ExportError> {
    let mut bytes = Vec::new();
    canvas
        .image()
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

    let file = ExportFile::timestamped(ExportFormat::Png, bytes);
    tracing::info!(file = %file.file_name, bytes = file.bytes.len(), "png exported");
    Ok(file)
}

// ============================================================================
// SVG
// ============================================================================

/// Why a layer's SVG document was left out of the export.
#[derive(Debug, thiserror::Error)]
enum DocumentError {
    #[error("not utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attr(#[from] AttrError),

    #[error("unresolved reference: {0}")]
    Entity(#[from] EscapeError),

    #[error("root element is not <svg>")]
    NotSvg,

    #[error("root <svg> is never closed")]
    Unclosed,
}

/// Collects the child nodes of the root `<svg>` element.
///
/// Nodes are taken verbatim, except that references to entities declared in
/// the document's internal DTD subset are expanded, since the DOCTYPE does not
/// survive the merge.
fn svg_children(data: &[u8]) -> Result<Vec<Event<'static>>, DocumentError> {
    let text = std::str::from_utf8(data)?;
    let mut reader = Reader::from_str(text);
    let mut depth = 0usize;
    let mut root_seen = false;
    let mut entities = HashMap::new();
    let mut nodes = Vec::new();

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) if depth == 0 => {
                if root_seen || e.local_name().as_ref() != b"svg" {
                    return Err(DocumentError::NotSvg);
                }
                root_seen = true;
                if matches!(event, Event::Start(_)) {
                    depth = 1;
                }
            }
            Event::End(_) if depth == 1 => depth = 0,
            Event::DocType(ref doctype) if depth == 0 => {
                entities = declared_entities(std::str::from_utf8(doctype)?);
            }
            // Prolog and epilog (declaration, doctype, comments) are dropped.
            _ if depth == 0 => {}
            Event::Start(_) => {
                depth += 1;
                nodes.push(event.into_owned());
            }
            Event::End(_) => {
                depth -= 1;
                nodes.push(event.into_owned());
            }
            _ => nodes.push(event.into_owned()),
        }
    }

    if !root_seen {
        return Err(DocumentError::NotSvg);
    }
    if depth != 0 {
        return Err(DocumentError::Unclosed);
    }
    if entities.is_empty() {
        return Ok(nodes);
    }
    nodes
        .into_iter()
        .map(|node| expand_entities(node, &entities))
        .collect()
}

/// Parses `<!ENTITY name "value">` declarations out of a DOCTYPE body.
///
/// Parameter entities and external (`SYSTEM`/`PUBLIC`) entities are skipped.
fn declared_entities(doctype: &str) -> HashMap<String, String> {
    let mut entities = HashMap::new();
    for decl in doctype.split("<!ENTITY").skip(1) {
        let decl = decl.trim_start();
        if decl.starts_with('%') {
            continue;
        }
        let Some((name, rest)) = decl.split_once(char::is_whitespace) else {
            continue;
        };
        let rest = rest.trim_start();
        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        if let Some((value, _)) = rest[1..].split_once(quote) {
            entities.insert(name.to_string(), value.to_string());
        }
    }
    entities
}

fn resolve_entity<'e>(entities: &'e HashMap<String, String>, name: &str) -> Option<&'e str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => entities.get(name).map(String::as_str),
    }
}

fn expand_entities(
    node: Event<'static>,
    entities: &HashMap<String, String>,
) -> Result<Event<'static>, DocumentError> {
    Ok(match node {
        Event::Start(tag) => Event::Start(expand_tag(&tag, entities)?),
        Event::Empty(tag) => Event::Empty(expand_tag(&tag, entities)?),
        Event::Text(text) => {
            let raw = std::str::from_utf8(&text)?;
            let value = unescape_with(raw, |name| resolve_entity(entities, name))?;
            Event::Text(BytesText::new(&value).into_owned())
        }
        other => other,
    })
}

fn expand_tag(
    tag: &BytesStart<'_>,
    entities: &HashMap<String, String>,
) -> Result<BytesStart<'static>, DocumentError> {
    let name = std::str::from_utf8(tag.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr in tag.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let raw = std::str::from_utf8(&attr.value)?;
        let value = unescape_with(raw, |name| resolve_entity(entities, name))?.into_owned();
        attributes.push((key, value));
    }
    Ok(BytesStart::new(name)
        .with_attributes(attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .into_owned())
}

/// Wraps `children` in a fresh `size x size` root `<svg>`.
fn merge_svg(children: &[Event<'static>], size: u32) -> Result<Vec<u8>, ExportError> {
    let side = size.to_string();
    let view_box = format!("0 0 {size} {size}");
    let root = BytesStart::new("svg").with_attributes([
        ("width", side.as_str()),
        ("height", side.as_str()),
        ("viewBox", view_box.as_str()),
        ("fill", "none"),
        ("xmlns", SVG_NAMESPACE),
    ]);

    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Start(root))
        .map_err(|e| ExportError::xml(e.to_string()))?;
    for node in children {
        writer
            .write_event(node.clone())
            .map_err(|e| ExportError::xml(e.to_string()))?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("svg")))
        .map_err(|e| ExportError::xml(e.to_string()))?;
    Ok(writer.into_inner())
}

/// Builds one SVG document from the selected layers.
///
/// Empty layers contribute nothing. A layer that cannot be fetched or parsed
/// is skipped with a warning rather than failing the export.
#[tracing::instrument(skip(fetcher, composition))]
pub async fn export_svg(
    fetcher: &dyn AssetFetcher,
    composition: &CurrentComposition,
    size: u32,
) -> Result<ExportFile, ExportError> {
    let documents = join_all(Category::ALL.into_iter().map(|category| async move {
        let source = &composition[category];
        if source.is_none() {
            return None;
        }
        match fetcher.fetch(source).await {
            Ok(bytes) => Some((category, bytes)),
            Err(err) => {
                tracing::warn!(%category, %source, error = %err, "svg export skipped layer");
                None
            }
        }
    }))
    .await;

    let mut children = Vec::new();
    for (category, bytes) in documents.into_iter().flatten() {
        match svg_children(&bytes) {
            Ok(nodes) => children.extend(nodes),
            Err(err) => {
                let source = &composition[category];
                tracing::warn!(%category, %source, error = %err, "svg export skipped layer");
            }
        }
    }

    let file = ExportFile::timestamped(ExportFormat::Svg, merge_svg(&children, size)?);
    tracing::info!(file = %file.file_name, bytes = file.bytes.len(), "svg exported");
    Ok(file)
}

// ============================================================================
// DownloadSink
// ============================================================================

/// Destination for exported files.
pub trait DownloadSink {
    /// Saves the file and returns where it went.
    fn save(&self, file: &ExportFile) -> Result<PathBuf, ExportError>;
}

/// Saves exports into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, file: &ExportFile) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ExportError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(&file.file_name);
        std::fs::write(&path, &file.bytes).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "export saved");
        Ok(path)
    }
}
