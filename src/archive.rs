//! Filesystem layer: archives on disk, documents in directories.
//!
//! ```no_run
//! use cxb::archive::{convert, export, ConvertOptions};
//! use cxb::container::DecodeOptions;
//!
//! // Folder of *.xml -> archive
//! convert("gamemodes/", "gamemodes.cxb", &ConvertOptions::default())?;
//!
//! // Archive -> folder of *.xml
//! let written = export("gamemodes.cxb", "out/", &DecodeOptions::default())?;
//! println!("{} file(s)", written.value.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::codec::CodecId;
use crate::container::{decode_with, encode_with, DecodeOptions, DecodedContainer, Document, EncodeOptions};
use crate::diagnostics::Outcome;
use crate::error::CxbError;
use crate::header::SegmentHeader;
use crate::index::locate_segments;
use crate::manifest::{validate_document_set, ManifestError};
use crate::segment::{decode_segment, BlockSummary};
use crate::xml::{self, XmlError};

const XML_EXT: &str = "xml";

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Cxb(#[from] CxbError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("{name}: {source}")]
    Xml { name: String, source: XmlError },
    #[error("{}: file name is not valid UTF-8", .0.display())]
    InvalidFileName(PathBuf),
    #[error("no .xml documents found in {}", .0.display())]
    NoDocuments(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io { path: path.to_owned(), source }
}

// ── ConvertOptions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Require exactly the documents in [`crate::manifest::REQUIRED_DOCUMENTS`].
    pub validate_set: bool,
    pub encode:       EncodeOptions,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self { validate_set: true, encode: EncodeOptions::default() }
    }
}

// ── SegmentSummary ───────────────────────────────────────────────────────────

/// Per-segment description returned by [`inspect`].
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub name:          String,
    pub magic_offset:  usize,
    pub declared_size: usize,
    pub header:        Option<SegmentHeader>,
    /// Codec named by the header's `algo` field, if known.
    pub codec:         Option<&'static str>,
    pub blocks:        Vec<BlockSummary>,
    pub decoded_size:  usize,
    pub warnings:      Vec<String>,
}

// ── Reading ──────────────────────────────────────────────────────────────────

pub fn read_container<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> Result<Outcome<DecodedContainer>, ArchiveError> {
    let path = path.as_ref();
    let buffer = fs::read(path).map_err(io_error(path))?;
    tracing::debug!(path = %path.display(), bytes = buffer.len(), "read archive");
    Ok(decode_with(&buffer, options)?)
}

/// Decode every segment without assembling a container.
pub fn inspect<P: AsRef<Path>>(path: P) -> Result<Outcome<Vec<SegmentSummary>>, ArchiveError> {
    let path = path.as_ref();
    let buffer = fs::read(path).map_err(io_error(path))?;

    let (locations, warnings) = locate_segments(&buffer).map_err(CxbError::from)?.into_parts();
    let summaries = locations
        .into_iter()
        .map(|location| {
            let (segment, seg_warnings) = decode_segment(&buffer, &location).into_parts();
            SegmentSummary {
                name:          location.name,
                magic_offset:  location.magic_offset,
                declared_size: location.declared_size,
                codec:         segment.header.as_ref().and_then(|h| CodecId::from_algo(h.algo)).map(CodecId::name),
                header:        segment.header,
                blocks:        segment.blocks,
                decoded_size:  segment.payload.len(),
                warnings:      seg_warnings.iter().map(ToString::to_string).collect(),
            }
        })
        .collect();
    Ok(Outcome::new(summaries, warnings))
}

/// An entry name is written only if it names a plain file in `dir`.
fn entry_path(dir: &Path, name: &str) -> Option<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(dir.join(name)),
        _ => None,
    }
}

/// Decode `input` and write each entry to `output_dir`.
///
/// A file that cannot be written is logged and skipped; the returned list
/// holds the paths that were written.
pub fn export<P: AsRef<Path>, Q: AsRef<Path>>(
    input:      P,
    output_dir: Q,
    options:    &DecodeOptions,
) -> Result<Outcome<Vec<PathBuf>>, ArchiveError> {
    let output_dir = output_dir.as_ref();
    let (container, warnings) = read_container(input, options)?.into_parts();
    fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;

    let mut written = Vec::with_capacity(container.len());
    for (name, data) in container.iter() {
        let Some(path) = entry_path(output_dir, name) else {
            tracing::error!(entry = name, "refusing to write entry outside the output directory");
            continue;
        };
        match fs::write(&path, data) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), bytes = data.len(), "wrote document");
                written.push(path);
            }
            Err(e) => tracing::error!(path = %path.display(), "failed to write document: {e}"),
        }
    }
    tracing::info!(written = written.len(), entries = container.len(), "export finished");
    Ok(Outcome::new(written, warnings))
}

// ── Writing ──────────────────────────────────────────────────────────────────

/// Every regular `*.xml` file in `dir`, sorted by name.
///
/// A document is named by its file name up to the first `.`.
pub fn collect_documents<P: AsRef<Path>>(dir: P) -> Result<Vec<Document>, ArchiveError> {
    let dir = dir.as_ref();
    let mut documents = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(XML_EXT) {
            continue;
        }
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ArchiveError::InvalidFileName(path.clone()))?;
        let name = file_name.split('.').next().unwrap_or(file_name).to_owned();
        let data = fs::read(&path).map_err(io_error(&path))?;
        documents.push(Document::new(name, data));
    }
    documents.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(documents)
}

/// Build an archive at `output` from the `*.xml` files in `input_dir`.
///
/// Every document is parsed before anything is written; the archive is
/// written in one piece.  Returns the archive size.
pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(
    input_dir: P,
    output:    Q,
    options:   &ConvertOptions,
) -> Result<usize, ArchiveError> {
    let (input_dir, output) = (input_dir.as_ref(), output.as_ref());
    let mut documents = collect_documents(input_dir)?;
    if documents.is_empty() {
        return Err(ArchiveError::NoDocuments(input_dir.to_owned()));
    }
    if options.validate_set {
        validate_document_set(documents.iter().map(|d| d.name.as_str()))?;
    }

    for doc in &mut documents {
        let xml_error = |source: XmlError| ArchiveError::Xml { name: doc.name.clone(), source };
        let parsed = xml::parse(&doc.data).map_err(xml_error)?;
        tracing::debug!(
            document = %doc.name,
            root = parsed.root_name().as_deref().unwrap_or(""),
            events = parsed.events().len(),
            bom = parsed.has_bom(),
            "parsed document"
        );
        doc.data = xml::serialize(&parsed).map_err(xml_error)?;
    }

    let bytes = encode_with(&documents, &options.encode)?;
    fs::write(output, &bytes).map_err(io_error(output))?;
    tracing::info!(path = %output.display(), documents = documents.len(), bytes = bytes.len(), "wrote archive");
    Ok(bytes.len())
}
