//! OPC package access: parts, relationships and content types.

use crate::xml::{attr, attr_i64, escape, local_name};
use hymn_core::{Error, Result, SlideSize};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub(crate) const PRESENTATION_PART: &str = "ppt/presentation.xml";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

pub(crate) const REL_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub(crate) const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub(crate) const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub(crate) const REL_NOTES_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
pub(crate) const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

pub(crate) const SLIDE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
pub(crate) const CORE_PROPERTIES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.core-properties+xml";

/// A `.pptx` held in memory, part name to bytes.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    /// Read every part of an archive.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_reader_filtered(reader, |_| true)
    }

    /// Read only the parts `keep` accepts.
    pub fn from_reader_filtered<R: Read + Seek>(reader: R, keep: impl Fn(&str) -> bool) -> Result<Self> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;
        let mut parts = BTreeMap::new();

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::Zip(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() || !keep(file.name()) {
                continue;
            }
            let name = file.name().to_string();
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)
                .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", name, e)))?;
            parts.insert(name, bytes);
        }

        Ok(Self { parts })
    }

    /// Open a file from disk, all parts.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    /// A part as UTF-8 text.
    pub fn part_str(&self, name: &str) -> Result<&str> {
        let bytes = self
            .part(name)
            .ok_or_else(|| Error::PresentationParse(format!("File not found in archive '{}'", name)))?;
        std::str::from_utf8(bytes)
            .map_err(|e| Error::PresentationParse(format!("'{}' is not UTF-8: {}", name, e)))
    }

    pub fn set_part(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.parts.insert(name.into(), bytes.into());
    }

    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Relationships of `part`; empty when it has none.
    pub fn relationships(&self, part: &str) -> Result<Vec<Relationship>> {
        match self.part(&rels_part_name(part)) {
            Some(bytes) => parse_relationships(&String::from_utf8_lossy(bytes), part),
            None => Ok(Vec::new()),
        }
    }

    pub fn set_relationships(&mut self, part: &str, rels: &[Relationship]) {
        self.set_part(rels_part_name(part), write_relationships(rels, part));
    }

    /// Slide part names in presentation order.
    ///
    /// Follows `sldIdLst`; falls back to the numbers in the relationship ids
    /// when the list is missing.
    pub fn slide_parts(&self) -> Result<Vec<String>> {
        let rels = self.relationships(PRESENTATION_PART)?;
        let slide_rels: Vec<&Relationship> = rels.iter().filter(|r| r.rel_type == REL_SLIDE).collect();

        let order = self.slide_id_order()?;
        if !order.is_empty() {
            return Ok(order
                .iter()
                .filter_map(|id| slide_rels.iter().find(|r| &r.id == id))
                .map(|r| r.target.clone())
                .collect());
        }

        let mut slides: Vec<(String, Option<usize>)> = slide_rels
            .iter()
            .map(|r| {
                let order_num = extract_slide_number(&r.id).or_else(|| extract_slide_number(&r.target));
                (r.target.clone(), order_num)
            })
            .collect();

        // Sort slides by their number
        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    fn slide_id_order(&self) -> Result<Vec<String>> {
        let Some(bytes) = self.part(PRESENTATION_PART) else {
            return Ok(Vec::new());
        };
        let xml = String::from_utf8_lossy(bytes);
        let mut reader = Reader::from_str(&xml);
        let mut ids = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"sldId" => {
                    // The numeric `id` is unprefixed; the relationship id is `r:id`.
                    let rid = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() != b"id" && local_name(a.key.as_ref()) == b"id")
                        .map(|a| String::from_utf8_lossy(&a.value).to_string());
                    ids.extend(rid);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(format!("Error parsing presentation: {}", e))),
                _ => {}
            }
        }

        Ok(ids)
    }

    /// `sldSz` from the presentation part.
    pub fn slide_size(&self) -> Option<SlideSize> {
        let xml = String::from_utf8_lossy(self.part(PRESENTATION_PART)?);
        let mut reader = Reader::from_str(&xml);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"sldSz" => {
                    return Some(SlideSize {
                        width: attr_i64(e, b"cx")?,
                        height: attr_i64(e, b"cy")?,
                    });
                }
                Ok(Event::Eof) | Err(_) => return None,
                _ => {}
            }
        }
    }

    pub fn content_types(&self) -> Result<ContentTypes> {
        ContentTypes::parse(self.part_str(CONTENT_TYPES_PART)?)
    }

    pub fn set_content_types(&mut self, types: &ContentTypes) {
        self.set_part(CONTENT_TYPES_PART, types.to_xml());
    }

    /// Write the package as a ZIP archive, content types first.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let ordered = self
            .parts
            .get_key_value(CONTENT_TYPES_PART)
            .into_iter()
            .chain(self.parts.iter().filter(|(name, _)| *name != CONTENT_TYPES_PART));

        for (name, bytes) in ordered {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::Zip(format!("Failed to add '{}': {}", name, e)))?;
            zip.write_all(bytes)?;
        }

        zip.finish()
            .map_err(|e| Error::Zip(format!("Failed to finish archive: {}", e)))
    }
}

/// One entry of a `.rels` part. Internal targets are stored as absolute
/// part names (`ppt/media/image1.png`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    pub fn internal(id: impl Into<String>, rel_type: &str, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rel_type: rel_type.to_string(),
            target: target.into(),
            external: false,
        }
    }
}

/// The `.rels` part holding relationships of `part`.
pub(crate) fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target against the part that owns it.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = part_dir(source_part).split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Target of `to` written relative to the part `from`.
pub(crate) fn relative_target(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = part_dir(from).split('/').filter(|s| !s.is_empty()).collect();
    let to_parts: Vec<&str> = to.split('/').collect();
    let common = from_dir
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let mut segments: Vec<&str> = vec![".."; from_dir.len() - common];
    segments.extend(&to_parts[common..]);
    segments.join("/")
}

fn parse_relationships(xml: &str, source_part: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"Relationship" => {
                let external = attr(e, b"TargetMode").is_some_and(|m| m == "External");
                let target = attr(e, b"Target").unwrap_or_default();
                rels.push(Relationship {
                    id: attr(e, b"Id").unwrap_or_default(),
                    rel_type: attr(e, b"Type").unwrap_or_default(),
                    target: if external { target } else { resolve_target(source_part, &target) },
                    external,
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    Ok(rels)
}

fn write_relationships(rels: &[Relationship], source_part: &str) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    for rel in rels {
        let (target, mode) = if rel.external {
            (rel.target.clone(), " TargetMode=\"External\"")
        } else {
            (relative_target(source_part, &rel.target), "")
        };
        xml.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"{}/>",
            escape(&rel.id),
            escape(&rel.rel_type),
            escape(&target),
            mode
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// First `rIdN` not used by `rels`.
pub(crate) fn next_relationship_id(rels: &[Relationship]) -> String {
    let max = rels
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId").and_then(|n| n.parse::<usize>().ok()))
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

/// Parsed `[Content_Types].xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// Extension (lower case) to content type.
    pub defaults: Vec<(String, String)>,
    /// Part name (without leading `/`) to content type.
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut types = Self::default();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"Default" => {
                        if let (Some(ext), Some(ct)) = (attr(e, b"Extension"), attr(e, b"ContentType")) {
                            types.defaults.push((ext.to_ascii_lowercase(), ct));
                        }
                    }
                    b"Override" => {
                        if let (Some(part), Some(ct)) = (attr(e, b"PartName"), attr(e, b"ContentType")) {
                            types.overrides.push((part.trim_start_matches('/').to_string(), ct));
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(format!("Error parsing content types: {}", e))),
                _ => {}
            }
        }

        Ok(types)
    }

    /// Content type of a part, override first.
    pub fn lookup(&self, part: &str) -> Option<&str> {
        if let Some((_, ct)) = self.overrides.iter().find(|(p, _)| p == part) {
            return Some(ct);
        }
        let ext = extension(part)?;
        self.defaults
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, ct)| ct.as_str())
    }

    pub fn set_override(&mut self, part: &str, content_type: &str) {
        self.remove_override(part);
        self.overrides.push((part.to_string(), content_type.to_string()));
    }

    pub fn remove_override(&mut self, part: &str) {
        self.overrides.retain(|(p, _)| p != part);
    }

    /// Register a default for the extension unless one exists.
    pub fn ensure_default(&mut self, ext: &str, content_type: &str) {
        let ext = ext.to_ascii_lowercase();
        if !self.defaults.iter().any(|(e, _)| *e == ext) {
            self.defaults.push((ext, content_type.to_string()));
        }
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
        );
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                "<Default Extension=\"{}\" ContentType=\"{}\"/>",
                escape(ext),
                escape(ct)
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                "<Override PartName=\"/{}\" ContentType=\"{}\"/>",
                escape(part),
                escape(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

/// Lower-case extension of a part name.
pub(crate) fn extension(part: &str) -> Option<String> {
    let file = part.rsplit('/').next()?;
    file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Content type for common media extensions.
pub(crate) fn media_content_type(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => return None,
    })
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
pub(crate) fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
