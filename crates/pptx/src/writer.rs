//! Service deck writer.
//!
//! The output starts as a copy of the base template: its masters, layouts
//! and theme stay, its slides are removed. Generated slides (summary,
//! section titles, communion and offertory framing) are built from
//! DrawingML snippets; content slides are copied from their source decks
//! shape by shape, together with the images they use.

use crate::drawing::{
    inches, picture_xml, rect_in, slide_xml, Para, ShapeSpec, CAPTION_FONT, HEADER_FONT, NOTE_FONT, RECOLOR_FILL,
    SECTION_LABEL_FONT, SECTION_LINE_FONT, SUMMARY_HEADING_FONT, SUMMARY_LABEL_FONT, SUMMARY_LINE_FONT,
    TITLE_BAR_FONT,
};
use crate::package::{
    extension, extract_slide_number, media_content_type, next_relationship_id, ContentTypes, Package, Relationship,
    CORE_PROPERTIES_CONTENT_TYPE, PRESENTATION_PART, REL_CORE_PROPERTIES, REL_IMAGE, REL_NOTES_SLIDE, REL_SLIDE,
    REL_SLIDE_LAYOUT, SLIDE_CONTENT_TYPE,
};
use crate::shapes::ShapeTree;
use crate::xml::{attr, element_spans, escape, first_element, local_name, max_shape_id, relationship_refs, remap_quoted};
use hymn_core::assembly::{SUMMARY_HEADING, UEN_TEXT};
use hymn_core::{
    AssembledDeck, AssembledSlide, ContentSlide, DeckWriter, Error, Rect, Result, ShapeAction, SlideSize, SummaryEntry,
    TitleSlide,
};
use log::{debug, info, warn};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static SERVICE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d{1,2}\s+(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{4}",
    )
    .unwrap()
});

static RUN_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(<a:t>)([^<]*)(</a:t>)").unwrap());

/// Fill elements a shape's `spPr` may carry, any of which is the shape fill.
const FILL_ELEMENTS: &[&str] = &["noFill", "solidFill", "gradFill", "pattFill", "blipFill", "grpFill"];

/// Relationship types whose targets are copied along with a cloned slide.
const MEDIA_RELATIONSHIPS: &[&str] = &["/image", "/media", "/video", "/audio"];

const DEFAULT_CORE_PART: &str = "docProps/core.xml";

/// Images the generated slides use. Missing ones are left out.
#[derive(Debug, Clone, Default)]
pub struct DeckImages {
    pub communion: Option<PathBuf>,
    pub qr_code: Option<PathBuf>,
    /// Full-slide background behind section titles.
    pub title_background: Option<PathBuf>,
}

/// Source decks content slides are copied from, by path.
pub type SourceDecks = HashMap<PathBuf, Package>;

/// Writes [`AssembledDeck`]s as `.pptx` files based on a template deck.
#[derive(Debug, Clone)]
pub struct PptxDeckWriter {
    template: Package,
    images: DeckImages,
}

impl PptxDeckWriter {
    /// Load the base template. A missing file is [`Error::TemplateNotFound`].
    pub fn from_template(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::TemplateNotFound(path.to_path_buf()));
        }
        info!("Using template: {}", path.display());
        Ok(Self::from_package(Package::open(path)?))
    }

    pub fn from_package(template: Package) -> Self {
        Self {
            template,
            images: DeckImages::default(),
        }
    }

    pub fn with_images(mut self, images: DeckImages) -> Self {
        self.images = images;
        self
    }

    /// Build the output package. `title` becomes the document title.
    ///
    /// Returns the package and the number of slides in it.
    pub fn build(&self, deck: &AssembledDeck, sources: &SourceDecks, title: &str) -> Result<(Package, usize)> {
        let mut builder = DeckBuilder::new(self, deck)?;

        for (i, slide) in deck.slides.iter().enumerate() {
            if let Err(e) = builder.add(slide, sources) {
                warn!("Slide {} could not be written, skipping: {}", i + 1, e);
            }
        }

        builder.finish(title)
    }
}

impl DeckWriter for PptxDeckWriter {
    fn write(&self, deck: &AssembledDeck, output: &Path) -> Result<usize> {
        let mut sources = SourceDecks::new();
        for path in deck.source_files() {
            match Package::open(path) {
                Ok(package) => {
                    sources.insert(path.to_path_buf(), package);
                }
                Err(e) => warn!("Could not reopen {}: {}", path.display(), e),
            }
        }

        let title = output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let (package, count) = self.build(deck, &sources, &title)?;

        let file = std::fs::File::create(output)
            .map_err(|e| Error::Write(format!("Failed to create {}: {}", output.display(), e)))?;
        package.write_to(std::io::BufWriter::new(file))?;

        info!("Saved {} slides to {}", count, output.display());
        Ok(count)
    }
}

/// Generated images, added to the package on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FixedImage {
    Communion,
    QrCode,
    TitleBackground,
}

/// Shapes and relationships of one output slide.
struct SlideParts {
    shapes: String,
    rels: Vec<Relationship>,
    next_id: u32,
}

impl SlideParts {
    fn new(layout: &str) -> Self {
        Self {
            shapes: String::new(),
            rels: vec![Relationship::internal("rId1", REL_SLIDE_LAYOUT, layout)],
            next_id: 2,
        }
    }

    fn add(&mut self, spec: ShapeSpec) {
        let id = self.take_id();
        self.shapes.push_str(&spec.to_xml(id));
    }

    fn add_picture(&mut self, name: &str, media: &str, bounds: &Rect) {
        let rid = next_relationship_id(&self.rels);
        self.rels.push(Relationship::internal(rid.clone(), REL_IMAGE, media));
        let id = self.take_id();
        self.shapes.push_str(&picture_xml(id, name, &rid, bounds));
    }

    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

struct DeckBuilder<'w> {
    writer: &'w PptxDeckWriter,
    package: Package,
    content_types: ContentTypes,
    size: SlideSize,
    title_layout: String,
    content_layout: String,
    header: String,
    footer: String,
    author: String,
    subject: String,
    slides: Vec<String>,
    /// (source deck, source part) to copied part.
    media: HashMap<(PathBuf, String), String>,
    fixed_images: HashMap<FixedImage, Option<String>>,
}

impl<'w> DeckBuilder<'w> {
    fn new(writer: &'w PptxDeckWriter, deck: &AssembledDeck) -> Result<Self> {
        let mut package = writer.template.clone();
        let mut content_types = package.content_types()?;

        remove_slides(&mut package, &mut content_types)?;
        if !deck.service_date.is_empty() {
            replace_master_dates(&mut package, &deck.service_date)?;
        }
        let (title_layout, content_layout) = choose_layouts(&package)?;
        debug!("Layouts: title {}, content {}", title_layout, content_layout);

        Ok(Self {
            writer,
            size: package.slide_size().unwrap_or_default(),
            package,
            content_types,
            title_layout,
            content_layout,
            header: deck.header.clone(),
            footer: deck.footer.clone(),
            author: deck.header.clone(),
            subject: deck.service_name.clone(),
            slides: Vec::new(),
            media: HashMap::new(),
            fixed_images: HashMap::new(),
        })
    }

    fn add(&mut self, slide: &AssembledSlide, sources: &SourceDecks) -> Result<()> {
        let (xml, rels) = match slide {
            AssembledSlide::Summary(entries) => self.summary_slide(entries),
            AssembledSlide::SectionTitle(title) => self.section_title_slide(title),
            AssembledSlide::Message => self.section_title_slide(&TitleSlide {
                label: "Message".to_string(),
                hymn_line: None,
                title: None,
                note: None,
            }),
            AssembledSlide::CommunionIntro { heading, note } => self.communion_slide(heading, note.as_deref()),
            AssembledSlide::OffertoryQr { heading } => self.offertory_slide(heading),
            AssembledSlide::Content(content) => self.content_slide(content, sources)?,
        };

        let part = self.next_slide_part();
        self.package.set_part(part.clone(), xml);
        self.package.set_relationships(&part, &rels);
        self.content_types.set_override(&part, SLIDE_CONTENT_TYPE);
        self.slides.push(part);
        Ok(())
    }

    fn next_slide_part(&self) -> String {
        (self.slides.len() + 1..)
            .map(|n| format!("ppt/slides/slide{n}.xml"))
            .find(|name| !self.package.contains(name))
            .unwrap_or_default()
    }

    fn summary_slide(&mut self, entries: &[SummaryEntry]) -> (String, Vec<Relationship>) {
        let mut parts = SlideParts::new(&self.title_layout);
        parts.add(ShapeSpec::title_bar(self.size.width, SUMMARY_HEADING, SUMMARY_HEADING_FONT));

        let mut paragraphs = Vec::new();
        for entry in entries {
            if entry.show_label {
                paragraphs.push(Para::new(&entry.label, SUMMARY_LABEL_FONT).spaced(4));
            }
            if let Some(line) = entry.detail_line() {
                paragraphs.push(Para::new(line, SUMMARY_LINE_FONT));
            }
        }
        parts.add(ShapeSpec::text_box("SummaryContent", rect_in(1.5, 0.8, 7.0, 5.5), paragraphs).top_aligned());

        (slide_xml(&parts.shapes), parts.rels)
    }

    fn section_title_slide(&mut self, title: &TitleSlide) -> (String, Vec<Relationship>) {
        let mut parts = SlideParts::new(&self.title_layout);
        let width = self.size.width;

        if let Some(background) = self.fixed_image(FixedImage::TitleBackground) {
            parts.add_picture("Background", &background, &Rect::new(0, 0, width, self.size.height));
        }
        parts.add(
            ShapeSpec::text_box("Header", Rect::new(0, 150_000, width, 400_000), vec![Para::new(&self.header, HEADER_FONT)])
                .unwrapped(),
        );
        parts.add(
            ShapeSpec::text_box(
                "Footer",
                Rect::new(0, self.size.height - 443_500, width, 400_000),
                vec![Para::new(&self.footer, HEADER_FONT)],
            )
            .unwrapped(),
        );

        let has_details = title.hymn_line.is_some() || title.title.is_some() || title.note.is_some();
        if has_details {
            parts.add(ShapeSpec::title_box(Rect::new(1_127_800, 1_238_150, 6_892_935, 2_257_244)));
        }

        let mut paragraphs = vec![Para::new(&title.label, SECTION_LABEL_FONT)];
        paragraphs.extend(title.hymn_line.iter().map(|l| Para::new(l, SECTION_LINE_FONT)));
        paragraphs.extend(title.title.iter().map(|t| Para::new(t, SECTION_LINE_FONT)));
        paragraphs.extend(title.note.iter().map(|n| Para::new(n, NOTE_FONT)));

        let text_area = if has_details {
            Rect::new(1_239_143, 1_338_150, 6_661_177, 2_157_244)
        } else {
            Rect::new(1_239_143, 1_654_612, 6_661_177, 2_904_342)
        };
        parts.add(ShapeSpec::text_box("Section Title", text_area, paragraphs));

        (slide_xml(&parts.shapes), parts.rels)
    }

    fn communion_slide(&mut self, heading: &str, note: Option<&str>) -> (String, Vec<Relationship>) {
        let mut parts = SlideParts::new(&self.content_layout);
        parts.add(ShapeSpec::title_bar(self.size.width, heading, TITLE_BAR_FONT));

        let image_area = rect_in(1.673, 0.772, 6.654, 4.437);
        if let Some(image) = self.fixed_image(FixedImage::Communion) {
            parts.add_picture("Holy Communion", &image, &image_area);
        }
        if let Some(note) = note {
            let below = Rect::new(0, image_area.y + image_area.height, self.size.width, 600_000);
            parts.add(ShapeSpec::text_box("Note", below, vec![Para::new(note, NOTE_FONT)]));
        }

        (slide_xml(&parts.shapes), parts.rels)
    }

    fn offertory_slide(&mut self, heading: &str) -> (String, Vec<Relationship>) {
        let mut parts = SlideParts::new(&self.content_layout);
        parts.add(ShapeSpec::title_bar(self.size.width, heading, TITLE_BAR_FONT));
        let qr = self.qr_shapes(&mut parts.rels, &mut parts.next_id);
        parts.shapes.push_str(&qr);
        (slide_xml(&parts.shapes), parts.rels)
    }

    /// QR code and UEN caption, or nothing when the image is unavailable.
    fn qr_shapes(&mut self, rels: &mut Vec<Relationship>, next_id: &mut u32) -> String {
        let Some(image) = self.fixed_image(FixedImage::QrCode) else {
            return String::new();
        };

        let bounds = rect_in(6.97, 1.08, 3.04, 3.13);
        let rid = next_relationship_id(rels);
        rels.push(Relationship::internal(rid.clone(), REL_IMAGE, image));

        let caption = Rect::new(bounds.x, bounds.y + bounds.height + inches(0.1), bounds.width, inches(0.3));
        let mut xml = picture_xml(*next_id, "QR Code", &rid, &bounds);
        xml.push_str(
            &ShapeSpec::text_box("UEN", caption, vec![Para::new(UEN_TEXT, CAPTION_FONT)])
                .unwrapped()
                .to_xml(*next_id + 1),
        );
        *next_id += 2;
        xml
    }

    /// Copy a source slide, applying the per-shape actions.
    fn content_slide(&mut self, content: &ContentSlide, sources: &SourceDecks) -> Result<(String, Vec<Relationship>)> {
        let source = sources
            .get(&content.source)
            .ok_or_else(|| Error::PresentationParse(format!("{} is not open", content.source.display())))?;
        let slide_parts = source.slide_parts()?;
        let part = content
            .slide_index
            .checked_sub(1)
            .and_then(|i| slide_parts.get(i))
            .ok_or_else(|| {
                Error::PresentationParse(format!("{} has no slide {}", content.source.display(), content.slide_index))
            })?;

        // Animations refer to shapes by id and may point at dropped ones.
        let xml = strip_elements(source.part_str(part)?, "timing")?;
        let tree = ShapeTree::parse(&xml)?;
        if tree.shapes.len() != content.actions.len() {
            warn!(
                "{} slide {}: {} shapes but {} actions",
                content.source.display(),
                content.slide_index,
                tree.shapes.len(),
                content.actions.len()
            );
        }

        let source_rels = source.relationships(part)?;
        let mut carry = Carry {
            source,
            source_path: &content.source,
            source_rels: &source_rels,
            rels: vec![Relationship::internal("rId1", REL_SLIDE_LAYOUT, self.content_layout.clone())],
            map: Vec::new(),
        };

        let mut prefix = xml[..tree.content_start].to_string();
        if let Err(e) = self.carry(&mut carry, &prefix) {
            warn!("{} slide {}: dropping background: {}", content.source.display(), content.slide_index, e);
            prefix = strip_elements(&prefix, "bg")?;
        }
        let mut suffix = xml[tree.insert_at..].to_string();
        if let Err(e) = self.carry(&mut carry, &suffix) {
            warn!("{} slide {}: dropping transition: {}", content.source.display(), content.slide_index, e);
            suffix = strip_elements(&suffix, "transition")?;
        }

        let mut kept = String::new();
        for (i, span) in tree.shapes.iter().enumerate() {
            let action = content.actions.get(i).cloned().unwrap_or_else(ShapeAction::keep);
            let ShapeAction::Keep { relabel, recolor } = action else {
                continue;
            };

            let mut fragment = xml[span.clone()].to_string();
            if let Err(e) = self.carry(&mut carry, &fragment) {
                warn!(
                    "{} slide {}: dropping shape {}: {}",
                    content.source.display(),
                    content.slide_index,
                    i + 1,
                    e
                );
                continue;
            }
            if let Some(text) = relabel {
                fragment = relabel_text(&fragment, &text)?;
            }
            if recolor {
                fragment = recolor_fill(&fragment, RECOLOR_FILL)?;
            }
            kept.push_str(&fragment);
        }

        let Carry { mut rels, map, .. } = carry;
        let mut next_id = max_shape_id(&xml) + 1;
        let mut added = String::new();
        if let Some(heading) = &content.add_title_bar {
            added.push_str(&ShapeSpec::title_bar(self.size.width, heading, TITLE_BAR_FONT).to_xml(next_id));
            next_id += 1;
        }
        if content.add_qr {
            added.push_str(&self.qr_shapes(&mut rels, &mut next_id));
        }

        let xml = format!(
            "{}{}{}{}",
            remap_quoted(&prefix, &map),
            remap_quoted(&kept, &map),
            added,
            remap_quoted(&suffix, &map)
        );
        Ok((xml, rels))
    }

    /// Bring every relationship `xml` refers to into the new slide.
    fn carry(&mut self, carry: &mut Carry<'_>, xml: &str) -> Result<()> {
        let source_rels = carry.source_rels;
        for rid in relationship_refs(xml)? {
            if carry.map.iter().any(|(old, _)| *old == rid) {
                continue;
            }
            let rel = source_rels
                .iter()
                .find(|r| r.id == rid)
                .ok_or_else(|| Error::PresentationParse(format!("relationship {rid} is missing")))?;

            let new_id = next_relationship_id(&carry.rels);
            if rel.external {
                carry.rels.push(Relationship {
                    id: new_id.clone(),
                    ..rel.clone()
                });
            } else if MEDIA_RELATIONSHIPS.iter().any(|t| rel.rel_type.ends_with(t)) {
                let target = self.copy_media(carry.source, carry.source_path, &rel.target)?;
                carry.rels.push(Relationship::internal(new_id.clone(), &rel.rel_type, target));
            } else {
                return Err(Error::PresentationParse(format!(
                    "cannot copy {} relationship {rid}",
                    rel.rel_type.rsplit('/').next().unwrap_or_default()
                )));
            }
            carry.map.push((rid, new_id));
        }
        Ok(())
    }

    fn copy_media(&mut self, source: &Package, source_path: &Path, target: &str) -> Result<String> {
        let key = (source_path.to_path_buf(), target.to_string());
        if let Some(name) = self.media.get(&key) {
            return Ok(name.clone());
        }

        let bytes = source
            .part(target)
            .ok_or_else(|| Error::PresentationParse(format!("{target} is missing from the source deck")))?;
        let ext = extension(target).unwrap_or_else(|| "bin".to_string());
        let content_type = source
            .content_types()
            .ok()
            .and_then(|types| types.lookup(target).map(str::to_string))
            .or_else(|| media_content_type(&ext).map(str::to_string))
            .ok_or_else(|| Error::UnsupportedFormat(format!("no content type for {target}")))?;

        let name = self.add_media(&ext, &content_type, bytes.to_vec());
        self.media.insert(key, name.clone());
        Ok(name)
    }

    fn add_media(&mut self, ext: &str, content_type: &str, bytes: Vec<u8>) -> String {
        let name = (1..)
            .map(|n| format!("ppt/media/hymnal{n}.{ext}"))
            .find(|name| !self.package.contains(name))
            .unwrap_or_default();
        self.content_types.ensure_default(ext, content_type);
        self.package.set_part(name.clone(), bytes);
        name
    }

    /// Part name of a configured image, loading it on first use.
    fn fixed_image(&mut self, image: FixedImage) -> Option<String> {
        if let Some(cached) = self.fixed_images.get(&image) {
            return cached.clone();
        }

        let path = match image {
            FixedImage::Communion => self.writer.images.communion.clone(),
            FixedImage::QrCode => self.writer.images.qr_code.clone(),
            FixedImage::TitleBackground => self.writer.images.title_background.clone(),
        };
        let part = path.and_then(|path| {
            let ext = extension(&path.to_string_lossy())?;
            let Some(content_type) = media_content_type(&ext) else {
                warn!("Unsupported image type: {}", path.display());
                return None;
            };
            match std::fs::read(&path) {
                Ok(bytes) => Some(self.add_media(&ext, content_type, bytes)),
                Err(e) => {
                    warn!("Could not read image {}: {}", path.display(), e);
                    None
                }
            }
        });

        self.fixed_images.insert(image, part.clone());
        part
    }

    fn finish(mut self, title: &str) -> Result<(Package, usize)> {
        self.write_slide_list()?;
        remove_orphan_media(&mut self.package, &mut self.content_types)?;
        self.write_core_properties(title)?;
        self.package.set_content_types(&self.content_types);
        let count = self.slides.len();
        Ok((self.package, count))
    }

    fn write_slide_list(&mut self) -> Result<()> {
        let xml = self.package.part_str(PRESENTATION_PART)?.to_string();
        let mut rels = self.package.relationships(PRESENTATION_PART)?;

        let mut ids = String::new();
        for (i, part) in self.slides.iter().enumerate() {
            let rid = next_relationship_id(&rels);
            ids.push_str(&format!("<p:sldId id=\"{}\" r:id=\"{}\"/>", 256 + i, rid));
            rels.push(Relationship::internal(rid, REL_SLIDE, part.clone()));
        }
        let list = format!("<p:sldIdLst>{ids}</p:sldIdLst>");

        let xml = strip_elements(&xml, "sectionLst")?;
        let xml = match first_element(&xml, "sldIdLst")? {
            Some(span) => splice(&xml, span, &list),
            None => {
                let at = first_element(&xml, "sldSz")?
                    .map(|span| span.start)
                    .ok_or_else(|| Error::PresentationParse("presentation.xml has no sldSz".to_string()))?;
                splice(&xml, at..at, &list)
            }
        };

        self.package.set_part(PRESENTATION_PART, xml);
        self.package.set_relationships(PRESENTATION_PART, &rels);
        Ok(())
    }

    fn write_core_properties(&mut self, title: &str) -> Result<()> {
        let mut root = self.package.relationships("")?;
        let existing = root
            .iter()
            .find(|r| r.rel_type == REL_CORE_PROPERTIES)
            .map(|r| r.target.clone());
        let part = match existing {
            Some(target) => target,
            None => {
                let rid = next_relationship_id(&root);
                root.push(Relationship::internal(rid, REL_CORE_PROPERTIES, DEFAULT_CORE_PART));
                self.package.set_relationships("", &root);
                DEFAULT_CORE_PART.to_string()
            }
        };

        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
             xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
             xmlns:dcmitype=\"http://purl.org/dc/dcmitype/\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
             <dc:title>{}</dc:title><dc:subject>{}</dc:subject><dc:creator>{}</dc:creator>\
             <cp:lastModifiedBy>{}</cp:lastModifiedBy></cp:coreProperties>",
            escape(title),
            escape(&self.subject),
            escape(&self.author),
            escape(&self.author)
        );
        self.package.set_part(part.clone(), xml);
        self.content_types.set_override(&part, CORE_PROPERTIES_CONTENT_TYPE);
        Ok(())
    }
}

/// Relationship bookkeeping while one slide is copied.
struct Carry<'s> {
    source: &'s Package,
    source_path: &'s Path,
    source_rels: &'s [Relationship],
    rels: Vec<Relationship>,
    /// Source relationship id to output id.
    map: Vec<(String, String)>,
}

/// Drop the template's own slides along with their notes.
fn remove_slides(package: &mut Package, content_types: &mut ContentTypes) -> Result<()> {
    let rels = package.relationships(PRESENTATION_PART)?;
    let (slides, kept): (Vec<Relationship>, Vec<Relationship>) =
        rels.into_iter().partition(|r| r.rel_type == REL_SLIDE);

    for slide in &slides {
        for rel in package.relationships(&slide.target)? {
            if rel.rel_type == REL_NOTES_SLIDE {
                remove_part(package, content_types, &rel.target);
            }
        }
        remove_part(package, content_types, &slide.target);
    }

    package.set_relationships(PRESENTATION_PART, &kept);
    debug!("Removed {} template slides", slides.len());
    Ok(())
}

fn remove_part(package: &mut Package, content_types: &mut ContentTypes, part: &str) {
    package.remove_part(part);
    package.remove_part(&crate::package::rels_part_name(part));
    content_types.remove_override(part);
}

/// Media parts nothing links to any more.
fn remove_orphan_media(package: &mut Package, content_types: &mut ContentTypes) -> Result<()> {
    let owners: Vec<String> = package
        .part_names()
        .filter_map(rels_owner)
        .collect();

    let mut referenced = HashSet::new();
    for owner in owners {
        for rel in package.relationships(&owner)? {
            if !rel.external {
                referenced.insert(rel.target);
            }
        }
    }

    let orphans: Vec<String> = package
        .part_names()
        .filter(|name| name.starts_with("ppt/media/") && !referenced.contains(*name))
        .map(str::to_string)
        .collect();
    for orphan in orphans {
        debug!("Removing unused {}", orphan);
        remove_part(package, content_types, &orphan);
    }
    Ok(())
}

/// The part a `.rels` part belongs to.
fn rels_owner(rels_part: &str) -> Option<String> {
    let stripped = rels_part.strip_suffix(".rels")?;
    if let Some(file) = stripped.strip_prefix("_rels/") {
        return Some(file.to_string());
    }
    let (dir, file) = stripped.split_once("/_rels/")?;
    Some(format!("{dir}/{file}"))
}

/// Put the service date into date text on masters and layouts.
fn replace_master_dates(package: &mut Package, service_date: &str) -> Result<()> {
    let targets: Vec<String> = package
        .part_names()
        .filter(|name| {
            (name.starts_with("ppt/slideMasters/") || name.starts_with("ppt/slideLayouts/"))
                && name.ends_with(".xml")
                && !name.contains("/_rels/")
        })
        .map(str::to_string)
        .collect();
    let replacement = escape(service_date);

    for part in targets {
        let xml = package.part_str(&part)?;
        if !SERVICE_DATE.is_match(xml) {
            continue;
        }
        let updated = RUN_TEXT
            .replace_all(xml, |caps: &regex::Captures<'_>| {
                format!(
                    "{}{}{}",
                    &caps[1],
                    SERVICE_DATE.replace_all(&caps[2], regex::NoExpand(&replacement)),
                    &caps[3]
                )
            })
            .into_owned();
        if updated != xml {
            debug!("Updated service date in {}", part);
            package.set_part(part, updated);
        }
    }
    Ok(())
}

/// Title and content layouts, as part names.
///
/// The title layout is the first whose name mentions "English" or "HC",
/// else the first layout; the content layout is "1_Blank", else the last.
fn choose_layouts(package: &Package) -> Result<(String, String)> {
    let mut layouts: Vec<(usize, String)> = package
        .part_names()
        .filter(|name| name.starts_with("ppt/slideLayouts/slideLayout") && name.ends_with(".xml"))
        .map(|name| (extract_slide_number(name).unwrap_or(usize::MAX), name.to_string()))
        .collect();
    layouts.sort();

    let named: Vec<(String, String)> = layouts
        .into_iter()
        .map(|(_, part)| {
            let name = package.part_str(&part).ok().and_then(layout_name).unwrap_or_default();
            (part, name)
        })
        .collect();

    let (first, last) = match (named.first(), named.last()) {
        (Some(first), Some(last)) => (first.0.clone(), last.0.clone()),
        _ => return Err(Error::PresentationParse("Template has no slide layouts".to_string())),
    };
    let title = named
        .iter()
        .find(|(_, name)| name.contains("English") || name.contains("HC"))
        .map(|(part, _)| part.clone())
        .unwrap_or(first);
    let content = named
        .iter()
        .find(|(_, name)| name == "1_Blank")
        .map(|(part, _)| part.clone())
        .unwrap_or(last);

    Ok((title, content))
}

/// `name` of a layout's `cSld`.
fn layout_name(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if local_name(e.name().as_ref()) == b"cSld" => {
                return attr(e, b"name");
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Replace the text of a cloned title bar, keeping its first run's formatting.
fn relabel_text(fragment: &str, text: &str) -> Result<String> {
    let Some(body) = first_element(fragment, "txBody")? else {
        return Ok(fragment.to_string());
    };
    let inner = &fragment[body.clone()];
    let tag: String = inner[1..]
        .chars()
        .take_while(|c| *c != '>' && *c != '/' && !c.is_whitespace())
        .collect();

    let piece = |name: &str| -> Result<String> {
        Ok(first_element(inner, name)?
            .map(|span| inner[span].to_string())
            .unwrap_or_default())
    };
    let body_pr = piece("bodyPr")?;
    let body_pr = if body_pr.is_empty() { "<a:bodyPr/>".to_string() } else { body_pr };

    let replaced = format!(
        "<{tag}>{body_pr}{}<a:p>{}<a:r>{}<a:t>{}</a:t></a:r></a:p></{tag}>",
        piece("lstStyle")?,
        piece("pPr")?,
        piece("rPr")?,
        escape(text)
    );
    Ok(splice(fragment, body, &replaced))
}

/// Repaint the fill of a shape.
fn recolor_fill(fragment: &str, color: &str) -> Result<String> {
    let Some(sp_pr) = first_element(fragment, "spPr")? else {
        return Ok(fragment.to_string());
    };
    let inner = &fragment[sp_pr.clone()];
    let fill_xml = format!("<a:solidFill><a:srgbClr val=\"{color}\"/></a:solidFill>");

    // The line has fills of its own; only fills before it belong to the shape.
    let line_start = first_element(inner, "ln")?.map(|span| span.start).unwrap_or(inner.len());
    let mut fill: Option<Range<usize>> = None;
    for name in FILL_ELEMENTS {
        if let Some(span) = first_element(inner, name)? {
            if span.start < line_start && fill.as_ref().map_or(true, |f| span.start < f.start) {
                fill = Some(span);
            }
        }
    }

    let updated = match fill {
        Some(span) => splice(inner, span, &fill_xml),
        None => {
            let anchor = match first_element(inner, "prstGeom")? {
                Some(span) => Some(span),
                None => match first_element(inner, "custGeom")? {
                    Some(span) => Some(span),
                    None => first_element(inner, "xfrm")?,
                },
            };
            match anchor {
                Some(span) => splice(inner, span.end..span.end, &fill_xml),
                None => return Ok(fragment.to_string()),
            }
        }
    };
    Ok(splice(fragment, sp_pr, &updated))
}

fn strip_elements(xml: &str, name: &str) -> Result<String> {
    let spans = element_spans(xml, name)?;
    let mut out = String::with_capacity(xml.len());
    let mut last = 0;
    for span in spans {
        out.push_str(&xml[last..span.start]);
        last = span.end;
    }
    out.push_str(&xml[last..]);
    Ok(out)
}

fn splice(s: &str, range: Range<usize>, with: &str) -> String {
    format!("{}{}{}", &s[..range.start], with, &s[range.end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::parser::PptxParser;
    use hymn_core::ShapeKind;
    use std::io::Cursor;

    fn deck(slides: Vec<AssembledSlide>) -> AssembledDeck {
        AssembledDeck {
            header: "Mar Thoma Syrian Church, Singapore".into(),
            footer: "English Holy Communion Service – 08 February 2026".into(),
            service_name: "English Holy Communion Service".into(),
            service_date: "08 February 2026".into(),
            slides,
            unresolved: Vec::new(),
        }
    }

    fn source() -> SourceDecks {
        let package = fixtures::deck_package(&[&[
            fixtures::title_bar("Opening Hymn No 91"),
            fixtures::body("Praise to the Lord\nthe Almighty"),
            fixtures::footer("Opening: 1 of 5"),
            fixtures::picture("rId2", 6_400_000),
        ]]);
        HashMap::from([(PathBuf::from("src.pptx"), package)])
    }

    fn content(actions: Vec<ShapeAction>) -> AssembledSlide {
        let preview = hymn_core::ExtractedSlide::new(1);
        AssembledSlide::Content(ContentSlide {
            source: PathBuf::from("src.pptx"),
            slide_index: 1,
            actions,
            preview,
            add_title_bar: None,
            add_qr: false,
            entry: 0,
        })
    }

    fn template() -> PptxDeckWriter {
        PptxDeckWriter::from_package(fixtures::deck_package(&[&[fixtures::body("Template slide")]]))
    }

    fn reparse(package: &Package) -> hymn_core::Presentation {
        let bytes = package.write_to(Cursor::new(Vec::new())).unwrap().into_inner();
        PptxParser::new().parse(Cursor::new(bytes), "out.pptx").unwrap()
    }

    #[test]
    fn test_missing_template() {
        match PptxDeckWriter::from_template(Path::new("/nonexistent/template.pptx")) {
            Err(Error::TemplateNotFound(path)) => assert_eq!(path, PathBuf::from("/nonexistent/template.pptx")),
            other => panic!("expected TemplateNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_generated_slides_replace_template_slides() {
        let summary = AssembledSlide::Summary(vec![SummaryEntry {
            label: "Opening".into(),
            show_label: true,
            hymn_number: Some("91".into()),
            title: Some("Praise to the Lord".into()),
        }]);
        let title = AssembledSlide::SectionTitle(TitleSlide {
            label: "Closing".into(),
            hymn_line: Some("Hymn No 777".into()),
            title: None,
            note: Some("(Song not found)".into()),
        });
        let input = deck(vec![summary, title, AssembledSlide::Message]);

        let (package, count) = template().build(&input, &SourceDecks::new(), "8 Feb 2026 - HCS").unwrap();
        assert_eq!(count, 3);

        let out = reparse(&package);
        assert_eq!(out.slides.len(), 3);
        assert!(!out.slides.iter().any(|s| s.all_text().contains("Template slide")));
        assert_eq!(out.slides[0].all_text(), "Song list Opening\n91 Praise to the Lord");
        assert!(out.slides[1].all_text().contains("Closing\nHymn No 777\n(Song not found)"));
        assert!(out.slides[1].all_text().contains("English Holy Communion Service – 08 February 2026"));
        assert!(out.slides[2].all_text().contains("Message"));

        // Unused template media is gone, core properties are rewritten.
        assert!(!package.contains("ppt/media/image1.png"));
        let core = package.part_str("docProps/core.xml").unwrap();
        assert!(core.contains("<dc:title>8 Feb 2026 - HCS</dc:title>"));
        assert!(core.contains("<dc:subject>English Holy Communion Service</dc:subject>"));
    }

    #[test]
    fn test_layouts_and_master_dates() {
        let (package, _) = template()
            .build(&deck(vec![AssembledSlide::Message, content(vec![ShapeAction::keep(); 4])]), &source(), "x")
            .unwrap();

        let message_rels = package.relationships("ppt/slides/slide1.xml").unwrap();
        assert_eq!(message_rels[0].target, "ppt/slideLayouts/slideLayout2.xml");
        let content_rels = package.relationships("ppt/slides/slide2.xml").unwrap();
        assert_eq!(content_rels[0].target, "ppt/slideLayouts/slideLayout3.xml");

        assert!(package
            .part_str("ppt/slideMasters/slideMaster1.xml")
            .unwrap()
            .contains("Service on 08 February 2026"));
        assert!(package
            .part_str("ppt/slideLayouts/slideLayout1.xml")
            .unwrap()
            .contains("Service – 08 February 2026"));
    }

    #[test]
    fn test_content_slide_actions() {
        let actions = vec![
            ShapeAction::Keep {
                relabel: Some("Confession: Hymn No 91".into()),
                recolor: true,
            },
            ShapeAction::keep(),
            ShapeAction::Drop,
            ShapeAction::Drop,
        ];
        let (package, _) = template().build(&deck(vec![content(actions)]), &source(), "x").unwrap();

        let out = reparse(&package);
        let slide = &out.slides[0];
        assert_eq!(slide.shapes.len(), 2);
        assert_eq!(slide.shapes[0].text, "Confession: Hymn No 91");
        assert_eq!(slide.shapes[1].text, "Praise to the Lord\nthe Almighty");
        assert_eq!(slide.pictures().count(), 0);

        let xml = package.part_str("ppt/slides/slide1.xml").unwrap();
        assert!(xml.contains("srgbClr val=\"E8D3D3\""));
        assert!(!xml.contains("<p:timing>"));
        // Only the layout relationship remains; the dropped picture's image is not copied.
        assert_eq!(package.relationships("ppt/slides/slide1.xml").unwrap().len(), 1);
        assert!(!package.part_names().any(|n| n.starts_with("ppt/media/")));
    }

    #[test]
    fn test_kept_pictures_bring_their_images() {
        let mut slides = Vec::new();
        for _ in 0..2 {
            slides.push(content(vec![ShapeAction::keep(); 4]));
        }
        let (package, _) = template().build(&deck(slides), &source(), "x").unwrap();

        let rels = package.relationships("ppt/slides/slide2.xml").unwrap();
        let image = rels.iter().find(|r| r.rel_type == REL_IMAGE).unwrap();
        assert_eq!(image.target, "ppt/media/hymnal1.png");
        assert_eq!(package.part(&image.target), Some(fixtures::PNG));
        // Shared between both copies of the slide.
        assert_eq!(package.part_names().filter(|n| n.starts_with("ppt/media/")).count(), 1);

        let xml = package.part_str("ppt/slides/slide2.xml").unwrap();
        assert!(xml.contains(&format!("r:embed=\"{}\"", image.id)));
        assert_eq!(reparse(&package).slides[1].pictures().count(), 1);
    }

    #[test]
    fn test_shape_with_unknown_relationship_is_dropped() {
        let mut sources = source();
        let package = sources.get_mut(Path::new("src.pptx")).unwrap();
        package.set_relationships(
            "ppt/slides/slide1.xml",
            &[Relationship::internal("rId1", REL_SLIDE_LAYOUT, "ppt/slideLayouts/slideLayout3.xml")],
        );

        let (out, _) = template().build(&deck(vec![content(vec![ShapeAction::keep(); 4])]), &sources, "x").unwrap();
        let slide = &reparse(&out).slides[0];
        assert_eq!(slide.shapes.len(), 3);
        assert!(slide.shapes.iter().all(|s| s.kind != ShapeKind::Picture));
    }

    #[test]
    fn test_missing_source_skips_slide() {
        let (_, count) = template()
            .build(&deck(vec![AssembledSlide::Message, content(vec![])]), &SourceDecks::new(), "x")
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_added_title_bar() {
        let mut slide = content(vec![ShapeAction::Drop, ShapeAction::keep(), ShapeAction::Drop, ShapeAction::Drop]);
        if let AssembledSlide::Content(c) = &mut slide {
            c.add_title_bar = Some("Closing: Hymn No 143".into());
        }
        let (package, _) = template().build(&deck(vec![slide]), &source(), "x").unwrap();
        let out = reparse(&package);
        let shapes = &out.slides[0].shapes;
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[1].text, "Closing: Hymn No 143");
        assert_eq!(shapes[1].bounds.map(|b| b.y), Some(0));
    }

    #[test]
    fn test_relabel_keeps_run_formatting() {
        let fragment = r#"<p:sp><p:txBody><a:bodyPr anchor="ctr"/><a:lstStyle/><a:p><a:pPr algn="ctr"/><a:r><a:rPr sz="2400" b="1"/><a:t>Opening</a:t></a:r><a:r><a:t> Hymn 5</a:t></a:r></a:p><a:p><a:r><a:t>x</a:t></a:r></a:p></p:txBody></p:sp>"#;
        assert_eq!(
            relabel_text(fragment, "Closing: Hymn No 5").unwrap(),
            r#"<p:sp><p:txBody><a:bodyPr anchor="ctr"/><a:lstStyle/><a:p><a:pPr algn="ctr"/><a:r><a:rPr sz="2400" b="1"/><a:t>Closing: Hymn No 5</a:t></a:r></a:p></p:txBody></p:sp>"#
        );
    }

    #[test]
    fn test_recolor_fill() {
        let filled = r#"<p:sp><p:spPr><a:prstGeom prst="rect"/><a:solidFill><a:srgbClr val="C00000"/></a:solidFill><a:ln><a:solidFill><a:srgbClr val="000000"/></a:solidFill></a:ln></p:spPr></p:sp>"#;
        assert_eq!(
            recolor_fill(filled, "E8D3D3").unwrap(),
            r#"<p:sp><p:spPr><a:prstGeom prst="rect"/><a:solidFill><a:srgbClr val="E8D3D3"/></a:solidFill><a:ln><a:solidFill><a:srgbClr val="000000"/></a:solidFill></a:ln></p:spPr></p:sp>"#
        );

        let unfilled = r#"<p:sp><p:spPr><a:prstGeom prst="rect"/><a:ln><a:noFill/></a:ln></p:spPr></p:sp>"#;
        assert_eq!(
            recolor_fill(unfilled, "E8D3D3").unwrap(),
            r#"<p:sp><p:spPr><a:prstGeom prst="rect"/><a:solidFill><a:srgbClr val="E8D3D3"/></a:solidFill><a:ln><a:noFill/></a:ln></p:spPr></p:sp>"#
        );
    }

    #[test]
    fn test_rels_owner() {
        assert_eq!(rels_owner("ppt/slides/_rels/slide1.xml.rels").as_deref(), Some("ppt/slides/slide1.xml"));
        assert_eq!(rels_owner("_rels/.rels").as_deref(), Some(""));
        assert_eq!(rels_owner("ppt/slides/slide1.xml"), None);
    }
}
