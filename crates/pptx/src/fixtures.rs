//! Small in-memory decks for tests.

use crate::package::{Package, Relationship, REL_IMAGE, REL_SLIDE, REL_SLIDE_LAYOUT};
use std::io::Cursor;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const REL_MASTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

pub const LAYOUT_NAMES: &[&str] = &["Title Slide", "English HC Title", "1_Blank"];

/// One-pixel PNG.
pub const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

fn sp(id: u32, tx_box: bool, x: i64, y: i64, cx: i64, cy: i64, text: &str) -> String {
    let paragraphs: String = text
        .split('\n')
        .map(|p| format!("<a:p><a:r><a:rPr lang=\"en-US\"/><a:t>{}</a:t></a:r></a:p>", crate::xml::escape(p)))
        .collect();
    format!(
        "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"Shape {id}\"/><p:cNvSpPr{}/><p:nvPr/></p:nvSpPr>\
         <p:spPr><a:xfrm><a:off x=\"{x}\" y=\"{y}\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom><a:solidFill><a:srgbClr val=\"C00000\"/></a:solidFill></p:spPr>\
         <p:txBody><a:bodyPr/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>",
        if tx_box { " txBox=\"1\"" } else { "" }
    )
}

pub fn title_bar(text: &str) -> String {
    sp(2, false, 0, 0, 9_144_000, 486_000, text)
}

pub fn body(text: &str) -> String {
    sp(3, true, 500_000, 1_000_000, 8_000_000, 4_500_000, text)
}

pub fn footer(text: &str) -> String {
    sp(4, true, 500_000, 6_300_000, 3_000_000, 300_000, text)
}

pub fn picture(rid: &str, x: i64) -> String {
    format!(
        "<p:pic><p:nvPicPr><p:cNvPr id=\"5\" name=\"Picture\"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>\
         <p:blipFill><a:blip r:embed=\"{rid}\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>\
         <p:spPr><a:xfrm><a:off x=\"{x}\" y=\"1000000\"/><a:ext cx=\"2700000\" cy=\"2800000\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr></p:pic>"
    )
}

pub fn slide_xml(shapes: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<p:sld {NS}><p:cSld><p:spTree>\
         <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>\
         {}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>\
         <p:timing><p:tnLst/></p:timing></p:sld>",
        shapes.concat()
    )
}

fn layout_xml(name: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<p:sldLayout {NS}><p:cSld name=\"{name}\"><p:spTree>\
         <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>\
         {}</p:spTree></p:cSld></p:sldLayout>",
        sp(2, true, 0, 6_400_000, 9_144_000, 400_000, "English Holy Communion Service – 12 January 2025")
    )
}

/// A deck whose slides hold the given shapes. Every slide links image `rId2`.
pub fn deck_package(slides: &[&[String]]) -> Package {
    let mut package = Package::default();
    let mut overrides = String::new();

    let mut slide_ids = String::new();
    let mut presentation_rels = vec![Relationship::internal(
        "rId1",
        REL_MASTER,
        "ppt/slideMasters/slideMaster1.xml",
    )];
    for (i, shapes) in slides.iter().enumerate() {
        let part = format!("ppt/slides/slide{}.xml", i + 1);
        let rid = format!("rId{}", i + 2);
        slide_ids.push_str(&format!("<p:sldId id=\"{}\" r:id=\"{rid}\"/>", 256 + i));
        presentation_rels.push(Relationship::internal(rid, REL_SLIDE, part.clone()));

        package.set_part(part.clone(), slide_xml(shapes));
        package.set_relationships(
            &part,
            &[
                Relationship::internal("rId1", REL_SLIDE_LAYOUT, "ppt/slideLayouts/slideLayout3.xml"),
                Relationship::internal("rId2", REL_IMAGE, "ppt/media/image1.png"),
            ],
        );
        overrides.push_str(&format!(
            "<Override PartName=\"/{part}\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slide+xml\"/>"
        ));
    }

    package.set_part(
        "ppt/presentation.xml",
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<p:presentation {NS}>\
             <p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
             <p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx=\"9144000\" cy=\"6858000\"/>\
             <p:notesSz cx=\"6858000\" cy=\"9144000\"/></p:presentation>"
        ),
    );
    package.set_relationships("ppt/presentation.xml", &presentation_rels);

    let mut master_rels = Vec::new();
    for (i, name) in LAYOUT_NAMES.iter().enumerate() {
        let part = format!("ppt/slideLayouts/slideLayout{}.xml", i + 1);
        package.set_part(part.clone(), layout_xml(name));
        package.set_relationships(
            &part,
            &[Relationship::internal("rId1", REL_MASTER, "ppt/slideMasters/slideMaster1.xml")],
        );
        master_rels.push(Relationship::internal(format!("rId{}", i + 1), REL_SLIDE_LAYOUT, part.clone()));
        overrides.push_str(&format!(
            "<Override PartName=\"/{part}\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml\"/>"
        ));
    }

    package.set_part(
        "ppt/slideMasters/slideMaster1.xml",
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<p:sldMaster {NS}><p:cSld><p:spTree>\
             <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>\
             {}</p:spTree></p:cSld></p:sldMaster>",
            sp(2, true, 0, 6_400_000, 9_144_000, 400_000, "Service on 12 January 2025")
        ),
    );
    package.set_relationships("ppt/slideMasters/slideMaster1.xml", &master_rels);
    package.set_part("ppt/media/image1.png", PNG.to_vec());

    package.set_part(
        "docProps/core.xml",
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<cp:coreProperties \
         xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><dc:title>Old</dc:title></cp:coreProperties>",
    );
    package.set_relationships(
        "",
        &[
            Relationship::internal("rId1", REL_OFFICE_DOCUMENT, "ppt/presentation.xml"),
            Relationship::internal(
                "rId2",
                "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
                "docProps/core.xml",
            ),
        ],
    );

    package.set_part(
        "[Content_Types].xml",
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
             <Default Extension=\"png\" ContentType=\"image/png\"/>\
             <Override PartName=\"/ppt/presentation.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml\"/>\
             <Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml\"/>\
             <Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\
             {overrides}</Types>"
        ),
    );

    package
}

pub fn deck_bytes(slides: &[&[String]]) -> Vec<u8> {
    match deck_package(slides).write_to(Cursor::new(Vec::new())) {
        Ok(cursor) => cursor.into_inner(),
        Err(e) => panic!("fixture deck failed to write: {e}"),
    }
}
