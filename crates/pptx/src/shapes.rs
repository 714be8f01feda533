//! The shape tree of a slide.
//!
//! The reader and the writer both walk the direct children of `p:spTree`
//! through [`ShapeTree`], so shape `i` of an extracted slide is always
//! shape `i` when that slide is cloned.

use crate::xml::{attr, attr_i64, local_name};
use hymn_core::{Error, Rect, Result, ShapeKind, SlideShape};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::ops::Range;

/// `spTree` children that are not shapes.
const TREE_PROPERTIES: &[&[u8]] = &[b"nvGrpSpPr", b"grpSpPr", b"extLst"];

/// Byte layout of the first `spTree` in a slide part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeTree {
    /// One span per shape, in z order.
    pub shapes: Vec<Range<usize>>,
    /// Where the first shape starts (or would start).
    pub content_start: usize,
    /// Where new shapes go: before the tree's `extLst`, else before `</p:spTree>`.
    pub insert_at: usize,
}

impl ShapeTree {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut depth = 0usize;
        let mut tree_depth: Option<usize> = None;
        let mut open_shape: Option<usize> = None;
        let mut shapes = Vec::new();
        let mut content_start = None;
        let mut ext_list = None;

        loop {
            let before = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    depth += 1;
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    match tree_depth {
                        None if local == b"spTree" => tree_depth = Some(depth),
                        Some(tree) if depth == tree + 1 => {
                            if local == b"extLst" {
                                ext_list = Some(before);
                            } else if !TREE_PROPERTIES.contains(&local) {
                                content_start.get_or_insert(before);
                                open_shape = Some(before);
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    if tree_depth == Some(depth) && !TREE_PROPERTIES.contains(&local) {
                        content_start.get_or_insert(before);
                        shapes.push(before..reader.buffer_position());
                    }
                }
                Ok(Event::End(_)) => {
                    match tree_depth {
                        Some(tree) if depth == tree => {
                            let insert_at = ext_list.unwrap_or(before);
                            return Ok(Self {
                                shapes,
                                content_start: content_start.unwrap_or(insert_at),
                                insert_at,
                            });
                        }
                        Some(tree) if depth == tree + 1 => {
                            if let Some(start) = open_shape.take() {
                                shapes.push(start..reader.buffer_position());
                            }
                        }
                        _ => {}
                    }
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(format!("Error parsing slide: {}", e))),
                _ => {}
            }
        }

        Err(Error::PresentationParse("Slide has no shape tree".to_string()))
    }
}

/// Read the text, geometry and kind of one shape fragment.
pub fn parse_shape(fragment: &str) -> Result<SlideShape> {
    let mut reader = Reader::from_str(fragment);

    let mut root: Option<Vec<u8>> = None;
    let mut text_box = false;
    let mut rounded = false;
    let mut offset: Option<(i64, i64)> = None;
    let mut extent: Option<(i64, i64)> = None;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut in_text_body = 0usize;
    let mut in_run_text = false;

    loop {
        let event = reader.read_event();
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let is_empty = matches!(event, Ok(Event::Empty(_)));
                let name = e.name();
                let local = local_name(name.as_ref());
                if root.is_none() {
                    root = Some(local.to_vec());
                }

                match local {
                    b"cNvSpPr" => text_box |= attr(e, b"txBox").is_some_and(|v| v == "1" || v == "true"),
                    b"prstGeom" => rounded |= attr(e, b"prst").is_some_and(|p| p.starts_with("round")),
                    b"off" if offset.is_none() => {
                        if let (Some(x), Some(y)) = (attr_i64(e, b"x"), attr_i64(e, b"y")) {
                            offset = Some((x, y));
                        }
                    }
                    b"ext" if extent.is_none() => {
                        if let (Some(cx), Some(cy)) = (attr_i64(e, b"cx"), attr_i64(e, b"cy")) {
                            extent = Some((cx, cy));
                        }
                    }
                    b"txBody" if !is_empty => in_text_body += 1,
                    b"p" if in_text_body > 0 => paragraphs.push(String::new()),
                    b"t" if in_text_body > 0 && !is_empty => in_run_text = true,
                    b"br" if in_text_body > 0 => {
                        if let Some(p) = paragraphs.last_mut() {
                            p.push('\n');
                        }
                    }
                    b"tab" if in_text_body > 0 => {
                        if let Some(p) = paragraphs.last_mut() {
                            p.push('\t');
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_run_text {
                    let text = e.unescape().unwrap_or_default();
                    if let Some(p) = paragraphs.last_mut() {
                        p.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_run_text = false,
                b"txBody" => in_text_body = in_text_body.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("XML parsing error in shape (continuing): {}", e);
                break;
            }
            _ => {}
        }
    }

    let kind = match root.as_deref() {
        Some(b"pic") => ShapeKind::Picture,
        Some(b"sp") if rounded => ShapeKind::RoundedRect,
        Some(b"sp") if text_box => ShapeKind::TextBox,
        Some(b"sp") => ShapeKind::Shape,
        _ => ShapeKind::Other,
    };
    let bounds = offset
        .zip(extent)
        .map(|((x, y), (width, height))| Rect::new(x, y, width, height));

    Ok(SlideShape {
        text: paragraphs.join("\n"),
        paragraphs,
        bounds,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="a" xmlns:p="p" xmlns:r="r"><p:cSld><p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
<p:grpSpPr/>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="9144000" cy="486000"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:t>Opening </a:t></a:r><a:r><a:t>Hymn No 91</a:t></a:r></a:p></p:txBody></p:sp>
<p:pic><p:nvPicPr><p:cNvPr id="3" name="QR"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/></p:blipFill><p:spPr><a:xfrm><a:off x="6373368" y="987552"/><a:ext cx="2779776" cy="2862072"/></a:xfrm></p:spPr></p:pic>
<p:sp><p:nvSpPr><p:cNvPr id="4" name="Body"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>Praise to the Lord &amp; King</a:t></a:r><a:br/><a:r><a:t>of creation</a:t></a:r></a:p><a:p/><a:p><a:r><a:t>All ye who hear</a:t></a:r></a:p></p:txBody></p:sp>
<p:extLst><p:ext uri="x"/></p:extLst>
</p:spTree></p:cSld></p:sld>"#;

    #[test]
    fn test_shape_tree_spans() {
        let tree = ShapeTree::parse(SLIDE).unwrap();
        assert_eq!(tree.shapes.len(), 3);
        assert!(SLIDE[tree.shapes[0].clone()].starts_with("<p:sp>"));
        assert!(SLIDE[tree.shapes[1].clone()].starts_with("<p:pic>"));
        assert!(SLIDE[tree.shapes[2].clone()].ends_with("</p:sp>"));
        assert_eq!(tree.content_start, tree.shapes[0].start);
        assert!(SLIDE[tree.insert_at..].starts_with("<p:extLst>"));
    }

    #[test]
    fn test_parse_shapes() {
        let tree = ShapeTree::parse(SLIDE).unwrap();
        let shapes: Vec<SlideShape> = tree
            .shapes
            .iter()
            .map(|span| parse_shape(&SLIDE[span.clone()]).unwrap())
            .collect();

        assert_eq!(shapes[0].text, "Opening Hymn No 91");
        assert_eq!(shapes[0].kind, ShapeKind::Shape);
        assert_eq!(shapes[0].bounds, Some(Rect::new(0, 0, 9_144_000, 486_000)));

        assert_eq!(shapes[1].kind, ShapeKind::Picture);
        assert!(!shapes[1].has_text());
        assert_eq!(shapes[1].bounds.map(|b| b.x), Some(6_373_368));

        assert_eq!(shapes[2].kind, ShapeKind::TextBox);
        assert_eq!(shapes[2].paragraphs, vec!["Praise to the Lord & King\nof creation", "", "All ye who hear"]);
        assert_eq!(shapes[2].bounds, None);
    }

    #[test]
    fn test_empty_tree_inserts_before_close() {
        let xml = r#"<p:sld><p:cSld><p:spTree><p:nvGrpSpPr/><p:grpSpPr/></p:spTree></p:cSld></p:sld>"#;
        let tree = ShapeTree::parse(xml).unwrap();
        assert!(tree.shapes.is_empty());
        assert!(xml[tree.insert_at..].starts_with("</p:spTree>"));
        assert_eq!(tree.content_start, tree.insert_at);
    }

    #[test]
    fn test_rounded_and_group_kinds() {
        let rounded = parse_shape(r#"<p:sp><p:spPr><a:prstGeom prst="roundRect"/></p:spPr></p:sp>"#).unwrap();
        assert_eq!(rounded.kind, ShapeKind::RoundedRect);
        let group = parse_shape(r#"<p:grpSp><p:sp><p:txBody><a:p><a:r><a:t>x</a:t></a:r></a:p></p:txBody></p:sp></p:grpSp>"#).unwrap();
        assert_eq!(group.kind, ShapeKind::Other);
        assert_eq!(group.text, "x");
    }

    #[test]
    fn test_missing_tree_is_error() {
        assert!(ShapeTree::parse("<p:sld/>").is_err());
    }
}
