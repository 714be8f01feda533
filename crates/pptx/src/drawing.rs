//! DrawingML snippets for the slides the writer generates itself.

use crate::xml::escape;
use hymn_core::geometry::EMU_PER_INCH;
use hymn_core::Rect;

/// Height of the title bar across the top of content slides.
pub(crate) const TITLE_BAR_HEIGHT: i64 = 486_000;

/// Fill of generated title bars.
pub(crate) const TITLE_BAR_FILL: &str = "905562";

/// Fill given to cloned title bars.
pub(crate) const RECOLOR_FILL: &str = "E8D3D3";

/// Fill and opacity of the box behind section titles.
pub(crate) const TITLE_BOX_FILL: &str = "824C58";
pub(crate) const TITLE_BOX_ALPHA: u32 = 70_986;

const WHITE: &str = "FFFFFF";

/// Run formatting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Font {
    pub typeface: &'static str,
    pub size_pt: u32,
    pub bold: bool,
    pub color: Option<&'static str>,
}

pub(crate) const TITLE_BAR_FONT: Font = Font {
    typeface: "Segoe UI",
    size_pt: 28,
    bold: true,
    color: Some(WHITE),
};

pub(crate) const SUMMARY_HEADING_FONT: Font = Font {
    typeface: "Gill Sans MT",
    size_pt: 32,
    bold: true,
    color: Some(WHITE),
};

pub(crate) const SUMMARY_LABEL_FONT: Font = Font {
    typeface: "Segoe UI",
    size_pt: 14,
    bold: true,
    color: None,
};

pub(crate) const SUMMARY_LINE_FONT: Font = Font {
    bold: false,
    ..SUMMARY_LABEL_FONT
};

pub(crate) const HEADER_FONT: Font = Font {
    typeface: "Gill Sans MT",
    size_pt: 18,
    bold: false,
    color: Some(WHITE),
};

pub(crate) const SECTION_LABEL_FONT: Font = Font {
    typeface: "Tenorite",
    size_pt: 48,
    bold: true,
    color: Some(WHITE),
};

pub(crate) const SECTION_LINE_FONT: Font = Font {
    size_pt: 36,
    bold: false,
    ..SECTION_LABEL_FONT
};

pub(crate) const NOTE_FONT: Font = Font {
    size_pt: 24,
    bold: false,
    ..SECTION_LABEL_FONT
};

pub(crate) const CAPTION_FONT: Font = Font {
    typeface: "Arial",
    size_pt: 10,
    bold: false,
    color: None,
};

/// One centred paragraph with a single run.
#[derive(Debug, Clone)]
pub(crate) struct Para {
    pub text: String,
    pub font: Font,
    /// Space before, in points.
    pub space_before: Option<u32>,
}

impl Para {
    pub fn new(text: impl Into<String>, font: Font) -> Self {
        Self {
            text: text.into(),
            font,
            space_before: None,
        }
    }

    pub fn spaced(mut self, points: u32) -> Self {
        self.space_before = Some(points);
        self
    }

    fn to_xml(&self) -> String {
        let spacing = self
            .space_before
            .map(|pts| format!("<a:spcBef><a:spcPts val=\"{}\"/></a:spcBef>", pts * 100))
            .unwrap_or_default();
        let fill = self
            .font
            .color
            .map(|c| format!("<a:solidFill><a:srgbClr val=\"{c}\"/></a:solidFill>"))
            .unwrap_or_default();
        format!(
            "<a:p><a:pPr algn=\"ctr\">{spacing}</a:pPr><a:r><a:rPr lang=\"en-US\" sz=\"{}\" b=\"{}\" dirty=\"0\">{fill}\
             <a:latin typeface=\"{}\"/><a:cs typeface=\"{}\"/></a:rPr><a:t>{}</a:t></a:r></a:p>",
            self.font.size_pt * 100,
            u8::from(self.font.bold),
            self.font.typeface,
            self.font.typeface,
            escape(&self.text)
        )
    }
}

/// A generated auto shape or text box.
#[derive(Debug, Clone)]
pub(crate) struct ShapeSpec {
    pub name: &'static str,
    pub bounds: Rect,
    pub rounded: bool,
    pub text_box: bool,
    pub fill: Option<(&'static str, Option<u32>)>,
    pub anchor_middle: bool,
    pub wrap: bool,
    pub paragraphs: Vec<Para>,
}

impl ShapeSpec {
    /// Text box without fill.
    pub fn text_box(name: &'static str, bounds: Rect, paragraphs: Vec<Para>) -> Self {
        Self {
            name,
            bounds,
            rounded: false,
            text_box: true,
            fill: None,
            anchor_middle: true,
            wrap: true,
            paragraphs,
        }
    }

    /// Filled bar across the top of the slide with centred text.
    pub fn title_bar(slide_width: i64, text: &str, font: Font) -> Self {
        Self {
            name: "Title Bar",
            bounds: Rect::new(0, 0, slide_width, TITLE_BAR_HEIGHT),
            rounded: false,
            text_box: false,
            fill: Some((TITLE_BAR_FILL, None)),
            anchor_middle: true,
            wrap: false,
            paragraphs: vec![Para::new(text, font)],
        }
    }

    /// Translucent rounded box behind section titles.
    pub fn title_box(bounds: Rect) -> Self {
        Self {
            name: "Title Box",
            bounds,
            rounded: true,
            text_box: false,
            fill: Some((TITLE_BOX_FILL, Some(TITLE_BOX_ALPHA))),
            anchor_middle: true,
            wrap: true,
            paragraphs: Vec::new(),
        }
    }

    pub fn top_aligned(mut self) -> Self {
        self.anchor_middle = false;
        self
    }

    pub fn unwrapped(mut self) -> Self {
        self.wrap = false;
        self
    }

    pub fn to_xml(&self, id: u32) -> String {
        let fill = match self.fill {
            Some((color, Some(alpha))) => {
                format!("<a:solidFill><a:srgbClr val=\"{color}\"><a:alpha val=\"{alpha}\"/></a:srgbClr></a:solidFill><a:ln><a:noFill/></a:ln>")
            }
            Some((color, None)) => {
                format!("<a:solidFill><a:srgbClr val=\"{color}\"/></a:solidFill><a:ln><a:noFill/></a:ln>")
            }
            None => "<a:noFill/>".to_string(),
        };
        let paragraphs = if self.paragraphs.is_empty() {
            "<a:p><a:endParaRPr lang=\"en-US\" dirty=\"0\"/></a:p>".to_string()
        } else {
            self.paragraphs.iter().map(Para::to_xml).collect()
        };

        format!(
            "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"{} {id}\"/><p:cNvSpPr{}/><p:nvPr/></p:nvSpPr>\
             <p:spPr>{}<a:prstGeom prst=\"{}\"><a:avLst/></a:prstGeom>{fill}</p:spPr>\
             <p:txBody><a:bodyPr wrap=\"{}\" rtlCol=\"0\" anchor=\"{}\"/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>",
            self.name,
            if self.text_box { " txBox=\"1\"" } else { "" },
            xfrm(&self.bounds),
            if self.rounded { "roundRect" } else { "rect" },
            if self.wrap { "square" } else { "none" },
            if self.anchor_middle { "ctr" } else { "t" },
        )
    }
}

/// A picture filling `bounds`, its image linked through `rid`.
pub(crate) fn picture_xml(id: u32, name: &str, rid: &str, bounds: &Rect) -> String {
    format!(
        "<p:pic><p:nvPicPr><p:cNvPr id=\"{id}\" name=\"{} {id}\"/><p:cNvPicPr><a:picLocks noChangeAspect=\"1\"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>\
         <p:blipFill><a:blip r:embed=\"{}\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>\
         <p:spPr>{}<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr></p:pic>",
        escape(name),
        escape(rid),
        xfrm(bounds)
    )
}

fn xfrm(r: &Rect) -> String {
    format!(
        "<a:xfrm><a:off x=\"{}\" y=\"{}\"/><a:ext cx=\"{}\" cy=\"{}\"/></a:xfrm>",
        r.x, r.y, r.width, r.height
    )
}

/// Inches to EMUs.
pub(crate) fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH as f64).round() as i64
}

/// Rectangle given in inches.
pub(crate) fn rect_in(x: f64, y: f64, width: f64, height: f64) -> Rect {
    Rect::new(inches(x), inches(y), inches(width), inches(height))
}

/// The `p:sld` part around a shape list.
pub(crate) fn slide_xml(shapes: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <p:sld xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
         xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">\
         <p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
         <p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/><a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>\
         {shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
    )
}
