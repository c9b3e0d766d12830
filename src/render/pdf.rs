use crate::error::RenderError;
use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Polygon, Rgb,
};
use std::borrow::Cow;
use std::path::Path;
use tracing::warn;

use super::layout::{DocumentLayout, Element, PAGE_HEIGHT, PAGE_WIDTH};

const BAR_COLOR: (f32, f32, f32) = (0.53, 0.81, 0.92);

/// Loads the branding image. A missing or unreadable file only produces a
/// warning; the document is rendered without it.
pub fn load_branding(path: &Path) -> Option<DynamicImage> {
    if !path.exists() {
        warn!(path = %path.display(), "Logo nicht gefunden, PDF ohne Logo");
        return None;
    }
    match image_crate::open(path) {
        Ok(image) => Some(image),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Logo nicht lesbar, PDF ohne Logo");
            None
        }
    }
}

pub fn encode_pdf(
    layout: &DocumentLayout,
    title: &str,
    branding: Option<&DynamicImage>,
) -> Result<Vec<u8>, RenderError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Inhalt");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    let mut targets = vec![(first_page, first_layer)];
    for _ in 1..layout.pages.len() {
        targets.push(doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Inhalt"));
    }

    for (page, (page_index, layer_index)) in layout.pages.iter().zip(targets) {
        let layer = doc.get_page(page_index).get_layer(layer_index);
        for element in &page.elements {
            draw(&layer, element, &regular, &bold, branding);
        }
    }

    doc.save_to_bytes()
        .map_err(|e| RenderError::Pdf(e.to_string()))
}

/// Characters the WinAnsi encoding of the builtin fonts can carry: ASCII,
/// Latin-1 and the extra glyphs in 0x80..=0x9F.
fn is_win_ansi(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{a0}'..='\u{ff}')
        || matches!(
            c,
            '€' | '‚' | 'ƒ' | '„' | '…' | '†' | '‡' | 'ˆ' | '‰' | 'Š' | '‹' | 'Œ' | 'Ž'
                | '‘' | '’' | '“' | '”' | '•' | '–' | '—' | '˜' | '™' | 'š' | '›' | 'œ'
                | 'ž' | 'Ÿ'
        )
}

fn win_ansi_fallback(c: char) -> &'static str {
    match c {
        '₀' | '⁰' => "0",
        '₁' => "1",
        '₂' => "2",
        '₃' => "3",
        '₄' | '⁴' => "4",
        '₅' | '⁵' => "5",
        '₆' | '⁶' => "6",
        '₇' | '⁷' => "7",
        '₈' | '⁸' => "8",
        '₉' | '⁹' => "9",
        '→' | '⇒' | '➔' => "->",
        '←' | '⇐' => "<-",
        '↔' => "<->",
        '↑' => "^",
        '≤' => "<=",
        '≥' => ">=",
        '≈' | '∼' => "~",
        '≠' => "!=",
        '−' | '‐' | '‑' | '‒' => "-",
        '\u{2009}' | '\u{202f}' | '\u{2002}' | '\u{2003}' => " ",
        '✓' | '✔' => "x",
        _ => "?",
    }
}

/// Builtin fonts silently drop glyphs outside WinAnsi, so those are replaced
/// by a readable ASCII stand-in before encoding.
fn win_ansi_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_win_ansi) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_win_ansi(c) {
            out.push(c);
        } else {
            out.push_str(win_ansi_fallback(c));
        }
    }
    Cow::Owned(out)
}

fn draw(
    layer: &PdfLayerReference,
    element: &Element,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
    branding: Option<&DynamicImage>,
) {
    match element {
        Element::Text {
            x,
            y,
            size,
            bold: is_bold,
            text,
        } => {
            let font = if *is_bold { bold } else { regular };
            layer.use_text(win_ansi_text(text), *size, Mm(*x), Mm(*y), font);
        }
        Element::Bar {
            x,
            y,
            width,
            height,
        } => {
            if *height <= 0.0 {
                return;
            }
            let (r, g, b) = BAR_COLOR;
            layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
            layer.add_polygon(Polygon {
                rings: vec![vec![
                    (Point::new(Mm(*x), Mm(*y)), false),
                    (Point::new(Mm(*x + *width), Mm(*y)), false),
                    (Point::new(Mm(*x + *width), Mm(*y + *height)), false),
                    (Point::new(Mm(*x), Mm(*y + *height)), false),
                ]],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
            layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        }
        Element::Rule { x1, y1, x2, y2 } => {
            layer.set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
            layer.set_outline_thickness(0.6);
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(*x1), Mm(*y1)), false),
                    (Point::new(Mm(*x2), Mm(*y2)), false),
                ],
                is_closed: false,
            });
        }
        Element::Logo { x, y, width } => {
            let Some(image) = branding else {
                return;
            };
            let (pixels_wide, _) = image.dimensions();
            if pixels_wide == 0 {
                return;
            }
            // dpi chosen so the image spans `width` millimetres
            let dpi = pixels_wide as f32 * 25.4 / *width;
            Image::from_dynamic_image(image).add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(*x)),
                    translate_y: Some(Mm(*y)),
                    dpi: Some(dpi),
                    ..Default::default()
                },
            );
        }
    }
}

/// Text operands of every page's content stream, one entry per drawn line,
/// decoded back from WinAnsi.
#[cfg(test)]
pub(crate) fn encoded_lines(bytes: &[u8]) -> Vec<String> {
    use lopdf::content::Content;
    use lopdf::{Document, Object};

    fn decode(raw: &[u8]) -> String {
        raw.iter()
            .map(|&b| match b {
                0x80 => '€',
                0x96 => '–',
                0x97 => '—',
                _ => b as char,
            })
            .collect()
    }

    let doc = Document::load_mem(bytes).unwrap();
    let mut lines = Vec::new();
    for (_, page_id) in doc.get_pages() {
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        for op in content.operations {
            match op.operator.as_str() {
                "Tj" => {
                    if let Some(Object::String(raw, _)) = op.operands.first() {
                        lines.push(decode(raw));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(parts)) = op.operands.first() {
                        let mut line = String::new();
                        for part in parts {
                            if let Object::String(raw, _) = part {
                                line.push_str(&decode(raw));
                            }
                        }
                        lines.push(line);
                    }
                }
                _ => {}
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::layout::PageLayout;

    fn text_page(lines: &[&str]) -> PageLayout {
        PageLayout {
            elements: lines
                .iter()
                .enumerate()
                .map(|(i, line)| Element::Text {
                    x: 20.0,
                    y: 250.0 - i as f32 * 6.0,
                    size: 11.0,
                    bold: i == 0,
                    text: line.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn win_ansi_text_keeps_latin_glyphs() {
        let text = "Wärmedämmung für 12.000 € – Außenwand „neu“";
        assert!(matches!(win_ansi_text(text), Cow::Borrowed(_)));
        assert_eq!(win_ansi_text("CO₂ → gut"), "CO2 -> gut");
        assert_eq!(win_ansi_text("U ≤ 0,24 W/(m²K) ✓ 🏠"), "U <= 0,24 W/(m²K) x ?");
    }

    #[test]
    fn encoded_text_survives_in_content_stream() {
        let layout = DocumentLayout {
            pages: vec![text_page(&[
                "Fokus der Sanierung: CO₂-Reduktion",
                "CO₂ → gut",
                "Wärme für 200 € – große Maßnahme",
            ])],
        };
        let bytes = encode_pdf(&layout, "Test", None).unwrap();
        let lines = encoded_lines(&bytes);
        assert!(lines.contains(&"Fokus der Sanierung: CO2-Reduktion".to_string()));
        assert!(lines.contains(&"CO2 -> gut".to_string()));
        assert!(lines.contains(&"Wärme für 200 € – große Maßnahme".to_string()));
    }

    #[test]
    fn missing_branding_is_tolerated() {
        assert!(load_branding(Path::new("/nicht/vorhanden/logo.png")).is_none());
    }

    #[test]
    fn unreadable_branding_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, b"kein bild").unwrap();
        assert!(load_branding(&path).is_none());
    }

    #[test]
    fn encodes_every_page() {
        let page = PageLayout {
            elements: vec![
                Element::Text {
                    x: 20.0,
                    y: 250.0,
                    size: 11.0,
                    bold: false,
                    text: "Hallo".into(),
                },
                Element::Bar {
                    x: 30.0,
                    y: 100.0,
                    width: 10.0,
                    height: 40.0,
                },
                Element::Rule {
                    x1: 28.0,
                    y1: 100.0,
                    x2: 190.0,
                    y2: 100.0,
                },
                Element::Logo {
                    x: 20.0,
                    y: 257.0,
                    width: 35.0,
                },
            ],
        };
        let layout = DocumentLayout {
            pages: vec![page.clone(), page],
        };
        let bytes = encode_pdf(&layout, "Test", None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
