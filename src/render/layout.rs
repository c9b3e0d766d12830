//! Page layout in millimetres, origin bottom-left (PDF convention).

use crate::domain::{BuildingProfile, ChartSpec, RenovationReport};

use super::chart::{format_value, ChartScale};

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN_LEFT: f32 = 20.0;
pub const MARGIN_RIGHT: f32 = 20.0;
pub const MARGIN_TOP: f32 = 20.0;
pub const MARGIN_BOTTOM: f32 = 22.0;
pub const LOGO_WIDTH: f32 = 35.0;

const BODY_SIZE: f32 = 11.0;
const HEADING_SIZE: f32 = 13.0;
const TITLE_SIZE: f32 = 16.0;
const SMALL_SIZE: f32 = 8.0;
const FOOTER_SIZE: f32 = 9.0;
const PT_TO_MM: f32 = 0.3528;
// Helvetica averages about half an em per glyph.
const AVG_GLYPH_EM: f32 = 0.5;
const CHART_BLOCK_HEIGHT: f32 = 90.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        text: String,
    },
    Bar {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Rule {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Logo {
        x: f32,
        y: f32,
        width: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    /// Every text run in reading order, page by page.
    pub fn text_lines(&self) -> Vec<String> {
        self.pages
            .iter()
            .flat_map(|page| page.elements.iter())
            .filter_map(|element| match element {
                Element::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

pub struct LayoutInput<'a> {
    pub title: &'a str,
    pub date: &'a str,
    pub report: &'a RenovationReport,
    pub profile: &'a BuildingProfile,
    pub chart: Option<&'a ChartSpec>,
}

pub fn layout_document(input: &LayoutInput<'_>) -> DocumentLayout {
    let mut cursor = Cursor::new();

    cursor.push(Element::Logo {
        x: MARGIN_LEFT,
        y: PAGE_HEIGHT - MARGIN_TOP - 20.0,
        width: LOGO_WIDTH,
    });
    let header_x = MARGIN_LEFT + LOGO_WIDTH + 10.0;
    cursor.push(Element::Text {
        x: header_x,
        y: PAGE_HEIGHT - MARGIN_TOP - 8.0,
        size: TITLE_SIZE,
        bold: true,
        text: input.title.to_string(),
    });
    cursor.push(Element::Text {
        x: header_x,
        y: PAGE_HEIGHT - MARGIN_TOP - 16.0,
        size: BODY_SIZE,
        bold: false,
        text: format!("Erstellt am {}", input.date),
    });
    cursor.y = PAGE_HEIGHT - MARGIN_TOP - 30.0;

    cursor.heading("Gebäudedaten");
    for (label, value) in input.profile.attribute_lines() {
        cursor.wrapped(&format!("{}: {}", label, value), BODY_SIZE, false);
    }
    cursor.gap(4.0);

    cursor.heading("Empfohlene Maßnahmen");
    for paragraph in input.report.paragraphs() {
        for line in &paragraph {
            let (text, bold) = strip_markdown(line);
            cursor.wrapped(&text, BODY_SIZE, bold);
        }
        cursor.gap(2.5);
    }

    if let Some(chart) = input.chart {
        cursor.gap(4.0);
        cursor.chart(chart);
    }

    let total = cursor.pages.len();
    for (index, page) in cursor.pages.iter_mut().enumerate() {
        page.elements.push(Element::Text {
            x: PAGE_WIDTH - MARGIN_RIGHT - 25.0,
            y: 10.0,
            size: FOOTER_SIZE,
            bold: false,
            text: format!("Seite {} von {}", index + 1, total),
        });
    }

    DocumentLayout {
        pages: cursor.pages,
    }
}

struct Cursor {
    pages: Vec<PageLayout>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![PageLayout::default()],
            y: PAGE_HEIGHT - MARGIN_TOP,
        }
    }

    fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN_BOTTOM {
            self.pages.push(PageLayout::default());
            self.y = PAGE_HEIGHT - MARGIN_TOP;
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn line(&mut self, text: String, size: f32, bold: bool) {
        let height = line_height(size);
        self.ensure(height);
        self.y -= height;
        let y = self.y;
        self.push(Element::Text {
            x: MARGIN_LEFT,
            y,
            size,
            bold,
            text,
        });
    }

    fn wrapped(&mut self, text: &str, size: f32, bold: bool) {
        let width = PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        for line in wrap_text(text, max_chars(width, size)) {
            self.line(line, size, bold);
        }
    }

    fn heading(&mut self, text: &str) {
        // keep a heading together with at least two body lines
        self.ensure(line_height(HEADING_SIZE) + 2.0 * line_height(BODY_SIZE));
        self.line(text.to_string(), HEADING_SIZE, true);
        self.gap(1.5);
    }

    fn chart(&mut self, chart: &ChartSpec) {
        self.ensure(CHART_BLOCK_HEIGHT);
        let top = self.y;
        self.push(Element::Text {
            x: MARGIN_LEFT,
            y: top - 6.0,
            size: HEADING_SIZE,
            bold: true,
            text: chart.title.clone(),
        });
        self.push(Element::Text {
            x: MARGIN_LEFT,
            y: top - 12.0,
            size: SMALL_SIZE,
            bold: false,
            text: chart.ylabel.clone(),
        });

        let x0 = MARGIN_LEFT + 8.0;
        let x1 = PAGE_WIDTH - MARGIN_RIGHT;
        let plot_top = top - 18.0;
        let baseline = top - CHART_BLOCK_HEIGHT + 12.0;
        self.push(Element::Rule {
            x1: x0,
            y1: baseline,
            x2: x0,
            y2: plot_top,
        });
        self.push(Element::Rule {
            x1: x0,
            y1: baseline,
            x2: x1,
            y2: baseline,
        });

        let scale = ChartScale::for_chart(chart);
        let slot = (x1 - x0) / chart.data.len().max(1) as f32;
        let plot_height = plot_top - baseline - 6.0;
        let label_chars = max_chars(slot, SMALL_SIZE).max(3);
        for (index, point) in chart.data.iter().enumerate() {
            let x = x0 + slot * index as f32 + slot * 0.2;
            let height = scale.fraction(point.value) as f32 * plot_height;
            self.push(Element::Bar {
                x,
                y: baseline,
                width: slot * 0.6,
                height,
            });
            self.push(Element::Text {
                x,
                y: baseline + height + 1.5,
                size: SMALL_SIZE,
                bold: false,
                text: format_value(point.value),
            });
            self.push(Element::Text {
                x,
                y: baseline - 5.0,
                size: SMALL_SIZE,
                bold: false,
                text: shorten(&point.category, label_chars),
            });
        }
        self.y = top - CHART_BLOCK_HEIGHT;

        for point in &chart.data {
            self.wrapped(
                &format!("{}: {} {}", point.category, format_value(point.value), chart.ylabel),
                BODY_SIZE,
                false,
            );
        }
    }
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.4
}

fn max_chars(width_mm: f32, size: f32) -> usize {
    (width_mm / (size * PT_TO_MM * AVG_GLYPH_EM)).floor().max(1.0) as usize
}

/// Greedy word wrap; words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Drops Markdown emphasis and heading hashes; headings come back bold.
fn strip_markdown(line: &str) -> (String, bool) {
    let trimmed = line.trim();
    let without_hashes = trimmed.trim_start_matches('#');
    let is_heading = without_hashes.len() != trimmed.len();
    (without_hashes.trim().replace("**", ""), is_heading)
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        cut.push('.');
        cut
    }
}
