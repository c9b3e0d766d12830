mod chart;
mod layout;
mod pdf;

pub use chart::{format_value, render_terminal, ChartScale};
pub use layout::{layout_document, wrap_text, DocumentLayout, Element, LayoutInput, PageLayout};
pub use pdf::{encode_pdf, load_branding};

use crate::domain::{BuildingProfile, ChartSpec, RenovationReport};
use crate::error::RenderError;
use crate::utils::document_file_name;
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use tracing::info;

pub const DOCUMENT_TITLE: &str = "Sanierungsfahrplan – LA Sanierungen";
pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// A finished download: PDF bytes plus the laid-out text for display and
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub text: Vec<String>,
    pub page_count: usize,
}

impl RenderedDocument {
    pub fn mime_type(&self) -> &'static str {
        PDF_MIME_TYPE
    }

    pub fn text_content(&self) -> String {
        self.text.join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct ReportRenderer {
    branding_image: Option<PathBuf>,
    date: NaiveDate,
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self {
            branding_image: None,
            date: Local::now().date_naive(),
        }
    }

    pub fn with_branding_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.branding_image = Some(path.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Chart shown in the document: the model's chart, or the current energy
    /// consumption when the model delivered none.
    pub fn chart_for(report: &RenovationReport, profile: &BuildingProfile) -> Option<ChartSpec> {
        report
            .chart
            .clone()
            .or_else(|| ChartSpec::energy_consumption(profile))
    }

    pub fn layout(&self, report: &RenovationReport, profile: &BuildingProfile) -> DocumentLayout {
        let date = self.date.format(DATE_FORMAT).to_string();
        let chart = Self::chart_for(report, profile);
        layout_document(&LayoutInput {
            title: DOCUMENT_TITLE,
            date: &date,
            report,
            profile,
            chart: chart.as_ref(),
        })
    }

    pub fn render(
        &self,
        report: &RenovationReport,
        profile: &BuildingProfile,
    ) -> Result<RenderedDocument, RenderError> {
        let layout = self.layout(report, profile);
        let branding = self.branding_image.as_deref().and_then(load_branding);
        let bytes = encode_pdf(&layout, DOCUMENT_TITLE, branding.as_ref())?;

        let document = RenderedDocument {
            file_name: document_file_name(&profile.address),
            text: layout.text_lines(),
            page_count: layout.pages.len(),
            bytes,
        };
        info!(
            file = %document.file_name,
            pages = document.page_count,
            bytes = document.bytes.len(),
            "PDF erstellt"
        );
        Ok(document)
    }
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HeatingSystem, RenovationFocus, WindowCondition};

    fn profile() -> BuildingProfile {
        BuildingProfile {
            address: "Königstraße 3, 70173 Stuttgart".into(),
            construction_year: 1968,
            floor_area_m2: 128.0,
            heating: HeatingSystem::Gas,
            roof_insulated: false,
            basement_ceiling_insulated: false,
            photovoltaic: true,
            windows: WindowCondition::PartiallyRenewed,
            electricity_kwh_per_year: Some(3100),
            gas_kwh_per_year: Some(14000),
            focus: None,
        }
    }

    fn renderer() -> ReportRenderer {
        ReportRenderer::new()
            .with_branding_image("/gibt/es/nicht/logo.png")
            .with_date(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap())
    }

    #[test]
    fn renders_without_branding_image() {
        let report = RenovationReport::narrative_only(
            "Zuerst die oberste Geschossdecke dämmen.\n\nDanach die Heizung tauschen.",
        );
        let document = renderer().render(&report, &profile()).unwrap();

        assert!(!document.bytes.is_empty());
        assert!(document.bytes.starts_with(b"%PDF"));
        assert_eq!(document.mime_type(), "application/pdf");
        let text = document.text_content();
        assert!(text.contains("Zuerst die oberste Geschossdecke dämmen."));
        assert!(text.contains("Danach die Heizung tauschen."));
        assert!(text.contains("Erstellt am 09.03.2026"));
        assert!(text.contains("Adresse: Königstraße 3, 70173 Stuttgart"));
        assert_eq!(document.file_name, "sanierungsfahrplan-koenigstrasse-3-70173-stuttgart.pdf");
    }

    #[test]
    fn rendering_is_repeatable() {
        let chart = ChartSpec::new("Kosten je Maßnahme", "Euro")
            .with_point("Dach", 18000.0)
            .with_point("Heizung", 26000.0);
        let report = RenovationReport::with_chart("Text", chart);
        let first = renderer().render(&report, &profile()).unwrap();
        let second = renderer().render(&report, &profile()).unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.page_count, second.page_count);
    }

    #[test]
    fn falls_back_to_consumption_chart() {
        let report = RenovationReport::narrative_only("Text");
        let chart = ReportRenderer::chart_for(&report, &profile()).unwrap();
        assert_eq!(chart.title, "Aktueller Energieverbrauch");

        let text = renderer().layout(&report, &profile()).text_lines();
        assert!(text.contains(&"Gas: 14000 kWh/Jahr".to_string()));
    }

    #[test]
    fn pdf_bytes_carry_narrative_and_labels() {
        let report = RenovationReport::narrative_only(
            "Zuerst die Kellerdecke dämmen.\n\nCO₂-Ausstoß sinkt → deutlich.",
        );
        let profile = BuildingProfile {
            focus: Some(RenovationFocus::Co2Reduction),
            ..profile()
        };
        let document = renderer().render(&report, &profile).unwrap();
        let encoded = pdf::encoded_lines(&document.bytes).join("\n");

        assert!(encoded.contains("Zuerst die Kellerdecke dämmen."));
        assert!(encoded.contains("CO2-Ausstoß sinkt -> deutlich."));
        assert!(encoded.contains("Fokus der Sanierung: CO2-Reduktion"));
        assert!(encoded.contains("Adresse: Königstraße 3, 70173 Stuttgart"));
        assert!(encoded.contains("Erstellt am 09.03.2026"));
    }
}
