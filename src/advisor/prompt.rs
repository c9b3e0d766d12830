use crate::domain::BuildingProfile;
use anyhow::{self, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::messages::ChatMessage;

pub const NARRATIVE_MARKER: &str = "[TEXT]";
pub const CHART_MARKER: &str = "[DIAGRAMM]";

/// Answer contract requested from the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Free text only.
    Narrative,
    /// `[TEXT]` narrative followed by a `[DIAGRAMM]` JSON block.
    Chart,
    /// One JSON envelope with `narrative` and optional `chart`.
    Structured,
}

impl OutputMode {
    pub fn wants_chart(self) -> bool {
        !matches!(self, OutputMode::Narrative)
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputMode::Narrative => "narrative",
            OutputMode::Chart => "chart",
            OutputMode::Structured => "structured",
        }
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Chart
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OutputMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        let mode = match normalized.as_str() {
            "narrative" | "narrative_only" | "text" => OutputMode::Narrative,
            "chart" | "narrative_plus_chart_data" | "diagramm" => OutputMode::Chart,
            "structured" | "json" => OutputMode::Structured,
            _ => anyhow::bail!("unbekannter Ausgabemodus: {}", s),
        };
        Ok(mode)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub intro: String,
    pub narrative_instructions: String,
    pub chart_instructions: String,
    pub structured_instructions: String,
}

impl PromptTemplate {
    pub fn default() -> Self {
        let system = String::from(
            "Du bist ein erfahrener Energieberater für Wohngebäude in Deutschland. \
             Du erstellst verständliche, konkrete Sanierungsfahrpläne mit Maßnahmen, \
             Reihenfolge, grober Kostenschätzung und passenden Förderprogrammen.",
        );

        let intro = String::from(
            "Erstelle einen individuellen Sanierungsfahrplan für das folgende Gebäude.\n\
             Gebäudedaten:",
        );

        let narrative_instructions = String::from(
            "Gliedere die Antwort in kurze Absätze, getrennt durch Leerzeilen. \
             Nenne Maßnahmen in sinnvoller Reihenfolge, geschätzte Kosten, \
             Einsparpotenzial und mögliche Förderungen.",
        );

        let chart_instructions = format!(
            concat!(
                "Antworte in genau zwei Abschnitten.\n",
                "Schreibe zuerst eine Zeile {narrative} und danach den Sanierungsfahrplan als Fließtext, ",
                "gegliedert in Absätze mit Leerzeilen.\n",
                "Schreibe anschließend eine Zeile {chart} und danach ausschließlich ein JSON-Objekt ",
                "mit den Schlüsseln \"title\", \"ylabel\" und \"data\". ",
                "\"data\" ordnet jeder empfohlenen Maßnahme ihre geschätzten Kosten in Euro als Zahl zu, ",
                "zum Beispiel:\n",
                "{{\"title\": \"Geschätzte Kosten je Maßnahme\", \"ylabel\": \"Kosten in €\", ",
                "\"data\": {{\"Maßnahme A\": 15000, \"Maßnahme B\": 8000}}}}\n",
                "Verwende {narrative} und {chart} jeweils nur ein einziges Mal."
            ),
            narrative = NARRATIVE_MARKER,
            chart = CHART_MARKER,
        );

        let structured_instructions = String::from(concat!(
            "Antworte ausschließlich mit einem einzigen JSON-Objekt ohne weiteren Text:\n",
            "{\"narrative\": \"Sanierungsfahrplan als Fließtext, Absätze durch \\n\\n getrennt\", ",
            "\"chart\": {\"title\": \"Geschätzte Kosten je Maßnahme\", \"ylabel\": \"Kosten in €\", ",
            "\"data\": {\"Maßnahme A\": 15000, \"Maßnahme B\": 8000}}}\n",
            "\"data\" enthält für jede empfohlene Maßnahme die geschätzten Kosten in Euro als Zahl."
        ));

        Self {
            system,
            intro,
            narrative_instructions,
            chart_instructions,
            structured_instructions,
        }
    }
}

/// System and user message for one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(self.user.clone()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: PromptTemplate,
}

impl PromptBuilder {
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    pub fn build(&self, profile: &BuildingProfile, mode: OutputMode) -> Prompt {
        let attributes: Vec<String> = profile
            .attribute_lines()
            .into_iter()
            .map(|(label, value)| format!("- {}: {}", label, value))
            .collect();

        let instructions = match mode {
            OutputMode::Narrative => &self.template.narrative_instructions,
            OutputMode::Chart => &self.template.chart_instructions,
            OutputMode::Structured => &self.template.structured_instructions,
        };

        let user = format!(
            "{}\n{}\n\n{}",
            self.template.intro,
            attributes.join("\n"),
            instructions
        );

        Prompt {
            system: self.template.system.clone(),
            user,
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(PromptTemplate::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HeatingSystem, RenovationFocus, WindowCondition};

    fn profile() -> BuildingProfile {
        BuildingProfile {
            address: "Lindenweg 4, 01067 Dresden".into(),
            construction_year: 1962,
            floor_area_m2: 135.5,
            heating: HeatingSystem::HeatPump,
            roof_insulated: true,
            basement_ceiling_insulated: false,
            photovoltaic: true,
            windows: WindowCondition::PartiallyRenewed,
            electricity_kwh_per_year: Some(3200),
            gas_kwh_per_year: Some(8700),
            focus: Some(RenovationFocus::Efficiency),
        }
    }

    #[test]
    fn every_attribute_appears_exactly_once() {
        let builder = PromptBuilder::default();
        let profile = profile();
        for mode in [OutputMode::Narrative, OutputMode::Chart, OutputMode::Structured] {
            let prompt = builder.build(&profile, mode);
            let full = format!("{}\n{}", prompt.system, prompt.user);
            for (label, value) in profile.attribute_lines() {
                let line = format!("{}: {}", label, value);
                assert_eq!(full.matches(&line).count(), 1, "{} in {:?}", line, mode);
            }
            assert_eq!(full.matches("Lindenweg 4, 01067 Dresden").count(), 1);
            assert_eq!(full.matches("1962").count(), 1);
        }
    }

    #[test]
    fn chart_mode_requests_both_markers() {
        let prompt = PromptBuilder::default().build(&profile(), OutputMode::Chart);
        assert!(prompt.user.contains(NARRATIVE_MARKER));
        assert!(prompt.user.contains(CHART_MARKER));
        assert!(prompt.user.contains("\"ylabel\""));

        let narrative = PromptBuilder::default().build(&profile(), OutputMode::Narrative);
        assert!(!narrative.user.contains(CHART_MARKER));
    }

    #[test]
    fn structured_mode_describes_envelope() {
        let prompt = PromptBuilder::default().build(&profile(), OutputMode::Structured);
        assert!(prompt.user.contains("\"narrative\""));
        assert!(prompt.user.contains("\"chart\""));
        assert_eq!(prompt.messages().len(), 2);
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(OutputMode::from_str("narrative-only").unwrap(), OutputMode::Narrative);
        assert_eq!(OutputMode::from_str("JSON").unwrap(), OutputMode::Structured);
        assert!(OutputMode::from_str("pdf").is_err());
    }
}
