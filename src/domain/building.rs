use anyhow::{self, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeatingSystem {
    Gas,
    Oil,
    HeatPump,
    Pellet,
    DistrictHeat,
    Electric,
    Other,
}

impl HeatingSystem {
    pub fn label(self) -> &'static str {
        match self {
            HeatingSystem::Gas => "Gasheizung",
            HeatingSystem::Oil => "Ölheizung",
            HeatingSystem::HeatPump => "Wärmepumpe",
            HeatingSystem::Pellet => "Pelletheizung",
            HeatingSystem::DistrictHeat => "Fernwärme",
            HeatingSystem::Electric => "Elektroheizung",
            HeatingSystem::Other => "sonstige Heizung",
        }
    }

    pub fn all() -> &'static [HeatingSystem] {
        const ALL: &[HeatingSystem] = &[
            HeatingSystem::Gas,
            HeatingSystem::Oil,
            HeatingSystem::HeatPump,
            HeatingSystem::Pellet,
            HeatingSystem::DistrictHeat,
            HeatingSystem::Electric,
            HeatingSystem::Other,
        ];
        ALL
    }
}

impl fmt::Display for HeatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for HeatingSystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '_'], "-");
        let candidate = match normalized.as_str() {
            "gas" | "gasheizung" => HeatingSystem::Gas,
            "oil" | "öl" | "oel" | "ölheizung" => HeatingSystem::Oil,
            "heat-pump" | "heatpump" | "wärmepumpe" | "waermepumpe" => HeatingSystem::HeatPump,
            "pellet" | "pellets" | "pelletheizung" => HeatingSystem::Pellet,
            "district-heat" | "district-heating" | "fernwärme" | "fernwaerme" => {
                HeatingSystem::DistrictHeat
            }
            "electric" | "strom" | "elektroheizung" => HeatingSystem::Electric,
            "other" | "sonstige" => HeatingSystem::Other,
            _ => anyhow::bail!("unbekanntes Heizsystem: {}", s),
        };
        Ok(candidate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowCondition {
    Old,
    PartiallyRenewed,
    New,
}

impl WindowCondition {
    pub fn label(self) -> &'static str {
        match self {
            WindowCondition::Old => "alt",
            WindowCondition::PartiallyRenewed => "teilweise erneuert",
            WindowCondition::New => "neu",
        }
    }
}

impl fmt::Display for WindowCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for WindowCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '_'], "-");
        let candidate = match normalized.as_str() {
            "old" | "alt" => WindowCondition::Old,
            "partially-renewed" | "partial" | "teilweise-erneuert" | "teilweise" => {
                WindowCondition::PartiallyRenewed
            }
            "new" | "neu" => WindowCondition::New,
            _ => anyhow::bail!("unbekannter Fensterzustand: {}", s),
        };
        Ok(candidate)
    }
}

/// What the owner wants the renovation to achieve first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenovationFocus {
    Co2Reduction,
    CostSaving,
    Efficiency,
}

impl RenovationFocus {
    pub fn label(self) -> &'static str {
        match self {
            RenovationFocus::Co2Reduction => "CO₂-Reduktion",
            RenovationFocus::CostSaving => "Kosten sparen",
            RenovationFocus::Efficiency => "Effizienz erhöhen",
        }
    }
}

impl fmt::Display for RenovationFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for RenovationFocus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '_'], "-");
        let candidate = match normalized.as_str() {
            "co2-reduction" | "co2" | "co2-reduktion" => RenovationFocus::Co2Reduction,
            "cost-saving" | "costs" | "kosten" | "kosten-sparen" => RenovationFocus::CostSaving,
            "efficiency" | "effizienz" | "effizienz-erhöhen" => RenovationFocus::Efficiency,
            _ => anyhow::bail!("unbekannter Sanierungsfokus: {}", s),
        };
        Ok(candidate)
    }
}

/// Building attributes as submitted through the input form.
///
/// Range checks (construction year, floor area) belong to the form layer;
/// any value that reaches this type is accepted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingProfile {
    #[serde(default)]
    pub address: String,
    pub construction_year: u16,
    pub floor_area_m2: f64,
    pub heating: HeatingSystem,
    #[serde(default)]
    pub roof_insulated: bool,
    #[serde(default)]
    pub basement_ceiling_insulated: bool,
    #[serde(default)]
    pub photovoltaic: bool,
    pub windows: WindowCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electricity_kwh_per_year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_kwh_per_year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<RenovationFocus>,
}

impl BuildingProfile {
    /// Labelled attribute lines in display order. Optional attributes only
    /// appear when set.
    pub fn attribute_lines(&self) -> Vec<(&'static str, String)> {
        let address = if self.address.trim().is_empty() {
            "nicht angegeben".to_string()
        } else {
            self.address.trim().to_string()
        };

        let mut lines = vec![
            ("Adresse", address),
            ("Baujahr", self.construction_year.to_string()),
            ("Wohnfläche", format!("{} m²", format_area(self.floor_area_m2))),
            ("Heizsystem", self.heating.label().to_string()),
            ("Dachdämmung", insulation_label(self.roof_insulated)),
            (
                "Dämmung der Kellerdecke",
                insulation_label(self.basement_ceiling_insulated),
            ),
            (
                "Photovoltaikanlage",
                if self.photovoltaic {
                    "vorhanden".to_string()
                } else {
                    "nicht vorhanden".to_string()
                },
            ),
            ("Zustand der Fenster", self.windows.label().to_string()),
        ];

        if let Some(kwh) = self.electricity_kwh_per_year {
            lines.push(("Stromverbrauch", format!("{} kWh/Jahr", kwh)));
        }
        if let Some(kwh) = self.gas_kwh_per_year {
            lines.push(("Gasverbrauch", format!("{} kWh/Jahr", kwh)));
        }
        if let Some(focus) = self.focus {
            lines.push(("Fokus der Sanierung", focus.label().to_string()));
        }
        lines
    }
}

fn insulation_label(insulated: bool) -> String {
    if insulated {
        "vorhanden".to_string()
    } else {
        "nicht vorhanden".to_string()
    }
}

pub fn format_area(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value).replace('.', ",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enum_aliases() {
        assert_eq!(
            HeatingSystem::from_str("Heat Pump").unwrap(),
            HeatingSystem::HeatPump
        );
        assert_eq!(
            HeatingSystem::from_str("fernwärme").unwrap(),
            HeatingSystem::DistrictHeat
        );
        assert_eq!(
            WindowCondition::from_str("partially_renewed").unwrap(),
            WindowCondition::PartiallyRenewed
        );
        assert_eq!(
            RenovationFocus::from_str("CO2").unwrap(),
            RenovationFocus::Co2Reduction
        );
        assert!(HeatingSystem::from_str("kohle").is_err());
    }

    #[test]
    fn profile_deserializes_kebab_case_enums() {
        let json = r#"{
            "address": "Lindenweg 4, 01067 Dresden",
            "construction_year": 1962,
            "floor_area_m2": 135.5,
            "heating": "district-heat",
            "roof_insulated": true,
            "windows": "partially-renewed"
        }"#;
        let profile: BuildingProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.heating, HeatingSystem::DistrictHeat);
        assert!(!profile.photovoltaic);
        assert_eq!(profile.gas_kwh_per_year, None);

        let lines = profile.attribute_lines();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[2], ("Wohnfläche", "135,5 m²".to_string()));
    }

    #[test]
    fn blank_address_is_labelled() {
        let profile = BuildingProfile {
            address: "   ".into(),
            construction_year: 1990,
            floor_area_m2: 90.0,
            heating: HeatingSystem::Oil,
            roof_insulated: false,
            basement_ceiling_insulated: false,
            photovoltaic: false,
            windows: WindowCondition::Old,
            electricity_kwh_per_year: Some(3000),
            gas_kwh_per_year: None,
            focus: Some(RenovationFocus::CostSaving),
        };
        let lines = profile.attribute_lines();
        assert_eq!(lines[0].1, "nicht angegeben");
        assert!(lines
            .iter()
            .any(|(label, value)| *label == "Stromverbrauch" && value == "3000 kWh/Jahr"));
        assert_eq!(lines.last().unwrap().1, "Kosten sparen");
    }
}
