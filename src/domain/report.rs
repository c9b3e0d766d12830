use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::building::BuildingProfile;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub category: String,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(category: impl Into<String>, value: f64) -> Self {
        Self {
            category: category.into(),
            value,
        }
    }
}

/// Bar chart description. `data` keeps insertion order, which is also the
/// display order; it serializes as a JSON object `{category: value}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub ylabel: String,
    #[serde(serialize_with = "serialize_points")]
    pub data: Vec<ChartPoint>,
}

impl ChartSpec {
    pub fn new(title: impl Into<String>, ylabel: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ylabel: ylabel.into(),
            data: Vec::new(),
        }
    }

    pub fn with_point(mut self, category: impl Into<String>, value: f64) -> Self {
        self.data.push(ChartPoint::new(category, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn max_value(&self) -> f64 {
        self.data
            .iter()
            .map(|point| point.value)
            .fold(0.0_f64, f64::max)
    }

    /// Current energy consumption chart built from the profile, if the
    /// profile carries any consumption figures.
    pub fn energy_consumption(profile: &BuildingProfile) -> Option<Self> {
        let mut chart = ChartSpec::new("Aktueller Energieverbrauch", "kWh/Jahr");
        if let Some(kwh) = profile.electricity_kwh_per_year {
            chart = chart.with_point("Strom", f64::from(kwh));
        }
        if let Some(kwh) = profile.gas_kwh_per_year {
            chart = chart.with_point("Gas", f64::from(kwh));
        }
        (!chart.is_empty()).then_some(chart)
    }
}

#[allow(clippy::ptr_arg)]
fn serialize_points<S>(points: &Vec<ChartPoint>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(points.len()))?;
    for point in points {
        map.serialize_entry(&point.category, &point.value)?;
    }
    map.end()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenovationReport {
    pub narrative: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
}

impl RenovationReport {
    pub fn narrative_only(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            chart: None,
        }
    }

    pub fn with_chart(narrative: impl Into<String>, chart: ChartSpec) -> Self {
        Self {
            narrative: narrative.into(),
            chart: Some(chart),
        }
    }

    /// Narrative split at blank lines; each paragraph keeps its source lines
    /// so bullet lists survive.
    pub fn paragraphs(&self) -> Vec<Vec<String>> {
        let mut paragraphs = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for line in self.narrative.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if !current.is_empty() {
                    paragraphs.push(std::mem::take(&mut current));
                }
            } else {
                current.push(trimmed.to_string());
            }
        }
        if !current.is_empty() {
            paragraphs.push(current);
        }
        paragraphs
    }
}
