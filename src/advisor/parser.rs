//! Decomposes a completion answer into narrative and chart data.
//!
//! Two answer contracts exist. The JSON envelope
//! `{"narrative": "...", "chart": {...}}` is preferred; the marker layout
//! `[TEXT] ... [DIAGRAMM] {...}` is still accepted because older prompts
//! produce it. Only the first occurrence of each marker counts.

use crate::domain::{ChartPoint, ChartSpec, RenovationReport};
use crate::error::{ParseError, ParseFailure};
use serde_json::{Map, Value};

use super::prompt::{OutputMode, CHART_MARKER, NARRATIVE_MARKER};

pub fn parse_completion(raw: &str, mode: OutputMode) -> Result<RenovationReport, ParseError> {
    match mode {
        OutputMode::Narrative => Ok(RenovationReport::narrative_only(raw.trim())),
        OutputMode::Chart => parse_marked(raw).map_err(|failure| ParseError::new(failure, raw)),
        OutputMode::Structured => match parse_envelope(raw) {
            Some(parsed) => parsed.map_err(|failure| ParseError::new(failure, raw)),
            None => parse_marked(raw).map_err(|failure| ParseError::new(failure, raw)),
        },
    }
}

/// Legacy `[TEXT]`/`[DIAGRAMM]` layout.
pub fn parse_marked(raw: &str) -> Result<RenovationReport, ParseFailure> {
    let text_pos = raw
        .find(NARRATIVE_MARKER)
        .ok_or(ParseFailure::MissingMarker(NARRATIVE_MARKER))?;
    let chart_pos = raw
        .find(CHART_MARKER)
        .ok_or(ParseFailure::MissingMarker(CHART_MARKER))?;
    if chart_pos < text_pos {
        return Err(ParseFailure::MarkerOrder {
            narrative: NARRATIVE_MARKER,
            chart: CHART_MARKER,
        });
    }

    let narrative = raw[text_pos + NARRATIVE_MARKER.len()..chart_pos].trim();
    let section = raw[chart_pos + CHART_MARKER.len()..].trim();
    let value = extract_json_object(section).ok_or(ParseFailure::InvalidJson)?;
    let chart = decode_chart(&value)?;

    Ok(RenovationReport::with_chart(narrative, chart))
}

/// JSON envelope contract. `None` means the text is not an envelope at all
/// and the marker layout should be tried; an envelope with a malformed chart
/// reports the chart failure itself.
pub fn parse_envelope(raw: &str) -> Option<Result<RenovationReport, ParseFailure>> {
    let value = extract_json_object(raw)?;
    let object = value.as_object()?;
    let narrative = object.get("narrative")?.as_str()?.trim().to_string();
    let parsed = match object.get("chart") {
        None | Some(Value::Null) => Ok(RenovationReport::narrative_only(narrative)),
        Some(chart) => {
            decode_chart(chart).map(|chart| RenovationReport::with_chart(narrative, chart))
        }
    };
    Some(parsed)
}

pub fn decode_chart(value: &Value) -> Result<ChartSpec, ParseFailure> {
    let object = value.as_object().ok_or(ParseFailure::InvalidJson)?;
    let title = required_str(object, "title")?;
    let ylabel = required_str(object, "ylabel")?;
    let data = object
        .get("data")
        .and_then(Value::as_object)
        .ok_or(ParseFailure::MissingKey("data"))?;

    if data.is_empty() {
        return Err(ParseFailure::EmptyData);
    }

    let mut points = Vec::with_capacity(data.len());
    for (category, value) in data {
        let number = value
            .as_f64()
            .filter(|n| n.is_finite())
            .ok_or_else(|| ParseFailure::NonNumeric(category.clone()))?;
        points.push(ChartPoint::new(category.clone(), number));
    }

    Ok(ChartSpec {
        title,
        ylabel,
        data: points,
    })
}

fn required_str(object: &Map<String, Value>, key: &'static str) -> Result<String, ParseFailure> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or(ParseFailure::MissingKey(key))
}

/// Finds a JSON object in model output: the whole text, a fenced block, or
/// the span from the first `{` to the last `}`.
pub fn extract_json_object(s: &str) -> Option<Value> {
    let t = s.trim().trim_matches(|c| c == '\u{feff}');

    if let Ok(v) = serde_json::from_str::<Value>(t) {
        return v.is_object().then_some(v);
    }

    for fence in ["```json", "```"] {
        if let Some(start) = t.find(fence) {
            let rest = &t[start + fence.len()..];
            if let Some(end) = rest.find("```") {
                if let Ok(v) = serde_json::from_str::<Value>(rest[..end].trim()) {
                    if v.is_object() {
                        return Some(v);
                    }
                }
            }
        }
    }

    let i = t.find('{')?;
    let j = t.rfind('}')?;
    if i < j {
        if let Ok(v) = serde_json::from_str::<Value>(&t[i..=j]) {
            return v.is_object().then_some(v);
        }
    }

    None
}
