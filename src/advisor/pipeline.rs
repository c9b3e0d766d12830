use super::llm_client::CompletionClient;
use super::messages::CompletionRequest;
use super::parser::parse_completion;
use super::prompt::{OutputMode, Prompt, PromptBuilder, PromptTemplate};
use crate::domain::{BuildingProfile, RenovationReport};
use crate::error::PipelineError;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Profile in, report out: prompt, one completion call, parse.
pub struct AnalysisPipeline<C: CompletionClient> {
    llm: Arc<C>,
    prompt_builder: PromptBuilder,
    model: String,
    temperature: f32,
}

impl<C: CompletionClient> AnalysisPipeline<C> {
    pub fn new(llm: Arc<C>, template: PromptTemplate) -> Self {
        Self {
            llm,
            prompt_builder: PromptBuilder::new(template),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    pub fn prompt_for(&self, profile: &BuildingProfile, mode: OutputMode) -> Prompt {
        self.prompt_builder.build(profile, mode)
    }

    pub fn analyze(
        &self,
        profile: &BuildingProfile,
        mode: OutputMode,
    ) -> Result<RenovationReport, PipelineError> {
        let prompt = self.prompt_for(profile, mode);
        let request = CompletionRequest::new(&self.model, self.temperature, prompt.messages())
            .with_json_response(mode == OutputMode::Structured);
        debug!(mode = %mode, prompt_chars = prompt.user.len(), model = %self.model, "Anfrage an KI-Dienst");

        let raw = self.llm.complete(&request).map_err(|err| {
            error!(error = %err, "KI-Dienst fehlgeschlagen");
            err
        })?;

        let report = parse_completion(&raw, mode).map_err(|err| {
            error!(failure = %err.failure, raw_chars = err.raw.len(), "Antwort nicht auswertbar");
            err
        })?;

        info!(
            mode = %mode,
            paragraphs = report.paragraphs().len(),
            chart_points = report.chart.as_ref().map_or(0, |c| c.data.len()),
            "Analyse abgeschlossen"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::llm_client::MockCompletionClient;
    use crate::advisor::messages::ChatRole;
    use crate::domain::{HeatingSystem, WindowCondition};
    use crate::error::UpstreamError;

    fn profile() -> BuildingProfile {
        BuildingProfile {
            address: "Hauptstraße 12, 79098 Freiburg".into(),
            construction_year: 1978,
            floor_area_m2: 140.0,
            heating: HeatingSystem::Oil,
            roof_insulated: false,
            basement_ceiling_insulated: false,
            photovoltaic: false,
            windows: WindowCondition::Old,
            electricity_kwh_per_year: None,
            gas_kwh_per_year: None,
            focus: None,
        }
    }

    #[test]
    fn sends_messages_with_model_and_temperature() {
        let mock = Arc::new(MockCompletionClient::default());
        mock.push_response("Dach dämmen.");
        let pipeline = AnalysisPipeline::new(mock.clone(), PromptTemplate::default())
            .with_model("gpt-4o-mini")
            .with_temperature(0.2);

        let report = pipeline.analyze(&profile(), OutputMode::Narrative).unwrap();
        assert_eq!(report.narrative, "Dach dämmen.");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert_eq!(requests[0].temperature, 0.2);
        assert!(!requests[0].json_response);
        assert_eq!(requests[0].messages[0].role, ChatRole::System);
        assert!(requests[0].messages[1].content.contains("Baujahr: 1978"));
    }

    #[test]
    fn structured_mode_asks_for_json() {
        let mock = Arc::new(MockCompletionClient::default());
        mock.push_response(r#"{"narrative":"Text","chart":null}"#);
        let pipeline = AnalysisPipeline::new(mock.clone(), PromptTemplate::default());
        pipeline.analyze(&profile(), OutputMode::Structured).unwrap();
        assert!(mock.requests()[0].json_response);
    }

    #[test]
    fn upstream_and_parse_failures_propagate() {
        let mock = Arc::new(MockCompletionClient::default());
        mock.push_error(UpstreamError::Status {
            status: 500,
            body: "boom".into(),
        });
        mock.push_response("kein Marker");
        let pipeline = AnalysisPipeline::new(mock, PromptTemplate::default());

        let err = pipeline.analyze(&profile(), OutputMode::Chart).unwrap_err();
        assert!(matches!(err, PipelineError::Upstream(UpstreamError::Status { status: 500, .. })));

        let err = pipeline.analyze(&profile(), OutputMode::Chart).unwrap_err();
        match err {
            PipelineError::Parse(parse) => assert_eq!(parse.raw, "kein Marker"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
