use crate::advisor::{AnalysisPipeline, CompletionClient, OutputMode};
use crate::config::SettingsWriter;
use crate::domain::{BuildingProfile, ChartSpec, RenovationReport};
use crate::error::{AuthError, PipelineError};
use crate::render::{RenderedDocument, ReportRenderer};
use anyhow::Result;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use super::gate::PasswordGate;

/// State of one user session. Starts empty; every successful analysis
/// replaces the previous report and document.
#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    gate: PasswordGate,
    last_report: Option<RenovationReport>,
    last_document: Option<RenderedDocument>,
}

impl SessionContext {
    pub fn new(gate: PasswordGate) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, "Sitzung gestartet");
        Self {
            id,
            gate,
            last_report: None,
            last_document: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn gate(&self) -> &PasswordGate {
        &self.gate
    }

    pub fn submit_password(&mut self, candidate: &str) -> Result<(), AuthError> {
        self.gate.submit(candidate)
    }

    pub fn last_report(&self) -> Option<&RenovationReport> {
        self.last_report.as_ref()
    }

    pub fn last_chart(&self) -> Option<&ChartSpec> {
        self.last_report.as_ref().and_then(|report| report.chart.as_ref())
    }

    pub fn last_document(&self) -> Option<&RenderedDocument> {
        self.last_document.as_ref()
    }

    /// Runs the whole chain for one button press. Nothing is stored unless
    /// every step succeeds.
    pub fn run_analysis<C: CompletionClient>(
        &mut self,
        pipeline: &AnalysisPipeline<C>,
        renderer: &ReportRenderer,
        profile: &BuildingProfile,
        mode: OutputMode,
    ) -> Result<&RenderedDocument, PipelineError> {
        self.gate.ensure_unlocked()?;
        let report = pipeline.analyze(profile, mode)?;
        let document = renderer.render(&report, profile)?;
        info!(session = %self.id, file = %document.file_name, "Analyse gespeichert");
        self.last_report = Some(report);
        Ok(self.last_document.insert(document))
    }

    /// Renders an already available completion answer, e.g. one saved
    /// from an earlier run.
    pub fn render_report(
        &mut self,
        renderer: &ReportRenderer,
        report: RenovationReport,
        profile: &BuildingProfile,
    ) -> Result<&RenderedDocument, PipelineError> {
        self.gate.ensure_unlocked()?;
        let document = renderer.render(&report, profile)?;
        self.last_report = Some(report);
        Ok(self.last_document.insert(document))
    }

    /// Overwrites the API key in the configuration file. Open to any
    /// unlocked session; the log line is the only trace.
    pub fn rewrite_api_key(&self, config_path: &Path, api_key: &str) -> Result<()> {
        self.gate.ensure_unlocked()?;
        SettingsWriter::rewrite_api_key(config_path, api_key)?;
        info!(session = %self.id, path = %config_path.display(), "API-Schlüssel geändert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{MockCompletionClient, PromptTemplate};
    use crate::config::SettingsLoader;
    use crate::domain::{HeatingSystem, WindowCondition};
    use std::sync::Arc;

    fn profile() -> BuildingProfile {
        BuildingProfile {
            address: "Domplatz 2, 48143 Münster".into(),
            construction_year: 1985,
            floor_area_m2: 95.0,
            heating: HeatingSystem::Pellet,
            roof_insulated: true,
            basement_ceiling_insulated: true,
            photovoltaic: false,
            windows: WindowCondition::New,
            electricity_kwh_per_year: None,
            gas_kwh_per_year: None,
            focus: None,
        }
    }

    #[test]
    fn starts_empty_and_keeps_last_result() {
        let mock = Arc::new(MockCompletionClient::default());
        mock.push_response("[TEXT]\nErste\n[DIAGRAMM]\n{\"title\":\"T\",\"ylabel\":\"€\",\"data\":{\"A\":1}}");
        mock.push_response("Zweite");
        let pipeline = AnalysisPipeline::new(mock, PromptTemplate::default());
        let renderer = ReportRenderer::new();
        let mut session = SessionContext::new(PasswordGate::open());
        assert!(session.last_report().is_none());
        assert!(session.last_document().is_none());

        session
            .run_analysis(&pipeline, &renderer, &profile(), OutputMode::Chart)
            .unwrap();
        assert_eq!(session.last_chart().unwrap().title, "T");

        session
            .run_analysis(&pipeline, &renderer, &profile(), OutputMode::Narrative)
            .unwrap();
        assert_eq!(session.last_report().unwrap().narrative, "Zweite");
        assert!(session.last_chart().is_none());
    }

    #[test]
    fn failed_run_keeps_previous_result() {
        let mock = Arc::new(MockCompletionClient::default());
        mock.push_response("Gut");
        mock.push_response("ohne Marker");
        let pipeline = AnalysisPipeline::new(mock, PromptTemplate::default());
        let renderer = ReportRenderer::new();
        let mut session = SessionContext::new(PasswordGate::open());

        session
            .run_analysis(&pipeline, &renderer, &profile(), OutputMode::Narrative)
            .unwrap();
        let err = session
            .run_analysis(&pipeline, &renderer, &profile(), OutputMode::Chart)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
        assert_eq!(session.last_report().unwrap().narrative, "Gut");
    }

    #[test]
    fn locked_out_session_refuses_protected_operations() {
        let mock = Arc::new(MockCompletionClient::default());
        let pipeline = AnalysisPipeline::new(mock.clone(), PromptTemplate::default());
        let renderer = ReportRenderer::new();
        let mut session = SessionContext::new(PasswordGate::new("richtig"));

        for candidate in ["a", "b", "c"] {
            assert!(session.submit_password(candidate).is_err());
        }
        assert_eq!(session.submit_password("richtig"), Err(AuthError::LockedOut));

        let err = session
            .run_analysis(&pipeline, &renderer, &profile(), OutputMode::Narrative)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Auth(AuthError::LockedOut)));
        assert!(mock.requests().is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        assert!(session.rewrite_api_key(&path, "sk-neu").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn unlocked_session_may_rewrite_api_key() {
        let mut session = SessionContext::new(PasswordGate::new("richtig"));
        session.submit_password("richtig").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        session.rewrite_api_key(&path, "sk-neu").unwrap();
        let settings = SettingsLoader::load_file(&path).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("sk-neu"));
    }
}
