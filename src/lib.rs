pub mod advisor;
pub mod config;
pub mod domain;
pub mod error;
pub mod render;
pub mod session;
pub mod utils;

pub use advisor::{AnalysisPipeline, CompletionClient, OpenAiCompletionClient, OutputMode, PromptBuilder};
pub use domain::{BuildingProfile, ChartSpec, RenovationReport};
pub use error::{AuthError, ParseError, PipelineError, UpstreamError};
pub use render::{RenderedDocument, ReportRenderer};
pub use session::{PasswordGate, SessionContext};
