mod llm_client;
mod messages;
mod parser;
mod pipeline;
mod prompt;

pub use llm_client::{CompletionClient, MockCompletionClient, OpenAiCompletionClient, DEFAULT_ENDPOINT};
pub use messages::{ChatMessage, ChatRole, CompletionRequest};
pub use parser::{decode_chart, extract_json_object, parse_completion, parse_envelope, parse_marked};
pub use pipeline::{AnalysisPipeline, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
pub use prompt::{OutputMode, Prompt, PromptBuilder, PromptTemplate, CHART_MARKER, NARRATIVE_MARKER};
