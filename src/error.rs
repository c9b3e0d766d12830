//! Failure taxonomy of the analysis pipeline.
//!
//! Every variant is terminal for the current action: nothing is retried
//! automatically and no partial document is produced.

use thiserror::Error;

/// The completion service could not deliver a usable answer.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("KI-Dienst nicht erreichbar: {0}")]
    Unreachable(String),

    #[error("Zeitüberschreitung nach {0} Sekunden")]
    Timeout(u64),

    #[error("KI-Dienst antwortete mit HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Antwort des KI-Dienstes unlesbar: {0}")]
    InvalidBody(String),

    #[error("KI-Dienst lieferte keine Antwort")]
    NoChoices,
}

impl UpstreamError {
    /// Transport failures, rate limiting and server errors may succeed on a
    /// second attempt; everything else will not.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Unreachable(_) | UpstreamError::Timeout(_) => true,
            UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
            UpstreamError::InvalidBody(_) | UpstreamError::NoChoices => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("Markierung {0} fehlt")]
    MissingMarker(&'static str),

    #[error("Markierung {chart} steht vor {narrative}")]
    MarkerOrder {
        narrative: &'static str,
        chart: &'static str,
    },

    #[error("kein gültiges JSON gefunden")]
    InvalidJson,

    #[error("Pflichtfeld \"{0}\" fehlt oder hat den falschen Typ")]
    MissingKey(&'static str),

    #[error("Wert für \"{0}\" ist keine Zahl")]
    NonNumeric(String),

    #[error("Diagrammdaten sind leer")]
    EmptyData,
}

/// The completion text could not be decomposed. `raw` keeps the undecoded
/// answer for diagnostic display.
#[derive(Debug, Clone, Error)]
#[error("Antwort konnte nicht ausgewertet werden: {failure}")]
pub struct ParseError {
    pub failure: ParseFailure,
    pub raw: String,
}

impl ParseError {
    pub fn new(failure: ParseFailure, raw: impl Into<String>) -> Self {
        Self {
            failure,
            raw: raw.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Falsches Passwort ({remaining} Versuche verbleibend)")]
    WrongPassword { remaining: u32 },

    #[error("Zu viele Fehlversuche, der Zugang ist für diese Sitzung gesperrt")]
    LockedOut,

    #[error("Zugang nicht freigeschaltet")]
    NotUnlocked,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF konnte nicht erzeugt werden: {0}")]
    Pdf(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
