use std::fmt;

/// Errors the extractor and processor distinguish at their boundary.
///
/// Tagged variants rather than exceptions/sentinels, per the pipeline's
/// retry and user-visibility rules (see `PROCESSOR` error handling).
#[derive(Debug)]
pub enum PipelineError {
    /// Network/5xx failure, already retried to exhaustion inside the extractor.
    TransientFetch(String),
    /// 4xx/DNS failure, not worth retrying.
    PermanentFetch(String),
    /// Extraction succeeded technically but failed the quality gate.
    LowQuality(String),
    /// A stage exceeded its bound (extraction 120s, normalization 240s, ...).
    Timeout(&'static str),
    /// The Store returned an error.
    Store(sqlx::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::TransientFetch(msg) => write!(f, "transient fetch error: {msg}"),
            PipelineError::PermanentFetch(msg) => write!(f, "permanent fetch error: {msg}"),
            PipelineError::LowQuality(msg) => write!(f, "low-quality extraction: {msg}"),
            PipelineError::Timeout(stage) => write!(f, "{stage} timed out"),
            PipelineError::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Store(err)
    }
}

/// Outcome of a single `Extractor::extract` call.
#[derive(Debug, Clone)]
pub enum ExtractionResult {
    Success {
        title: String,
        body: String,
        source_domain: String,
        method: ExtractionMethod,
    },
    Failure {
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Fast,
    Rendered,
    SummaryFallback,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Fast => write!(f, "fast"),
            ExtractionMethod::Rendered => write!(f, "rendered"),
            ExtractionMethod::SummaryFallback => write!(f, "summary_fallback"),
        }
    }
}

/// Outcome of `Clusterer::cluster`.
#[derive(Debug, Clone)]
pub enum ClusterDecision {
    Joined { cluster_id: i64, similarity: f32 },
    Founded { cluster_id: i64, peers: Vec<i64> },
    Singleton,
}
