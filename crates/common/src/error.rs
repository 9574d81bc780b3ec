use thiserror::Error;

/// Failure kinds shared by the source adapters. Adapters never propagate
/// these past their `collect` boundary; they log and return empty.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("Feed parsing failed: {0}")]
    FeedParse(String),

    #[error("HTML parsing failed: {0}")]
    HtmlParse(String),

    #[error("API error: {0}")]
    Api(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
