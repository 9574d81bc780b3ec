pub mod config;
pub mod error;
pub mod pool;
pub mod source;
pub mod types;
pub mod urls;

pub use config::{Config, DEFAULT_WINDOW_HOURS, RANKED_KEYWORDS, REUSE_SNAPSHOT_WINDOW};
pub use error::{PipelineError, PipelineResult};
pub use source::SourceAdapter;
pub use types::{
    contains_hangul, truncate_chars, Item, KeywordCandidate, Lang, NormalizedKeyword,
    PrimaryType, SourceKind, Tier,
};
pub use urls::{canonicalize_url, host_of};
