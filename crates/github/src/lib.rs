pub mod client;
pub mod markdown;
pub mod releases;
pub mod search;

pub use client::GithubClient;
pub use markdown::MarkdownListingAdapter;
pub use releases::GithubReleasesAdapter;
pub use search::GithubSearchAdapter;
