use common::{contains_hangul, Lang, Tier};

/// One configured RSS/Atom feed.
#[derive(Debug, Clone)]
pub struct FeedSpec {
    pub url: String,
    pub title: String,
    pub tier: Tier,
    pub lang: Lang,
}

impl FeedSpec {
    fn new(url: &str, title: &str, tier: Tier, lang: Lang) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            tier,
            lang,
        }
    }
}

/// The curated feed list. Vendor blogs are P0, tech media P1.
pub fn curated_feeds() -> Vec<FeedSpec> {
    vec![
        FeedSpec::new(
            "https://openai.com/news/rss.xml",
            "OpenAI News",
            Tier::P0Curated,
            Lang::En,
        ),
        FeedSpec::new(
            "https://deepmind.google/blog/rss.xml",
            "Google DeepMind Blog",
            Tier::P0Curated,
            Lang::En,
        ),
        FeedSpec::new(
            "https://huggingface.co/blog/feed.xml",
            "Hugging Face Blog",
            Tier::P0Curated,
            Lang::En,
        ),
        FeedSpec::new(
            "https://blogs.microsoft.com/ai/feed/",
            "Microsoft AI Blog",
            Tier::P0Curated,
            Lang::En,
        ),
        FeedSpec::new(
            "https://aws.amazon.com/blogs/machine-learning/feed/",
            "AWS Machine Learning Blog",
            Tier::P0Curated,
            Lang::En,
        ),
        FeedSpec::new(
            "https://techcrunch.com/category/artificial-intelligence/feed/",
            "TechCrunch AI",
            Tier::P1Context,
            Lang::En,
        ),
        FeedSpec::new(
            "https://venturebeat.com/category/ai/feed/",
            "VentureBeat AI",
            Tier::P1Context,
            Lang::En,
        ),
        FeedSpec::new(
            "https://www.technologyreview.com/topic/artificial-intelligence/feed",
            "MIT Technology Review AI",
            Tier::P1Context,
            Lang::En,
        ),
        FeedSpec::new(
            "https://www.aitimes.com/rss/allArticle.xml",
            "AI타임스",
            Tier::P1Context,
            Lang::Ko,
        ),
        FeedSpec::new(
            "https://zdnet.co.kr/news/news_xml.asp?type=ai",
            "지디넷코리아 AI",
            Tier::P2Raw,
            Lang::Ko,
        ),
    ]
}

/// One tracked YouTube channel.
#[derive(Debug, Clone)]
pub struct YoutubeChannel {
    pub channel_id: String,
    pub name: String,
}

impl YoutubeChannel {
    pub fn new(channel_id: &str, name: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            name: name.to_string(),
        }
    }

    pub fn feed_url(&self) -> String {
        format!(
            "https://www.youtube.com/feeds/videos.xml?channel_id={}",
            self.channel_id
        )
    }

    /// Channels named in Hangul publish in Korean.
    pub fn lang(&self) -> Lang {
        if contains_hangul(&self.name) {
            Lang::Ko
        } else {
            Lang::En
        }
    }
}

pub fn youtube_channels() -> Vec<YoutubeChannel> {
    vec![
        YoutubeChannel::new("UCXZCJLdBC09xxGZ6gcdrc6A", "OpenAI"),
        YoutubeChannel::new("UCbfYPyITQ-7l4upoX8nvctg", "Two Minute Papers"),
        YoutubeChannel::new("UCQNE2JmbasNYbjGAcuBiRRg", "조코딩 JoCoding"),
        YoutubeChannel::new("UCt2wAAXgm87ACiQnDHQEW6Q", "테디노트 TeddyNote"),
        YoutubeChannel::new("UCSHZKyawb77ixDdsGog4iWA", "Lex Fridman"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_lang_heuristic() {
        assert_eq!(YoutubeChannel::new("x", "OpenAI").lang(), Lang::En);
        assert_eq!(YoutubeChannel::new("x", "조코딩 JoCoding").lang(), Lang::Ko);
    }

    #[test]
    fn catalog_is_nonempty_and_tiered() {
        let feeds = curated_feeds();
        assert!(!feeds.is_empty());
        assert!(feeds.iter().any(|f| f.tier == Tier::P0Curated));
        assert!(feeds.iter().any(|f| f.lang == Lang::Ko));
    }
}
