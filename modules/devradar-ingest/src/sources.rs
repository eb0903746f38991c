//! Source registry — configuration-time descriptors for every external
//! source the pipeline knows how to ingest.
//!
//! Page sizes track what each API tolerates; seen-index TTLs track how often
//! a source is realistically re-polled. Scheduler filters can override the
//! defaults per run but never add sources.

use std::time::Duration;

use devradar_common::{PaginationStyle, RecordKind, SourceDescriptor, SourceType};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

pub fn all_sources() -> Vec<SourceDescriptor> {
    vec![
        github_releases(),
        devto_articles(),
        lobsters_posts(),
        reddit_posts(),
        hackernews_posts(),
        kaggle_competitions(),
        devpost_hackathons(),
        rust_blog_articles(),
        github_blog_articles(),
        kernel_releases(),
    ]
}

pub fn source_descriptor(id: &str) -> Option<SourceDescriptor> {
    all_sources().into_iter().find(|d| d.id == id)
}

// ---------------------------------------------------------------------------
// API sources
// ---------------------------------------------------------------------------

fn github_releases() -> SourceDescriptor {
    SourceDescriptor {
        id: "github-releases",
        provider: "github",
        kind: RecordKind::Release,
        source_type: SourceType::Api,
        pagination: PaginationStyle::Offset,
        page_size: 50,
        max_pages: 10,
        batch_size: 100,
        request_timeout: MINUTE / 2,
        seen_ttl: 24 * HOUR,
        default_filters: &[("repo", "rust-lang/rust")],
    }
}

fn devto_articles() -> SourceDescriptor {
    SourceDescriptor {
        id: "devto-articles",
        provider: "devto",
        kind: RecordKind::Article,
        source_type: SourceType::Api,
        pagination: PaginationStyle::Offset,
        page_size: 100,
        max_pages: 10,
        batch_size: 200,
        request_timeout: MINUTE / 2,
        seen_ttl: 12 * HOUR,
        default_filters: &[("tag", "rust")],
    }
}

fn lobsters_posts() -> SourceDescriptor {
    SourceDescriptor {
        id: "lobsters-posts",
        provider: "lobsters",
        kind: RecordKind::Post,
        source_type: SourceType::Api,
        pagination: PaginationStyle::Offset,
        // The API pins pages at 25 stories.
        page_size: 25,
        max_pages: 4,
        batch_size: 50,
        request_timeout: MINUTE / 2,
        seen_ttl: 6 * HOUR,
        default_filters: &[],
    }
}

fn reddit_posts() -> SourceDescriptor {
    SourceDescriptor {
        id: "reddit-posts",
        provider: "reddit",
        kind: RecordKind::Post,
        source_type: SourceType::Api,
        pagination: PaginationStyle::Token,
        page_size: 100,
        max_pages: 10,
        batch_size: 200,
        request_timeout: MINUTE / 2,
        seen_ttl: 6 * HOUR,
        default_filters: &[("subreddit", "programming")],
    }
}

fn hackernews_posts() -> SourceDescriptor {
    SourceDescriptor {
        id: "hackernews-posts",
        provider: "hackernews",
        kind: RecordKind::Post,
        source_type: SourceType::Api,
        pagination: PaginationStyle::TimeWindow,
        page_size: 100,
        max_pages: 20,
        batch_size: 200,
        request_timeout: MINUTE / 2,
        seen_ttl: 6 * HOUR,
        default_filters: &[],
    }
}

fn kaggle_competitions() -> SourceDescriptor {
    SourceDescriptor {
        id: "kaggle-competitions",
        provider: "kaggle",
        kind: RecordKind::Competition,
        source_type: SourceType::Api,
        pagination: PaginationStyle::Offset,
        // The list endpoint serves fixed pages of 20.
        page_size: 20,
        max_pages: 5,
        batch_size: 50,
        request_timeout: MINUTE,
        seen_ttl: 24 * HOUR,
        default_filters: &[],
    }
}

fn devpost_hackathons() -> SourceDescriptor {
    SourceDescriptor {
        id: "devpost-hackathons",
        provider: "devpost",
        kind: RecordKind::Competition,
        source_type: SourceType::Api,
        pagination: PaginationStyle::Offset,
        page_size: 10,
        max_pages: 10,
        batch_size: 50,
        request_timeout: MINUTE,
        seen_ttl: 24 * HOUR,
        default_filters: &[],
    }
}

// ---------------------------------------------------------------------------
// Feed sources — one fetch per run, window-bounded
// ---------------------------------------------------------------------------

fn rust_blog_articles() -> SourceDescriptor {
    SourceDescriptor {
        id: "rust-blog-articles",
        provider: "rust-blog",
        kind: RecordKind::Article,
        source_type: SourceType::Feed,
        pagination: PaginationStyle::TimeWindow,
        page_size: 100,
        max_pages: 1,
        batch_size: 50,
        request_timeout: MINUTE / 2,
        seen_ttl: 24 * HOUR,
        default_filters: &[("feed_url", "https://blog.rust-lang.org/feed.xml")],
    }
}

fn github_blog_articles() -> SourceDescriptor {
    SourceDescriptor {
        id: "github-blog-articles",
        provider: "github-blog",
        kind: RecordKind::Article,
        source_type: SourceType::Feed,
        pagination: PaginationStyle::TimeWindow,
        page_size: 100,
        max_pages: 1,
        batch_size: 50,
        request_timeout: MINUTE / 2,
        seen_ttl: 24 * HOUR,
        default_filters: &[("feed_url", "https://github.blog/feed/")],
    }
}

fn kernel_releases() -> SourceDescriptor {
    SourceDescriptor {
        id: "kernel-releases",
        provider: "kernel",
        kind: RecordKind::Release,
        source_type: SourceType::Feed,
        pagination: PaginationStyle::TimeWindow,
        page_size: 100,
        max_pages: 1,
        batch_size: 50,
        request_timeout: MINUTE / 2,
        seen_ttl: 24 * HOUR,
        default_filters: &[("feed_url", "https://www.kernel.org/feeds/kdist.xml")],
    }
}
