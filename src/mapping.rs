use crate::content::{ContentRecord, ModerationStatus};
use crate::import::ImportCandidate;

fn opt(s: &str) -> Option<String> {
    Some(s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Fixed candidate -> news record mapping used by the import commit.
/// Imported items go live immediately under the import source's byline.
pub fn record_from_candidate(c: &ImportCandidate, author: &str) -> ContentRecord {
    ContentRecord {
        title: c.title.trim().to_string(),
        category_code: c.category_code.clone(),
        time_label: c.time_label.clone(),
        image_url: opt(&c.image_url),
        description: opt(&c.description),
        content: opt(&c.content),
        author: Some(author.to_string()),
        source_url: opt(&c.source_url),
        moderation_status: ModerationStatus::Published,
        ..Default::default()
    }
}
