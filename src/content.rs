use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MAX_IMAGES: usize = 20;
pub const MAX_LINKS: usize = 10;

/// The six parallel content sections. All share the [`ContentRecord`] shape;
/// the kind only selects the remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    News,
    Article,
    PressRelease,
    Horoscope,
    Blog,
    Biography,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::News,
        ContentKind::Article,
        ContentKind::PressRelease,
        ContentKind::Horoscope,
        ContentKind::Blog,
        ContentKind::Biography,
    ];

    /// Value of the `resource` query discriminator.
    pub fn resource(self) -> &'static str {
        match self {
            ContentKind::News => "news",
            ContentKind::Article => "articles",
            ContentKind::PressRelease => "press-releases",
            ContentKind::Horoscope => "horoscopes",
            ContentKind::Blog => "blogs",
            ContentKind::Biography => "biographies",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "news" => Ok(ContentKind::News),
            "article" | "articles" => Ok(ContentKind::Article),
            "press-release" | "press-releases" | "press" => Ok(ContentKind::PressRelease),
            "horoscope" | "horoscopes" => Ok(ContentKind::Horoscope),
            "blog" | "blogs" => Ok(ContentKind::Blog),
            "biography" | "biographies" => Ok(ContentKind::Biography),
            _ => Err(Error::Validation(format!("unknown content kind: {s}"))),
        }
    }
}

/// Publication state. Closed so that unknown values are rejected at the
/// boundary rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Draft,
    Moderation,
    Published,
}

impl ModerationStatus {
    pub const ALL: [ModerationStatus; 3] = [
        ModerationStatus::Draft,
        ModerationStatus::Moderation,
        ModerationStatus::Published,
    ];

    // Rows and columns follow `ALL`. Every transition is currently allowed;
    // workflow rules tighten this table, not the type.
    const TRANSITIONS: [[bool; 3]; 3] = [[true; 3]; 3];

    fn index(self) -> usize {
        match self {
            ModerationStatus::Draft => 0,
            ModerationStatus::Moderation => 1,
            ModerationStatus::Published => 2,
        }
    }

    pub fn can_transition_to(self, next: ModerationStatus) -> bool {
        Self::TRANSITIONS[self.index()][next.index()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModerationStatus::Draft => "draft",
            ModerationStatus::Moderation => "moderation",
            ModerationStatus::Published => "published",
        }
    }

    /// Whether records in this state are shown on the public site.
    pub fn is_public(self) -> bool {
        matches!(self, ModerationStatus::Published)
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ModerationStatus::Draft),
            "moderation" => Ok(ModerationStatus::Moderation),
            "published" => Ok(ModerationStatus::Published),
            other => Err(Error::Validation(format!("unknown moderation status: {other}"))),
        }
    }
}

/// Element of an ordered sub-collection carrying a dense 0-based position.
pub trait Positioned {
    fn position(&self) -> u32;
    fn set_position(&mut self, position: u32);
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(alias = "url", default, deserialize_with = "crate::types::nullable")]
    pub image_url: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub caption: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub position: u32,
}

impl Positioned for RecordImage {
    fn position(&self) -> u32 { self.position }
    fn set_position(&mut self, position: u32) { self.position = position; }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub url: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub position: u32,
}

impl Positioned for RecordLink {
    fn position(&self) -> u32 { self.position }
    fn set_position(&mut self, position: u32) { self.position = position; }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Shared shape of news, articles, press releases, horoscopes, blogs and biographies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Server-assigned; absent until first persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub category_code: String,
    /// Joined in by the list endpoint; never sent back.
    #[serde(default, skip_serializing)]
    pub category_label: Option<String>,
    /// Free-text recency label ("2 hours ago"), not a timestamp.
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub time_label: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub priority: i64,
    /// Maintained by the store.
    #[serde(default, skip_serializing, deserialize_with = "crate::types::nullable")]
    pub views: i64,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub moderation_status: ModerationStatus,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
    #[serde(default)]
    pub seo_keywords: Option<String>,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub images: Vec<RecordImage>,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub links: Vec<RecordLink>,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub tags: BTreeSet<String>,
}

impl ContentRecord {
    pub fn new(title: impl Into<String>, category_code: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category_code: category_code.into(),
            ..Default::default()
        }
    }

    /// The only save-time constraint: a non-blank title.
    pub fn validate_for_save(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("title must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn set_status(&mut self, next: ModerationStatus) -> Result<()> {
        if !self.moderation_status.can_transition_to(next) {
            return Err(Error::Validation(format!(
                "cannot move from {} to {}",
                self.moderation_status, next
            )));
        }
        self.moderation_status = next;
        Ok(())
    }

    // --- images ---

    /// Append an empty image slot, returning its index.
    pub fn add_image(&mut self) -> Result<usize> {
        push_capped(&mut self.images, MAX_IMAGES, "images", RecordImage::default())
    }

    pub fn remove_image(&mut self, index: usize) -> Option<RecordImage> {
        remove_at(&mut self.images, index)
    }

    pub fn move_image(&mut self, index: usize, direction: Direction) -> bool {
        move_at(&mut self.images, index, direction)
    }

    pub fn set_image(&mut self, index: usize, image_url: impl Into<String>, caption: impl Into<String>) -> Result<()> {
        let slot = self
            .images
            .get_mut(index)
            .ok_or_else(|| Error::Validation(format!("no image at index {index}")))?;
        slot.image_url = image_url.into();
        slot.caption = caption.into();
        Ok(())
    }

    // --- links ---

    pub fn add_link(&mut self) -> Result<usize> {
        push_capped(&mut self.links, MAX_LINKS, "links", RecordLink::default())
    }

    pub fn remove_link(&mut self, index: usize) -> Option<RecordLink> {
        remove_at(&mut self.links, index)
    }

    pub fn move_link(&mut self, index: usize, direction: Direction) -> bool {
        move_at(&mut self.links, index, direction)
    }

    pub fn set_link(&mut self, index: usize, title: impl Into<String>, url: impl Into<String>) -> Result<()> {
        let slot = self
            .links
            .get_mut(index)
            .ok_or_else(|| Error::Validation(format!("no link at index {index}")))?;
        slot.title = title.into();
        slot.url = url.into();
        Ok(())
    }

    // --- tags ---

    /// Returns false for blank or already present tags.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        self.tags.insert(tag.to_string())
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag.trim())
    }

    /// Rewrite every position as its index. Records loaded from the server
    /// may carry sparse positions; this runs before every write.
    pub fn normalize_positions(&mut self) {
        reindex(&mut self.images);
        reindex(&mut self.links);
    }
}

fn reindex<T: Positioned>(items: &mut [T]) {
    for (i, item) in items.iter_mut().enumerate() {
        item.set_position(i as u32);
    }
}

fn push_capped<T: Positioned>(items: &mut Vec<T>, limit: usize, collection: &'static str, mut item: T) -> Result<usize> {
    if items.len() >= limit {
        return Err(Error::Capacity { collection, limit });
    }
    let index = items.len();
    item.set_position(index as u32);
    items.push(item);
    Ok(index)
}

fn remove_at<T: Positioned>(items: &mut Vec<T>, index: usize) -> Option<T> {
    if index >= items.len() {
        return None;
    }
    let removed = items.remove(index);
    reindex(items);
    Some(removed)
}

fn move_at<T: Positioned>(items: &mut [T], index: usize, direction: Direction) -> bool {
    let target = match direction {
        Direction::Up if index > 0 && index < items.len() => index - 1,
        Direction::Down if index < items.len().saturating_sub(1) => index + 1,
        _ => return false,
    };
    items.swap(index, target);
    items[index].set_position(index as u32);
    items[target].set_position(target as u32);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_images(n: usize) -> ContentRecord {
        let mut r = ContentRecord::new("Title", "politics");
        for i in 0..n {
            let idx = r.add_image().unwrap();
            r.set_image(idx, format!("https://img/{i}.jpg"), format!("caption {i}")).unwrap();
        }
        r
    }

    fn assert_dense<T: Positioned>(items: &[T]) {
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.position(), i as u32, "position at index {i}");
        }
    }

    #[test]
    fn add_image_caps_at_twenty() {
        let mut r = record_with_images(MAX_IMAGES);
        let before = r.images.clone();
        let err = r.add_image().unwrap_err();
        assert_eq!(err, Error::Capacity { collection: "images", limit: 20 });
        assert_eq!(r.images, before);
    }

    #[test]
    fn add_link_caps_at_ten() {
        let mut r = ContentRecord::new("Title", "news");
        for _ in 0..MAX_LINKS {
            r.add_link().unwrap();
        }
        assert!(matches!(r.add_link(), Err(Error::Capacity { collection: "links", limit: 10 })));
        assert_eq!(r.links.len(), MAX_LINKS);
        assert_dense(&r.links);
    }

    #[test]
    fn remove_closes_gaps() {
        let mut r = record_with_images(5);
        let removed = r.remove_image(1).unwrap();
        assert_eq!(removed.image_url, "https://img/1.jpg");
        assert_eq!(r.images.len(), 4);
        assert_dense(&r.images);
        assert_eq!(r.images[1].image_url, "https://img/2.jpg");
        assert!(r.remove_image(10).is_none());
    }

    #[test]
    fn move_swaps_neighbours() {
        let mut r = record_with_images(3);
        assert!(r.move_image(0, Direction::Down));
        assert_eq!(r.images[0].image_url, "https://img/1.jpg");
        assert_eq!(r.images[1].image_url, "https://img/0.jpg");
        assert_dense(&r.images);
        assert!(r.move_image(2, Direction::Up));
        assert_eq!(r.images[1].image_url, "https://img/2.jpg");
        assert_dense(&r.images);
    }

    #[test]
    fn move_at_boundaries_is_noop() {
        let mut r = record_with_images(3);
        let before = r.images.clone();
        assert!(!r.move_image(0, Direction::Up));
        assert!(!r.move_image(2, Direction::Down));
        assert!(!r.move_image(7, Direction::Up));
        assert!(!r.move_image(7, Direction::Down));
        assert!(!r.move_image(usize::MAX, Direction::Down));
        assert!(!r.move_link(0, Direction::Down));
        assert_eq!(r.images, before);
    }

    #[test]
    fn positions_stay_dense_through_mixed_edits() {
        let mut r = ContentRecord::new("Title", "news");
        for _ in 0..6 {
            r.add_link().unwrap();
        }
        r.move_link(5, Direction::Up);
        r.remove_link(0);
        r.add_link().unwrap();
        r.move_link(0, Direction::Down);
        r.remove_link(3);
        r.remove_link(4);
        assert_eq!(r.links.len(), 4);
        assert_dense(&r.links);
    }

    #[test]
    fn normalize_repairs_sparse_positions() {
        let mut r = ContentRecord::new("Title", "news");
        r.images = vec![
            RecordImage { position: 3, ..Default::default() },
            RecordImage { position: 9, ..Default::default() },
        ];
        r.normalize_positions();
        assert_dense(&r.images);
    }

    #[test]
    fn validate_rejects_blank_titles_only() {
        assert!(ContentRecord::new("", "news").validate_for_save().is_err());
        assert!(ContentRecord::new("  \t\n", "news").validate_for_save().is_err());
        assert!(ContentRecord::new(" x ", "").validate_for_save().is_ok());
    }

    #[test]
    fn any_status_transition_is_allowed() {
        let mut r = ContentRecord::new("Title", "news");
        for from in ModerationStatus::ALL {
            for to in ModerationStatus::ALL {
                r.moderation_status = from;
                r.set_status(to).unwrap();
                assert_eq!(r.moderation_status, to);
            }
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("archived".parse::<ModerationStatus>().is_err());
        let parsed: std::result::Result<ContentRecord, _> =
            serde_json::from_str(r#"{"title":"t","moderation_status":"archived"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn tags_have_set_semantics() {
        let mut r = ContentRecord::new("Title", "news");
        assert!(r.add_tag("economy"));
        assert!(!r.add_tag(" economy "));
        assert!(!r.add_tag("   "));
        assert!(r.add_tag("banks"));
        assert_eq!(r.tags.len(), 2);
        assert!(r.remove_tag("economy"));
    }

    #[test]
    fn null_columns_read_as_defaults() {
        let r: ContentRecord = serde_json::from_str(
            r#"{"id":1,"title":"t","category_code":null,"time_label":null,"priority":null,"views":null,
                "moderation_status":null,"tags":null,
                "images":[{"id":4,"image_url":"https://img/a.jpg","caption":null,"position":null}],
                "links":[{"title":null,"url":"https://x","position":0}]}"#,
        )
        .unwrap();
        assert_eq!(r.id, Some(1));
        assert_eq!(r.category_code, "");
        assert_eq!(r.time_label, "");
        assert_eq!((r.priority, r.views), (0, 0));
        assert_eq!(r.moderation_status, ModerationStatus::Draft);
        assert_eq!(r.images[0].caption, "");
        assert_eq!(r.images[0].image_url, "https://img/a.jpg");
        assert_eq!(r.links[0].title, "");
        assert!(r.tags.is_empty());
    }

    #[test]
    fn store_managed_fields_are_not_sent() {
        let mut r = ContentRecord::new("Title", "news");
        r.views = 42;
        r.category_label = Some("News".into());
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("views").is_none());
        assert!(json.get("category_label").is_none());
        assert!(json.get("id").is_none());
        assert_eq!(json["moderation_status"], "draft");
    }

    #[test]
    fn kind_parses_resource_names() {
        for kind in ContentKind::ALL {
            assert_eq!(kind.resource().parse::<ContentKind>().unwrap(), kind);
        }
        assert_eq!("press".parse::<ContentKind>().unwrap(), ContentKind::PressRelease);
    }
}
