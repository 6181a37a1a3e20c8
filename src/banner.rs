//! Advertisement banners and per-zone placement.
//!
//! [`resolve`] is what the admin list view uses: every banner of a zone,
//! inactive ones included, in display order. Public rendering goes through
//! [`renderable`] / [`pick`], which drop inactive and malformed banners.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    Header,
    SidebarTop,
    SidebarMiddle,
    SidebarBottom,
    ArticleTop,
    ArticleMiddle,
    ArticleBottom,
    BetweenNews,
    Footer,
}

impl Placement {
    /// Canonical page order.
    pub const ALL: [Placement; 9] = [
        Placement::Header,
        Placement::SidebarTop,
        Placement::SidebarMiddle,
        Placement::SidebarBottom,
        Placement::ArticleTop,
        Placement::ArticleMiddle,
        Placement::ArticleBottom,
        Placement::BetweenNews,
        Placement::Footer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Placement::Header => "header",
            Placement::SidebarTop => "sidebar-top",
            Placement::SidebarMiddle => "sidebar-middle",
            Placement::SidebarBottom => "sidebar-bottom",
            Placement::ArticleTop => "article-top",
            Placement::ArticleMiddle => "article-middle",
            Placement::ArticleBottom => "article-bottom",
            Placement::BetweenNews => "between-news",
            Placement::Footer => "footer",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let norm = s.trim().to_ascii_lowercase();
        Placement::ALL
            .into_iter()
            .find(|p| p.as_str() == norm)
            .ok_or_else(|| Error::Validation(format!("unknown placement: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
    /// Ad-network block identified by an embed code.
    Rsy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub placement: Placement,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub media_type: MediaType,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub rsy_code: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub priority: i64,
}

fn default_active() -> bool { true }

/// The meaningful half of a banner, selected by its media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creative<'a> {
    Image { media_url: &'a str, link_url: Option<&'a str> },
    Video { media_url: &'a str, link_url: Option<&'a str> },
    Rsy { code: &'a str },
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Banner {
    pub fn new(placement: Placement, title: impl Into<String>) -> Self {
        Self {
            id: None,
            placement,
            title: title.into(),
            media_type: MediaType::Image,
            media_url: None,
            link_url: None,
            rsy_code: None,
            is_active: true,
            priority: 0,
        }
    }

    /// None when the field required by `media_type` is missing.
    pub fn creative(&self) -> Option<Creative<'_>> {
        match self.media_type {
            MediaType::Image => non_blank(&self.media_url).map(|media_url| Creative::Image {
                media_url,
                link_url: non_blank(&self.link_url),
            }),
            MediaType::Video => non_blank(&self.media_url).map(|media_url| Creative::Video {
                media_url,
                link_url: non_blank(&self.link_url),
            }),
            MediaType::Rsy => non_blank(&self.rsy_code).map(|code| Creative::Rsy { code }),
        }
    }

    pub fn validate_for_save(&self) -> Result<()> {
        if self.creative().is_some() {
            return Ok(());
        }
        let missing = match self.media_type {
            MediaType::Rsy => "rsy_code",
            MediaType::Image | MediaType::Video => "media_url",
        };
        Err(Error::Validation(format!("{missing} is required for {:?} banners", self.media_type)))
    }

    /// Drop the fields the media type makes meaningless, so a stale
    /// `rsy_code` never rides along with an image banner (and vice versa).
    pub fn normalized(mut self) -> Self {
        match self.media_type {
            MediaType::Rsy => {
                self.media_url = None;
                self.link_url = None;
            }
            MediaType::Image | MediaType::Video => self.rsy_code = None,
        }
        self
    }
}

/// Every banner for `zone`, highest priority first. Ties keep pool order.
/// Inactive and malformed banners are included.
pub fn resolve(pool: &[Banner], zone: Placement) -> Vec<&Banner> {
    let mut matching: Vec<&Banner> = pool.iter().filter(|b| b.placement == zone).collect();
    matching.sort_by_key(|b| Reverse(b.priority));
    matching
}

/// Renderer-side filter: active banners with a usable creative, order kept.
pub fn renderable<'a, I>(resolved: I) -> Vec<(&'a Banner, Creative<'a>)>
where
    I: IntoIterator<Item = &'a Banner>,
{
    resolved
        .into_iter()
        .filter(|b| b.is_active)
        .filter_map(|b| b.creative().map(|c| (b, c)))
        .collect()
}

/// The single banner a public page shows in `zone`, if any.
pub fn pick(pool: &[Banner], zone: Placement) -> Option<(&Banner, Creative<'_>)> {
    renderable(resolve(pool, zone)).into_iter().next()
}

/// All nine zones in page order with their resolved banners, for the admin view.
pub fn group_by_placement(pool: &[Banner]) -> Vec<(Placement, Vec<&Banner>)> {
    Placement::ALL.into_iter().map(|p| (p, resolve(pool, p))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banner(placement: Placement, priority: i64, active: bool) -> Banner {
        let mut b = Banner::new(placement, format!("{placement}-{priority}"));
        b.priority = priority;
        b.is_active = active;
        b.media_url = Some(format!("https://cdn/{priority}.png"));
        b
    }

    #[test]
    fn resolve_orders_by_priority_and_keeps_inactive() {
        let pool = vec![
            banner(Placement::Header, 1, true),
            banner(Placement::Header, 5, false),
            banner(Placement::Footer, 9, true),
        ];
        let resolved = resolve(&pool, Placement::Header);
        let priorities: Vec<i64> = resolved.iter().map(|b| b.priority).collect();
        assert_eq!(priorities, [5, 1]);

        // the renderer's active filter sits on top of the resolver
        let shown = renderable(resolved);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0.priority, 1);
    }

    #[test]
    fn empty_zone_resolves_to_nothing() {
        let pool = vec![banner(Placement::Header, 1, true)];
        assert!(resolve(&pool, Placement::SidebarTop).is_empty());
        assert!(resolve(&[], Placement::Footer).is_empty());
        assert!(pick(&pool, Placement::SidebarTop).is_none());
    }

    #[test]
    fn ties_keep_pool_order() {
        let mut a = banner(Placement::Footer, 3, true);
        a.title = "first".into();
        let mut b = banner(Placement::Footer, 3, true);
        b.title = "second".into();
        let c = banner(Placement::Footer, 7, true);
        let pool = vec![a, b, c];
        let titles: Vec<&str> = resolve(&pool, Placement::Footer).iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["footer-7", "first", "second"]);
    }

    #[test]
    fn malformed_banners_resolve_but_do_not_render() {
        let mut broken = banner(Placement::ArticleTop, 10, true);
        broken.media_url = Some("  ".into());
        let ok = banner(Placement::ArticleTop, 2, true);
        let pool = vec![broken, ok];
        assert_eq!(resolve(&pool, Placement::ArticleTop).len(), 2);
        let (picked, creative) = pick(&pool, Placement::ArticleTop).unwrap();
        assert_eq!(picked.priority, 2);
        assert_eq!(creative, Creative::Image { media_url: "https://cdn/2.png", link_url: None });
    }

    #[test]
    fn rsy_uses_code_and_ignores_links() {
        let mut b = Banner::new(Placement::BetweenNews, "network");
        b.media_type = MediaType::Rsy;
        b.link_url = Some("https://ignored".into());
        assert!(b.validate_for_save().is_err());
        b.rsy_code = Some("R-A-123-4".into());
        assert_eq!(b.creative(), Some(Creative::Rsy { code: "R-A-123-4" }));
        let n = b.normalized();
        assert!(n.link_url.is_none());
        assert!(n.media_url.is_none());
    }

    #[test]
    fn image_requires_media_url() {
        let mut b = Banner::new(Placement::Header, "top");
        b.rsy_code = Some("stale".into());
        assert!(matches!(b.validate_for_save(), Err(Error::Validation(_))));
        b.media_url = Some("https://cdn/top.png".into());
        b.validate_for_save().unwrap();
        assert!(b.normalized().rsy_code.is_none());
    }

    #[test]
    fn groups_cover_every_zone() {
        let pool = vec![banner(Placement::Footer, 1, false)];
        let groups = group_by_placement(&pool);
        assert_eq!(groups.len(), 9);
        assert_eq!(groups[0].0, Placement::Header);
        assert_eq!(groups[8].1.len(), 1);
    }

    #[test]
    fn placement_wire_names() {
        for p in Placement::ALL {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.as_str()));
            assert_eq!(p.as_str().parse::<Placement>().unwrap(), p);
        }
    }

    #[test]
    fn null_columns_read_as_defaults() {
        let b: Banner = serde_json::from_str(
            r#"{"id":3,"placement":"footer","title":null,"media_type":null,"media_url":"https://cdn/f.png","link_url":null,"rsy_code":null,"priority":null}"#,
        )
        .unwrap();
        assert_eq!(b.title, "");
        assert_eq!(b.media_type, MediaType::Image);
        assert_eq!(b.priority, 0);
        assert!(b.is_active);
        assert!(b.creative().is_some());
    }
}
