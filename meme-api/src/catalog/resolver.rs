//! Extraction of canonical entity ids from configured URLs.
//!
//! Every kind has one rule in [`RULES`]; supporting a new kind means adding a row there.

use super::EntityKind;
use crate::error::CatalogError;

/// How the id is located within a URL.
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Everything after the last occurrence of the first marker (in order) present in the URL.
    AfterLast(&'static [&'static str]),
    /// The last `/`-delimited segment, provided the URL contains one of the markers.
    LastSegment(&'static [&'static str]),
}

const PLAYLIST_MARKERS: &[&str] = &["list=", "p="];

const RULES: &[(EntityKind, Rule)] = &[
    (EntityKind::Video, Rule::AfterLast(&["v="])),
    (EntityKind::Playlist, Rule::AfterLast(PLAYLIST_MARKERS)),
    (EntityKind::PlaylistItemPage, Rule::AfterLast(PLAYLIST_MARKERS)),
    (
        EntityKind::Channel,
        Rule::LastSegment(&["/channel/", "/c/", "/user/"]),
    ),
];

impl Rule {
    fn apply<'u>(self, url: &'u str) -> Option<&'u str> {
        let id = match self {
            Rule::AfterLast(markers) => {
                let marker = markers.iter().find(|m| url.contains(**m))?;
                let at = url.rfind(marker)?;
                &url[at + marker.len()..]
            }
            Rule::LastSegment(markers) => {
                if !markers.iter().any(|m| url.contains(m)) {
                    return None;
                }
                url.rsplit('/').next()?
            }
        };
        (!id.is_empty()).then_some(id)
    }
}

/// Extracts the id of a `kind` entity from `url`.
///
/// This is pure string processing. No attempt is made to validate the id against YouTube;
/// a URL without a recognized marker, or with nothing after it, is a
/// [`CatalogError::MalformedReference`].
pub fn resolve_id(kind: EntityKind, url: &str) -> Result<String, CatalogError> {
    let url = url.trim();
    RULES
        .iter()
        .find(|(k, _)| *k == kind)
        .and_then(|(_, rule)| rule.apply(url))
        .map(str::to_string)
        .ok_or_else(|| CatalogError::MalformedReference {
            kind,
            url: url.to_string(),
        })
}
