//! Translation of view-level room list filters into the structured filter
//! description understood by the remote room list.
//!
//! Nothing here evaluates a filter against a room; the remote side does.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// User-facing quick filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RoomFilterKind {
    Unreads,
    People,
    Rooms,
    Favourites,
    Invites,
    LowPriority,
}

/// Filter requested by the view layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomListFilter {
    /// Hide every room.
    ExcludeAll,
    /// Match room names against a search query.
    Search { query: String },
    /// Restrict to a known set of rooms, optionally narrowed further.
    Rooms {
        room_ids: BTreeSet<String>,
        filters: Vec<RoomFilterKind>,
    },
    /// Every room matching all the given quick filters.
    All { filters: Vec<RoomFilterKind> },
}

impl Default for RoomListFilter {
    fn default() -> Self {
        Self::All {
            filters: Vec::new(),
        }
    }
}

/// Room category understood by the remote filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomCategory {
    People,
    Group,
}

/// Structured filter forwarded to the remote room list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RemoteFilterKind {
    All { filters: Vec<RemoteFilterKind> },
    Any { filters: Vec<RemoteFilterKind> },
    NonSpace,
    Space,
    NonLeft,
    Invite,
    DeduplicateVersions,
    Unread,
    Favourite,
    LowPriority,
    NonLowPriority,
    Category { expect: RoomCategory },
    Identifiers { identifiers: Vec<String> },
    FuzzyMatchRoomName { pattern: String },
    NormalizedMatchRoomName { pattern: String },
    /// Matches nothing.
    None,
}

/// Settings that change how filters are translated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FilterSettings {
    /// Use fuzzy instead of normalized name matching for searches.
    pub fuzzy_search: bool,
    /// Hide low priority rooms unless explicitly requested.
    pub low_priority_filter: bool,
}

impl RoomFilterKind {
    fn to_remote(self) -> RemoteFilterKind {
        match self {
            Self::Unreads => RemoteFilterKind::Unread,
            Self::People => RemoteFilterKind::Category {
                expect: RoomCategory::People,
            },
            Self::Rooms => RemoteFilterKind::Category {
                expect: RoomCategory::Group,
            },
            Self::Favourites => RemoteFilterKind::Favourite,
            Self::Invites => RemoteFilterKind::Invite,
            Self::LowPriority => RemoteFilterKind::LowPriority,
        }
    }
}

/// Filters applied to every non-empty list: joined non-space rooms or space
/// invites, with upgraded room versions collapsed.
fn base_filters() -> Vec<RemoteFilterKind> {
    vec![
        RemoteFilterKind::Any {
            filters: vec![
                RemoteFilterKind::All {
                    filters: vec![RemoteFilterKind::NonSpace, RemoteFilterKind::NonLeft],
                },
                RemoteFilterKind::All {
                    filters: vec![RemoteFilterKind::Space, RemoteFilterKind::Invite],
                },
            ],
        },
        RemoteFilterKind::DeduplicateVersions,
    ]
}

impl RoomListFilter {
    /// Build the remote filter description for this filter.
    pub fn to_remote(&self, settings: FilterSettings) -> RemoteFilterKind {
        match self {
            Self::ExcludeAll => RemoteFilterKind::None,
            Self::Search { query } => {
                let name_filter = if settings.fuzzy_search {
                    RemoteFilterKind::FuzzyMatchRoomName {
                        pattern: query.clone(),
                    }
                } else {
                    RemoteFilterKind::NormalizedMatchRoomName {
                        pattern: query.clone(),
                    }
                };
                let mut filters = vec![name_filter];
                filters.extend(base_filters());
                RemoteFilterKind::All { filters }
            }
            Self::Rooms { room_ids, filters } => {
                let mut remote = quick_filters(filters);
                remote.push(RemoteFilterKind::Identifiers {
                    identifiers: room_ids.iter().cloned().collect(),
                });
                push_low_priority_exclusion(&mut remote, filters, settings);
                RemoteFilterKind::All { filters: remote }
            }
            Self::All { filters } => {
                let mut remote = quick_filters(filters);
                push_low_priority_exclusion(&mut remote, filters, settings);
                RemoteFilterKind::All { filters: remote }
            }
        }
    }
}

fn quick_filters(filters: &[RoomFilterKind]) -> Vec<RemoteFilterKind> {
    let mut remote: Vec<_> = filters.iter().map(|kind| kind.to_remote()).collect();
    remote.extend(base_filters());
    remote
}

fn push_low_priority_exclusion(
    remote: &mut Vec<RemoteFilterKind>,
    requested: &[RoomFilterKind],
    settings: FilterSettings,
) {
    if settings.low_priority_filter && !requested.contains(&RoomFilterKind::LowPriority) {
        remote.push(RemoteFilterKind::NonLowPriority);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner(kind: RemoteFilterKind) -> Vec<RemoteFilterKind> {
        match kind {
            RemoteFilterKind::All { filters } => filters,
            other => panic!("expected an `All` filter, got {other:?}"),
        }
    }

    #[test]
    fn exclude_all_matches_nothing() {
        assert_eq!(
            RoomListFilter::ExcludeAll.to_remote(FilterSettings::default()),
            RemoteFilterKind::None
        );
    }

    #[test]
    fn default_filter_is_just_the_base_filter() {
        let filters = inner(RoomListFilter::default().to_remote(FilterSettings::default()));
        assert_eq!(filters, base_filters());
    }

    #[test]
    fn search_uses_name_matcher_selected_by_settings() {
        let search = RoomListFilter::Search {
            query: "rust".into(),
        };

        let normalized = inner(search.to_remote(FilterSettings::default()));
        assert_eq!(
            normalized[0],
            RemoteFilterKind::NormalizedMatchRoomName {
                pattern: "rust".into()
            }
        );
        assert_eq!(normalized.len(), 3);

        let fuzzy = inner(search.to_remote(FilterSettings {
            fuzzy_search: true,
            ..FilterSettings::default()
        }));
        assert_eq!(
            fuzzy[0],
            RemoteFilterKind::FuzzyMatchRoomName {
                pattern: "rust".into()
            }
        );
    }

    #[test]
    fn rooms_filter_forwards_identifier_allow_list() {
        let filter = RoomListFilter::Rooms {
            room_ids: BTreeSet::from(["!b:x".to_owned(), "!a:x".to_owned()]),
            filters: vec![RoomFilterKind::People],
        };
        let filters = inner(filter.to_remote(FilterSettings::default()));

        assert_eq!(
            filters[0],
            RemoteFilterKind::Category {
                expect: RoomCategory::People
            }
        );
        assert_eq!(
            filters.last(),
            Some(&RemoteFilterKind::Identifiers {
                identifiers: vec!["!a:x".to_owned(), "!b:x".to_owned()]
            })
        );
    }

    #[test]
    fn low_priority_rooms_hidden_unless_requested() {
        let settings = FilterSettings {
            low_priority_filter: true,
            ..FilterSettings::default()
        };

        let unreads = inner(
            RoomListFilter::All {
                filters: vec![RoomFilterKind::Unreads],
            }
            .to_remote(settings),
        );
        assert_eq!(unreads.first(), Some(&RemoteFilterKind::Unread));
        assert_eq!(unreads.last(), Some(&RemoteFilterKind::NonLowPriority));

        let low_priority = inner(
            RoomListFilter::All {
                filters: vec![RoomFilterKind::LowPriority],
            }
            .to_remote(settings),
        );
        assert!(!low_priority.contains(&RemoteFilterKind::NonLowPriority));
        assert_eq!(low_priority.first(), Some(&RemoteFilterKind::LowPriority));
    }
}
