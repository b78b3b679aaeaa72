//! OAuth2 permission scopes
//!
//! Spotify expresses granted permissions as a space-separated list of scope
//! names. A [`Scopes`] value holds that list as a set and renders it
//! canonically (sorted, single-space separated) so it can be used as half of
//! a token cache key.

use std::{collections::btree_set, collections::BTreeSet, convert::Infallible, fmt, ops, str};

use aliri_braid::braid;
use serde::{Deserialize, Serialize};

/// An OAuth2 scope
#[braid(serde)]
pub struct Scope;

/// Scope names understood by the Spotify accounts service
///
/// See <https://developer.spotify.com/documentation/web-api/concepts/scopes>.
pub mod well_known {
    #![allow(missing_docs)]

    pub const UGC_IMAGE_UPLOAD: &str = "ugc-image-upload";

    pub const USER_READ_PLAYBACK_STATE: &str = "user-read-playback-state";
    pub const USER_MODIFY_PLAYBACK_STATE: &str = "user-modify-playback-state";
    pub const USER_READ_CURRENTLY_PLAYING: &str = "user-read-currently-playing";

    pub const STREAMING: &str = "streaming";
    pub const APP_REMOTE_CONTROL: &str = "app-remote-control";

    pub const USER_READ_EMAIL: &str = "user-read-email";
    pub const USER_READ_PRIVATE: &str = "user-read-private";

    pub const PLAYLIST_READ_COLLABORATIVE: &str = "playlist-read-collaborative";
    pub const PLAYLIST_MODIFY_PUBLIC: &str = "playlist-modify-public";
    pub const PLAYLIST_READ_PRIVATE: &str = "playlist-read-private";
    pub const PLAYLIST_MODIFY_PRIVATE: &str = "playlist-modify-private";

    pub const USER_LIBRARY_MODIFY: &str = "user-library-modify";
    pub const USER_LIBRARY_READ: &str = "user-library-read";

    pub const USER_TOP_READ: &str = "user-top-read";
    pub const USER_READ_PLAYBACK_POSITION: &str = "user-read-playback-position";
    pub const USER_READ_RECENTLY_PLAYED: &str = "user-read-recently-played";

    pub const USER_FOLLOW_READ: &str = "user-follow-read";
    pub const USER_FOLLOW_MODIFY: &str = "user-follow-modify";
}

/// A set of scopes for defining access permissions
///
/// The empty set is a valid value, meaning "no particular permission",
/// and is what app-only tokens carry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub struct Scopes(BTreeSet<Scope>);

impl Scopes {
    /// Produces an empty scope set
    #[inline]
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Produces a set holding a single named scope
    ///
    /// An empty name produces the empty set.
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut set = BTreeSet::new();
        if !name.is_empty() {
            set.insert(Scope::from(name));
        }
        Self(set)
    }

    /// Parses a space-separated scope list
    ///
    /// Empty segments are skipped, so `""` yields the empty set.
    pub fn parse(raw: &str) -> Self {
        raw.split(' ')
            .filter(|s| !s.is_empty())
            .map(Scope::from)
            .collect()
    }

    /// The union of this set with `other`
    #[must_use]
    pub fn compose(&self, other: &Scopes) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Whether the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of scopes in the set
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `scope` is a member of the set
    #[inline]
    pub fn contains(&self, scope: &ScopeRef) -> bool {
        self.0.contains(scope)
    }

    /// Checks to see whether this set of scopes contains all of
    /// the scopes required.
    #[inline]
    pub fn contains_all(&self, required: &Scopes) -> bool {
        self.0.is_superset(&required.0)
    }

    /// Produces an iterator of the scopes in this set, in canonical order
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        self.into_iter()
    }
}

impl fmt::Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for scope in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(scope.as_str())?;
            first = false;
        }
        Ok(())
    }
}

impl str::FromStr for Scopes {
    type Err = Infallible;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for Scopes {
    #[inline]
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for Scopes {
    #[inline]
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<Scopes> for String {
    #[inline]
    fn from(scopes: Scopes) -> Self {
        scopes.to_string()
    }
}

impl ops::Add for Scopes {
    type Output = Scopes;

    fn add(mut self, rhs: Scopes) -> Self::Output {
        self.0.extend(rhs.0);
        self
    }
}

impl<'a> ops::Add<&'a Scopes> for &'a Scopes {
    type Output = Scopes;

    #[inline]
    fn add(self, rhs: &'a Scopes) -> Self::Output {
        self.compose(rhs)
    }
}

impl FromIterator<Scope> for Scopes {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Scopes {
    type Item = Scope;
    type IntoIter = btree_set::IntoIter<Scope>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// An iterator over a set of borrowed scopes
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    iter: btree_set::Iter<'a, Scope>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a ScopeRef;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|x| x.as_ref())
    }
}

impl<'a> IntoIterator for &'a Scopes {
    type Item = &'a ScopeRef;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        Self::IntoIter {
            iter: self.0.iter(),
        }
    }
}
