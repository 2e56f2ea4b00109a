//! Mirror list.
//!
//! Base URLs of community WAD mirrors. A fetch URL is the base followed by the
//! normalized asset name, which is why some entries end in a query string.

use rand::seq::SliceRandom;
use rand::RngCore;

/// Compiled-in mirrors. Not all of them carry every WAD.
pub const DEFAULT_MIRRORS: &[&str] = &[
    "https://static.allfearthesentinel.com/wads/",
    "https://doomshack.org/wads/",
    "http://grandpachuck.org/files/wads/",
    "https://wads.doomleague.org/",
    "http://files.funcrusher.net/wads/",
    "https://doomshack.org/uploads/",
    "https://doom.dogsoft.net/getwad.php?search=",
    "https://doomshack.org/wadlist.php/",
    "https://wads.firestick.games/",
    "https://euroboros.net/zandronum/wads/",
    "https://static.audrealms.org/wads/",
    "https://downloadbox.captainpollutiontv.de/DooM/WADSEEKER/",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MirrorError {
    #[error("mirror list is empty")]
    Empty,
    #[error("invalid mirror base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Ordered set of mirror base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorList {
    bases: Vec<String>,
}

impl Default for MirrorList {
    fn default() -> Self {
        Self {
            bases: DEFAULT_MIRRORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl MirrorList {
    /// Build a list from explicit bases. Each must be an absolute http(s) URL.
    pub fn new<I, S>(bases: I) -> Result<Self, MirrorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bases: Vec<String> = bases.into_iter().map(Into::into).collect();
        if bases.is_empty() {
            return Err(MirrorError::Empty);
        }
        for base in &bases {
            let parsed = url::Url::parse(base).map_err(|e| MirrorError::InvalidUrl {
                url: base.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(MirrorError::InvalidUrl {
                    url: base.clone(),
                    reason: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
        }
        Ok(Self { bases })
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.bases.iter().map(String::as_str)
    }

    /// Fresh uniformly random permutation of every mirror.
    pub fn shuffled(&self, rng: &mut dyn RngCore) -> Vec<&str> {
        let mut order: Vec<&str> = self.iter().collect();
        order.shuffle(rng);
        order
    }
}

/// Fetch URL for `suffix` on mirror `base`.
pub fn fetch_url(base: &str, suffix: &str) -> String {
    format!("{}{}", base, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_list_is_valid() {
        let list = MirrorList::default();
        assert_eq!(list.len(), DEFAULT_MIRRORS.len());
        assert!(MirrorList::new(DEFAULT_MIRRORS.iter().copied()).is_ok());
    }

    #[test]
    fn rejects_empty_and_bad_urls() {
        assert_eq!(MirrorList::new(Vec::<String>::new()), Err(MirrorError::Empty));
        assert!(matches!(
            MirrorList::new(["not a url"]),
            Err(MirrorError::InvalidUrl { .. })
        ));
        assert!(matches!(
            MirrorList::new(["ftp://example.com/wads/"]),
            Err(MirrorError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn shuffled_is_a_permutation() {
        let list = MirrorList::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut order = list.shuffled(&mut rng);
        assert_eq!(order.len(), list.len());
        order.sort_unstable();
        let mut all: Vec<&str> = list.iter().collect();
        all.sort_unstable();
        assert_eq!(order, all);
    }

    #[test]
    fn same_seed_same_order() {
        let list = MirrorList::default();
        let a = list.shuffled(&mut StdRng::seed_from_u64(42));
        let b = list.shuffled(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn fetch_url_appends_name() {
        assert_eq!(
            fetch_url("https://doom.dogsoft.net/getwad.php?search=", "doom2.wad"),
            "https://doom.dogsoft.net/getwad.php?search=doom2.wad"
        );
    }
}
