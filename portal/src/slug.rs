//! URL slugs for articles and categories.
//!
//! A slug is derived from a human title by [`normalize`] and made unique within
//! its [`SlugScope`] by [`allocate`], which tries `-2`, `-3`, … suffixes
//! against the slugs already taken. The database half of the allocator lives
//! in `store::slugs`.

use crate::error::{PortalError, Result};
use serde::{Deserialize, Serialize};

/// Entity types that own a slug namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugScope {
    Article,
    Category,
}

impl SlugScope {
    pub const fn table(self) -> &'static str {
        match self {
            SlugScope::Article => "articles",
            SlugScope::Category => "categories",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SlugScope::Article => "article",
            SlugScope::Category => "category",
        }
    }
}

/// A resolved slug and whether it differs from the normalized candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub slug: String,
    pub adjusted: bool,
}

/// Transliterate to ASCII, lowercase, and collapse every run of characters
/// outside `[a-z0-9]` into a single `-`. Leading and trailing dashes are trimmed.
pub fn normalize(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut out = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

/// Pick the first free slug for `candidate` given the slugs already `taken`.
///
/// `taken` only needs to contain slugs sharing the normalized prefix; anything
/// else is ignored.
pub fn allocate<S: AsRef<str>>(candidate: &str, taken: &[S]) -> Result<Allocation> {
    let base = normalize(candidate);
    if base.is_empty() {
        return Err(PortalError::validation(
            "slug must contain at least one letter or digit",
        ));
    }

    let is_taken = |slug: &str| taken.iter().any(|t| t.as_ref() == slug);

    if !is_taken(&base) {
        return Ok(Allocation {
            slug: base,
            adjusted: false,
        });
    }

    let mut n: u64 = 2;
    loop {
        let slug = format!("{base}-{n}");
        if !is_taken(&slug) {
            return Ok(Allocation {
                slug,
                adjusted: true,
            });
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_punctuation_and_case() {
        assert_eq!(normalize("Pengumuman Penting!!"), "pengumuman-penting");
        assert_eq!(normalize("  --Hello,   World--  "), "hello-world");
        assert_eq!(normalize("Repo 123"), "repo-123");
    }

    #[test]
    fn strips_diacritics() {
        assert_eq!(normalize("Café Crème"), "cafe-creme");
        assert_eq!(normalize("Ñandú São Paulo"), "nandu-sao-paulo");
    }

    #[test]
    fn empty_after_normalization_is_rejected() {
        assert!(matches!(
            allocate::<&str>("!!! ???", &[]),
            Err(PortalError::Validation(_))
        ));
    }

    #[test]
    fn free_base_is_used_as_is() {
        let got = allocate::<&str>("Pengumuman Penting!!", &[]).unwrap();
        assert_eq!(got.slug, "pengumuman-penting");
        assert!(!got.adjusted);
    }

    #[test]
    fn tries_numeric_suffixes() {
        let got = allocate("Berita", &["berita", "berita-2"]).unwrap();
        assert_eq!(got.slug, "berita-3");
        assert!(got.adjusted);
    }

    #[test]
    fn fills_first_gap() {
        let got = allocate("Berita", &["berita", "berita-3", "berita-extra"]).unwrap();
        assert_eq!(got.slug, "berita-2");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(title in "\\PC{0,40}") {
            let once = normalize(&title);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_allocation_avoids_taken(
            base in "[a-z]{1,6}",
            suffixes in proptest::collection::vec(2u32..12, 0..10),
            include_base in any::<bool>(),
        ) {
            let mut taken: Vec<String> = suffixes.iter().map(|n| format!("{base}-{n}")).collect();
            if include_base {
                taken.push(base.clone());
            }
            let got = allocate(&base, &taken).unwrap();
            prop_assert!(!taken.contains(&got.slug));
            prop_assert_eq!(got.adjusted, include_base);
        }
    }
}
