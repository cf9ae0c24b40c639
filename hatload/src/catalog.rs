//! The list of hat styles that simulated users browse.
//!
//! A [`Catalog`] is an ordered list of style tokens that are appended to the product page as
//! `?style=<token>`. Selection is uniform over the *entries* of the list, so a style that appears
//! twice is picked twice as often. The built-in lists keep their duplicates for that reason.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Styles as seeded into the Kubernetes MySQL deployment.
const KUBE_STYLES: &[&str] = &[
    "baby",
    "bucket",
    "Beach",
    "spinner",
    "cartoon",
    "skull",
    "Blob",
    "santa",
    "St-Patricks",
    "santa",
    "graduation",
    "blob",
    "pirate",
    "pokemon",
    "clown",
    "Spy",
    "st-patricks",
    "Mario",
    "tophat",
    "pilot",
    "tophat",
    "construction",
    "Beach",
    "turkey",
    "st-patricks",
    "Shark",
    "Alien",
    "penguin",
    "tinyhat",
    "cat-ears",
    "spicy",
    "food",
];

/// Styles as seeded by the local compose setup.
const COMPOSE_STYLES: &[&str] = &[
    "baby",
    "bucket",
    "beach",
    "spinner",
    "cartoon",
    "skull",
    "blob",
    "santa",
    "st-patricks",
    "graduation",
    "pirate",
    "pokemon",
    "clown",
    "spy",
    "mario",
    "tophat",
    "pilot",
    "construction",
    "turkey",
    "shark",
    "alien",
    "penguin",
    "tinyhat",
    "cat-ears",
    "spicy",
    "food",
];

/// Errors when constructing a custom [`Catalog`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog has no styles to choose from.
    #[error("catalog `{0}` has no styles")]
    Empty(String),
    /// A style cannot be used verbatim as a query value.
    #[error("invalid style {token:?} at position {index}: only A-Z a-z 0-9 - . _ ~ are allowed")]
    InvalidToken {
        /// Position of the offending token in the list.
        index: usize,
        /// The offending token.
        token: String,
    },
}

/// The built-in style lists.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogVariant {
    /// The list generated from the Kubernetes database seed.
    #[default]
    Kube,
    /// The normalized list used with the local compose setup.
    Compose,
}

impl CatalogVariant {
    /// Returns the lowercase name of the variant.
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogVariant::Kube => "kube",
            CatalogVariant::Compose => "compose",
        }
    }

    fn styles(self) -> &'static [&'static str] {
        match self {
            CatalogVariant::Kube => KUBE_STYLES,
            CatalogVariant::Compose => COMPOSE_STYLES,
        }
    }
}

impl fmt::Display for CatalogVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("kube") => Ok(CatalogVariant::Kube),
            s if s.eq_ignore_ascii_case("compose") => Ok(CatalogVariant::Compose),
            s => Err(format!(
                r#"unknown catalog "{s}": expected one of "kube", "compose""#
            )),
        }
    }
}

/// An ordered, non-empty list of hat styles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    name: String,
    styles: Vec<String>,
}

impl Catalog {
    /// Creates a catalog from a custom list of styles.
    ///
    /// Every style must be usable as a query value without escaping.
    pub fn new<I, S>(name: impl Into<String>, styles: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let styles: Vec<String> = styles.into_iter().map(Into::into).collect();

        if styles.is_empty() {
            return Err(CatalogError::Empty(name));
        }

        if let Some((index, token)) = styles
            .iter()
            .enumerate()
            .find(|(_, token)| !is_query_value(token))
        {
            return Err(CatalogError::InvalidToken {
                index,
                token: token.clone(),
            });
        }

        Ok(Self { name, styles })
    }

    /// Returns the built-in catalog for the given variant.
    pub fn variant(variant: CatalogVariant) -> Self {
        Self {
            name: variant.as_str().to_owned(),
            styles: variant.styles().iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// The name of this catalog, used in logs and the report header.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All styles in declaration order, including duplicates.
    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    /// Number of entries, including duplicates.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Always `false`, a catalog cannot be constructed without styles.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Returns `true` if the token is one of the declared styles.
    pub fn contains(&self, token: &str) -> bool {
        self.styles.iter().any(|style| style == token)
    }

    /// Picks a style uniformly at random over all entries.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> &str {
        let index = rng.random_range(0..self.styles.len());
        &self.styles[index]
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::variant(CatalogVariant::default())
    }
}

/// Checks that the token consists only of URL-unreserved characters.
fn is_query_value(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn builtin_variants() {
        let kube = Catalog::variant(CatalogVariant::Kube);
        assert_eq!(kube.len(), 32);
        assert_eq!(kube.styles()[2], "Beach");
        assert_eq!(kube.styles().iter().filter(|s| *s == "santa").count(), 2);

        let compose = Catalog::variant(CatalogVariant::Compose);
        assert_eq!(compose.len(), 26);
        assert!(compose.styles().iter().all(|s| *s == s.to_lowercase()));
    }

    #[test]
    fn builtin_variants_are_valid_queries() {
        for variant in [CatalogVariant::Kube, CatalogVariant::Compose] {
            let catalog = Catalog::variant(variant);
            let rebuilt = Catalog::new(variant.as_str(), catalog.styles().to_vec()).unwrap();
            assert_eq!(rebuilt, catalog);
        }
    }

    #[test]
    fn choose_is_member() {
        let mut rng = SmallRng::seed_from_u64(7);
        for variant in [CatalogVariant::Kube, CatalogVariant::Compose] {
            let catalog = Catalog::variant(variant);
            for _ in 0..1000 {
                let style = catalog.choose(&mut rng);
                assert!(catalog.contains(style), "{style} not in {variant}");
            }
        }
    }

    #[test]
    fn choose_reaches_every_style() {
        let mut rng = SmallRng::seed_from_u64(1);
        let catalog = Catalog::new("small", ["a", "b", "c"]).unwrap();

        let mut seen = [false; 3];
        for _ in 0..200 {
            match catalog.choose(&mut rng) {
                "a" => seen[0] = true,
                "b" => seen[1] = true,
                "c" => seen[2] = true,
                other => panic!("unexpected style {other}"),
            }
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn rejects_empty() {
        let err = Catalog::new("none", Vec::<String>::new()).unwrap_err();
        assert_eq!(err, CatalogError::Empty("none".into()));
    }

    #[test]
    fn rejects_invalid_tokens() {
        let err = Catalog::new("bad", ["ok", "top hat"]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::InvalidToken {
                index: 1,
                token: "top hat".into()
            }
        );

        assert!(Catalog::new("bad", [""]).is_err());
        assert!(Catalog::new("bad", ["a&b=c"]).is_err());
        assert!(Catalog::new("ok", ["cat-ears", "v1.2_x~"]).is_ok());
    }

    #[test]
    fn variant_from_str() {
        assert_eq!("KUBE".parse::<CatalogVariant>(), Ok(CatalogVariant::Kube));
        assert_eq!(
            "compose".parse::<CatalogVariant>(),
            Ok(CatalogVariant::Compose)
        );
        assert!("docker".parse::<CatalogVariant>().is_err());
    }
}
