//! Locale handling for the bilingual (Arabic/English) marketplace.

use serde::{Deserialize, Serialize};

/// A supported interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ar,
    En,
}

impl Locale {
    /// BCP 47 language tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
        }
    }

    /// Parse a single language tag (`ar`, `ar-SA`, `en-US`, ...).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "ar" => Some(Self::Ar),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    /// Pick the preferred supported locale from an `Accept-Language` header.
    ///
    /// Entries are ranked by their `q` weight; ties keep header order.
    /// Unsupported languages and `q=0` entries are skipped.
    #[must_use]
    pub fn from_accept_language(header: &str) -> Option<Self> {
        let mut best: Option<(Self, f32)> = None;

        for entry in header.split(',') {
            let mut parts = entry.split(';');
            let Some(locale) = parts.next().and_then(Self::from_tag) else {
                continue;
            };

            let weight = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);

            if weight <= 0.0 {
                continue;
            }

            if best.is_none_or(|(_, w)| weight > w) {
                best = Some((locale, weight));
            }
        }

        best.map(|(locale, _)| locale)
    }

    /// The other supported locale.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Ar => Self::En,
            Self::En => Self::Ar,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unsupported locale: {s}"))
    }
}

/// Text stored in both marketplace languages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub ar: String,
    #[serde(default)]
    pub en: String,
}

impl LocalizedText {
    /// Create from both translations.
    #[must_use]
    pub fn new(ar: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            ar: ar.into(),
            en: en.into(),
        }
    }

    /// Text in `locale`, falling back to the other language when empty.
    #[must_use]
    pub fn get(&self, locale: Locale) -> &str {
        let (wanted, fallback) = match locale {
            Locale::Ar => (&self.ar, &self.en),
            Locale::En => (&self.en, &self.ar),
        };
        if wanted.trim().is_empty() {
            fallback
        } else {
            wanted
        }
    }

    /// True when neither translation has content.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.ar.trim().is_empty() && self.en.trim().is_empty()
    }

    /// Copy with both sides trimmed.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            ar: self.ar.trim().to_owned(),
            en: self.en.trim().to_owned(),
        }
    }

    /// Length in characters of the longer translation.
    #[must_use]
    pub fn max_chars(&self) -> usize {
        self.ar.chars().count().max(self.en.chars().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag() {
        assert_eq!(Locale::from_tag("ar-SA"), Some(Locale::Ar));
        assert_eq!(Locale::from_tag("EN_us"), Some(Locale::En));
        assert_eq!(Locale::from_tag("fr"), None);
    }

    #[test]
    fn test_accept_language_prefers_weight() {
        assert_eq!(
            Locale::from_accept_language("en;q=0.4, ar-EG;q=0.9"),
            Some(Locale::Ar)
        );
        assert_eq!(
            Locale::from_accept_language("fr-FR, en-GB;q=0.8, ar;q=0.7"),
            Some(Locale::En)
        );
    }

    #[test]
    fn test_accept_language_skips_zero_and_unknown() {
        assert_eq!(Locale::from_accept_language("ar;q=0, de"), None);
        assert_eq!(Locale::from_accept_language(""), None);
    }

    #[test]
    fn test_localized_text_fallback() {
        let text = LocalizedText::new("", "Dates");
        assert_eq!(text.get(Locale::Ar), "Dates");
        assert_eq!(text.get(Locale::En), "Dates");

        let text = LocalizedText::new("تمر", "Dates");
        assert_eq!(text.get(Locale::Ar), "تمر");
    }

    #[test]
    fn test_localized_text_blank() {
        assert!(LocalizedText::new("  ", "").is_blank());
        assert!(!LocalizedText::new("قهوة", "").is_blank());
    }
}
