use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a configured channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A configured channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

impl Channel {
    /**
        Short label for compact displays.

        Uses the logo text when present, then the slug, then the first
        three characters of the name. Always upper-cased.
    */
    pub fn badge(&self) -> String {
        let label = self
            .logo
            .as_deref()
            .filter(|l| !l.is_empty())
            .or_else(|| self.slug.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| self.name.chars().take(3).collect());
        label.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(logo: Option<&str>, slug: Option<&str>, name: &str) -> Channel {
        Channel {
            id: ChannelId::new("CH-1"),
            name: name.to_string(),
            slug: slug.map(str::to_string),
            logo: logo.map(str::to_string),
        }
    }

    #[test]
    fn test_badge_prefers_logo() {
        assert_eq!(channel(Some("as1"), Some("AzamSport1"), "Azam Sport 1").badge(), "AS1");
    }

    #[test]
    fn test_badge_falls_back_to_slug_then_name() {
        assert_eq!(channel(None, Some("AzamMovies"), "Azam Movies").badge(), "AZAMMOVIES");
        assert_eq!(channel(Some(""), None, "Azam Movies").badge(), "AZA");
        assert_eq!(channel(None, None, "tv").badge(), "TV");
    }

    #[test]
    fn test_channel_id_deserializes_from_plain_string() {
        let ch: Channel = serde_yaml::from_str("id: CH-9\nname: Nine\n").unwrap();
        assert_eq!(ch.id, ChannelId::new("CH-9"));
        assert_eq!(ch.id.to_string(), "CH-9");
        assert!(ch.logo.is_none());
    }
}
