//! Turning study-index addresses into geocodable text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Settings for [`AddressNormalizer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressSettings {
    /// City appended when the address does not already name it.
    pub city: String,
    /// Country appended to every address.
    pub country: String,
    /// Upper-case spellings that show the address already names the city.
    pub city_markers: Vec<String>,
    /// Token marking a street intersection.
    pub intersection_token: String,
    /// Word replacing the intersection token.
    pub intersection_word: String,
    /// Street-type abbreviations and their expansions, keyed upper-case.
    pub abbreviations: BTreeMap<String, String>,
}

impl Default for AddressSettings {
    fn default() -> Self {
        let abbreviations = [
            ("AK", "Autopista"),
            ("KR", "Carrera"),
            ("CL", "Calle"),
            ("AC", "Avenida Calle"),
            ("TV", "Transversal"),
            ("DG", "Diagonal"),
            ("VIA", "Vía"),
        ]
        .into_iter()
        .map(|(short, long)| (short.to_owned(), long.to_owned()))
        .collect();
        Self {
            city: "Bogotá".to_owned(),
            country: "Colombia".to_owned(),
            city_markers: vec!["BOGOTA".to_owned(), "BOGOTÁ".to_owned()],
            intersection_token: "X".to_owned(),
            intersection_word: "Y".to_owned(),
            abbreviations,
        }
    }
}

/// Expands abbreviated street codes such as `AK_45_X_CL_245`.
#[derive(Debug, Clone, Default)]
pub struct AddressNormalizer {
    settings: AddressSettings,
}

impl AddressNormalizer {
    /// Build a normaliser from `settings`.
    #[must_use]
    pub const fn new(settings: AddressSettings) -> Self {
        Self { settings }
    }

    /// Normalise `raw`, or `None` when it holds no tokens.
    ///
    /// ```
    /// use nodeharvest_data::enrich::AddressNormalizer;
    ///
    /// let normalizer = AddressNormalizer::default();
    /// assert_eq!(
    ///     normalizer.normalize("AK_45_X_CL_245").as_deref(),
    ///     Some("Autopista 45 Y Calle 245, Bogotá, Colombia"),
    /// );
    /// ```
    #[must_use]
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let upper = raw.trim().to_uppercase();
        let tokens: Vec<&str> = upper
            .split(|ch: char| ch == '_' || ch.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| self.expand(token))
            .collect();
        if tokens.is_empty() {
            return None;
        }
        let street = tokens.join(" ");
        let names_city = self
            .settings
            .city_markers
            .iter()
            .any(|marker| upper.contains(marker.as_str()));
        Some(if names_city {
            format!("{street}, {}", self.settings.country)
        } else {
            format!("{street}, {}, {}", self.settings.city, self.settings.country)
        })
    }

    fn expand<'a>(&'a self, token: &'a str) -> &'a str {
        if token == self.settings.intersection_token {
            return &self.settings.intersection_word;
        }
        self.settings
            .abbreviations
            .get(token)
            .map_or(token, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("AK_45_X_CL_245", "Autopista 45 Y Calle 245, Bogotá, Colombia")]
    #[case("kr 7 x cl 72", "Carrera 7 Y Calle 72, Bogotá, Colombia")]
    #[case("AC_26__X_TV_93", "Avenida Calle 26 Y Transversal 93, Bogotá, Colombia")]
    #[case("VIA_SUBA_BOGOTA", "Vía SUBA BOGOTA, Colombia")]
    #[case("DG 40 Bogotá", "Diagonal 40 BOGOTÁ, Colombia")]
    fn expands_street_codes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(
            AddressNormalizer::default().normalize(raw).as_deref(),
            Some(expected)
        );
    }

    #[rstest]
    fn abbreviations_only_match_whole_tokens() {
        let normalized = AddressNormalizer::default()
            .normalize("CLX_10")
            .expect("tokens");
        assert!(normalized.starts_with("CLX 10"), "{normalized}");
    }

    #[rstest]
    #[case("")]
    #[case(" __ ")]
    fn blank_addresses_are_skipped(#[case] raw: &str) {
        assert_eq!(AddressNormalizer::default().normalize(raw), None);
    }

    #[rstest]
    fn qualifier_is_configurable() {
        let settings = AddressSettings {
            city: "Medellín".to_owned(),
            city_markers: vec!["MEDELLIN".to_owned()],
            ..AddressSettings::default()
        };
        assert_eq!(
            AddressNormalizer::new(settings).normalize("CL_10").as_deref(),
            Some("Calle 10, Medellín, Colombia")
        );
    }
}
