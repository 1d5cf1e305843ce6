//! Country/number classification
//!
//! Maps a dialed number string to a coarse class: internal call, domestic
//! mobile, domestic landline, a named international destination, or unknown.
//! Pure and deterministic so it can be unit tested against the fixed table.

use helios_core::config::ClassifierConfig;
use std::fmt;

/// ITU country calling codes, resolved longest-prefix-first
///
/// Not exhaustive; numbers whose code is missing classify as
/// `InternationalUnknown` rather than failing.
pub static COUNTRY_CODES: &[(&str, &str)] = &[
    ("1", "United States / Canada"),
    ("7", "Russia / Kazakhstan"),
    ("20", "Egypt"),
    ("27", "South Africa"),
    ("30", "Greece"),
    ("31", "Netherlands"),
    ("32", "Belgium"),
    ("33", "France"),
    ("34", "Spain"),
    ("36", "Hungary"),
    ("39", "Italy"),
    ("40", "Romania"),
    ("41", "Switzerland"),
    ("43", "Austria"),
    ("44", "United Kingdom"),
    ("45", "Denmark"),
    ("46", "Sweden"),
    ("47", "Norway"),
    ("48", "Poland"),
    ("49", "Germany"),
    ("51", "Peru"),
    ("52", "Mexico"),
    ("53", "Cuba"),
    ("54", "Argentina"),
    ("55", "Brazil"),
    ("56", "Chile"),
    ("57", "Colombia"),
    ("58", "Venezuela"),
    ("60", "Malaysia"),
    ("61", "Australia"),
    ("62", "Indonesia"),
    ("63", "Philippines"),
    ("64", "New Zealand"),
    ("65", "Singapore"),
    ("66", "Thailand"),
    ("81", "Japan"),
    ("82", "South Korea"),
    ("84", "Vietnam"),
    ("86", "China"),
    ("90", "Turkey"),
    ("91", "India"),
    ("92", "Pakistan"),
    ("93", "Afghanistan"),
    ("94", "Sri Lanka"),
    ("95", "Myanmar"),
    ("98", "Iran"),
    ("211", "South Sudan"),
    ("212", "Morocco"),
    ("213", "Algeria"),
    ("216", "Tunisia"),
    ("218", "Libya"),
    ("220", "Gambia"),
    ("221", "Senegal"),
    ("233", "Ghana"),
    ("234", "Nigeria"),
    ("249", "Sudan"),
    ("251", "Ethiopia"),
    ("252", "Somalia"),
    ("253", "Djibouti"),
    ("254", "Kenya"),
    ("255", "Tanzania"),
    ("256", "Uganda"),
    ("260", "Zambia"),
    ("263", "Zimbabwe"),
    ("351", "Portugal"),
    ("352", "Luxembourg"),
    ("353", "Ireland"),
    ("354", "Iceland"),
    ("358", "Finland"),
    ("359", "Bulgaria"),
    ("370", "Lithuania"),
    ("371", "Latvia"),
    ("372", "Estonia"),
    ("380", "Ukraine"),
    ("420", "Czech Republic"),
    ("421", "Slovakia"),
    ("880", "Bangladesh"),
    ("886", "Taiwan"),
    ("960", "Maldives"),
    ("961", "Lebanon"),
    ("962", "Jordan"),
    ("963", "Syria"),
    ("964", "Iraq"),
    ("965", "Kuwait"),
    ("966", "Saudi Arabia"),
    ("967", "Yemen"),
    ("968", "Oman"),
    ("970", "Palestine"),
    ("971", "United Arab Emirates"),
    ("972", "Israel"),
    ("973", "Bahrain"),
    ("974", "Qatar"),
    ("975", "Bhutan"),
    ("976", "Mongolia"),
    ("977", "Nepal"),
    ("992", "Tajikistan"),
    ("993", "Turkmenistan"),
    ("994", "Azerbaijan"),
    ("995", "Georgia"),
    ("996", "Kyrgyzstan"),
    ("998", "Uzbekistan"),
];

/// Coarse class of a dialed number
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberClass {
    /// Extension-to-extension call inside the tenant
    Internal,

    /// Mobile number in the home country
    DomesticMobile,

    /// Landline number in the home country
    DomesticLandline,

    /// International call to a destination found in the table
    International(String),

    /// International call whose calling code is not in the table
    InternationalUnknown,

    /// Nothing matched
    Unknown,
}

impl NumberClass {
    /// Whether the class is international (named or not)
    pub fn is_international(&self) -> bool {
        matches!(
            self,
            NumberClass::International(_) | NumberClass::InternationalUnknown
        )
    }
}

impl fmt::Display for NumberClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberClass::Internal => f.write_str("Internal Company Call"),
            NumberClass::DomesticMobile => f.write_str("Domestic Mobile"),
            NumberClass::DomesticLandline => f.write_str("Domestic Landline"),
            NumberClass::International(country) => write!(f, "International - {}", country),
            NumberClass::InternationalUnknown => f.write_str("International - Unknown Country"),
            NumberClass::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Number classifier parameterized by the home numbering plan
#[derive(Debug, Clone)]
pub struct CountryClassifier {
    config: ClassifierConfig,
}

impl CountryClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify a dialed number
    pub fn classify(&self, number: &str) -> NumberClass {
        let cleaned: String = number.chars().filter(|c| c.is_ascii_digit()).collect();

        if cleaned.len() == self.config.internal_length {
            return NumberClass::Internal;
        }

        // Domestically written mobile, e.g. 05xxxxxxxx
        if cleaned.len() == 10 && cleaned.starts_with(&self.config.mobile_prefix) {
            return NumberClass::DomesticMobile;
        }

        // Internationally written domestic number: strip 00<code> or <code>
        let mut national = cleaned.clone();
        let with_access = format!("00{}", self.config.home_country_code);
        if national.starts_with(&with_access) {
            national = national[with_access.len()..].to_string();
        } else if national.starts_with(&self.config.home_country_code)
            && national.len() > self.config.home_country_code.len() + 6
        {
            national = national[self.config.home_country_code.len()..].to_string();
        }

        // A stripped mobile loses its trunk zero: 5xxxxxxxx
        if national.len() == 9 && self.mobile_without_trunk_zero(&national) {
            return NumberClass::DomesticMobile;
        }

        if national.len() == 9
            && national.starts_with('0')
            && national[1..2]
                .chars()
                .all(|c| self.config.landline_second_digits.contains(c))
        {
            return NumberClass::DomesticLandline;
        }

        if cleaned.starts_with("00") || number.starts_with('+') {
            let international = if cleaned.starts_with("00") {
                &cleaned[2..]
            } else {
                cleaned.as_str()
            };
            return match Self::country_for(international) {
                Some(country) => NumberClass::International(country.to_string()),
                None => NumberClass::InternationalUnknown,
            };
        }

        NumberClass::Unknown
    }

    /// Mobile prefix check after the trunk zero was stripped with the
    /// country code
    fn mobile_without_trunk_zero(&self, national: &str) -> bool {
        let bare = self.config.mobile_prefix.trim_start_matches('0');
        !bare.is_empty() && national.starts_with(bare)
    }

    /// Longest-prefix lookup into the calling-code table
    fn country_for(digits: &str) -> Option<&'static str> {
        let max = digits.len().min(3);
        for len in (1..=max).rev() {
            let prefix = &digits[..len];
            if let Some((_, country)) = COUNTRY_CODES.iter().find(|(code, _)| *code == prefix) {
                return Some(country);
            }
        }
        None
    }
}

impl Default for CountryClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> CountryClassifier {
        CountryClassifier::default()
    }

    #[test]
    fn test_internal_call() {
        assert_eq!(classifier().classify("1234"), NumberClass::Internal);
        assert_eq!(classifier().classify("1001"), NumberClass::Internal);
    }

    #[test]
    fn test_domestic_mobile() {
        assert_eq!(
            classifier().classify("0512345678"),
            NumberClass::DomesticMobile
        );
    }

    #[test]
    fn test_mobile_with_country_code() {
        // +966 5xxxxxxxx and 00966 5xxxxxxxx are the same mobile number
        assert_eq!(
            classifier().classify("+966512345678"),
            NumberClass::DomesticMobile
        );
        assert_eq!(
            classifier().classify("00966512345678"),
            NumberClass::DomesticMobile
        );
    }

    #[test]
    fn test_domestic_landline() {
        assert_eq!(
            classifier().classify("011234567"),
            NumberClass::DomesticLandline
        );
        assert_eq!(
            classifier().classify("031234567"),
            NumberClass::DomesticLandline
        );
        // 5 is not a landline second digit
        assert_ne!(
            classifier().classify("051234567"),
            NumberClass::DomesticLandline
        );
    }

    #[test]
    fn test_international_plus() {
        assert_eq!(
            classifier().classify("+14155552671"),
            NumberClass::International("United States / Canada".to_string())
        );
    }

    #[test]
    fn test_international_access_prefix() {
        assert_eq!(
            classifier().classify("00447911123456"),
            NumberClass::International("United Kingdom".to_string())
        );
    }

    #[test]
    fn test_longest_prefix_wins() {
        // 971 (UAE) must win over 9 / 97 partial matches
        assert_eq!(
            classifier().classify("+971501234567"),
            NumberClass::International("United Arab Emirates".to_string())
        );
    }

    #[test]
    fn test_international_unknown_code() {
        // 883 is an unassigned/global code not in the table
        assert_eq!(
            classifier().classify("00883123456789"),
            NumberClass::InternationalUnknown
        );
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classifier().classify("12345678"), NumberClass::Unknown);
        assert_eq!(classifier().classify(""), NumberClass::Unknown);
    }

    #[test]
    fn test_non_digits_stripped() {
        assert_eq!(
            classifier().classify("05-1234 5678"),
            NumberClass::DomesticMobile
        );
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(NumberClass::Internal.to_string(), "Internal Company Call");
        assert_eq!(
            NumberClass::International("Peru".to_string()).to_string(),
            "International - Peru"
        );
        assert_eq!(NumberClass::Unknown.to_string(), "Unknown");
    }
}
