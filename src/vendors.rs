use std::collections::BTreeSet;

/// Vendor tag -> server-banner tokens that imply it. Tokens are matched
/// case-insensitively as substrings of the `Server` response header.
/// The list is approximate by nature and grows as new camera models show up.
const VENDOR_HINTS: &[(&str, &[&str])] = &[
    ("axis", &["Axis", "axis-media"]),
    ("hikvision", &["Hikvision", "Hikvision-Webs"]),
    ("dahua", &["Dahua", "Dahua Technology"]),
    ("reolink", &["Reolink"]),
    ("amcrest", &["Amcrest"]),
    ("synology", &["Synology", "SurveillanceStation"]),
    ("lorex", &["Lorex", "Dahua"]),
    ("uniview", &["UNV", "Uniview"]),
    ("panasonic", &["Panasonic"]),
    ("bosch", &["Bosch"]),
];

/// Infer vendor tags from a `Server` banner. Deduplicated; a banner matching
/// several tokens of the same vendor yields the tag once.
pub fn infer_vendors(server: &str) -> BTreeSet<String> {
    let lowered = server.to_lowercase();
    let mut tags = BTreeSet::new();
    for (tag, tokens) in VENDOR_HINTS {
        if tokens.iter().any(|t| lowered.contains(&t.to_lowercase())) {
            tags.insert(tag.to_string());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hikvision_banner_yields_tag_once() {
        // "Hikvision-Webs/3.0" matches both hikvision tokens; the set holds one tag.
        let tags = infer_vendors("Hikvision-Webs/3.0");
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["hikvision"]);
    }

    #[test]
    fn match_is_case_insensitive() {
        let tags = infer_vendors("AXIS 2100 Network Camera");
        assert!(tags.contains("axis"));
    }

    #[test]
    fn dahua_banner_also_implies_lorex_rebrand() {
        let tags = infer_vendors("Dahua Technology Webs");
        assert!(tags.contains("dahua"));
        assert!(tags.contains("lorex"));
    }

    #[test]
    fn unrelated_banner_yields_nothing() {
        assert!(infer_vendors("nginx/1.24.0").is_empty());
    }
}
