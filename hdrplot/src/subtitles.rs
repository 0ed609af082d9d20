use crate::metadata::{DoviSummary, MasteringDisplay};

/// Header annotations: HDR10 lines on the left, Dolby Vision lines on the right.
/// Row 1 sits above row 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitles {
    pub hdr1: String,
    pub hdr2: String,
    pub dv1: String,
    pub dv2: String,
}

impl Subtitles {
    pub fn new(mastering: &MasteringDisplay, dovi: Option<&DoviSummary>) -> Self {
        let hdr1 = mastering
            .primaries
            .as_ref()
            .map(|p| format!("Mastering Display Color Primaries: {}", p));
        let hdr2 = mastering
            .luminance
            .as_ref()
            .map(|(min, max)| format!("Mastering Display Luminance: {}/{} nits", min, max));
        let (hdr1, hdr2) = pair_or(hdr1, hdr2, "No HDR metadata in original file");

        let (dv1, dv2) = match dovi {
            Some(summary) => {
                let dv1 = match (&summary.profile, &summary.dm_version) {
                    (Some(profile), Some(version)) => {
                        Some(format!("Dolby Vision {}, {}", profile, version))
                    }
                    _ => None,
                };
                (dv1, summary.mastering_display.clone())
            }
            None => (None, None),
        };
        let (dv1, dv2) = pair_or(dv1, dv2, "No Dolby Vision");

        Subtitles { hdr1, hdr2, dv1, dv2 }
    }
}

/// A missing half of a pair becomes empty; a fully missing pair shows `fallback` on row 2.
fn pair_or(first: Option<String>, second: Option<String>, fallback: &str) -> (String, String) {
    match (first, second) {
        (None, None) => (String::new(), fallback.to_string()),
        (first, second) => (first.unwrap_or_default(), second.unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_mastering() -> MasteringDisplay {
        MasteringDisplay {
            primaries: Some("Display P3".to_string()),
            luminance: Some(("0.0050".to_string(), "1000".to_string())),
        }
    }

    #[test]
    fn test_hdr10_only() {
        let subs = Subtitles::new(&full_mastering(), None);
        assert_eq!(subs.hdr1, "Mastering Display Color Primaries: Display P3");
        assert_eq!(subs.hdr2, "Mastering Display Luminance: 0.0050/1000 nits");
        assert_eq!(subs.dv1, "");
        assert_eq!(subs.dv2, "No Dolby Vision");
    }

    #[test]
    fn test_profile5_without_static_metadata() {
        let dovi = DoviSummary {
            frames: Some(10),
            profile: Some("Profile 5".to_string()),
            dm_version: Some("CM v2.9".to_string()),
            mastering_display: Some("RPU mastering display: 0.0001/1000 nits".to_string()),
        };
        let subs = Subtitles::new(&MasteringDisplay::default(), Some(&dovi));
        assert_eq!(subs.hdr1, "");
        assert_eq!(subs.hdr2, "No HDR metadata in original file");
        assert_eq!(subs.dv1, "Dolby Vision Profile 5, CM v2.9");
        assert_eq!(subs.dv2, "RPU mastering display: 0.0001/1000 nits");
    }

    #[test]
    fn test_partial_metadata_leaves_blank_half() {
        let mastering = MasteringDisplay {
            primaries: None,
            luminance: Some(("0.0001".to_string(), "4000".to_string())),
        };
        let dovi = DoviSummary {
            profile: Some("Profile 8".to_string()),
            ..DoviSummary::default()
        };
        let subs = Subtitles::new(&mastering, Some(&dovi));
        assert_eq!(subs.hdr1, "");
        assert_eq!(subs.hdr2, "Mastering Display Luminance: 0.0001/4000 nits");
        // Profile without DM version is not enough for the DV headline.
        assert_eq!(subs.dv1, "");
        assert_eq!(subs.dv2, "No Dolby Vision");
    }
}
