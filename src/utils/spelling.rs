//! Clean-up of fish names read by OCR

/// Known OCR misreads of banner text, applied before normalisation
const CORRECTIONS: [(&str, &str); 4] = [
    ("0", "o"),
    ("|", "l"),
    ("aluminium", "aluminum"),
    ("astercad", "asterscad"),
];

/// Normalise a raw OCR fish name: lowercase, `#` and stray punctuation removed,
/// known misreads fixed, words joined by `_`.
pub fn normalize_fish_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let corrected = correct_text(&lowered);
    corrected
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Apply spelling corrections to lowercase text
fn correct_text(text: &str) -> String {
    let mut result = text.to_string();
    for (wrong, right) in CORRECTIONS {
        result = result.replace(wrong, right);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_text() {
        assert_eq!(correct_text("astercad"), "asterscad");
        assert_eq!(correct_text("aluminium"), "aluminum");
        assert_eq!(correct_text("c0d"), "cod");
    }

    #[test]
    fn test_normalize_fish_name() {
        assert_eq!(normalize_fish_name("  Common Bream "), "common_bream");
        assert_eq!(normalize_fish_name("#Pike-Perch"), "pike_perch");
        assert_eq!(normalize_fish_name("C0mmon  Roach."), "common_roach");
        assert_eq!(normalize_fish_name(""), "");
    }
}
