/// Lowercases, trims and drops punctuation surrounding the name. Internal punctuation is kept.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Normalized Levenshtein similarity in `[0, 1]`, `1.0` meaning identical after normalization.
///
/// Two empty names are identical; an empty name never resembles a non-empty one.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);

    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => strsim::normalized_levenshtein(&a, &b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        for name in ["Louvre", "McDonald's", "Sacré-Cœur", "x"] {
            assert_eq!(similarity(name, name), 1.0);
        }
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("", "x"), 0.0);
        assert_eq!(similarity("x", ""), 0.0);
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_name("  Test Landmark "), "test landmark");
        assert_eq!(normalize_name("\"Eiffel Tower.\""), "eiffel tower");
        assert_eq!(normalize_name("McDonald's"), "mcdonald's");
        assert_eq!(similarity("Test Landmark", "test landmark "), 1.0);
    }

    #[test]
    fn test_internal_punctuation_is_significant() {
        assert!(similarity("McDonald's", "McDonalds") < 1.0);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("Musée du Louvre", "Louvre Museum"),
            ("Arc de Triomphe", "Arc de Triomphe de l'Étoile"),
            ("Pont Neuf", "Pont-Neuf"),
            ("abc", ""),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    #[test]
    fn test_edit_distance_ratio() {
        // one substitution over four chars
        assert_eq!(similarity("park", "pork"), 0.75);
        assert!(similarity("Pont Neuf", "Pont-Neuf") >= 0.7);
        assert!(similarity("Louvre", "Orsay") < 0.7);
    }
}
