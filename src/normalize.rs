use deunicode::deunicode;

/// Turns a raw cell value into the key used for name comparison: ASCII-folded,
/// lowercased, punctuation dropped (hyphens kept), whitespace collapsed.
pub fn normalize(raw: &str) -> String {
    let ascii = deunicode(raw).to_lowercase();
    let mut cleaned = String::with_capacity(ascii.len());
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            cleaned.push(ch);
        } else if ch.is_whitespace() {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_collapses_whitespace() {
        assert_eq!(normalize("  Jane   Smith \t"), "jane smith");
    }

    #[test]
    fn folds_accents_to_ascii() {
        assert_eq!(normalize("Édouard Müller"), "edouard muller");
        assert_eq!(normalize("José Peña"), "jose pena");
    }

    #[test]
    fn drops_punctuation_but_keeps_hyphens() {
        assert_eq!(normalize("Univ. of Toronto"), "univ of toronto");
        assert_eq!(normalize("Jean-Pierre O'Brien"), "jean-pierre obrien");
    }

    #[test]
    fn is_idempotent() {
        for raw in ["  Édouard   Müller ", "Univ. of Toront", "", "É", "a-b c"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn empty_and_punctuation_only_normalize_to_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" .,;! "), "");
    }
}
