// Text normalization helpers shared by the moderation checks.
//
// Everything here builds new strings; the caller's text is never edited in place.

/// Lower-case a single character the Turkish way.
///
/// `I` folds to dotless `ı` and `İ` to plain `i`. Any other character uses its
/// Unicode lower-case mapping when that mapping is a single character, so the
/// folded text always has exactly as many chars as the input.
pub fn fold_char(c: char) -> char {
    match c {
        'I' => 'ı',
        'İ' => 'i',
        _ => {
            let mut lower = c.to_lowercase();
            if lower.len() == 1 {
                lower.next().unwrap_or(c)
            } else {
                c
            }
        }
    }
}

/// Turkish-aware lower-casing, char for char.
pub fn fold_case(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Remove every occurrence of every safe word from an already folded text.
///
/// NOTE: removal is not limited to spans that overlap a flagged pattern, so a
/// safe word anywhere in the text can hide a flagged term that contains it.
pub fn strip_safe_words(folded: &str, safe_words: &[String]) -> String {
    safe_words
        .iter()
        .filter(|word| !word.is_empty())
        .fold(folded.to_string(), |working, word| {
            if working.contains(word.as_str()) {
                working.replace(word.as_str(), "")
            } else {
                working
            }
        })
}

/// Censor every occurrence of `term` in `original`, ignoring case.
///
/// Each occurrence keeps its first character and the rest becomes `*`, so the
/// output has the same number of chars as the input. Occurrences are found
/// left to right without overlap.
pub fn censor_term(original: &str, term: &str) -> String {
    let needle: Vec<char> = term.chars().map(fold_char).collect();
    if needle.is_empty() {
        return original.to_string();
    }

    let chars: Vec<char> = original.chars().collect();
    let folded: Vec<char> = chars.iter().map(|&c| fold_char(c)).collect();

    let mut out = String::with_capacity(original.len());
    let mut i = 0;
    while i < chars.len() {
        if folded[i..].starts_with(&needle) {
            out.push(chars[i]);
            out.extend(std::iter::repeat('*').take(needle.len() - 1));
            i += needle.len();
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turkish_dotted_and_dotless_i() {
        assert_eq!(fold_case("İSTANBUL"), "istanbul");
        assert_eq!(fold_case("IRMAK"), "ırmak");
        assert_eq!(fold_case("ÇĞÖŞÜ"), "çğöşü");
    }

    #[test]
    fn test_fold_keeps_char_count() {
        let input = "İİ Iı Straße ΣΑΣ";
        assert_eq!(fold_case(input).chars().count(), input.chars().count());
    }

    #[test]
    fn test_strip_safe_words_removes_all_occurrences() {
        let safe = vec!["götür".to_string(), String::new()];
        assert_eq!(
            strip_safe_words("götürdü ve götürecek", &safe),
            "dü ve ecek"
        );
    }

    #[test]
    fn test_censor_preserves_surrounding_text() {
        assert_eq!(
            censor_term("Hadi SİKTİR git!", "siktir"),
            "Hadi S***** git!"
        );
        assert_eq!(censor_term("a s1kt1r b s1kt1r", "s1kt1r"), "a s***** b s*****");
    }

    #[test]
    fn test_censor_without_match_is_identity() {
        assert_eq!(censor_term("temiz metin", "siktir"), "temiz metin");
        assert_eq!(censor_term("temiz metin", ""), "temiz metin");
    }
}
