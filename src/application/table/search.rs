//! Search text folding for Arabic and Latin input.

/// Fold `text` for substring matching.
///
/// Lowercases, drops harakat, superscript alef and tatweel, and unifies
/// alef forms (أ إ آ ٱ → ا), alef maqsura (ى → ي) and taa marbuta (ة → ه).
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|ch| !is_ignorable(*ch))
        .map(fold_letter)
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_ignorable(ch: char) -> bool {
    matches!(ch, '\u{064B}'..='\u{0652}' | '\u{0670}' | '\u{0640}')
}

fn fold_letter(ch: char) -> char {
    match ch {
        'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
        'ى' => 'ي',
        'ة' => 'ه',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_text_is_lowercased() {
        assert_eq!(normalize("BoB"), "bob");
    }

    #[test]
    fn arabic_variants_fold_together() {
        assert_eq!(normalize("أحمد"), normalize("احمد"));
        assert_eq!(normalize("إيمان"), "ايمان");
        assert_eq!(normalize("مصطفى"), "مصطفي");
        assert_eq!(normalize("فاطمة"), "فاطمه");
    }

    #[test]
    fn diacritics_and_tatweel_are_dropped() {
        assert_eq!(normalize("مُحَمَّد"), "محمد");
        assert_eq!(normalize("عـــلي"), "علي");
    }
}
