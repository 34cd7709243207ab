use tracing::*;

use crate::{consts::DEBIT_HEADER, layout::element::Word};

/// Horizontal center of the first `DEBIT` column header, if any.
pub fn find_debit_column(words: &[Word]) -> Option<f32> {
    words
        .iter()
        .find(|word| word.text.trim().eq_ignore_ascii_case(DEBIT_HEADER))
        .map(Word::x_center)
}

/// Reads an OCR amount, accepting a comma as decimal separator and spaces as
/// thousand separators.
pub fn parse_number(text: &str) -> Option<f64> {
    let normalized = text.replace(',', ".").replace(' ', "");
    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Forces every amount printed under the debit header to be negative.
///
/// A word is under the header when its center is strictly closer than
/// `tolerance` pixels to `debit_x`. Its text becomes `-{|value|}` in the
/// shortest round-trip float notation (`45,00` becomes `-45.0`). Words that
/// are not numbers, and every word when there is no header, pass through.
pub fn apply_debit_sign(words: Vec<Word>, debit_x: Option<f32>, tolerance: i32) -> Vec<Word> {
    let Some(debit_x) = debit_x else {
        return words;
    };

    words
        .into_iter()
        .map(|word| {
            if (word.x_center() - debit_x).abs() >= tolerance as f32 {
                return word;
            }
            match parse_number(&word.text) {
                Some(value) => {
                    let text = format!("-{:?}", value.abs());
                    trace!("debit column rewrites `{}` to `{}`", word.text, text);
                    Word { text, ..word }
                }
                None => word,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::element::BoundingBox;

    fn word_at(text: &str, x_center: i32) -> Word {
        Word::new(
            text,
            0.9,
            BoundingBox::new(x_center - 10, 0, x_center + 10, 10),
        )
    }

    #[test]
    fn test_find_debit_column() {
        let words = vec![
            word_at("DATE", 20),
            word_at("debit", 300),
            word_at("CREDIT", 400),
        ];
        assert_eq!(find_debit_column(&words), Some(300.0));
        assert_eq!(find_debit_column(&words[..1]), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("45,00"), Some(45.0));
        assert_eq!(parse_number("1 250,5"), Some(1250.5));
        assert_eq!(parse_number("-3.20"), Some(-3.2));
        assert_eq!(parse_number("DEBIT"), None);
        assert_eq!(parse_number("1.234,56"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_debit_amount_is_negated() {
        let words = vec![word_at("DEBIT", 300), word_at("45,00", 298)];
        let debit_x = find_debit_column(&words);

        let words = apply_debit_sign(words, debit_x, 10);
        assert_eq!(words[0].text, "DEBIT");
        assert_eq!(words[1].text, "-45.0");
    }

    #[test]
    fn test_debit_sign_is_forced_not_flipped() {
        let words = vec![word_at("-12,50", 305), word_at("7", 296)];
        let words = apply_debit_sign(words, Some(300.0), 10);
        assert_eq!(words[0].text, "-12.5");
        assert_eq!(words[1].text, "-7.0");
    }

    #[test]
    fn test_words_outside_column_untouched() {
        let words = vec![word_at("45,00", 400), word_at("12,00", 310)];
        let words = apply_debit_sign(words, Some(300.0), 10);
        assert_eq!(words[0].text, "45,00");
        // exactly on the tolerance is outside the column
        assert_eq!(words[1].text, "12,00");

        let untouched = apply_debit_sign(vec![word_at("45,00", 300)], None, 10);
        assert_eq!(untouched[0].text, "45,00");
    }
}
