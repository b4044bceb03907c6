const DEVANAGARI_ZERO: u32 = 0x0966;
const DEVANAGARI_NINE: u32 = 0x096F;

pub fn is_devanagari_digit(character: char) -> bool {
    (DEVANAGARI_ZERO..=DEVANAGARI_NINE).contains(&(character as u32))
}

/// True for ASCII digits and Devanagari digits (०-९).
pub fn is_any_digit(character: char) -> bool {
    character.is_ascii_digit() || is_devanagari_digit(character)
}

pub fn to_ascii_digit(character: char) -> char {
    if is_devanagari_digit(character) {
        let offset = character as u32 - DEVANAGARI_ZERO;
        char::from_digit(offset, 10).unwrap_or(character)
    } else {
        character
    }
}

/// Rewrites every Devanagari digit as its ASCII counterpart and leaves all
/// other characters untouched.
pub fn normalize_digits(input: &str) -> String {
    input.chars().map(to_ascii_digit).collect()
}

/// Keeps only digits, converted to ASCII.
pub fn ascii_digits_only(input: &str) -> String {
    input
        .chars()
        .filter(|character| is_any_digit(*character))
        .map(to_ascii_digit)
        .collect()
}
