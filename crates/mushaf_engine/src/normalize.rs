/* 📖 # Why normalize Arabic text before comparing?

The primary text carries full vocalization: short vowels, shadda, sukun,
superscript alef and the small Quranic annotation signs. A reader typing a
query rarely reproduces these, and the same word may be written with
different alef forms (hamza above, hamza below, madda, wasla). Normalization
maps both sides onto one comparison form so such spelling differences do not
hide matches:

1. alef variants fold to bare alef
2. alef maqsura folds to ya
3. combining marks are removed
4. whitespace runs collapse to one space, ends trimmed
5. cased scripts are lowercased

Every step maps onto characters no earlier step touches again, which makes
the function idempotent.
*/

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

const BARE_ALEF: char = '\u{0627}';
const YA: char = '\u{064A}';

/// Leading and trailing punctuation of a single token.
static EDGE_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\p{P}+|\p{P}+$").expect("edge punctuation pattern is valid")
});

/// Map a string to its comparison form.
///
/// # Examples
/// ```
/// use mushaf_engine::normalize;
///
/// assert_eq!(normalize("  بِسْمِ   ٱللَّهِ "), "بسم الله");
/// assert_eq!(normalize("Mercy"), "mercy");
/// ```
pub fn normalize(text: &str) -> String {
    let folded: String = text.chars().filter_map(fold_char).collect();
    let mut collapsed = String::with_capacity(folded.len());
    for word in folded.split_whitespace() {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }
    collapsed.to_lowercase()
}

/// Fold letter variants and drop combining marks for a single character.
fn fold_char(c: char) -> Option<char> {
    match c {
        // أ إ آ ٱ
        '\u{0623}' | '\u{0625}' | '\u{0622}' | '\u{0671}' => Some(BARE_ALEF),
        // ى
        '\u{0649}' => Some(YA),
        c if is_combining_mark(c) => None,
        c => Some(c),
    }
}

/// Arabic harakat, Quranic annotation signs and the superscript alef.
pub fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0610}'..='\u{061A}'
        | '\u{064B}'..='\u{065F}'
        | '\u{0670}'
        | '\u{06D6}'..='\u{06DC}'
        | '\u{06DF}'..='\u{06E8}'
        | '\u{06EA}'..='\u{06ED}')
}

/// Trim leading and trailing punctuation from a token.
///
/// This is the single punctuation rule used by exact-word matching on both
/// the primary text and translation text.
pub fn strip_punctuation(token: &str) -> Cow<'_, str> {
    EDGE_PUNCTUATION.replace_all(token, "")
}
