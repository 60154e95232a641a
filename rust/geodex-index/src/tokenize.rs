//! Name normalization and token splitting.
//!
//! Both operations are deterministic: the same input text always produces the
//! same normalized form and the same token sequence, which is what makes the
//! serialized index reproducible. The same routines must be applied to query
//! strings by any runtime lookup engine reading the index.

use std::str::CharIndices;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalizes raw name text: NFKD decomposition, removal of combining marks
/// (folding diacritics onto their base letters), then lowercasing.
///
/// "Château" and "CHATEAU" normalize to the identical string "chateau".
pub fn normalize(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Splits normalized text on the delimiter class (anything that is not
/// alphanumeric: whitespace, punctuation, symbols), yielding token slices in
/// input order.
pub fn tokens(input: &str) -> TokenIter<'_> {
    TokenIter {
        input,
        char_indices: input.char_indices(),
    }
}

/// Iterator over the alphanumeric runs of a string.
pub struct TokenIter<'a> {
    input: &'a str,
    char_indices: CharIndices<'a>,
}

impl<'a> Iterator for TokenIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let mut start = None;
        let mut end = None;

        for (pos, ch) in self.char_indices.by_ref() {
            if ch.is_alphanumeric() {
                if start.is_none() {
                    start = Some(pos);
                }
            } else if start.is_some() {
                end = Some(pos);
                break;
            }
        }

        // A token can run to the end of the input.
        if start.is_some() && end.is_none() {
            end = Some(self.input.len());
        }

        match (start, end) {
            (Some(start), Some(end)) => Some(&self.input[start..end]),
            _ => None,
        }
    }
}
