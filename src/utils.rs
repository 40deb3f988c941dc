use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

/// Separator between multiple names inside one CSV field.
///
/// The comma belongs to the CSV format itself, so artist lists use `;`.
pub const ARTIST_DELIMITER: char = ';';

const MAX_FILE_STEM_LEN: usize = 120;
/// Leaves room for ` (n)` and `.csv.partial` within a 255-byte file name.
const MAX_FILE_STEM_BYTES: usize = 200;

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Joins names with [`ARTIST_DELIMITER`].
///
/// A literal delimiter inside a name is written as `\;` and a backslash as
/// `\\`, so the field can always be split back into the original names.
pub fn join_names<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .map(|name| {
            let mut escaped = String::with_capacity(name.len());
            for c in name.chars() {
                if c == '\\' || c == ARTIST_DELIMITER {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped
        })
        .collect::<Vec<_>>()
        .join(&ARTIST_DELIMITER.to_string())
}

/// Splits a field produced by [`join_names`] back into names.
pub fn split_names(field: &str) -> Vec<String> {
    if field.is_empty() {
        return Vec::new();
    }

    let mut names = Vec::new();
    let mut current = String::new();
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c == ARTIST_DELIMITER => names.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    names.push(current);
    names
}

/// Turns a playlist name into a file stem that is valid on all common
/// filesystems.
///
/// Path separators, characters reserved on Windows and control characters
/// become `_`; surrounding whitespace and trailing dots are trimmed and the
/// result is cut to 120 characters, and to 200 bytes on a character
/// boundary. An empty result becomes `unnamed`.
pub fn sanitize_file_stem(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let mut truncated = String::new();
    for c in replaced.trim().chars().take(MAX_FILE_STEM_LEN) {
        if truncated.len() + c.len_utf8() > MAX_FILE_STEM_BYTES {
            break;
        }
        truncated.push(c);
    }
    let stem = truncated.trim().trim_end_matches('.').trim_end();

    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem.to_string()
    }
}
