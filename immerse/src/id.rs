use nanoid::nanoid;
use uuid::Uuid;

/// Alphabet for document identifiers (no ambiguous glyphs, no path separators).
const DOCUMENT_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
/// Default document id length.
const DOCUMENT_ID_LENGTH: usize = 20;

/// Generates a new identifier for a post, comment or notification document.
pub fn generate_document_id() -> String {
    nanoid!(DOCUMENT_ID_LENGTH, DOCUMENT_ID_ALPHABET)
}

/// Generates a unique object name for an uploaded blob, keeping the given extension.
pub fn generate_object_name(extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        format!("{}.{extension}", Uuid::new_v4())
    }
}
