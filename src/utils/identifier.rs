//! Game identifiers: short upper-case hex codes players type to join.

use rand::Rng;

/// Characters used in generated identifiers
pub const IDENTIFIER_CHARS: [char; 16] = [
    'A', 'B', 'C', 'D', 'E', 'F', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Generate a random identifier of `length` characters
pub fn random_identifier(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| IDENTIFIER_CHARS[rng.random_range(0..IDENTIFIER_CHARS.len())])
        .collect()
}

/// Generate identifiers until `is_taken` accepts one
pub fn unique_identifier<F>(length: usize, mut is_taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    loop {
        let id = random_identifier(length);
        if !is_taken(&id) {
            return id;
        }
    }
}

/// Whether `id` has the right length and only uses identifier characters
pub fn is_valid_identifier(id: &str, length: usize) -> bool {
    id.chars().count() == length && id.chars().all(|c| IDENTIFIER_CHARS.contains(&c))
}
