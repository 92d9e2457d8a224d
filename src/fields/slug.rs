/// Slugify a facet value into a stable key form.
///
/// Lowercases, keeps alphanumerics, maps spaces and underscores to `_`, and
/// drops all other punctuation. Used for the `*_key` facet fields and the
/// facet entries of a work's `seed` set.
pub fn str_to_key(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == ' ' || c == '_' {
                Some('_')
            } else {
                None
            }
        })
        .collect()
}
