use once_cell::sync::Lazy;
use regex::Regex;

static RE_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,:]").unwrap());
static RE_REMOVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[()/#]").unwrap());
static RE_VALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-\w]+$").unwrap());

/// Normalize an arbitrary catalog field name into a safe index-field name.
///
/// `.`, `,` and `:` become underscores; `(`, `)`, `/` and `#` are stripped.
/// Returns `None` when the result still contains characters outside
/// `[-\w]+` (Unicode word semantics), in which case the caller is expected
/// to log and drop the field.
pub fn sanitize(name: &str) -> Option<String> {
    let name = RE_UNDERSCORE.replace_all(name, "_");
    let name = RE_REMOVE.replace_all(&name, "");
    if RE_VALID.is_match(&name) {
        Some(name.into_owned())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dots_become_underscores() {
        assert_eq!(sanitize("subject.facet"), Some("subject_facet".to_string()));
        assert_eq!(sanitize("a,b:c"), Some("a_b_c".to_string()));
    }

    #[test]
    fn test_stripped_characters() {
        assert_eq!(sanitize("bad/name#1"), Some("badname1".to_string()));
        assert_eq!(sanitize("id_(loc)"), Some("id_loc".to_string()));
    }

    #[test]
    fn test_hyphen_and_word_chars_accepted() {
        assert_eq!(sanitize("id_wikidata-alt"), Some("id_wikidata-alt".to_string()));
        assert_eq!(sanitize("plain_name"), Some("plain_name".to_string()));
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert_eq!(sanitize("weird name!"), None);
        assert_eq!(sanitize("space name"), None);
        assert_eq!(sanitize(""), None);
        assert_eq!(sanitize("()"), None);
    }

    #[test]
    fn test_unicode_word_characters_survive() {
        // Non-ASCII letters are word characters; rejection must come from
        // the invalid-character set, not from being non-ASCII.
        assert_eq!(sanitize("idént.ifiant"), Some("idént_ifiant".to_string()));
        assert_eq!(sanitize("número"), Some("número".to_string()));
        assert_eq!(sanitize("número malo!"), None);
    }
}
