use std::collections::BTreeSet;

/// Strip hyphens and spaces, uppercase a trailing check 'x'.
fn canonical(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn digit(c: char) -> Option<u32> {
    c.to_digit(10)
}

/// Compute the ISBN-13 check digit over the first 12 digits.
fn check_digit_13(digits: &[u32]) -> u32 {
    let sum: u32 = digits
        .iter()
        .take(12)
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { 3 * d })
        .sum();
    (10 - sum % 10) % 10
}

/// Compute the ISBN-10 check character over the first 9 digits.
fn check_digit_10(digits: &[u32]) -> char {
    let sum: u32 = digits
        .iter()
        .take(9)
        .enumerate()
        .map(|(i, d)| (10 - i as u32) * d)
        .sum();
    match (11 - sum % 11) % 11 {
        10 => 'X',
        d => char::from_digit(d, 10).unwrap_or('0'),
    }
}

/// Compute the counterpart of an ISBN: the ISBN-13 of an ISBN-10 and vice
/// versa. Returns `None` when no counterpart is derivable (a 13-digit ISBN
/// outside the 978 prefix, or malformed input). Hyphens in the input do not
/// prevent conversion; the returned counterpart is unhyphenated.
pub fn counterpart(isbn: &str) -> Option<String> {
    let canon = canonical(isbn);
    match canon.len() {
        10 => {
            // Leading 9 positions must be digits; the check char may be X.
            let digits: Vec<u32> = canon.chars().take(9).map(digit).collect::<Option<_>>()?;
            let mut out: Vec<u32> = vec![9, 7, 8];
            out.extend(digits);
            let check = check_digit_13(&out);
            let body: String = out.iter().map(|d| d.to_string()).collect();
            Some(format!("{}{}", body, check))
        }
        13 => {
            if !canon.starts_with("978") {
                return None;
            }
            let digits: Vec<u32> = canon
                .chars()
                .skip(3)
                .take(9)
                .map(digit)
                .collect::<Option<_>>()?;
            let check = check_digit_10(&digits);
            let body: String = digits.iter().map(|d| d.to_string()).collect();
            Some(format!("{}{}", body, check))
        }
        _ => None,
    }
}

/// Expand the union of raw ISBN-10 and ISBN-13 values into a canonical set
/// closed under counterpart conversion.
///
/// Each input is normalized by removing `_` and surrounding whitespace, but
/// hyphens inside values are preserved as given. Values whose counterpart
/// cannot be computed are kept as-is without one; nothing errors.
pub fn reconcile(isbn10: &[String], isbn13: &[String]) -> BTreeSet<String> {
    let mut isbns: BTreeSet<String> = isbn10
        .iter()
        .chain(isbn13.iter())
        .map(|v| v.replace('_', "").trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();

    let counterparts: Vec<String> = isbns.iter().filter_map(|v| counterpart(v)).collect();
    isbns.extend(counterparts);
    isbns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isbn10_to_isbn13() {
        assert_eq!(counterpart("0131103628"), Some("9780131103627".to_string()));
        // Hyphenated input still converts
        assert_eq!(counterpart("0-13-110362-8"), Some("9780131103627".to_string()));
    }

    #[test]
    fn test_isbn13_to_isbn10() {
        assert_eq!(counterpart("9780131103627"), Some("0131103628".to_string()));
    }

    #[test]
    fn test_check_digit_x() {
        // 043942089X is a valid ISBN-10 ending in X
        assert_eq!(counterpart("9780439420891"), Some("043942089X".to_string()));
    }

    #[test]
    fn test_non_978_has_no_counterpart() {
        assert_eq!(counterpart("9790131103624"), None);
    }

    #[test]
    fn test_malformed_has_no_counterpart() {
        assert_eq!(counterpart("not-an-isbn"), None);
        assert_eq!(counterpart("12345"), None);
    }

    #[test]
    fn test_reconcile_adds_counterparts() {
        let set = reconcile(&["0131103628".to_string()], &[]);
        assert!(set.contains("0131103628"));
        assert!(set.contains("9780131103627"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_reconcile_is_closed() {
        let first = reconcile(&["0131103628".to_string()], &["9781566199094".to_string()]);
        let inputs: Vec<String> = first.iter().cloned().collect();
        let second = reconcile(&inputs, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reconcile_normalizes_underscores_and_whitespace() {
        let set = reconcile(&[" 01311_03628 ".to_string()], &[]);
        assert!(set.contains("0131103628"));
    }

    #[test]
    fn test_reconcile_keeps_unconvertible_values() {
        let set = reconcile(&[], &["9790000000001".to_string()]);
        assert!(set.contains("9790000000001"));
        assert_eq!(set.len(), 1);
    }
}
