use unicode_normalization::UnicodeNormalization;

/// Base used when a title contains nothing that survives normalization.
pub const FALLBACK_SLUG: &str = "item";

/// Lowercase, ASCII-only, hyphen-separated form of `input`.
///
/// Accents are folded through NFKD decomposition, punctuation is dropped and
/// runs of whitespace or hyphens collapse into a single `-`.
pub fn slugify(input: &str) -> String {
    let ascii: String = input.nfkd().filter(|c| c.is_ascii()).collect();
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;

    for c in ascii.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_separator = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Picks the first free slug in the sequence `base`, `base-1`, `base-2`, …
///
/// `is_taken` is the table-specific existence lookup. The result is only a
/// best effort: the UNIQUE constraint on the column has the final say.
pub fn unique_slug<E, F>(title: &str, mut is_taken: F) -> Result<String, E>
where
    F: FnMut(&str) -> Result<bool, E>,
{
    let mut base = slugify(title);
    if base.is_empty() {
        base = FALLBACK_SLUG.to_string();
    }

    let mut candidate = base.clone();
    let mut counter = 1u32;
    while is_taken(&candidate)? {
        candidate = format!("{}-{}", base, counter);
        counter += 1;
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;
    use std::convert::Infallible;

    #[rstest]
    #[case("Hello World", "hello-world")]
    #[case("  Mon   Projet  ", "mon-projet")]
    #[case("Été à Brazzaville", "ete-a-brazzaville")]
    #[case("C++ & Rust -- fast!", "c-rust-fast")]
    #[case("snake_case title", "snake_case-title")]
    #[case("don't panic", "dont-panic")]
    #[case("!!!", "")]
    fn slugify_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn unique_slug_walks_the_numeric_suffixes() {
        let mut taken: HashSet<String> = HashSet::new();
        for expected in ["my-app", "my-app-1", "my-app-2"] {
            let slug = unique_slug::<Infallible, _>("My App", |s| Ok(taken.contains(s))).unwrap();
            assert_eq!(slug, expected);
            taken.insert(slug);
        }
    }

    #[test]
    fn unique_slug_falls_back_for_empty_titles() {
        let slug = unique_slug::<Infallible, _>("???", |_| Ok(false)).unwrap();
        assert_eq!(slug, FALLBACK_SLUG);
    }

    #[test]
    fn unique_slug_propagates_lookup_errors() {
        let res = unique_slug("title", |_| Err("db down"));
        assert_eq!(res, Err("db down"));
    }
}
