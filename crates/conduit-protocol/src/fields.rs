//! NUL-separated payload fields.

/// Separator between packed payload fields.
pub const FIELD_SEPARATOR: char = '\0';

/// Splits `payload` on the first [`FIELD_SEPARATOR`].
///
/// Returns the leading field and, when a separator was present, everything
/// after it (which may itself contain separators).
#[must_use]
pub fn split_fields(payload: &str) -> (&str, Option<&str>) {
    match payload.split_once(FIELD_SEPARATOR) {
        Some((head, rest)) => (head, Some(rest)),
        None => (payload, None),
    }
}

/// Packs `head` and `rest` into one payload.
#[must_use]
pub fn join_fields(head: &str, rest: &str) -> String {
    let mut payload = String::with_capacity(head.len() + rest.len() + 1);
    payload.push_str(head);
    payload.push(FIELD_SEPARATOR);
    payload.push_str(rest);
    payload
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::bare("cli-1", ("cli-1", None))]
    #[case::packed("cli-1\0return 1", ("cli-1", Some("return 1")))]
    #[case::first_only("a\0b\0c", ("a", Some("b\0c")))]
    #[case::empty_tail("a\0", ("a", Some("")))]
    fn splits_on_first_separator(#[case] payload: &str, #[case] expected: (&str, Option<&str>)) {
        assert_eq!(split_fields(payload), expected);
    }

    #[test]
    fn joined_fields_split_back() {
        let payload = join_fields("cli-1", "print('x')");
        assert_eq!(split_fields(&payload), ("cli-1", Some("print('x')")));
    }
}
