//! Canonical payload construction.
//!
//! The budget estimate and the request body are both built from [`aggregate`];
//! any other way of joining inputs would let the estimate drift from what is sent.

/// A decoded file paired with the name it was attached under.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedFile {
    pub name: String,
    pub content: String,
}

impl DecodedFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Appends one file block (`\n\n--- Content from {name} ---\n{content}`).
pub fn push_file_block(payload: &mut String, name: &str, content: &str) {
    payload.push_str("\n\n--- Content from ");
    payload.push_str(name);
    payload.push_str(" ---\n");
    payload.push_str(content);
}

/// Joins the primary text and decoded files, in order, into one payload.
pub fn aggregate(primary: &str, files: &[DecodedFile]) -> String {
    aggregate_pairs(
        primary,
        files.iter().map(|f| (f.name.as_str(), f.content.as_str())),
    )
}

/// Same as [`aggregate`] over `(name, content)` pairs.
pub fn aggregate_pairs<'a, I>(primary: &str, files: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut payload = String::from(primary);
    for (name, content) in files {
        push_file_block(&mut payload, name, content);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{TokenCounter, WhitespaceTokenCounter};

    #[test]
    fn single_file_without_primary_text() {
        let payload = aggregate("", &[DecodedFile::new("a.txt", "data")]);
        assert_eq!(payload, "\n\n--- Content from a.txt ---\ndata");
    }

    #[test]
    fn primary_text_comes_first_then_files_in_order() {
        let payload = aggregate(
            "Summarise these",
            &[
                DecodedFile::new("one.txt", "first"),
                DecodedFile::new("two.txt", "second"),
            ],
        );
        assert_eq!(
            payload,
            "Summarise these\n\n--- Content from one.txt ---\nfirst\n\n--- Content from two.txt ---\nsecond"
        );
    }

    #[test]
    fn no_files_returns_primary_text_unchanged() {
        assert_eq!(aggregate("Hello", &[]), "Hello");
        assert_eq!(aggregate("", &[]), "");
    }

    #[test]
    fn failed_file_still_contributes_its_header() {
        let payload = aggregate("x", &[DecodedFile::new("broken.txt", "")]);
        assert_eq!(payload, "x\n\n--- Content from broken.txt ---\n");
    }

    #[test]
    fn repeated_calls_are_identical() {
        let files = vec![
            DecodedFile::new("a.txt", "alpha"),
            DecodedFile::new("b.txt", "beta"),
        ];
        assert_eq!(aggregate("t", &files), aggregate("t", &files));
        assert_eq!(
            aggregate("t", &files),
            aggregate_pairs("t", [("a.txt", "alpha"), ("b.txt", "beta")])
        );
    }

    #[test]
    fn estimate_never_shrinks_as_inputs_grow() {
        let counter = WhitespaceTokenCounter;
        let count = |p: &str| counter.count_tokens(p).unwrap();

        let mut files = Vec::new();
        let mut previous = count(&aggregate("base text", &files));
        for (i, content) in ["one two", "", "three four five"].iter().enumerate() {
            files.push(DecodedFile::new(format!("f{i}.txt"), *content));
            let next = count(&aggregate("base text", &files));
            assert!(next >= previous, "{next} < {previous}");
            previous = next;
        }

        let longer = count(&aggregate("base text plus more", &files));
        assert!(longer >= previous);
    }
}
