//! Splitting fetched group text into words.

/// Split newline-separated group text into words.
///
/// Carriage returns and surrounding whitespace are stripped and empty
/// entries (including the trailing one) are dropped.
pub fn split_group_text(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_group_text() {
        assert_eq!(split_group_text("apple\nbanana\n"), vec!["apple", "banana"]);
        assert_eq!(split_group_text("Apfel\r\n\r\nBirne\r\n"), vec!["Apfel", "Birne"]);
        assert!(split_group_text("\n\n").is_empty());
        assert!(split_group_text("").is_empty());
    }
}
