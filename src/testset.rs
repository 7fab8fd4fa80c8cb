use crate::core::{errors::JudgeError, protocol::split_on_line};

/// Splits a test-set file into `(input, answer)` pairs.
///
/// Without `tests_separator` the whole file is a single test. Inside a test
/// the `io_separator` line divides input from answer; a missing or blank
/// answer is stored as absent.
pub fn parse_test_file(
    text: &str,
    io_separator: &str,
    tests_separator: Option<&str>,
) -> Vec<(String, Option<String>)> {
    let chunks = match tests_separator {
        Some(separator) => split_on_line(separator, text, 0),
        None => vec![text.to_string()],
    };

    chunks
        .iter()
        .map(|chunk| {
            let mut fields = split_on_line(io_separator, chunk, 2).into_iter();
            let input = fields.next().unwrap_or_default();
            let answer = fields.next().filter(|answer| !answer.is_empty());
            (input, answer)
        })
        .filter(|(input, answer)| !input.is_empty() || answer.is_some())
        .collect()
}

/// Parses test numbers such as `1,2,4-6,10` into `[1, 2, 4, 5, 6, 10]`.
pub fn parse_selection(selection: &str) -> Result<Vec<u32>, JudgeError> {
    let invalid = |part: &str| {
        JudgeError::InvalidConfiguration(format!("invalid test number or range '{}'", part))
    };

    let mut numbers = Vec::new();
    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().map_err(|_| invalid(part))?;
                let end: u32 = end.trim().parse().map_err(|_| invalid(part))?;
                if start > end {
                    return Err(invalid(part));
                }
                numbers.extend(start..=end);
            }
            None => numbers.push(part.parse().map_err(|_| invalid(part))?),
        }
    }
    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_test_file() {
        let tests = parse_test_file("3\n1 2 3\n===\n6\n", "===", None);
        assert_eq!(tests, vec![("3\n1 2 3".to_string(), Some("6".to_string()))]);
    }

    #[test]
    fn test_multiple_tests_with_missing_answer() {
        let text = "1\n--\n1\n##\n2\n--\n4\n##\n3\n##\n";
        let tests = parse_test_file(text, "--", Some("##"));
        assert_eq!(
            tests,
            vec![
                ("1".to_string(), Some("1".to_string())),
                ("2".to_string(), Some("4".to_string())),
                ("3".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_empty_file_has_no_tests() {
        assert!(parse_test_file("\n\n", "--", Some("##")).is_empty());
    }

    #[test]
    fn test_selection_with_ranges() {
        assert_eq!(
            parse_selection("1,2, 4-6,10").unwrap(),
            vec![1, 2, 4, 5, 6, 10]
        );
        assert_eq!(parse_selection("7").unwrap(), vec![7]);
    }

    #[test]
    fn test_selection_rejects_garbage() {
        assert!(matches!(
            parse_selection("1,x"),
            Err(JudgeError::InvalidConfiguration(_))
        ));
        assert!(parse_selection("5-2").is_err());
    }
}
