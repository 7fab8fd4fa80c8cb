//! Line-based record protocol shared by generators, validators and test-set files.
//!
//! A record is a sequence of text fields separated by a line that is exactly
//! the delimiter. Consumers trim every field.

use crate::core::errors::JudgeError;

/// Splits `text` on lines exactly equal to `delimiter`, trimming each
/// segment and padding with empty fields up to `min_fields`.
pub fn split_on_line(delimiter: &str, text: &str, min_fields: usize) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line == delimiter {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        fields.push(current.trim().to_string());
    }

    let min_fields = min_fields.max(1);
    if fields.len() < min_fields {
        fields.resize(min_fields, String::new());
    }
    fields
}

/// Joins named fields into one record. A field holding a line equal to the
/// delimiter would split differently on the other side, so it is rejected.
pub fn join_record(delimiter: &str, fields: &[(&'static str, &str)]) -> Result<String, JudgeError> {
    if let Some((name, _)) = fields
        .iter()
        .find(|(_, value)| value.lines().any(|line| line == delimiter))
    {
        return Err(JudgeError::DelimiterCollision { field: name });
    }

    let separator = format!("\n{}\n", delimiter);
    Ok(fields
        .iter()
        .map(|(_, value)| *value)
        .collect::<Vec<_>>()
        .join(&separator))
}
