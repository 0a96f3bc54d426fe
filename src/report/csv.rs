use std::mem;

/// Splits RFC 4180 text into records.
///
/// Quoted fields may hold commas, doubled quotes and line breaks. Both `\n`
/// and `\r\n` end a record; blank lines produce nothing. A leading byte-order
/// mark is ignored.
#[must_use]
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => record.push(mem::take(&mut field)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                record.push(mem::take(&mut field));
                push_record(&mut records, mem::take(&mut record));
            }
            _ => field.push(ch),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }
    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.len() == 1 && record[0].trim().is_empty();
    if !blank {
        records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_commas_and_quotes() {
        assert_eq!(
            parse_records(r#"a,"b,c","d""e""#),
            vec![vec!["a".to_owned(), "b,c".to_owned(), "d\"e".to_owned()]]
        );
    }

    #[test]
    fn crlf_blank_lines_and_embedded_newlines() {
        let text = "\u{feff}h1,h2\r\n\r\n\"multi\nline\",2\r\nx,\n";
        let records = parse_records(text);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], vec!["h1", "h2"]);
        assert_eq!(records[1], vec!["multi\nline", "2"]);
        assert_eq!(records[2], vec!["x", ""]);
    }

    #[test]
    fn empty_input() {
        assert!(parse_records("").is_empty());
        assert!(parse_records("\n\n").is_empty());
    }
}
