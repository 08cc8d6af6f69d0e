use crate::models::RawRecord;
use std::str::Lines;

/// Single-pass reader over delimited text. The first line names the fields;
/// each later line, blank ones included, is zipped against them by position.
/// There is no quoting: a delimiter always splits.
pub struct RecordParser<'a> {
    headers: Vec<String>,
    delimiter: char,
    lines: Lines<'a>,
}

impl<'a> RecordParser<'a> {
    pub fn new(text: &'a str, delimiter: char) -> Self {
        let mut lines = text.lines();
        let headers = lines
            .next()
            .map(|header| header.split(delimiter).map(str::to_string).collect())
            .unwrap_or_default();

        Self {
            headers,
            delimiter,
            lines,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn to_raw(&self, line: &str) -> RawRecord {
        let mut values = line.split(self.delimiter);
        let fields = self
            .headers
            .iter()
            .map(|name| (name.clone(), values.next().unwrap_or("").to_string()))
            .collect();
        RawRecord { fields }
    }
}

impl Iterator for RecordParser<'_> {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        let line = self.lines.next()?;
        Some(self.to_raw(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zips_fields_against_header() {
        let text = "member_number,division,hit_factor\nA1,OPEN,7.5\nA2,PCC,6.25\n";
        let parser = RecordParser::new(text, ',');
        assert_eq!(parser.headers(), ["member_number", "division", "hit_factor"]);

        let rows: Vec<RawRecord> = parser.collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("member_number"), "A1");
        assert_eq!(rows[1].get("hit_factor"), "6.25");
    }

    #[test]
    fn test_short_rows_read_missing_fields_as_empty() {
        let text = "a,b,c\n1\n";
        let rows: Vec<RawRecord> = RecordParser::new(text, ',').collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields.len(), 3);
        assert_eq!(rows[0].get("a"), "1");
        assert_eq!(rows[0].get("c"), "");
    }

    #[test]
    fn test_blank_lines_are_rows() {
        let text = "a,b\n1,2\n\n3,4\n";
        let rows: Vec<RawRecord> = RecordParser::new(text, ',').collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].get("a"), "");
        assert_eq!(rows[1].get("b"), "");
        assert_eq!(rows[2].get("a"), "3");
    }

    #[test]
    fn test_lone_carriage_return_does_not_split_a_line() {
        let text = "a,b\r\n1\r2,3\r\n";
        let rows: Vec<RawRecord> = RecordParser::new(text, ',').collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), "1\r2");
        assert_eq!(rows[0].get("b"), "3");
    }

    #[test]
    fn test_quotes_are_plain_text() {
        let text = "code,hf\n\"09-08\",5\n";
        let rows: Vec<RawRecord> = RecordParser::new(text, ',').collect();
        assert_eq!(rows[0].get("code"), "\"09-08\"");
    }

    #[test]
    fn test_extra_fields_are_ignored_and_crlf_is_accepted() {
        let text = "a,b\r\n1,2,3\r\n";
        let rows: Vec<RawRecord> = RecordParser::new(text, ',').collect();
        assert_eq!(rows[0].fields, vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_custom_delimiter() {
        let text = "a;b\nx;y\n";
        let rows: Vec<RawRecord> = RecordParser::new(text, ';').collect();
        assert_eq!(rows[0].get("b"), "y");
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let parser = RecordParser::new("", ',');
        assert!(parser.headers().is_empty());
        assert_eq!(parser.count(), 0);
    }
}
