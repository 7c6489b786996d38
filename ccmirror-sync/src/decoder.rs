//! Request file decoding.
//!
//! A request file holds one change request per record, in this column order:
//!
//! ```text
//! action;internal id;secondary mirror id;secondary mirror region;last update by;last update date;status
//! ```
//!
//! Any invalid record rejects the whole file.

use std::path::Path;

use ccmirror_core::{Action, ChangeRequest, CsvConfig};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::DecodeError;

const COLUMNS: usize = 7;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Turns a request file into its ordered change requests.
pub trait RequestDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<ChangeRequest>, DecodeError>;
}

/// Delimited-text decoder backed by the `csv` crate.
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    delimiter: u8,
    has_header: bool,
}

impl CsvDecoder {
    pub fn from_config(config: &CsvConfig) -> Result<Self, DecodeError> {
        let delimiter = u8::try_from(config.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                DecodeError::Config(format!(
                    "delimiter '{}' must be a single ASCII character",
                    config.delimiter
                ))
            })?;
        Ok(Self {
            delimiter,
            has_header: config.has_header,
        })
    }

    fn decode_reader<R: std::io::Read>(
        &self,
        path: &Path,
        reader: R,
    ) -> Result<Vec<ChangeRequest>, DecodeError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut requests = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| DecodeError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let request = parse_record(&record).map_err(|message| DecodeError::Record {
                path: path.to_path_buf(),
                line,
                message,
            })?;
            requests.push(request);
        }
        Ok(requests)
    }
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self {
            delimiter: b';',
            has_header: true,
        }
    }
}

impl RequestDecoder for CsvDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<ChangeRequest>, DecodeError> {
        let file = std::fs::File::open(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode_reader(path, file)
    }
}

fn parse_record(record: &csv::StringRecord) -> Result<ChangeRequest, String> {
    if record.len() != COLUMNS {
        return Err(format!(
            "expected {COLUMNS} fields, found {}",
            record.len()
        ));
    }
    let field = |index: usize, name: &str| -> Result<String, String> {
        match record.get(index) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(format!("missing {name}")),
        }
    };

    Ok(ChangeRequest {
        action: field(0, "action")?.parse::<Action>()?,
        internal_cost_center_id: field(1, "internal cost center id")?,
        secondary_mirror_id: field(2, "secondary mirror id")?,
        secondary_mirror_region: field(3, "secondary mirror region")?,
        last_update_by: field(4, "last update by")?,
        last_update_at: parse_timestamp(&field(5, "last update date")?)?,
        status: field(6, "status")?,
    })
}

/// Parse a timestamp in any of the accepted formats; naive values are UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(naive.and_utc());
            }
        }
    }
    Err(format!("unrecognised date '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    const HEADER: &str = "action;internal_id;mirror_id;mirror_re;last_update_by;last_update;status\n";

    fn decode(body: &str) -> Result<Vec<ChangeRequest>, DecodeError> {
        CsvDecoder::default().decode_reader(Path::new("req.csv"), body.as_bytes())
    }

    #[test]
    fn decodes_lines_in_order() {
        let body = format!(
            "{HEADER}CREATION;A1;G1;R1;jdoe;2024-03-01 08:30:00;Active\nUPDATE; A2 ;G2;R2;jdoe;01/03/2024;Closed\n"
        );
        let requests = decode(&body).expect("decode");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].action, Action::Create);
        assert_eq!(requests[0].status, "Active");
        assert_eq!(requests[1].action, Action::Update);
        assert_eq!(requests[1].internal_cost_center_id, "A2", "fields are trimmed");
        assert_eq!(
            requests[1].last_update_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn header_only_file_yields_no_lines() {
        assert!(decode(HEADER).expect("decode").is_empty());
    }

    #[rstest]
    #[case("DELETE;A1;G1;R1;jdoe;2024-03-01;x\n", "unknown action")]
    #[case("CREATION;A1;G1;R1;jdoe;yesterday;x\n", "unrecognised date")]
    #[case("CREATION;A1;G1;R1;jdoe;2024-03-01\n", "expected 7 fields")]
    #[case("CREATION;;G1;R1;jdoe;2024-03-01;x\n", "missing internal cost center id")]
    fn invalid_record_rejects_file(#[case] record: &str, #[case] expected: &str) {
        let body = format!("{HEADER}CREATION;A0;G0;R0;jdoe;2024-03-01;ok\n{record}");
        let err = decode(&body).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(expected), "got: {message}");
        assert!(message.contains("line 3"), "got: {message}");
    }

    #[test]
    fn headerless_comma_files_are_supported() {
        let decoder = CsvDecoder::from_config(&CsvConfig {
            delimiter: ',',
            has_header: false,
        })
        .expect("decoder");
        let requests = decoder
            .decode_reader(Path::new("req.csv"), "U,A1,G1,R1,jdoe,2024-03-01T10:00:00Z,on\n".as_bytes())
            .expect("decode");
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let err = CsvDecoder::from_config(&CsvConfig {
            delimiter: '§',
            has_header: true,
        })
        .unwrap_err();
        assert!(matches!(err, DecodeError::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CsvDecoder::default()
            .decode(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Io { .. }));
    }
}
