//! Header and row sampling for delimited files

use csv::ReaderBuilder;
use std::collections::HashSet;
use std::io::Read;

use crate::config::SamplingConfig;
use crate::error::SampleError;

const UTF8_BOM: char = '\u{feff}';

/// A sampled data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledRow {
    /// 1-based line number in the file (the header is line 1)
    pub line: u64,
    /// One value per header column; short rows are padded with ""
    pub values: Vec<String>,
    /// Fields beyond the header width
    pub extra: Vec<String>,
}

/// Header plus a bounded sample of rows from one file
#[derive(Debug, Clone, Default)]
pub struct Sample {
    pub headers: Vec<String>,
    pub rows: Vec<SampledRow>,
    /// Data rows read, sampled or not
    pub rows_read: u64,
}

impl Sample {
    /// Sampled values as borrowed rows, the shape the inference helper takes.
    pub fn value_rows(&self) -> Vec<Vec<&str>> {
        self.rows
            .iter()
            .map(|row| row.values.iter().map(String::as_str).collect())
            .collect()
    }

    /// Number of sampled rows that had overflow fields
    pub fn rows_with_extra(&self) -> usize {
        self.rows.iter().filter(|row| !row.extra.is_empty()).count()
    }
}

/// Read the header and every `sample_rate`-th row, up to `max_records` rows.
pub fn sample_file<R: Read>(
    reader: R,
    delimiter: u8,
    config: &SamplingConfig,
) -> Result<Sample, SampleError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = read_headers(&mut csv_reader)?;
    let width = headers.len();
    let sample_rate = config.sample_rate.max(1) as u64;

    let mut sample = Sample {
        headers,
        ..Sample::default()
    };

    for result in csv_reader.records() {
        if sample.rows.len() >= config.max_records {
            break;
        }

        let record = result.map_err(|source| SampleError::Csv {
            line: source.position().map(|p| p.line()),
            source,
        })?;

        let index = sample.rows_read;
        sample.rows_read += 1;
        if index % sample_rate != 0 {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or(index + 2);
        let mut values: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        values.resize(width, String::new());
        let extra = record.iter().skip(width).map(str::to_string).collect();

        sample.rows.push(SampledRow {
            line,
            values,
            extra,
        });
    }

    tracing::debug!(
        columns = sample.headers.len(),
        rows_read = sample.rows_read,
        rows_sampled = sample.rows.len(),
        "sampled file"
    );

    Ok(sample)
}

fn read_headers<R: Read>(csv_reader: &mut csv::Reader<R>) -> Result<Vec<String>, SampleError> {
    let record = csv_reader.headers().map_err(|source| SampleError::Csv {
        line: Some(1),
        source,
    })?;

    let headers: Vec<String> = record
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = if idx == 0 {
                name.trim_start_matches(UTF8_BOM)
            } else {
                name
            };
            name.trim().to_string()
        })
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(SampleError::MissingHeader);
    }
    if let Some(idx) = headers.iter().position(|h| h.is_empty()) {
        return Err(SampleError::EmptyColumnName(idx + 1));
    }

    let mut seen = HashSet::new();
    for name in &headers {
        if !seen.insert(name.as_str()) {
            return Err(SampleError::DuplicateColumn(name.clone()));
        }
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_row() -> SamplingConfig {
        SamplingConfig {
            sample_rate: 1,
            max_records: 1000,
        }
    }

    #[test]
    fn test_sample_basic() {
        let data = "Col1,Col2\na,b\nc,d\n";
        let sample = sample_file(data.as_bytes(), b',', &every_row()).unwrap();

        assert_eq!(sample.headers, vec!["Col1", "Col2"]);
        assert_eq!(sample.rows.len(), 2);
        assert_eq!(sample.rows[0].values, vec!["a", "b"]);
        assert_eq!(sample.rows[0].line, 2);
        assert_eq!(sample.rows[1].line, 3);
        assert_eq!(sample.value_rows()[1], vec!["c", "d"]);
    }

    #[test]
    fn test_custom_delimiter() {
        let data = "id;name\n1;x\n";
        let sample = sample_file(data.as_bytes(), b';', &every_row()).unwrap();
        assert_eq!(sample.headers, vec!["id", "name"]);
        assert_eq!(sample.rows[0].values, vec!["1", "x"]);
    }

    #[test]
    fn test_overflow_and_short_rows() {
        let data = "a,b\n1,2,3,4\n5\n";
        let sample = sample_file(data.as_bytes(), b',', &every_row()).unwrap();

        assert_eq!(sample.rows[0].values, vec!["1", "2"]);
        assert_eq!(sample.rows[0].extra, vec!["3", "4"]);
        assert_eq!(sample.rows[1].values, vec!["5", ""]);
        assert!(sample.rows[1].extra.is_empty());
        assert_eq!(sample.rows_with_extra(), 1);
    }

    #[test]
    fn test_stride_and_limit() {
        let mut data = String::from("n\n");
        for i in 0..20 {
            data.push_str(&format!("{}\n", i));
        }
        let config = SamplingConfig {
            sample_rate: 5,
            max_records: 3,
        };
        let sample = sample_file(data.as_bytes(), b',', &config).unwrap();

        let sampled: Vec<&str> = sample.rows.iter().map(|r| r.values[0].as_str()).collect();
        assert_eq!(sampled, vec!["0", "5", "10"]);
        assert_eq!(sample.rows[1].line, 7);
    }

    #[test]
    fn test_headers_trimmed_and_bom_stripped() {
        let data = "\u{feff} id , name \n1,x\n";
        let sample = sample_file(data.as_bytes(), b',', &every_row()).unwrap();
        assert_eq!(sample.headers, vec!["id", "name"]);
    }

    #[test]
    fn test_empty_file_has_no_header() {
        let err = sample_file("".as_bytes(), b',', &every_row()).unwrap_err();
        assert!(matches!(err, SampleError::MissingHeader));
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = sample_file("a,b,a\n1,2,3\n".as_bytes(), b',', &every_row()).unwrap_err();
        assert!(matches!(err, SampleError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn test_unnamed_header_column_rejected() {
        let err = sample_file("a,,b\n1,2,3\n".as_bytes(), b',', &every_row()).unwrap_err();
        assert!(matches!(err, SampleError::EmptyColumnName(2)), "got {}", err);

        let err = sample_file("a, ,b\n".as_bytes(), b',', &every_row()).unwrap_err();
        assert!(matches!(err, SampleError::EmptyColumnName(2)), "got {}", err);
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let mut data = b"a,b\n1,2\n".to_vec();
        data.extend_from_slice(&[0xff, 0xfe, b',', b'x', b'\n']);
        let err = sample_file(data.as_slice(), b',', &every_row()).unwrap_err();
        assert!(matches!(err, SampleError::Csv { .. }), "got {}", err);
    }

    #[test]
    fn test_header_only_file() {
        let sample = sample_file("a,b\n".as_bytes(), b',', &every_row()).unwrap();
        assert_eq!(sample.headers, vec!["a", "b"]);
        assert!(sample.rows.is_empty());
        assert_eq!(sample.rows_read, 0);
    }
}
