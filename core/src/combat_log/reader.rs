use crate::combat_log::{CombatEvent, ParseError, ReaderError, RecordParser};
use encoding_rs::WINDOWS_1252;
use memchr::memchr_iter;
use memmap2::Mmap;
use rayon::prelude::*;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of reading a whole record file.
#[derive(Debug, Default)]
pub struct ReadResult {
    pub events: Vec<CombatEvent>,
    /// Lines that failed to decode, in file order
    pub errors: Vec<ParseError>,
    pub bytes_read: u64,
}

pub struct Reader {
    path: PathBuf,
    parser: RecordParser,
}

impl Reader {
    pub fn from(file_path: PathBuf) -> Self {
        Reader {
            path: file_path,
            parser: RecordParser::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_record_file(&self) -> Result<ReadResult, ReaderError> {
        let file = fs::File::open(&self.path).map_err(|source| ReaderError::OpenFile {
            path: self.path.clone(),
            source,
        })?;
        // SAFETY: the file is opened read-only and only read for the lifetime of the map
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ReaderError::MemoryMap {
            path: self.path.clone(),
            source,
        })?;
        let bytes = mmap.as_ref();

        // Find all line boundaries, keeping 1-based file line numbers
        let mut line_ranges: Vec<(u64, usize, usize)> = Vec::new();
        let mut start = 0;
        let mut line_number = 0u64;
        for end in memchr_iter(b'\n', bytes) {
            line_number += 1;
            if end > start {
                line_ranges.push((line_number, start, end));
            }
            start = end + 1;
        }
        if start < bytes.len() {
            line_ranges.push((line_number + 1, start, bytes.len()));
        }

        let parsed: Vec<Result<Option<CombatEvent>, ParseError>> = line_ranges
            .par_iter()
            .map(|&(line_number, start, end)| {
                let line = decode_line(&bytes[start..end]);
                self.parser.parse_line(line_number, &line)
            })
            .collect();

        let mut result = ReadResult {
            bytes_read: bytes.len() as u64,
            ..Default::default()
        };
        for item in parsed {
            match item {
                Ok(Some(event)) => result.events.push(event),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping undecodable record");
                    result.errors.push(e);
                }
            }
        }

        Ok(result)
    }
}

fn decode_line(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s.trim_start_matches('\u{feff}')),
        Err(_) => {
            let (line, _, _) = WINDOWS_1252.decode(bytes);
            line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::LogAction;
    use crate::context::resolve;
    use std::io::Write;

    #[test]
    fn reads_records_and_collects_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# sample").unwrap();
        writeln!(file, "1\tD\tAlice\tOrc\t100\t0\tdd\tFireball\t-").unwrap();
        writeln!(file, "garbage").unwrap();
        write!(file, "2\tT\tAlice\tOrc\t1").unwrap();
        file.flush().unwrap();

        let result = Reader::from(file.path().to_path_buf())
            .read_record_file()
            .unwrap();

        assert_eq!(result.events.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.events[0].line_number, 2);
        assert!(matches!(result.events[1].action, LogAction::Taunt(_)));
    }

    #[test]
    fn decodes_windows_1252_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"1\tD\tZo\xeb\tOrc\t5\t0\tdd\tZap\t-\r\n").unwrap();
        file.flush().unwrap();

        let result = Reader::from(file.path().to_path_buf())
            .read_record_file()
            .unwrap();
        let LogAction::Damage(record) = &result.events[0].action else {
            panic!("expected damage");
        };
        assert_eq!(resolve(record.attacker), "Zoë");
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = Reader::from(PathBuf::from("/nonexistent/records.tsv"))
            .read_record_file()
            .unwrap_err();
        assert!(matches!(err, ReaderError::OpenFile { .. }));
    }
}
