//! Tabular Decoder: raw upload bytes in, structured table out.
//!
//! Uploaded files are untrusted and of unknown provenance, so every step
//! here degrades instead of aborting:
//! - the character encoding is picked by an ordered list of detection
//!   strategies, and decoding substitutes U+FFFD for undecodable byte
//!   sequences instead of failing on them;
//! - the field delimiter is sniffed from a bounded prefix of the decoded
//!   text, falling back to comma;
//! - rows with a structurally invalid field count are dropped and
//!   counted, never fatal; if the csv reader cannot even produce a
//!   header, a permissive line-by-line parse is tried before giving up.
//!
//! Values are kept as raw strings. Typing is the store's job at load
//! time, so the schema the model sees always matches what was actually
//! materialized.

use crate::error::DecodeError;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::{debug, warn};
use std::collections::HashMap;

/// Delimiters the sniffer considers, in tie-break order.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// A decoded tabular file. Invariant: every row has exactly
/// `columns.len()` values.
#[derive(Debug, Clone)]
pub struct DecodedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Name of the encoding the bytes were decoded with.
    pub encoding: &'static str,
    pub delimiter: u8,
}

/// One encoding-detection strategy: a guess, or a pass to the next one.
type EncodingStrategy = fn(&[u8]) -> Option<&'static Encoding>;

fn sniff_bom(bytes: &[u8]) -> Option<&'static Encoding> {
    Encoding::for_bom(bytes).map(|(encoding, _len)| encoding)
}

fn strict_utf8(bytes: &[u8]) -> Option<&'static Encoding> {
    std::str::from_utf8(bytes).ok().map(|_| UTF_8)
}

fn statistical_guess(bytes: &[u8]) -> Option<&'static Encoding> {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    Some(detector.guess(None, true))
}

/// Runs the detection strategies in order and returns the first guess.
///
/// WINDOWS-1252 is the terminal fallback: it maps every byte, so the
/// lossy decode that follows can never fail outright.
fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    const STRATEGIES: [EncodingStrategy; 3] = [sniff_bom, strict_utf8, statistical_guess];
    for strategy in STRATEGIES {
        if let Some(encoding) = strategy(bytes) {
            return encoding;
        }
    }
    WINDOWS_1252
}

/// Picks the delimiter by counting candidates in the first line of a
/// bounded prefix of the decoded text. Comma wins when nothing scores.
fn detect_delimiter(text: &str, window: usize) -> u8 {
    let prefix = &text.as_bytes()[..text.len().min(window)];
    let first_line = match prefix.iter().position(|&b| b == b'\n') {
        Some(pos) => &prefix[..pos],
        None => prefix,
    };

    DELIMITER_CANDIDATES
        .iter()
        .map(|&candidate| {
            let count = first_line.iter().filter(|&&b| b == candidate).count();
            (candidate, count)
        })
        .filter(|&(_, count)| count > 0)
        .max_by_key(|&(_, count)| count)
        .map(|(candidate, _)| candidate)
        .unwrap_or(b',')
}

/// Trims header cells, names blank ones positionally and suffixes
/// duplicates so the store can materialize every column.
fn normalize_headers<'a>(cells: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::new();

    for (index, cell) in cells.enumerate() {
        let mut name = cell.trim().to_string();
        if name.is_empty() {
            name = format!("column_{}", index + 1);
        }
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            name = format!("{}_{}", name, *count);
        }
        columns.push(name);
    }

    columns
}

/// Strict parse with the `csv` reader. Records whose field count does
/// not match the header are reported as per-record errors by the reader
/// and dropped here; the reader itself keeps going.
///
/// The `csv` crate imposes no field-size limit, so arbitrarily long
/// free-text cells pass through untouched.
fn parse_with_reader(
    text: &str,
    delimiter: u8,
) -> Result<(Vec<String>, Vec<Vec<String>>, usize), csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(false)
        .from_reader(text.as_bytes());

    let columns = normalize_headers(reader.headers()?.iter());
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for record in reader.records() {
        match record {
            Ok(record) if record.len() == columns.len() => {
                rows.push(record.iter().map(|value| value.to_string()).collect());
            }
            _ => dropped += 1,
        }
    }

    Ok((columns, rows, dropped))
}

/// Permissive retry: split on raw lines and the detected delimiter, no
/// quoting rules. Rows with the wrong arity are dropped.
fn parse_line_by_line(text: &str, delimiter: u8) -> Option<(Vec<String>, Vec<Vec<String>>, usize)> {
    let delimiter = delimiter as char;
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header = lines.next()?;
    let columns = normalize_headers(header.split(delimiter).map(unquote));
    if columns.is_empty() {
        return None;
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for line in lines {
        let values: Vec<String> = line
            .split(delimiter)
            .map(|value| unquote(value).to_string())
            .collect();
        if values.len() == columns.len() {
            rows.push(values);
        } else {
            dropped += 1;
        }
    }

    Some((columns, rows, dropped))
}

fn unquote(cell: &str) -> &str {
    let cell = cell.trim();
    cell.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(cell)
}

/// Decodes one uploaded file into a [`DecodedTable`].
///
/// `sniff_window` bounds how much decoded text the delimiter sniffer
/// inspects (see [`crate::config::AppConfig::sniff_window`]).
pub fn decode_table(
    file: &str,
    bytes: &[u8],
    sniff_window: usize,
) -> Result<DecodedTable, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::new(file, "file is empty"));
    }

    let encoding = detect_encoding(bytes);
    let (text, used_encoding, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(
            "{}: undecodable byte sequences replaced while decoding as {}",
            file,
            used_encoding.name()
        );
    }

    let delimiter = detect_delimiter(&text, sniff_window);
    debug!(
        "{}: detected encoding {}, delimiter {:?}",
        file,
        used_encoding.name(),
        delimiter as char
    );

    let parsed = match parse_with_reader(&text, delimiter) {
        Ok((columns, rows, dropped)) if !columns.is_empty() => Some((columns, rows, dropped)),
        _ => parse_line_by_line(&text, delimiter),
    };

    let (columns, rows, dropped) = parsed
        .ok_or_else(|| DecodeError::new(file, "no parsable header or rows"))?;

    if dropped > 0 {
        warn!("{}: dropped {} malformed row(s)", file, dropped);
    }

    Ok(DecodedTable {
        columns,
        rows,
        encoding: used_encoding.name(),
        delimiter,
    })
}
