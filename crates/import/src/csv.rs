use chrono::NaiveDate;
use kontera_core::{Clock, CostRecord};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// Row-failure diagnostics are capped to keep the list bounded on large
/// uploads; rows past the cap are still skipped and counted.
const MAX_ROW_DIAGNOSTICS: usize = 4;

// Accepted header spellings per logical column, lowercased. The mangled
// variants (Bokfringsdatum, Benmning) appear when the export's non-ASCII
// headers were stripped by an upstream encoding step.
const VERNR: &[&str] = &["vernr"];
const POSTING_DATE: &[&str] = &["bokföringsdatum", "bokfringsdatum", "bokforingsdatum"];
const REGISTRATION_DATE: &[&str] = &["registreringsdatum"];
const ACCOUNT_NUMBER: &[&str] = &["konto"];
const ACCOUNT_NAME: &[&str] = &["benämning", "benmning", "benamning"];
const KS: &[&str] = &["ks"];
const PROJECT_NUMBER: &[&str] = &["projnr"];
const VERIFICATION_TEXT: &[&str] = &["verifikationstext"];
const TRANSACTION_INFO: &[&str] = &["transaktionsinfo"];
const DEBIT: &[&str] = &["debet"];
const CREDIT: &[&str] = &["kredit"];

/// Output of one parse: accepted records in input order, plus the
/// diagnostic trail (header detection and capped row failures).
#[derive(Debug, Clone)]
pub struct ParsedBatch {
    pub records: Vec<CostRecord>,
    pub diagnostics: Vec<String>,
}

/// Parse a decoded ledger export into cost records.
///
/// Never fails as a whole: the delimiter is sniffed with a comma fallback,
/// every row is parsed independently, and a bad row becomes a diagnostic
/// rather than an error. A row without a voucher number is dropped.
pub fn parse_ledger_csv(content: &str, clock: &dyn Clock) -> ParsedBatch {
    let mut records = Vec::new();
    let mut diagnostics = Vec::new();

    let delimiter = sniff_delimiter(leading_sample(content)).unwrap_or(b',');
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map(|h| h.clone());
    let header_index = match headers {
        Ok(headers) if !headers.is_empty() => {
            let names: Vec<&str> = headers.iter().collect();
            diagnostics.push(format!("Headers detected: {names:?}"));
            let mut index = HashMap::new();
            for (position, name) in headers.iter().enumerate() {
                index.entry(name.trim().to_lowercase()).or_insert(position);
            }
            index
        }
        _ => {
            diagnostics.push("No headers detected".to_string());
            HashMap::new()
        }
    };

    let mut row_failures = 0usize;
    for (i, result) in reader.records().enumerate() {
        let row_number = i + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                note_row_failure(
                    &mut diagnostics,
                    &mut row_failures,
                    format!("Row {row_number} parse error: {e}"),
                );
                continue;
            }
        };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let vernr = field(&record, &header_index, VERNR).trim();
        if vernr.is_empty() {
            note_row_failure(
                &mut diagnostics,
                &mut row_failures,
                format!("Row {row_number}: Vernr column not found or empty"),
            );
            continue;
        }

        let account_raw = field(&record, &header_index, ACCOUNT_NUMBER).trim();
        let account_number =
            if !account_raw.is_empty() && account_raw.bytes().all(|b| b.is_ascii_digit()) {
                account_raw.parse().unwrap_or(0)
            } else {
                0
            };

        records.push(CostRecord {
            id: None,
            vernr: vernr.to_string(),
            account_number,
            posting_date: parse_date(field(&record, &header_index, POSTING_DATE), clock),
            registration_date: parse_date(field(&record, &header_index, REGISTRATION_DATE), clock),
            account_name: field(&record, &header_index, ACCOUNT_NAME).trim().to_string(),
            ks: optional(field(&record, &header_index, KS)),
            project_number: optional(field(&record, &header_index, PROJECT_NUMBER)),
            verification_text: optional(field(&record, &header_index, VERIFICATION_TEXT)),
            transaction_info: optional(field(&record, &header_index, TRANSACTION_INFO)),
            debit: parse_amount(field(&record, &header_index, DEBIT)),
            credit: parse_amount(field(&record, &header_index, CREDIT)),
        });
    }

    ParsedBatch { records, diagnostics }
}

/// Parse a ledger amount. Tolerates quotes, spaces and non-breaking
/// spaces as grouping, and both `1234.56` and `1.234,56` conventions: when
/// a comma is present it is the decimal point and dots are separators.
/// Unparseable input yields zero.
pub fn parse_amount(raw: &str) -> Decimal {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | ' ' | '\u{a0}'))
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };
    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}

/// Parse a `YYYY-MM-DD` date. Empty or unparseable input falls back to
/// the clock's current date, matching the historical import behavior.
pub fn parse_date(raw: &str, clock: &dyn Clock) -> NaiveDate {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return clock.today();
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").unwrap_or_else(|_| clock.today())
}

fn leading_sample(content: &str) -> &str {
    content.get(..1024).unwrap_or(content)
}

/// Pick the dominant candidate delimiter in the sample's first line.
fn sniff_delimiter(sample: &str) -> Option<u8> {
    let first_line = sample.lines().next()?;
    [b';', b',', b'\t', b'|']
        .into_iter()
        .map(|d| (d, first_line.bytes().filter(|&b| b == d).count()))
        .filter(|&(_, count)| count > 0)
        .max_by_key(|&(_, count)| count)
        .map(|(d, _)| d)
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: &HashMap<String, usize>,
    aliases: &[&str],
) -> &'r str {
    aliases
        .iter()
        .find_map(|alias| index.get(*alias).and_then(|&i| record.get(i)))
        .unwrap_or("")
}

fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn note_row_failure(diagnostics: &mut Vec<String>, failures: &mut usize, message: String) {
    *failures += 1;
    if *failures <= MAX_ROW_DIAGNOSTICS {
        diagnostics.push(message);
    }
}
