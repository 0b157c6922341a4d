//! CSV status ledger: the resume source of truth

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use csv::{ByteRecord, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use tracing::{info, warn};

use crate::outreach::contact::{Category, Contact, ContactKey, Status};
use crate::outreach::error::LedgerError;

pub const COMPANY_COLUMN: &str = "Company Name";
pub const POC_COLUMN: &str = "POC Name";
pub const EMAIL_COLUMN: &str = "Email Address";
pub const CATEGORY_COLUMN: &str = "Category";
pub const STATUS_COLUMN: &str = "Status";
pub const TIMESTAMP_COLUMN: &str = "Sent Timestamp";

/// Format of the `Sent Timestamp` column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy)]
struct Columns {
    company: usize,
    poc: usize,
    email: usize,
    category: Option<usize>,
    status: Option<usize>,
    timestamp: Option<usize>,
}

impl Columns {
    fn locate(headers: &[&str]) -> Result<Self, LedgerError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require =
            |name: &'static str| find(name).ok_or(LedgerError::MissingColumn(name));

        Ok(Self {
            company: require(COMPANY_COLUMN)?,
            poc: require(POC_COLUMN)?,
            email: require(EMAIL_COLUMN)?,
            category: find(CATEGORY_COLUMN),
            status: find(STATUS_COLUMN),
            timestamp: find(TIMESTAMP_COLUMN),
        })
    }
}

/// Reads and updates the contact ledger on disk
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every contact that still needs an email, in file order.
    ///
    /// Rows already marked `Sent`, rows with a blank organization, contact
    /// name or email, and rows whose email has no `@` are skipped with a
    /// warning. Later rows repeating an already loaded identity are skipped
    /// too.
    pub fn load(&self) -> Result<Vec<Contact>, LedgerError> {
        let data = self.read()?;
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(data.as_slice());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        let columns = Columns::locate(&headers.iter().map(String::as_str).collect::<Vec<_>>())?;

        let mut contacts = Vec::new();
        let mut seen = HashSet::new();

        for (row_num, result) in reader.records().enumerate() {
            let row_num = row_num + 1;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Row {row_num}: unreadable row ({e}), skipping");
                    continue;
                }
            };

            let Some(contact) = parse_row(row_num, &record, &columns) else {
                continue;
            };

            if !seen.insert(contact.key()) {
                warn!(
                    "Row {row_num}: duplicate of an earlier row for {} <{}>, skipping",
                    contact.organization, contact.email
                );
                continue;
            }

            contacts.push(contact);
        }

        info!("Loaded {} sponsors from {}", contacts.len(), self.path.display());
        Ok(contacts)
    }

    /// Mark the contact's row(s) as sent with the current local time
    pub fn mark_sent(&self, contact: &Contact) -> Result<usize, LedgerError> {
        self.mark_sent_at(contact, Local::now().naive_local())
    }

    /// Mark every pending row matching the contact's identity as sent at
    /// `sent_at`. Rows already `Sent` keep their original timestamp.
    ///
    /// The file is re-read, and only the matched rows are re-serialized.
    /// Every other byte of the file is written back untouched. Missing
    /// `Status` / `Sent Timestamp` columns are appended to the header.
    /// Returns the number of rows updated.
    pub fn mark_sent_at(
        &self,
        contact: &Contact,
        sent_at: NaiveDateTime,
    ) -> Result<usize, LedgerError> {
        let data = self.read()?;
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(data.as_slice());

        let headers = reader.byte_headers()?.clone();
        let names: Vec<String> = headers
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        let columns = Columns::locate(&names.iter().map(String::as_str).collect::<Vec<_>>())?;

        let mut header_fields: Vec<Vec<u8>> = headers.iter().map(<[u8]>::to_vec).collect();
        let status_idx = columns
            .status
            .unwrap_or_else(|| append_column(&mut header_fields, STATUS_COLUMN));
        let timestamp_idx = columns
            .timestamp
            .unwrap_or_else(|| append_column(&mut header_fields, TIMESTAMP_COLUMN));
        let header_changed = header_fields.len() != headers.len();

        let mut rows = Vec::new();
        let mut record = ByteRecord::new();
        while reader.read_byte_record(&mut record)? {
            let start = record_start(&record, data.len());
            rows.push((start, record.clone()));
        }

        let target = contact.key();
        let stamp = sent_at.format(TIMESTAMP_FORMAT).to_string();
        let width = header_fields.len();

        let mut output = Vec::with_capacity(data.len() + 64);
        let first_row = rows.first().map_or(data.len(), |(start, _)| *start);
        if header_changed {
            splice(&mut output, &data[..first_row], &ByteRecord::from(header_fields))?;
        } else {
            output.extend_from_slice(&data[..first_row]);
        }

        let mut updated = 0;
        for (i, (start, row)) in rows.iter().enumerate() {
            let end = rows.get(i + 1).map_or(data.len(), |(next, _)| *next);
            let span = &data[*start..end];

            let field = |idx: usize| String::from_utf8_lossy(row.get(idx).unwrap_or_default());
            let key = ContactKey::new(&field(columns.email), &field(columns.company));
            let already_sent = columns
                .status
                .is_some_and(|idx| Status::parse(&field(idx)) == Status::Sent);
            if key != target || already_sent {
                output.extend_from_slice(span);
                continue;
            }

            let mut fields: Vec<Vec<u8>> = row.iter().map(<[u8]>::to_vec).collect();
            if fields.len() < width {
                fields.resize(width, Vec::new());
            }
            fields[status_idx] = Status::SENT.as_bytes().to_vec();
            fields[timestamp_idx] = stamp.as_bytes().to_vec();
            splice(&mut output, span, &ByteRecord::from(fields))?;
            updated += 1;
        }

        if updated == 0 {
            warn!(
                "No ledger row matches {} <{}>, status not updated",
                contact.organization, contact.email
            );
            return Ok(0);
        }

        self.write_atomically(&output)?;
        info!("Updated ledger status for {}", contact.organization);
        Ok(updated)
    }

    fn read(&self) -> Result<Vec<u8>, LedgerError> {
        fs::read(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LedgerError::NotFound(self.path.clone()),
            _ => LedgerError::Io(e),
        })
    }

    fn write_atomically(&self, contents: &[u8]) -> Result<(), LedgerError> {
        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, contents)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Turn one CSV row into a pending contact, or `None` if it is skipped
fn parse_row(row_num: usize, record: &StringRecord, columns: &Columns) -> Option<Contact> {
    let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("").trim();

    let organization = field(Some(columns.company));
    let name = field(Some(columns.poc));
    let email = field(Some(columns.email)).to_lowercase();

    if Status::parse(field(columns.status)) == Status::Sent {
        info!("Skipping {organization} - already sent");
        return None;
    }

    if organization.is_empty() || name.is_empty() || email.is_empty() {
        warn!("Row {row_num}: Missing required fields, skipping");
        return None;
    }

    if !email.contains('@') {
        warn!("Row {row_num}: Invalid email format, skipping");
        return None;
    }

    let sent_at = Some(field(columns.timestamp))
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    Some(Contact {
        organization: organization.to_owned(),
        name: name.to_owned(),
        email,
        category: Category::normalize(field(columns.category)),
        status: Status::Pending,
        sent_at,
    })
}

fn append_column(fields: &mut Vec<Vec<u8>>, name: &str) -> usize {
    fields.push(name.as_bytes().to_vec());
    fields.len() - 1
}

fn record_start(record: &ByteRecord, fallback: usize) -> usize {
    record
        .position()
        .and_then(|p| usize::try_from(p.byte()).ok())
        .unwrap_or(fallback)
}

/// Replace the record inside `span` with `record`, keeping the line breaks
/// (and a leading byte order mark) that surround it.
fn splice(output: &mut Vec<u8>, span: &[u8], record: &ByteRecord) -> Result<(), LedgerError> {
    let is_break = |b: &u8| *b == b'\r' || *b == b'\n';
    let lead = span.iter().take_while(|b| is_break(b)).count();
    let mut lead_end = lead;
    if span[lead..].starts_with(UTF8_BOM) {
        lead_end += UTF8_BOM.len();
    }
    let trail = span[lead_end..].iter().rev().take_while(|b| is_break(b)).count();

    output.extend_from_slice(&span[..lead_end]);
    output.extend_from_slice(&serialize(record)?);
    output.extend_from_slice(&span[span.len() - trail..]);
    Ok(())
}

/// Serialize a single record without its terminator
fn serialize(record: &ByteRecord) -> Result<Vec<u8>, LedgerError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_byte_record(record)?;
    let mut bytes = writer.into_inner().map_err(|e| e.into_error())?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    Ok(bytes)
}
