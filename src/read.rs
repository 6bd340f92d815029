use crate::data::{
    AccountRow, Classified, Error, NativeAccount, Pubkey, TokenAccount, ROW_FIELDS,
    TOKEN_ACCOUNT_LEN,
};
use base64::{
    alphabet,
    engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use log::debug;
use std::io::{BufRead, BufReader, Cursor, Read};

/// Snapshot dumps don't always end their base64 cleanly, so don't be picky
/// about the last few bits. Missing padding is fixed up by `decode_payload`.
const LOOSE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Trait for doing something with an account read from a snapshot dump.
/// Used by the resolver to keep the latest state of each account, but also
/// by tests to check what the reader makes of a given input.
pub(crate) trait AccountUser {
    fn use_account(&mut self, pubkey: String, account: Classified);
}

/// A few counters for the end of run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadStats {
    pub rows: u64,
    pub accounts: u64,
    pub skipped: u64,
}

/// Dumps come tab separated most of the time, sometimes comma separated.
/// Pick whichever shows up the most on the first line, tabs winning ties.
pub(crate) fn sniff_delimiter(first_line: &[u8]) -> u8 {
    let tabs = first_line.iter().filter(|&&b| b == b'\t').count();
    let commas = first_line.iter().filter(|&&b| b == b',').count();
    if tabs >= commas && tabs > 0 {
        b'\t'
    } else if commas > 0 {
        b','
    } else {
        b'\t'
    }
}

/// Peek at the first line to guess the delimiter, then hand back a reader
/// that still starts with that line. Works on pipes, nothing gets seeked.
/// `None` if there's nothing at all to read.
pub(crate) fn sniff<R: Read>(reader: R) -> std::io::Result<Option<(u8, impl Read)>> {
    let mut reader = BufReader::new(reader);
    let mut first_line = Vec::new();
    if reader.read_until(b'\n', &mut first_line)? == 0 {
        return Ok(None);
    }
    let delimiter = sniff_delimiter(&first_line);
    Ok(Some((delimiter, Cursor::new(first_line).chain(reader))))
}

/// The same csv settings for every table we read.
pub(crate) fn csv_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(reader)
}

/// Base64 with or without its `=` padding.
pub(crate) fn decode_payload(data: &str) -> Result<Vec<u8>, Error> {
    let mut padded = data.trim().to_string();
    let missing = (4 - padded.len() % 4) % 4;
    padded.extend(std::iter::repeat('=').take(missing));
    Ok(LOOSE_BASE64.decode(padded)?)
}

/// Pull mint, owner and amount out of an SPL token account. Empty token
/// accounts come back as `None`, they don't count for anything.
pub(crate) fn decode_token_account(
    write_version: u64,
    data: &str,
) -> Result<Option<TokenAccount>, Error> {
    let data = decode_payload(data)?;
    if data.len() < TOKEN_ACCOUNT_LEN {
        return Err(Error::ShortPayload(data.len()));
    }
    let mut amount = [0u8; 8];
    amount.copy_from_slice(&data[64..72]);
    let amount = u64::from_le_bytes(amount);
    if amount == 0 {
        return Ok(None);
    }
    Ok(Some(TokenAccount {
        write_version,
        mint: Pubkey::from_slice(&data[0..32]),
        owner: Pubkey::from_slice(&data[32..64]),
        amount,
    }))
}

/// Token program owned accounts get their payload decoded, anything else is
/// a plain native balance.
pub(crate) fn classify(row: &AccountRow) -> Result<Option<Classified>, Error> {
    if row.is_token_account() {
        Ok(decode_token_account(row.write_version, &row.data)?.map(Classified::Token))
    } else {
        Ok(Some(Classified::Native(NativeAccount {
            write_version: row.write_version,
            lamports: row.lamports,
        })))
    }
}

/// `None` for a header line.
fn parse_row(mut record: csv::StringRecord) -> Result<Option<AccountRow>, Error> {
    match record.get(0) {
        None => return Ok(None),
        Some(first) if first.eq_ignore_ascii_case("pubkey") => return Ok(None),
        _ => {}
    }
    if record.len() < ROW_FIELDS {
        return Err(Error::TooFewFields(record.len()));
    }
    record.truncate(ROW_FIELDS);
    Ok(Some(record.deserialize(None)?))
}

/// Snapshot dump importer. Bad rows are logged and skipped, only I/O problems
/// (or an empty input) are reported as errors.
pub(crate) fn read_accounts<R: Read, U: AccountUser>(
    reader: R,
    user: &mut U,
) -> Result<ReadStats, anyhow::Error> {
    let (delimiter, reader) = sniff(reader)?.ok_or_else(|| anyhow::anyhow!("input is empty"))?;
    let mut rdr = csv_reader(reader, delimiter);
    let mut stats = ReadStats::default();
    for result in rdr.records() {
        stats.rows += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                stats.skipped += 1;
                debug!("Skipping unreadable row: {e}");
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line());
        let classified = parse_row(record).and_then(|row| match row {
            Some(row) => Ok(classify(&row)?.map(|account| (row.pubkey, account))),
            None => Ok(None),
        });
        match classified {
            Ok(Some((pubkey, account))) => {
                stats.accounts += 1;
                user.use_account(pubkey, account);
            }
            Ok(None) => {}
            Err(e) => {
                stats.skipped += 1;
                debug!("Skipping line {line}: {e}");
            }
        }
    }
    Ok(stats)
}
