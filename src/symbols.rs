use crate::read::{csv_reader, sniff};
use anyhow::Context;
use clap::ValueEnum;
use log::debug;
use std::{collections::HashMap, io::Read, path::Path};

/// What goes in the label column of token lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DisplayMode {
    Symbol,
    Name,
    /// Symbol if there's one, else the name, else the mint.
    Auto,
}

/// Display data for a mint. Blank cells of the symbol table are filled in at
/// load time so none of these are ever empty:
/// - `symbol`: symbol, else the mint
/// - `name`: name, else symbol, else the mint
/// - `display`: symbol, else name, else the mint
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenInfo {
    pub symbol: String,
    pub decimals: u32,
    pub name: String,
    pub display: String,
}

impl TokenInfo {
    pub fn new(mint: &str, symbol: &str, decimals: u32, name: &str) -> Self {
        Self {
            symbol: non_empty(symbol, mint).to_string(),
            decimals,
            name: non_empty(non_empty(name, symbol), mint).to_string(),
            display: non_empty(non_empty(symbol, name), mint).to_string(),
        }
    }

    pub fn label(&self, mode: DisplayMode) -> &str {
        match mode {
            DisplayMode::Symbol => &self.symbol,
            DisplayMode::Name => &self.name,
            DisplayMode::Auto => &self.display,
        }
    }
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Column positions in the symbol table, only the mint one is mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    mint: usize,
    symbol: Option<usize>,
    decimals: Option<usize>,
    name: Option<usize>,
}

impl Columns {
    /// `address,symbol,decimals,name`, used when there's no header line.
    const POSITIONAL: Columns = Columns {
        mint: 0,
        symbol: Some(1),
        decimals: Some(2),
        name: Some(3),
    };

    /// `None` unless the record looks like a header, i.e. has an `address`
    /// or `mint` column.
    fn from_header(record: &csv::StringRecord) -> Option<Self> {
        let header: Vec<String> = record.iter().map(|c| c.to_lowercase()).collect();
        let find = |name: &str| header.iter().position(|c| c == name);
        let mint = find("address").or_else(|| find("mint"))?;
        Some(Self {
            mint,
            symbol: find("symbol"),
            decimals: find("decimals"),
            name: find("name"),
        })
    }

    fn parse(&self, record: &csv::StringRecord) -> Option<(String, TokenInfo)> {
        let mint = record.get(self.mint).filter(|m| !m.is_empty())?;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");
        // mints store decimals as a u8, anything else is garbage
        let decimals = cell(self.decimals).parse::<u8>().map_or(0, u32::from);
        Some((
            mint.to_string(),
            TokenInfo::new(mint, cell(self.symbol), decimals, cell(self.name)),
        ))
    }
}

/// Mint -> display data. Entirely optional: without it token lines show the
/// mint and a raw amount.
#[derive(Debug, Default)]
pub(crate) struct SymbolTable {
    entries: HashMap<String, TokenInfo>,
}

impl SymbolTable {
    /// A missing file gives an empty table; a file that exists but can't be
    /// read is an error.
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = std::fs::File::open(path)
            .with_context(|| format!("can't open symbol table {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("can't read symbol table {}", path.display()))
    }

    /// Bad lines are skipped, later lines win over earlier ones for the same mint.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, anyhow::Error> {
        let mut table = Self::default();
        let Some((delimiter, reader)) = sniff(reader)? else {
            return Ok(table);
        };
        let mut columns = None;
        for result in csv_reader(reader, delimiter).into_records() {
            let record = match result {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    debug!("Skipping symbol table line: {e}");
                    continue;
                }
            };
            let columns = match columns {
                Some(columns) => columns,
                None => match Columns::from_header(&record) {
                    Some(header) => {
                        columns = Some(header);
                        continue;
                    }
                    None => *columns.insert(Columns::POSITIONAL),
                },
            };
            if let Some((mint, info)) = columns.parse(&record) {
                table.entries.insert(mint, info);
            }
        }
        Ok(table)
    }

    pub fn get(&self, mint: &str) -> Option<&TokenInfo> {
        self.entries.get(mint)
    }

    /// Label and decimals for a mint; unknown mints show as themselves, in
    /// raw units.
    pub fn display_for<'a>(&'a self, mint: &'a str, mode: DisplayMode) -> (&'a str, u32) {
        match self.get(mint) {
            Some(info) => (info.label(mode), info.decimals),
            None => (mint, 0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayMode, SymbolTable, TokenInfo};
    use std::path::Path;

    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    #[test]
    fn header_in_any_order() {
        let table = SymbolTable::from_reader(
            &b"\
Name,Decimals,Mint,Symbol
USD Coin,6,EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v,USDC
"[..],
        )
        .unwrap();
        assert_eq!(
            table.get(USDC),
            Some(&TokenInfo {
                symbol: "USDC".into(),
                decimals: 6,
                name: "USD Coin".into(),
                display: "USDC".into(),
            })
        );
    }

    #[test]
    fn positional_tab_separated() {
        let table = SymbolTable::from_reader(
            &b"\
EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v\tUSDC\t6\tUSD Coin
So11111111111111111111111111111111111111112\tSOL\t9
"[..],
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.display_for(USDC, DisplayMode::Name), ("USD Coin", 6));
        let wsol = "So11111111111111111111111111111111111111112";
        assert_eq!(table.display_for(wsol, DisplayMode::Name), ("SOL", 9));
    }

    #[test]
    fn fallbacks() {
        let table = SymbolTable::from_reader(
            &b"\
address,symbol,decimals,name
m1,,3,
m2,,,Second
m3,THREE,x,
m4,FOUR,-2,Fourth
,ORPHAN,1,Orphan
m5
m6,BIG,65535,Big
m7,HUGE,300000000,
m8,MAX,255,
"[..],
        )
        .unwrap();
        assert_eq!(table.len(), 8);
        assert_eq!(
            table.get("m1"),
            Some(&TokenInfo {
                symbol: "m1".into(),
                decimals: 3,
                name: "m1".into(),
                display: "m1".into(),
            })
        );
        assert_eq!(
            table.get("m2"),
            Some(&TokenInfo {
                symbol: "m2".into(),
                decimals: 0,
                name: "Second".into(),
                display: "Second".into(),
            })
        );
        assert_eq!(table.display_for("m3", DisplayMode::Name), ("THREE", 0));
        assert_eq!(table.display_for("m4", DisplayMode::Symbol), ("FOUR", 0));
        assert_eq!(table.display_for("m4", DisplayMode::Auto), ("FOUR", 0));
        assert_eq!(table.display_for("m5", DisplayMode::Symbol), ("m5", 0));
        assert_eq!(table.display_for("m6", DisplayMode::Symbol), ("BIG", 0));
        assert_eq!(table.display_for("m7", DisplayMode::Name), ("HUGE", 0));
        assert_eq!(table.display_for("m8", DisplayMode::Symbol), ("MAX", 255));
        assert_eq!(table.display_for("unknown", DisplayMode::Name), ("unknown", 0));
    }

    #[test]
    fn header_without_optional_columns() {
        let table = SymbolTable::from_reader(&b"mint\nm1\nm2\n"[..]).unwrap();
        assert_eq!(table.display_for("m2", DisplayMode::Symbol), ("m2", 0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_or_missing() {
        assert!(SymbolTable::from_reader(&b""[..]).unwrap().is_empty());
        assert!(SymbolTable::load(Path::new("/nonexistent/symbols.csv"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn later_lines_win() {
        let table = SymbolTable::from_reader(&b"m1,OLD,2,Old\nm1,NEW,4,New\n"[..]).unwrap();
        assert_eq!(table.display_for("m1", DisplayMode::Symbol), ("NEW", 4));
    }
}
