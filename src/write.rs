use crate::{
    amount::format_amount_trim,
    compute::Balances,
    data::{LAMPORTS_DECIMALS, NATIVE_SYMBOL},
    symbols::{DisplayMode, SymbolTable},
};
use serde::Serialize;

/// `wallet, label, ui_amount, mint`; the mint is empty on SOL lines.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    wallet: &'a str,
    label: &'a str,
    amount: String,
    mint: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReportOptions {
    pub display: DisplayMode,
    pub delimiter: u8,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            display: DisplayMode::Symbol,
            delimiter: b'\t',
        }
    }
}

/// Balance report exporter: one SOL line per eligible wallet, then one line per
/// (wallet, mint) token total. Both sorted by wallet, token lines then by mint.
/// Returns the number of lines written.
pub(crate) fn write_balances<W: std::io::Write>(
    writer: W,
    balances: &Balances,
    symbols: &SymbolTable,
    options: ReportOptions,
) -> Result<usize, anyhow::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(options.delimiter)
        .from_writer(writer);
    let mut lines = 0;
    for wallet in &balances.eligible {
        wtr.serialize(ReportRow {
            wallet,
            label: NATIVE_SYMBOL,
            amount: format_amount_trim(balances.lamports(wallet).into(), LAMPORTS_DECIMALS),
            mint: "",
        })?;
        lines += 1;
    }
    for ((wallet, mint), amount) in &balances.tokens {
        if !balances.eligible.contains(wallet) {
            continue;
        }
        let (label, decimals) = symbols.display_for(mint, options.display);
        wtr.serialize(ReportRow {
            wallet,
            label,
            amount: format_amount_trim(*amount, decimals),
            mint,
        })?;
        lines += 1;
    }
    wtr.flush()?;
    Ok(lines)
}
