use crate::{
    data::{Classified, NativeAccount, Pubkey, TokenAccount},
    read::AccountUser,
};
use std::collections::{hash_map::Entry, BTreeMap, BTreeSet, HashMap, HashSet};

/// Anything carrying the snapshot write version it was read at.
pub(crate) trait Versioned {
    fn write_version(&self) -> u64;
}

impl Versioned for NativeAccount {
    fn write_version(&self) -> u64 {
        self.write_version
    }
}

impl Versioned for TokenAccount {
    fn write_version(&self) -> u64 {
        self.write_version
    }
}

/// Last writer wins: `candidate` only replaces what's already there for `key`
/// if its write version is strictly greater, so on a tie the first row read
/// stays. Returns whether `candidate` was kept.
pub(crate) fn resolve<V: Versioned>(
    map: &mut HashMap<String, V>,
    key: String,
    candidate: V,
) -> bool {
    match map.entry(key) {
        Entry::Vacant(entry) => {
            entry.insert(candidate);
            true
        }
        Entry::Occupied(mut entry) => {
            if candidate.write_version() > entry.get().write_version() {
                entry.insert(candidate);
                true
            } else {
                false
            }
        }
    }
}

/// This is where the latest state of every account is stored while reading
/// the dump; one entry per account pubkey however many times it shows up.
/// Single pass, single thread, so no protection of any kind.
#[derive(Debug, Default)]
pub(crate) struct Accounts {
    pub native: HashMap<String, NativeAccount>,
    pub tokens: HashMap<String, TokenAccount>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountUser for Accounts {
    fn use_account(&mut self, pubkey: String, account: Classified) {
        match account {
            Classified::Native(account) => resolve(&mut self.native, pubkey, account),
            Classified::Token(account) => resolve(&mut self.tokens, pubkey, account),
        };
    }
}

/// What ends up in the report, every key already in its base58 text form.
///
/// Token totals are `u128`: a single account holds at most `u64::MAX` but a
/// wallet can have any number of accounts for the same mint.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Balances {
    /// Lamports per wallet, zero balances included.
    pub native: HashMap<String, u64>,
    /// Wallets with some SOL or some token, the ones that get a report line.
    pub eligible: BTreeSet<String>,
    /// `(wallet, mint) -> raw amount`
    pub tokens: BTreeMap<(String, String), u128>,
}

impl Balances {
    pub fn aggregate(accounts: &Accounts) -> Self {
        let mut totals: HashMap<(Pubkey, Pubkey), u128> = HashMap::new();
        let mut holders: HashSet<Pubkey> = HashSet::new();
        for account in accounts.tokens.values() {
            // amounts are never zero here, holding a token account is enough
            holders.insert(account.owner);
            *totals.entry((account.owner, account.mint)).or_default() +=
                u128::from(account.amount);
        }

        let mut balances = Balances::default();
        for (wallet, account) in &accounts.native {
            balances.native.insert(wallet.clone(), account.lamports);
            if account.lamports > 0 {
                balances.eligible.insert(wallet.clone());
            }
        }
        balances
            .eligible
            .extend(holders.into_iter().map(|owner| owner.to_string()));
        balances.tokens = totals
            .into_iter()
            .map(|((owner, mint), amount)| ((owner.to_string(), mint.to_string()), amount))
            .collect();
        balances
    }

    pub fn lamports(&self, wallet: &str) -> u64 {
        self.native.get(wallet).copied().unwrap_or_default()
    }
}
