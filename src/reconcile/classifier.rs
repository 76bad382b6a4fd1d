//! Account classification and alias merging.
//!
//! Maps an account id to its roster category and logical holder. Roster
//! entries sharing a merge key are one holder, shown under the first entry's
//! name. Anything not on the roster is Community.

use log::debug;
use std::collections::{BTreeMap, HashMap};

use super::merge::MergedSnapshot;
use crate::aggregator::Holding;
use crate::model::{AccountId, Category, Snapshot, StakeEntry, TrackedAccount};
use crate::roster::{AccountSpec, Roster};

/// Roster lookups over one merged snapshot
#[derive(Debug)]
pub struct Classifier<'a> {
    roster: &'a Roster,
    snapshot: &'a Snapshot,
    /// Roster key and resolved public key -> roster index
    index: HashMap<String, usize>,
    /// Merge key -> roster index of the group's first entry
    group_head: HashMap<String, usize>,
}

impl<'a> Classifier<'a> {
    pub fn new(roster: &'a Roster, snapshot: &'a Snapshot) -> Self {
        let mut index = HashMap::new();
        let mut group_head = HashMap::new();

        for (i, spec) in roster.accounts().iter().enumerate() {
            index.insert(spec.key(), i);
            index.insert(resolve(spec, snapshot), i);
            group_head.entry(spec.merge_key()).or_insert(i);
        }

        debug!(
            "Classifier indexed {} ids across {} logical holders",
            index.len(),
            group_head.len()
        );

        Self {
            roster,
            snapshot,
            index,
            group_head,
        }
    }

    /// Public key of a roster entry, or its roster key while unresolved
    pub fn resolved_id(&self, spec: &AccountSpec) -> AccountId {
        resolve(spec, self.snapshot)
    }

    /// Roster entries paired with their resolved public keys
    pub fn roster_accounts(&self) -> impl Iterator<Item = (&'a AccountSpec, AccountId)> + 'a {
        let snapshot = self.snapshot;
        self.roster
            .accounts()
            .iter()
            .map(move |spec| (spec, resolve(spec, snapshot)))
    }

    pub fn roster_entry(&self, account_id: &str) -> Option<&'a AccountSpec> {
        self.index
            .get(account_id)
            .map(|&i| &self.roster.accounts()[i])
    }

    /// First roster entry of the account's alias group
    fn group_entry(&self, account_id: &str) -> Option<&'a AccountSpec> {
        let spec = self.roster_entry(account_id)?;
        self.group_head
            .get(&spec.merge_key())
            .map(|&i| &self.roster.accounts()[i])
    }

    /// Category from the roster; unknown accounts are Community
    pub fn category(&self, account_id: &str) -> Category {
        self.group_entry(account_id)
            .map_or(Category::Community, |spec| spec.category)
    }

    /// Key of the logical holder an account belongs to
    pub fn holder_key(&self, account_id: &str) -> String {
        self.roster_entry(account_id)
            .map_or_else(|| account_id.to_string(), |spec| spec.merge_key())
    }

    /// Display name of the logical holder, if one can be resolved
    pub fn display_name(&self, account_id: &str) -> Option<String> {
        match self.group_entry(account_id) {
            Some(head) => head
                .display_label()
                .or_else(|| self.snapshot.names.get(&self.resolved_id(head)).cloned())
                .or_else(|| self.snapshot.names.get(account_id).cloned()),
            None => self.snapshot.names.get(account_id).cloned(),
        }
    }

    /// Attribute an amount held by one account to its logical holder
    pub fn holding(&self, account_id: &str, amount: f64) -> Holding {
        Holding {
            holder_key: self.holder_key(account_id),
            label: self.display_name(account_id),
            category: self.category(account_id),
            amount,
        }
    }

    /// Sum holdings that belong to the same logical holder.
    ///
    /// Output is ordered by holder key.
    pub fn group_holdings<I>(&self, amounts: I) -> Vec<Holding>
    where
        I: IntoIterator<Item = (AccountId, f64)>,
    {
        let mut grouped: BTreeMap<String, Holding> = BTreeMap::new();
        for (account_id, amount) in amounts {
            let holding = self.holding(&account_id, amount);
            grouped
                .entry(holding.holder_key.clone())
                .and_modify(|h| h.amount += amount)
                .or_insert(holding);
        }
        grouped.into_values().collect()
    }

    /// Build one `TrackedAccount` per logical roster holder, in roster order
    ///
    /// **Public** - used by the reconciliation pass
    ///
    /// # Arguments
    /// * `entries` - Canonical stake entries (already keyed by public key)
    /// * `merged` - Merged snapshot with per-account provenance
    pub fn tracked_accounts(
        &self,
        entries: &[StakeEntry],
        merged: &MergedSnapshot,
    ) -> Vec<TrackedAccount> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, TrackedAccount> = HashMap::new();

        for (spec, resolved) in self.roster_accounts() {
            let merge_key = spec.merge_key();
            let provenance = merged.provenance(&spec.key());
            let record = merged.snapshot.accounts.get(&spec.key());

            let account = groups.entry(merge_key.clone()).or_insert_with(|| {
                order.push(merge_key.clone());
                TrackedAccount {
                    account_id: resolved.clone(),
                    display_name: self.display_name(&resolved),
                    merge_key: merge_key.clone(),
                    category: spec.category,
                    balances: BTreeMap::new(),
                    stakes: BTreeMap::new(),
                    provenance,
                }
            });

            account.provenance = account.provenance.coarsest(provenance);
            if let Some(record) = record {
                for (symbol, amount) in &record.balances {
                    *account.balances.entry(symbol.clone()).or_insert(0.0) += amount;
                }
            }
        }

        for entry in entries {
            let key = self.holder_key(&entry.staker_id);
            if let Some(account) = groups.get_mut(&key) {
                *account
                    .stakes
                    .entry(entry.validator_id.clone())
                    .or_insert(0.0) += entry.staked_amount;
            }
        }

        order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .collect()
    }
}

fn resolve(spec: &AccountSpec, snapshot: &Snapshot) -> AccountId {
    let key = spec.key();
    match &spec.id {
        Some(id) => id.clone(),
        None => snapshot.identities.get(&key).cloned().unwrap_or(key),
    }
}
