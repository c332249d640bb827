//! Semantic shadow prices recovered from raw row duals.
//!
//! Pipelines record which rows they contributed under which key in a
//! [`KeyedRows`] table while building the model. After an LP solve the table
//! turns the original-order [`DualSolution`] into `(key, price)` entries of a
//! [`ShadowPriceMap`], without depending on where the rows ended up.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::hash::Hash;

use cutplane_model::{Constraint, ConstraintId, Model};
use cutplane_solver::DualSolution;
use tracing::{debug, trace};

use crate::error::DecompError;

/// Bound on what a shadow price key has to support.
pub trait ShadowPriceKey: Eq + Hash + Clone + Debug {}

impl<T: Eq + Hash + Clone + Debug> ShadowPriceKey for T {}

/// One semantic price.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowPrice<K> {
    pub key: K,
    pub price: f64,
}

impl<K> ShadowPrice<K> {
    pub fn new(key: K, price: f64) -> Self {
        Self { key, price }
    }
}

/// Prices by semantic key.
#[derive(Debug, Clone)]
pub struct ShadowPriceMap<K> {
    prices: HashMap<K, f64>,
}

impl<K: ShadowPriceKey> ShadowPriceMap<K> {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    /// Set a price, replacing any earlier value for the key.
    pub fn put(&mut self, entry: ShadowPrice<K>) {
        self.prices.insert(entry.key, entry.price);
    }

    /// Add to the price of a key.
    pub fn accumulate(&mut self, key: K, price: f64) {
        match self.prices.entry(key) {
            Entry::Occupied(mut entry) => *entry.get_mut() += price,
            Entry::Vacant(entry) => {
                entry.insert(price);
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<f64> {
        self.prices.get(key).copied()
    }

    /// Price of a key, zero when nothing was recorded for it.
    pub fn price(&self, key: &K) -> f64 {
        self.get(key).unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.prices.clear();
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> + '_ {
        self.prices.iter().map(|(key, price)| (key, *price))
    }
}

impl<K: ShadowPriceKey> Default for ShadowPriceMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows recorded per key at contribution time.
#[derive(Debug, Clone)]
pub struct KeyedRows<K> {
    order: Vec<K>,
    rows: HashMap<K, Vec<usize>>,
}

impl<K: ShadowPriceKey> KeyedRows<K> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            rows: HashMap::new(),
        }
    }

    /// Add `constraint` to `model` and record its row under `key`.
    pub fn add_constraint(
        &mut self,
        model: &mut Model,
        constraint: Constraint,
        key: K,
    ) -> Result<ConstraintId, DecompError> {
        let row = model.add_constraint(constraint)?;
        self.insert(key, row.index());
        Ok(row)
    }

    /// Record an existing row under `key`. A key may own several rows.
    pub fn insert(&mut self, key: K, row: usize) {
        match self.rows.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().push(row),
            Entry::Vacant(entry) => {
                self.order.push(entry.key().clone());
                entry.insert(vec![row]);
            }
        }
    }

    pub fn rows(&self, key: &K) -> &[usize] {
        self.rows.get(key).map_or(&[], Vec::as_slice)
    }

    /// Keys in the order they were first recorded.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.rows.clear();
    }

    /// Add the summed dual of every key's rows to `map`.
    ///
    /// # Errors
    ///
    /// Returns [`DecompError::DualMismatch`] for a row outside `duals`; the
    /// map is left untouched in that case.
    pub fn refresh(
        &self,
        map: &mut ShadowPriceMap<K>,
        duals: &DualSolution,
    ) -> Result<(), DecompError> {
        if let Some(row) = self
            .rows
            .values()
            .flatten()
            .copied()
            .find(|row| *row >= duals.len())
        {
            return Err(DecompError::DualMismatch {
                row,
                len: duals.len(),
            });
        }

        for key in &self.order {
            let price: f64 = self.rows(key).iter().map(|row| duals.as_slice()[*row]).sum();
            trace!(
                component = "shadow_price",
                operation = "refresh",
                key = ?key,
                price,
                "Shadow price refreshed"
            );
            map.accumulate(key.clone(), price);
        }
        debug!(
            component = "shadow_price",
            operation = "refresh",
            status = "success",
            keys = self.order.len(),
            "Refreshed keyed shadow prices"
        );
        Ok(())
    }
}

impl<K: ShadowPriceKey> Default for KeyedRows<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pair the rows of `group` with `keys_in_order` by position.
///
/// Rows come from the group's range, or from a `"<group>_"` name-prefix scan
/// when the model carries no group metadata for it. This only attributes
/// prices correctly when the keys are listed in the order the rows were
/// contributed; [`KeyedRows`] has no such requirement.
pub fn refresh_by_position<K: ShadowPriceKey>(
    map: &mut ShadowPriceMap<K>,
    model: &Model,
    group: &str,
    keys_in_order: &[K],
    duals: &DualSolution,
) -> Result<(), DecompError> {
    let rows: Vec<usize> = match model.constraint_group(group) {
        Some(range) => range.collect(),
        None => model
            .constraints_with_prefix(&format!("{group}_"))
            .into_iter()
            .map(ConstraintId::index)
            .collect(),
    };
    if rows.len() != keys_in_order.len() {
        return Err(DecompError::GroupSizeMismatch {
            group: group.to_string(),
            rows: rows.len(),
            keys: keys_in_order.len(),
        });
    }

    for (row, key) in rows.into_iter().zip(keys_in_order) {
        let price = duals.get(row).ok_or(DecompError::DualMismatch {
            row,
            len: duals.len(),
        })?;
        map.put(ShadowPrice::new(key.clone(), price));
    }
    debug!(
        component = "shadow_price",
        operation = "refresh_by_position",
        status = "success",
        group,
        keys = keys_in_order.len(),
        "Refreshed positional shadow prices"
    );
    Ok(())
}
