use std::mem;

use crate::vm::object::GcRef;
use crate::vm::value::Value;

/// FNV-1a over the string bytes, truncated to 32 bits.
pub fn hash_str(s: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for byte in s.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// One slot of the table. Three states:
///
/// - live:      `key = Some(_)`
/// - empty:     `key = None, value = Nil`
/// - tombstone: `key = None, value = Bool(true)`
///
/// Live entries cache the key's hash so probing and resize never need
/// heap access; key equality is handle identity, which is sound because
/// all keys are interned strings.
#[derive(Debug, Clone, Copy)]
struct Entry {
    key: Option<GcRef>,
    hash: u32,
    value: Value,
}

impl Entry {
    const EMPTY: Entry = Entry {
        key: None,
        hash: 0,
        value: Value::Nil,
    };
}

/// Open-addressed, linearly probed hash table keyed by interned strings.
///
/// Capacity is always a power of two and probing uses `hash & mask`.
/// Deletion leaves a tombstone so probe chains stay intact; `count`
/// includes tombstones and is recomputed from live entries on resize.
#[derive(Debug, Default)]
pub struct Table {
    count: usize,
    entries: Vec<Entry>,
}

fn find_entry(entries: &[Entry], key: GcRef, hash: u32) -> usize {
    let mask = entries.len() - 1;
    let mut index = hash as usize & mask;
    let mut tombstone = None;
    loop {
        let entry = &entries[index];
        match entry.key {
            None => {
                if entry.value.is_nil() {
                    // Truly empty; hand back the earliest tombstone so
                    // inserts reuse it.
                    return tombstone.unwrap_or(index);
                }
                if tombstone.is_none() {
                    tombstone = Some(index);
                }
            }
            Some(k) if k == key => return index,
            Some(_) => {}
        }
        index = (index + 1) & mask;
    }
}

impl Table {
    pub fn new() -> Table {
        Table::default()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.key.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: GcRef, hash: u32) -> Option<Value> {
        if self.count == 0 {
            return None;
        }
        let entry = &self.entries[find_entry(&self.entries, key, hash)];
        entry.key.map(|_| entry.value)
    }

    /// Insert or overwrite. Returns true when the key was not present.
    pub fn set(&mut self, key: GcRef, hash: u32, value: Value) -> bool {
        if (self.count + 1) * 4 > self.entries.len() * 3 {
            let capacity = grow_capacity(self.entries.len());
            self.adjust_capacity(capacity);
        }

        let index = find_entry(&self.entries, key, hash);
        let entry = &mut self.entries[index];
        let is_new = entry.key.is_none();
        if is_new && entry.value.is_nil() {
            // A reused tombstone already counts toward the load factor.
            self.count += 1;
        }
        *entry = Entry {
            key: Some(key),
            hash,
            value,
        };
        is_new
    }

    /// Remove a key, leaving a tombstone. `count` is not decremented.
    pub fn delete(&mut self, key: GcRef, hash: u32) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = find_entry(&self.entries, key, hash);
        let entry = &mut self.entries[index];
        if entry.key.is_none() {
            return false;
        }
        *entry = Entry {
            key: None,
            hash: 0,
            value: Value::Bool(true),
        };
        true
    }

    /// Copy every live entry of `src` into this table.
    pub fn add_all(&mut self, src: &Table) {
        for entry in &src.entries {
            if let Some(key) = entry.key {
                self.set(key, entry.hash, entry.value);
            }
        }
    }

    /// Probe for a key by hash, comparing candidates with `eq`. Used by
    /// the intern pool to locate an existing canonical string without
    /// allocating; tombstones are probed past.
    pub fn find_key(&self, hash: u32, mut eq: impl FnMut(GcRef) -> bool) -> Option<GcRef> {
        if self.count == 0 {
            return None;
        }
        let mask = self.entries.len() - 1;
        let mut index = hash as usize & mask;
        loop {
            let entry = &self.entries[index];
            match entry.key {
                None => {
                    if entry.value.is_nil() {
                        return None;
                    }
                }
                Some(k) => {
                    if entry.hash == hash && eq(k) {
                        return Some(k);
                    }
                }
            }
            index = (index + 1) & mask;
        }
    }

    /// Turn every entry whose key satisfies `pred` into a tombstone.
    /// This is the weak-reference reconciliation hook: the collector
    /// calls it on the intern pool with "is unmarked" before sweeping.
    pub fn remove_where(&mut self, mut pred: impl FnMut(GcRef) -> bool) {
        for entry in &mut self.entries {
            if let Some(key) = entry.key {
                if pred(key) {
                    *entry = Entry {
                        key: None,
                        hash: 0,
                        value: Value::Bool(true),
                    };
                }
            }
        }
    }

    /// Live `(key, value)` pairs, in probe order.
    pub fn iter(&self) -> impl Iterator<Item = (GcRef, Value)> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.key.map(|k| (k, e.value)))
    }

    /// Backing-array footprint for allocation accounting.
    pub fn byte_size(&self) -> usize {
        self.entries.len() * mem::size_of::<Entry>()
    }

    fn adjust_capacity(&mut self, capacity: usize) {
        let old = mem::replace(&mut self.entries, vec![Entry::EMPTY; capacity]);
        // Reinsert live keys only; tombstones are dropped and the count
        // recomputed from scratch.
        self.count = 0;
        for entry in old {
            if let Some(key) = entry.key {
                let index = find_entry(&self.entries, key, entry.hash);
                self.entries[index] = entry;
                self.count += 1;
            }
        }
    }
}

fn grow_capacity(capacity: usize) -> usize {
    if capacity < 8 {
        8
    } else {
        capacity * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: usize) -> (GcRef, u32) {
        // Table code never dereferences keys, so tests can fabricate
        // handles and hashes directly.
        (GcRef::new(n), hash_str(&format!("key{}", n)))
    }

    #[test]
    fn test_set_get_overwrite() {
        let mut table = Table::new();
        let (k, h) = key(0);

        assert!(table.set(k, h, Value::Number(1.0)));
        assert_eq!(table.get(k, h), Some(Value::Number(1.0)));

        assert!(!table.set(k, h, Value::Number(2.0)));
        assert_eq!(table.get(k, h), Some(Value::Number(2.0)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let table = Table::new();
        let (k, h) = key(1);
        assert_eq!(table.get(k, h), None);
    }

    #[test]
    fn test_delete_leaves_findable_chain() {
        let mut table = Table::new();
        // Three keys with identical hashes force one probe chain.
        let hash = 7;
        let (a, b, c) = (GcRef::new(100), GcRef::new(101), GcRef::new(102));
        table.set(a, hash, Value::Number(1.0));
        table.set(b, hash, Value::Number(2.0));
        table.set(c, hash, Value::Number(3.0));

        assert!(table.delete(b, hash));
        assert!(!table.delete(b, hash));

        // c sits past b's tombstone and must still be reachable.
        assert_eq!(table.get(c, hash), Some(Value::Number(3.0)));
        assert_eq!(table.get(b, hash), None);
        assert_eq!(table.get(a, hash), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_insert_reuses_tombstone() {
        let mut table = Table::new();
        let hash = 3;
        let (a, b) = (GcRef::new(10), GcRef::new(11));
        table.set(a, hash, Value::Nil);
        table.set(b, hash, Value::Nil);
        table.delete(a, hash);

        // Reinserting a colliding key lands in the tombstone, not a new
        // slot, so count stays put.
        let before = table.count;
        table.set(a, hash, Value::Bool(true));
        assert_eq!(table.count, before);
        assert_eq!(table.get(a, hash), Some(Value::Bool(true)));
        assert_eq!(table.get(b, hash), Some(Value::Nil));
    }

    #[test]
    fn test_resize_drops_tombstones() {
        let mut table = Table::new();
        for i in 0..6 {
            let (k, h) = key(i);
            table.set(k, h, Value::Number(i as f64));
        }
        for i in 0..3 {
            let (k, h) = key(i);
            table.delete(k, h);
        }
        // Push past the load factor to force a resize.
        for i in 6..16 {
            let (k, h) = key(i);
            table.set(k, h, Value::Number(i as f64));
        }
        for i in 3..16 {
            let (k, h) = key(i);
            assert_eq!(table.get(k, h), Some(Value::Number(i as f64)), "key {}", i);
        }
        for i in 0..3 {
            let (k, h) = key(i);
            assert_eq!(table.get(k, h), None);
        }
        assert_eq!(table.len(), 13);
    }

    #[test]
    fn test_add_all() {
        let mut src = Table::new();
        let mut dst = Table::new();
        for i in 0..5 {
            let (k, h) = key(i);
            src.set(k, h, Value::Number(i as f64));
        }
        let (k0, h0) = key(0);
        dst.set(k0, h0, Value::Bool(false));

        dst.add_all(&src);
        assert_eq!(dst.get(k0, h0), Some(Value::Number(0.0)));
        assert_eq!(dst.len(), 5);
    }

    #[test]
    fn test_find_key_skips_tombstones() {
        let mut table = Table::new();
        let hash = 9;
        let (a, b) = (GcRef::new(20), GcRef::new(21));
        table.set(a, hash, Value::Nil);
        table.set(b, hash, Value::Nil);
        table.delete(a, hash);

        assert_eq!(table.find_key(hash, |k| k == b), Some(b));
        assert_eq!(table.find_key(hash, |k| k == a), None);
    }

    #[test]
    fn test_remove_where() {
        let mut table = Table::new();
        for i in 0..8 {
            let (k, h) = key(i);
            table.set(k, h, Value::Number(i as f64));
        }
        table.remove_where(|k| k.index() % 2 == 0);
        for i in 0..8 {
            let (k, h) = key(i);
            let expect = if i % 2 == 0 {
                None
            } else {
                Some(Value::Number(i as f64))
            };
            assert_eq!(table.get(k, h), expect);
        }
    }

    #[test]
    fn test_random_ops_match_reference_model() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use std::collections::HashMap;

        let mut rng = StdRng::seed_from_u64(0x0bab5eed);
        let keys: Vec<(GcRef, u32)> = (0..64).map(key).collect();

        let mut table = Table::new();
        let mut model: HashMap<usize, Value> = HashMap::new();

        for _ in 0..10_000 {
            let i = rng.gen_range(0..keys.len());
            let (k, h) = keys[i];
            match rng.gen_range(0..3) {
                0 => {
                    let v = Value::Number(rng.gen_range(0..1000) as f64);
                    table.set(k, h, v);
                    model.insert(i, v);
                }
                1 => {
                    table.delete(k, h);
                    model.remove(&i);
                }
                _ => {
                    assert_eq!(table.get(k, h), model.get(&i).copied(), "key {}", i);
                }
            }
        }

        for (i, &(k, h)) in keys.iter().enumerate() {
            assert_eq!(table.get(k, h), model.get(&i).copied(), "final key {}", i);
        }
        assert_eq!(table.len(), model.len());
    }
}
