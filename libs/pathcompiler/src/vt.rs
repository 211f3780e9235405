use std::collections::HashMap;

/// The `(component, inChan, neighborKey, outChan)` key a global pathfinding
/// variable is addressed by (`vt[v,j,k,l]`). `neighborKey` is the
/// name of the component on the far side of the transition's out-port's
/// PortPair, or `PORT:<name>` when the out-port has no PortPair (a network
/// edge, e.g. the request's final destination).
pub type VarKey = (String, u32, String, u32);

/// The injective, dense `vt` mapping: each distinct tuple gets a unique
/// positive id in `[1..NUM_VARS]`; an absent tuple maps to zero (/// invariant: "`vt` is invertible").
#[derive(Debug, Clone, Default)]
pub struct Vt {
    forward: HashMap<VarKey, u32>,
    reverse: Vec<VarKey>,
}

impl Vt {
    /// Build a dense assignment from the given tuples, deduplicated and
    /// sorted so the assignment is deterministic across runs with the same
    /// input ("stable key ordering").
    pub fn build(keys: impl IntoIterator<Item = VarKey>) -> Self {
        let mut sorted: Vec<VarKey> = keys.into_iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut forward = HashMap::with_capacity(sorted.len());
        let mut reverse = Vec::with_capacity(sorted.len() + 1);
        reverse.push((String::new(), 0, String::new(), 0)); // index 0 is unused; var-ids are 1-based.

        for key in sorted {
            let id = reverse.len() as u32;
            reverse.push(key.clone());
            forward.insert(key, id);
        }

        let vt = Vt { forward, reverse };
        debug_assert!(vt.check_injective(), "vt must invert every assigned var-id back to its tuple");
        vt
    }

    /// The var-id for `key`, or 0 if the tuple is infeasible / absent.
    pub fn get(&self, key: &VarKey) -> u32 {
        self.forward.get(key).copied().unwrap_or(0)
    }

    /// The tuple a var-id was assigned to, if any.
    pub fn lookup(&self, var_id: u32) -> Option<&VarKey> {
        self.reverse.get(var_id as usize).filter(|_| var_id != 0)
    }

    pub fn num_vars(&self) -> u32 {
        self.reverse.len() as u32 - 1
    }

    pub fn is_empty(&self) -> bool {
        self.num_vars() == 0
    }

    /// Every forward mapping inverts back to its own key. Checked once at
    /// construction via `debug_assert!`; exposed for the unit/property
    /// tests that assert the invertibility invariant directly.
    pub fn check_injective(&self) -> bool {
        self.forward.iter().all(|(key, &id)| self.reverse.get(id as usize) == Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_vt_has_zero_vars_and_resolves_nothing() {
        let vt = Vt::build(std::iter::empty());
        assert_eq!(vt.num_vars(), 0);
        assert_eq!(vt.get(&("A".into(), 1, "B".into(), 2)), 0);
    }

    #[test]
    fn assigns_dense_sequential_ids_and_inverts() {
        let keys = vec![
            ("A".to_string(), 1, "B".to_string(), 1),
            ("A".to_string(), 1, "B".to_string(), 2),
            ("B".to_string(), 1, "C".to_string(), 1),
        ];
        let vt = Vt::build(keys.clone());
        assert_eq!(vt.num_vars(), 3);

        let mut seen_ids = Vec::new();
        for key in &keys {
            let id = vt.get(key);
            assert_ne!(id, 0);
            assert_eq!(vt.lookup(id), Some(key));
            seen_ids.push(id);
        }
        seen_ids.sort_unstable();
        assert_eq!(seen_ids, vec![1, 2, 3]);
        assert!(vt.check_injective());
    }

    #[test]
    fn duplicate_keys_collapse_to_one_id() {
        let vt = Vt::build(vec![
            ("A".to_string(), 1, "B".to_string(), 1),
            ("A".to_string(), 1, "B".to_string(), 1),
        ]);
        assert_eq!(vt.num_vars(), 1);
    }

    #[test]
    fn zero_id_never_resolves_to_a_tuple() {
        let vt = Vt::build(vec![("A".to_string(), 1, "B".to_string(), 1)]);
        assert_eq!(vt.lookup(0), None);
    }
}
