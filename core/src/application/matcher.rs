//! Process ancestry matching.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::domain::Lineage;
use crate::error::Result;
use crate::ports::AncestryResolver;

/// Decides whether a process is, or descends from, a registered process.
///
/// Walks the parent chain iteratively; `max_depth` bounds the number of
/// parent lookups so a malformed process table cannot loop forever.
pub struct AncestryMatcher<'a, R: AncestryResolver + ?Sized> {
    resolver: &'a R,
    max_depth: usize,
}

impl<'a, R: AncestryResolver + ?Sized> AncestryMatcher<'a, R> {
    pub fn new(resolver: &'a R, max_depth: usize) -> Self {
        Self {
            resolver,
            max_depth,
        }
    }

    /// Check `pid` and each of its ancestors against `registered`.
    pub fn matches(&self, registered: &HashSet<u32>, pid: u32) -> Result<bool> {
        if registered.is_empty() {
            return Ok(false);
        }

        let mut current = pid;
        for _ in 0..self.max_depth {
            if registered.contains(&current) {
                return Ok(true);
            }

            match self.resolver.parent_of(current)? {
                Lineage::Parent(ppid) => current = ppid,
                Lineage::Root => {
                    debug!(pid = current, "process has no parent");
                    return Ok(false);
                }
                Lineage::NotFound => {
                    debug!(pid = current, "process could not be found");
                    return Ok(false);
                }
            }
        }

        if registered.contains(&current) {
            return Ok(true);
        }
        warn!(pid, max_depth = self.max_depth, "ancestry walk hit the depth limit");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Process tree fixture: pid -> parent pid (0 = root).
    struct MockTree {
        parents: HashMap<u32, u32>,
        failing: Option<u32>,
        lookups: AtomicUsize,
    }

    impl MockTree {
        fn new(edges: &[(u32, u32)]) -> Self {
            Self {
                parents: edges.iter().copied().collect(),
                failing: None,
                lookups: Default::default(),
            }
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl AncestryResolver for MockTree {
        fn parent_of(&self, pid: u32) -> Result<Lineage> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.failing == Some(pid) {
                return Err(Error::CommandFailed("ps exploded".to_string()));
            }
            Ok(match self.parents.get(&pid) {
                Some(&ppid) => Lineage::from_ppid(ppid),
                None => Lineage::NotFound,
            })
        }
    }

    // init(1) -> shell(100) -> dev-server(200) -> worker(300) -> child(400)
    fn tree() -> MockTree {
        MockTree::new(&[(1, 0), (100, 1), (200, 100), (300, 200), (400, 300), (500, 1)])
    }

    fn registered(pids: &[u32]) -> HashSet<u32> {
        pids.iter().copied().collect()
    }

    #[test]
    fn test_registered_pid_matches_without_lookup() {
        let tree = tree();
        let matcher = AncestryMatcher::new(&tree, 16);
        assert!(matcher.matches(&registered(&[200]), 200).unwrap());
        assert_eq!(tree.lookups(), 0);
    }

    #[test]
    fn test_descendant_matches() {
        let tree = tree();
        let matcher = AncestryMatcher::new(&tree, 16);
        assert!(matcher.matches(&registered(&[200]), 400).unwrap());
    }

    #[test]
    fn test_unrelated_process_walks_to_root() {
        let tree = tree();
        let matcher = AncestryMatcher::new(&tree, 16);
        assert!(!matcher.matches(&registered(&[200]), 500).unwrap());
    }

    #[test]
    fn test_unknown_pid_is_no_match() {
        let tree = tree();
        let matcher = AncestryMatcher::new(&tree, 16);
        assert!(!matcher.matches(&registered(&[200]), 9999).unwrap());
    }

    #[test]
    fn test_empty_registration_short_circuits() {
        let tree = tree();
        let matcher = AncestryMatcher::new(&tree, 16);
        assert!(!matcher.matches(&HashSet::new(), 400).unwrap());
        assert_eq!(tree.lookups(), 0);
    }

    #[test]
    fn test_resolver_error_propagates() {
        let mut tree = tree();
        tree.failing = Some(300);
        let matcher = AncestryMatcher::new(&tree, 16);
        assert!(matcher.matches(&registered(&[200]), 400).is_err());
    }

    #[test]
    fn test_cycle_is_capped() {
        let tree = MockTree::new(&[(10, 11), (11, 10)]);
        let matcher = AncestryMatcher::new(&tree, 8);
        assert!(!matcher.matches(&registered(&[1]), 10).unwrap());
        assert_eq!(tree.lookups(), 8);
    }

    #[test]
    fn test_depth_limit_stops_deep_match() {
        let tree = tree();
        // 400 -> 300 -> 200 needs two lookups
        let shallow = AncestryMatcher::new(&tree, 1);
        assert!(!shallow.matches(&registered(&[200]), 400).unwrap());

        let deep_enough = AncestryMatcher::new(&tree, 2);
        assert!(deep_enough.matches(&registered(&[200]), 400).unwrap());
        assert_eq!(tree.lookups(), 1 + 2);
    }

    #[test]
    fn test_last_parent_is_checked_without_extra_lookup() {
        let tree = tree();
        // 400 -> 300 is the only lookup allowed, and 300 is registered
        let matcher = AncestryMatcher::new(&tree, 1);
        assert!(matcher.matches(&registered(&[300]), 400).unwrap());
        assert_eq!(tree.lookups(), 1);
    }

    #[test]
    fn test_zero_depth_checks_only_the_pid() {
        let tree = tree();
        let matcher = AncestryMatcher::new(&tree, 0);
        assert!(matcher.matches(&registered(&[400]), 400).unwrap());
        assert!(!matcher.matches(&registered(&[300]), 400).unwrap());
        assert_eq!(tree.lookups(), 0);
    }

    #[test]
    fn test_works_through_trait_object() {
        let tree = tree();
        let resolver: &dyn AncestryResolver = &tree;
        let matcher = AncestryMatcher::new(resolver, 16);
        assert!(matcher.matches(&registered(&[100]), 300).unwrap());
    }
}
