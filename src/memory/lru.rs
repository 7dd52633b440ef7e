//! LRU ranking within one set.
//!
//! Every line of a set carries a rank in `0..lines_per_set`, where 0 is the
//! most recently used line. The ranks of a set always form a permutation.
//! The functions here only see the lines of a single set.

use super::cache::Line;

/// Rank given to a slot when the cache is initialized.
/// The lowest physical slot starts as the least recently used one.
pub fn initial_rank(slot: usize, lines_per_set: usize) -> usize {
    lines_per_set - 1 - slot
}

/// Slot (relative to the set) holding the least recently used line
pub fn find_victim(set: &[Line]) -> Option<usize> {
    let lru_rank = set.len().checked_sub(1)?;
    set.iter().position(|line| line.lru_rank == lru_rank)
}

/// Move the line at `slot` to the front, shifting back
/// every line that was more recent than it
pub fn promote(set: &mut [Line], slot: usize) {
    let old_rank = set[slot].lru_rank;
    for (i, line) in set.iter_mut().enumerate() {
        if i == slot {
            line.lru_rank = 0;
        } else if line.lru_rank < old_rank {
            line.lru_rank += 1;
        }
    }
}

/// Whether the ranks of the set form a permutation of `0..set.len()`
pub fn is_permutation(set: &[Line]) -> bool {
    let mut seen = vec![false; set.len()];
    for line in set {
        match seen.get_mut(line.lru_rank) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_set(lines_per_set: usize) -> Vec<Line> {
        (0..lines_per_set)
            .map(|slot| Line::make(1, 0, initial_rank(slot, lines_per_set)))
            .collect()
    }

    fn ranks(set: &[Line]) -> Vec<usize> {
        set.iter().map(|line| line.lru_rank).collect()
    }

    #[test]
    fn test_initial_ranks() {
        let set = make_set(4);
        assert_eq!(ranks(&set), vec![3, 2, 1, 0]);
        assert!(is_permutation(&set));
        assert_eq!(find_victim(&set), Some(0));
    }

    #[test]
    fn test_promote_victim() {
        let mut set = make_set(4);
        promote(&mut set, 0);
        assert_eq!(ranks(&set), vec![0, 3, 2, 1]);
        assert_eq!(find_victim(&set), Some(1));
    }

    #[test]
    fn test_promote_middle() {
        let mut set = make_set(4);
        // Ranks [3, 2, 1, 0]: slot 2 has rank 1
        promote(&mut set, 2);
        // Only slot 3 (rank 0) was more recent
        assert_eq!(ranks(&set), vec![3, 2, 0, 1]);
        assert!(is_permutation(&set));
    }

    #[test]
    fn test_promote_mru_is_stable() {
        let mut set = make_set(4);
        promote(&mut set, 3);
        assert_eq!(ranks(&set), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_cycle_through_set() {
        let mut set = make_set(4);
        // Filling every victim in turn walks the slots in order
        for expected in [0, 1, 2, 3, 0, 1] {
            let victim = find_victim(&set).unwrap();
            assert_eq!(victim, expected);
            promote(&mut set, victim);
            assert!(is_permutation(&set));
        }
    }

    #[test]
    fn test_single_line_set() {
        let mut set = make_set(1);
        assert_eq!(find_victim(&set), Some(0));
        promote(&mut set, 0);
        assert_eq!(ranks(&set), vec![0]);
    }

    #[test]
    fn test_is_permutation_rejects_duplicates() {
        let mut set = make_set(3);
        set[0].lru_rank = 1;
        assert!(!is_permutation(&set));
        set[0].lru_rank = 7;
        assert!(!is_permutation(&set));
    }
}
