//! Alphabet-radix Huffman codes.
//!
//! Items are expected in ranked order. Among equal weights the earlier item is
//! preferred: it is merged last and gets the earlier alphabet characters.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry {
    weight: f64,
    /// Rank of the most preferred leaf below this node
    rank: usize,
    node: usize,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    /// The heap pops the lightest entry first, and among equal weights the
    /// least preferred one.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then(self.rank.cmp(&other.rank))
    }
}

/// Number of zero-weight leaves needed so that every internal node of a
/// `radix`-ary tree over `leaves` leaves is full
fn padding(leaves: usize, radix: usize) -> usize {
    if leaves <= radix {
        radix - leaves
    } else {
        (radix - 1 - (leaves - 1) % (radix - 1)) % (radix - 1)
    }
}

/// Prefix-free code words over `alphabet` for items with the given weights.
/// Heavier items get shorter code words. Returns one code word per item, in
/// input order.
pub fn huffman_codes(weights: &[f64], alphabet: &[char]) -> Vec<String> {
    let leaves = weights.len();
    let radix = alphabet.len();
    if leaves == 0 || radix < 2 {
        return vec![String::new(); leaves];
    }

    let dummies = padding(leaves, radix);
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); leaves + dummies];
    let mut ranks: Vec<usize> = (0..leaves + dummies).collect();
    let mut heap: BinaryHeap<Entry> = weights
        .iter()
        .map(|&w| if w.is_finite() { w.max(0.0) } else { 0.0 })
        .chain(std::iter::repeat_n(0.0, dummies))
        .enumerate()
        .map(|(node, weight)| Entry {
            weight,
            rank: node,
            node,
        })
        .collect();

    while heap.len() > 1 {
        let mut merged = Vec::with_capacity(radix);
        let mut weight = 0.0;
        let mut rank = usize::MAX;
        for _ in 0..radix {
            let Some(entry) = heap.pop() else {
                break;
            };
            weight += entry.weight;
            rank = rank.min(entry.rank);
            merged.push(entry.node);
        }
        let node = children.len();
        children.push(merged);
        ranks.push(rank);
        heap.push(Entry { weight, rank, node });
    }

    let mut codes = vec![String::new(); leaves];
    let Some(root) = heap.pop() else {
        return codes;
    };
    let mut stack = vec![(root.node, String::new())];
    while let Some((node, code)) = stack.pop() {
        if node < leaves {
            codes[node] = code;
            continue;
        }
        let mut members = children[node].clone();
        members.sort_by_key(|&member| ranks[member]);
        for (member, ch) in members.into_iter().zip(alphabet.iter()) {
            let mut next = code.clone();
            next.push(*ch);
            stack.push((member, next));
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alphabet(chars: &str) -> Vec<char> {
        chars.chars().collect()
    }

    fn assert_prefix_free(codes: &[String]) {
        for (i, a) in codes.iter().enumerate() {
            assert!(!a.is_empty());
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a.as_str()), "{a} is a prefix of {b}");
                }
            }
        }
    }

    #[test]
    fn test_few_items_get_single_chars() {
        assert_eq!(huffman_codes(&[1.0], &alphabet("ab")), vec!["a"]);
        assert_eq!(
            huffman_codes(&[1.0, 5.0, 1.0], &alphabet("fjd")),
            vec!["f", "j", "d"]
        );
    }

    #[test]
    fn test_equal_weights_prefer_earlier_items() {
        let codes = huffman_codes(&[1.0, 1.0, 1.0], &alphabet("ab"));
        assert_eq!(codes, vec!["a", "ba", "bb"]);
    }

    #[test]
    fn test_heavier_items_get_shorter_codes() {
        let codes = huffman_codes(&[1.0, 1.0, 1.0, 10.0], &alphabet("ab"));
        assert_eq!(codes[3].len(), 1);
        assert_prefix_free(&codes);
    }

    #[test]
    fn test_optimal_total_length() {
        // 9 equal items over a ternary alphabet: a full tree of depth 2.
        let codes = huffman_codes(&[1.0; 9], &alphabet("abc"));
        assert!(codes.iter().all(|c| c.len() == 2));
        assert_prefix_free(&codes);

        // 10 items need one padding leaf; no ternary code does better than 22.
        let codes = huffman_codes(&[1.0; 10], &alphabet("abc"));
        assert_prefix_free(&codes);
        let total: usize = codes.iter().map(String::len).sum();
        assert_eq!(total, 22);
    }

    #[test]
    fn test_many_items_prefix_free() {
        let weights: Vec<f64> = (0..200).map(|i| ((i * 37) % 11) as f64 + 1.0).collect();
        let codes = huffman_codes(&weights, &alphabet("fjdksla"));
        assert_prefix_free(&codes);
    }

    #[test]
    fn test_degenerate_input() {
        assert!(huffman_codes(&[], &alphabet("ab")).is_empty());
        assert_eq!(huffman_codes(&[1.0, 2.0], &alphabet("a")), vec!["", ""]);
        assert_eq!(huffman_codes(&[f64::NAN, 1.0], &alphabet("ab")).len(), 2);
    }
}
