//! The deterministic fanout tree.
//!
//! Nodes are laid out breadth-first in suitability order behind the
//! leader: higher scores sit closer to the root and relay more. With
//! layout index `i`, the children are indices `i*fanout + 1 ..=
//! i*fanout + fanout`. Every node derives the identical tree from the
//! same weighted peer set, so no coordination datagrams are needed.
//! The tree is re-formed each epoch from refreshed scores.

use std::collections::HashMap;

use shared_types::PublicKey;

/// Score-weighted broadcast tree rooted at the leader.
#[derive(Debug, Clone)]
pub struct FanoutTree {
    order: Vec<PublicKey>,
    position: HashMap<PublicKey, usize>,
    fanout: usize,
}

impl FanoutTree {
    /// Build the tree for one leader over the weighted validator set.
    /// `peers` may include the leader; it is always placed at the root.
    pub fn build(leader: PublicKey, peers: &[(PublicKey, f64)], fanout: usize) -> Self {
        let mut ranked: Vec<(PublicKey, f64)> = peers
            .iter()
            .filter(|(key, _)| *key != leader)
            .cloned()
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut order = vec![leader];
        order.extend(ranked.into_iter().map(|(key, _)| key));
        let position = order
            .iter()
            .enumerate()
            .map(|(i, key)| (*key, i))
            .collect();

        Self {
            order,
            position,
            fanout: fanout.max(1),
        }
    }

    pub fn root(&self) -> &PublicKey {
        &self.order[0]
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, node: &PublicKey) -> bool {
        self.position.contains_key(node)
    }

    /// Children `node` must retransmit to; empty for leaves and
    /// unknown nodes.
    pub fn children_of(&self, node: &PublicKey) -> Vec<PublicKey> {
        let Some(&index) = self.position.get(node) else {
            return Vec::new();
        };
        let first = index * self.fanout + 1;
        (first..first + self.fanout)
            .filter_map(|i| self.order.get(i).copied())
            .collect()
    }

    /// The node expected to deliver shreds to `node`.
    pub fn parent_of(&self, node: &PublicKey) -> Option<PublicKey> {
        let &index = self.position.get(node)?;
        if index == 0 {
            None
        } else {
            Some(self.order[(index - 1) / self.fanout])
        }
    }

    /// Distance from the root.
    pub fn depth_of(&self, node: &PublicKey) -> Option<usize> {
        let &index = self.position.get(node)?;
        let mut depth = 0;
        let mut i = index;
        while i > 0 {
            i = (i - 1) / self.fanout;
            depth += 1;
        }
        Some(depth)
    }
}
