//! Arena tree index
//!
//! Department and menu hierarchies are stored as self-referencing rows. Instead of
//! walking them one query per level, callers bulk-fetch `(id, parent, label)` once
//! and build a `TreeIndex`: a node table keyed by id plus parent/children maps.
//! All walks are iterative and bounded by `max_depth`.

use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} does not exist")]
    UnknownNode(i64),

    #[error("cycle detected in parent chain at node {0}")]
    Cycle(i64),

    #[error("tree deeper than {limit} levels below node {node}")]
    TooDeep { node: i64, limit: usize },
}

#[derive(Debug, Clone)]
struct Node {
    id: i64,
    parent: Option<i64>,
    label: String,
}

/// Read-only hierarchy snapshot
#[derive(Debug, Clone)]
pub struct TreeIndex {
    nodes: Vec<Node>,
    slots: HashMap<i64, usize>,
    children: HashMap<i64, Vec<i64>>,
    max_depth: usize,
}

impl TreeIndex {
    /// Build from `(id, parent, label)` rows. Children keep the input order, so
    /// feed rows sorted the way siblings should be listed.
    pub fn build<I, S>(rows: I, max_depth: usize) -> Self
    where
        I: IntoIterator<Item = (i64, Option<i64>, S)>,
        S: Into<String>,
    {
        let mut nodes = Vec::new();
        let mut slots = HashMap::new();
        for (id, parent, label) in rows {
            if slots.contains_key(&id) {
                continue;
            }
            slots.insert(id, nodes.len());
            nodes.push(Node {
                id,
                parent,
                label: label.into(),
            });
        }

        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for node in &nodes {
            if let Some(parent) = node.parent {
                children.entry(parent).or_default().push(node.id);
            }
        }

        Self {
            nodes,
            slots,
            children,
            max_depth: max_depth.max(1),
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn parent(&self, id: i64) -> Option<i64> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn label(&self, id: i64) -> Option<&str> {
        self.node(id).map(|n| n.label.as_str())
    }

    /// Direct children in insertion order
    pub fn children(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: i64) -> bool {
        !self.children(id).is_empty()
    }

    /// Every node below `id`, excluding `id` itself.
    pub fn descendants(&self, id: i64) -> Result<BTreeSet<i64>, TreeError> {
        if !self.contains(id) {
            return Err(TreeError::UnknownNode(id));
        }

        let mut found = BTreeSet::new();
        let mut stack: Vec<(i64, usize)> = self.children(id).iter().map(|&c| (c, 1)).collect();

        while let Some((current, depth)) = stack.pop() {
            if current == id || !found.insert(current) {
                return Err(TreeError::Cycle(current));
            }
            if depth > self.max_depth {
                return Err(TreeError::TooDeep {
                    node: id,
                    limit: self.max_depth,
                });
            }
            stack.extend(self.children(current).iter().map(|&c| (c, depth + 1)));
        }

        Ok(found)
    }

    /// `id` together with its descendants
    pub fn subtree(&self, id: i64) -> Result<BTreeSet<i64>, TreeError> {
        let mut ids = self.descendants(id)?;
        ids.insert(id);
        Ok(ids)
    }

    /// Path from the root down to `id`, inclusive. A parent missing from the
    /// index terminates the path.
    pub fn ancestors(&self, id: i64) -> Result<Vec<i64>, TreeError> {
        if !self.contains(id) {
            return Err(TreeError::UnknownNode(id));
        }

        let mut path = vec![id];
        let mut seen = HashSet::from([id]);
        let mut current = id;

        while let Some(parent) = self.parent(current) {
            if !self.contains(parent) {
                break;
            }
            if !seen.insert(parent) {
                return Err(TreeError::Cycle(parent));
            }
            if path.len() > self.max_depth {
                return Err(TreeError::TooDeep {
                    node: id,
                    limit: self.max_depth,
                });
            }
            path.push(parent);
            current = parent;
        }

        path.reverse();
        Ok(path)
    }

    /// Labels along the root path joined with `sep`, e.g. "系统管理/菜单管理"
    pub fn path_label(&self, id: i64, sep: &str) -> Result<String, TreeError> {
        let labels: Vec<&str> = self
            .ancestors(id)?
            .into_iter()
            .filter_map(|n| self.label(n))
            .collect();
        Ok(labels.join(sep))
    }

    fn node(&self, id: i64) -> Option<&Node> {
        self.slots.get(&id).map(|&slot| &self.nodes[slot])
    }
}
