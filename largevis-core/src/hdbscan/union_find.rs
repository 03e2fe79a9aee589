//! Arena-backed union-find used while building the dendrogram.
//!
//! Besides the usual parent and rank arrays, each root tracks the size of its
//! component, the density level at which it was last merged, and the
//! dendrogram node currently representing it.

#[derive(Clone, Debug)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
    size: Vec<usize>,
    birth_lambda: Vec<f32>,
    component_node: Vec<usize>,
}

impl DisjointSet {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            size: vec![1; n],
            birth_lambda: vec![f32::INFINITY; n],
            component_node: (0..n).collect(),
        }
    }

    pub(crate) fn find(&mut self, mut node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[node] != node {
            let parent = self.parent[node];
            self.parent[node] = root;
            node = parent;
        }

        root
    }

    /// Joins the components of `left` and `right` at density `lambda`.
    ///
    /// Returns the new root, or `None` when both already share a component.
    pub(crate) fn union(&mut self, left: usize, right: usize, lambda: f32) -> Option<usize> {
        let mut left = self.find(left);
        let mut right = self.find(right);
        if left == right {
            return None;
        }
        if self.rank[left] < self.rank[right] {
            std::mem::swap(&mut left, &mut right);
        }
        self.parent[right] = left;
        if self.rank[left] == self.rank[right] {
            self.rank[left] = self.rank[left].saturating_add(1);
        }
        self.size[left] += self.size[right];
        self.birth_lambda[left] = lambda;
        Some(left)
    }

    /// Size of the component rooted at `root`.
    pub(crate) fn size(&self, root: usize) -> usize {
        self.size[root]
    }

    /// Lambda of the last merge that formed the component rooted at `root`;
    /// infinite for singletons.
    pub(crate) fn birth_lambda(&self, root: usize) -> f32 {
        self.birth_lambda[root]
    }

    pub(crate) fn component_node(&self, root: usize) -> usize {
        self.component_node[root]
    }

    pub(crate) fn set_component_node(&mut self, root: usize, node: usize) {
        self.component_node[root] = node;
    }
}
