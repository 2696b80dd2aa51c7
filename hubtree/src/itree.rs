/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

//! An append-only rooted tree over parallel arrays. Vertices are never
//! removed or reparented, and ids are assigned strictly sequentially, so a
//! single writer can grow it while readers hold plain indices.

use pointset::PointIndex;
use smallvec::SmallVec;

/// The insert tree: `items`, `parents` and `levels` are index-parallel, and
/// each vertex carries the ordered list of its children. Construction code
/// must funnel all [`InsertTree::add_vertex`] calls through one writer.
#[derive(Debug, Default, Clone)]
pub struct InsertTree {
    items: Vec<PointIndex>,
    parents: Vec<Option<usize>>,
    levels: Vec<usize>,
    children: Vec<SmallVec<[usize; 8]>>,
    nlevels: usize,
}

impl InsertTree {
    /// An empty tree.
    pub fn new() -> InsertTree {
        InsertTree::default()
    }

    /// Appends a vertex for `item` under `parent` (`None` makes it the
    /// root), records it in the parent's children and returns its id. Ids
    /// and levels are monotone in insertion order for any fixed parent.
    pub fn add_vertex(&mut self, item: PointIndex, parent: Option<usize>) -> usize {
        let vertex = self.items.len();
        let level = match parent {
            Some(p) => {
                assert!(p < vertex, "parent {} of vertex {} does not exist", p, vertex);
                self.children[p].push(vertex);
                self.levels[p] + 1
            }
            None => {
                assert!(vertex == 0, "vertex {} has no parent but is not the root", vertex);
                0
            }
        };
        self.items.push(item);
        self.parents.push(parent);
        self.levels.push(level);
        self.children.push(SmallVec::new());
        self.nlevels = self.nlevels.max(level + 1);
        vertex
    }

    /// The item stored at a vertex.
    #[inline]
    pub fn item(&self, vertex: usize) -> PointIndex {
        self.items[vertex]
    }

    /// The parent of a vertex, `None` for the root.
    #[inline]
    pub fn parent(&self, vertex: usize) -> Option<usize> {
        self.parents[vertex]
    }

    /// Depth from the root, root is 0.
    #[inline]
    pub fn level(&self, vertex: usize) -> usize {
        self.levels[vertex]
    }

    /// Read-only view of a vertex's children, in insertion order.
    #[inline]
    pub fn get_children(&self, vertex: usize) -> &[usize] {
        &self.children[vertex]
    }

    /// The number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.items.len()
    }

    /// The number of levels; one more than the deepest vertex's level.
    pub fn num_levels(&self) -> usize {
        self.nlevels
    }

    /// If this is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Empties everything.
    pub fn clear(&mut self) {
        self.items.clear();
        self.parents.clear();
        self.levels.clear();
        self.children.clear();
        self.nlevels = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_follow_parents() {
        let mut tree = InsertTree::new();
        let root = tree.add_vertex(7, None);
        let a = tree.add_vertex(3, Some(root));
        let b = tree.add_vertex(5, Some(root));
        let c = tree.add_vertex(1, Some(a));

        assert_eq!(root, 0);
        assert_eq!(tree.num_vertices(), 4);
        assert_eq!(tree.num_levels(), 3);
        assert_eq!(tree.level(root), 0);
        assert_eq!(tree.level(b), 1);
        assert_eq!(tree.level(c), 2);
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.parent(c), Some(a));
        assert_eq!(tree.get_children(root), &[a, b]);
        assert_eq!(tree.item(a), 3);
    }

    #[test]
    fn ids_are_sequential() {
        let mut tree = InsertTree::new();
        let root = tree.add_vertex(0, None);
        for i in 1..10 {
            let v = tree.add_vertex(i, Some(root));
            assert_eq!(v, i);
        }
        assert_eq!(tree.get_children(root).len(), 9);
    }

    #[test]
    fn clear_empties_everything() {
        let mut tree = InsertTree::new();
        let root = tree.add_vertex(0, None);
        tree.add_vertex(1, Some(root));
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.num_vertices(), 0);
        assert_eq!(tree.num_levels(), 0);
    }

    #[test]
    #[should_panic]
    fn dangling_parent_is_rejected() {
        let mut tree = InsertTree::new();
        tree.add_vertex(0, Some(3));
    }
}
