// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bottom-level acceleration structure over a single mesh's triangles:
//! recursive median-split build, any-hit/closest-hit traversal, and a
//! flat array-of-structs mirror for cache-friendly repeated queries.

use crate::constants::DEFAULT_BVH_MAX_LEAF;
use crate::geometry::{Aabb, Triangle, Vector3};

enum BlasNode {
    Leaf {
        aabb: Aabb,
        triangles: Vec<Triangle>,
    },
    Interior {
        aabb: Aabb,
        left: Box<BlasNode>,
        right: Box<BlasNode>,
    },
}

impl BlasNode {
    fn aabb(&self) -> Aabb {
        match self {
            BlasNode::Leaf { aabb, .. } => *aabb,
            BlasNode::Interior { aabb, .. } => *aabb,
        }
    }
}

/// A built acceleration structure over one mesh's triangles, in the
/// mesh's own local space.
pub struct Blas {
    root: Option<BlasNode>,
    max_leaf: usize,
}

fn build_node(mut triangles: Vec<Triangle>, max_leaf: usize) -> BlasNode {
    let aabb = Aabb::union_all(triangles.iter().map(|t| t.aabb()).collect::<Vec<_>>().iter())
        .unwrap_or(Aabb::from_points([Vector3::ZERO]));
    if triangles.len() <= max_leaf {
        return BlasNode::Leaf { aabb, triangles };
    }

    let centroids: Vec<Vector3> = triangles.iter().map(|t| t.centroid()).collect();
    let (mut lo, mut hi) = (centroids[0], centroids[0]);
    for c in &centroids {
        lo = Vector3::new(lo.x.min(c.x), lo.y.min(c.y), lo.z.min(c.z));
        hi = Vector3::new(hi.x.max(c.x), hi.y.max(c.y), hi.z.max(c.z));
    }
    let span = (hi.x - lo.x, hi.y - lo.y, hi.z - lo.z);
    let axis = if span.0 >= span.1 && span.0 >= span.2 {
        0
    } else if span.1 >= span.2 {
        1
    } else {
        2
    };
    triangles.sort_by(|a, b| {
        let ca = a.centroid().to_array()[axis];
        let cb = b.centroid().to_array()[axis];
        ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
    });
    let mid = triangles.len() / 2;
    let right_tris = triangles.split_off(mid);
    let left = build_node(triangles, max_leaf);
    let right = build_node(right_tris, max_leaf);
    let merged = left.aabb().union(&right.aabb());
    BlasNode::Interior {
        aabb: merged,
        left: Box::new(left),
        right: Box::new(right),
    }
}

impl Blas {
    pub fn build(triangles: Vec<Triangle>) -> Self {
        Self::build_with_leaf(triangles, DEFAULT_BVH_MAX_LEAF)
    }

    pub fn build_with_leaf(triangles: Vec<Triangle>, max_leaf: usize) -> Self {
        if triangles.is_empty() {
            return Self { root: None, max_leaf };
        }
        Self {
            root: Some(build_node(triangles, max_leaf)),
            max_leaf,
        }
    }

    pub fn aabb(&self) -> Option<Aabb> {
        self.root.as_ref().map(|n| n.aabb())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// True if any triangle blocks the segment `[t_min, t_max]` along the
    /// given ray, in the BLAS's local space.
    pub fn any_hit(&self, origin: Vector3, direction: Vector3, t_min: f64, t_max: f64) -> bool {
        match &self.root {
            None => false,
            Some(node) => Self::any_hit_node(node, origin, direction, t_min, t_max),
        }
    }

    fn any_hit_node(node: &BlasNode, origin: Vector3, direction: Vector3, t_min: f64, t_max: f64) -> bool {
        if !node.aabb().intersects_ray(origin, direction, t_min, t_max) {
            return false;
        }
        match node {
            BlasNode::Leaf { triangles, .. } => triangles
                .iter()
                .any(|tri| tri.intersect(origin, direction, t_min, t_max).is_some()),
            BlasNode::Interior { left, right, .. } => {
                Self::any_hit_node(left, origin, direction, t_min, t_max)
                    || Self::any_hit_node(right, origin, direction, t_min, t_max)
            }
        }
    }

    /// Nearest hit distance and triangle payload along the ray, in local
    /// space.
    pub fn closest_hit(
        &self,
        origin: Vector3,
        direction: Vector3,
        t_min: f64,
        t_max: f64,
    ) -> Option<(f64, Triangle)> {
        let mut best: Option<(f64, Triangle)> = None;
        if let Some(node) = &self.root {
            Self::closest_hit_node(node, origin, direction, t_min, t_max, &mut best);
        }
        best
    }

    fn closest_hit_node(
        node: &BlasNode,
        origin: Vector3,
        direction: Vector3,
        t_min: f64,
        t_max: f64,
        best: &mut Option<(f64, Triangle)>,
    ) {
        let hi = best.as_ref().map(|(t, _)| *t).unwrap_or(t_max);
        if !node.aabb().intersects_ray(origin, direction, t_min, hi) {
            return;
        }
        match node {
            BlasNode::Leaf { triangles, .. } => {
                for tri in triangles {
                    let cur_hi = best.as_ref().map(|(t, _)| *t).unwrap_or(t_max);
                    if let Some(t) = tri.intersect(origin, direction, t_min, cur_hi) {
                        *best = Some((t, *tri));
                    }
                }
            }
            BlasNode::Interior { left, right, .. } => {
                Self::closest_hit_node(left, origin, direction, t_min, t_max, best);
                Self::closest_hit_node(right, origin, direction, t_min, t_max, best);
            }
        }
    }

    /// Recompute bounds bottom-up without reallocating the tree shape,
    /// for when triangle positions move but topology doesn't (e.g. an
    /// instance transform update).
    pub fn refit(&mut self, new_triangles: &[Triangle]) {
        if let Some(root) = &mut self.root {
            let mut cursor = 0usize;
            Self::refit_node(root, new_triangles, &mut cursor);
        }
    }

    fn refit_node(node: &mut BlasNode, new_triangles: &[Triangle], cursor: &mut usize) {
        match node {
            BlasNode::Leaf { aabb, triangles } => {
                let count = triangles.len();
                triangles.clear();
                triangles.extend_from_slice(&new_triangles[*cursor..*cursor + count]);
                *cursor += count;
                *aabb = Aabb::union_all(triangles.iter().map(|t| t.aabb()).collect::<Vec<_>>().iter())
                    .unwrap_or(Aabb::from_points([Vector3::ZERO]));
            }
            BlasNode::Interior { aabb, left, right } => {
                Self::refit_node(left, new_triangles, cursor);
                Self::refit_node(right, new_triangles, cursor);
                *aabb = left.aabb().union(&right.aabb());
            }
        }
    }

    /// Flatten to index-based arrays, ordered depth-first, for
    /// cache-friendly repeated traversal without pointer chasing.
    pub fn flatten(&self) -> FlatBlas {
        let mut nodes = Vec::new();
        let mut triangles = Vec::new();
        if let Some(root) = &self.root {
            Self::flatten_node(root, &mut nodes, &mut triangles);
        }
        FlatBlas { nodes, triangles }
    }

    fn flatten_node(node: &BlasNode, nodes: &mut Vec<FlatNode>, triangles: &mut Vec<Triangle>) -> usize {
        let idx = nodes.len();
        nodes.push(FlatNode {
            aabb: node.aabb(),
            left: -1,
            right: -1,
            tri_start: -1,
            tri_count: 0,
        });
        match node {
            BlasNode::Leaf { triangles: leaf_tris, .. } => {
                let start = triangles.len();
                triangles.extend_from_slice(leaf_tris);
                nodes[idx].tri_start = start as i32;
                nodes[idx].tri_count = leaf_tris.len() as i32;
            }
            BlasNode::Interior { left, right, .. } => {
                let li = Self::flatten_node(left, nodes, triangles);
                let ri = Self::flatten_node(right, nodes, triangles);
                nodes[idx].left = li as i32;
                nodes[idx].right = ri as i32;
            }
        }
        idx
    }
}

#[derive(Clone, Copy, Debug)]
struct FlatNode {
    aabb: Aabb,
    left: i32,
    right: i32,
    tri_start: i32,
    tri_count: i32,
}

/// Depth-first flattened mirror of a [`Blas`]. Traversal is iterative
/// with an explicit stack rather than recursive, avoiding pointer
/// chasing through `Box`.
pub struct FlatBlas {
    nodes: Vec<FlatNode>,
    triangles: Vec<Triangle>,
}

impl FlatBlas {
    pub fn any_hit(&self, origin: Vector3, direction: Vector3, t_min: f64, t_max: f64) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.aabb.intersects_ray(origin, direction, t_min, t_max) {
                continue;
            }
            if node.tri_count >= 0 && node.tri_start >= 0 {
                let start = node.tri_start as usize;
                let end = start + node.tri_count as usize;
                if self.triangles[start..end]
                    .iter()
                    .any(|tri| tri.intersect(origin, direction, t_min, t_max).is_some())
                {
                    return true;
                }
            } else {
                if node.left >= 0 {
                    stack.push(node.left as usize);
                }
                if node.right >= 0 {
                    stack.push(node.right as usize);
                }
            }
        }
        false
    }
}
