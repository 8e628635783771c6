// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Top-level acceleration structure: a collection of instances, each a
//! world transform applied to a shared mesh BLAS. Instances are
//! themselves bounded by a median-split BVH over their world AABBs (the
//! same largest-axis centroid split [`crate::bvh::blas`] uses for
//! triangles), so a scene with many instances gets hierarchical pruning
//! rather than a linear scan. Queries transform the ray into each
//! candidate instance's local space rather than transforming geometry
//! into world space, so a BLAS is built once per mesh and reused across
//! however many instances reference it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::DEFAULT_BVH_MAX_LEAF;
use crate::geometry::{Aabb, Transform, Triangle, TrianglePayload, Vector3};

use super::blas::Blas;

pub struct Instance {
    pub instance_id: u32,
    pub mesh_id: u32,
    pub transform: Transform,
}

enum WorldNode {
    Leaf { aabb: Aabb, members: Vec<usize> },
    Interior { aabb: Aabb, left: Box<WorldNode>, right: Box<WorldNode> },
}

impl WorldNode {
    fn aabb(&self) -> Aabb {
        match self {
            WorldNode::Leaf { aabb, .. } => *aabb,
            WorldNode::Interior { aabb, .. } => *aabb,
        }
    }
}

/// Median-split a set of instance indices by their world AABB centroid
/// along the largest-span axis, mirroring `blas::build_node`'s heuristic.
fn build_world_node(mut members: Vec<usize>, aabbs: &[Aabb], max_leaf: usize) -> WorldNode {
    let aabb = Aabb::union_all(members.iter().map(|&i| &aabbs[i])).unwrap_or(Aabb::from_points([Vector3::ZERO]));
    if members.len() <= max_leaf {
        return WorldNode::Leaf { aabb, members };
    }

    let centroids: Vec<Vector3> = members.iter().map(|&i| aabbs[i].centroid()).collect();
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
    members.sort_by(|&a, &b| {
        let ca = aabbs[a].centroid().to_array()[axis];
        let cb = aabbs[b].centroid().to_array()[axis];
        ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
    });
    let mid = members.len() / 2;
    let right_members = members.split_off(mid);
    let left = build_world_node(members, aabbs, max_leaf);
    let right = build_world_node(right_members, aabbs, max_leaf);
    let merged = left.aabb().union(&right.aabb());
    WorldNode::Interior {
        aabb: merged,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn build_world_bvh(aabbs: &[Aabb], max_leaf: usize) -> Option<WorldNode> {
    if aabbs.is_empty() {
        return None;
    }
    Some(build_world_node((0..aabbs.len()).collect(), aabbs, max_leaf))
}

/// Two-level BVH: a registry of mesh BLASes, a flat list of world
/// instances each referencing one by `mesh_id`, and a BVH over their
/// world AABBs. `tlas_rebuild_count` increments whenever instance
/// topology (the instance or BLAS registry) changes; `refit_count`
/// increments whenever only transforms change and the tree is refit in
/// place, per spec invariant S5.
pub struct Tlas {
    blas_by_mesh: HashMap<u32, Arc<Blas>>,
    instances: Vec<Instance>,
    world_aabbs: Vec<Aabb>,
    world_bvh: Option<WorldNode>,
    refit_count: u64,
    tlas_rebuild_count: u64,
}

impl Tlas {
    pub fn build(blas_by_mesh: HashMap<u32, Arc<Blas>>, instances: Vec<Instance>) -> Self {
        let world_aabbs = instances
            .iter()
            .map(|inst| Self::instance_world_aabb(inst, &blas_by_mesh))
            .collect::<Vec<_>>();
        let world_bvh = build_world_bvh(&world_aabbs, DEFAULT_BVH_MAX_LEAF);
        Self {
            blas_by_mesh,
            instances,
            world_aabbs,
            world_bvh,
            refit_count: 0,
            tlas_rebuild_count: 1,
        }
    }

    /// Replace the instance/BLAS registry and rebuild the world BVH from
    /// scratch. Use when instances are added/removed or a mesh is
    /// re-triangulated; use [`Tlas::refit`] when only transforms move.
    pub fn rebuild(&mut self, blas_by_mesh: HashMap<u32, Arc<Blas>>, instances: Vec<Instance>) {
        let world_aabbs = instances
            .iter()
            .map(|inst| Self::instance_world_aabb(inst, &blas_by_mesh))
            .collect::<Vec<_>>();
        self.world_bvh = build_world_bvh(&world_aabbs, DEFAULT_BVH_MAX_LEAF);
        self.blas_by_mesh = blas_by_mesh;
        self.instances = instances;
        self.world_aabbs = world_aabbs;
        self.tlas_rebuild_count += 1;
    }

    fn instance_world_aabb(inst: &Instance, blas_by_mesh: &HashMap<u32, Arc<Blas>>) -> Aabb {
        match blas_by_mesh.get(&inst.mesh_id).and_then(|b| b.aabb()) {
            Some(local) => {
                let corners = [
                    Vector3::new(local.min.x, local.min.y, local.min.z),
                    Vector3::new(local.max.x, local.min.y, local.min.z),
                    Vector3::new(local.min.x, local.max.y, local.min.z),
                    Vector3::new(local.max.x, local.max.y, local.min.z),
                    Vector3::new(local.min.x, local.min.y, local.max.z),
                    Vector3::new(local.max.x, local.min.y, local.max.z),
                    Vector3::new(local.min.x, local.max.y, local.max.z),
                    Vector3::new(local.max.x, local.max.y, local.max.z),
                ];
                Aabb::from_points(corners.into_iter().map(|c| inst.transform.transform_point(c)))
            }
            None => Aabb::from_points([inst.transform.position]),
        }
    }

    /// Recompute per-instance world bounds and the world BVH's bounds
    /// after transforms change, without rebuilding the tree's topology.
    pub fn refit(&mut self) {
        self.world_aabbs = self
            .instances
            .iter()
            .map(|inst| Self::instance_world_aabb(inst, &self.blas_by_mesh))
            .collect();
        if let Some(root) = &mut self.world_bvh {
            Self::refit_world_node(root, &self.world_aabbs);
        }
        self.refit_count += 1;
    }

    fn refit_world_node(node: &mut WorldNode, aabbs: &[Aabb]) {
        match node {
            WorldNode::Leaf { aabb, members } => {
                *aabb = Aabb::union_all(members.iter().map(|&i| &aabbs[i])).unwrap_or(Aabb::from_points([Vector3::ZERO]));
            }
            WorldNode::Interior { aabb, left, right } => {
                Self::refit_world_node(left, aabbs);
                Self::refit_world_node(right, aabbs);
                *aabb = left.aabb().union(&right.aabb());
            }
        }
    }

    pub fn refit_count(&self) -> u64 {
        self.refit_count
    }

    pub fn tlas_rebuild_count(&self) -> u64 {
        self.tlas_rebuild_count
    }

    pub fn any_hit(&self, origin: Vector3, direction: Vector3, t_min: f64, t_max: f64) -> bool {
        let Some(root) = &self.world_bvh else {
            return false;
        };
        Self::any_hit_node(root, self, origin, direction, t_min, t_max)
    }

    fn any_hit_node(node: &WorldNode, tlas: &Tlas, origin: Vector3, direction: Vector3, t_min: f64, t_max: f64) -> bool {
        if !node.aabb().intersects_ray(origin, direction, t_min, t_max) {
            return false;
        }
        match node {
            WorldNode::Leaf { members, .. } => members.iter().any(|&i| tlas.instance_any_hit(i, origin, direction, t_min, t_max)),
            WorldNode::Interior { left, right, .. } => {
                Self::any_hit_node(left, tlas, origin, direction, t_min, t_max)
                    || Self::any_hit_node(right, tlas, origin, direction, t_min, t_max)
            }
        }
    }

    fn instance_any_hit(&self, idx: usize, origin: Vector3, direction: Vector3, t_min: f64, t_max: f64) -> bool {
        if !self.world_aabbs[idx].intersects_ray(origin, direction, t_min, t_max) {
            return false;
        }
        let inst = &self.instances[idx];
        let Some(blas) = self.blas_by_mesh.get(&inst.mesh_id) else {
            return false;
        };
        let local_origin = world_to_local_point(inst, origin);
        let local_dir = world_to_local_direction(inst, direction);
        blas.any_hit(local_origin, local_dir, t_min, t_max)
    }

    pub fn closest_hit(
        &self,
        origin: Vector3,
        direction: Vector3,
        t_min: f64,
        t_max: f64,
    ) -> Option<(f64, TrianglePayload)> {
        let mut best: Option<(f64, TrianglePayload)> = None;
        if let Some(root) = &self.world_bvh {
            self.closest_hit_node(root, origin, direction, t_min, t_max, &mut best);
        }
        best
    }

    fn closest_hit_node(
        &self,
        node: &WorldNode,
        origin: Vector3,
        direction: Vector3,
        t_min: f64,
        t_max: f64,
        best: &mut Option<(f64, TrianglePayload)>,
    ) {
        let hi = best.as_ref().map(|(t, _)| *t).unwrap_or(t_max);
        if !node.aabb().intersects_ray(origin, direction, t_min, hi) {
            return;
        }
        match node {
            WorldNode::Leaf { members, .. } => {
                for &idx in members {
                    let cur_hi = best.as_ref().map(|(t, _)| *t).unwrap_or(t_max);
                    if !self.world_aabbs[idx].intersects_ray(origin, direction, t_min, cur_hi) {
                        continue;
                    }
                    let inst = &self.instances[idx];
                    let Some(blas) = self.blas_by_mesh.get(&inst.mesh_id) else {
                        continue;
                    };
                    let local_origin = world_to_local_point(inst, origin);
                    let local_dir = world_to_local_direction(inst, direction);
                    if let Some((t, tri)) = blas.closest_hit(local_origin, local_dir, t_min, cur_hi) {
                        let mut payload = tri.payload;
                        payload.instance_id = inst.instance_id;
                        *best = Some((t, payload));
                    }
                }
            }
            WorldNode::Interior { left, right, .. } => {
                self.closest_hit_node(left, origin, direction, t_min, t_max, best);
                self.closest_hit_node(right, origin, direction, t_min, t_max, best);
            }
        }
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

/// World point to instance-local space: undo translation, rotation, then
/// scale. Hit distances from a scaled instance are in local units; for
/// the uniform-scale-1 instances this engine typically builds, local and
/// world distances coincide.
fn world_to_local_point(inst: &Instance, p: Vector3) -> Vector3 {
    let rotated = inst.transform.inverse_transform_direction(p - inst.transform.position);
    Vector3::new(
        rotated.x / inst.transform.scale.x.max(1e-12),
        rotated.y / inst.transform.scale.y.max(1e-12),
        rotated.z / inst.transform.scale.z.max(1e-12),
    )
}

/// World direction to instance-local space, renormalized so that a `t`
/// found in local space is still a valid distance in world units. Under
/// non-uniform scale, dividing by `scale` per axis changes the vector's
/// length; renormalizing and instead scaling the `t_min`/`t_max` bounds
/// passed in would be the alternative, but callers pass world-unit
/// bounds, so the direction itself must stay unit-length.
fn world_to_local_direction(inst: &Instance, d: Vector3) -> Vector3 {
    let rotated = inst.transform.inverse_transform_direction(d);
    let scaled = Vector3::new(
        rotated.x / inst.transform.scale.x.max(1e-12),
        rotated.y / inst.transform.scale.y.max(1e-12),
        rotated.z / inst.transform.scale.z.max(1e-12),
    );
    let len = scaled.length();
    if len < 1e-12 {
        scaled
    } else {
        scaled / len
    }
}

pub fn triangulate_mesh(surfaces: &[(u32, crate::geometry::Polygon, bool)], mesh_id: u32) -> Vec<Triangle> {
    let mut out = Vec::new();
    for (surface_id, polygon, two_sided) in surfaces {
        let payload = TrianglePayload {
            instance_id: 0,
            mesh_id,
            surface_id: *surface_id,
        };
        out.extend(polygon.to_triangles(payload, *two_sided));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mat3, Polygon};

    fn unit_quad_blas() -> Arc<Blas> {
        let poly = Polygon::new(vec![
            Vector3::new(-1.0, -1.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(-1.0, 1.0, 0.0),
        ]);
        let tris = triangulate_mesh(&[(0, poly, true)], 0);
        Arc::new(Blas::build(tris))
    }

    #[test]
    fn hits_translated_instance() {
        let mut registry = HashMap::new();
        registry.insert(0u32, unit_quad_blas());
        let instances = vec![Instance {
            instance_id: 0,
            mesh_id: 0,
            transform: Transform::new(Vector3::new(0.0, 0.0, 5.0), Mat3::IDENTITY, Vector3::new(1.0, 1.0, 1.0)),
        }];
        let tlas = Tlas::build(registry, instances);
        assert!(tlas.any_hit(Vector3::new(0.0, 0.0, 0.0), Vector3::UNIT_Z, 0.0, f64::INFINITY));
        assert!(!tlas.any_hit(Vector3::new(10.0, 10.0, 0.0), Vector3::UNIT_Z, 0.0, f64::INFINITY));
    }

    #[test]
    fn closest_hit_reports_instance_id() {
        let mut registry = HashMap::new();
        registry.insert(0u32, unit_quad_blas());
        let instances = vec![
            Instance {
                instance_id: 7,
                mesh_id: 0,
                transform: Transform::new(Vector3::new(0.0, 0.0, 5.0), Mat3::IDENTITY, Vector3::new(1.0, 1.0, 1.0)),
            },
            Instance {
                instance_id: 9,
                mesh_id: 0,
                transform: Transform::new(Vector3::new(0.0, 0.0, 10.0), Mat3::IDENTITY, Vector3::new(1.0, 1.0, 1.0)),
            },
        ];
        let tlas = Tlas::build(registry, instances);
        let hit = tlas.closest_hit(Vector3::ZERO, Vector3::UNIT_Z, 0.0, f64::INFINITY);
        assert_eq!(hit.unwrap().1.instance_id, 7);
    }

    #[test]
    fn many_instances_are_pruned_by_the_world_bvh() {
        let mut registry = HashMap::new();
        registry.insert(0u32, unit_quad_blas());
        let instances = (0..200)
            .map(|i| Instance {
                instance_id: i as u32,
                mesh_id: 0,
                transform: Transform::new(Vector3::new(i as f64 * 10.0, 0.0, 5.0), Mat3::IDENTITY, Vector3::new(1.0, 1.0, 1.0)),
            })
            .collect::<Vec<_>>();
        let tlas = Tlas::build(registry, instances);
        assert_eq!(tlas.tlas_rebuild_count(), 1);
        assert_eq!(tlas.refit_count(), 0);
        assert!(tlas.any_hit(Vector3::new(1230.0, 0.0, 0.0), Vector3::UNIT_Z, 0.0, f64::INFINITY));
        assert!(!tlas.any_hit(Vector3::new(1235.0, 5.0, 0.0), Vector3::UNIT_Z, 0.0, f64::INFINITY));
    }

    #[test]
    fn refit_moves_hit_without_touching_rebuild_count() {
        let mut registry = HashMap::new();
        registry.insert(0u32, unit_quad_blas());
        let instances = vec![Instance {
            instance_id: 0,
            mesh_id: 0,
            transform: Transform::new(Vector3::ZERO, Mat3::IDENTITY, Vector3::new(1.0, 1.0, 1.0)),
        }];
        let mut tlas = Tlas::build(registry, instances);
        assert!(tlas.any_hit(Vector3::new(0.0, 0.0, -10.0), Vector3::UNIT_Z, 0.0, f64::INFINITY));

        tlas.instances[0].transform.position = Vector3::new(5.0, 0.0, 0.0);
        tlas.refit();

        assert!(!tlas.any_hit(Vector3::new(0.0, 0.0, -10.0), Vector3::UNIT_Z, 0.0, f64::INFINITY));
        assert!(tlas.any_hit(Vector3::new(5.0, 0.0, -10.0), Vector3::UNIT_Z, 0.0, f64::INFINITY));
        assert_eq!(tlas.refit_count(), 1);
        assert_eq!(tlas.tlas_rebuild_count(), 1);
    }
}
