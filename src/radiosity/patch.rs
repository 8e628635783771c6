// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Radiosity patches: surfaces subdivided to an area cap, each carrying
//! the area/normal/reflectance/emission state the shooting solver needs.

use crate::geometry::{Polygon, Surface, Vector3};

/// A `(polygon, material, parent_surface_id)` triple produced by
/// subdividing an input [`Surface`] to an `area <= patch_max_area` cap.
#[derive(Clone, Debug)]
pub struct Patch {
    pub id: String,
    pub parent_surface_id: String,
    pub polygon: Polygon,
    pub area: f64,
    pub normal: Vector3,
    pub centroid: Vector3,
    pub reflectance: f64,
    pub two_sided: bool,
}

/// Subdivide every surface so each resulting patch has `area <=
/// patch_max_area`, tagging patches with stable, order-derived ids
/// `"{parent_surface_id}__patch_{running_index}"`.
pub fn create_patches(surfaces: &[Surface], patch_max_area: f64) -> Vec<Patch> {
    let max_area = patch_max_area.max(1e-6);
    let mut patches = Vec::new();
    for surface in surfaces {
        let polys = if surface.area() > max_area {
            surface.polygon.subdivide(max_area)
        } else {
            vec![surface.polygon.clone()]
        };
        for poly in polys {
            let area = poly.area().max(1e-12);
            let normal = poly.normal();
            let centroid = poly.centroid();
            patches.push(Patch {
                id: format!("{}__patch_{}", surface.id, patches.len()),
                parent_surface_id: surface.id.clone(),
                polygon: poly,
                area,
                normal,
                centroid,
                reflectance: surface.material.photopic_reflectance(),
                two_sided: surface.two_sided,
            });
        }
    }
    patches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Material;

    fn square_surface(id: &str, reflectance: f64) -> Surface {
        let poly = Polygon::new(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(2.0, 2.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        ]);
        Surface::new(id, poly, Material::new("m", [reflectance; 3]))
    }

    #[test]
    fn small_surface_yields_single_patch() {
        let surfaces = vec![square_surface("floor", 0.5)];
        let patches = create_patches(&surfaces, 10.0);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].id, "floor__patch_0");
        assert_eq!(patches[0].parent_surface_id, "floor");
    }

    #[test]
    fn large_surface_is_subdivided_and_stably_ided() {
        let surfaces = vec![square_surface("wall", 0.2)];
        let patches = create_patches(&surfaces, 1.0);
        assert!(patches.len() > 1);
        for (i, p) in patches.iter().enumerate() {
            assert_eq!(p.id, format!("wall__patch_{i}"));
            assert!(p.area <= 1.0 + 1e-9);
        }
        let total: f64 = patches.iter().map(|p| p.area).sum();
        assert!((total - 4.0).abs() < 1e-6);
    }

    #[test]
    fn patch_ids_run_continuously_across_surfaces() {
        let surfaces = vec![square_surface("a", 0.3), square_surface("b", 0.3)];
        let patches = create_patches(&surfaces, 10.0);
        assert_eq!(patches[0].id, "a__patch_0");
        assert_eq!(patches[1].id, "b__patch_1");
    }
}
