use glam::Vec3;

/// Groups a flat index buffer into triangles, checking every index against `vertex_count`.
pub fn triangles_from_indices(indices: &[i32], vertex_count: usize) -> Result<Vec<[u32; 3]>, String> {
    if indices.len() % 3 != 0 {
        return Err(format!(
            "index count {} is not a multiple of 3",
            indices.len()
        ));
    }

    let check = |i: i32| -> Result<u32, String> {
        match u32::try_from(i) {
            Ok(u) if (u as usize) < vertex_count => Ok(u),
            _ => Err(format!(
                "index {i} is out of range for {vertex_count} vertices"
            )),
        }
    };

    indices
        .chunks_exact(3)
        .map(|c| Ok([check(c[0])?, check(c[1])?, check(c[2])?]))
        .collect()
}

/// Per-vertex normals as the normalized sum of the raw edge cross products of incident triangles,
/// so larger faces contribute more.
///
/// Uses pbrt's winding, counter-clockwise triangles in the xy plane face -z.
/// Vertices without a non-degenerate triangle get a zero normal.
pub fn compute_normals(triangles: &[[u32; 3]], positions: &[Vec3]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for &[x, y, z] in triangles {
        let (x, y, z) = (x as usize, y as usize, z as usize);
        let n = (positions[y] - positions[z])
            .cross(positions[x] - positions[z]);

        normals[x] += n;
        normals[y] += n;
        normals[z] += n;
    }

    normals.iter().map(|n| n.normalize_or_zero()).collect()
}

#[cfg(test)]
mod test_super {
    use glam::vec3;

    use super::*;
    use crate::vecmath::vec3_cmp_assert;

    #[test]
    fn test_triangles_from_indices() {
        let tris = triangles_from_indices(&[0, 1, 2, 2, 1, 3], 4).unwrap();
        assert_eq!(tris, vec![[0, 1, 2], [2, 1, 3]]);

        assert!(triangles_from_indices(&[0, 1], 4).is_err());
        assert!(triangles_from_indices(&[0, 1, 4], 4).is_err());
        assert!(triangles_from_indices(&[0, -1, 2], 4).is_err());
    }

    #[test]
    fn test_shared_vertex_normals_are_averaged() {
        // Two faces of a tent meeting at the ridge x = 0
        let positions = [
            vec3(0., 1., 0.),
            vec3(0., 1., 1.),
            vec3(-1., 0., 0.),
            vec3(1., 0., 0.),
        ];
        let triangles = [[0, 2, 1], [0, 1, 3]];

        let normals = compute_normals(&triangles, &positions);
        assert_eq!(normals.len(), 4);
        // The ridge normal is the average of both faces and points straight up or down
        assert!(normals[0].x.abs() < 1e-6);
        assert!(normals[0].z.abs() < 1e-6);
        vec3_cmp_assert(normals[1], normals[0]);
        for n in &normals {
            assert!((n.length() - 1.).abs() < 1e-5);
        }
    }

    #[test]
    fn test_large_faces_dominate() {
        let positions = [
            Vec3::ZERO,
            vec3(10., 0., 0.),
            vec3(0., 10., 0.),
            vec3(0., 0.1, 0.),
            vec3(0., 0., 0.1),
        ];
        // A big face in the xy plane and a tiny one in the yz plane share vertex 0
        let normals = compute_normals(&[[0, 1, 2], [0, 3, 4]], &positions);

        assert!(normals[0].z.abs() > 0.999);
        assert!(normals[0].x.abs() < 1e-3);
        vec3_cmp_assert(normals[1], normals[2]);
        assert_eq!(normals[3].z, 0.);
    }

    #[test]
    fn test_degenerate_triangle() {
        let positions = [Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, Vec3::X];
        let normals = compute_normals(&[[0, 1, 2]], &positions);
        assert_eq!(normals, vec![Vec3::ZERO; 4]);
    }
}
