use glam::{vec2, vec3, Vec3};

use crate::pbrt_loader::scene_description::Mesh;

const SPHERE_STEPS: u32 = 16;

/// Cube spanning [-1, 1]^3, each face is split into `steps` x `steps` quads.
fn make_uvcube(steps: u32) -> Mesh {
    // Face normal, u axis, v axis
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (-Vec3::Z, -Vec3::X, Vec3::Y),
        (Vec3::X, -Vec3::Z, Vec3::Y),
        (-Vec3::X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, -Vec3::Z),
        (-Vec3::Y, Vec3::X, Vec3::Z),
    ];

    let mut mesh = Mesh::default();
    let row = steps + 1;

    for (normal, u_axis, v_axis) in faces {
        let base = mesh.positions.len() as u32;

        for j in 0..=steps {
            for i in 0..=steps {
                let u = i as f32 / steps as f32;
                let v = j as f32 / steps as f32;

                mesh.positions
                    .push(normal + u_axis * (2. * u - 1.) + v_axis * (2. * v - 1.));
                mesh.normals.push(normal);
                mesh.uvs.push(vec2(u, v));
            }
        }

        for j in 0..steps {
            for i in 0..steps {
                let idx = |i: u32, j: u32| base + j * row + i;
                mesh.quads
                    .push([idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1)]);
            }
        }
    }

    mesh
}

/// Tessellated debug cube.
pub fn make_cube() -> Mesh {
    make_uvcube(1)
}

/// Sphere made by projecting a subdivided cube onto the sphere.
pub fn make_sphere(radius: f32) -> Mesh {
    let mut mesh = make_uvcube(SPHERE_STEPS);

    for (p, n) in mesh.positions.iter_mut().zip(mesh.normals.iter_mut()) {
        *n = p.normalize();
        *p = *n * radius;
    }

    mesh
}

/// Fixed quad in the xz plane standing in for disks.
pub fn make_disk_placeholder() -> Mesh {
    Mesh {
        positions: vec![
            vec3(5., 0., 5.),
            vec3(-5., 0., 5.),
            vec3(-5., 0., -5.),
            vec3(5., 0., -5.),
        ],
        quads: vec![[0, 1, 2, 3]],
        ..Default::default()
    }
}
