// mesh.rs - inward-facing UV sphere the panorama is painted on

use std::f32::consts::PI;

/// Horizontal and vertical segment counts of the panorama sphere.
pub const WIDTH_SEGMENTS: usize = 60;
pub const HEIGHT_SEGMENTS: usize = 40;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SphereMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Sphere seen from the inside: x is mirrored so the texture reads the right
/// way round for a viewer at the centre. Row 0 of the image sits at the
/// north pole (+Y).
pub fn build_sphere(radius: f32, width_segments: usize, height_segments: usize) -> SphereMesh {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);
    let mut vertices = Vec::with_capacity((ws + 1) * (hs + 1));
    let mut indices = Vec::with_capacity(ws * hs * 6);

    for iy in 0..=hs {
        let v = iy as f32 / hs as f32;
        let theta = v * PI;
        let y = radius * theta.cos();
        let sin_t = theta.sin();

        for ix in 0..=ws {
            let u = ix as f32 / ws as f32;
            let phi = u * 2.0 * PI;
            vertices.push(Vertex {
                position: [radius * phi.cos() * sin_t, y, radius * phi.sin() * sin_t],
                uv: [u, v],
            });
        }
    }

    let row = (ws + 1) as u32;
    for iy in 0..hs as u32 {
        for ix in 0..ws as u32 {
            let a = iy * row + ix;
            let b = a + row;
            // pole rows collapse to a point; skip their degenerate halves
            if iy != 0 {
                indices.extend_from_slice(&[a, b, a + 1]);
            }
            if iy != hs as u32 - 1 {
                indices.extend_from_slice(&[b, b + 1, a + 1]);
            }
        }
    }

    SphereMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertices_lie_on_the_sphere() {
        let mesh = build_sphere(60.0, WIDTH_SEGMENTS, HEIGHT_SEGMENTS);
        assert_eq!(mesh.vertices.len(), 61 * 41);
        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            assert!(((x * x + y * y + z * z).sqrt() - 60.0).abs() < 1e-3);
        }
        assert_eq!(mesh.vertices[0].position[1], 60.0);
        assert_eq!(mesh.vertices[0].uv, [0.0, 0.0]);
    }

    #[test]
    fn indices_skip_pole_degenerates() {
        let mesh = build_sphere(1.0, 4, 3);
        // 4 segments * (1 + 2 + 1) triangles
        assert_eq!(mesh.indices.len(), 4 * 4 * 3);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }
}
