//! 导入器生成的标准顶点
//!
//! 位置、法线、纹理坐标、切线，共 44 字节，按 `#[repr(C)]` 紧密排列，
//! 直接以字节形式写入 `VertexBuffer`。

use bytemuck::{Pod, Zeroable};

use crate::format::PixelFormat;
use crate::math::{Vector2, Vector3};

use super::mesh::VertexElement;

#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texcoord: [f32; 2],
    pub tangent: [f32; 3],
}

impl Vertex {
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();

    #[inline]
    pub fn new(position: [f32; 3], normal: [f32; 3], texcoord: [f32; 2], tangent: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            texcoord,
            tangent,
        }
    }

    /// 与内存布局对应的顶点元素声明
    pub fn layout() -> Vec<VertexElement> {
        vec![
            VertexElement::new("POSITION", 0, PixelFormat::R32G32B32_FLOAT, 0),
            VertexElement::new("NORMAL", 0, PixelFormat::R32G32B32_FLOAT, 12),
            VertexElement::new("TEXCOORD", 0, PixelFormat::R32G32_FLOAT, 24),
            VertexElement::new("TANGENT", 0, PixelFormat::R32G32B32_FLOAT, 32),
        ]
    }

    pub fn position(&self) -> Vector3 {
        Vector3::from(self.position)
    }
}

fn triangles(indices: &[u32], vertex_count: usize) -> impl Iterator<Item = [usize; 3]> + '_ {
    indices
        .chunks_exact(3)
        .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
        .filter(move |t| t.iter().all(|&i| i < vertex_count))
}

/// 由三角形面累加并归一化顶点法线
pub fn reconstruct_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut sums = vec![Vector3::zeros(); vertices.len()];
    for [i0, i1, i2] in triangles(indices, vertices.len()) {
        let p0 = vertices[i0].position();
        let face = (vertices[i1].position() - p0).cross(&(vertices[i2].position() - p0));
        for i in [i0, i1, i2] {
            sums[i] += face;
        }
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        vertex.normal = sum.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros).into();
    }
}

/// 由纹理坐标导数计算切线，并对法线做 Gram-Schmidt 正交化
pub fn compute_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    let mut sums = vec![Vector3::zeros(); vertices.len()];
    for [i0, i1, i2] in triangles(indices, vertices.len()) {
        let (v0, v1, v2) = (&vertices[i0], &vertices[i1], &vertices[i2]);
        let dp1 = v1.position() - v0.position();
        let dp2 = v2.position() - v0.position();
        let duv1 = Vector2::from(v1.texcoord) - Vector2::from(v0.texcoord);
        let duv2 = Vector2::from(v2.texcoord) - Vector2::from(v0.texcoord);

        let det = duv1.x * duv2.y - duv1.y * duv2.x;
        if det.abs() < 1e-6 {
            continue;
        }
        let tangent = (dp1 * duv2.y - dp2 * duv1.y) / det;
        for i in [i0, i1, i2] {
            sums[i] += tangent;
        }
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        let n = Vector3::from(vertex.normal);
        let t = sum - n * n.dot(&sum);
        vertex.tangent = t.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros).into();
    }
}
