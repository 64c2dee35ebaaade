//! 数学类型模块
//!
//! 模型、字体和动态值中使用的数学值类型。
//! 向量和矩阵基于 `nalgebra`，颜色、矩形和包围球是普通值类型。

pub use nalgebra::{Matrix4 as Mat4, Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4};

// 类型别名，使用更简洁的名称
pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix4 = Mat4<f32>;

/// 颜色类型（RGBA，范围 0.0-1.0）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// 创建新的颜色
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 创建 RGB 颜色（alpha = 1.0）
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// 从 `[r, g, b]` 数组创建颜色
    pub fn from_rgb_array(rgb: [f32; 3]) -> Self {
        Self::rgb(rgb[0], rgb[1], rgb[2])
    }

    /// 转换为 Vector4
    pub fn to_vec4(&self) -> Vector4 {
        Vector4::new(self.r, self.g, self.b, self.a)
    }

    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
}

/// 整数矩形（左上角 + 尺寸）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// 由左、上、右、下四条边创建
    pub fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// 包围球
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vector3,
    pub radius: f32,
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self {
            center: Vector3::zeros(),
            radius: 0.0,
        }
    }
}

impl BoundingSphere {
    pub fn new(center: Vector3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// 由点集计算包围球
    ///
    /// 球心取轴对齐包围盒中心，半径取最远点距离。空点集返回默认值。
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vector3>,
        I::IntoIter: Clone,
    {
        let iter = points.into_iter();
        let mut min = Vector3::repeat(f32::MAX);
        let mut max = Vector3::repeat(f32::MIN);
        let mut any = false;
        for p in iter.clone() {
            min = min.inf(&p);
            max = max.sup(&p);
            any = true;
        }
        if !any {
            return Self::default();
        }

        let center = (min + max) * 0.5;
        let radius = iter.map(|p| (p - center).norm()).fold(0.0f32, f32::max);
        Self { center, radius }
    }
}
