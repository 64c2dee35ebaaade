//! dist_toolkit - 效果、模型与位图字体数据
//!
//! 三种资源容器共用一套分块二进制格式：4 字节魔数标记的外层块、
//! 版本号、按固定顺序排列的命名子块，子块中是变长整数、可空字段、
//! 动态值等基本编码。
//!
//! # 模块结构
//!
//! - `core`: 配置、日志、错误处理
//! - `math`: 向量、矩阵、颜色等值类型
//! - `format`: DXGI 像素格式
//! - `serialization`: 块帧、基本类型编解码、动态值、容器加载状态机
//! - `effect`: `EffectData`（着色器、效果、技术、通道）
//! - `model`: `ModelData`（材质、骨骼、网格）以及 OBJ 导入
//! - `font`: `SpriteFontData`（MakeSpriteFont 与 BMFont 两种既有格式）
//!
//! # 使用示例
//!
//! ```
//! use dist_toolkit::effect::{EffectData, Shader, ShaderType};
//! use dist_toolkit::serialization::Container;
//!
//! let mut data = EffectData::new();
//! data.shaders.push(Shader::new(ShaderType::Pixel, vec![0x01, 0x02]));
//!
//! let bytes = data.save()?;
//! let loaded = EffectData::load(&bytes)?.expect("TKFX magic");
//! assert_eq!(loaded.shaders[0].bytecode, [0x01, 0x02]);
//!
//! // 不是这种格式时返回 None 而不是错误
//! assert!(EffectData::load(b"TKMD\0\0\0\0")?.is_none());
//! # Ok::<(), dist_toolkit::core::DistToolkitError>(())
//! ```

pub mod core;
pub mod effect;
pub mod font;
pub mod format;
pub mod math;
pub mod model;
pub mod serialization;
