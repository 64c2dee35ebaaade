//! 模型导入器
//!
//! 把外部格式转换为 `ModelData`。目前支持 Wavefront OBJ（通过 tobj）。

use std::io::{BufReader, Cursor};
use std::path::Path;

use crate::core::error::{ImportError, Result};
use crate::math::{BoundingSphere, Color, Matrix4};

use super::bone::Bone;
use super::material::{keys, Material, MaterialKeyRegistry, MaterialTexture, TextureType};
use super::mesh::{BufferRange, IndexBuffer, Mesh, MeshPart, VertexBuffer};
use super::vertex::{compute_tangents, reconstruct_normals, Vertex};
use super::ModelData;

/// 模型导入器接口
pub trait ModelImporter {
    /// 从文件导入
    fn import_file(path: &Path) -> Result<ModelData>;

    /// 从内存导入（外部引用的文件不可用）
    fn import_bytes(data: &[u8]) -> Result<ModelData>;

    fn supported_extensions() -> &'static [&'static str];

    fn supports(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                Self::supported_extensions()
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(ext))
            })
    }
}

/// OBJ 导入器
///
/// - 自动三角化，使用单一索引
/// - V 坐标翻转（`1.0 - v`）
/// - 缺少法线时由面法线重建，有纹理坐标时计算切线
/// - 每个 OBJ 对象生成一个网格，挂在唯一的根骨骼上
/// - MTL 材质转为 `Material`；没有材质的网格引用一个默认材质
pub struct ObjImporter;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

impl ModelImporter for ObjImporter {
    fn import_file(path: &Path) -> Result<ModelData> {
        if !Self::supports(path) {
            return Err(ImportError::UnsupportedFormat(path.display().to_string()).into());
        }
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.to_path_buf()).into());
        }

        let (models, materials) = tobj::load_obj(path, &load_options())
            .map_err(|e| ImportError::ParseError(format!("{}: {}", path.display(), e)))?;
        let materials = materials.unwrap_or_else(|e| {
            crate::codec_warn!(path = %path.display(), error = %e, "MTL not loaded, using default material");
            Vec::new()
        });

        let mut model = build_model(&models, &materials)?;
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            model.properties.set("SourceName", stem);
        }
        Ok(model)
    }

    fn import_bytes(data: &[u8]) -> Result<ModelData> {
        let mut reader = BufReader::new(Cursor::new(data));
        let (models, _) = tobj::load_obj_buf(&mut reader, &load_options(), |_| {
            Err(tobj::LoadError::OpenFileFailed)
        })
        .map_err(|e| ImportError::ParseError(e.to_string()))?;
        build_model(&models, &[])
    }

    fn supported_extensions() -> &'static [&'static str] {
        &["obj"]
    }
}

fn build_model(models: &[tobj::Model], materials: &[tobj::Material]) -> Result<ModelData> {
    if models.is_empty() {
        return Err(ImportError::InvalidGeometry("OBJ contains no objects".to_string()).into());
    }

    let mut data = ModelData::default();
    let mut root = Bone::new(0, Bone::NO_PARENT);
    root.name = Some("Root".to_string());
    root.transform = Matrix4::identity();
    data.bones.push(root);

    data.materials = materials.iter().map(convert_material).collect::<Result<_>>()?;
    let mut default_material = None;

    for model in models {
        let material_index = match model.mesh.material_id.filter(|&id| id < data.materials.len()) {
            Some(id) => id,
            None => *default_material.get_or_insert_with(|| {
                data.materials.push(Material::default());
                data.materials.len() - 1
            }),
        };
        data.meshes.push(convert_mesh(model, material_index as i32)?);
    }

    data.validate()?;
    crate::codec_debug!(
        meshes = data.meshes.len(),
        materials = data.materials.len(),
        "OBJ imported"
    );
    Ok(data)
}

fn convert_mesh(model: &tobj::Model, material_index: i32) -> Result<Mesh> {
    let mesh = &model.mesh;
    if mesh.positions.len() % 3 != 0 {
        return Err(ImportError::InvalidGeometry(format!(
            "'{}': {} position floats",
            model.name,
            mesh.positions.len()
        ))
        .into());
    }
    let vertex_count = mesh.positions.len() / 3;
    if let Some(&bad) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(ImportError::InvalidGeometry(format!(
            "'{}': index {} outside {} vertices",
            model.name, bad, vertex_count
        ))
        .into());
    }

    let has_normals = mesh.normals.len() >= vertex_count * 3;
    let has_texcoords = mesh.texcoords.len() >= vertex_count * 2;

    let mut vertices: Vec<Vertex> = (0..vertex_count)
        .map(|i| {
            let p = &mesh.positions[i * 3..i * 3 + 3];
            let normal = if has_normals {
                let n = &mesh.normals[i * 3..i * 3 + 3];
                [n[0], n[1], n[2]]
            } else {
                [0.0; 3]
            };
            let texcoord = if has_texcoords {
                [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0; 2]
            };
            Vertex::new([p[0], p[1], p[2]], normal, texcoord, [0.0; 3])
        })
        .collect();

    if !has_normals {
        crate::codec_debug!(mesh = %model.name, "reconstructing normals");
        reconstruct_normals(&mut vertices, &mesh.indices);
    }
    if has_texcoords {
        compute_tangents(&mut vertices, &mesh.indices);
    }

    let bounding_sphere = BoundingSphere::from_points(vertices.iter().map(Vertex::position));

    Ok(Mesh {
        name: model.name.clone(),
        parent_bone_index: 0,
        bounding_sphere,
        vertex_buffers: vec![VertexBuffer {
            layout: Vertex::layout(),
            count: vertex_count as i32,
            buffer: bytemuck::cast_slice(&vertices).to_vec(),
        }],
        index_buffers: vec![IndexBuffer::from_u32(&mesh.indices)],
        mesh_parts: vec![MeshPart {
            material_index,
            index_buffer_range: BufferRange::new(0, 0, mesh.indices.len() as i32),
            vertex_buffer_range: BufferRange::new(0, 0, vertex_count as i32),
            ..MeshPart::default()
        }],
        ..Mesh::default()
    })
}

fn convert_material(source: &tobj::Material) -> Result<Material> {
    let registry = MaterialKeyRegistry::standard();
    let key = |name: &str| {
        registry
            .get(name)
            .ok_or_else(|| ImportError::ParseError(format!("material key '{}' not registered", name)))
    };

    let mut material = Material::default();
    let props = &mut material.properties;
    props.set(key(keys::NAME)?, source.name.as_str())?;
    let colors = [
        (keys::DIFFUSE_COLOR, source.diffuse),
        (keys::AMBIENT_COLOR, source.ambient),
        (keys::SPECULAR_COLOR, source.specular),
    ];
    for (name, rgb) in colors {
        if let Some(rgb) = rgb {
            props.set(key(name)?, Color::from_rgb_array(rgb))?;
        }
    }
    let scalars = [
        (keys::SHININESS, source.shininess),
        (keys::OPACITY, source.dissolve),
        (keys::REFRACTION, source.optical_density),
    ];
    for (name, value) in scalars {
        if let Some(value) = value {
            props.set(key(name)?, value)?;
        }
    }

    let textures = [
        (&source.diffuse_texture, TextureType::Diffuse),
        (&source.ambient_texture, TextureType::Ambient),
        (&source.specular_texture, TextureType::Specular),
        (&source.normal_texture, TextureType::Normals),
        (&source.shininess_texture, TextureType::Shininess),
        (&source.dissolve_texture, TextureType::Opacity),
    ];
    for (path, ty) in textures {
        if let Some(path) = path {
            material.textures.push(MaterialTexture::new(path.clone(), ty));
        }
    }
    Ok(material)
}
