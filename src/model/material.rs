//! 材质与材质属性
//!
//! 材质属性按 [`MaterialKey`] 存放，每个键规定了值的类型。
//! 键通过 [`MaterialKeyRegistry`] 解析：加载时调用方传入注册表，
//! 不传时使用 [`MaterialKeyRegistry::standard`]。

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use crate::core::error::{Result, SerializationError};
use crate::math::Color;
use crate::serialization::{
    BinaryReader, BinaryWriter, DataSerializable, DynamicValue, ValueKind, WireEnum,
};

crate::wire_enum! {
    /// 纹理用途
    pub enum TextureType: i32, tag = b"TXTY" {
        None = 0,
        Diffuse = 1,
        Specular = 2,
        Ambient = 3,
        Emissive = 4,
        Height = 5,
        Normals = 6,
        Shininess = 7,
        Opacity = 8,
        Displacement = 9,
        Lightmap = 10,
        Reflection = 11,
        Unknown = 12,
    }
}

crate::wire_enum! {
    /// 纹理与前一层的混合方式
    pub enum TextureOperation: i32, tag = b"TXOP" {
        Multiply = 0,
        Add = 1,
        Subtract = 2,
        Divide = 3,
        SmoothAdd = 4,
        SignedAdd = 5,
    }
}

crate::wire_enum! {
    pub enum TextureAddressMode: i32, tag = b"TXAM" {
        Wrap = 0,
        Clamp = 1,
        Mirror = 2,
        Decal = 3,
    }
}

crate::wire_enum! {
    pub enum ShadingMode: i32, tag = b"SHMD" {
        Flat = 1,
        Gouraud = 2,
        Phong = 3,
        Blinn = 4,
        Toon = 5,
        OrenNayar = 6,
        Minnaert = 7,
        CookTorrance = 8,
        NoShading = 9,
        Fresnel = 10,
    }
}

crate::wire_enum! {
    pub enum BlendMode: i32, tag = b"BLMD" {
        Default = 0,
        Additive = 1,
    }
}

/// 材质引用的一张纹理
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTexture {
    /// 纹理文件路径，嵌入纹理使用 `*<下标>` 形式
    pub file_path: String,
    pub ty: TextureType,
    /// 同一用途中的序号
    pub index: i32,
    pub uv_index: i32,
    pub blend_factor: f32,
    pub operation: TextureOperation,
    pub wrap_mode: TextureAddressMode,
    pub flags: i32,
}

impl MaterialTexture {
    pub fn new(file_path: impl Into<String>, ty: TextureType) -> Self {
        Self {
            file_path: file_path.into(),
            ty,
            index: 0,
            uv_index: 0,
            blend_factor: 1.0,
            operation: TextureOperation::Multiply,
            wrap_mode: TextureAddressMode::Wrap,
            flags: 0,
        }
    }

    /// 嵌入纹理在 `ModelData::textures` 中的下标
    pub fn embedded_index(&self) -> Option<usize> {
        self.file_path.strip_prefix('*')?.parse().ok()
    }
}

impl DataSerializable for MaterialTexture {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(&self.file_path)?;
        w.write_enum(self.ty);
        w.write_packed_i32(self.index);
        w.write_packed_i32(self.uv_index);
        w.write_f32(self.blend_factor);
        w.write_enum(self.operation);
        w.write_enum(self.wrap_mode);
        w.write_packed_i32(self.flags);
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            file_path: r.read_string()?,
            ty: r.read_enum()?,
            index: r.read_packed_i32()?,
            uv_index: r.read_packed_i32()?,
            blend_factor: r.read_f32()?,
            operation: r.read_enum()?,
            wrap_mode: r.read_enum()?,
            flags: r.read_packed_i32()?,
        })
    }
}

/// 材质属性键：名称 + 值类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    pub name: String,
    pub kind: ValueKind,
}

impl MaterialKey {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// 标准材质键的名称
pub mod keys {
    pub const NAME: &str = "Name";
    pub const DIFFUSE_COLOR: &str = "DiffuseColor";
    pub const AMBIENT_COLOR: &str = "AmbientColor";
    pub const SPECULAR_COLOR: &str = "SpecularColor";
    pub const EMISSIVE_COLOR: &str = "EmissiveColor";
    pub const TRANSPARENT_COLOR: &str = "TransparentColor";
    pub const REFLECTIVE_COLOR: &str = "ReflectiveColor";
    pub const OPACITY: &str = "Opacity";
    pub const SHININESS: &str = "Shininess";
    pub const SHININESS_STRENGTH: &str = "ShininessStrength";
    pub const REFRACTION: &str = "Refraction";
    pub const REFLECTIVITY: &str = "Reflectivity";
    pub const BUMP_SCALING: &str = "BumpScaling";
    pub const TWO_SIDED: &str = "TwoSided";
    pub const WIREFRAME: &str = "Wireframe";
    pub const SHADING_MODE: &str = "ShadingMode";
    pub const BLEND_MODE: &str = "BlendMode";
}

/// 材质键注册表
#[derive(Debug, Clone, Default)]
pub struct MaterialKeyRegistry {
    keys: HashMap<String, MaterialKey>,
}

impl MaterialKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标准键（进程内只构建一次）
    pub fn standard() -> &'static MaterialKeyRegistry {
        static STANDARD: OnceLock<MaterialKeyRegistry> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let mut registry = MaterialKeyRegistry::new();
            let standard = [
                (keys::NAME, ValueKind::String),
                (keys::DIFFUSE_COLOR, ValueKind::Color),
                (keys::AMBIENT_COLOR, ValueKind::Color),
                (keys::SPECULAR_COLOR, ValueKind::Color),
                (keys::EMISSIVE_COLOR, ValueKind::Color),
                (keys::TRANSPARENT_COLOR, ValueKind::Color),
                (keys::REFLECTIVE_COLOR, ValueKind::Color),
                (keys::OPACITY, ValueKind::Float),
                (keys::SHININESS, ValueKind::Float),
                (keys::SHININESS_STRENGTH, ValueKind::Float),
                (keys::REFRACTION, ValueKind::Float),
                (keys::REFLECTIVITY, ValueKind::Float),
                (keys::BUMP_SCALING, ValueKind::Float),
                (keys::TWO_SIDED, ValueKind::Bool),
                (keys::WIREFRAME, ValueKind::Bool),
                (keys::SHADING_MODE, ValueKind::Int),
                (keys::BLEND_MODE, ValueKind::Int),
            ];
            for (name, kind) in standard {
                registry.register(MaterialKey::new(name, kind));
            }
            registry
        })
    }

    /// 注册一个键，同名键被替换
    pub fn register(&mut self, key: MaterialKey) {
        self.keys.insert(key.name.clone(), key);
    }

    pub fn get(&self, name: &str) -> Option<&MaterialKey> {
        self.keys.get(name)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// 注册表中的键，或由值类型推出的临时键
    fn resolve(&self, name: &str, value: &DynamicValue) -> MaterialKey {
        match self.get(name) {
            Some(key) => key.clone(),
            None => {
                crate::codec_debug!(key = name, kind = %value.kind(), "unregistered material key");
                MaterialKey::new(name, value.kind())
            }
        }
    }
}

fn kind_mismatch(key: &MaterialKey, found: ValueKind) -> crate::core::error::DistToolkitError {
    SerializationError::InvalidValue {
        field: key.name.clone(),
        reason: format!("expected {} value, found {}", key.kind, found),
    }
    .into()
}

/// 材质属性集合
///
/// 枚举值以 `DynamicValue::Int` 存放。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialPropertyCollection {
    entries: BTreeMap<String, (MaterialKey, DynamicValue)>,
}

impl MaterialPropertyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 设置属性，值类型必须与键一致
    pub fn set(&mut self, key: &MaterialKey, value: impl Into<DynamicValue>) -> Result<()> {
        let value = value.into();
        if value.kind() != key.kind {
            return Err(kind_mismatch(key, value.kind()));
        }
        self.entries.insert(key.name.clone(), (key.clone(), value));
        Ok(())
    }

    /// 设置枚举属性，存为 `Int`
    pub fn set_enum<E: WireEnum>(&mut self, key: &MaterialKey, value: E) -> Result<()> {
        self.set(key, DynamicValue::Int(value.to_bits() as i32))
    }

    pub fn get(&self, name: &str) -> Option<&DynamicValue> {
        self.entries.get(name).map(|(_, v)| v)
    }

    pub fn get_color(&self, name: &str) -> Option<Color> {
        self.get(name).and_then(DynamicValue::as_color)
    }

    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(DynamicValue::as_f32)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(DynamicValue::as_str)
    }

    /// 读取以 `Int` 存放的枚举属性
    pub fn get_enum<E: WireEnum>(&self, name: &str) -> Result<Option<E>> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let DynamicValue::Int(i) = value else {
            return Err(SerializationError::TypeMismatch {
                expected: "i32",
                found: value.kind().name(),
            }
            .into());
        };
        let bits = *i as u32 as u64;
        E::from_bits(bits).map(Some).ok_or_else(|| {
            SerializationError::InvalidEnum {
                name: E::NAME,
                value: bits,
            }
            .into()
        })
    }

    pub fn remove(&mut self, name: &str) -> Option<DynamicValue> {
        self.entries.remove(name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MaterialKey, &DynamicValue)> {
        self.entries.values().map(|(k, v)| (k, v))
    }

    /// 读取并按注册表检查每个值的类型，重复的键是错误
    pub fn read_with(r: &mut BinaryReader<'_>, registry: &MaterialKeyRegistry) -> Result<Self> {
        let mut collection = Self::new();
        let pairs = r.read_list_with(|r| Ok((r.read_string()?, r.read_dynamic()?)))?;
        for (name, value) in pairs {
            if collection.entries.contains_key(&name) {
                return Err(SerializationError::InvalidValue {
                    field: format!("material property '{}'", name),
                    reason: "key appears more than once".to_string(),
                }
                .into());
            }
            let key = registry.resolve(&name, &value);
            collection.set(&key, value)?;
        }
        Ok(collection)
    }
}

impl DataSerializable for MaterialPropertyCollection {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_len(self.entries.len())?;
        for (name, (_, value)) in &self.entries {
            w.write_string(name)?;
            w.write_dynamic(value)?;
        }
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Self::read_with(r, MaterialKeyRegistry::standard())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub textures: Vec<MaterialTexture>,
    pub properties: MaterialPropertyCollection,
}

impl Material {
    pub fn name(&self) -> Option<&str> {
        self.properties.get_str(keys::NAME)
    }

    pub fn textures_of(&self, ty: TextureType) -> impl Iterator<Item = &MaterialTexture> {
        self.textures.iter().filter(move |t| t.ty == ty)
    }

    pub fn read_with(r: &mut BinaryReader<'_>, registry: &MaterialKeyRegistry) -> Result<Self> {
        Ok(Self {
            textures: r.read_list()?,
            properties: MaterialPropertyCollection::read_with(r, registry)?,
        })
    }
}

impl DataSerializable for Material {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_list(&self.textures)?;
        self.properties.write(w)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Self::read_with(r, MaterialKeyRegistry::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard(name: &str) -> &'static MaterialKey {
        MaterialKeyRegistry::standard().get(name).unwrap()
    }

    #[test]
    fn test_set_checks_kind() {
        let mut props = MaterialPropertyCollection::new();
        props.set(standard(keys::OPACITY), 0.5f32).unwrap();
        let err = props.set(standard(keys::OPACITY), "half").unwrap_err();
        assert!(matches!(
            err.as_serialization(),
            Some(SerializationError::InvalidValue { .. })
        ));
        assert_eq!(props.get_f32(keys::OPACITY), Some(0.5));
    }

    #[test]
    fn test_enum_stored_as_int() {
        let mut props = MaterialPropertyCollection::new();
        props.set_enum(standard(keys::SHADING_MODE), ShadingMode::Phong).unwrap();
        assert_eq!(props.get(keys::SHADING_MODE), Some(&DynamicValue::Int(3)));
        assert_eq!(
            props.get_enum::<ShadingMode>(keys::SHADING_MODE).unwrap(),
            Some(ShadingMode::Phong)
        );
        assert_eq!(props.get_enum::<BlendMode>(keys::BLEND_MODE).unwrap(), None);
    }

    #[test]
    fn test_material_round_trip() {
        let mut material = Material::default();
        material.properties.set(standard(keys::NAME), "Steel").unwrap();
        material
            .properties
            .set(standard(keys::DIFFUSE_COLOR), Color::rgb(0.6, 0.6, 0.7))
            .unwrap();
        let mut texture = MaterialTexture::new("*0", TextureType::Diffuse);
        texture.wrap_mode = TextureAddressMode::Clamp;
        material.textures.push(texture);
        material.textures.push(MaterialTexture::new("steel_n.png", TextureType::Normals));

        let mut w = BinaryWriter::new();
        material.write(&mut w).unwrap();
        let bytes = w.finish().unwrap();
        let loaded = Material::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(loaded, material);
        assert_eq!(loaded.name(), Some("Steel"));
        assert_eq!(loaded.textures[0].embedded_index(), Some(0));
        assert_eq!(loaded.textures_of(TextureType::Normals).count(), 1);
    }

    #[test]
    fn test_registry_rejects_wrong_kind_on_read() {
        let mut w = BinaryWriter::new();
        w.write_len(1).unwrap();
        w.write_string(keys::TWO_SIDED).unwrap();
        w.write_dynamic(&DynamicValue::Int(1)).unwrap();
        let bytes = w.finish().unwrap();
        assert!(MaterialPropertyCollection::read(&mut BinaryReader::new(&bytes)).is_err());

        let mut custom = MaterialKeyRegistry::new();
        custom.register(MaterialKey::new(keys::TWO_SIDED, ValueKind::Int));
        let props = MaterialPropertyCollection::read_with(&mut BinaryReader::new(&bytes), &custom).unwrap();
        assert_eq!(props.get(keys::TWO_SIDED), Some(&DynamicValue::Int(1)));
    }

    #[test]
    fn test_unregistered_key_keeps_value_kind() {
        let mut w = BinaryWriter::new();
        w.write_len(1).unwrap();
        w.write_string("Roughness").unwrap();
        w.write_dynamic(&DynamicValue::Float(0.3)).unwrap();
        let bytes = w.finish().unwrap();
        let props = MaterialPropertyCollection::read(&mut BinaryReader::new(&bytes)).unwrap();
        let (key, _) = props.iter().next().unwrap();
        assert_eq!(key.kind, ValueKind::Float);
    }

    #[test]
    fn test_repeated_key_rejected() {
        let mut w = BinaryWriter::new();
        w.write_len(2).unwrap();
        for opacity in [0.25f32, 0.75] {
            w.write_string(keys::OPACITY).unwrap();
            w.write_dynamic(&DynamicValue::Float(opacity)).unwrap();
        }
        let bytes = w.finish().unwrap();
        let err = MaterialPropertyCollection::read(&mut BinaryReader::new(&bytes)).unwrap_err();
        assert!(matches!(
            err.as_serialization(),
            Some(SerializationError::InvalidValue { .. })
        ));
    }
}
