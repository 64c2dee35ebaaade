//! 骨骼树
//!
//! 骨骼之间用下标相互引用（父骨骼下标、子骨骼下标列表），保持格式扁平。

use crate::core::error::{Result, SerializationError};
use crate::math::Matrix4;
use crate::serialization::{BinaryReader, BinaryWriter, DataSerializable};

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    /// 在 `ModelData::bones` 中的位置
    pub index: i32,
    /// 父骨骼下标，根骨骼为 `-1`
    pub parent_index: i32,
    /// 相对父骨骼的变换
    pub transform: Matrix4,
    pub name: Option<String>,
    pub children: Vec<i32>,
}

impl Bone {
    pub const NO_PARENT: i32 = -1;

    pub fn new(index: i32, parent_index: i32) -> Self {
        Self {
            index,
            parent_index,
            transform: Matrix4::identity(),
            name: None,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_index == Self::NO_PARENT
    }
}

impl DataSerializable for Bone {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_packed_i32(self.index);
        w.write_packed_i32(self.parent_index);
        w.write_matrix(&self.transform);
        w.write_optional_string(self.name.as_deref())?;
        w.write_list_with(&self.children, |w, c| {
            w.write_packed_i32(*c);
            Ok(())
        })
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            index: r.read_packed_i32()?,
            parent_index: r.read_packed_i32()?,
            transform: r.read_matrix()?,
            name: r.read_optional_string()?,
            children: r.read_list_with(|r| r.read_packed_i32())?,
        })
    }
}

fn invalid(field: String, reason: String) -> crate::core::error::DistToolkitError {
    SerializationError::InvalidValue { field, reason }.into()
}

/// 检查骨骼树：下标与位置一致，父子引用在范围内且双向对应，没有环
pub fn validate_bones(bones: &[Bone]) -> Result<()> {
    let count = bones.len() as i32;
    for (position, bone) in bones.iter().enumerate() {
        let position = position as i32;
        if bone.index != position {
            return Err(invalid(
                format!("bones[{}].index", position),
                format!("is {} but bone is stored at {}", bone.index, position),
            ));
        }
        if !bone.is_root() && !(0..count).contains(&bone.parent_index) {
            return Err(invalid(
                format!("bones[{}].parent_index", position),
                format!("{} outside 0..{}", bone.parent_index, count),
            ));
        }
        if bone.parent_index == position {
            return Err(invalid(
                format!("bones[{}].parent_index", position),
                "bone is its own parent".to_string(),
            ));
        }
        if !bone.is_root() && !bones[bone.parent_index as usize].children.contains(&position) {
            return Err(invalid(
                format!("bones[{}].parent_index", position),
                format!("parent {} does not list bone {} as a child", bone.parent_index, position),
            ));
        }
        for &child in &bone.children {
            let parent_of_child = bones
                .get(child as usize)
                .filter(|_| child >= 0)
                .map(|c| c.parent_index);
            if parent_of_child != Some(position) {
                return Err(invalid(
                    format!("bones[{}].children", position),
                    format!("child {} does not name bone {} as its parent", child, position),
                ));
            }
        }
    }

    // 父链最多 bones.len() 步就必须到达根骨骼
    for (position, bone) in bones.iter().enumerate() {
        let mut current = bone;
        let mut steps = 0;
        while !current.is_root() {
            steps += 1;
            if steps > bones.len() {
                return Err(invalid(
                    format!("bones[{}].parent_index", position),
                    "parent chain forms a cycle".to_string(),
                ));
            }
            current = &bones[current.parent_index as usize];
        }
    }
    Ok(())
}
