//! 按字符串键存放动态值的属性集合

use std::collections::BTreeMap;

use crate::core::error::{Result, SerializationError};
use crate::serialization::{BinaryReader, BinaryWriter, DataSerializable, DynamicValue};

/// 属性集合
///
/// 线上形式为 `(键, 动态值)` 列表，按键排序写出，输出与插入顺序无关。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyCollection {
    entries: BTreeMap<String, DynamicValue>,
}

impl PropertyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// 设置属性，返回旧值
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<DynamicValue>) -> Option<DynamicValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<DynamicValue> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DynamicValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl DataSerializable for PropertyCollection {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_len(self.entries.len())?;
        for (key, value) in &self.entries {
            w.write_string(key)?;
            w.write_dynamic(value)?;
        }
        Ok(())
    }

    /// 重复的键是错误
    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        let pairs = r.read_list_with(|r| Ok((r.read_string()?, r.read_dynamic()?)))?;
        let mut entries = BTreeMap::new();
        for (key, value) in pairs {
            if entries.contains_key(&key) {
                return Err(SerializationError::InvalidValue {
                    field: format!("property '{}'", key),
                    reason: "key appears more than once".to_string(),
                }
                .into());
            }
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }
}

impl<K: Into<String>, V: Into<DynamicValue>> FromIterator<(K, V)> for PropertyCollection {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_independent_of_insert_order() {
        let a: PropertyCollection = [("b", 2), ("a", 1)].into_iter().collect();
        let b: PropertyCollection = [("a", 1), ("b", 2)].into_iter().collect();

        let mut wa = BinaryWriter::new();
        a.write(&mut wa).unwrap();
        let mut wb = BinaryWriter::new();
        b.write(&mut wb).unwrap();
        let bytes = wa.finish().unwrap();
        assert_eq!(bytes, wb.finish().unwrap());
        // 计数后第一个键是 "a"
        assert_eq!(&bytes[1..3], &[1, b'a']);
    }

    #[test]
    fn test_round_trip_mixed_values() {
        let mut props = PropertyCollection::new();
        props.set("Name", "Hull");
        props.set("Scale", 2.5f32);
        props.set("Visible", true);
        props.set("Nothing", DynamicValue::Null);

        let mut w = BinaryWriter::new();
        props.write(&mut w).unwrap();
        let bytes = w.finish().unwrap();
        let loaded = PropertyCollection::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(loaded, props);
        assert_eq!(loaded.get("Scale").and_then(|v| v.as_f32()), Some(2.5));
        assert!(loaded.get("Nothing").is_some_and(|v| v.is_null()));
    }

    #[test]
    fn test_set_replaces() {
        let mut props = PropertyCollection::new();
        assert!(props.set("k", 1).is_none());
        assert_eq!(props.set("k", 2), Some(DynamicValue::Int(1)));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_repeated_key_rejected() {
        let mut w = BinaryWriter::new();
        w.write_len(2).unwrap();
        for value in [1, 2] {
            w.write_string("Lod").unwrap();
            w.write_dynamic(&DynamicValue::Int(value)).unwrap();
        }
        let bytes = w.finish().unwrap();
        let err = PropertyCollection::read(&mut BinaryReader::new(&bytes)).unwrap_err();
        assert!(matches!(
            err.as_serialization(),
            Some(SerializationError::InvalidValue { .. })
        ));
    }
}
