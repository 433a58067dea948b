//! Common types for the device layer

/// Identifier of a single key, as reported by the device
pub type KeyId = u16;

/// Identifier of a key block, as reported by the device
pub type BlockId = u8;

/// A physical group of keys (main keyboard, multimedia keys, logo...)
///
/// Keys are listed in the order the device enumerates them. Render buffers
/// address keys by their position in this list, not by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBlock {
    id: BlockId,
    name: String,
    keys: Vec<KeyId>,
}

impl KeyBlock {
    pub fn new(id: BlockId, name: impl Into<String>, keys: Vec<KeyId>) -> Self {
        Self {
            id,
            name: name.into(),
            keys,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key ids in device enumeration order
    pub fn keys(&self) -> &[KeyId] {
        &self.keys
    }

    /// Position of a key within this block
    pub fn key_index(&self, key: KeyId) -> Option<usize> {
        self.keys.iter().position(|&k| k == key)
    }
}

/// Current color of one key, as read back from the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyColor {
    pub id: KeyId,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// Instruction to set one key to an RGB value
///
/// Devices have no alpha channel, so none is carried here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorDirective {
    pub id: KeyId,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl ColorDirective {
    pub fn new(id: KeyId, red: u8, green: u8, blue: u8) -> Self {
        Self {
            id,
            red,
            green,
            blue,
        }
    }
}
