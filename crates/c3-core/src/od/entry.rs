use super::value::ObjectValue;

/// Access rights for an Object Dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// An enumerated entry's declared symbolic label set: integer code -> name.
/// Writes of an integer not present in this table are rejected with
/// `InvalidEnumValue` (§3 invariant: "enumerated entries reject values
/// outside the declared label set").
pub type EnumLabels = &'static [(u32, &'static str)];

/// A complete entry in the Object Dictionary: data plus metadata.
pub struct ObjectEntry {
    pub index: u16,
    pub name: &'static str,
    pub value: ObjectValue,
    pub access: AccessType,
    pub default_value: ObjectValue,
    /// Non-empty only for enumerated entries (e.g. mission `STATUS`,
    /// `SYSTEM_RESET`).
    pub enum_labels: Option<EnumLabels>,
    /// Whether this entry is part of the persistent entry set (§4.7).
    pub persistent: bool,
    /// Optional write callbacks, invoked synchronously on the writing task's
    /// context after a successful write (§5). Concurrency model requires
    /// callbacks never block on the OD's lock and never call back into the
    /// writer; this is a caller discipline, not something the type system
    /// enforces here.
    pub write_callbacks: Vec<Box<dyn Fn(&ObjectValue) + Send>>,
}

impl std::fmt::Debug for ObjectEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectEntry")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("value", &self.value)
            .field("access", &self.access)
            .field("persistent", &self.persistent)
            .finish()
    }
}

impl ObjectEntry {
    /// Convenience constructor for a simple read-write, non-persistent,
    /// non-enumerated entry — the common case.
    pub fn new(index: u16, name: &'static str, value: ObjectValue, access: AccessType) -> Self {
        Self {
            index,
            name,
            default_value: value.clone(),
            value,
            access,
            enum_labels: None,
            persistent: false,
            write_callbacks: Vec::new(),
        }
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn with_enum_labels(mut self, labels: EnumLabels) -> Self {
        self.enum_labels = Some(labels);
        self
    }

    pub fn with_write_callback(mut self, cb: impl Fn(&ObjectValue) + Send + 'static) -> Self {
        self.write_callbacks.push(Box::new(cb));
        self
    }

    /// Validates `value` against the declared enum label set, if any.
    pub fn validate(&self, value: &ObjectValue) -> Result<(), crate::error::C3Error> {
        if let Some(labels) = self.enum_labels {
            let code = match value {
                ObjectValue::U8(v) => *v as u32,
                ObjectValue::U16(v) => *v as u32,
                ObjectValue::U32(v) => *v,
                _ => return Err(crate::error::C3Error::TypeMismatch(self.index)),
            };
            if !labels.iter().any(|(c, _)| *c == code) {
                return Err(crate::error::C3Error::InvalidEnumValue(self.index));
            }
        }
        Ok(())
    }
}
