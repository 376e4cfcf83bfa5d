/// Host-side lookup tables kept alongside an FMU handle: a parameter index to storage offset
/// map and a list of enumeration values. Both are released when the handle terminates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuxTables {
    param_offsets: Vec<i32>,
    enum_values: Vec<i32>,
}

impl AuxTables {
    /// Allocate `size` zeroed parameter offsets, replacing any previous table.
    pub fn create_param_offsets(&mut self, size: usize) {
        self.param_offsets = vec![0; size];
    }

    /// Returns `false` when `index` is outside the table.
    pub fn set_param_offset(&mut self, index: usize, offset: i32) -> bool {
        match self.param_offsets.get_mut(index) {
            Some(slot) => {
                *slot = offset;
                true
            }
            None => false,
        }
    }

    pub fn param_offset(&self, index: usize) -> Option<i32> {
        self.param_offsets.get(index).copied()
    }

    /// Allocate `size` zeroed enumeration values, replacing any previous list.
    pub fn create_enum_values(&mut self, size: usize) {
        self.enum_values = vec![0; size];
    }

    /// Returns `false` when `index` is outside the list.
    pub fn set_enum_value(&mut self, index: usize, value: i32) -> bool {
        match self.enum_values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn enum_value(&self, index: usize) -> Option<i32> {
        self.enum_values.get(index).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.param_offsets.is_empty() && self.enum_values.is_empty()
    }

    pub(crate) fn release(&mut self) {
        self.param_offsets = Vec::new();
        self.enum_values = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables() {
        let mut tables = AuxTables::default();
        assert!(tables.is_empty());
        assert!(!tables.set_param_offset(0, 4));

        tables.create_param_offsets(3);
        tables.create_enum_values(2);
        assert!(tables.set_param_offset(2, 16));
        assert!(tables.set_enum_value(1, -7));
        assert!(!tables.set_enum_value(2, 1));

        assert_eq!(tables.param_offset(2), Some(16));
        assert_eq!(tables.param_offset(0), Some(0));
        assert_eq!(tables.param_offset(3), None);
        assert_eq!(tables.enum_value(1), Some(-7));

        tables.release();
        assert!(tables.is_empty());
    }
}
