use std::collections::HashMap;

use spirit_rules::Step;

/// Maps line ids to step positions for one story.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    positions: HashMap<String, usize>,
    /// Later occurrences of a line id, as `(line_id, position)`.
    duplicates: Vec<(String, usize)>,
}

impl LineIndex {
    /// Index every step that carries a line id. The first occurrence wins.
    pub fn build(steps: &[Step]) -> Self {
        let mut index = Self::default();
        for (position, step) in steps.iter().enumerate() {
            let Some(line_id) = step.line_id().filter(|id| !id.is_empty()) else {
                continue;
            };
            if index.positions.contains_key(line_id) {
                index.duplicates.push((line_id.to_string(), position));
            } else {
                index.positions.insert(line_id.to_string(), position);
            }
        }
        index
    }

    pub fn position(&self, line_id: &str) -> Option<usize> {
        self.positions.get(line_id).copied()
    }

    pub fn duplicates(&self) -> &[(String, usize)] {
        &self.duplicates
    }
}
