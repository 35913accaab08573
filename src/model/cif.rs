use std::collections::BTreeMap;

/// Returns `true` for the mmCIF placeholders meaning "unknown" (`?`) and
/// "not applicable" (`.`).
#[inline]
pub fn is_null(value: &str) -> bool {
    value == "?" || value == "."
}

/// A single mmCIF category: an ordered attribute list and a table of rows.
///
/// Attribute names are stored without the `_category.` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Category {
    name: String,
    attributes: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_attributes<I, S>(name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index_of(&self, attribute: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == attribute)
    }

    /// Appends an attribute column, padding existing rows with `?`.
    /// Returns the column index; an existing attribute is not duplicated.
    pub fn append_attribute(&mut self, attribute: impl Into<String>) -> usize {
        let attribute = attribute.into();
        if let Some(idx) = self.index_of(&attribute) {
            return idx;
        }
        self.attributes.push(attribute);
        for row in &mut self.rows {
            row.push("?".to_string());
        }
        self.attributes.len() - 1
    }

    /// Appends a row. Short rows are padded with `?`, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.attributes.len(), "?".to_string());
        self.rows.push(row);
    }

    pub fn value(&self, attribute: &str, row: usize) -> Option<&str> {
        let idx = self.index_of(attribute)?;
        self.rows.get(row).and_then(|r| r.get(idx)).map(String::as_str)
    }

    /// Sets `attribute` in `row`, creating the column and any missing rows.
    pub fn set_value(&mut self, attribute: &str, row: usize, value: impl Into<String>) {
        let idx = self.append_attribute(attribute);
        let width = self.attributes.len();
        while self.rows.len() <= row {
            self.rows.push(vec!["?".to_string(); width]);
        }
        self.rows[row][idx] = value.into();
    }

    /// Rows as attribute → value maps with null values dropped. Rows made
    /// up entirely of nulls are skipped.
    pub fn row_maps(&self) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .filter_map(|row| {
                let map: BTreeMap<String, String> = self
                    .attributes
                    .iter()
                    .zip(row.iter())
                    .filter(|(_, v)| !is_null(v))
                    .map(|(a, v)| (a.clone(), v.clone()))
                    .collect();
                (!map.is_empty()).then_some(map)
            })
            .collect()
    }
}

/// One `data_` block of an mmCIF file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataBlock {
    name: String,
    categories: Vec<Category>,
}

impl DataBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn category_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.name == name)
    }

    pub fn category_or_insert(&mut self, name: &str) -> &mut Category {
        let idx = match self.categories.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                self.categories.push(Category::new(name));
                self.categories.len() - 1
            }
        };
        &mut self.categories[idx]
    }

    /// Replaces the category of the same name in place, or appends it.
    pub fn replace(&mut self, category: Category) {
        match self.category_mut(&category.name) {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
    }

    /// Row 0 value of `category.attribute`, or `""` when absent or null.
    pub fn single_value(&self, category: &str, attribute: &str) -> &str {
        self.category(category)
            .and_then(|c| c.value(attribute, 0))
            .filter(|v| !is_null(v))
            .unwrap_or("")
    }

    pub fn row_maps(&self, category: &str) -> Vec<BTreeMap<String, String>> {
        self.category(category)
            .map(Category::row_maps)
            .unwrap_or_default()
    }
}
