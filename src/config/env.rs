use std::path::Path;

/// Ordered environment variables exported to an external program.
///
/// Setting a name twice keeps its first position and the latest value, so
/// blocks can be merged with [`ToolEnv::merge`] without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolEnv {
    vars: Vec<(String, String)>,
}

impl ToolEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.vars.push((name, value)),
        }
    }

    pub fn set_path(&mut self, name: impl Into<String>, path: &Path) {
        self.set(name, path.display().to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn merge(mut self, other: ToolEnv) -> Self {
        for (name, value) in other.vars {
            self.set(name, value);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_without_duplicating() {
        let mut a = ToolEnv::new();
        a.set("WWPDB_SITE_ID", "RCSB");
        a.set("CC_TOOLS", "/a");
        let mut b = ToolEnv::new();
        b.set("WWPDB_SITE_ID", "RCSB");
        b.set("CC_DICT", "/d");

        let merged = a.merge(b);
        let names: Vec<_> = merged.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["WWPDB_SITE_ID", "CC_TOOLS", "CC_DICT"]);
    }
}
