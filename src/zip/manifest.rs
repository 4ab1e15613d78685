//! `META-INF/MANIFEST.MF` parsing.

/// Path of the manifest inside a jar.
pub const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";

/// Ordered name/value pairs; names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    values: Vec<(String, String)>,
}

impl Attributes {
    /// Value of attribute `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Name/value pairs in the order they were first seen.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, name: String, value: String) {
        match self
            .values
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some((_, existing)) => *existing = value,
            None => self.values.push((name, value)),
        }
    }
}

/// A parsed jar manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Attributes,
    sections: Vec<(String, Attributes)>,
}

impl Manifest {
    /// Parse manifest text.
    ///
    /// Lines starting with a single space continue the previous value. A blank
    /// line ends a section; sections after the first are keyed by `Name`.
    /// Lines without a `:` separator are ignored.
    pub fn parse(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let mut manifest = Manifest::default();
        let mut current = Attributes::default();
        let mut in_main = true;
        let mut pending: Option<(String, String)> = None;

        let mut lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
        lines.push("");

        for line in lines {
            if let Some(continued) = line.strip_prefix(' ') {
                if let Some((_, value)) = pending.as_mut() {
                    value.push_str(continued);
                }
                continue;
            }
            if let Some((name, value)) = pending.take() {
                current.insert(name, value);
            }
            if line.is_empty() {
                if in_main {
                    manifest.main = std::mem::take(&mut current);
                    in_main = false;
                } else if let Some(name) = current.get("Name").map(str::to_owned) {
                    manifest.sections.push((name, std::mem::take(&mut current)));
                } else {
                    current = Attributes::default();
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                let value = value.strip_prefix(' ').unwrap_or(value);
                pending = Some((name.trim().to_owned(), value.to_owned()));
            }
        }
        manifest
    }

    /// Attributes of the main section, before the first blank line.
    pub fn main_attributes(&self) -> &Attributes {
        &self.main
    }

    /// Attributes of the named section, e.g. an entry name.
    pub fn section(&self, name: &str) -> Option<&Attributes> {
        self.sections
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, attributes)| attributes)
    }

    /// Named sections in file order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Attributes)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shorthand for a main attribute value.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.main.get(name)
    }
}
