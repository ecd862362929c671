//! CF cell methods, parsed from and rendered to the `cell_methods` attribute.

use std::fmt;

/// One `name: [name: ...] method [qualifiers]` entry
#[derive(Debug, Clone, PartialEq)]
pub struct CellMethod {
    pub names: Vec<String>,
    pub method: String,
    /// Trailing text such as `where land` or `(interval: 1 day)`
    pub qualifiers: Option<String>,
}

impl CellMethod {
    pub fn new(names: Vec<String>, method: impl Into<String>) -> Self {
        Self {
            names,
            method: method.into(),
            qualifiers: None,
        }
    }

    /// Parse a full `cell_methods` string. Malformed trailing text is kept as
    /// qualifiers of the preceding entry.
    pub fn parse_all(s: &str) -> Vec<CellMethod> {
        let mut methods = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut current: Option<CellMethod> = None;
        let mut depth = 0usize;

        for token in s.split_whitespace() {
            if depth == 0 && !token.starts_with('(') && token.ends_with(':') && token.len() > 1 {
                if let Some(done) = current.take() {
                    methods.push(done);
                }
                names.push(token.trim_end_matches(':').to_string());
                continue;
            }
            if current.is_none() && !names.is_empty() && depth == 0 {
                current = Some(CellMethod::new(std::mem::take(&mut names), token));
                continue;
            }
            depth += token.matches('(').count();
            depth = depth.saturating_sub(token.matches(')').count());
            if let Some(cm) = current.as_mut() {
                match cm.qualifiers.as_mut() {
                    Some(q) => {
                        q.push(' ');
                        q.push_str(token);
                    }
                    None => cm.qualifiers = Some(token.to_string()),
                }
            }
        }
        if let Some(done) = current {
            methods.push(done);
        }
        methods
    }

    /// Render a list of cell methods as a single attribute value.
    pub fn format_all(methods: &[CellMethod]) -> String {
        methods
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CellMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.names {
            write!(f, "{}: ", name)?;
        }
        write!(f, "{}", self.method)?;
        if let Some(q) = &self.qualifiers {
            write!(f, " {}", q)?;
        }
        Ok(())
    }
}
