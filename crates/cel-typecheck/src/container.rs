//! Namespace resolution for qualified names.
//!
//! A `Container` is the package an expression is checked in, plus a table of
//! abbreviations. It expands a possibly partial name into the ordered list
//! of fully qualified candidates the environment should try.

use std::collections::BTreeMap;

/// Errors raised while configuring a container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    #[error("container name must not begin with a leading '.': {0}")]
    LeadingDot(String),

    #[error("abbreviation must refer to a valid qualified name: {0}")]
    Unqualified(String),

    #[error(
        "abbreviation collides with existing reference: name={name}, abbreviation={abbreviation}, existing={existing}"
    )]
    AbbreviationCollision {
        name: String,
        abbreviation: String,
        existing: String,
    },

    #[error(
        "abbreviation collides with container name: name={name}, abbreviation={abbreviation}, container={container}"
    )]
    ContainerCollision {
        name: String,
        abbreviation: String,
        container: String,
    },
}

/// The namespace an expression is checked in.
///
/// # Example
/// ```
/// use cel_typecheck::Container;
///
/// let container = Container::new("a.b").unwrap();
/// assert_eq!(container.resolve_candidate_names("R"), vec!["a.b.R", "a.R", "R"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    name: String,
    aliases: BTreeMap<String, String>,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Result<Self, ContainerError> {
        let name = name.into();
        if name.starts_with('.') {
            return Err(ContainerError::LeadingDot(name));
        }
        Ok(Self {
            name,
            aliases: BTreeMap::new(),
        })
    }

    /// Add abbreviations: each qualified name becomes reachable by its last
    /// segment, e.g. `x.y.Z` by `Z`.
    pub fn with_abbreviations<S: AsRef<str>>(
        mut self,
        qualified_names: impl IntoIterator<Item = S>,
    ) -> Result<Self, ContainerError> {
        for qualified_name in qualified_names {
            self.add_abbreviation(qualified_name.as_ref().trim())?;
        }
        Ok(self)
    }

    fn add_abbreviation(&mut self, qualified_name: &str) -> Result<(), ContainerError> {
        if qualified_name.starts_with('.') {
            return Err(ContainerError::LeadingDot(qualified_name.to_string()));
        }
        let abbreviation = match qualified_name.rfind('.') {
            Some(i) if i > 0 && i < qualified_name.len() - 1 => &qualified_name[i + 1..],
            _ => return Err(ContainerError::Unqualified(qualified_name.to_string())),
        };
        if let Some(existing) = self.aliases.get(abbreviation) {
            return Err(ContainerError::AbbreviationCollision {
                name: qualified_name.to_string(),
                abbreviation: abbreviation.to_string(),
                existing: existing.clone(),
            });
        }
        let prefix = format!("{}.", abbreviation);
        if self.name == abbreviation || self.name.starts_with(&prefix) {
            return Err(ContainerError::ContainerCollision {
                name: qualified_name.to_string(),
                abbreviation: abbreviation.to_string(),
                container: self.name.clone(),
            });
        }
        self.aliases
            .insert(abbreviation.to_string(), qualified_name.to_string());
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fully qualified candidates for `name`, most specific first.
    ///
    /// - A leading `.` roots the name: the container is not consulted.
    /// - A name whose first segment is an abbreviation expands to exactly one
    ///   candidate.
    /// - Otherwise the container and each of its parent packages prefix the
    ///   name in turn, ending with the bare name.
    pub fn resolve_candidate_names(&self, name: &str) -> Vec<String> {
        if let Some(rooted) = name.strip_prefix('.') {
            let candidate = self.find_alias(rooted).unwrap_or_else(|| rooted.to_string());
            return vec![candidate];
        }
        if let Some(expanded) = self.find_alias(name) {
            return vec![expanded];
        }
        if self.name.is_empty() {
            return vec![name.to_string()];
        }

        let mut candidates = vec![format!("{}.{}", self.name, name)];
        let mut package = self.name.as_str();
        while let Some(i) = package.rfind('.') {
            package = &package[..i];
            candidates.push(format!("{}.{}", package, name));
        }
        candidates.push(name.to_string());
        candidates
    }

    fn find_alias(&self, name: &str) -> Option<String> {
        let (simple, qualifier) = match name.find('.') {
            Some(i) => name.split_at(i),
            None => (name, ""),
        };
        self.aliases
            .get(simple)
            .map(|expanded| format!("{}{}", expanded, qualifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_container() {
        let container = Container::default();
        assert_eq!(container.resolve_candidate_names("a.b"), vec!["a.b"]);
    }

    #[test]
    fn test_container_candidates() {
        let container = Container::new("com.example").unwrap();
        assert_eq!(
            container.resolve_candidate_names("Msg.field"),
            vec!["com.example.Msg.field", "com.Msg.field", "Msg.field"]
        );
    }

    #[test]
    fn test_leading_dot_bypasses_container() {
        let container = Container::new("com.example").unwrap();
        assert_eq!(container.resolve_candidate_names(".Msg"), vec!["Msg"]);
    }

    #[test]
    fn test_abbreviation_expansion() {
        let container = Container::new("com.example")
            .unwrap()
            .with_abbreviations(["my.types.Payload"])
            .unwrap();
        assert_eq!(container.resolve_candidate_names("Payload"), vec!["my.types.Payload"]);
        assert_eq!(
            container.resolve_candidate_names("Payload.Kind"),
            vec!["my.types.Payload.Kind"]
        );
        assert_eq!(
            container.resolve_candidate_names(".Payload.Kind"),
            vec!["my.types.Payload.Kind"]
        );
    }

    #[test]
    fn test_abbreviation_must_be_qualified() {
        let err = Container::default().with_abbreviations(["Payload"]).unwrap_err();
        assert_eq!(err, ContainerError::Unqualified("Payload".to_string()));

        let err = Container::default().with_abbreviations(["my.types."]).unwrap_err();
        assert_eq!(err, ContainerError::Unqualified("my.types.".to_string()));
    }

    #[test]
    fn test_abbreviation_collision() {
        let err = Container::default()
            .with_abbreviations(["a.Payload", "b.Payload"])
            .unwrap_err();
        assert!(matches!(err, ContainerError::AbbreviationCollision { .. }));
        assert_eq!(
            err.to_string(),
            "abbreviation collides with existing reference: name=b.Payload, abbreviation=Payload, existing=a.Payload"
        );
    }

    #[test]
    fn test_abbreviation_collides_with_container() {
        let err = Container::new("example.pkg")
            .unwrap()
            .with_abbreviations(["other.example"])
            .unwrap_err();
        assert!(matches!(err, ContainerError::ContainerCollision { .. }));
    }

    #[test]
    fn test_leading_dot_container_rejected() {
        assert!(matches!(Container::new(".a"), Err(ContainerError::LeadingDot(_))));
    }
}
