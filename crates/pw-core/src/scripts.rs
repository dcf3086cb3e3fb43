//! User script library
//!
//! Scripts are authored elsewhere and consumed read-only by the injection
//! composer. Only active scripts reach a page; deleting a script removes it
//! from the next composed bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Domain pattern that matches every page.
pub const ANY_DOMAIN: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedScript {
    pub id: String,
    pub name: String,
    /// `"*"` or a substring of the page location
    #[serde(rename = "domain")]
    pub domain_pattern: String,
    pub code: String,
    pub active: bool,
    #[serde(rename = "date", alias = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl InjectedScript {
    /// New active script with a fresh id.
    pub fn new(name: &str, domain_pattern: &str, code: &str) -> Result<Self, Error> {
        let name = name.trim();
        if name.is_empty() || code.trim().is_empty() {
            return Err(Error::IncompleteScript);
        }
        let domain_pattern = match domain_pattern.trim() {
            "" => ANY_DOMAIN,
            d => d,
        };
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            domain_pattern: domain_pattern.to_string(),
            code: code.to_string(),
            active: true,
            created_at: Utc::now(),
        })
    }

    /// Whether this script runs on a page at `location`.
    ///
    /// The guest evaluates the same predicate at runtime against the live
    /// location; this host-side copy drives previews and tests.
    pub fn applies_to(&self, location: &str) -> bool {
        self.active && (self.domain_pattern == ANY_DOMAIN || location.contains(&self.domain_pattern))
    }
}

/// Ordered collection of user scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptLibrary {
    scripts: Vec<InjectedScript>,
}

impl ScriptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scripts(scripts: Vec<InjectedScript>) -> Self {
        Self { scripts }
    }

    pub fn add(&mut self, script: InjectedScript) -> &InjectedScript {
        self.scripts.push(script);
        &self.scripts[self.scripts.len() - 1]
    }

    /// Replace name, domain and code of an existing script.
    pub fn edit(&mut self, id: &str, name: &str, domain_pattern: &str, code: &str) -> Result<(), Error> {
        let template = InjectedScript::new(name, domain_pattern, code)?;
        let script = self.get_mut(id)?;
        script.name = template.name;
        script.domain_pattern = template.domain_pattern;
        script.code = template.code;
        Ok(())
    }

    /// Flip the active flag, returning the new value.
    pub fn toggle(&mut self, id: &str) -> Result<bool, Error> {
        let script = self.get_mut(id)?;
        script.active = !script.active;
        Ok(script.active)
    }

    pub fn remove(&mut self, id: &str) -> Result<InjectedScript, Error> {
        let pos = self
            .scripts
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::UnknownScript(id.to_string()))?;
        Ok(self.scripts.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&InjectedScript> {
        self.scripts.iter().find(|s| s.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut InjectedScript, Error> {
        self.scripts
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::UnknownScript(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &InjectedScript> {
        self.scripts.iter()
    }

    /// Scripts eligible for injection.
    pub fn active(&self) -> impl Iterator<Item = &InjectedScript> {
        self.scripts.iter().filter(|s| s.active)
    }

    pub fn as_slice(&self) -> &[InjectedScript] {
        &self.scripts
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_script_requires_name_and_code() {
        assert!(matches!(
            InjectedScript::new("", "*", "alert(1)"),
            Err(Error::IncompleteScript)
        ));
        assert!(matches!(
            InjectedScript::new("x", "*", "   "),
            Err(Error::IncompleteScript)
        ));
        let script = InjectedScript::new("x", "", "1").unwrap();
        assert_eq!(script.domain_pattern, ANY_DOMAIN);
        assert!(script.active);
    }

    #[test]
    fn applies_to_respects_domain_and_active() {
        let mut script = InjectedScript::new("dark", "news.example", "1").unwrap();
        assert!(script.applies_to("https://news.example/today"));
        assert!(!script.applies_to("https://other.example/"));
        script.active = false;
        assert!(!script.applies_to("https://news.example/today"));

        let any = InjectedScript::new("all", "*", "1").unwrap();
        assert!(any.applies_to("about:blank"));
    }

    #[test]
    fn library_edit_toggle_remove() {
        let mut lib = ScriptLibrary::new();
        let id = lib.add(InjectedScript::new("a", "*", "1").unwrap()).id.clone();
        lib.add(InjectedScript::new("b", "*", "2").unwrap());

        lib.edit(&id, "a2", "site.test", "3").unwrap();
        assert_eq!(lib.get(&id).unwrap().name, "a2");
        assert_eq!(lib.get(&id).unwrap().code, "3");

        assert!(!lib.toggle(&id).unwrap());
        assert_eq!(lib.active().count(), 1);

        lib.remove(&id).unwrap();
        assert_eq!(lib.len(), 1);
        assert!(matches!(lib.remove(&id), Err(Error::UnknownScript(_))));
    }

    #[test]
    fn reads_stored_format() {
        let json = r#"[{"id":"1","name":"n","domain":"*","code":"c","active":false,
            "date":"2024-05-01T10:00:00.000Z"}]"#;
        let lib: ScriptLibrary = serde_json::from_str(json).unwrap();
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.active().count(), 0);
        assert_eq!(lib.as_slice()[0].domain_pattern, "*");
    }
}
