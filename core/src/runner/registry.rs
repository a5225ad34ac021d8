use std::collections::BTreeMap;

use super::framework::TestFramework;

#[derive(Default)]
pub struct FrameworkRegistry {
    frameworks: BTreeMap<String, Box<dyn TestFramework>>,
}

impl FrameworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a framework under its own name, replacing any previous one.
    pub fn register(&mut self, framework: Box<dyn TestFramework>) {
        let name = framework.name().to_string();
        if self.frameworks.insert(name.clone(), framework).is_some() {
            tracing::debug!(target: "testexec.runner", framework = %name, "framework replaced");
        }
    }

    pub fn with(mut self, framework: Box<dyn TestFramework>) -> Self {
        self.register(framework);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn TestFramework> {
        self.frameworks.get(name).map(|f| f.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.frameworks.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for FrameworkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.frameworks.keys()).finish()
    }
}
