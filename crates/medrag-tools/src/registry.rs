use medrag_llm::provider::ToolDefinition;

#[derive(Debug, Clone)]
pub struct ToolDef {
    pub id: &'static str,
    pub description: &'static str,
    pub schema: schemars::Schema,
}

impl ToolDef {
    /// Wire form handed to the model.
    #[must_use]
    pub fn to_definition(&self) -> ToolDefinition {
        let mut parameters = self.schema.clone().to_value();
        if let Some(obj) = parameters.as_object_mut() {
            obj.remove("$schema");
        }
        ToolDefinition {
            name: self.id.to_owned(),
            description: self.description.to_owned(),
            parameters,
        }
    }
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    #[must_use]
    pub fn from_definitions(tools: Vec<ToolDef>) -> Self {
        Self { tools }
    }

    #[must_use]
    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolDef::to_definition).collect()
    }
}
