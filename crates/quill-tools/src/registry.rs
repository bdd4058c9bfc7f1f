//! Tool registry — lookup, definitions, and input validation.

use quill_core::traits::Tool;
use quill_core::types::ToolDefinition;

/// Fixed set of tools available to the model for one deployment.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Find a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// All tool definitions, for advertising to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Validate a tool call payload against the tool's declared schema.
///
/// Checks required fields exist and declared string properties are strings.
/// A violation is returned as a description for the model, not an error.
pub fn validate_args(
    definition: &ToolDefinition,
    args: &serde_json::Value,
) -> Result<(), String> {
    let params = &definition.parameters;
    if let Some(required) = params.get("required").and_then(|r| r.as_array()) {
        for req in required {
            if let Some(key) = req.as_str()
                && args.get(key).is_none()
            {
                return Err(format!("Missing required argument: {key}"));
            }
        }
    }
    if let Some(props) = params.get("properties").and_then(|p| p.as_object()) {
        for (key, schema) in props {
            if let Some(value) = args.get(key)
                && schema.get("type").and_then(|t| t.as_str()) == Some("string")
                && !value.is_string()
            {
                return Err(format!("Argument '{key}' must be a string"));
            }
        }
    }
    Ok(())
}
