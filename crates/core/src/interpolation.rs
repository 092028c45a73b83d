use std::collections::{HashMap, HashSet};

use leon::Template;

use crate::error::Result;
use crate::parser::BoundCommand;
use crate::tree::CommandNode;

/// Keys referenced by a template string.
pub fn get_template_keys(template: &str) -> Result<HashSet<String>> {
    let template = Template::parse(template)?;

    let mut keys = HashSet::new();
    for key in template.keys() {
        let _ = keys.insert((*key).to_string());
    }

    Ok(keys)
}

/// Every parameter the node declares, mapped to its bound value. Parameters
/// that were not given and have no default map to an empty string so
/// templates referencing optional parameters still render.
pub fn build_context(node: &CommandNode, bound: &BoundCommand) -> HashMap<String, String> {
    let mut context: HashMap<String, String> = HashMap::new();

    let declared = node
        .arguments
        .iter()
        .map(|argument| &argument.name)
        .chain(node.options.iter().filter(|o| !o.is_help).map(|o| &o.name));
    for name in declared {
        context.insert(name.clone(), String::new());
    }

    for (name, value) in &bound.values {
        context.insert(name.clone(), value.to_string());
    }

    context
}

pub fn interpolate(template: &str, context: &HashMap<String, String>) -> Result<String> {
    let template = Template::parse(template)?;
    Ok(template.render(context)?)
}

/// Renders a command's `run` template with its bound values.
pub fn render_command(template: &str, node: &CommandNode, bound: &BoundCommand) -> Result<String> {
    interpolate(template, &build_context(node, bound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_index;
    use crate::value::Value;
    use indexmap::IndexMap;

    #[test]
    fn test_get_template_keys() {
        let keys = get_template_keys("Hello {name}, you are {age}").unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("name"));
        assert!(keys.contains("age"));
    }

    #[test]
    fn test_get_template_keys_invalid_template() {
        assert!(get_template_keys("Hello {name").is_err());
    }

    #[test]
    fn test_render_command_fills_missing_with_empty() {
        let index = fixture_index();
        let node = index.lookup(&["greet"]).unwrap();
        let mut values = IndexMap::new();
        values.insert("name".to_string(), Value::Text("Ada".to_string()));
        let bound = BoundCommand {
            path: vec!["greet".to_string()],
            values,
        };
        let rendered = render_command("Hello {name}!{loud}", node, &bound).unwrap();
        assert_eq!(rendered, "Hello Ada!");
    }

    #[test]
    fn test_interpolate_missing_key_is_error() {
        let context = HashMap::new();
        assert!(interpolate("{missing}", &context).is_err());
    }
}
