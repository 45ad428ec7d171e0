use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid"));

/// Replace `{{name}}` placeholders. Unknown names are left in place so a
/// missing variable is visible in the output.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures| {
            vars.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_variables() {
        let vars = HashMap::from([("app_name", "AngelHub".to_string())]);
        assert_eq!(
            render("Welcome to {{app_name}} and {{ app_name }}", &vars),
            "Welcome to AngelHub and AngelHub"
        );
    }

    #[test]
    fn unknown_variables_survive() {
        let vars = HashMap::new();
        assert_eq!(render("Hi {{name}}", &vars), "Hi {{name}}");
    }
}
