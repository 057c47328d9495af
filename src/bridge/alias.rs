use anyhow::bail;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::bridge::config::BridgeConfig;
use crate::rpc::value::RpcValue;

/// One piece of an alias template: literal text, or a placeholder bound to a top-level
///  field of the outbound value. A consuming placeholder removes the field after
///  substitution so it is not duplicated in the encoded content; a peeking one
///  (`%!{...}`) leaves it intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Literal(String),
    Placeholder { field: String, consuming: bool },
}

/// A parsed per-operation path template. Placeholder syntax is `%{field}` (consuming)
///  and `%!{field}` (peeking); malformed placeholder openings are kept as literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTemplate {
    fragments: Vec<Fragment>,
}

impl AliasTemplate {
    pub fn parse(template: &str) -> AliasTemplate {
        let mut fragments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(pos) = rest.find('%') {
            let (head, tail) = rest.split_at(pos);
            literal.push_str(head);

            let (consuming, after_opening) = if let Some(t) = tail.strip_prefix("%!{") {
                (false, t)
            } else if let Some(t) = tail.strip_prefix("%{") {
                (true, t)
            } else {
                // a lone percent sign is just text
                literal.push('%');
                rest = &tail[1..];
                continue;
            };

            match after_opening.find('}') {
                Some(end) => {
                    if !literal.is_empty() {
                        fragments.push(Fragment::Literal(std::mem::take(&mut literal)));
                    }
                    fragments.push(Fragment::Placeholder {
                        field: after_opening[..end].to_string(),
                        consuming,
                    });
                    rest = &after_opening[end + 1..];
                }
                None => {
                    // unterminated placeholder, treat the rest as literal text
                    literal.push_str(tail);
                    rest = "";
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            fragments.push(Fragment::Literal(literal));
        }

        AliasTemplate { fragments }
    }

    /// true if the template contains no placeholders and can serve as a reverse lookup key
    pub fn is_literal(&self) -> bool {
        self.fragments.iter().all(|f| matches!(f, Fragment::Literal(_)))
    }

    /// Substitutes placeholders from the value's top-level fields, removing consumed
    ///  fields. Fails if a referenced field is absent.
    pub fn resolve(&self, value: &mut RpcValue) -> anyhow::Result<String> {
        let mut result = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Literal(text) => result.push_str(text),
                Fragment::Placeholder { field, consuming } => {
                    let rendered = match value.first_child(field) {
                        Some(child) => child.render(),
                        None => bail!("alias placeholder references field {:?} which is not present in the outbound value", field),
                    };
                    result.push_str(&rendered);
                    if *consuming {
                        value.remove_child(field);
                    }
                }
            }
        }
        Ok(result)
    }
}

/// An outbound target: the full resource URI and the path to put into the URI path
///  option of the wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub uri: String,
    pub path: String,
}

/// Composes the outbound target for a request: `coap://host:port` from the channel's
///  location, then the operation's alias templates (substituted against the value) or
///  the literal location path. An empty resource path becomes `/` on the URI; a path
///  that names no resource at all defaults the path option to `/` + operation name.
pub fn resolve_target(
    config: &BridgeConfig,
    operation: &str,
    value: &mut RpcValue,
) -> anyhow::Result<ResolvedTarget> {
    let aliases = config.aliases(operation);

    let mut resource = String::new();
    if aliases.is_empty() {
        resource.push_str(&config.location.path);
    } else {
        for alias in aliases {
            resource.push_str(&AliasTemplate::parse(alias).resolve(value)?);
        }
    }

    let uri = format!(
        "coap://{}:{}{}",
        config.location.host,
        config.location.port,
        if resource.is_empty() { "/" } else { resource.as_str() },
    );

    let path = if resource.is_empty() || resource == "/" {
        format!("/{}", operation)
    } else {
        resource
    };

    Ok(ResolvedTarget { uri, path })
}

/// Reverse mapping from an inbound resource path back to an operation name. Literal
///  (placeholder-free) aliases are registered at construction; a path matching no alias
///  names its operation directly.
pub struct AliasRegistry {
    by_path: FxHashMap<String, String>,
}

impl AliasRegistry {
    pub fn new(config: &BridgeConfig) -> AliasRegistry {
        let mut by_path = FxHashMap::default();
        for (operation, op_config) in &config.operations {
            for alias in &op_config.aliases {
                if AliasTemplate::parse(alias).is_literal() {
                    by_path.insert(strip_separator(alias).to_string(), operation.clone());
                }
            }
        }
        AliasRegistry { by_path }
    }

    /// the operation name for an inbound path; a message without a path yields an empty
    ///  name
    pub fn operation_for(&self, path: Option<&str>) -> String {
        let path = match path {
            Some(p) => p,
            None => {
                warn!("inbound message does not carry a resource path");
                return String::new();
            }
        };

        let stripped = strip_separator(path);
        match self.by_path.get(stripped) {
            Some(operation) => operation.clone(),
            None => stripped.to_string(),
        }
    }
}

fn strip_separator(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::bridge::config::{BridgeConfig, Location, OperationConfig};
    use crate::rpc::value::RpcValue;

    use super::*;

    #[rstest]
    #[case::literal_only("/sensors", vec![Fragment::Literal("/sensors".to_string())])]
    #[case::consuming("%{id}", vec![Fragment::Placeholder { field: "id".to_string(), consuming: true }])]
    #[case::peeking("%!{id}", vec![Fragment::Placeholder { field: "id".to_string(), consuming: false }])]
    #[case::mixed("/a/%{b}/c", vec![
        Fragment::Literal("/a/".to_string()),
        Fragment::Placeholder { field: "b".to_string(), consuming: true },
        Fragment::Literal("/c".to_string()),
    ])]
    #[case::lone_percent("/100%", vec![Fragment::Literal("/100%".to_string())])]
    #[case::unterminated("/a/%{b", vec![Fragment::Literal("/a/%{b".to_string())])]
    fn test_template_parse(#[case] template: &str, #[case] expected: Vec<Fragment>) {
        assert_eq!(AliasTemplate::parse(template).fragments, expected);
    }

    #[test]
    fn test_substitution_consumes_and_peeks() {
        let template = AliasTemplate::parse("/sensors/%{id}/%!{unit}");

        let mut value = RpcValue::empty();
        value.set_child("id", RpcValue::from("7"));
        value.set_child("unit", RpcValue::from("C"));

        let path = template.resolve(&mut value).unwrap();

        assert_eq!(path, "/sensors/7/C");
        assert_eq!(value.first_child("id"), None);
        assert_eq!(value.first_child("unit"), Some(&RpcValue::from("C")));
    }

    #[test]
    fn test_missing_field_fails() {
        let template = AliasTemplate::parse("/sensors/%{id}");
        let mut value = RpcValue::empty();
        assert!(template.resolve(&mut value).is_err());
    }

    fn config(location_path: &str, operation: &str, aliases: &[&str]) -> BridgeConfig {
        let mut location = Location::new("192.168.0.5", 5683);
        location.path = location_path.to_string();
        let mut config = BridgeConfig::new(location);
        config.operations.insert(operation.to_string(), OperationConfig {
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        });
        config
    }

    #[test]
    fn test_target_with_alias() {
        let config = config("", "getTemp", &["/sensors/%{id}"]);

        let mut value = RpcValue::empty();
        value.set_child("id", RpcValue::from("7"));

        let target = resolve_target(&config, "getTemp", &mut value).unwrap();
        assert_eq!(target.uri, "coap://192.168.0.5:5683/sensors/7");
        assert_eq!(target.path, "/sensors/7");
    }

    #[test]
    fn test_target_without_alias_uses_location_path() {
        let config = config("/devices", "getTemp", &[]);
        let target = resolve_target(&config, "getTemp", &mut RpcValue::empty()).unwrap();
        assert_eq!(target.uri, "coap://192.168.0.5:5683/devices");
        assert_eq!(target.path, "/devices");
    }

    #[test]
    fn test_target_defaults_to_operation_name() {
        let config = config("", "getTemp", &[]);
        let target = resolve_target(&config, "getTemp", &mut RpcValue::empty()).unwrap();
        assert_eq!(target.uri, "coap://192.168.0.5:5683/");
        assert_eq!(target.path, "/getTemp");
    }

    #[test]
    fn test_reverse_lookup() {
        let config = config("", "getTemp", &["/thermometer"]);
        let registry = AliasRegistry::new(&config);

        assert_eq!(registry.operation_for(Some("/thermometer")), "getTemp");
        assert_eq!(registry.operation_for(Some("/getHumidity")), "getHumidity");
        assert_eq!(registry.operation_for(None), "");
    }

    #[test]
    fn test_reverse_lookup_skips_templated_aliases() {
        let config = config("", "getTemp", &["/sensors/%{id}"]);
        let registry = AliasRegistry::new(&config);

        // the templated alias is not a literal key, the raw path comes back as-is
        assert_eq!(registry.operation_for(Some("/sensors/7")), "sensors/7");
    }
}
