//! Skill/will coercion for `employees_update` and `employees_search`.

use ca_domain::SkillLevel;
use serde_json::Value;

const DEFAULT_LEVEL: u8 = 3;

/// Coerce a skills/wills value into `{name, level}` pairs. Accepts a bare
/// string, a list mixing strings and `{name|skill|id, level}` objects, or a
/// map of `name -> level`. Returns an error message (not a panic) for the
/// `{"$add": N}` relative-update shape some models produce — the absolute
/// level is required because the parser has no access to the current one.
pub fn normalize_skills(value: &Value) -> Result<Vec<SkillLevel>, String> {
    match value {
        Value::String(s) => Ok(vec![SkillLevel {
            name: normalize_name(s),
            level: DEFAULT_LEVEL,
        }]),
        Value::Object(map) => Ok(map
            .iter()
            .map(|(name, level)| SkillLevel {
                name: normalize_name(name),
                level: level.as_u64().map(|v| v as u8).unwrap_or(DEFAULT_LEVEL),
            })
            .collect()),
        Value::Array(items) => {
            let mut result = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => result.push(SkillLevel {
                        name: normalize_name(s),
                        level: DEFAULT_LEVEL,
                    }),
                    Value::Object(obj) => {
                        let name = obj
                            .get("name")
                            .or_else(|| obj.get("skill"))
                            .or_else(|| obj.get("id"))
                            .and_then(Value::as_str);
                        let Some(name) = name else { continue };
                        let level = match obj.get("level") {
                            Some(Value::Object(op)) if op.contains_key("$add") => {
                                let delta = op.get("$add").cloned().unwrap_or(Value::Null);
                                return Err(format!(
                                    "Cannot use '$add' operator for skill '{name}'. To update \
                                     skill level by {delta}, first use employees_get to find the \
                                     current level, then provide the absolute new level. \
                                     Example: {{\"name\": \"{name}\", \"level\": 5}}"
                                ));
                            }
                            Some(Value::Object(_)) => {
                                return Err(format!(
                                    "Invalid level format for skill '{name}'. Level must be an \
                                     integer 1-10. Example: {{\"name\": \"{name}\", \"level\": 5}}"
                                ));
                            }
                            Some(v) => v.as_u64().map(|v| v as u8).unwrap_or(DEFAULT_LEVEL),
                            None => DEFAULT_LEVEL,
                        };
                        result.push(SkillLevel {
                            name: normalize_name(name),
                            level,
                        });
                    }
                    _ => {}
                }
            }
            Ok(result)
        }
        _ => Ok(Vec::new()),
    }
}

/// Mark a will-side filter's name with the `will_` prefix in place of any
/// `skill_` prefix the generic normalizer applied.
pub fn rename_as_will(name: &str) -> String {
    if let Some(suffix) = name.strip_prefix("skill_") {
        format!("will_{suffix}")
    } else if name.starts_with("will_") {
        name.to_string()
    } else {
        format!("will_{name}")
    }
}

fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_string_list_defaults_to_level_three() {
        let skills = normalize_skills(&json!(["python", "ml"])).unwrap();
        assert_eq!(skills[0], SkillLevel { name: "python".into(), level: 3 });
        assert_eq!(skills[1], SkillLevel { name: "ml".into(), level: 3 });
    }

    #[test]
    fn object_map_form_uses_explicit_levels() {
        let skills = normalize_skills(&json!({"python": 4, "ml": 2})).unwrap();
        assert!(skills.contains(&SkillLevel { name: "python".into(), level: 4 }));
    }

    #[test]
    fn add_operator_is_rejected_with_guidance() {
        let err = normalize_skills(&json!([{"name": "python", "level": {"$add": 1}}])).unwrap_err();
        assert!(err.contains("$add"));
        assert!(err.contains("employees_get"));
    }

    #[test]
    fn rename_as_will_swaps_skill_prefix() {
        assert_eq!(rename_as_will("skill_python"), "will_python");
        assert_eq!(rename_as_will("python"), "will_python");
    }
}
