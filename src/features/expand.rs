//! Flag-set and flag-group expansion against build variables.

use thiserror::Error;

use crate::core::toolchain::{
    FlagGroup, FlagGroupContent, FlagSet, FlagTemplate, TemplateChunk, WithFeatureSet,
};
use crate::core::variables::{BuildVariables, VariableValue};

/// Error expanding a flag template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    #[error("variable `{variable}` is not available while expanding `{template}`")]
    MissingVariable { variable: String, template: String },

    #[error("variable `{variable}` is a list and cannot be expanded as a string in `{template}`")]
    NotAString { variable: String, template: String },

    #[error("cannot iterate over `{0}`: it is not a list")]
    NotAList(String),
}

/// Variable lookup with the bindings introduced by `iterate_over`.
pub(crate) struct Scope<'a> {
    variables: &'a BuildVariables,
    bound: Vec<(String, VariableValue)>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(variables: &'a BuildVariables) -> Self {
        Scope {
            variables,
            bound: Vec::new(),
        }
    }

    fn get(&self, name: &str) -> Option<&VariableValue> {
        self.bound
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .or_else(|| self.variables.get(name))
    }

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Check a `with_features` list: empty, or any entry satisfied.
pub fn with_features_satisfied(
    with_features: &[WithFeatureSet],
    is_enabled: impl Fn(&str) -> bool,
) -> bool {
    with_features.is_empty()
        || with_features.iter().any(|set| {
            set.features.iter().all(|f| is_enabled(f.as_str()))
                && !set.not_features.iter().any(|f| is_enabled(f.as_str()))
        })
}

/// Expand one flag set, appending flags to `out`.
pub(crate) fn expand_flag_set(
    flag_set: &FlagSet,
    scope: &mut Scope<'_>,
    out: &mut Vec<String>,
) -> Result<(), ExpansionError> {
    if !flag_set
        .expand_if_all_available
        .iter()
        .all(|v| scope.contains(v))
    {
        return Ok(());
    }
    for group in &flag_set.flag_groups {
        expand_group(group, scope, out)?;
    }
    Ok(())
}

fn should_expand(group: &FlagGroup, scope: &Scope<'_>) -> bool {
    if !group.expand_if_available.iter().all(|v| scope.contains(v)) {
        return false;
    }
    if group.expand_if_not_available.iter().any(|v| scope.contains(v)) {
        return false;
    }
    if let Some(var) = &group.expand_if_true {
        match scope.get(var) {
            Some(value) if value.is_truthy() => {}
            _ => return false,
        }
    }
    if let Some(var) = &group.expand_if_false {
        match scope.get(var) {
            Some(value) if !value.is_truthy() => {}
            _ => return false,
        }
    }
    if let Some(eq) = &group.expand_if_equal {
        match scope.get(&eq.variable).and_then(VariableValue::as_scalar) {
            Some(value) if value == eq.value => {}
            _ => return false,
        }
    }
    true
}

fn expand_group(
    group: &FlagGroup,
    scope: &mut Scope<'_>,
    out: &mut Vec<String>,
) -> Result<(), ExpansionError> {
    if !should_expand(group, scope) {
        return Ok(());
    }

    match &group.iterate_over {
        None => expand_content(&group.content, scope, out),
        Some(var) => {
            let items = match scope.get(var) {
                Some(VariableValue::List(items)) => items.clone(),
                Some(_) => return Err(ExpansionError::NotAList(var.clone())),
                None => {
                    return Err(ExpansionError::MissingVariable {
                        variable: var.clone(),
                        template: format!("iterate_over = {}", var),
                    })
                }
            };
            for item in items {
                scope.bound.push((var.clone(), VariableValue::String(item)));
                let result = expand_content(&group.content, scope, out);
                scope.bound.pop();
                result?;
            }
            Ok(())
        }
    }
}

fn expand_content(
    content: &FlagGroupContent,
    scope: &mut Scope<'_>,
    out: &mut Vec<String>,
) -> Result<(), ExpansionError> {
    match content {
        FlagGroupContent::Flags(flags) => {
            for flag in flags {
                out.push(expand_template(flag, scope)?);
            }
            Ok(())
        }
        FlagGroupContent::Groups(groups) => {
            for group in groups {
                expand_group(group, scope, out)?;
            }
            Ok(())
        }
    }
}

/// Substitute variables into one template.
pub(crate) fn expand_template(
    template: &FlagTemplate,
    scope: &Scope<'_>,
) -> Result<String, ExpansionError> {
    let mut expanded = String::new();
    for chunk in template.chunks() {
        match chunk {
            TemplateChunk::Literal(text) => expanded.push_str(text),
            TemplateChunk::Variable(name) => match scope.get(name) {
                Some(value) => match value.as_scalar() {
                    Some(s) => expanded.push_str(&s),
                    None => {
                        return Err(ExpansionError::NotAString {
                            variable: name.clone(),
                            template: template.to_string(),
                        })
                    }
                },
                None => {
                    return Err(ExpansionError::MissingVariable {
                        variable: name.clone(),
                        template: template.to_string(),
                    })
                }
            },
        }
    }
    Ok(expanded)
}
