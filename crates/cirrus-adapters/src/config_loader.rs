//! YAML stack-set configuration loader.
//!
//! Parses a configuration document into a validated [`StackSet`],
//! reading and normalizing each stack's template along the way.
//!
//! # Document format
//!
//! One top-level key names the stack set; everything lives under it:
//!
//! ```yaml
//! prod:
//!   region: eu-west-1
//!   highlight-output: true      # optional, default true
//!   sns-topic-arn: arn:aws:sns:eu-west-1:123456789:deploys   # optional,
//!                                # string or sequence, per-stack override
//!   tags:                       # optional root-scope tags
//!     team: platform
//!   stacks:                     # declaration order is the run order tie-break
//!     vpc:
//!       template: templates/vpc.yaml
//!       depends: []
//!       params:
//!         CidrBlock:
//!           value: 10.0.0.0/16
//!     app:
//!       template: templates/app.yaml
//!       depends: [vpc]
//!       disable: false          # optional
//!       tags:                   # optional, override root tags per key
//!         tier: app
//!       params:
//!         AmiId: ami-{{AMI_SUFFIX}}        # {{NAME}} = environment variable
//!         VpcId:
//!           source: vpc                    # cross-stack reference
//!           type: output                   # parameter | output | resource
//!           variable: VpcId
//!         Subnets:                         # sequence = comma-joined list
//!           - source: vpc
//!             type: output
//!             variable: SubnetA
//!           - value: subnet-static
//! ```
//!
//! `{{NAME}}` placeholders are substituted from the environment over the
//! whole document before parsing; an unset variable is a hard error.
//! Template paths are resolved relative to the configuration file.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde_yaml::{Mapping, Value};
use tracing::{debug, instrument};

use cirrus_core::domain::{
    DomainError, ParameterValue, StackDefinition, StackSet, merge_tags, substitute_env,
};

use crate::template;

/// Tag stamped onto every stack so backend resources can be traced back
/// to the set that owns them.
pub const STACK_SET_TAG: &str = "cirrus-stack-set";

/// Loads a [`StackSet`] from a YAML configuration file.
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader pointed at a configuration file. The file is not
    /// touched until [`load`](Self::load) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read, substitute, parse and validate the configuration.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<StackSet, DomainError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            DomainError::Config(format!(
                "cannot read configuration file '{}': {e}",
                self.path.display()
            ))
        })?;
        let substituted = substitute_env(&raw)?;
        let base_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let set = parse_stack_set(&substituted, base_dir)?;
        debug!(set = %set.name, stacks = set.stacks().len(), "configuration loaded");
        Ok(set)
    }
}

/// Parse an already-substituted configuration document. Split out from
/// [`ConfigLoader::load`] so tests can parse without touching the
/// process environment.
pub fn parse_stack_set(raw: &str, base_dir: &Path) -> Result<StackSet, DomainError> {
    let doc: Value = serde_yaml::from_str(raw)
        .map_err(|e| DomainError::Config(format!("configuration is not valid YAML: {e}")))?;
    let top = doc
        .as_mapping()
        .ok_or_else(|| DomainError::Config("configuration root must be a mapping".into()))?;

    if top.len() != 1 {
        return Err(DomainError::Config(format!(
            "expected exactly one top-level key naming the stack set, found {}",
            top.len()
        )));
    }
    let (name_value, body_value) = top.iter().next().expect("length checked above");
    let set_name = name_value
        .as_str()
        .ok_or_else(|| DomainError::Config("the stack-set name must be a string".into()))?;
    let body = body_value.as_mapping().ok_or_else(|| {
        DomainError::Config(format!("stack set '{set_name}' must be a mapping"))
    })?;

    let region = required_str(body, "region", set_name)?;
    let highlight_output = match body.get("highlight-output") {
        None => true,
        Some(v) => v.as_bool().ok_or_else(|| {
            DomainError::Config(format!(
                "'highlight-output' in stack set '{set_name}' must be a boolean"
            ))
        })?,
    };
    let root_tags = match body.get("tags") {
        None => BTreeMap::new(),
        Some(v) => parse_tags(v, set_name)?,
    };
    let root_notify = match body.get("sns-topic-arn") {
        None => Vec::new(),
        Some(v) => parse_notify(v, set_name, &region)?,
    };

    let stacks = body
        .get("stacks")
        .ok_or_else(|| {
            DomainError::Config(format!("stack set '{set_name}' has no 'stacks' section"))
        })?
        .as_mapping()
        .ok_or_else(|| {
            DomainError::Config(format!("'stacks' in stack set '{set_name}' must be a mapping"))
        })?;

    let mut set = StackSet::new(set_name, region);
    set.highlight_output = highlight_output;

    // serde_yaml mappings iterate in document order, which preserves the
    // declaration order the topological tie-break relies on.
    for (key, value) in stacks {
        let stack_name = key.as_str().ok_or_else(|| {
            DomainError::Config(format!("stack names in '{set_name}' must be strings"))
        })?;
        let stack = parse_stack(stack_name, value, base_dir, &set, &root_tags, &root_notify)?;
        set.push_stack(stack)?;
    }

    Ok(set)
}

fn parse_stack(
    name: &str,
    value: &Value,
    base_dir: &Path,
    set: &StackSet,
    root_tags: &BTreeMap<String, String>,
    root_notify: &[String],
) -> Result<StackDefinition, DomainError> {
    let set_name = set.name.as_str();
    let body = value
        .as_mapping()
        .ok_or_else(|| DomainError::Config(format!("stack '{name}' must be a mapping")))?;

    let template_path = body
        .get("template")
        .and_then(Value::as_str)
        .ok_or(DomainError::MissingSection {
            stack: name.to_string(),
            section: "template",
        })?;
    let template_raw = fs::read_to_string(base_dir.join(template_path)).map_err(|e| {
        DomainError::Config(format!(
            "cannot read template '{template_path}' for stack '{name}': {e}"
        ))
    })?;
    let template_body = template::canonical_json(&template_raw)?;

    let depends = body
        .get("depends")
        .ok_or(DomainError::MissingSection {
            stack: name.to_string(),
            section: "depends",
        })?
        .as_sequence()
        .ok_or_else(|| {
            DomainError::Config(format!("'depends' of stack '{name}' must be a sequence"))
        })?
        .iter()
        .map(|d| {
            d.as_str().map(Into::into).ok_or_else(|| {
                DomainError::Config(format!(
                    "'depends' entries of stack '{name}' must be strings"
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let params_value = body.get("params").ok_or(DomainError::MissingSection {
        stack: name.to_string(),
        section: "params",
    })?;
    let empty = Mapping::new();
    let params_map = match params_value {
        // A bare `params:` key parses as null; treat it as empty.
        Value::Null => &empty,
        other => other.as_mapping().ok_or_else(|| {
            DomainError::Config(format!("'params' of stack '{name}' must be a mapping"))
        })?,
    };
    let mut params = BTreeMap::new();
    for (param_key, param_value) in params_map {
        let param_name = param_key.as_str().ok_or_else(|| {
            DomainError::Config(format!("parameter names of stack '{name}' must be strings"))
        })?;
        params.insert(
            param_name.to_string(),
            parse_param(name, param_name, param_value)?,
        );
    }

    let mut tags = match body.get("tags") {
        None => root_tags.clone(),
        Some(v) => merge_tags(root_tags, &parse_tags(v, name)?),
    };
    tags.insert(STACK_SET_TAG.to_string(), set_name.to_string());

    let notify = match body.get("sns-topic-arn") {
        None => root_notify.to_vec(),
        Some(v) => parse_notify(v, name, &set.region)?,
    };

    let disabled = match body.get("disable") {
        None => false,
        Some(v) => v.as_bool().ok_or_else(|| {
            DomainError::Config(format!("'disable' of stack '{name}' must be a boolean"))
        })?,
    };

    Ok(StackDefinition {
        name: name.into(),
        depends,
        template_body,
        params,
        tags,
        notify,
        disabled,
    })
}

/// `sns-topic-arn`: one topic or a sequence of topics, root-scope unless
/// the stack declares its own. A topic's region field must match the
/// set's region; the backend would only reject it at operation time.
fn parse_notify(value: &Value, context: &str, region: &str) -> Result<Vec<String>, DomainError> {
    let topics: Vec<String> = match value {
        Value::String(s) => vec![s.clone()],
        Value::Sequence(items) => items
            .iter()
            .map(|t| {
                t.as_str().map(str::to_owned).ok_or_else(|| {
                    DomainError::Config(format!(
                        "'sns-topic-arn' entries of '{context}' must be strings"
                    ))
                })
            })
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(DomainError::Config(format!(
                "'sns-topic-arn' of '{context}' must be a string or a sequence"
            )));
        }
    };
    for topic in &topics {
        if topic.split(':').nth(3) != Some(region) {
            return Err(DomainError::Config(format!(
                "notification topic '{topic}' is not in region '{region}'"
            )));
        }
    }
    Ok(topics)
}

fn parse_param(stack: &str, param: &str, value: &Value) -> Result<ParameterValue, DomainError> {
    match value {
        Value::Sequence(items) => {
            let elements = items
                .iter()
                .map(|item| match item {
                    // No nested lists: the wire form is a flat comma join.
                    Value::Sequence(_) => Err(malformed(stack, param)),
                    other => parse_scalar_param(stack, param, other),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ParameterValue::List(elements))
        }
        other => parse_scalar_param(stack, param, other),
    }
}

fn parse_scalar_param(
    stack: &str,
    param: &str,
    value: &Value,
) -> Result<ParameterValue, DomainError> {
    if let Some(text) = scalar_string(value) {
        return Ok(ParameterValue::Literal(text));
    }

    let mapping = value.as_mapping().ok_or_else(|| malformed(stack, param))?;

    if let Some(literal) = mapping.get("value") {
        return scalar_string(literal)
            .map(ParameterValue::Literal)
            .ok_or_else(|| malformed(stack, param));
    }

    let field = |key: &str| {
        mapping
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(stack, param))
    };
    let source = field("source")?;
    let kind = field("type")?
        .parse()
        .map_err(|_| malformed(stack, param))?;
    let variable = field("variable")?;

    Ok(ParameterValue::Reference {
        stack: source.into(),
        kind,
        key: variable.to_string(),
    })
}

fn malformed(stack: &str, param: &str) -> DomainError {
    DomainError::MalformedParameter {
        stack: stack.to_string(),
        param: param.to_string(),
    }
}

/// Scalars of any YAML type become parameter text; the backend only
/// speaks strings.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_tags(value: &Value, context: &str) -> Result<BTreeMap<String, String>, DomainError> {
    let mapping = value
        .as_mapping()
        .ok_or_else(|| DomainError::Config(format!("'tags' of '{context}' must be a mapping")))?;
    let mut tags = BTreeMap::new();
    for (key, val) in mapping {
        let name = key.as_str().ok_or_else(|| {
            DomainError::Config(format!("tag names of '{context}' must be strings"))
        })?;
        let text = scalar_string(val).ok_or_else(|| {
            DomainError::Config(format!("tag '{name}' of '{context}' must be a scalar"))
        })?;
        tags.insert(name.to_string(), text);
    }
    Ok(tags)
}

fn required_str(body: &Mapping, key: &str, context: &str) -> Result<String, DomainError> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            DomainError::Config(format!(
                "stack set '{context}' is missing required string '{key}'"
            ))
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
