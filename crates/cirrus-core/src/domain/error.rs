use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (for reporting the same failure per stack)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
///
/// Every variant here is detected at configuration time, before any
/// remote call is made.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Stack '{name}' is declared more than once")]
    DuplicateStack { name: String },

    #[error("Stack '{stack}' is missing required section '{section}'")]
    MissingSection {
        stack: String,
        section: &'static str,
    },

    #[error("Cannot parse parameter '{param}' for stack '{stack}'")]
    MalformedParameter { stack: String, param: String },

    // ========================================================================
    // Graph Errors
    // ========================================================================
    #[error("Dependency cycle between stacks: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Stack '{stack}' references '{dependency}' which is not in its depends list")]
    UndeclaredDependency { stack: String, dependency: String },

    #[error("Stack '{stack}' depends on '{dependency}' which is not in the configuration")]
    UnknownDependency { stack: String, dependency: String },

    #[error("Stack '{stack}' references disabled stack '{dependency}'")]
    DisabledDependency { stack: String, dependency: String },

    // ========================================================================
    // Substitution Errors
    // ========================================================================
    #[error("Cannot resolve variable '{{{{{name}}}}}': no value in the environment")]
    UnresolvedVariable { name: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(msg) => vec![
                "Check the structure of your configuration file".into(),
                format!("Details: {}", msg),
            ],
            Self::DuplicateStack { name } => vec![
                format!("Rename one of the '{}' entries under 'stacks'", name),
                "Stack names must be unique within one configuration".into(),
            ],
            Self::MissingSection { stack, section } => vec![
                format!("Add a '{}' section to stack '{}'", section, stack),
                "'params' and 'depends' are required but may be empty".into(),
            ],
            Self::CyclicDependency { cycle } => vec![
                "Stacks cannot depend on each other in a loop".into(),
                format!("Break one of the edges in: {}", cycle.join(" -> ")),
            ],
            Self::UndeclaredDependency { stack, dependency } => vec![
                format!("Add '{}' to the depends list of stack '{}'", dependency, stack),
                "Every referenced stack must also be a declared dependency".into(),
            ],
            Self::UnknownDependency { dependency, .. } => vec![
                format!("Declare a stack named '{}' or fix the depends entry", dependency),
            ],
            Self::DisabledDependency { stack, dependency } => vec![
                format!("Stack '{}' is disabled but '{}' still references its values", dependency, stack),
                "Re-enable the stack, or remove the reference".into(),
            ],
            Self::UnresolvedVariable { name } => vec![
                format!("Set the environment variable '{}' before running", name),
                "Unset variables are a hard error so a blank value is never deployed".into(),
            ],
            Self::MalformedParameter { .. } => vec![
                "A parameter is a plain value, a mapping with 'value', or a mapping with 'source'/'type'/'variable'".into(),
            ],
        }
    }
}
