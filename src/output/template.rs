//! Output filename templates.
//!
//! Host variables are expanded first, then the built-in `$$DATE$$`,
//! `$$USER$$` and `$$WS$$` tokens in a single left-to-right pass.
//! Substituted text is never scanned again.

use std::{collections::HashMap, env, path::PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{PlotError, Result};

pub const DATE_TOKEN: &str = "$$DATE$$";
pub const USER_TOKEN: &str = "$$USER$$";
pub const WS_TOKEN: &str = "$$WS$$";

static BUILTIN_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$(DATE|USER|WS)\$\$").unwrap());
static HOST_VARIABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").unwrap());

/// The host's variable expansion, opaque to this crate.
pub trait VariableSubstitutor {
    fn substitute(&self, template: &str) -> Result<String>;
}

impl<F> VariableSubstitutor for F
where
    F: Fn(&str) -> Result<String>,
{
    fn substitute(&self, template: &str) -> Result<String> {
        self(template)
    }
}

/// Leaves the template untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVariables;

impl VariableSubstitutor for NoVariables {
    fn substitute(&self, template: &str) -> Result<String> {
        Ok(template.to_string())
    }
}

/// `${name}` expansion from a fixed map. Unknown names are an error.
#[derive(Debug, Clone, Default)]
pub struct VariableMap {
    vars: HashMap<String, String>,
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}

impl FromIterator<(String, String)> for VariableMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { vars: iter.into_iter().collect() }
    }
}

impl VariableSubstitutor for VariableMap {
    fn substitute(&self, template: &str) -> Result<String> {
        if let Some(unknown) = HOST_VARIABLE
            .captures_iter(template)
            .map(|c| c[1].to_string())
            .find(|name| !self.vars.contains_key(name))
        {
            return Err(PlotError::config(format!("unknown variable '{unknown}' in output path")));
        }
        Ok(HOST_VARIABLE
            .replace_all(template, |c: &Captures| self.vars[&c[1]].clone())
            .into_owned())
    }
}

/// Values for the built-in tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    pub date: String,
    /// `None` when the OS user cannot be determined.
    pub user: Option<String>,
    pub workspace: Option<PathBuf>,
}

impl TemplateContext {
    pub fn current(workspace: Option<PathBuf>) -> Self {
        Self {
            date: chrono::Local::now().format("%y%m%d").to_string(),
            user: current_user(),
            workspace,
        }
    }
}

/// Resolve an output template into a destination path string.
pub fn resolve(
    template: &str,
    substitutor: &dyn VariableSubstitutor,
    ctx: &TemplateContext,
) -> Result<String> {
    let expanded = substitutor.substitute(template)?;

    let workspace = if expanded.contains(WS_TOKEN) {
        let ws = ctx.workspace.as_ref().ok_or_else(|| {
            PlotError::config(format!("output path uses {WS_TOKEN} but no workspace is configured"))
        })?;
        Some(ws.to_string_lossy().into_owned())
    } else {
        None
    };
    if expanded.contains(USER_TOKEN) && ctx.user.is_none() {
        return Err(PlotError::config(format!(
            "output path uses {USER_TOKEN} but the current user name is unknown"
        )));
    }

    Ok(BUILTIN_TOKENS
        .replace_all(&expanded, |c: &Captures| match &c[1] {
            "DATE" => ctx.date.clone(),
            "USER" => ctx.user.clone().unwrap_or_default(),
            _ => workspace.clone().unwrap_or_default(),
        })
        .into_owned())
}

fn current_user() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|k| env::var(k).ok().filter(|v| !v.is_empty()))
}
