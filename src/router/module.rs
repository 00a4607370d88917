//! Handler modules
//!
//! A handler module is a TOML document whose top-level tables are exports.
//! Exports are named after an HTTP method (`GET`, `POST`, ...), or are the
//! generic `handler` / `default` fallbacks:
//!
//! ```toml
//! [GET]
//! returns = { id = "{{params.id}}" }
//!
//! [DELETE]
//! status = 204
//!
//! [default]
//! status = 405
//! json = { error = "unsupported method {{method}}" }
//! ```
//!
//! An export that sets `status`, `headers`, `content_type`, `body`, `json` or
//! `body_file` writes the response itself. Otherwise the dispatcher forwards
//! its `returns` value as the response body.

use super::fs::RouteFs;
use super::resolve::Params;
use crate::http::mime;
use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Export names tried after the exact method name, in order
const FALLBACK_EXPORTS: [&str; 2] = ["handler", "default"];

/// Handler module could not be read or parsed
#[derive(Debug)]
pub enum ModuleLoadError {
    Read { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, message: String },
    InvalidExport {
        path: PathBuf,
        export: String,
        message: String,
    },
}

impl fmt::Display for ModuleLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "cannot read handler module '{}': {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid handler module '{}': {message}", path.display())
            }
            Self::InvalidExport {
                path,
                export,
                message,
            } => write!(
                f,
                "invalid export '{export}' in '{}': {message}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ModuleLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Handler failed while producing its result
#[derive(Debug)]
pub enum InvocationError {
    Template { export: String, message: String },
    BodyFile { path: PathBuf, source: io::Error },
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template { export, message } => write!(f, "export '{export}': {message}"),
            Self::BodyFile { path, source } => {
                write!(f, "cannot read body file '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for InvocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BodyFile { source, .. } => Some(source),
            Self::Template { .. } => None,
        }
    }
}

/// One declarative handler
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Export {
    pub status: Option<u16>,
    pub headers: Option<BTreeMap<String, String>>,
    pub content_type: Option<String>,
    pub body: Option<String>,
    pub json: Option<Value>,
    pub body_file: Option<String>,
    pub returns: Option<Value>,
}

/// Response written by a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// What an invoked export produced
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    /// The handler wrote the response; nothing left to do
    Responded(HandlerResponse),
    /// The handler returned a value (or nothing) for the dispatcher to send
    Returned(Option<Value>),
}

/// Request data visible to handlers
#[derive(Debug, Clone, Copy)]
pub struct InvocationContext<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub params: &'a Params,
}

impl InvocationContext<'_> {
    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "method" => Some(self.method),
            "path" => Some(self.path),
            _ => name
                .strip_prefix("params.")
                .and_then(|key| self.params.get(key))
                .map(String::as_str),
        }
    }
}

/// Parsed handler module
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerModule {
    path: PathBuf,
    exports: BTreeMap<String, Export>,
}

impl HandlerModule {
    pub fn parse(path: &Path, source: &str) -> Result<Self, ModuleLoadError> {
        let exports: BTreeMap<String, Export> =
            toml::from_str(source).map_err(|e| ModuleLoadError::Parse {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            })?;

        for (name, export) in &exports {
            export
                .validate()
                .map_err(|message| ModuleLoadError::InvalidExport {
                    path: path.to_path_buf(),
                    export: name.clone(),
                    message,
                })?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            exports,
        })
    }

    /// Pick the export for `method`: exact method name, then `handler`, then `default`
    pub fn select(&self, method: &str) -> Option<(&str, &Export)> {
        std::iter::once(method)
            .chain(FALLBACK_EXPORTS)
            .find_map(|name| self.exports.get_key_value(name))
            .map(|(name, export)| (name.as_str(), export))
    }

    /// Run the export chosen for the request method
    ///
    /// Returns `None` when the module has no export for the method.
    pub async fn invoke<F: RouteFs>(
        &self,
        fs: &F,
        ctx: &InvocationContext<'_>,
    ) -> Option<Result<HandlerOutput, InvocationError>> {
        let (name, export) = self.select(ctx.method)?;
        let base_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        Some(export.invoke(fs, name, base_dir, ctx).await)
    }
}

impl Export {
    fn writes_response(&self) -> bool {
        self.status.is_some()
            || self.headers.is_some()
            || self.content_type.is_some()
            || self.body.is_some()
            || self.json.is_some()
            || self.body_file.is_some()
    }

    fn validate(&self) -> Result<(), String> {
        let body_sources = [
            self.body.is_some(),
            self.json.is_some(),
            self.body_file.is_some(),
        ];
        if body_sources.iter().filter(|set| **set).count() > 1 {
            return Err("only one of body, json, body_file may be set".to_string());
        }

        if let Some(status) = self.status {
            StatusCode::from_u16(status).map_err(|_| format!("invalid status code {status}"))?;
        }

        for (name, value) in self.headers.iter().flatten() {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| format!("invalid header name '{name}'"))?;
            HeaderValue::from_str(value)
                .map_err(|_| format!("invalid value for header '{name}'"))?;
        }

        if let Some(content_type) = &self.content_type {
            HeaderValue::from_str(content_type)
                .map_err(|_| format!("invalid content type '{content_type}'"))?;
        }

        Ok(())
    }

    async fn invoke<F: RouteFs>(
        &self,
        fs: &F,
        name: &str,
        base_dir: &Path,
        ctx: &InvocationContext<'_>,
    ) -> Result<HandlerOutput, InvocationError> {
        let template_err = |message: String| InvocationError::Template {
            export: name.to_string(),
            message,
        };

        if !self.writes_response() {
            let returned = self
                .returns
                .as_ref()
                .map(|value| render_value(value, ctx))
                .transpose()
                .map_err(template_err)?;
            return Ok(HandlerOutput::Returned(returned));
        }

        let (body, inferred_type) = if let Some(template) = &self.body {
            let text = render(template, ctx).map_err(template_err)?;
            (text.into_bytes(), Some("text/plain; charset=utf-8"))
        } else if let Some(json) = &self.json {
            let value = render_value(json, ctx).map_err(template_err)?;
            (value.to_string().into_bytes(), Some("application/json"))
        } else if let Some(file) = &self.body_file {
            let relative = render(file, ctx).map_err(template_err)?;
            let path = base_dir.join(&relative);
            if Path::new(&relative)
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::RootDir))
            {
                return Err(template_err(format!(
                    "body file '{relative}' escapes the handler directory"
                )));
            }
            let data = fs
                .read(&path)
                .await
                .map_err(|source| InvocationError::BodyFile {
                    path: path.clone(),
                    source,
                })?;
            let extension = path.extension().and_then(|e| e.to_str());
            (data, Some(mime::get_content_type(extension)))
        } else {
            (Vec::new(), None)
        };

        let mut headers = Vec::new();
        for (header, value) in self.headers.iter().flatten() {
            headers.push((header.clone(), render(value, ctx).map_err(template_err)?));
        }

        Ok(HandlerOutput::Responded(HandlerResponse {
            status: self.status.unwrap_or(200),
            headers,
            content_type: self
                .content_type
                .clone()
                .or_else(|| inferred_type.map(ToString::to_string)),
            body,
        }))
    }
}

/// Substitute `{{variable}}` placeholders
pub fn render(template: &str, ctx: &InvocationContext<'_>) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| format!("unterminated placeholder in '{template}'"))?;
        let name = after[..end].trim();
        let value = ctx
            .lookup(name)
            .ok_or_else(|| format!("unknown variable '{name}'"))?;
        out.push_str(value);
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Render every string leaf of a JSON value
fn render_value(value: &Value, ctx: &InvocationContext<'_>) -> Result<Value, String> {
    Ok(match value {
        Value::String(s) => Value::String(render(s, ctx)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_value(item, ctx))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), render_value(v, ctx)?)))
                .collect::<Result<_, String>>()?,
        ),
        other => other.clone(),
    })
}
