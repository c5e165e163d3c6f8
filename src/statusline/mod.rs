//! Statusline modules and the render loop.
//!
//! The assistant pipes a JSON status record on stdin; each configured module
//! renders a line (or block) from it, in configured order.

pub mod git;
pub mod input;
pub mod model;
pub mod style;
pub mod usage;

use crate::config::Config;
use anyhow::Context as _;
use async_trait::async_trait;
use git::{GitModule, GitOptions};
use input::StatusInput;
use model::{ModelModule, ModelOptions};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use style::{Tone, paint};
use tracing::debug;
use usage::{UsageModule, UsageOptions};

/// Names accepted in the `modules` list.
pub const BUILTIN_MODULES: [&str; 3] = ["model", "git", "usage_limits"];

/// Everything a module may look at while rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub debug: bool,
    pub colors: bool,
    pub data: StatusInput,
    /// Where modules keep state between runs. `None` disables caching.
    pub cache_dir: Option<PathBuf>,
}

#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means nothing to show.
    async fn render(&self) -> anyhow::Result<Option<String>>;
}

pub enum StatusModule {
    Model(ModelModule),
    Git(GitModule),
    UsageLimits(UsageModule),
}

fn parse_options<T: DeserializeOwned + Default>(
    options: Option<&toml::Table>,
) -> anyhow::Result<T> {
    match options {
        None => Ok(T::default()),
        Some(table) => Ok(toml::Value::Table(table.clone()).try_into()?),
    }
}

impl StatusModule {
    /// Build the module registered under `name`, or `None` if there is none.
    pub fn from_name(
        name: &str,
        ctx: &RenderContext,
        options: Option<&toml::Table>,
    ) -> anyhow::Result<Option<Self>> {
        let module = match name {
            "model" => Self::Model(ModelModule::new(
                ctx,
                parse_options::<ModelOptions>(options).context("invalid options")?,
            )),
            "git" => Self::Git(GitModule::new(
                ctx,
                parse_options::<GitOptions>(options).context("invalid options")?,
            )),
            "usage_limits" => Self::UsageLimits(UsageModule::new(
                ctx,
                parse_options::<UsageOptions>(options).context("invalid options")?,
            )),
            _ => return Ok(None),
        };
        Ok(Some(module))
    }

    fn inner(&self) -> &dyn Module {
        match self {
            Self::Model(m) => m,
            Self::Git(m) => m,
            Self::UsageLimits(m) => m,
        }
    }
}

#[async_trait]
impl Module for StatusModule {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    async fn render(&self) -> anyhow::Result<Option<String>> {
        self.inner().render().await
    }
}

/// A failing module is skipped, or reported inline in debug mode.
async fn render_into(module: &dyn Module, ctx: &RenderContext, out: &mut Vec<String>) {
    match module.render().await {
        Ok(Some(text)) if !text.is_empty() => out.push(text),
        Ok(_) => {}
        Err(e) => {
            debug!(module = module.name(), "render failed: {e:#}");
            if ctx.debug {
                out.push(paint(&format!("[!] {}: {e:#}", module.name()), Tone::Red, ctx.colors));
            }
        }
    }
}

/// Build the configured modules and render them.
pub async fn render_statusline(config: &Config, ctx: &RenderContext) -> Vec<String> {
    let mut out = Vec::new();
    for name in &config.modules {
        match StatusModule::from_name(name, ctx, config.module_configs.get(name)) {
            Ok(Some(module)) => render_into(&module, ctx, &mut out).await,
            Ok(None) => {
                debug!("Unknown module: {name}");
                if ctx.debug {
                    out.push(format!("[!] Unknown module: {name}"));
                }
            }
            Err(e) => {
                debug!(module = %name, "{e:#}");
                if ctx.debug {
                    out.push(paint(&format!("[!] {name}: {e:#}"), Tone::Red, ctx.colors));
                }
            }
        }
    }
    out
}
