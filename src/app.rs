use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;

use crate::api;
use crate::config;
use crate::data::Services;
use crate::logging;
use crate::notify::Notifier;
use crate::page::Page;
use crate::render;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides `server.base_url` from config and environment.
    pub base_url: Option<String>,
    /// Load everything once, print the page as HTML and exit.
    pub dump_html: bool,
}

pub fn run() -> Result<()> {
    run_with(RunOptions::default())
}

pub fn run_with(opts: RunOptions) -> Result<()> {
    let mut cfg = config::load(config::LoadOptions::default()).context("load config")?;
    if let Some(base_url) = opts.base_url {
        cfg.server.base_url = base_url;
    }
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    logging::init(&cfg.log).context("init logging")?;
    tracing::info!(
        version = crate::VERSION,
        base_url = %cfg.server.base_url,
        "starting fanpage-tui"
    );

    let client = api::Client::new(api::ClientConfig {
        user_agent: cfg.server.user_agent.clone(),
        base_url: Some(cfg.server.base_url.clone()),
        timeout: Some(cfg.server.timeout),
        http_client: None,
    })
    .context("create api client")?;
    let base_url = client.base_url().clone();
    let services = Services::from_client(Arc::new(client));
    let page = Page::new(
        cfg.ui.subject_name.clone(),
        Notifier::new(cfg.ui.toast_duration),
    );

    if opts.dump_html {
        println!("{}", dump_html(page, &services));
        return Ok(());
    }

    let status_message = format!("Config: {display_path}  Server: {base_url}");
    let mut model = ui::Model::new(ui::Options {
        page,
        services,
        base_url,
        theme: cfg.ui.theme.clone(),
        status_message,
    });
    model.run()
}

/// Runs the startup loads synchronously and serializes the whole page.
pub fn dump_html(mut page: Page, services: &Services) -> String {
    page.startup(services);
    let title = render::escape_html(&format!("{} Fan Page", page.subject_name()));
    let body = page.render(&Local::now()).to_html();
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\"><title>{title}</title></head>{body}</html>"
    )
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/fanpage-tui/config.yaml".to_string()
    }
}
