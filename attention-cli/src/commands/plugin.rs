//! Plugin management commands

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use attention_core::{PluginInfo, PluginManager, PluginManagerConfig, PluginState};
use attention_plugin_api::{ConfigMap, EventBus};
use clap::{Args, Subcommand};
use serde_json::Value;

/// Plugin management arguments
#[derive(Args)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub command: PluginCommands,

    /// Plugin directory to scan (repeatable, replaces the default)
    #[arg(long = "plugin-dir", env = "ATTENTION_PLUGIN_DIR", global = true)]
    pub plugin_dirs: Vec<PathBuf>,

    /// Persisted plugin config file
    #[arg(long, env = "ATTENTION_PLUGIN_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,
}

/// Plugin subcommands
#[derive(Subcommand)]
pub enum PluginCommands {
    /// List installed plugins
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enable a plugin
    Enable {
        /// Plugin name to enable
        name: String,
    },
    /// Disable a plugin
    Disable {
        /// Plugin name to disable
        name: String,
    },
    /// Show plugin details
    Info {
        /// Plugin name
        name: String,
    },
    /// Update plugin configuration
    Config {
        /// Plugin name
        name: String,
        /// Settings as key=value; values are parsed as JSON, else taken as text
        #[arg(value_parser = parse_assignment, required = true)]
        values: Vec<(String, Value)>,
    },
}

impl PluginArgs {
    fn manager_config(&self) -> PluginManagerConfig {
        let mut config = PluginManagerConfig::default();
        if !self.plugin_dirs.is_empty() {
            config.plugin_dirs = self.plugin_dirs.clone();
        }
        if let Some(path) = &self.config_file {
            config.config_path = path.clone();
        }
        config
    }
}

/// Run plugin command
pub fn run(args: PluginArgs) -> Result<()> {
    let config = args.manager_config();
    let plugin_dirs = config.plugin_dirs.clone();

    // Discovery activates enabled plugins exactly as at application start.
    let mut manager = PluginManager::new(Arc::new(EventBus::new()), config);
    manager.discover();

    let result = match args.command {
        PluginCommands::List { json } => list_plugins(&manager, &plugin_dirs, json),
        PluginCommands::Enable { name } => enable_plugin(&mut manager, &name),
        PluginCommands::Disable { name } => disable_plugin(&mut manager, &name),
        PluginCommands::Info { name } => show_plugin_info(&manager, &name),
        PluginCommands::Config { name, values } => update_config(&mut manager, &name, values),
    };

    manager.deactivate_all();
    result
}

fn list_plugins(manager: &PluginManager, plugin_dirs: &[PathBuf], json: bool) -> Result<()> {
    let plugins = manager.list_plugins();

    if json {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
        return Ok(());
    }

    if plugins.is_empty() {
        println!("No plugins installed");
        println!();
        for dir in plugin_dirs {
            println!("Plugin directory: {}", dir.display());
        }
        println!();
        println!("To install a plugin:");
        println!("  1. Create a plugin directory: mkdir -p <plugin-dir>/my-plugin");
        println!(
            "  2. Copy the plugin library: cp libmy_plugin.so <plugin-dir>/my-plugin/libplugin.so"
        );
        println!("  3. Enable the plugin: attention plugin enable my-plugin");
        return Ok(());
    }

    for p in plugins {
        let status = match &p.state {
            PluginState::Active => "✓",
            PluginState::Registered => "○",
            PluginState::Error { .. } => "✗",
        };

        let description = if p.metadata.description.is_empty() {
            "No description".to_string()
        } else {
            p.metadata.description.clone()
        };

        println!(
            "{} {} v{} [{}]    {}",
            status, p.metadata.name, p.metadata.version, p.metadata.plugin_type, description
        );
    }

    Ok(())
}

fn enable_plugin(manager: &mut PluginManager, name: &str) -> Result<()> {
    manager
        .activate(name)
        .with_context(|| format!("Failed to enable plugin '{name}'"))?;
    manager.save_config()?;
    println!("Enabled plugin: {}", name);
    Ok(())
}

fn disable_plugin(manager: &mut PluginManager, name: &str) -> Result<()> {
    let changed = manager
        .disable(name)
        .with_context(|| format!("Failed to disable plugin '{name}'"))?;
    manager.save_config()?;
    if changed {
        println!("Disabled plugin: {}", name);
    } else {
        println!("Plugin '{}' is already disabled", name);
    }
    Ok(())
}

fn show_plugin_info(manager: &PluginManager, name: &str) -> Result<()> {
    let Some(info) = manager.plugin_info(name) else {
        println!("Plugin '{}' not found", name);
        println!();
        println!("Run 'attention plugin list' to see installed plugins.");
        return Ok(());
    };
    print_info(&info)
}

fn print_info(info: &PluginInfo) -> Result<()> {
    let m = &info.metadata;
    println!("Name:        {} ({})", m.name, m.display_name);
    println!("Version:     {}", m.version);
    println!("Type:        {}", m.plugin_type);
    println!(
        "Author:      {}",
        if m.author.is_empty() {
            "Unknown"
        } else {
            &m.author
        }
    );
    println!(
        "Description: {}",
        if m.description.is_empty() {
            "No description"
        } else {
            &m.description
        }
    );
    if !m.homepage.is_empty() {
        println!("Homepage:    {}", m.homepage);
    }
    if !m.tags.is_empty() {
        println!("Tags:        {}", m.tags.join(", "));
    }
    println!("Directory:   {}", info.dir.display());
    println!();

    match &info.state {
        PluginState::Active => println!("Status:      Active"),
        PluginState::Registered => println!("Status:      Inactive"),
        PluginState::Error { message } => println!("Status:      Error ({})", message),
    }

    println!();
    println!("Config:");
    println!("{}", serde_json::to_string_pretty(&info.config)?);

    if !info.config_schema.is_empty() {
        println!();
        println!("Settings:");
        for field in &info.config_schema {
            let required = if field.required { " (required)" } else { "" };
            println!("  {:<20} {}{}", field.key, field.label, required);
        }
    }

    Ok(())
}

fn update_config(
    manager: &mut PluginManager,
    name: &str,
    values: Vec<(String, Value)>,
) -> Result<()> {
    let partial: ConfigMap = values.into_iter().collect();
    let merged = manager
        .update_config(name, partial)
        .with_context(|| format!("Failed to update config of plugin '{name}'"))?;
    manager.save_config()?;
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}

/// Parse `key=value`; the value is JSON when it parses, a string otherwise.
fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
