//! CLI application for a single Hue bridge.
//!
//! This example binds throwaway in-memory items to a bridge and prints every
//! value the plugin writes back to them.
//!
//! Run with: cargo run --example hue_cli -- --help

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use hue_items_rs::{Hue, Item, ItemConf, ItemValue, PluginConfig, generate_user};

#[derive(Parser)]
#[command(name = "hue-cli")]
#[command(about = "Talk to a Philips Hue bridge from the command line", long_about = None)]
struct Cli {
    /// IP address or host name of the bridge
    #[arg(short, long, global = true, default_value = "Philips-hue")]
    ip: String,

    /// Bridge port (default: 80)
    #[arg(short, long, global = true, default_value = "80")]
    port: u16,

    /// User token registered on the bridge
    #[arg(short, long, global = true, default_value = "")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user; press the link button on the bridge first
    Pair {
        /// Device type reported to the bridge
        #[arg(short, long, default_value = "hue_items_rs#cli")]
        devicetype: String,
    },

    /// List users in the bridge whitelist
    Users,

    /// List scenes stored on the bridge
    Scenes,

    /// Print the state of lamps
    Lamps {
        /// Lamp ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Set a lamp attribute (on, bri, sat, hue, ct, effect, alert)
    Set {
        /// Lamp id
        lamp: String,
        /// Attribute name
        attribute: String,
        /// New value
        value: String,
    },

    /// Activate a scene on all lamps
    Scene {
        /// Scene id, see `scenes`
        id: String,
    },

    /// Get detailed diagnostics
    Diagnostics,
}

/// An item that prints every write it receives.
struct CliItem {
    id: String,
    value: Mutex<ItemValue>,
}

impl CliItem {
    fn new(id: String, value: ItemValue) -> Arc<Self> {
        Arc::new(CliItem {
            id,
            value: Mutex::new(value),
        })
    }
}

impl Item for CliItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self) -> ItemValue {
        self.value.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn set(&self, value: ItemValue, caller: &str) {
        println!("  {:24} = {} ({caller})", self.id, value.to_json());
        if let Ok(mut current) = self.value.lock() {
            *current = value;
        }
    }

    fn fading(&self) -> bool {
        false
    }

    fn fade(&self, _dest: f64, _step: f64, _delta: f64) {}
}

fn item_conf(pairs: &[(&str, &str)]) -> Result<ItemConf, hue_items_rs::Error> {
    let conf: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ItemConf::from_conf(&conf)
}

fn parse_value(raw: &str) -> ItemValue {
    if let Ok(i) = raw.parse::<i64>() {
        ItemValue::Int(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        ItemValue::Num(f)
    } else if let Ok(b) = raw.parse::<bool>() {
        ItemValue::Bool(b)
    } else {
        ItemValue::Str(raw.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let user = match (&cli.command, cli.user.is_empty()) {
        (Commands::Pair { .. }, true) => generate_user(),
        _ => cli.user.clone(),
    };
    let config = PluginConfig {
        hue_ip: cli.ip.clone(),
        hue_user: user,
        hue_port: cli.port.to_string(),
        ..Default::default()
    };
    let mut hue = Hue::connect(&config)?;

    match cli.command {
        Commands::Pair { devicetype } => {
            println!("Registering {} on {}...", config.hue_user, cli.ip);
            match hue.authorize_user(0, &devicetype).await {
                Ok(response) => println!("{response:#}"),
                Err(e) => eprintln!("Pairing failed: {e}"),
            }
        }

        Commands::Users => {
            let users = hue.known_users(0).await?;
            if let Some(users) = users.as_object() {
                println!("Found {} user(s):", users.len());
                for (token, user) in users {
                    println!("  {token}  {}", user["name"]);
                }
            }
        }

        Commands::Scenes => {
            let scenes = hue.known_scenes(0).await?;
            if let Some(scenes) = scenes.as_object() {
                println!("Found {} scene(s):", scenes.len());
                for (id, scene) in scenes {
                    println!("  {id:16}  {}", scene["name"]);
                }
            }
        }

        Commands::Lamps { ids } => {
            for lamp in &ids {
                for attribute in ["on", "bri", "reachable", "name"] {
                    let item = CliItem::new(format!("lamp {lamp} {attribute}"), ItemValue::default());
                    hue.parse_item(
                        item,
                        &item_conf(&[("hue_listen", attribute), ("hue_lamp", lamp.as_str())])?,
                    )?;
                }
                // the brightness guard reads the desired power state
                let on = CliItem::new(format!("lamp {lamp} on (desired)"), ItemValue::Bool(true));
                hue.parse_item(on, &item_conf(&[("hue_send", "on"), ("hue_lamp", lamp.as_str())])?)?;
            }
            println!("Polling {} lamp(s)...", ids.len());
            hue.poll_lamps(0).await?;
        }

        Commands::Set {
            lamp,
            attribute,
            value,
        } => {
            let item = CliItem::new(format!("lamp {lamp} {attribute}"), parse_value(&value));
            let binding = hue.parse_item(
                item,
                &item_conf(&[
                    ("hue_send", attribute.as_str()),
                    ("hue_listen", attribute.as_str()),
                    ("hue_lamp", lamp.as_str()),
                ])?,
            )?;
            match binding {
                Some(binding) => {
                    println!("Setting {attribute} of lamp {lamp} to {value}...");
                    hue.dispatch(&binding, Some("cli")).await;
                }
                None => eprintln!("{attribute} cannot be sent to a lamp"),
            }
        }

        Commands::Scene { id } => {
            let item = CliItem::new("scene".to_string(), ItemValue::Str(id.clone()));
            if let Some(binding) = hue.parse_item(item, &item_conf(&[("hue_send", "scene")])?)? {
                println!("Activating scene {id}...");
                hue.dispatch(&binding, Some("cli")).await;
            }
        }

        Commands::Diagnostics => {
            hue.update_bridges().await;
            println!("{:#}", hue.diagnostics().await);
        }
    }

    Ok(())
}
