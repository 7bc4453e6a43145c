//! Skylane operator CLI.
//!
//! Talks straight to the shared SQLite store, so it can run alongside the
//! daemon or on its own.

mod seed;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use skylane_control::{
    suggest_action, AdmissionController, ConflictScanner, ResolutionOutcome, ScannerConfig,
};
use skylane_core::models::{Device, DeviceStatus};
use skylane_store::{SqliteStore, Store};

/// Airspace admission and drone conflict operations
#[derive(Parser, Debug)]
#[command(name = "skylane")]
#[command(about = "Airspace admission and drone conflict operations", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite database path shared with the daemon
    #[arg(long, global = true, default_value = "skylane.db")]
    db: String,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage airspace volumes
    Airspace {
        #[command(subcommand)]
        cmd: AirspaceCmd,
    },
    /// Manage flight tasks
    Task {
        #[command(subcommand)]
        cmd: TaskCmd,
    },
    /// Manage tracked devices
    Device {
        #[command(subcommand)]
        cmd: DeviceCmd,
    },
    /// File and decide flight permits
    Permit {
        #[command(subcommand)]
        cmd: PermitCmd,
    },
    /// Run a proximity scan over online devices
    Scan {
        /// Only scan this device against the fleet
        #[arg(long)]
        device: Option<String>,
        /// Safe separation distance in meters
        #[arg(long, default_value_t = 50.0)]
        safe_distance: f64,
    },
    /// Inspect and close out conflicts
    Conflict {
        #[command(subcommand)]
        cmd: ConflictCmd,
    },
    /// Load a small demo fleet and airspace
    Seed,
}

#[derive(Subcommand, Debug)]
enum AirspaceCmd {
    /// Register a new airspace volume
    Create {
        name: String,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// Altitude floor in meters
        #[arg(long, default_value_t = 0.0)]
        min_alt: f64,
        /// Altitude ceiling in meters
        #[arg(long, default_value_t = 120.0)]
        max_alt: f64,
        /// Concurrent flight capacity
        #[arg(long, default_value_t = 5)]
        capacity: u32,
    },
    /// List all airspaces
    List,
    /// Restrict an airspace with a reason
    Restrict { id: String, reason: String },
    /// Reopen an airspace and clear any restriction
    Activate { id: String },
    /// Close an airspace
    Close { id: String },
}

#[derive(Subcommand, Debug)]
enum TaskCmd {
    /// Register a flight task
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List all flight tasks
    List,
}

#[derive(Subcommand, Debug)]
enum DeviceCmd {
    /// Report a device position (registers the device if new)
    Report {
        id: String,
        /// Display name (defaults to the current name, or the id)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
        /// Altitude in meters
        #[arg(long, default_value_t = 50.0)]
        alt: f64,
    },
    /// Set a device status (online, offline, maintenance, retired)
    SetStatus { id: String, status: String },
    /// List all devices
    List,
}

#[derive(Subcommand, Debug)]
enum PermitCmd {
    /// Apply for a flight permit
    Apply {
        /// Flight task id
        #[arg(long)]
        task: String,
        /// Airspace id
        #[arg(long)]
        airspace: String,
        /// Applicant identifier
        #[arg(long)]
        applicant: String,
        /// Window start, RFC 3339
        #[arg(long)]
        start: String,
        /// Window end, RFC 3339
        #[arg(long)]
        end: String,
        /// Free-form remarks
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Approve a pending permit
    Approve {
        id: String,
        #[arg(long, default_value = "operator")]
        approver: String,
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Reject a pending permit
    Reject {
        id: String,
        #[arg(long, default_value = "operator")]
        approver: String,
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Cancel a pending or approved permit
    Cancel { id: String },
    /// List permits, optionally for one airspace
    List {
        #[arg(long)]
        airspace: Option<String>,
    },
    /// Check whether an airspace can admit a window
    Check {
        #[arg(long)]
        airspace: String,
        /// Window start, RFC 3339
        #[arg(long)]
        start: String,
        /// Window end, RFC 3339
        #[arg(long)]
        end: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConflictCmd {
    /// List conflicts
    List {
        /// Only unresolved conflicts
        #[arg(long)]
        unresolved: bool,
    },
    /// Mark a conflict resolved with the suggested action for its severity
    Resolve { id: String },
    /// Mark a conflict ignored
    Ignore { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = Arc::new(
        SqliteStore::connect(&cli.db, 5)
            .await
            .with_context(|| format!("opening database {}", cli.db))?,
    );
    run(cli, store).await
}

async fn run(cli: Cli, store: Arc<SqliteStore>) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Command::Airspace { cmd } => {
            let controller = AdmissionController::new(store.clone());
            match cmd {
                AirspaceCmd::Create {
                    name,
                    description,
                    min_alt,
                    max_alt,
                    capacity,
                } => {
                    let airspace = controller
                        .create_airspace(&name, description.as_deref(), min_alt, max_alt, capacity)
                        .await?;
                    if json {
                        print_json(&airspace)?;
                    } else {
                        println!("Created airspace {} ({})", airspace.id, airspace.name);
                    }
                }
                AirspaceCmd::List => {
                    let airspaces = store.list_airspaces().await?;
                    if json {
                        print_json(&airspaces)?;
                    } else {
                        for a in &airspaces {
                            let mut line = format!(
                                "{}  {}  {}/{}  {}",
                                a.id, a.status, a.current_flights, a.capacity, a.name
                            );
                            if let Some(reason) = &a.restriction_reason {
                                line.push_str(&format!(" [{reason}]"));
                            }
                            println!("{line}");
                        }
                    }
                }
                AirspaceCmd::Restrict { id, reason } => {
                    let airspace = controller.restrict_airspace(&id, &reason).await?;
                    if json {
                        print_json(&airspace)?;
                    } else {
                        println!("Airspace {} is now {}", airspace.id, airspace.status);
                    }
                }
                AirspaceCmd::Activate { id } => {
                    let airspace = controller.activate_airspace(&id).await?;
                    if json {
                        print_json(&airspace)?;
                    } else {
                        println!("Airspace {} is now {}", airspace.id, airspace.status);
                    }
                }
                AirspaceCmd::Close { id } => {
                    let airspace = controller.close_airspace(&id).await?;
                    if json {
                        print_json(&airspace)?;
                    } else {
                        println!("Airspace {} is now {}", airspace.id, airspace.status);
                    }
                }
            }
        }

        Command::Task { cmd } => match cmd {
            TaskCmd::Create { name, description } => {
                let controller = AdmissionController::new(store.clone());
                let task = controller
                    .create_flight_task(&name, description.as_deref())
                    .await?;
                if json {
                    print_json(&task)?;
                } else {
                    println!("Created flight task {} ({})", task.id, task.name);
                }
            }
            TaskCmd::List => {
                let tasks = store.list_flight_tasks().await?;
                if json {
                    print_json(&tasks)?;
                } else {
                    for t in &tasks {
                        println!("{}  {}  {}", t.id, t.status, t.name);
                    }
                }
            }
        },

        Command::Device { cmd } => match cmd {
            DeviceCmd::Report {
                id,
                name,
                lat,
                lon,
                alt,
            } => {
                let existing = store.device(&id).await?;
                let display_name = name
                    .or_else(|| existing.as_ref().map(|d| d.name.clone()))
                    .unwrap_or_else(|| id.clone());
                // A position report always puts the device online, stamped now.
                let device = Device::new(id, display_name, lat, lon, alt);
                store.upsert_device(&device).await?;
                if json {
                    print_json(&device)?;
                } else {
                    println!(
                        "Device {} at ({:.6}, {:.6}) {:.0}m",
                        device.id, device.lat, device.lon, device.altitude_m
                    );
                }
            }
            DeviceCmd::SetStatus { id, status } => {
                let status: DeviceStatus = status.parse()?;
                if !store.update_device_status(&id, status).await? {
                    bail!("device not found: {id}");
                }
                println!("Device {} is now {}", id, status);
            }
            DeviceCmd::List => {
                let devices = store.list_devices().await?;
                if json {
                    print_json(&devices)?;
                } else {
                    for d in &devices {
                        println!(
                            "{}  {}  ({:.6}, {:.6}) {:.0}m  seen {}",
                            d.id, d.status, d.lat, d.lon, d.altitude_m, d.last_update
                        );
                    }
                }
            }
        },

        Command::Permit { cmd } => {
            let controller = AdmissionController::new(store.clone());
            match cmd {
                PermitCmd::Apply {
                    task,
                    airspace,
                    applicant,
                    start,
                    end,
                    remarks,
                } => {
                    let start = parse_time(&start)?;
                    let end = parse_time(&end)?;
                    let permit = controller
                        .apply_for_permit(&task, &airspace, &applicant, start, end, &remarks)
                        .await?;
                    if json {
                        print_json(&permit)?;
                    } else {
                        println!("Filed permit {} ({})", permit.id, permit.status);
                    }
                }
                PermitCmd::Approve {
                    id,
                    approver,
                    remarks,
                } => {
                    let permit = controller.approve(&id, &approver, remarks.as_deref()).await?;
                    if json {
                        print_json(&permit)?;
                    } else {
                        println!("Permit {} is now {}", permit.id, permit.status);
                    }
                }
                PermitCmd::Reject {
                    id,
                    approver,
                    remarks,
                } => {
                    let permit = controller.reject(&id, &approver, remarks.as_deref()).await?;
                    if json {
                        print_json(&permit)?;
                    } else {
                        println!("Permit {} is now {}", permit.id, permit.status);
                    }
                }
                PermitCmd::Cancel { id } => {
                    let permit = controller.cancel(&id).await?;
                    if json {
                        print_json(&permit)?;
                    } else {
                        println!("Permit {} cancelled ({})", permit.id, permit.status);
                    }
                }
                PermitCmd::List { airspace } => {
                    let permits = match airspace {
                        Some(id) => store.permits_for_airspace(&id).await?,
                        None => store.list_permits().await?,
                    };
                    if json {
                        print_json(&permits)?;
                    } else {
                        for p in &permits {
                            println!(
                                "{}  {}  {} -> {}  airspace {}  applicant {}",
                                p.id, p.status, p.start_time, p.end_time, p.airspace_id,
                                p.applicant_id
                            );
                        }
                    }
                }
                PermitCmd::Check {
                    airspace,
                    start,
                    end,
                } => {
                    let start = parse_time(&start)?;
                    let end = parse_time(&end)?;
                    let available = controller.is_available(&airspace, start, end).await?;
                    let usage = controller
                        .count_overlapping_approved(&airspace, start, end)
                        .await?;
                    if json {
                        print_json(&serde_json::json!({
                            "airspace_id": airspace,
                            "available": available,
                            "overlapping_approved": usage,
                        }))?;
                    } else {
                        println!(
                            "{}: {} ({} overlapping approved)",
                            airspace,
                            if available { "available" } else { "unavailable" },
                            usage
                        );
                    }
                }
            }
        }

        Command::Scan {
            device,
            safe_distance,
        } => {
            let scanner = ConflictScanner::with_config(
                store.clone(),
                ScannerConfig {
                    safe_distance_m: safe_distance,
                    dedupe_open_pairs: true,
                },
            );
            let found = match device {
                Some(id) => scanner.scan_for_device(&id).await?,
                None => scanner.scan_all().await?,
            };
            if json {
                print_json(&found)?;
            } else if found.is_empty() {
                println!("No new conflicts.");
            } else {
                for conflict in &found {
                    let action = suggest_action(conflict.severity);
                    println!(
                        "[{}] {} <-> {}  {:.1}m  suggested: {} ({})",
                        conflict.severity,
                        conflict.device1_id,
                        conflict.device2_id,
                        conflict.distance_m,
                        action.action_type,
                        action.directives.join(", ")
                    );
                }
            }
        }

        Command::Conflict { cmd } => {
            let scanner = ConflictScanner::new(store.clone());
            match cmd {
                ConflictCmd::List { unresolved } => {
                    let conflicts = if unresolved {
                        store.unresolved_conflicts().await?
                    } else {
                        store.list_conflicts().await?
                    };
                    if json {
                        print_json(&conflicts)?;
                    } else {
                        for c in &conflicts {
                            println!(
                                "{}  [{}] {} <-> {}  {:.1}m  {}",
                                c.id,
                                c.severity,
                                c.device1_id,
                                c.device2_id,
                                c.distance_m,
                                c.resolution_status
                            );
                        }
                    }
                }
                ConflictCmd::Resolve { id } => {
                    let Some(current) = store.conflict(&id).await? else {
                        bail!("conflict not found: {id}");
                    };
                    let action = suggest_action(current.severity);
                    let resolved = scanner
                        .resolve(&id, ResolutionOutcome::Resolved, Some(action.clone()))
                        .await?;
                    if json {
                        print_json(&resolved)?;
                    } else {
                        println!(
                            "Conflict {} resolved with {} ({})",
                            resolved.id,
                            action.action_type,
                            action.directives.join(", ")
                        );
                    }
                }
                ConflictCmd::Ignore { id } => {
                    let ignored = scanner.resolve(&id, ResolutionOutcome::Ignored, None).await?;
                    if json {
                        print_json(&ignored)?;
                    } else {
                        println!("Conflict {} ignored", ignored.id);
                    }
                }
            }
        }

        Command::Seed => seed::run(store).await?,
    }

    Ok(())
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid RFC 3339 timestamp: {raw}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
