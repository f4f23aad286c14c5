use clap::Subcommand;
use edudesk_core::MasterKind;

use super::{print_json, with_store, CmdResult};

#[derive(Subcommand)]
pub enum MasterAction {
    /// Show one list, or all four
    List {
        /// dept, year, section or batch
        kind: Option<MasterKind>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Append a value
    Add { kind: MasterKind, value: String },
    /// Rename a value and update every record that uses it
    Rename {
        kind: MasterKind,
        old: String,
        new: String,
    },
    /// Remove a value (records keep the old label)
    Remove { kind: MasterKind, value: String },
}

pub fn run(action: MasterAction) -> CmdResult {
    match action {
        MasterAction::List { kind, json } => with_store(|store| {
            let kinds = match kind {
                Some(kind) => vec![kind],
                None => MasterKind::ALL.to_vec(),
            };
            if json {
                let map: serde_json::Map<String, serde_json::Value> = kinds
                    .iter()
                    .map(|k| (k.label().to_string(), serde_json::json!(store.master_list(*k))))
                    .collect();
                return print_json(&map);
            }
            for kind in kinds {
                println!("{kind}: {}", store.master_list(kind).join(", "));
            }
            Ok(())
        }),
        MasterAction::Add { kind, value } => with_store(|store| {
            store.add_master_value(kind, &value)?;
            println!("Added {} to {kind}", value.trim());
            Ok(())
        }),
        MasterAction::Rename { kind, old, new } => with_store(|store| {
            let report = store.rename_master_value(kind, &old, &new)?;
            println!(
                "Renamed {kind} {old} -> {new} ({} students, {} users, {} timetable slots updated)",
                report.students, report.users, report.timetable
            );
            Ok(())
        }),
        MasterAction::Remove { kind, value } => with_store(|store| {
            store.remove_master_value(kind, &value)?;
            println!("Removed {} from {kind}", value.trim());
            Ok(())
        }),
    }
}
