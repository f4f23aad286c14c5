use clap::Subcommand;
use edudesk_core::model::new_id;
use edudesk_core::Holiday;

use super::{parse_date, print_json, with_store, CmdResult};

#[derive(Subcommand)]
pub enum HolidayAction {
    /// List holidays in date order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Declare a holiday; attendance is closed on that date
    Add {
        /// YYYY-MM-DD
        date: String,
        name: String,
    },
    /// Remove a holiday
    Remove { id: String },
}

pub fn run(action: HolidayAction) -> CmdResult {
    match action {
        HolidayAction::List { json } => with_store(|store| {
            let mut holidays: Vec<&Holiday> = store.holidays().iter().collect();
            holidays.sort_by_key(|h| h.date);
            if json {
                return print_json(&holidays);
            }
            for h in holidays {
                println!("{}  {}  {}", h.id, h.date, h.name);
            }
            Ok(())
        }),
        HolidayAction::Add { date, name } => with_store(|store| {
            let date = parse_date(&date)?;
            if let Some(existing) = store.holiday_on(date) {
                return Err(format!("{date} is already a holiday ({})", existing.name).into());
            }
            let holiday = Holiday {
                id: new_id(),
                date,
                name,
            };
            println!("Holiday added: {} ({date})", holiday.id);
            store.upsert_holiday(holiday);
            Ok(())
        }),
        HolidayAction::Remove { id } => with_store(|store| {
            if !store.remove_holiday(&id) {
                return Err(format!("no holiday with id {id}").into());
            }
            println!("Holiday removed: {id}");
            Ok(())
        }),
    }
}
