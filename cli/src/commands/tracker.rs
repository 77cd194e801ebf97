use anyhow::{Result, bail};

use tally_core::TrackerService;
use tally_core::models::{NewTracker, Tracker, TrackerKind, UpdateTracker};
use tally_core::schedule::Schedule;

use super::helpers::{parse_schedule, print_json, resolve, short_id};

pub(crate) struct AddArgs {
    pub name: String,
    pub days: Option<String>,
    pub event: bool,
    pub category: Option<String>,
    pub emoji: Option<String>,
    pub color: Option<String>,
    pub pin: bool,
}

pub(crate) struct EditArgs {
    pub name: Option<String>,
    pub days: Option<String>,
    pub category: Option<String>,
    pub no_category: bool,
    pub emoji: Option<String>,
    pub color: Option<String>,
}

const DEFAULT_COLOR: &str = "green";

pub(crate) fn cmd_add(svc: &TrackerService, args: AddArgs, json: bool) -> Result<()> {
    let kind = if args.event {
        TrackerKind::IrregularEvent
    } else {
        TrackerKind::Habit
    };
    let schedule = parse_schedule(args.days.as_deref(), kind)?;

    let tracker = svc.create_tracker(&NewTracker {
        name: args.name,
        color: args.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        emoji: args.emoji.unwrap_or_default(),
        schedule,
        kind,
        category_title: args.category,
        is_pinned: args.pin,
    })?;

    if json {
        print_json(&tracker)?;
    } else {
        println!("Added {}", describe(&tracker));
    }
    Ok(())
}

pub(crate) fn cmd_edit(
    svc: &TrackerService,
    reference: &str,
    args: EditArgs,
    json: bool,
) -> Result<()> {
    if args.category.is_some() && args.no_category {
        bail!("Use either --category or --no-category, not both");
    }

    let tracker = resolve(svc, reference, json)?;
    let schedule = match args.days.as_deref() {
        Some(_) if tracker.kind == TrackerKind::IrregularEvent => {
            bail!("'{}' is an irregular event and has no weekly schedule", tracker.name)
        }
        Some(days) => Some(Schedule::parse(days)?),
        None => None,
    };
    let category_title = if args.no_category {
        Some(None)
    } else {
        args.category.map(Some)
    };

    let update = UpdateTracker {
        name: args.name,
        color: args.color,
        emoji: args.emoji,
        schedule,
        category_title,
        is_pinned: None,
    };
    if update.is_empty() {
        bail!(
            "Nothing to update. Provide at least one of --name, --days, --category, --no-category, --emoji, or --color"
        );
    }

    let updated = svc.update_tracker(tracker.id, &update)?;
    if json {
        print_json(&updated)?;
    } else {
        println!("Updated {}", describe(&updated));
    }
    Ok(())
}

pub(crate) fn cmd_delete(svc: &TrackerService, reference: &str, json: bool) -> Result<()> {
    let tracker = resolve(svc, reference, json)?;
    let completions = svc.database().ledger().count(tracker.id)?;
    svc.delete_tracker(tracker.id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": tracker.id, "completions_removed": completions })
        );
    } else {
        println!(
            "Deleted '{}' and {completions} completion record(s)",
            tracker.name
        );
    }
    Ok(())
}

pub(crate) fn cmd_pin(svc: &TrackerService, reference: &str, pinned: bool, json: bool) -> Result<()> {
    let tracker = resolve(svc, reference, json)?;
    let updated = if pinned {
        svc.pin(tracker.id)?
    } else {
        svc.unpin(tracker.id)?
    };

    if json {
        print_json(&updated)?;
    } else if pinned {
        println!("Pinned '{}'", updated.name);
    } else {
        println!("Unpinned '{}'", updated.name);
    }
    Ok(())
}

fn describe(tracker: &Tracker) -> String {
    let kind = match tracker.kind {
        TrackerKind::Habit => tracker.schedule.summary(),
        TrackerKind::IrregularEvent => "irregular event".to_string(),
    };
    let category = tracker.section_title();
    let pin = if tracker.is_pinned { ", pinned" } else { "" };
    format!(
        "'{}' [{}] ({kind}, {category}{pin})",
        tracker.name,
        short_id(tracker)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_args(name: &str) -> AddArgs {
        AddArgs {
            name: name.to_string(),
            days: Some("mon,wed,fri".to_string()),
            event: false,
            category: Some("Health".to_string()),
            emoji: None,
            color: None,
            pin: false,
        }
    }

    #[test]
    fn test_add_then_edit() {
        let svc = TrackerService::new_in_memory().unwrap();
        cmd_add(&svc, add_args("Water"), true).unwrap();

        let tracker = svc.resolve_tracker("water").unwrap();
        assert_eq!(tracker.color, DEFAULT_COLOR);
        assert_eq!(tracker.schedule.summary(), "Mon, Wed, Fri");

        cmd_edit(
            &svc,
            "water",
            EditArgs {
                name: None,
                days: Some("weekends".to_string()),
                category: None,
                no_category: true,
                emoji: Some("💧".to_string()),
                color: None,
            },
            true,
        )
        .unwrap();

        let tracker = svc.get_tracker(tracker.id).unwrap();
        assert!(tracker.schedule.is_weekend());
        assert!(tracker.category_title.is_none());
        assert_eq!(tracker.emoji, "💧");
    }

    #[test]
    fn test_edit_requires_a_change() {
        let svc = TrackerService::new_in_memory().unwrap();
        cmd_add(&svc, add_args("Water"), true).unwrap();
        let empty = EditArgs {
            name: None,
            days: None,
            category: None,
            no_category: false,
            emoji: None,
            color: None,
        };
        assert!(cmd_edit(&svc, "Water", empty, true).is_err());
    }

    #[test]
    fn test_event_rejects_days() {
        let svc = TrackerService::new_in_memory().unwrap();
        let mut args = add_args("Dentist");
        args.event = true;
        assert!(cmd_add(&svc, args, true).is_err());
    }

    #[test]
    fn test_pin_and_delete() {
        let svc = TrackerService::new_in_memory().unwrap();
        cmd_add(&svc, add_args("Water"), true).unwrap();

        cmd_pin(&svc, "Water", true, true).unwrap();
        assert!(svc.resolve_tracker("Water").unwrap().is_pinned);

        cmd_delete(&svc, "Water", true).unwrap();
        assert!(svc.list_trackers().unwrap().is_empty());
    }
}
