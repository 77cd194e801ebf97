use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use tally_core::TrackerService;

use super::helpers::{exit_not_found, print_json, truncate};

pub(crate) fn cmd_category_add(svc: &TrackerService, title: &str, json: bool) -> Result<()> {
    let category = svc.create_category(title)?;
    if json {
        print_json(&category)?;
    } else {
        println!("Created category '{}'", category.title);
    }
    Ok(())
}

pub(crate) fn cmd_category_list(svc: &TrackerService, json: bool) -> Result<()> {
    let categories = svc.list_categories()?;

    if json {
        return print_json(&categories);
    }
    if categories.is_empty() {
        println!("No categories yet. Create one with: tally category add <title>");
        return Ok(());
    }

    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "Category")]
        title: String,
        #[tabled(rename = "Trackers")]
        count: usize,
        #[tabled(rename = "Names")]
        names: String,
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|c| CategoryRow {
            title: truncate(&c.title, 30),
            count: c.trackers.len(),
            names: truncate(
                &c.trackers
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                50,
            ),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_category_delete(svc: &TrackerService, title: &str, json: bool) -> Result<()> {
    match svc.delete_category(title) {
        Ok(()) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": title }));
            } else {
                println!("Deleted category '{title}'. Its trackers are now uncategorized.");
            }
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            exit_not_found(&format!("Category '{title}' not found"), json)
        }
        Err(e) => Err(e.into()),
    }
}
