use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use tally_core::TrackerService;
use tally_core::settings::{
    EngineConfig, KNOWN_SETTINGS, SEARCH_DEBOUNCE_MS, STATUS_FILTERS_USE_SCHEDULE,
};

use super::helpers::{exit_not_found, print_json};

pub(crate) fn cmd_config_get(svc: &TrackerService, key: &str, json: bool) -> Result<()> {
    let Some(value) = svc.get_setting(key)?.or_else(|| default_value(key)) else {
        exit_not_found(&format!("Unknown setting '{key}'"), json);
    };
    if json {
        println!("{}", serde_json::json!({ "key": key, "value": value }));
    } else {
        println!("{value}");
    }
    Ok(())
}

pub(crate) fn cmd_config_set(
    svc: &mut TrackerService,
    key: &str,
    value: &str,
    json: bool,
) -> Result<()> {
    let stored = svc.set_setting(key, value)?;
    if json {
        println!("{}", serde_json::json!({ "key": key, "value": stored }));
    } else {
        println!("{key} = {stored}");
    }
    Ok(())
}

pub(crate) fn cmd_config_unset(svc: &mut TrackerService, key: &str, json: bool) -> Result<()> {
    let removed = svc.reset_setting(key)?;
    if json {
        println!("{}", serde_json::json!({ "key": key, "reset": removed }));
    } else if removed {
        println!("{key} reset to its default");
    } else {
        println!("{key} was not set");
    }
    Ok(())
}

pub(crate) fn cmd_config_list(svc: &TrackerService, json: bool) -> Result<()> {
    let stored = svc.list_settings()?;
    let rows: Vec<SettingRow> = KNOWN_SETTINGS
        .iter()
        .map(|key| {
            let custom = stored.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
            SettingRow {
                key: (*key).to_string(),
                is_default: custom.is_none(),
                value: custom.or_else(|| default_value(key)).unwrap_or_default(),
            }
        })
        .collect();

    if json {
        return print_json(&rows);
    }
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

#[derive(Tabled, serde::Serialize)]
struct SettingRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Default")]
    is_default: bool,
}

fn default_value(key: &str) -> Option<String> {
    let defaults = EngineConfig::default();
    match key {
        SEARCH_DEBOUNCE_MS => Some(defaults.search_debounce.as_millis().to_string()),
        STATUS_FILTERS_USE_SCHEDULE => Some(defaults.status_filters_use_schedule.to_string()),
        _ => None,
    }
}
