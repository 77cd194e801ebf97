mod browse;
mod category;
mod done;
mod helpers;
mod list;
mod settings;
mod stats;
mod tracker;

pub(crate) use browse::cmd_browse;
pub(crate) use category::{cmd_category_add, cmd_category_delete, cmd_category_list};
pub(crate) use done::cmd_done;
pub(crate) use list::cmd_list;
pub(crate) use settings::{cmd_config_get, cmd_config_list, cmd_config_set, cmd_config_unset};
pub(crate) use stats::cmd_stats;
pub(crate) use tracker::{AddArgs, EditArgs, cmd_add, cmd_delete, cmd_edit, cmd_pin};
