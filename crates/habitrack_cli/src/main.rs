//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `habitrack_core` linkage.
//! - Run one add-habit round trip against an in-memory collection.
//! - Keep output deterministic for quick local sanity checks.

use habitrack_core::db::open_db_in_memory;
use habitrack_core::{Category, Frequency, HabitListPresenter, Priority, SqliteHabitRepository};
use std::error::Error;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    println!("habitrack_core ping={}", habitrack_core::ping());
    println!("habitrack_core version={}", habitrack_core::core_version());

    let repo = Arc::new(SqliteHabitRepository::new(open_db_in_memory()?));
    let mut presenter = HabitListPresenter::new(repo);
    presenter.mount();
    presenter.refresh();
    println!("before: {}", presenter.subtitle());

    presenter.on_add();
    presenter.on_title_changed("Read 20 pages");
    presenter.on_category_selected(Category::Learning);
    presenter.on_frequency_selected(Frequency::Weekdays);
    presenter.on_priority_selected(Priority::High);
    let outcome = presenter.on_save()?;
    println!("saved: {outcome:?}");

    let delivered = presenter.refresh();
    println!("delivered={delivered}");
    for row in presenter.rows() {
        println!(
            "- {} [{} / {}] priority={} streak={}",
            row.title,
            row.category_label,
            row.frequency_label,
            row.priority.as_str(),
            row.streak
        );
    }
    println!("after: {}", presenter.subtitle());

    presenter.unmount();
    Ok(())
}
