use chrono::{Datelike, Local, NaiveDate};
use gtk4 as gtk;
use gtk4::glib;
use gtk4::prelude::*;

/// Text format the date entries use.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// An entry holding `yyyy-mm-dd` with a calendar popover next to it.
///
/// The entry stays editable; the calendar only writes into it.
#[derive(Clone)]
pub struct DateField {
    pub container: gtk::Box,
    pub entry: gtk::Entry,
}

impl DateField {
    pub fn new() -> Self {
        let entry = gtk::Entry::builder()
            .placeholder_text("yyyy-mm-dd")
            .text(today())
            .hexpand(true)
            .build();

        let calendar = gtk::Calendar::new();
        let popover = gtk::Popover::builder().child(&calendar).build();
        let button = gtk::MenuButton::builder()
            .icon_name("x-office-calendar-symbolic")
            .tooltip_text("Pick a date")
            .popover(&popover)
            .build();

        {
            let entry = entry.clone();
            let popover = popover.clone();
            calendar.connect_day_selected(move |calendar| {
                if let Some(text) = format_day(calendar.year(), calendar.month(), calendar.day()) {
                    entry.set_text(&text);
                }
                popover.popdown();
            });
        }

        {
            let entry = entry.clone();
            let calendar = calendar.clone();
            popover.connect_show(move |_| {
                if let Some(date) = parse_day(&entry.text())
                    && let Ok(selected) = glib::DateTime::from_local(
                        date.year(),
                        date.month() as i32,
                        date.day() as i32,
                        0,
                        0,
                        0.0,
                    )
                {
                    calendar.select_day(&selected);
                }
            });
        }

        let container = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        container.append(&entry);
        container.append(&button);

        Self { container, entry }
    }

    pub fn text(&self) -> String {
        self.entry.text().to_string()
    }
}

impl Default for DateField {
    fn default() -> Self {
        Self::new()
    }
}

fn today() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

/// Formats a `gtk::Calendar` selection; GTK months are zero-based.
fn format_day(year: i32, month: i32, day: i32) -> Option<String> {
    let month = u32::try_from(month + 1).ok()?;
    let day = u32::try_from(day).ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format(DATE_FORMAT).to_string())
}

fn parse_day(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}
