use gtk4 as gtk;
use gtk4::prelude::*;
use libadwaita as adw;
use libadwaita::prelude::*;

use quickevent_core::EventDraft;

use crate::widgets::date_field::DateField;

pub const WINDOW_TITLE: &str = "Google Calendar Event Creator";
pub const LABEL_SUBMIT: &str = "Add Event";
pub const LABEL_REPEATING: &str = "Repeating (Weekly)";

#[derive(Clone)]
pub struct UiWidgets {
    pub window: adw::ApplicationWindow,
    pub summary_entry: gtk::Entry,
    pub start_date: DateField,
    pub start_time_entry: gtk::Entry,
    pub end_date: DateField,
    pub end_time_entry: gtk::Entry,
    pub description_entry: gtk::Entry,
    pub repeating_check: gtk::CheckButton,
    pub submit_button: gtk::Button,
    pub status_label: gtk::Label,
}

impl UiWidgets {
    /// Snapshot of the form; values are taken as typed.
    pub fn draft(&self) -> EventDraft {
        EventDraft::new(
            self.summary_entry.text(),
            self.start_date.text(),
            self.start_time_entry.text(),
            self.end_date.text(),
            self.end_time_entry.text(),
        )
        .with_repeating(self.repeating_check.is_active())
        .with_description(self.description_entry.text())
    }

    /// Locks the submit button while a submission runs.
    pub fn set_busy(&self, busy: bool) {
        self.submit_button.set_sensitive(!busy);
    }

    pub fn set_status(&self, text: &str, is_error: bool) {
        self.status_label.set_label(text);
        if is_error {
            self.status_label.add_css_class("error");
        } else {
            self.status_label.remove_css_class("error");
        }
    }
}

pub fn build(app: &adw::Application) -> UiWidgets {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title(WINDOW_TITLE)
        .default_width(460)
        .resizable(false)
        .build();

    let header = adw::HeaderBar::new();
    let window_title = adw::WindowTitle::builder()
        .title(WINDOW_TITLE)
        .build();
    header.set_title_widget(Some(&window_title));

    let grid = gtk::Grid::builder()
        .row_spacing(10)
        .column_spacing(12)
        .css_classes(["qe-form"])
        .build();

    let summary_entry = gtk::Entry::builder().hexpand(true).build();
    let start_date = DateField::new();
    let start_time_entry = time_entry();
    let end_date = DateField::new();
    let end_time_entry = time_entry();
    let description_entry = gtk::Entry::builder()
        .placeholder_text("Optional")
        .hexpand(true)
        .build();

    let rows: [(&str, &gtk::Widget); 6] = [
        ("Event Summary:", summary_entry.upcast_ref()),
        ("Start Date:", start_date.container.upcast_ref()),
        ("Start Time (HH:MM):", start_time_entry.upcast_ref()),
        ("End Date:", end_date.container.upcast_ref()),
        ("End Time (HH:MM):", end_time_entry.upcast_ref()),
        ("Description:", description_entry.upcast_ref()),
    ];
    for (row, (label, widget)) in (0..).zip(rows) {
        let label = gtk::Label::builder()
            .label(label)
            .xalign(0.0)
            .css_classes(["qe-field-label"])
            .build();
        grid.attach(&label, 0, row, 1, 1);
        grid.attach(widget, 1, row, 1, 1);
    }

    let repeating_check = gtk::CheckButton::with_label(LABEL_REPEATING);
    grid.attach(&repeating_check, 0, 6, 2, 1);

    let submit_button = gtk::Button::builder()
        .label(LABEL_SUBMIT)
        .css_classes(["suggested-action", "pill"])
        .halign(gtk::Align::Center)
        .build();
    grid.attach(&submit_button, 0, 7, 2, 1);

    let status_label = gtk::Label::builder()
        .label("Ready")
        .xalign(0.5)
        .css_classes(["qe-status"])
        .build();
    grid.attach(&status_label, 0, 8, 2, 1);

    let toolbar = adw::ToolbarView::new();
    toolbar.add_top_bar(&header);
    toolbar.set_content(Some(&grid));

    window.set_content(Some(&toolbar));
    window.set_default_widget(Some(&submit_button));

    UiWidgets {
        window,
        summary_entry,
        start_date,
        start_time_entry,
        end_date,
        end_time_entry,
        description_entry,
        repeating_check,
        submit_button,
        status_label,
    }
}

fn time_entry() -> gtk::Entry {
    gtk::Entry::builder()
        .placeholder_text("HH:MM")
        .max_width_chars(8)
        .activates_default(true)
        .build()
}
