//! Interactive state: which list is shown, what is selected, and how key
//! presses change it. Nothing here touches the terminal.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::list::StatefulList;
use crate::api_client::SitzungSource;
use crate::domain::{Sitzung, Top};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Sitzungen,
    Tops,
}

pub struct App<S> {
    source: S,
    pub sitzungen: StatefulList<Sitzung>,
    pub tops: StatefulList<Top>,
    pub view: View,
    /// The Sitzung whose TOPs are shown in [`View::Tops`].
    pub open_sitzung: Option<Sitzung>,
    /// Last error, shown in the footer until the next successful fetch.
    pub status: Option<String>,
    should_quit: bool,
}

impl<S: SitzungSource> App<S> {
    /// Creates the app and loads the Sitzungen list.
    ///
    /// A failed load leaves the list empty and records the error in
    /// `status`; the user can retry with `r`.
    pub fn new(source: S) -> Self {
        let mut app = Self {
            source,
            sitzungen: StatefulList::default(),
            tops: StatefulList::default(),
            view: View::Sitzungen,
            open_sitzung: None,
            status: None,
            should_quit: false,
        };
        app.reload_sitzungen();
        app
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.view {
            View::Sitzungen => self.handle_sitzungen_key(key.code),
            View::Tops => self.handle_tops_key(key.code),
        }
    }

    fn handle_sitzungen_key(&mut self, code: KeyCode) {
        use KeyCode::*;
        match code {
            Char('q') | Esc => self.should_quit = true,
            Char('h') | Left => self.sitzungen.unselect(),
            Char('j') | Down => self.sitzungen.next(),
            Char('k') | Up => self.sitzungen.previous(),
            Char('o') | Char('l') | Enter | Right => self.open_selected(),
            Char('g') | Home => self.sitzungen.first(),
            Char('G') | End => self.sitzungen.last(),
            Char('r') => self.reload_sitzungen(),
            _ => {}
        }
    }

    fn handle_tops_key(&mut self, code: KeyCode) {
        use KeyCode::*;
        match code {
            Char('q') => self.should_quit = true,
            Esc | Char('h') | Left | Backspace => self.close_sitzung(),
            Char('j') | Down => self.tops.next(),
            Char('k') | Up => self.tops.previous(),
            Char('g') | Home => self.tops.first(),
            Char('G') | End => self.tops.last(),
            Char('r') => self.reload_tops(),
            _ => {}
        }
    }

    /// Fetch the TOPs of the selected Sitzung and switch to the TOP view.
    /// Does nothing when no Sitzung is selected.
    pub fn open_selected(&mut self) {
        let Some(sitzung) = self.sitzungen.selected_item().cloned() else {
            return;
        };
        match self.source.tops(sitzung.id) {
            Ok(tops) => {
                self.tops = StatefulList::with_items(tops);
                self.open_sitzung = Some(sitzung);
                self.view = View::Tops;
                self.status = None;
            }
            Err(e) => {
                self.status = Some(format!("Could not load TOPs of '{}': {e:#}", sitzung.name));
            }
        }
    }

    pub fn close_sitzung(&mut self) {
        self.view = View::Sitzungen;
        self.open_sitzung = None;
        self.tops = StatefulList::default();
        self.status = None;
    }

    /// Reload the Sitzungen, keeping the selection on the same Sitzung if it
    /// still exists.
    pub fn reload_sitzungen(&mut self) {
        let previous = self.sitzungen.selected_item().map(|s| s.id);
        match self.source.sitzungen() {
            Ok(items) => {
                let keep = previous.and_then(|id| items.iter().position(|s| s.id == id));
                self.sitzungen = StatefulList::with_items(items);
                if let Some(i) = keep {
                    self.sitzungen.state.select(Some(i));
                }
                self.status = None;
            }
            Err(e) => self.status = Some(format!("Could not load Sitzungen: {e:#}")),
        }
    }

    pub fn reload_tops(&mut self) {
        let Some(sitzung) = self.open_sitzung.clone() else {
            return;
        };
        match self.source.tops(sitzung.id) {
            Ok(tops) => {
                self.tops = StatefulList::with_items(tops);
                self.status = None;
            }
            Err(e) => {
                self.status = Some(format!("Could not load TOPs of '{}': {e:#}", sitzung.name));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use chrono::NaiveDate;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use uuid::Uuid;

    /// In-memory source. Fails every call while `failing` is set.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub sitzungen: RefCell<Vec<Sitzung>>,
        pub tops: HashMap<Uuid, Vec<Top>>,
        pub failing: Cell<bool>,
        pub top_calls: Cell<usize>,
    }

    impl SitzungSource for FakeSource {
        fn sitzungen(&self) -> Result<Vec<Sitzung>> {
            if self.failing.get() {
                bail!("connection refused");
            }
            Ok(self.sitzungen.borrow().clone())
        }

        fn tops(&self, sitzung_id: Uuid) -> Result<Vec<Top>> {
            self.top_calls.set(self.top_calls.get() + 1);
            if self.failing.get() {
                bail!("connection refused");
            }
            Ok(self.tops.get(&sitzung_id).cloned().unwrap_or_default())
        }
    }

    pub(crate) fn sitzung(name: &str, day: u32) -> Sitzung {
        Sitzung {
            name: name.to_string(),
            datum: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap(),
            id: Uuid::new_v4(),
        }
    }

    pub(crate) fn top(name: &str, weight: i32, inhalt: &str) -> Top {
        Top {
            name: name.to_string(),
            id: Uuid::new_v4(),
            inhalt: inhalt.to_string(),
            weight,
        }
    }

    /// Two Sitzungen; the first has two TOPs.
    pub(crate) fn fixture() -> FakeSource {
        let first = sitzung("Plenum", 1);
        let second = sitzung("Vorstand", 8);
        let mut tops = HashMap::new();
        tops.insert(
            first.id,
            vec![
                top("Begruessung", 1, "Hallo zusammen"),
                top("Finanzen", 2, "Kassenbericht 2023"),
            ],
        );
        FakeSource {
            sitzungen: RefCell::new(vec![first, second]),
            tops,
            ..Default::default()
        }
    }

    fn press(app: &mut App<FakeSource>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn new_loads_sitzungen_and_selects_first() {
        let app = App::new(fixture());
        assert_eq!(app.sitzungen.len(), 2);
        assert_eq!(app.sitzungen.selected(), Some(0));
        assert_eq!(app.view, View::Sitzungen);
        assert!(app.status.is_none());
    }

    #[test]
    fn new_records_load_failure() {
        let source = fixture();
        source.failing.set(true);
        let app = App::new(source);
        assert!(app.sitzungen.is_empty());
        assert_eq!(
            app.status.as_deref(),
            Some("Could not load Sitzungen: connection refused")
        );
    }

    #[test]
    fn navigation_keys_move_selection() {
        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.sitzungen.selected(), Some(1));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.sitzungen.selected(), Some(0));
        press(&mut app, KeyCode::Up);
        assert_eq!(app.sitzungen.selected(), Some(1));
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.sitzungen.selected(), Some(0));
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.sitzungen.selected(), Some(1));
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.sitzungen.selected(), None);
    }

    #[test]
    fn open_shows_tops_of_selected_sitzung() {
        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Char('o'));

        assert_eq!(app.view, View::Tops);
        assert_eq!(app.open_sitzung.as_ref().unwrap().name, "Plenum");
        let names: Vec<&str> = app.tops.items.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Begruessung", "Finanzen"]);
        assert_eq!(app.tops.selected(), Some(0));
    }

    #[test]
    fn open_without_selection_does_nothing() {
        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view, View::Sitzungen);
        assert_eq!(app.source.top_calls.get(), 0);
    }

    #[test]
    fn open_failure_stays_in_list_view() {
        let mut app = App::new(fixture());
        app.source.failing.set(true);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view, View::Sitzungen);
        let status = app.status.clone().unwrap();
        assert!(status.contains("Plenum"), "got: {status}");
        assert!(status.contains("connection refused"));
    }

    #[test]
    fn tops_view_navigation_and_back() {
        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.tops.selected_item().unwrap().name, "Finanzen");

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.view, View::Sitzungen);
        assert!(app.open_sitzung.is_none());
        assert!(app.tops.is_empty());
        assert!(!app.should_quit());
    }

    #[test]
    fn back_clears_tops_error() {
        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Enter);
        app.source.failing.set(true);
        press(&mut app, KeyCode::Char('r'));
        assert!(app.status.as_deref().is_some_and(|s| s.contains("TOPs")));

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.view, View::Sitzungen);
        assert!(app.status.is_none());
    }

    #[test]
    fn empty_sitzung_opens_empty_tops_view() {
        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('o'));
        assert_eq!(app.view, View::Tops);
        assert!(app.tops.is_empty());
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.tops.selected(), None);
    }

    #[test]
    fn quit_keys() {
        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());

        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit());

        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());

        let mut app = App::new(fixture());
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
    }

    #[test]
    fn key_release_events_are_ignored() {
        let mut app = App::new(fixture());
        let mut key = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        app.handle_key(key);
        assert_eq!(app.sitzungen.selected(), Some(0));
    }

    #[test]
    fn reload_keeps_selection_on_same_sitzung() {
        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Char('j'));
        let selected_id = app.sitzungen.selected_item().unwrap().id;

        app.source
            .sitzungen
            .borrow_mut()
            .insert(0, sitzung("Neu", 15));
        press(&mut app, KeyCode::Char('r'));

        assert_eq!(app.sitzungen.len(), 3);
        assert_eq!(app.sitzungen.selected(), Some(2));
        assert_eq!(app.sitzungen.selected_item().unwrap().id, selected_id);
    }

    #[test]
    fn reload_failure_keeps_existing_items() {
        let mut app = App::new(fixture());
        app.source.failing.set(true);
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.sitzungen.len(), 2);
        assert!(app.status.is_some());

        app.source.failing.set(false);
        press(&mut app, KeyCode::Char('r'));
        assert!(app.status.is_none());
    }

    #[test]
    fn reload_in_tops_view_refetches_tops() {
        let mut app = App::new(fixture());
        press(&mut app, KeyCode::Char('o'));
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.source.top_calls.get(), 2);
        assert_eq!(app.tops.len(), 2);
    }
}
