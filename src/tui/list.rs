use ratatui::widgets::ListState;

/// Items plus the ratatui selection state used to render them.
pub struct StatefulList<T> {
    pub state: ListState,
    pub items: Vec<T>,
    last_selected: Option<usize>,
}

impl<T> Default for StatefulList<T> {
    fn default() -> Self {
        Self::with_items(Vec::new())
    }
}

impl<T> StatefulList<T> {
    /// Selects the first item when there is one.
    pub fn with_items(items: Vec<T>) -> Self {
        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(0));
        }
        Self {
            state,
            items,
            last_selected: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected()
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.state.selected().and_then(|i| self.items.get(i))
    }

    /// Move down, wrapping to the top. An unselected list resumes at the
    /// last selection.
    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let last = self.items.len() - 1;
        let i = match self.state.selected() {
            Some(i) if i >= last => 0,
            Some(i) => i + 1,
            None => self.resume_index(),
        };
        self.state.select(Some(i));
    }

    /// Move up, wrapping to the bottom.
    pub fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => self.items.len() - 1,
            Some(i) => (i - 1).min(self.items.len() - 1),
            None => self.resume_index(),
        };
        self.state.select(Some(i));
    }

    /// Clear the selection but remember it and keep the scroll position.
    pub fn unselect(&mut self) {
        let Some(selected) = self.state.selected() else {
            return;
        };
        let offset = self.state.offset();
        self.last_selected = Some(selected);
        self.state.select(None);
        *self.state.offset_mut() = offset;
    }

    pub fn first(&mut self) {
        if !self.items.is_empty() {
            self.state.select(Some(0));
        }
    }

    pub fn last(&mut self) {
        if !self.items.is_empty() {
            self.state.select(Some(self.items.len() - 1));
        }
    }

    fn resume_index(&self) -> usize {
        self.last_selected
            .unwrap_or(0)
            .min(self.items.len().saturating_sub(1))
    }
}
