use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::palette::tailwind;
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::Line;
use ratatui::widgets::{
    Block, Borders, HighlightSpacing, List, ListItem, Padding, Paragraph, StatefulWidget, Widget,
    Wrap,
};

use super::app::{App, View};
use crate::api_client::SitzungSource;

const HEADER_BG: Color = tailwind::BLUE.c950;
const NORMAL_ROW_COLOR: Color = tailwind::SLATE.c950;
const DETAIL_BG: Color = tailwind::SLATE.c900;
const SELECTED_STYLE_FG: Color = tailwind::BLUE.c300;
const TEXT_COLOR: Color = tailwind::SLATE.c200;
const ERROR_COLOR: Color = tailwind::RED.c400;

const TITLE: &str = "Sitzungsverwaltung";
const SITZUNGEN_HELP: &str =
    "↓↑/jk move · ←/h unselect · →/o open · g/G top/bottom · r reload · q quit";
const TOPS_HELP: &str = "↓↑/jk move · ←/h/Esc back · g/G top/bottom · r reload · q quit";

impl<S: SitzungSource> Widget for &mut App<S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [header_area, body_area, footer_area] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .areas(area);

        render_title(header_area, buf);
        match self.view {
            View::Sitzungen => self.render_sitzungen(body_area, buf),
            View::Tops => self.render_tops(body_area, buf),
        }
        self.render_footer(footer_area, buf);
    }
}

impl<S: SitzungSource> App<S> {
    fn render_sitzungen(&mut self, area: Rect, buf: &mut Buffer) {
        let items: Vec<ListItem> = self
            .sitzungen
            .items
            .iter()
            .map(|s| ListItem::new(s.list_label()))
            .collect();

        render_list(
            "Sitzungen",
            items,
            "No Sitzungen",
            area,
            buf,
            &mut self.sitzungen.state,
        );
    }

    fn render_tops(&mut self, area: Rect, buf: &mut Buffer) {
        let [list_area, detail_area] =
            Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
                .areas(area);

        let title = self
            .open_sitzung
            .as_ref()
            .map(|s| format!("TOPs · {}", s.list_label()))
            .unwrap_or_else(|| "TOPs".to_string());
        let items: Vec<ListItem> = self
            .tops
            .items
            .iter()
            .map(|t| ListItem::new(format!("{}. {}", t.weight, t.name)))
            .collect();
        render_list(
            &title,
            items,
            "No TOPs",
            list_area,
            buf,
            &mut self.tops.state,
        );

        let block = Block::new()
            .title(Line::raw("Inhalt").centered())
            .borders(Borders::LEFT)
            .padding(Padding::horizontal(1))
            .fg(TEXT_COLOR)
            .bg(DETAIL_BG);
        let text = match self.tops.selected_item() {
            Some(top) if top.inhalt.trim().is_empty() => "(no content)".to_string(),
            Some(top) => top.inhalt.clone(),
            None => String::new(),
        };
        Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(detail_area, buf);
    }

    fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        let paragraph = match &self.status {
            Some(status) => Paragraph::new(format!("\n{status}")).fg(ERROR_COLOR),
            None => Paragraph::new(format!(
                "\n{}",
                match self.view {
                    View::Sitzungen => SITZUNGEN_HELP,
                    View::Tops => TOPS_HELP,
                }
            )),
        };
        paragraph.centered().render(area, buf);
    }
}

fn render_title(area: Rect, buf: &mut Buffer) {
    Paragraph::new(TITLE).bold().centered().render(area, buf);
}

/// A header block with a highlighted list inside, or a placeholder line when
/// there is nothing to show.
fn render_list(
    title: &str,
    items: Vec<ListItem>,
    placeholder: &str,
    area: Rect,
    buf: &mut Buffer,
    state: &mut ratatui::widgets::ListState,
) {
    let outer_block = Block::new()
        .borders(Borders::NONE)
        .fg(TEXT_COLOR)
        .bg(HEADER_BG)
        .title(title.to_string())
        .title_alignment(Alignment::Center);
    let inner_block = Block::new()
        .borders(Borders::NONE)
        .fg(TEXT_COLOR)
        .bg(NORMAL_ROW_COLOR);

    let inner_area = outer_block.inner(area);
    outer_block.render(area, buf);

    if items.is_empty() {
        Paragraph::new(placeholder)
            .italic()
            .centered()
            .block(inner_block)
            .render(inner_area, buf);
        return;
    }

    let list = List::new(items)
        .block(inner_block)
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::REVERSED)
                .fg(SELECTED_STYLE_FG),
        )
        .highlight_symbol(">")
        .highlight_spacing(HighlightSpacing::Always);

    StatefulWidget::render(list, inner_area, buf, state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::tests::fixture;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(app: &mut App<crate::tui::app::tests::FakeSource>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 16)).unwrap();
        terminal
            .draw(|frame| frame.render_widget(&mut *app, frame.area()))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn sitzungen_view_lists_labels_and_help() {
        let mut app = App::new(fixture());
        let screen = draw(&mut app);
        assert!(screen.contains(TITLE));
        assert!(screen.contains(">Plenum 01.03.2024 18:00"), "{screen}");
        assert!(screen.contains("Vorstand 08.03.2024 18:00"));
        assert!(screen.contains("r reload"));
    }

    #[test]
    fn tops_view_shows_weighted_names_and_content() {
        let mut app = App::new(fixture());
        app.open_selected();
        app.tops.next();
        let screen = draw(&mut app);
        assert!(screen.contains("TOPs · Plenum"), "{screen}");
        assert!(screen.contains("1. Begruessung"));
        assert!(screen.contains(">2. Finanzen"));
        assert!(screen.contains("Kassenbericht 2023"));
        assert!(screen.contains("Esc back"));
    }

    #[test]
    fn empty_list_shows_placeholder() {
        let source = fixture();
        source.sitzungen.borrow_mut().clear();
        let mut app = App::new(source);
        let screen = draw(&mut app);
        assert!(screen.contains("No Sitzungen"));
    }

    #[test]
    fn status_replaces_help_in_footer() {
        let source = fixture();
        source.failing.set(true);
        let mut app = App::new(source);
        let screen = draw(&mut app);
        assert!(screen.contains("Could not load Sitzungen: connection refused"));
        assert!(!screen.contains("r reload"));
    }
}
