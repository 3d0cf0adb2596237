use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};

use crate::app::App;
use crate::client::LeaderboardClient;
use crate::clock::Clock;
use crate::util::format_clock;

const HORIZONTAL_MARGIN: u16 = 2;
const HELP: &str = "1-9/enter: start·stop  ↑↓: select  s: stop  r: refresh  q: quit";

/// Label for a roster entry; the running one carries its elapsed time
pub fn participant_label(name: &str, running: Option<&str>, elapsed_secs: u64) -> String {
    if running == Some(name) {
        format!("{name} ({})", format_clock(elapsed_secs))
    } else {
        name.to_string()
    }
}

impl<C: LeaderboardClient, K: Clock> Widget for &App<C, K> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let ctl = &self.controller;
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let running_style = Style::default().patch(bold_style).fg(Color::Red);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let roster_height = ctl.roster().len() as u16 + 2;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(roster_height),
                Constraint::Min(3),
                Constraint::Length(2),
            ])
            .split(area);

        Paragraph::new(Span::styled("FOCUS", bold_style))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let participants: Vec<Line> = ctl
            .roster()
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let label = participant_label(name, ctl.running(), ctl.elapsed_secs());
                let marker = if idx == self.selected { "›" } else { " " };
                let style = if ctl.running() == Some(name.as_str()) {
                    running_style
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::raw(format!("{marker} ")),
                    Span::styled(format!("{:>2} ", idx + 1), dim_style),
                    Span::styled(label, style),
                ])
            })
            .collect();
        Paragraph::new(participants)
            .block(Block::default().borders(Borders::ALL).title("Participants"))
            .render(chunks[1], buf);

        let rows: Vec<Row> = ctl
            .standings()
            .iter()
            .enumerate()
            .map(|(idx, standing)| {
                let row = Row::new(vec![
                    Cell::from(standing.name.clone()),
                    Cell::from(format_clock(standing.total)),
                ]);
                if idx == 0 {
                    row.style(bold_style)
                } else {
                    row
                }
            })
            .collect();
        Table::new(rows, [Constraint::Percentage(60), Constraint::Percentage(40)])
            .header(Row::new(vec!["Name", "Total"]).style(dim_style))
            .block(Block::default().borders(Borders::ALL).title("Leaderboard"))
            .render(chunks[2], buf);

        let footer = match &self.status {
            Some(status) => vec![Line::from(status.as_str()), Line::styled(HELP, dim_style)],
            None => vec![Line::from(""), Line::styled(HELP, dim_style)],
        };
        Paragraph::new(footer).render(chunks[3], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalClient;
    use crate::clock::ManualClock;
    use crate::controller::{ControllerSettings, TimerController};
    use crate::leaderboard::{LeaderboardStore, UnknownParticipantPolicy};
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn rendered(app: &App<LocalClient, ManualClock>) -> String {
        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        app.render(area, &mut buf);
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn renders_running_participant_and_board() {
        let board = Arc::new(LeaderboardStore::new(
            MemoryStore::new(),
            UnknownParticipantPolicy::Create,
        ));
        board.seed(&["Arno", "Orso"]).unwrap();
        board.commit("Orso", 200).unwrap();

        let clock = ManualClock::new();
        let mut app = App::new(TimerController::new(
            LocalClient::new(board),
            clock.clone(),
            vec!["Arno".into(), "Orso".into()],
            ControllerSettings::default(),
        ));
        app.controller.start("Arno").unwrap();
        clock.advance(Duration::from_secs(2));
        app.controller.tick();

        let screen = rendered(&app);
        assert!(screen.contains("FOCUS"));
        assert!(screen.contains("Arno (0:02)"));
        assert!(screen.contains("3:20"));
    }

    #[test]
    fn label_shows_elapsed_only_for_runner() {
        assert_eq!(participant_label("Arno", Some("Arno"), 65), "Arno (1:05)");
        assert_eq!(participant_label("Orso", Some("Arno"), 65), "Orso");
        assert_eq!(participant_label("Orso", None, 0), "Orso");
    }
}
