use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, List, ListItem, ListState, Padding, Paragraph},
};
use std::io;

/// Rows given to the table list, title included.
pub const LIST_HEIGHT: u16 = 14;

const SELECTED_COLOR: Color = Color::Indexed(170);

/// How the picker was left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Chosen(String),
    Quit,
}

impl Selection {
    /// The line printed once the terminal has been restored.
    pub fn message(&self) -> String {
        match self {
            Selection::Chosen(table) => format!("Let's take a look at {} then...", table),
            Selection::Quit => "Goodbye...".to_string(),
        }
    }
}

pub struct App {
    pub database: String,
    pub tables: Vec<String>,
    pub tables_list_state: ListState,
    pub selection: Option<Selection>,
}

impl App {
    pub fn new(database: &str, tables: Vec<String>) -> App {
        let mut tables_list_state = ListState::default();
        if !tables.is_empty() {
            tables_list_state.select(Some(0));
        }

        App {
            database: database.to_string(),
            tables,
            tables_list_state,
            selection: None,
        }
    }

    pub fn title(&self) -> String {
        format!("Tables in the {} database:", self.database)
    }

    pub fn selected_table(&self) -> Option<&str> {
        self.tables_list_state
            .selected()
            .and_then(|i| self.tables.get(i))
            .map(String::as_str)
    }

    pub fn next_table(&mut self) {
        if self.tables.is_empty() {
            return;
        }

        let i = match self.tables_list_state.selected() {
            Some(i) => {
                if i >= self.tables.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.tables_list_state.select(Some(i));
    }

    pub fn previous_table(&mut self) {
        if self.tables.is_empty() {
            return;
        }

        let i = match self.tables_list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.tables.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.tables_list_state.select(Some(i));
    }

    pub fn first_table(&mut self) {
        if !self.tables.is_empty() {
            self.tables_list_state.select(Some(0));
        }
    }

    pub fn last_table(&mut self) {
        if !self.tables.is_empty() {
            self.tables_list_state.select(Some(self.tables.len() - 1));
        }
    }

    /// Applies one key press. Sets `selection` when the key ends the picker.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.selection = Some(Selection::Quit)
            }
            KeyCode::Char('q') | KeyCode::Esc => self.selection = Some(Selection::Quit),
            KeyCode::Enter => {
                if let Some(table) = self.selected_table() {
                    self.selection = Some(Selection::Chosen(table.to_string()));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.next_table(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_table(),
            KeyCode::Home | KeyCode::Char('g') => self.first_table(),
            KeyCode::End | KeyCode::Char('G') => self.last_table(),
            _ => {}
        }
    }
}

/// Runs `restore` when dropped, so the terminal is put back however the
/// picker is left, including setup failing half way.
pub struct TerminalGuard<F: FnOnce()> {
    restore: Option<F>,
}

impl<F: FnOnce()> TerminalGuard<F> {
    pub fn new(restore: F) -> TerminalGuard<F> {
        TerminalGuard {
            restore: Some(restore),
        }
    }
}

impl<F: FnOnce()> Drop for TerminalGuard<F> {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
        }
    }
}

/// Draws the picker and feeds it key presses until a table is chosen or the
/// user quits.
pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<Selection> {
    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        if let Event::Key(key) = event::read()? {
            app.handle_key(key);
            if let Some(selection) = app.selection.take() {
                return Ok(selection);
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Length(LIST_HEIGHT),
                Constraint::Length(1),
                Constraint::Min(0),
            ]
            .as_ref(),
        ) // Blank line + list + help
        .split(f.area());

    render_table_list(f, app, chunks[1]);
    render_help(f, chunks[2]);
}

fn render_table_list(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .title(app.title())
        .padding(Padding::left(2));

    if app.tables.is_empty() {
        let paragraph = Paragraph::new(Span::raw("No tables."))
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .tables
        .iter()
        .enumerate()
        .map(|(i, name)| ListItem::new(format!("{}. {}", i + 1, name)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_symbol("> ")
        .highlight_style(Style::default().fg(SELECTED_COLOR));

    f.render_stateful_widget(list, area, &mut app.tables_list_state);
}

fn render_help(f: &mut Frame, area: Rect) {
    let help_text = Paragraph::new(Span::raw(
        "↑/k up • ↓/j down • enter select • q quit",
    ))
    .block(Block::default().padding(Padding::left(4)))
    .style(
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    );
    f.render_widget(help_text, area);
}
