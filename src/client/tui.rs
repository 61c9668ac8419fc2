//! Full-screen terminal front end for the shell.
//!
//! Shows the service status, the city list, and the selected city's weather
//! above a single-line command prompt.

use crate::client::command::ShellCommand;
use crate::client::shell::{ServerStatus, Shell};
use crate::weather::WeatherRecord;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Screen state that is not part of the shell itself.
#[derive(Default)]
struct App {
    input: Input,
    output: String,
    /// Status shown while a start/stop is in flight.
    pending: Option<ServerStatus>,
}

/// Run the TUI until the user quits.
pub async fn run_tui(shell: &mut Shell, auto_start: bool) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, shell, auto_start).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_event_loop(terminal: &mut Term, shell: &mut Shell, auto_start: bool) -> Result<()> {
    let mut app = App {
        output: "Type 'start' to launch the weather service, 'help' for commands.".to_string(),
        ..App::default()
    };

    if auto_start {
        run_command(terminal, shell, &mut app, ShellCommand::Start).await?;
    }

    loop {
        terminal.draw(|frame| draw_ui(frame, shell, &app))?;

        let event = tokio::task::spawn_blocking(event::read).await??;
        let Event::Key(key) = event else {
            continue;
        };
        // Only handle key press events (not release)
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Enter => {
                let line = app.input.value().trim().to_string();
                app.input.reset();
                if line.is_empty() {
                    continue;
                }
                match line.parse::<ShellCommand>() {
                    Ok(ShellCommand::Quit) => return Ok(()),
                    Ok(command) => run_command(terminal, shell, &mut app, command).await?,
                    Err(message) => app.output = message,
                }
            }
            KeyCode::Up | KeyCode::Down if app.input.value().is_empty() => {
                if let Some(city) = neighbour_city(shell, key.code == KeyCode::Down) {
                    run_command(terminal, shell, &mut app, ShellCommand::Weather(city)).await?;
                }
            }
            KeyCode::Esc => return Ok(()),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(());
            }
            _ => {
                app.input.handle_event(&Event::Key(key));
            }
        }
    }
}

async fn run_command(
    terminal: &mut Term,
    shell: &mut Shell,
    app: &mut App,
    command: ShellCommand,
) -> Result<()> {
    app.pending = match command {
        ShellCommand::Start => Some(ServerStatus::Starting),
        ShellCommand::Stop => Some(ServerStatus::Stopping),
        _ => None,
    };
    if app.pending.is_some() {
        terminal.draw(|frame| draw_ui(frame, shell, app))?;
    }

    app.output = match shell.execute(command).await {
        Ok(output) => output,
        // Errors are shown from `shell.error()`.
        Err(_) => String::new(),
    };
    app.pending = None;
    Ok(())
}

/// The city after (or before) the selected one, wrapping around.
fn neighbour_city(shell: &Shell, forward: bool) -> Option<String> {
    let cities = shell.cities();
    if cities.is_empty() {
        return None;
    }
    let current = shell
        .selected_city()
        .and_then(|selected| cities.iter().position(|c| c == selected));
    let next = match (current, forward) {
        (None, true) => 0,
        (None, false) => cities.len() - 1,
        (Some(i), true) => (i + 1) % cities.len(),
        (Some(i), false) => (i + cities.len() - 1) % cities.len(),
    };
    Some(cities[next].clone())
}

/// Draw the TUI.
fn draw_ui(frame: &mut Frame, shell: &Shell, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_status(frame, rows[0], shell, app);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);
    draw_cities(frame, columns[0], shell);
    draw_weather(frame, columns[1], shell);

    draw_output(frame, rows[2], shell, app);
    draw_input(frame, rows[3], &app.input);
}

fn draw_status(frame: &mut Frame, area: Rect, shell: &Shell, app: &App) {
    let status = app.pending.unwrap_or(shell.status());
    let label = match status {
        ServerStatus::Starting | ServerStatus::Stopping => format!("{}...", status),
        _ => status.to_string(),
    };
    let mut spans = vec![
        Span::styled(
            " wxmcp ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" Server Status: "),
        Span::styled(label, status_style(status)),
    ];
    if let Some(pid) = shell.pid() {
        spans.push(Span::styled(
            format!("  PID {}", pid),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn status_style(status: ServerStatus) -> Style {
    let color = match status {
        ServerStatus::Running => Color::Green,
        ServerStatus::Starting | ServerStatus::Stopping => Color::Yellow,
        ServerStatus::Stopped => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn draw_cities(frame: &mut Frame, area: Rect, shell: &Shell) {
    let items: Vec<ListItem> = shell
        .cities()
        .iter()
        .enumerate()
        .map(|(i, city)| ListItem::new(format!("{}. {}", i + 1, city)))
        .collect();

    let mut state = ListState::default();
    state.select(
        shell
            .selected_city()
            .and_then(|selected| shell.cities().iter().position(|c| c == selected)),
    );

    let list = List::new(items)
        .block(panel(" Cities "))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_weather(frame: &mut Frame, area: Rect, shell: &Shell) {
    let title = match shell.selected_city() {
        Some(city) => format!(" {} ", city),
        None => " City Weather ".to_string(),
    };
    let lines = match shell.weather() {
        Some(record) => weather_lines(record),
        None if shell.status() == ServerStatus::Running => {
            vec![Line::from("Select a city (weather <name|number>, or Up/Down)")]
        }
        None => vec![Line::from("Start the server to see weather data")],
    };
    frame.render_widget(Paragraph::new(lines).block(panel(&title)), area);
}

fn weather_lines(record: &WeatherRecord) -> Vec<Line<'static>> {
    let field = |name: &'static str, value: String| {
        Line::from(vec![
            Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(value),
        ])
    };
    vec![
        field("Temperature: ", format!("{}°F", record.temperature)),
        field("Condition:   ", record.condition.clone()),
        field("Humidity:    ", format!("{}%", record.humidity)),
        field("Wind Speed:  ", format!("{} mph", record.wind_speed)),
    ]
}

fn draw_output(frame: &mut Frame, area: Rect, shell: &Shell, app: &App) {
    let paragraph = match shell.error() {
        Some(error) => Paragraph::new(error.to_string()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(app.output.clone()),
    };
    frame.render_widget(
        paragraph.wrap(Wrap { trim: false }).block(panel(" Output ")),
        area,
    );
}

fn draw_input(frame: &mut Frame, area: Rect, input: &Input) {
    let block = Block::default()
        .title(" command ")
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    // Inner area for the input
    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let input_width = inner_area.width as usize;
    let cursor_pos = input.visual_cursor();
    let scroll = input_scroll(cursor_pos, input_width);

    let visible_value: String = input.value().chars().skip(scroll).take(input_width).collect();
    frame.render_widget(
        Paragraph::new(Span::styled(visible_value, Style::default().fg(Color::White))),
        inner_area,
    );

    // Position the cursor
    let cursor_x = inner_area.x + (cursor_pos - scroll) as u16;
    frame.set_cursor_position((cursor_x, inner_area.y));
}

/// How many leading characters to hide so the cursor stays visible.
fn input_scroll(cursor_pos: usize, width: usize) -> usize {
    if width > 0 && cursor_pos >= width {
        cursor_pos - width + 1
    } else {
        0
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
}
